//! 文本命令行解析与序列化
//!
//! 命令源每行发送一条命令，字段以逗号分隔：
//!
//! ```text
//! <origin>,<id>,<name>[,<命令特定字段>...][;]
//! ```
//!
//! 行首可以带 `>` 前缀（路由标记），行尾可以带 `;` 终止符，
//! 两者在解析前剥除。字段数必须与变体声明的元数完全一致，
//! 且每个字段都能转换为声明类型，否则整条命令按格式错误拒绝，
//! 绝不部分生效。
//!
//! `auto_init` 存在两个候选变体（带/不带力限制参数），仅靠字段数
//! 区分，先尝试元数更大的变体。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 头部三个固定字段的说明（格式错误诊断用）
const EXPECTED_HEADER: &str = "(origin:string,id:u32,name:string)";
const EXPECTED_MOVE_CAM: &str = "move_cam(pan:f64,tilt:f64,height:f64)";
const EXPECTED_SET_POS: &str = "set_pos(pose:home|giraffe)";
const EXPECTED_SET_HOME: &str = "set_home()";
const EXPECTED_POWER: &str = "power(state:on|off)";
const EXPECTED_BRAKES: &str = "brakes()";
const EXPECTED_AUTO_INIT: &str = "auto_init() | auto_init(force_limit:f64)";
const EXPECTED_JOINT_MOVE: &str = "initj(joint:u8[0..=5],delta:f64)";

/// 命名位姿（`set_pos` 的参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedPose {
    /// 配置的归位位姿
    Home,
    /// 高位观察位姿
    Giraffe,
}

impl FromStr for NamedPose {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("home") {
            Ok(NamedPose::Home)
        } else if s.eq_ignore_ascii_case("giraffe") {
            Ok(NamedPose::Giraffe)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for NamedPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamedPose::Home => write!(f, "home"),
            NamedPose::Giraffe => write!(f, "giraffe"),
        }
    }
}

/// 电源开关状态（`power` 的参数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
}

impl FromStr for PowerState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(PowerState::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(PowerState::Off)
        } else {
            Err(())
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
        }
    }
}

/// 已解析的命令（封闭集合，每个变体固定元数）
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 移动到相机观察位姿
    MoveCam {
        origin: String,
        id: u32,
        pan: f64,
        tilt: f64,
        height: f64,
    },
    /// 移动到命名位姿
    SetPosition {
        origin: String,
        id: u32,
        pose: NamedPose,
    },
    /// 将当前关节角度记录为本会话的归位位姿
    SetHome { origin: String, id: u32 },
    /// 电源开关
    Power {
        origin: String,
        id: u32,
        state: PowerState,
    },
    /// 抱闸 / 停止
    Brakes { origin: String, id: u32 },
    /// 自动初始化（使用配置的力限制）
    AutoInit { origin: String, id: u32 },
    /// 自动初始化（命令行指定力限制）
    AutoInitForce {
        origin: String,
        id: u32,
        force_limit: f64,
    },
    /// 单关节步进
    JointMove {
        origin: String,
        id: u32,
        joint: u8,
        delta: f64,
    },
}

/// 剥除路由前缀与终止符后按逗号切分字段
pub fn split_fields(line: &str) -> Vec<&str> {
    let line = line.trim();
    let line = line.strip_prefix('>').unwrap_or(line);
    let line = line.strip_suffix(';').unwrap_or(line);
    if line.is_empty() {
        return Vec::new();
    }
    line.split(',').map(str::trim).collect()
}

/// 规范化一条命令行（剥除 `>` 与 `;`，字段重连）
///
/// 格式错误应答需要原样回显命令行，回显使用此规范形式。
pub fn normalize_line(line: &str) -> String {
    split_fields(line).join(",")
}

fn parse_f64(field: &str, expected: &'static str) -> Result<f64, ProtocolError> {
    field
        .parse::<f64>()
        .map_err(|_| ProtocolError::Format { expected })
}

impl Command {
    /// 解析一条命令行
    ///
    /// 字段数或字段类型不匹配返回 [`ProtocolError::Format`]，
    /// 未识别的命令名返回 [`ProtocolError::UnknownCommand`]。
    /// 本函数对任意输入都不会 panic。
    pub fn parse_line(line: &str) -> Result<Self, ProtocolError> {
        let fields = split_fields(line);
        if fields.len() < 3 {
            return Err(ProtocolError::Format {
                expected: EXPECTED_HEADER,
            });
        }

        let origin = fields[0].to_string();
        let id: u32 = fields[1].parse().map_err(|_| ProtocolError::Format {
            expected: EXPECTED_HEADER,
        })?;
        let name = fields[2];
        let args = &fields[3..];

        if name.eq_ignore_ascii_case("move_cam") {
            if args.len() != 3 {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_MOVE_CAM,
                });
            }
            Ok(Command::MoveCam {
                origin,
                id,
                pan: parse_f64(args[0], EXPECTED_MOVE_CAM)?,
                tilt: parse_f64(args[1], EXPECTED_MOVE_CAM)?,
                height: parse_f64(args[2], EXPECTED_MOVE_CAM)?,
            })
        } else if name.eq_ignore_ascii_case("set_pos") {
            if args.len() != 1 {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_SET_POS,
                });
            }
            let pose = args[0].parse().map_err(|_| ProtocolError::Format {
                expected: EXPECTED_SET_POS,
            })?;
            Ok(Command::SetPosition { origin, id, pose })
        } else if name.eq_ignore_ascii_case("set_home") {
            if !args.is_empty() {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_SET_HOME,
                });
            }
            Ok(Command::SetHome { origin, id })
        } else if name.eq_ignore_ascii_case("power") {
            if args.len() != 1 {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_POWER,
                });
            }
            let state = args[0].parse().map_err(|_| ProtocolError::Format {
                expected: EXPECTED_POWER,
            })?;
            Ok(Command::Power { origin, id, state })
        } else if name.eq_ignore_ascii_case("brakes") || name.eq_ignore_ascii_case("stop") {
            if !args.is_empty() {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_BRAKES,
                });
            }
            Ok(Command::Brakes { origin, id })
        } else if name.eq_ignore_ascii_case("auto_init") {
            // 两个候选变体仅靠字段数区分，先试元数更大的带力限制变体
            match args.len() {
                1 => Ok(Command::AutoInitForce {
                    origin,
                    id,
                    force_limit: parse_f64(args[0], EXPECTED_AUTO_INIT)?,
                }),
                0 => Ok(Command::AutoInit { origin, id }),
                _ => Err(ProtocolError::Format {
                    expected: EXPECTED_AUTO_INIT,
                }),
            }
        } else if name.eq_ignore_ascii_case("initj") {
            if args.len() != 2 {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_JOINT_MOVE,
                });
            }
            let joint: u8 = args[0].parse().map_err(|_| ProtocolError::Format {
                expected: EXPECTED_JOINT_MOVE,
            })?;
            if joint as usize >= crate::status::JOINTS {
                return Err(ProtocolError::Format {
                    expected: EXPECTED_JOINT_MOVE,
                });
            }
            Ok(Command::JointMove {
                origin,
                id,
                joint,
                delta: parse_f64(args[1], EXPECTED_JOINT_MOVE)?,
            })
        } else {
            Err(ProtocolError::UnknownCommand(name.to_string()))
        }
    }

    /// 命令名（线上形式）
    pub fn name(&self) -> &'static str {
        match self {
            Command::MoveCam { .. } => "move_cam",
            Command::SetPosition { .. } => "set_pos",
            Command::SetHome { .. } => "set_home",
            Command::Power { .. } => "power",
            Command::Brakes { .. } => "brakes",
            Command::AutoInit { .. } | Command::AutoInitForce { .. } => "auto_init",
            Command::JointMove { .. } => "initj",
        }
    }

    /// 命令来源标识
    pub fn origin(&self) -> &str {
        match self {
            Command::MoveCam { origin, .. }
            | Command::SetPosition { origin, .. }
            | Command::SetHome { origin, .. }
            | Command::Power { origin, .. }
            | Command::Brakes { origin, .. }
            | Command::AutoInit { origin, .. }
            | Command::AutoInitForce { origin, .. }
            | Command::JointMove { origin, .. } => origin,
        }
    }

    /// 命令编号
    pub fn id(&self) -> u32 {
        match self {
            Command::MoveCam { id, .. }
            | Command::SetPosition { id, .. }
            | Command::SetHome { id, .. }
            | Command::Power { id, .. }
            | Command::Brakes { id, .. }
            | Command::AutoInit { id, .. }
            | Command::AutoInitForce { id, .. }
            | Command::JointMove { id, .. } => *id,
        }
    }

    /// 序列化为规范命令行（不含终止符）
    pub fn serialise(&self) -> String {
        let head = format!("{},{},{}", self.origin(), self.id(), self.name());
        match self {
            Command::MoveCam {
                pan, tilt, height, ..
            } => format!("{head},{pan},{tilt},{height}"),
            Command::SetPosition { pose, .. } => format!("{head},{pose}"),
            Command::Power { state, .. } => format!("{head},{state}"),
            Command::AutoInitForce { force_limit, .. } => format!("{head},{force_limit}"),
            Command::JointMove { joint, delta, .. } => format!("{head},{joint},{delta}"),
            Command::SetHome { .. } | Command::Brakes { .. } | Command::AutoInit { .. } => head,
        }
    }
}

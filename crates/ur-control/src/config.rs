//! 守护进程配置
//!
//! 启动时从 TOML 文件加载一次，此后不可变。缺失或非法的配置在
//! 启动期即为致命错误。角度在配置文件中以度表示（便于人工核对），
//! 内部统一换算为弧度。

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use ur_protocol::status::JOINTS;

/// 关节角度限位（度）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointLimits {
    pub min: [f64; JOINTS],
    pub max: [f64; JOINTS],
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            min: [-360.0; JOINTS],
            max: [360.0; JOINTS],
        }
    }
}

/// 机械臂相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    /// 归位位姿（度）
    pub home_position_deg: [f64; JOINTS],

    /// 高位观察位姿（度）
    #[serde(default = "default_giraffe_position")]
    pub giraffe_position_deg: [f64; JOINTS],

    /// 归位标记文件所在的工作目录（必须已存在）
    pub work_directory: PathBuf,

    /// 关节限位（度），越界目标按碰撞抑制处理
    #[serde(default)]
    pub joint_limits_deg: JointLimits,
}

/// 守护进程参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonTunables {
    /// tick 间隔（秒），0 表示不休眠
    #[serde(default = "default_sleep_secs")]
    pub sleep_secs: f64,

    /// 自动初始化的默认力限制（牛）
    #[serde(default = "default_force_limit")]
    pub force_limit: f64,

    /// movej 加速度（rad/s²）
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,

    /// movej 速度（rad/s）
    #[serde(default = "default_velocity")]
    pub velocity: f64,

    /// 归位判定公差（度）
    #[serde(default = "default_home_tolerance_deg")]
    pub home_tolerance_deg: f64,

    /// 自动初始化单步收敛超时（秒）
    #[serde(default = "default_init_step_timeout_secs")]
    pub init_step_timeout_secs: f64,
}

fn default_giraffe_position() -> [f64; JOINTS] {
    [0.0, -45.0, -90.0, -45.0, 90.0, 0.0]
}

fn default_sleep_secs() -> f64 {
    0.2
}

fn default_force_limit() -> f64 {
    30.0
}

fn default_acceleration() -> f64 {
    0.5
}

fn default_velocity() -> f64 {
    0.1
}

fn default_home_tolerance_deg() -> f64 {
    2.0
}

fn default_init_step_timeout_secs() -> f64 {
    20.0
}

impl Default for DaemonTunables {
    fn default() -> Self {
        Self {
            sleep_secs: default_sleep_secs(),
            force_limit: default_force_limit(),
            acceleration: default_acceleration(),
            velocity: default_velocity(),
            home_tolerance_deg: default_home_tolerance_deg(),
            init_step_timeout_secs: default_init_step_timeout_secs(),
        }
    }
}

/// 守护进程配置（顶层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub arm: ArmConfig,

    #[serde(default)]
    pub daemon: DaemonTunables,
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ControlError::Config(format!("failed to open {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ControlError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// 校验加载后的配置（工作目录必须存在且是目录）
    pub fn validate(&self) -> Result<(), ControlError> {
        let dir = &self.arm.work_directory;
        if !dir.is_dir() {
            return Err(ControlError::Config(format!(
                "work_directory must be an existing directory: {}",
                dir.display()
            )));
        }
        Ok(())
    }

    /// 输出为 TOML 文本（`--output-config` 用）
    pub fn to_toml(&self) -> Result<String, ControlError> {
        toml::to_string_pretty(self).map_err(|e| ControlError::Config(e.to_string()))
    }

    /// 示例配置（默认值）
    pub fn example() -> Self {
        Self {
            arm: ArmConfig {
                home_position_deg: [0.0, -90.0, 0.0, -90.0, 0.0, 0.0],
                giraffe_position_deg: default_giraffe_position(),
                work_directory: PathBuf::from("/var/opt/ur-gateway"),
                joint_limits_deg: JointLimits::default(),
            },
            daemon: DaemonTunables::default(),
        }
    }

    /// 归位位姿（弧度）
    pub fn home_position_rad(&self) -> [f64; JOINTS] {
        self.arm.home_position_deg.map(f64::to_radians)
    }

    /// 高位观察位姿（弧度）
    pub fn giraffe_position_rad(&self) -> [f64; JOINTS] {
        self.arm.giraffe_position_deg.map(f64::to_radians)
    }

    /// 归位判定公差（弧度）
    pub fn home_tolerance_rad(&self) -> f64 {
        self.daemon.home_tolerance_deg.to_radians()
    }

    /// tick 间隔
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs_f64(self.daemon.sleep_secs.max(0.0))
    }

    /// 自动初始化单步超时
    pub fn init_step_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.daemon.init_step_timeout_secs.max(0.0))
    }
}

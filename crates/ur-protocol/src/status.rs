//! 状态帧解析
//!
//! 反馈通道每次送达一个固定长度的二进制状态帧，帧首的声明长度字段
//! 必须等于帧的实际大小，否则视为数据对齐错误（连接已不可信）。
//!
//! ## 帧布局（大端）
//!
//! | 字段           | 类型       | 字节 |
//! |----------------|-----------|------|
//! | length         | u32       | 4    |
//! | joint_angles   | [f64; 6]  | 48   |
//! | tcp_force      | f64       | 8    |
//! | mode           | u8        | 1    |
//! | safety_flags   | u8        | 1    |

use crate::ProtocolError;
use bytes::{Buf, BufMut};

/// 关节数量
pub const JOINTS: usize = 6;

/// 状态帧固定大小（字节）
pub const STATUS_FRAME_SIZE: usize = 4 + JOINTS * 8 + 8 + 1 + 1;

/// 状态广播记录固定大小（结果码 1 字节 + 6 个关节角度）
pub const STATUS_RECORD_SIZE: usize = 1 + JOINTS * 8;

/// 保护性停止标志位
pub const SAFETY_PROTECTIVE_STOP: u8 = 0b0000_0001;

/// 急停标志位
pub const SAFETY_EMERGENCY_STOP: u8 = 0b0000_0010;

/// 机械臂模式码
///
/// 未识别的模式码一律映射为 `Unknown`，避免新固件引入的模式
/// 导致解析失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[repr(u8)]
pub enum RobotMode {
    /// 正常运行（程序可执行）
    Running = 0,
    /// 自由驱动（示教）模式
    Freedrive = 1,
    /// 上电完成，尚未释放抱闸
    Ready = 2,
    /// 初始化中
    Initializing = 3,
    /// 安全停止
    SecurityStopped = 4,
    /// 故障
    Fault = 5,
    /// 控制器未运行
    NoController = 6,
    /// 未连接
    NotConnected = 7,
    /// 关机中
    ShuttingDown = 8,
    /// 未识别的模式码
    #[default]
    Unknown = 255,
}

/// 机械臂最近一次的状态快照
///
/// 由状态读取器独占写入，每次成功读取后整体替换，
/// 其余组件在同一个 tick 内只读共享。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Status {
    /// 关节角度（弧度）
    pub joint_angles: [f64; JOINTS],
    /// 末端受力（牛顿，合力大小）
    pub tcp_force: f64,
    /// 模式码
    pub mode: RobotMode,
    /// 安全标志位（保护性停止 / 急停）
    pub safety_flags: u8,
}

impl Status {
    /// 从一个完整状态帧解码
    ///
    /// 声明长度与 [`STATUS_FRAME_SIZE`] 不一致时返回
    /// [`ProtocolError::InvalidLength`]，调用方不得使用部分数据。
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.len() < STATUS_FRAME_SIZE {
            return Err(ProtocolError::Truncated {
                actual: frame.len(),
                expected: STATUS_FRAME_SIZE,
            });
        }

        let mut buf = frame;
        let declared = buf.get_u32();
        if declared != STATUS_FRAME_SIZE as u32 {
            return Err(ProtocolError::InvalidLength {
                declared,
                expected: STATUS_FRAME_SIZE as u32,
            });
        }

        let mut joint_angles = [0.0; JOINTS];
        for angle in joint_angles.iter_mut() {
            *angle = buf.get_f64();
        }
        let tcp_force = buf.get_f64();
        let mode = RobotMode::from(buf.get_u8());
        let safety_flags = buf.get_u8();

        Ok(Self {
            joint_angles,
            tcp_force,
            mode,
            safety_flags,
        })
    }

    /// 编码为状态帧（反向通道，供模拟反馈源与测试使用）
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(STATUS_FRAME_SIZE);
        buf.put_u32(STATUS_FRAME_SIZE as u32);
        for angle in self.joint_angles {
            buf.put_f64(angle);
        }
        buf.put_f64(self.tcp_force);
        buf.put_u8(self.mode as u8);
        buf.put_u8(self.safety_flags);
        buf
    }

    /// 机械臂是否处于运行态
    pub fn is_running(&self) -> bool {
        self.mode == RobotMode::Running
    }

    /// 是否处于故障或安全停止状态
    pub fn is_faulted(&self) -> bool {
        matches!(self.mode, RobotMode::Fault | RobotMode::SecurityStopped)
            || self.safety_flags != 0
    }
}

/// 状态广播记录
///
/// 每个 tick 无条件写出一次：结果码 1 字节 + 当前关节角度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusRecord {
    /// 结果码（当前使用模式码）
    pub code: u8,
    /// 关节角度（弧度）
    pub joint_angles: [f64; JOINTS],
}

impl StatusRecord {
    /// 从状态快照构建广播记录
    pub fn from_status(status: &Status) -> Self {
        Self {
            code: status.mode as u8,
            joint_angles: status.joint_angles,
        }
    }

    /// 编码为固定长度的二进制记录（大端）
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(STATUS_RECORD_SIZE);
        buf.put_u8(self.code);
        for angle in self.joint_angles {
            buf.put_f64(angle);
        }
        buf
    }
}

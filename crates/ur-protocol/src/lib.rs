//! # UR Protocol
//!
//! UR 机械臂网关的线上协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 文本命令行解析与序列化
//! - `status`: 二进制状态帧解析（反馈通道）
//! - `directive`: 发往机械臂的 ASCII 指令构建
//! - `response`: 命令应答行与结果码
//!
//! ## 字节序
//!
//! 状态帧与状态广播记录均使用大端字节序（网络字节序），
//! 与机械臂控制器的原生反馈格式一致。

pub mod command;
pub mod directive;
pub mod response;
pub mod status;

// 重新导出常用类型
pub use command::{Command, NamedPose, PowerState};
pub use directive::Directive;
pub use response::ResponseCode;
pub use status::{RobotMode, Status, StatusRecord};

use thiserror::Error;

/// 协议解析错误类型
///
/// 命令解析失败（`Format` / `UnknownCommand`）是可恢复错误，
/// 由调度器转换为应答行；状态帧错误（`InvalidLength` / `Truncated`）
/// 表示反馈通道数据损坏，由上层按致命错误处理。
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("command format error, wrong field/s or field type/s, expected: {expected}")]
    Format { expected: &'static str },

    #[error("unknown command found: '{0}'")]
    UnknownCommand(String),

    #[error("status data alignment check failed: declared {declared} bytes, expected {expected}")]
    InvalidLength { declared: u32, expected: u32 },

    #[error("status frame truncated: got {actual} bytes, expected {expected}")]
    Truncated { actual: usize, expected: usize },
}

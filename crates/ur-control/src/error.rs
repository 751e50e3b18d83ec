//! 控制核心错误类型定义
//!
//! 可恢复的命令处理结果不在此表达（见 `ur_protocol::response`）；
//! 这里只定义会终止守护进程的致命条件。控制循环在顶层捕获一次，
//! 经停机守卫执行安全序列后退出。

use std::io;
use std::time::Duration;
use thiserror::Error;
use ur_protocol::ProtocolError;

/// 控制核心致命错误
#[derive(Error, Debug)]
pub enum ControlError {
    /// 反馈通道在限定时间内没有送达状态帧（连接视为已死）
    #[error("no status received within timeout of {0:?}")]
    FeedbackTimeout(Duration),

    /// 反馈连接已关闭或不可用
    #[error("status connection to the robot arm failed")]
    FeedbackClosed,

    /// 状态帧完整性错误（声明长度不匹配 / 帧截断）
    #[error(transparent)]
    Frame(#[from] ProtocolError),

    /// 命令源读取失败（EOF 之外的读错误）
    #[error("reading from the command source failed: {0}")]
    CommandInput(String),

    /// 配置缺失或非法
    #[error("invalid configuration: {0}")]
    Config(String),

    /// 底层 I/O 错误
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

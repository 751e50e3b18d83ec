//! # UR Control
//!
//! UR 机械臂监督控制核心：在命令源与机械臂原生命令/反馈接口之间，
//! 将文本命令翻译为运动请求，持续校验机械臂状态，并执行安全的
//! 自动归位序列。
//!
//! ## 架构
//!
//! 单控制线程、协作式轮询驱动。每个 tick 严格按序执行：
//!
//! 1. 反馈连接健康检查（不健康即致命）
//! 2. 状态读取（100ms 有界等待，只保留最新帧）+ 归位监视
//! 3. 命令输入汇集，至多取出一条最旧命令交给调度器
//! 4. 运动引擎步进，按决策发送 / 抑制 / 空转
//! 5. 状态广播（每 tick 无条件一次）
//! 6. tick 间隔休眠
//!
//! 可恢复错误（协议错误、安全中止、碰撞抑制）以应答行或日志
//! 形式就地消化；连接类与数据完整性错误作为 [`error::ControlError`]
//! 一路上抛，由控制循环顶层捕获一次，经由作用域守卫执行
//! 停止 + 断电的保证性停机序列后退出。
//!
//! ## 模块
//!
//! - `config`: TOML 配置（归位位姿、工作目录、守护进程参数）
//! - `link`: 反馈通道 / 命令通道的传输接缝与 TCP 实现
//! - `reader`: 状态读取器（有界等待、只保留最新、完整性校验）
//! - `inputs`: 命令输入队列（每 tick 消费一条）
//! - `dispatcher`: 命令名到变体的分发与应答生成
//! - `auto_init`: 自动初始化状态机
//! - `home`: 归位位置监视器（标记文件）
//! - `motion`: 运动引擎接缝与内建关节空间实现
//! - `publisher`: 状态广播通道
//! - `control_loop`: 顶层控制循环与停机守卫
//! - `mock`: 无硬件场景下的模拟传输（测试用）

pub mod auto_init;
pub mod config;
pub mod control_loop;
pub mod dispatcher;
pub mod error;
pub mod home;
pub mod inputs;
pub mod link;
pub mod mock;
pub mod motion;
pub mod publisher;
pub mod reader;

pub use auto_init::{AutoInit, InitOutcome, InitState};
pub use config::Config;
pub use control_loop::{ControlLoop, SafingGuard};
pub use error::ControlError;
pub use home::HomeMonitor;
pub use inputs::Inputs;
pub use link::{CommandSink, FeedbackLink, TcpCommandSink, TcpFeedbackLink};
pub use motion::{Decision, JointSpaceEngine, MotionEngine, MotionInputs};
pub use publisher::{StatusPublisher, TcpStatusPublisher};
pub use reader::StatusReader;

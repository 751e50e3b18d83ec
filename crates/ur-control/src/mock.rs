//! 无硬件场景下的模拟传输
//!
//! 测试用的反馈通道 / 命令通道 / 广播器实现，行为与 TCP 实现的
//! 契约一致：有界等待、逐帧读取、缓冲探测。命令通道把写出的指令
//! 行记录在共享缓冲里，供断言检查。

use crate::link::{CommandSink, FeedbackLink};
use crate::publisher::StatusPublisher;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ur_protocol::status::Status;

/// 脚本化的模拟反馈通道
///
/// 帧按入队顺序送达。`repeat_last` 打开后，最后一帧会被反复送达
/// （模拟持续刷新的反馈源），此时它不算"已缓冲"的积压帧。
pub struct MockFeedbackLink {
    frames: VecDeque<Vec<u8>>,
    repeat_last: bool,
    healthy: bool,
}

impl MockFeedbackLink {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            repeat_last: false,
            healthy: true,
        }
    }

    /// 入队一帧已编码状态
    pub fn push_status(&mut self, status: &Status) {
        self.frames.push_back(status.encode());
    }

    /// 入队任意原始帧（构造畸形帧用）
    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.frames.push_back(frame);
    }

    /// 最后一帧反复送达，不会被排空
    pub fn set_repeat_last(&mut self, on: bool) {
        self.repeat_last = on;
    }

    pub fn set_healthy(&mut self, healthy: bool) {
        self.healthy = healthy;
    }

    /// 队列是否已排空（repeat_last 模式下恒为 false）
    pub fn is_drained(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for MockFeedbackLink {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedbackLink for MockFeedbackLink {
    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.frames.is_empty())
    }

    fn read_frame(&mut self, frame: &mut [u8]) -> io::Result<()> {
        let next = if self.repeat_last && self.frames.len() == 1 {
            self.frames.front().cloned()
        } else {
            self.frames.pop_front()
        };
        let Some(bytes) = next else {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no frame scripted",
            ));
        };
        if bytes.len() < frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "scripted frame shorter than requested read",
            ));
        }
        frame.copy_from_slice(&bytes[..frame.len()]);
        Ok(())
    }

    fn has_buffered(&mut self) -> io::Result<bool> {
        if self.repeat_last {
            Ok(self.frames.len() > 1)
        } else {
            Ok(!self.frames.is_empty())
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}

/// 记录型命令通道
#[derive(Clone, Default)]
pub struct MockCommandSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MockCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写出的指令行（按写出顺序）
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl CommandSink for MockCommandSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 记录型状态广播器
#[derive(Clone, Default)]
pub struct MockStatusPublisher {
    records: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockStatusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已广播的记录（按 tick 顺序）
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.records.lock().unwrap().clone()
    }
}

impl StatusPublisher for MockStatusPublisher {
    fn publish(&mut self, record: &[u8]) {
        self.records.lock().unwrap().push(record.to_vec());
    }
}

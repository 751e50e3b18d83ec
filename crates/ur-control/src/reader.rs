//! 状态读取器
//!
//! 每次轮询在有界等待内取一帧；若通道里已积压多帧，全部排空并
//! 只保留最新一帧（新鲜度优先于完整性，过期状态没有价值）。
//! 等待超时与帧完整性失败都是致命错误：反馈连接被视为已死，
//! 绝不静默重试。

use crate::error::ControlError;
use crate::link::FeedbackLink;
use std::time::Duration;
use tracing::error;
use ur_protocol::status::{STATUS_FRAME_SIZE, Status};

/// 状态帧的有界等待时长；反馈源保证在此窗口内必有新帧
pub const STATUS_WAIT: Duration = Duration::from_millis(100);

/// 状态读取器
#[derive(Debug, Clone)]
pub struct StatusReader {
    timeout: Duration,
}

impl StatusReader {
    pub fn new() -> Self {
        Self {
            timeout: STATUS_WAIT,
        }
    }

    /// 自定义等待窗口（测试用）
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 轮询一次，返回最新状态
    ///
    /// 成功时调用方应整体替换当前状态快照；失败时快照保持不变。
    pub fn poll(&self, link: &mut dyn FeedbackLink) -> Result<Status, ControlError> {
        if !link.wait_readable(self.timeout)? {
            error!(
                "no status received within timeout of {}ms",
                self.timeout.as_millis()
            );
            return Err(ControlError::FeedbackTimeout(self.timeout));
        }

        let mut frame = [0u8; STATUS_FRAME_SIZE];
        link.read_frame(&mut frame)?;
        let mut status = decode(&frame)?;

        // 排空积压，只保留最后一帧
        while link.has_buffered()? {
            link.read_frame(&mut frame)?;
            status = decode(&frame)?;
        }

        Ok(status)
    }
}

impl Default for StatusReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(frame: &[u8]) -> Result<Status, ControlError> {
    Status::decode(frame).map_err(|e| {
        error!("status data alignment check failed");
        ControlError::Frame(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFeedbackLink;
    use ur_protocol::status::RobotMode;

    fn status_with_first_joint(angle: f64) -> Status {
        Status {
            joint_angles: [angle, 0.0, 0.0, 0.0, 0.0, 0.0],
            tcp_force: 0.0,
            mode: RobotMode::Running,
            safety_flags: 0,
        }
    }

    #[test]
    fn test_poll_returns_newest_buffered_frame() {
        let mut link = MockFeedbackLink::new();
        link.push_status(&status_with_first_joint(1.0));
        link.push_status(&status_with_first_joint(2.0));
        link.push_status(&status_with_first_joint(3.0));

        let reader = StatusReader::new();
        let status = reader.poll(&mut link).unwrap();
        assert_eq!(status.joint_angles[0], 3.0);
        assert!(link.is_drained());
    }

    #[test]
    fn test_poll_timeout_is_fatal() {
        let mut link = MockFeedbackLink::new();
        let reader = StatusReader::new();
        let result = reader.poll(&mut link);
        assert!(matches!(result, Err(ControlError::FeedbackTimeout(_))));
    }

    #[test]
    fn test_poll_alignment_mismatch_is_fatal() {
        let mut link = MockFeedbackLink::new();
        let mut frame = status_with_first_joint(1.0).encode();
        frame[..4].copy_from_slice(&10u32.to_be_bytes());
        link.push_frame(frame);

        let reader = StatusReader::new();
        let result = reader.poll(&mut link);
        assert!(matches!(result, Err(ControlError::Frame(_))));
    }
}

//! 自动初始化状态机
//!
//! 在没有逐步人工命令的情况下，把机械臂安全地驱动到归位参考位姿。
//! 序列逐关节推进：第 k 步命令第 0..=k 号关节回到归位角度，其余
//! 关节保持当前测量值；反馈确认目标在公差内到达后进入下一步。
//!
//! 全程监视末端受力：任一时刻测量力超过力限制，立即转入 Aborted，
//! 不再发出任何运动命令。停机信号使状态机转入 Cancelled，同样立即
//! 停止发令，机械臂停留在最后一次低速命令的位姿上。所有终态都把
//! 状态机复位为 Idle，可以接受下一条 auto_init 命令。

use crate::config::Config;
use crate::error::ControlError;
use crate::link::{CommandSink, FeedbackLink};
use crate::reader::StatusReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use ur_protocol::directive::Directive;
use ur_protocol::status::{JOINTS, Status};

/// 归位标记文件名
pub const HOME_MARKER_FILE: &str = "ur10.is_home";

/// 序列的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// 全部步骤完成，机械臂位于归位位姿
    Completed,
    /// 受力超限中止
    Aborted,
    /// 停机信号取消
    Cancelled,
    /// 某一步在超时内未收敛
    Stalled,
}

/// 状态机的运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Idle,
    Initializing { step: usize },
}

/// 自动初始化状态机
pub struct AutoInit {
    home: [f64; JOINTS],
    tolerance: f64,
    force_limit: f64,
    acceleration: f64,
    velocity: f64,
    step_timeout: Duration,
    marker_dir: PathBuf,
    reader: StatusReader,
    state: InitState,
}

impl AutoInit {
    pub fn from_config(config: &Config) -> Self {
        Self {
            home: config.home_position_rad(),
            tolerance: config.home_tolerance_rad(),
            force_limit: config.daemon.force_limit,
            // 初始化序列始终低速执行
            acceleration: config.daemon.acceleration,
            velocity: config.daemon.velocity,
            step_timeout: config.init_step_timeout(),
            marker_dir: config.arm.work_directory.clone(),
            reader: StatusReader::new(),
            state: InitState::Idle,
        }
    }

    /// 归位标记文件路径（归位监视器使用同一路径）
    pub fn home_file(&self) -> PathBuf {
        self.marker_dir.join(HOME_MARKER_FILE)
    }

    /// 覆盖默认力限制（命令行 `--init-force-limit`）
    pub fn set_force_limit(&mut self, limit: f64) {
        self.force_limit = limit;
    }

    pub fn state(&self) -> InitState {
        self.state
    }

    /// 执行一次完整的初始化序列
    ///
    /// `force_limit` 为命令携带的一次性覆盖值。序列期间状态快照
    /// 持续刷新（写回 `status`）。反馈超时与 I/O 失败照常致命。
    pub fn run(
        &mut self,
        status: &mut Status,
        link: &mut dyn FeedbackLink,
        sink: &mut dyn CommandSink,
        cancel: &AtomicBool,
        force_limit: Option<f64>,
    ) -> Result<InitOutcome, ControlError> {
        let limit = force_limit.unwrap_or(self.force_limit);
        let outcome = self.drive(status, link, sink, cancel, limit);
        // 终态一律复位，下一条 auto_init 命令从头开始
        self.state = InitState::Idle;
        outcome
    }

    fn drive(
        &mut self,
        status: &mut Status,
        link: &mut dyn FeedbackLink,
        sink: &mut dyn CommandSink,
        cancel: &AtomicBool,
        limit: f64,
    ) -> Result<InitOutcome, ControlError> {
        info!("auto initialization started, force limit {} N", limit);

        for step in 0..JOINTS {
            self.state = InitState::Initializing { step };

            if cancel.load(Ordering::Relaxed) {
                warn!("auto initialization cancelled at step {}", step + 1);
                return Ok(InitOutcome::Cancelled);
            }

            *status = self.reader.poll(link)?;
            if status.tcp_force > limit {
                warn!(
                    "auto initialization aborted: measured force {} N exceeds limit {} N",
                    status.tcp_force, limit
                );
                return Ok(InitOutcome::Aborted);
            }

            if self.step_reached(status, step) {
                continue;
            }

            let mut target = status.joint_angles;
            target[..=step].copy_from_slice(&self.home[..=step]);
            let directive = Directive::MoveJ {
                target,
                acceleration: self.acceleration,
                velocity: self.velocity,
            };
            info!("auto init step {}/{}: {}", step + 1, JOINTS, directive);
            sink.write_line(&directive.to_string())?;
            sink.flush()?;

            let deadline = Instant::now() + self.step_timeout;
            loop {
                if cancel.load(Ordering::Relaxed) {
                    warn!("auto initialization cancelled at step {}", step + 1);
                    return Ok(InitOutcome::Cancelled);
                }

                *status = self.reader.poll(link)?;
                if status.tcp_force > limit {
                    warn!(
                        "auto initialization aborted: measured force {} N exceeds limit {} N",
                        status.tcp_force, limit
                    );
                    return Ok(InitOutcome::Aborted);
                }
                if self.step_reached(status, step) {
                    break;
                }
                if Instant::now() >= deadline {
                    warn!(
                        "auto init step {}/{} did not converge within {:?}",
                        step + 1,
                        JOINTS,
                        self.step_timeout
                    );
                    return Ok(InitOutcome::Stalled);
                }
            }
        }

        info!("auto initialization completed");
        Ok(InitOutcome::Completed)
    }

    /// 第 0..=step 号关节是否都已在归位角度的公差内
    fn step_reached(&self, status: &Status, step: usize) -> bool {
        (0..=step).all(|j| (status.joint_angles[j] - self.home[j]).abs() <= self.tolerance)
    }
}

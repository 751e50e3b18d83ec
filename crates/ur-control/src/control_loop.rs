//! 顶层控制循环与停机守卫
//!
//! 每个 tick 的步骤顺序是硬性约定（状态先于命令，命令先于引擎）：
//!
//! 1. 反馈连接健康检查，不健康即致命
//! 2. 刷新状态快照，随后运行归位监视器
//! 3. 汇集命令输入；命令源 EOF 则正常收尾
//! 4. 出队至多一条最旧命令，交调度器处理并写出应答
//! 5. 运动引擎步进：正决策发送 movej 并清空输入缓冲，
//!    负决策抑制发送并告警，零决策空转
//! 6. 无条件广播一次状态记录
//! 7. 按配置间隔休眠（停机信号观测到则跳过）
//!
//! 无论从哪条路径退出（正常、信号、致命错误上抛），持有命令通道
//! 的 [`SafingGuard`] 都会在析构时先发低速停止再断电并刷新。

use crate::auto_init::AutoInit;
use crate::config::Config;
use crate::dispatcher;
use crate::error::ControlError;
use crate::home::HomeMonitor;
use crate::inputs::Inputs;
use crate::link::{CommandSink, FeedbackLink};
use crate::motion::{Decision, MotionEngine, MotionInputs};
use crate::publisher::StatusPublisher;
use crate::reader::StatusReader;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};
use ur_protocol::directive::Directive;
use ur_protocol::status::{Status, StatusRecord};

/// 机械臂命令通道的停机守卫
///
/// 命令通道被守卫独占持有，循环内的所有写出都经由守卫。析构时
/// 无条件执行安全序列：`stopj` 低速停止，然后 `power off`，最后
/// 刷新。写失败只能记录，此时已无路可退。
pub struct SafingGuard {
    sink: Box<dyn CommandSink>,
}

impl SafingGuard {
    pub fn new(sink: Box<dyn CommandSink>) -> Self {
        Self { sink }
    }

    /// 访问被守卫的命令通道
    pub fn sink(&mut self) -> &mut dyn CommandSink {
        self.sink.as_mut()
    }
}

impl Drop for SafingGuard {
    fn drop(&mut self) {
        info!("safing the arm: stop + power off");
        if let Err(e) = self.sink.write_line(&Directive::stop().to_string()) {
            error!("failed to issue stop on shutdown: {}", e);
        }
        if let Err(e) = self.sink.write_line(&Directive::power_off().to_string()) {
            error!("failed to issue power off on shutdown: {}", e);
        }
        if let Err(e) = self.sink.flush() {
            error!("failed to flush arm command channel on shutdown: {}", e);
        }
    }
}

/// 顶层控制循环
pub struct ControlLoop {
    config: Config,
    status: Status,
    reader: StatusReader,
    inputs: Inputs,
    motion: MotionInputs,
    engine: Box<dyn MotionEngine>,
    machine: AutoInit,
    monitor: HomeMonitor,
    link: Box<dyn FeedbackLink>,
    publisher: Box<dyn StatusPublisher>,
    ack_out: Box<dyn Write>,
    cancel: Arc<AtomicBool>,
}

impl ControlLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        link: Box<dyn FeedbackLink>,
        publisher: Box<dyn StatusPublisher>,
        inputs: Inputs,
        engine: Box<dyn MotionEngine>,
        ack_out: Box<dyn Write>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let machine = AutoInit::from_config(&config);
        let monitor = HomeMonitor::new(
            machine.home_file(),
            config.arm.home_position_deg,
            config.daemon.home_tolerance_deg,
        );
        Self {
            config,
            status: Status::default(),
            reader: StatusReader::new(),
            inputs,
            motion: MotionInputs::default(),
            engine,
            machine,
            monitor,
            link,
            publisher,
            ack_out,
            cancel,
        }
    }

    /// 命令行 `--init-force-limit` 覆盖
    pub fn set_force_limit(&mut self, limit: f64) {
        self.machine.set_force_limit(limit);
    }

    /// 运行直到停机信号、命令源 EOF 或致命错误
    ///
    /// 命令通道的所有权移交给停机守卫；函数返回（含错误上抛）时
    /// 守卫析构，安全序列保证执行。
    pub fn run(mut self, sink: Box<dyn CommandSink>) -> Result<(), ControlError> {
        let mut guard = SafingGuard::new(sink);
        let result = self.drive(&mut guard);
        match &result {
            Ok(()) => info!("control loop exiting"),
            Err(e) => error!("control loop terminated: {}", e),
        }
        result
    }

    fn drive(&mut self, guard: &mut SafingGuard) -> Result<(), ControlError> {
        let sleep = self.config.sleep_interval();
        let acceleration = self.config.daemon.acceleration;
        let velocity = self.config.daemon.velocity;

        while !self.cancel.load(Ordering::Relaxed) {
            // 1. 反馈连接健康检查
            if !self.link.is_healthy() {
                return Err(ControlError::FeedbackClosed);
            }

            // 2. 状态刷新 + 归位监视
            self.status = self.reader.poll(self.link.as_mut())?;
            if let Err(e) = self.monitor.evaluate(&self.status) {
                warn!("home marker update failed: {}", e);
            }

            // 3. 命令输入
            self.inputs.pump()?;
            if self.inputs.finished() {
                info!("command source reached end of stream");
                break;
            }

            // 4. 每 tick 至多一条命令
            if let Some(line) = self.inputs.pop() {
                let ack = dispatcher::dispatch(
                    &line,
                    &mut self.status,
                    &mut self.machine,
                    &mut self.motion,
                    self.link.as_mut(),
                    guard.sink(),
                    &self.cancel,
                )?;
                writeln!(self.ack_out, "{}", ack)?;
                self.ack_out.flush()?;
            }

            // 5. 运动引擎
            match self.engine.step(&self.motion, &self.status) {
                Decision::Send(target) => {
                    let directive = Directive::MoveJ {
                        target,
                        acceleration,
                        velocity,
                    };
                    debug!("sending {}", directive.in_degrees());
                    guard.sink().write_line(&directive.to_string())?;
                    guard.sink().flush()?;
                    self.motion.clear();
                },
                Decision::WouldCollide => {
                    warn!("command cannot execute as it would cause a collision");
                },
                Decision::Idle => {},
            }

            // 6. 状态广播，每 tick 无条件一次
            let record = StatusRecord::from_status(&self.status).encode();
            self.publisher.publish(&record);

            // 7. tick 间隔
            if !sleep.is_zero() && !self.cancel.load(Ordering::Relaxed) {
                spin_sleep::sleep(sleep);
            }
        }

        Ok(())
    }
}

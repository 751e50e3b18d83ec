//! 命令调度器
//!
//! 把一条命令行映射到命令变体并路由到处理上下文：初始化类命令
//! 交给自动初始化状态机，其余命令由通用执行路径处理（写入运动
//! 原语或直接下发指令）。无论输入多畸形，调度器都不会抛出未处理
//! 的故障：解析失败转换为结构化的错误应答行，循环继续。
//!
//! 应答行里的结果码来自处理器的实际结局，而不是解析器。

use crate::auto_init::{AutoInit, InitOutcome};
use crate::error::ControlError;
use crate::link::{CommandSink, FeedbackLink};
use crate::motion::{MotionInputs, Primitive};
use std::sync::atomic::AtomicBool;
use tracing::{debug, warn};
use ur_protocol::ProtocolError;
use ur_protocol::command::Command;
use ur_protocol::directive::Directive;
use ur_protocol::response::{self, ResponseCode};
use ur_protocol::status::Status;

/// 处理一条命令行，返回应答行
///
/// 只有连接类 / I/O 类故障会以 [`ControlError`] 上抛（致命）；
/// 协议错误与安全中止都折叠进应答行。
pub fn dispatch(
    line: &str,
    status: &mut Status,
    machine: &mut AutoInit,
    motion: &mut MotionInputs,
    link: &mut dyn FeedbackLink,
    sink: &mut dyn CommandSink,
    cancel: &AtomicBool,
) -> Result<String, ControlError> {
    let command = match Command::parse_line(line) {
        Ok(command) => command,
        Err(e @ ProtocolError::UnknownCommand(_)) => {
            warn!("{}", e);
            return Ok(response::error_line(
                line,
                ResponseCode::UnknownCommand,
                &e.to_string(),
            ));
        },
        Err(e) => {
            warn!("{}", e);
            return Ok(response::error_line(
                line,
                ResponseCode::FormatError,
                &e.to_string(),
            ));
        },
    };

    debug!("dispatching command: {}", command.serialise());

    let code = match &command {
        Command::MoveCam {
            pan, tilt, height, ..
        } => {
            motion.set(Primitive::MoveCam {
                pan: *pan,
                tilt: *tilt,
                height: *height,
            });
            ResponseCode::Success
        },
        Command::SetPosition { pose, .. } => {
            motion.set(Primitive::NamedPose(*pose));
            ResponseCode::Success
        },
        Command::SetHome { .. } => {
            // 把当前测量位姿记录为本会话的归位位姿
            motion.set(Primitive::SetHome(status.joint_angles));
            ResponseCode::Success
        },
        Command::Power { state, .. } => {
            sink.write_line(&Directive::Power { state: *state }.to_string())?;
            sink.flush()?;
            ResponseCode::Success
        },
        Command::Brakes { .. } => {
            sink.write_line(&Directive::stop().to_string())?;
            sink.flush()?;
            // 停止命令同时作废未发送的运动原语
            motion.clear();
            ResponseCode::Success
        },
        Command::AutoInit { .. } => {
            let outcome = machine.run(status, link, sink, cancel, None)?;
            outcome_code(outcome)
        },
        Command::AutoInitForce { force_limit, .. } => {
            let outcome = machine.run(status, link, sink, cancel, Some(*force_limit))?;
            outcome_code(outcome)
        },
        Command::JointMove { joint, delta, .. } => {
            motion.set(Primitive::JointNudge {
                joint: *joint,
                delta: *delta,
            });
            ResponseCode::Success
        },
    };

    Ok(response::ack(&command, code))
}

fn outcome_code(outcome: InitOutcome) -> ResponseCode {
    match outcome {
        InitOutcome::Completed => ResponseCode::Success,
        InitOutcome::Aborted => ResponseCode::ForceExceeded,
        InitOutcome::Cancelled => ResponseCode::Cancelled,
        InitOutcome::Stalled => ResponseCode::Rejected,
    }
}

//! UR 机械臂监督控制守护进程主入口
//!
//! 在一个上游命令源（标准输入，一行一条文本命令）和一台机械臂的
//! 原生命令/反馈接口之间工作：解析并调度命令、持续校验状态、
//! 守护碰撞抑制，并在任何退出路径上保证停止 + 断电的安全序列。
//!
//! ```bash
//! socat tcp-listen:9999,reuseaddr \
//!     EXEC:"ur-daemon --id A --config arm.toml \
//!           --robot-arm-host 192.168.0.10 --robot-arm-port 8888 \
//!           --feedback-host 192.168.0.10 --feedback-port 30003 \
//!           --status-port 14000"
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use ur_control::{
    Config, ControlLoop, Inputs, JointSpaceEngine, TcpCommandSink, TcpFeedbackLink,
    TcpStatusPublisher,
};
use ur_protocol::status::{JOINTS, STATUS_RECORD_SIZE};

/// UR 机械臂命令网关守护进程
#[derive(Parser, Debug)]
#[command(name = "ur-daemon")]
#[command(about = "Supervisory control daemon for UR robot arms", long_about = None)]
#[command(version)]
struct Args {
    /// 命令来源标识（只处理该来源的命令行，如 `A,7,set_home;`）
    #[arg(long, required_unless_present = "output_config")]
    id: Option<String>,

    /// 配置文件路径（TOML，见 --output-config）
    #[arg(long, required_unless_present = "output_config")]
    config: Option<PathBuf>,

    /// 机械臂命令通道主机
    #[arg(long, required_unless_present = "output_config")]
    robot_arm_host: Option<String>,

    /// 机械臂命令通道端口
    #[arg(long, required_unless_present = "output_config")]
    robot_arm_port: Option<u16>,

    /// 机械臂反馈通道主机
    #[arg(long, required_unless_present = "output_config")]
    feedback_host: Option<String>,

    /// 机械臂反馈通道端口
    #[arg(long, required_unless_present = "output_config")]
    feedback_port: Option<u16>,

    /// 状态广播监听端口
    #[arg(long, required_unless_present = "output_config")]
    status_port: Option<u16>,

    /// tick 间隔（秒），覆盖配置；0 表示不休眠
    #[arg(long)]
    sleep: Option<f64>,

    /// 自动初始化力限制（牛），覆盖配置
    #[arg(long)]
    init_force_limit: Option<f64>,

    /// 显示发往机械臂的指令（角度制）
    #[arg(short, long)]
    verbose: bool,

    /// 打印默认配置（TOML）后退出
    #[arg(long)]
    output_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("ur_daemon={level}").parse()?)
                .add_directive(format!("ur_control={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.output_config {
        println!("{}", Config::example().to_toml()?);
        return Ok(());
    }

    let config_path = args.config.context("--config is required")?;
    let id = args.id.context("--id is required")?;
    let robot_arm_host = args.robot_arm_host.context("--robot-arm-host is required")?;
    let robot_arm_port = args.robot_arm_port.context("--robot-arm-port is required")?;
    let feedback_host = args.feedback_host.context("--feedback-host is required")?;
    let feedback_port = args.feedback_port.context("--feedback-port is required")?;
    let status_port = args.status_port.context("--status-port is required")?;

    let mut config = Config::load(&config_path)?;
    if let Some(sleep) = args.sleep {
        config.daemon.sleep_secs = sleep;
    }
    config.validate()?;

    for (joint, deg) in config.arm.home_position_deg.iter().enumerate() {
        info!("home joint {} - {} deg", joint, deg);
    }
    info!(
        "status broadcast record: {} bytes (result byte + {} joint angles)",
        STATUS_RECORD_SIZE, JOINTS
    );

    // 停机信号：只置标志，循环协作式退出并执行安全序列
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            eprintln!("\nReceived interrupt signal. Shutting down...");
            cancel.store(true, Ordering::SeqCst);
        })
        .context("failed to set signal handler")?;
    }

    let arm_addr = format!("{robot_arm_host}:{robot_arm_port}");
    info!("connecting to the robot arm command channel: tcp:{}", arm_addr);
    let sink = TcpCommandSink::connect(arm_addr.as_str())
        .with_context(|| format!("failed to connect to tcp:{arm_addr}"))?;

    let feedback_addr = format!("{feedback_host}:{feedback_port}");
    info!("status connection to feedback: tcp:{}", feedback_addr);
    let link = TcpFeedbackLink::connect(feedback_addr.as_str())
        .with_context(|| format!("failed to connect to tcp:{feedback_addr}"))?;

    let publisher = TcpStatusPublisher::bind(status_port)
        .with_context(|| format!("failed to bind status broadcast port {status_port}"))?;

    let inputs = Inputs::from_reader(BufReader::new(std::io::stdin()), Some(id));
    let engine = JointSpaceEngine::from_config(&config);

    let mut control = ControlLoop::new(
        config,
        Box::new(link),
        Box::new(publisher),
        inputs,
        Box::new(engine),
        Box::new(std::io::stdout()),
        Arc::clone(&cancel),
    );
    if let Some(limit) = args.init_force_limit {
        control.set_force_limit(limit);
    }

    info!("ur-daemon started");
    control.run(Box::new(sink))?;
    info!("exiting");
    Ok(())
}

//! 控制循环端到端验证（模拟传输）
//!
//! 覆盖：停机信号下的一次性安全序列、完整性/超时/连接失效的致命
//! 路径、命令按序处理直至 EOF、运动命令的发送与碰撞抑制、每 tick
//! 的状态广播，以及归位标记文件随循环的演化。

use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use ur_control::config::Config;
use ur_control::control_loop::ControlLoop;
use ur_control::error::ControlError;
use ur_control::inputs::Inputs;
use ur_control::mock::{MockCommandSink, MockFeedbackLink, MockStatusPublisher};
use ur_control::motion::JointSpaceEngine;
use ur_protocol::status::{JOINTS, RobotMode, STATUS_RECORD_SIZE, Status};

const SAFE_STOP_LINE: &str = "stopj([0.1,0.1,0.1,0.1,0.1,0.1])";

/// 进程内共享的应答输出缓冲
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn temp_workdir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ur-loop-test-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_config(workdir: &PathBuf) -> Config {
    let mut config = Config::example();
    config.arm.work_directory = workdir.clone();
    config.daemon.sleep_secs = 0.0;
    config
}

fn status(joint_angles: [f64; JOINTS], mode: RobotMode) -> Status {
    Status {
        joint_angles,
        tcp_force: 0.0,
        mode,
        safety_flags: 0,
    }
}

struct LoopHarness {
    config: Config,
    link: MockFeedbackLink,
    sink: MockCommandSink,
    publisher: MockStatusPublisher,
    acks: SharedBuf,
    cancel: Arc<AtomicBool>,
    script: String,
    workdir: PathBuf,
}

impl LoopHarness {
    fn new(tag: &str) -> Self {
        let workdir = temp_workdir(tag);
        Self {
            config: test_config(&workdir),
            link: MockFeedbackLink::new(),
            sink: MockCommandSink::new(),
            publisher: MockStatusPublisher::new(),
            acks: SharedBuf::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            script: String::new(),
            workdir,
        }
    }

    /// 运行循环直至退出，返回循环的结局
    fn run(self) -> (Result<(), ControlError>, MockCommandSink, MockStatusPublisher, SharedBuf, PathBuf)
    {
        let engine = JointSpaceEngine::from_config(&self.config);
        let inputs = Inputs::from_reader(Cursor::new(self.script), None);
        let control = ControlLoop::new(
            self.config,
            Box::new(self.link),
            Box::new(self.publisher.clone()),
            inputs,
            Box::new(engine),
            Box::new(self.acks.clone()),
            Arc::clone(&self.cancel),
        );
        let result = control.run(Box::new(self.sink.clone()));
        (result, self.sink, self.publisher, self.acks, self.workdir)
    }
}

#[test]
fn test_presignalled_shutdown_safes_arm_exactly_once() {
    let harness = LoopHarness::new("presignalled");
    harness.cancel.store(true, Ordering::SeqCst);

    let (result, sink, publisher, _, workdir) = harness.run();
    assert!(result.is_ok());
    // 安全序列恰好一次：先停止后断电
    assert_eq!(sink.lines(), vec![SAFE_STOP_LINE.to_string(), "power off".to_string()]);
    assert!(publisher.records().is_empty());

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_alignment_mismatch_terminates_with_safing() {
    let mut harness = LoopHarness::new("alignment");
    // 声明长度 10，期望 62
    let mut frame = status([0.0; JOINTS], RobotMode::Running).encode();
    frame[..4].copy_from_slice(&10u32.to_be_bytes());
    harness.link.push_frame(frame);

    let (result, sink, _, _, workdir) = harness.run();
    assert!(matches!(result, Err(ControlError::Frame(_))));
    assert_eq!(sink.lines(), vec![SAFE_STOP_LINE.to_string(), "power off".to_string()]);

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_feedback_timeout_terminates_with_safing() {
    let harness = LoopHarness::new("timeout");
    // 没有任何帧送达

    let (result, sink, _, _, workdir) = harness.run();
    assert!(matches!(result, Err(ControlError::FeedbackTimeout(_))));
    assert_eq!(sink.lines().last().unwrap(), "power off");

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_unhealthy_feedback_link_is_fatal() {
    let mut harness = LoopHarness::new("unhealthy");
    harness.link.set_healthy(false);

    let (result, sink, _, _, workdir) = harness.run();
    assert!(matches!(result, Err(ControlError::FeedbackClosed)));
    assert_eq!(sink.lines().last().unwrap(), "power off");

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_commands_processed_in_order_until_eof() {
    let mut harness = LoopHarness::new("in-order");
    let home = harness.config.home_position_rad();
    harness.link.push_status(&status(home, RobotMode::Running));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_home;\nA,2,stop;\n".to_string();

    let (result, sink, _, acks, workdir) = harness.run();
    assert!(result.is_ok());

    let acks = acks.contents();
    let first = acks.find("A,1,set_home,0;").expect("missing set_home ack");
    let second = acks.find("A,2,brakes,0;").expect("missing brakes ack");
    assert!(first < second, "acks out of order: {}", acks);

    // brakes 的 stopj + 退出时的安全序列
    let lines = sink.lines();
    assert_eq!(lines.len(), 3, "lines: {:?}", lines);
    assert_eq!(lines[0], SAFE_STOP_LINE);
    assert_eq!(lines[1], SAFE_STOP_LINE);
    assert_eq!(lines[2], "power off");

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_set_pos_transmits_movej_once() {
    let mut harness = LoopHarness::new("movej-once");
    harness
        .link
        .push_status(&status([0.0; JOINTS], RobotMode::Running));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_pos,giraffe;\n".to_string();

    let (result, sink, _, acks, workdir) = harness.run();
    assert!(result.is_ok());
    assert!(acks.contents().contains("A,1,set_pos,giraffe,0;"));

    // 输入缓冲在发送后清空：movej 恰好一条
    let lines = sink.lines();
    let movej_count = lines.iter().filter(|l| l.starts_with("movej([")).count();
    assert_eq!(movej_count, 1, "lines: {:?}", lines);

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_collision_decision_suppresses_transmission() {
    let mut harness = LoopHarness::new("collision");
    harness
        .link
        .push_status(&status([0.0; JOINTS], RobotMode::Running));
    harness.link.set_repeat_last(true);
    // 步进 100 rad 远超 ±360° 限位
    harness.script = "A,1,initj,0,100;\n".to_string();

    let (result, sink, _, acks, workdir) = harness.run();
    assert!(result.is_ok());
    // 命令本身被接受，抑制发生在引擎决策层
    assert!(acks.contents().contains("A,1,initj,0,100,0;"));
    assert!(sink.lines().iter().all(|l| !l.starts_with("movej([")));

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_status_record_published_each_tick() {
    let mut harness = LoopHarness::new("publish");
    let angles = [0.1, -1.2, 0.3, -0.4, 0.5, -0.6];
    harness.link.push_status(&status(angles, RobotMode::Running));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_home;\n".to_string();

    let (result, _, publisher, _, workdir) = harness.run();
    assert!(result.is_ok());

    let records = publisher.records();
    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(record.len(), STATUS_RECORD_SIZE);
        assert_eq!(record[0], RobotMode::Running as u8);
    }
    let first_angle = f64::from_be_bytes(records[0][1..9].try_into().unwrap());
    assert_eq!(first_angle, angles[0]);

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_home_marker_created_when_running_at_home() {
    let mut harness = LoopHarness::new("marker-created");
    let home = harness.config.home_position_rad();
    harness.link.push_status(&status(home, RobotMode::Running));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_home;\n".to_string();

    let (result, _, _, _, workdir) = harness.run();
    assert!(result.is_ok());
    assert!(workdir.join("ur10.is_home").exists());

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_home_marker_removed_when_running_away() {
    let mut harness = LoopHarness::new("marker-removed");
    let marker = harness.workdir.join("ur10.is_home");
    std::fs::File::create(&marker).unwrap();

    let mut away = harness.config.home_position_rad();
    away[0] += 1.0;
    harness.link.push_status(&status(away, RobotMode::Running));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_home;\n".to_string();

    let (result, _, _, _, workdir) = harness.run();
    assert!(result.is_ok());
    assert!(!marker.exists());

    std::fs::remove_dir_all(workdir).ok();
}

#[test]
fn test_home_marker_untouched_while_not_running() {
    let mut harness = LoopHarness::new("marker-untouched");
    let marker = harness.workdir.join("ur10.is_home");
    std::fs::File::create(&marker).unwrap();

    // 偏离归位但未处于运行态：标记保持上一 tick 的状态
    let mut away = harness.config.home_position_rad();
    away[0] += 1.0;
    harness.link.push_status(&status(away, RobotMode::Ready));
    harness.link.set_repeat_last(true);
    harness.script = "A,1,set_home;\n".to_string();

    let (result, _, _, _, workdir) = harness.run();
    assert!(result.is_ok());
    assert!(marker.exists());

    std::fs::remove_dir_all(workdir).ok();
}

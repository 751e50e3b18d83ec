//! 运动引擎接缝
//!
//! 运动引擎是外部协作者：每个 tick 以累积的运动原语和当前状态
//! 调用一次 `step`，得到一个三值决策：发送、空转、或因碰撞抑制。
//! 核心不关心引擎内部的控制律。
//!
//! 内建的 [`JointSpaceEngine`] 提供一个朴素的关节空间实现：
//! 把原语解析为目标关节角度，越过配置限位的目标一律按碰撞抑制。

use crate::config::Config;
use ur_protocol::command::NamedPose;
use ur_protocol::status::{JOINTS, Status};

/// 命令派生的运动原语
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Primitive {
    /// 无动作
    #[default]
    NoAction,
    /// 相机观察位姿
    MoveCam { pan: f64, tilt: f64, height: f64 },
    /// 命名位姿
    NamedPose(NamedPose),
    /// 单关节步进（相对当前角度）
    JointNudge { joint: u8, delta: f64 },
    /// 以给定角度更新本会话的归位位姿
    SetHome([f64; JOINTS]),
}

/// 运动引擎的累积输入缓冲
///
/// 调度器写入，引擎读取；发送成功后由控制循环清空。
#[derive(Debug, Clone, Default)]
pub struct MotionInputs {
    pub primitive: Primitive,
}

impl MotionInputs {
    pub fn set(&mut self, primitive: Primitive) {
        self.primitive = primitive;
    }

    /// 复位为无动作
    pub fn clear(&mut self) {
        self.primitive = Primitive::NoAction;
    }
}

/// 目标关节角度（弧度）
pub type JointTarget = [f64; JOINTS];

/// 引擎的每 tick 决策
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// 有运动命令待发送
    Send(JointTarget),
    /// 无动作
    Idle,
    /// 目标会导致碰撞，抑制发送
    WouldCollide,
}

/// 运动引擎接口（外部协作者）
pub trait MotionEngine {
    /// 每个 tick 调用一次
    fn step(&mut self, inputs: &MotionInputs, status: &Status) -> Decision;
}

/// 内建关节空间引擎
///
/// 命名位姿来自配置；相机位姿经固定的桅杆几何映射到关节空间；
/// 单关节步进以当前测量角度为基准。
pub struct JointSpaceEngine {
    home: JointTarget,
    giraffe: JointTarget,
    limits_min: [f64; JOINTS],
    limits_max: [f64; JOINTS],
}

impl JointSpaceEngine {
    pub fn from_config(config: &Config) -> Self {
        Self {
            home: config.home_position_rad(),
            giraffe: config.giraffe_position_rad(),
            limits_min: config.arm.joint_limits_deg.min.map(f64::to_radians),
            limits_max: config.arm.joint_limits_deg.max.map(f64::to_radians),
        }
    }

    /// 相机桅杆映射：底座对准 pan，肩部按高度抬升，腕部对准 tilt
    fn camera_pose(&self, pan: f64, tilt: f64, height: f64) -> JointTarget {
        let mut target = self.home;
        target[0] = pan;
        target[1] = self.home[1] + height.clamp(0.0, 1.0) * 0.8;
        target[4] = tilt;
        target
    }

    fn within_limits(&self, target: &JointTarget) -> bool {
        target
            .iter()
            .zip(self.limits_min.iter().zip(self.limits_max.iter()))
            .all(|(angle, (min, max))| angle >= min && angle <= max)
    }
}

impl MotionEngine for JointSpaceEngine {
    fn step(&mut self, inputs: &MotionInputs, status: &Status) -> Decision {
        let target = match inputs.primitive {
            Primitive::NoAction => return Decision::Idle,
            Primitive::SetHome(angles) => {
                self.home = angles;
                return Decision::Idle;
            },
            Primitive::MoveCam { pan, tilt, height } => self.camera_pose(pan, tilt, height),
            Primitive::NamedPose(NamedPose::Home) => self.home,
            Primitive::NamedPose(NamedPose::Giraffe) => self.giraffe,
            Primitive::JointNudge { joint, delta } => {
                let mut target = status.joint_angles;
                target[joint as usize] += delta;
                target
            },
        };

        if self.within_limits(&target) {
            Decision::Send(target)
        } else {
            Decision::WouldCollide
        }
    }
}

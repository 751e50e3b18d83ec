//! 发往机械臂的 ASCII 指令构建
//!
//! 命令通道接受一行一条的 ASCII 指令：
//!
//! ```text
//! movej([j0,j1,j2,j3,j4,j5],a=0.5,v=0.1)
//! stopj([0.1,0.1,0.1,0.1,0.1,0.1])
//! power on
//! power off
//! ```

use crate::command::PowerState;
use crate::status::JOINTS;
use std::fmt;

/// 安全停止的关节减速度（rad/s²）
pub const SAFE_STOP_DECELERATION: [f64; JOINTS] = [0.1; JOINTS];

/// 一条机械臂指令
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// 关节空间移动
    MoveJ {
        /// 目标关节角度（弧度）
        target: [f64; JOINTS],
        /// 加速度（rad/s²）
        acceleration: f64,
        /// 速度（rad/s）
        velocity: f64,
    },
    /// 减速停止
    StopJ { deceleration: [f64; JOINTS] },
    /// 电源开关
    Power { state: PowerState },
}

impl Directive {
    /// 低速安全停止指令
    pub fn stop() -> Self {
        Directive::StopJ {
            deceleration: SAFE_STOP_DECELERATION,
        }
    }

    /// 断电指令
    pub fn power_off() -> Self {
        Directive::Power {
            state: PowerState::Off,
        }
    }

    /// 上电指令
    pub fn power_on() -> Self {
        Directive::Power {
            state: PowerState::On,
        }
    }

    /// movej 指令的角度制调试形式（日志用，不上线）
    pub fn in_degrees(&self) -> String {
        match self {
            Directive::MoveJ {
                target,
                acceleration,
                velocity,
            } => {
                let degrees = target.map(f64::to_degrees);
                format!(
                    "movej([{}],a={},v={})",
                    join_joints(&degrees),
                    acceleration,
                    velocity
                )
            },
            other => other.to_string(),
        }
    }
}

fn join_joints(values: &[f64; JOINTS]) -> String {
    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::MoveJ {
                target,
                acceleration,
                velocity,
            } => write!(
                f,
                "movej([{}],a={},v={})",
                join_joints(target),
                acceleration,
                velocity
            ),
            Directive::StopJ { deceleration } => {
                write!(f, "stopj([{}])", join_joints(deceleration))
            },
            Directive::Power { state } => write!(f, "power {}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movej_serialization() {
        let directive = Directive::MoveJ {
            target: [0.0, -1.5, 0.5, 0.0, 0.25, 0.0],
            acceleration: 0.5,
            velocity: 0.1,
        };
        assert_eq!(
            directive.to_string(),
            "movej([0,-1.5,0.5,0,0.25,0],a=0.5,v=0.1)"
        );
    }

    #[test]
    fn test_stop_serialization() {
        assert_eq!(
            Directive::stop().to_string(),
            "stopj([0.1,0.1,0.1,0.1,0.1,0.1])"
        );
    }

    #[test]
    fn test_power_serialization() {
        assert_eq!(Directive::power_on().to_string(), "power on");
        assert_eq!(Directive::power_off().to_string(), "power off");
    }

    #[test]
    fn test_in_degrees_renders_converted_angles() {
        let directive = Directive::MoveJ {
            target: [std::f64::consts::PI, 0.0, 0.0, 0.0, 0.0, 0.0],
            acceleration: 0.5,
            velocity: 0.1,
        };
        let rendered = directive.in_degrees();
        assert!(rendered.starts_with("movej([1"), "rendered: {}", rendered);
        assert!(rendered.ends_with("],a=0.5,v=0.1)"), "rendered: {}", rendered);
        // 第一个关节按角度制输出（约 180°），不再是弧度
        let first = rendered
            .trim_start_matches("movej([")
            .split(',')
            .next()
            .unwrap()
            .parse::<f64>()
            .unwrap();
        assert!((first - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_in_degrees_passes_through_non_move() {
        assert_eq!(Directive::power_off().in_degrees(), "power off");
    }
}

//! 归位位置监视器
//!
//! 标记文件的存在与否是唯一的持久化状态：存在即表示机械臂位于
//! 归位位姿。仅在机械臂报告运行态时求值；非运行态（上电、抱闸、
//! 初始化中）下关节角度短暂不可信，这时不碰标记文件，避免瞬态
//! 抖动。归位位姿在首次求值时从配置换算并缓存，启动后的配置
//! 变更不生效。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use ur_protocol::status::{JOINTS, Status};

/// 归位位置监视器
pub struct HomeMonitor {
    path: PathBuf,
    home_deg: [f64; JOINTS],
    tolerance: f64,
    home: Option<[f64; JOINTS]>,
}

impl HomeMonitor {
    /// `path` 为标记文件完整路径，`home_deg` 为配置的归位位姿（度），
    /// `tolerance_deg` 为逐关节判定公差（度）
    pub fn new(path: PathBuf, home_deg: [f64; JOINTS], tolerance_deg: f64) -> Self {
        Self {
            path,
            home_deg,
            tolerance: tolerance_deg.to_radians(),
            home: None,
        }
    }

    /// 标记文件路径
    pub fn marker_path(&self) -> &Path {
        &self.path
    }

    /// 依据最新状态更新标记文件
    ///
    /// 运行态且全部关节在公差内：创建（或截断）标记文件；
    /// 运行态且任一关节越出公差：删除标记文件（若存在）；
    /// 非运行态：不做任何事。
    pub fn evaluate(&mut self, status: &Status) -> io::Result<()> {
        if !status.is_running() {
            return Ok(());
        }

        let home = *self
            .home
            .get_or_insert_with(|| self.home_deg.map(f64::to_radians));

        let at_home = status
            .joint_angles
            .iter()
            .zip(home.iter())
            .all(|(angle, target)| (angle - target).abs() <= self.tolerance);

        if at_home {
            fs::File::create(&self.path)?;
        } else {
            match fs::remove_file(&self.path) {
                Ok(()) => {},
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

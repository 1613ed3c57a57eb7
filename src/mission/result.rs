//! 任务结果：循环终止时创建一次，之后不再修改

use serde::{Deserialize, Serialize};

use crate::mission::MissionStatus;

/// 任务终态产物
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionResult {
    pub status: MissionStatus,
    pub objectives_completed: usize,
    pub objectives_total: usize,
    pub duration_ms: u64,
    /// 里程占位（运动控制协作方在本核心范围之外）
    pub distance_m: f64,
    /// 能耗占位
    pub energy_wh: f64,
    /// 面向人读的经验教训
    pub lessons: Vec<String>,
    /// 每次迭代的原始遥测
    pub telemetry: Vec<serde_json::Value>,
}

impl MissionResult {
    /// 目标完成率（0.0..=1.0）
    pub fn completion_ratio(&self) -> f64 {
        if self.objectives_total == 0 {
            0.0
        } else {
            self.objectives_completed as f64 / self.objectives_total as f64
        }
    }
}

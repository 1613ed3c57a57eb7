//! 进度评估器：continue / replan / abort 判定
//!
//! 固定优先级，首个命中即返回。环境与电量是硬停止条件；
//! 人群密集与可恢复的系统故障是软条件，触发自适应行为而非终止。

use crate::mission::{Mission, WorldState};

/// 默认人群阈值：HIGH 优先级行人数超过该值触发 replan
pub const DEFAULT_CROWD_THRESHOLD: usize = 3;

/// 评估结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Replan(String),
    Abort(String),
}

pub struct ProgressEvaluator {
    crowd_threshold: usize,
}

impl ProgressEvaluator {
    pub fn new(crowd_threshold: usize) -> Self {
        Self { crowd_threshold }
    }

    /// 按固定优先级评估：
    /// 1. 人群超阈值 -> replan（可通过重规划化解，不终止）
    /// 2. 风速超限 -> abort
    /// 3. 能见度低于下限 -> abort
    /// 4. 电量低于保底 -> abort（强制返航条件）
    /// 5. 系统错误非空 -> replan
    /// 6. 否则 continue
    pub fn evaluate(&self, mission: &Mission, state: &WorldState) -> Verdict {
        let persons = state.nearby_person_count();
        if persons > self.crowd_threshold {
            return Verdict::Replan(format!(
                "{} high-priority persons nearby exceeds threshold {}",
                persons, self.crowd_threshold
            ));
        }

        let weather = &mission.constraints.weather;
        if state.environment.wind_speed_ms > weather.max_wind_speed_ms {
            return Verdict::Abort(format!(
                "wind speed {:.1} m/s exceeds limit {:.1} m/s",
                state.environment.wind_speed_ms, weather.max_wind_speed_ms
            ));
        }
        if state.environment.visibility_m < weather.min_visibility_m {
            return Verdict::Abort(format!(
                "visibility {:.0}m below minimum {:.0}m",
                state.environment.visibility_m, weather.min_visibility_m
            ));
        }

        if state.health.battery_percent < mission.constraints.battery_reserve_percent {
            return Verdict::Abort(format!(
                "battery {:.1}% below reserve {:.1}%, mandatory return-to-base",
                state.health.battery_percent, mission.constraints.battery_reserve_percent
            ));
        }

        if !state.health.errors.is_empty() {
            return Verdict::Replan(format!(
                "system errors present: {}",
                state.health.errors.join("; ")
            ));
        }

        Verdict::Continue
    }
}

impl Default for ProgressEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_CROWD_THRESHOLD)
    }
}

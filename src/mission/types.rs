//! 任务定义：Mission / Objective / Constraints 与状态机
//!
//! Mission 由外部提交方创建后交给编排器，单次执行独占所有权；
//! Constraints 在任务期间不可变；Objective 的完成标记只由执行器 / 编排器修改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::MissionError;
use crate::mission::world::Position;

/// 任务类型（闭集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionType {
    Delivery,
    Inspection,
    Surveillance,
    Mapping,
    SearchAndRescue,
    Agriculture,
    EnvironmentalMonitoring,
    InfrastructureMonitoring,
    CargoTransport,
    Patrol,
    DataCollection,
    EmergencyResponse,
}

impl MissionType {
    /// kebab-case 名称（用于 pattern 标签与日志）
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionType::Delivery => "delivery",
            MissionType::Inspection => "inspection",
            MissionType::Surveillance => "surveillance",
            MissionType::Mapping => "mapping",
            MissionType::SearchAndRescue => "search-and-rescue",
            MissionType::Agriculture => "agriculture",
            MissionType::EnvironmentalMonitoring => "environmental-monitoring",
            MissionType::InfrastructureMonitoring => "infrastructure-monitoring",
            MissionType::CargoTransport => "cargo-transport",
            MissionType::Patrol => "patrol",
            MissionType::DataCollection => "data-collection",
            MissionType::EmergencyResponse => "emergency-response",
        }
    }
}

/// 执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    Autonomous,
    Supervised,
}

/// 任务状态：Running -> {Replanning -> Running} -> {Completed | Failed | Aborted}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissionStatus {
    Pending,
    Running,
    Replanning,
    Completed,
    Failed,
    Aborted,
}

impl MissionStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionStatus::Completed | MissionStatus::Failed | MissionStatus::Aborted
        )
    }
}

/// 目标优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveKind {
    Primary,
    Secondary,
    Optional,
}

/// 单个任务目标；completed 只由执行器 / 编排器修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub description: String,
    pub kind: ObjectiveKind,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub location: Option<Position>,
    #[serde(default)]
    pub radius_m: Option<f64>,
}

impl Objective {
    pub fn primary(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind: ObjectiveKind::Primary,
            completed: false,
            location: None,
            radius_m: None,
        }
    }
}

/// 天气限制
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherLimits {
    /// 最大可接受风速（m/s）
    #[serde(default = "default_max_wind")]
    pub max_wind_speed_ms: f64,
    /// 最低可接受能见度（米）
    #[serde(default = "default_min_visibility")]
    pub min_visibility_m: f64,
}

fn default_max_wind() -> f64 {
    10.0
}

fn default_min_visibility() -> f64 {
    500.0
}

impl Default for WeatherLimits {
    fn default() -> Self {
        Self {
            max_wind_speed_ms: default_max_wind(),
            min_visibility_m: default_min_visibility(),
        }
    }
}

/// 时间窗
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// 任务约束：执行期间不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    /// 与行人等目标的最小安全距离（米）
    #[serde(default = "default_safety_distance")]
    pub safety_distance_m: f64,
    /// 电量保底百分比，低于即触发强制返航判定
    #[serde(default = "default_battery_reserve")]
    pub battery_reserve_percent: f64,
    #[serde(default)]
    pub min_altitude_m: f64,
    #[serde(default = "default_max_altitude")]
    pub max_altitude_m: f64,
    #[serde(default)]
    pub weather: WeatherLimits,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

fn default_safety_distance() -> f64 {
    5.0
}

fn default_battery_reserve() -> f64 {
    20.0
}

fn default_max_altitude() -> f64 {
    120.0
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            safety_distance_m: default_safety_distance(),
            battery_reserve_percent: default_battery_reserve(),
            min_altitude_m: 0.0,
            max_altitude_m: default_max_altitude(),
            weather: WeatherLimits::default(),
            time_window: None,
        }
    }
}

/// 任务：单次执行独占；状态字段在执行期间由编排器推进
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub name: String,
    pub mission_type: MissionType,
    #[serde(default = "default_mode")]
    pub mode: ExecutionMode,
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default = "default_status")]
    pub status: MissionStatus,
}

fn default_status() -> MissionStatus {
    MissionStatus::Pending
}

fn default_mode() -> ExecutionMode {
    ExecutionMode::Autonomous
}

impl Mission {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mission_type: MissionType,
        objectives: Vec<Objective>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mission_type,
            mode: ExecutionMode::Autonomous,
            objectives,
            constraints: Constraints::default(),
            status: MissionStatus::Pending,
        }
    }

    /// 提交时的同步校验；失败返回 InvalidMission
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.id.trim().is_empty() {
            return Err(MissionError::InvalidMission("empty mission id".into()));
        }
        if self.objectives.is_empty() {
            return Err(MissionError::InvalidMission(
                "mission has no objectives".into(),
            ));
        }
        let c = &self.constraints;
        if !(0.0..=100.0).contains(&c.battery_reserve_percent) {
            return Err(MissionError::InvalidMission(format!(
                "battery reserve {}% out of range",
                c.battery_reserve_percent
            )));
        }
        if c.weather.max_wind_speed_ms <= 0.0 {
            return Err(MissionError::InvalidMission(
                "max wind speed must be positive".into(),
            ));
        }
        if c.weather.min_visibility_m <= 0.0 {
            return Err(MissionError::InvalidMission(
                "min visibility must be positive".into(),
            ));
        }
        if c.max_altitude_m < c.min_altitude_m {
            return Err(MissionError::InvalidMission(
                "altitude bounds out of order".into(),
            ));
        }
        if let Some(w) = &c.time_window {
            if w.end <= w.start {
                return Err(MissionError::InvalidMission(
                    "time window end before start".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn all_objectives_completed(&self) -> bool {
        self.objectives.iter().all(|o| o.completed)
    }

    pub fn completed_objectives(&self) -> usize {
        self.objectives.iter().filter(|o| o.completed).count()
    }

    /// 标记第一个未完成的目标为已完成，返回其 ID
    pub fn complete_next_objective(&mut self) -> Option<String> {
        let obj = self.objectives.iter_mut().find(|o| !o.completed)?;
        obj.completed = true;
        Some(obj.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission_with(objectives: Vec<Objective>) -> Mission {
        Mission::new("m-1", "test", MissionType::Inspection, objectives)
    }

    #[test]
    fn test_validate_rejects_empty_objectives() {
        let m = mission_with(vec![]);
        assert!(matches!(
            m.validate(),
            Err(MissionError::InvalidMission(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_battery_reserve() {
        let mut m = mission_with(vec![Objective::primary("o1", "inspect")]);
        m.constraints.battery_reserve_percent = 150.0;
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_complete_next_objective_in_order() {
        let mut m = mission_with(vec![
            Objective::primary("o1", "first"),
            Objective::primary("o2", "second"),
        ]);
        assert_eq!(m.complete_next_objective().as_deref(), Some("o1"));
        assert_eq!(m.completed_objectives(), 1);
        assert!(!m.all_objectives_completed());
        assert_eq!(m.complete_next_objective().as_deref(), Some("o2"));
        assert!(m.all_objectives_completed());
        assert_eq!(m.complete_next_objective(), None);
    }

    #[test]
    fn test_mission_type_serde_kebab_case() {
        let t: MissionType = serde_json::from_str("\"search-and-rescue\"").unwrap();
        assert_eq!(t, MissionType::SearchAndRescue);
        assert_eq!(t.as_str(), "search-and-rescue");
    }
}

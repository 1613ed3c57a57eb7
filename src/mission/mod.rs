//! 任务数据模型：任务定义、世界状态、动作闭集、终态结果

pub mod action;
pub mod result;
pub mod types;
pub mod world;

pub use action::{Action, ActionResult, PlannedAction};
pub use result::MissionResult;
pub use types::{
    Constraints, ExecutionMode, Mission, MissionStatus, MissionType, Objective, ObjectiveKind,
    TimeWindow, WeatherLimits,
};
pub use world::{
    Environment, ObjectClass, Position, SafetyPriority, TrackedObject, VehicleHealth, Velocity,
    WorldState,
};

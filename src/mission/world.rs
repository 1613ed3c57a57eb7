//! 世界状态快照：位置、健康、环境与跟踪目标
//!
//! WorldState 为不可变快照，每次迭代由 Assessor 新建并整体替换，绝不原地修改。
//! 分类表为固定闭集（大小写不敏感精确匹配），未知类别归入 Unknown。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 位置（WGS84 + 相对高度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

/// 速度向量（m/s）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

/// 感知目标分类（固定闭集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectClass {
    Person,
    Vehicle,
    Bicycle,
    Animal,
    Building,
    Tree,
    Sign,
    TrafficLight,
    Package,
    Equipment,
    Infrastructure,
    Unknown,
}

impl ObjectClass {
    /// 从协作服务返回的类别字符串映射（大小写不敏感精确查表，未命中归 Unknown）
    pub fn from_category(category: &str) -> Self {
        match category.to_lowercase().as_str() {
            "person" => ObjectClass::Person,
            "vehicle" => ObjectClass::Vehicle,
            "bicycle" => ObjectClass::Bicycle,
            "animal" => ObjectClass::Animal,
            "building" => ObjectClass::Building,
            "tree" => ObjectClass::Tree,
            "sign" => ObjectClass::Sign,
            "traffic-light" => ObjectClass::TrafficLight,
            "package" => ObjectClass::Package,
            "equipment" => ObjectClass::Equipment,
            "infrastructure" => ObjectClass::Infrastructure,
            _ => ObjectClass::Unknown,
        }
    }

    /// 安全优先级：person / vehicle -> HIGH，bicycle -> MEDIUM，其余 LOW
    pub fn safety_priority(&self) -> SafetyPriority {
        match self {
            ObjectClass::Person | ObjectClass::Vehicle => SafetyPriority::High,
            ObjectClass::Bicycle => SafetyPriority::Medium,
            _ => SafetyPriority::Low,
        }
    }
}

/// 安全优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SafetyPriority {
    Low,
    Medium,
    High,
}

/// 被跟踪的感知目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: String,
    pub position: Position,
    pub class: ObjectClass,
    pub confidence: f64,
    pub priority: SafetyPriority,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// 历史位置（首元素为首次观测位置）
    pub history: Vec<Position>,
}

/// 载具健康
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleHealth {
    pub battery_percent: f64,
    pub temperature_c: f64,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// 环境读数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub wind_speed_ms: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub visibility_m: f64,
}

/// 世界状态快照（不可变；每次迭代整体替换）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub timestamp: DateTime<Utc>,
    pub position: Position,
    pub velocity: Velocity,
    pub objects: Vec<TrackedObject>,
    pub health: VehicleHealth,
    pub environment: Environment,
}

impl WorldState {
    /// 当前 HIGH 优先级且分类为 Person 的目标
    pub fn persons(&self) -> Vec<&TrackedObject> {
        self.objects
            .iter()
            .filter(|o| o.class == ObjectClass::Person && o.priority == SafetyPriority::High)
            .collect()
    }

    pub fn nearby_person_count(&self) -> usize {
        self.persons().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lookup_case_insensitive() {
        assert_eq!(ObjectClass::from_category("Person"), ObjectClass::Person);
        assert_eq!(ObjectClass::from_category("VEHICLE"), ObjectClass::Vehicle);
        assert_eq!(
            ObjectClass::from_category("Traffic-Light"),
            ObjectClass::TrafficLight
        );
    }

    #[test]
    fn test_unmapped_category_resolves_to_unknown() {
        assert_eq!(ObjectClass::from_category("ufo"), ObjectClass::Unknown);
        assert_eq!(ObjectClass::from_category(""), ObjectClass::Unknown);
    }

    #[test]
    fn test_safety_priority_assignment() {
        assert_eq!(ObjectClass::Person.safety_priority(), SafetyPriority::High);
        assert_eq!(ObjectClass::Vehicle.safety_priority(), SafetyPriority::High);
        assert_eq!(
            ObjectClass::Bicycle.safety_priority(),
            SafetyPriority::Medium
        );
        assert_eq!(ObjectClass::Tree.safety_priority(), SafetyPriority::Low);
        assert_eq!(ObjectClass::Unknown.safety_priority(), SafetyPriority::Low);
    }
}

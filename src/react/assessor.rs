//! 世界状态评估器
//!
//! 每次调用产出一份不可变 WorldState 快照：先取载具遥测（位置 / 健康 / 环境），
//! 再向感知服务请求置信度达标的检测。感知失败降级为空目标列表（感知是参考性的，
//! 不应让评估本身失败）；不在弹性客户端之外做额外重试。

use std::sync::Arc;

use chrono::Utc;

use crate::core::MissionError;
use crate::mission::{ObjectClass, TrackedObject, WorldState};
use crate::services::traits::{GeospatialService, PerceptionService};

/// 默认检测置信度下限
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

pub struct WorldStateAssessor {
    perception: Arc<dyn PerceptionService>,
    geospatial: Arc<dyn GeospatialService>,
    min_confidence: f64,
}

impl WorldStateAssessor {
    pub fn new(
        perception: Arc<dyn PerceptionService>,
        geospatial: Arc<dyn GeospatialService>,
        min_confidence: f64,
    ) -> Self {
        Self {
            perception,
            geospatial,
            min_confidence,
        }
    }

    /// 产出一份新的世界状态快照
    pub async fn assess(&self) -> Result<WorldState, MissionError> {
        let telemetry = self.geospatial.vehicle_telemetry().await?;
        let now = Utc::now();

        let detections = match self
            .perception
            .detect_objects("current", self.min_confidence)
            .await
        {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "perception unavailable, degrading to empty object list");
                Vec::new()
            }
        };

        let objects: Vec<TrackedObject> = detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .map(|d| {
                let class = ObjectClass::from_category(&d.category);
                let position = d.position.unwrap_or(telemetry.position);
                TrackedObject {
                    id: uuid::Uuid::new_v4().to_string(),
                    position,
                    class,
                    confidence: d.confidence,
                    priority: class.safety_priority(),
                    first_seen: now,
                    last_seen: now,
                    history: vec![position],
                }
            })
            .collect();

        Ok(WorldState {
            timestamp: now,
            position: telemetry.position,
            velocity: telemetry.velocity,
            objects,
            health: telemetry.health,
            environment: telemetry.environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::SafetyPriority;
    use crate::services::mock::{FailingPerception, SimulatedGeospatial, SimulatedPerception};

    fn geo() -> Arc<SimulatedGeospatial> {
        Arc::new(SimulatedGeospatial::default())
    }

    #[tokio::test]
    async fn test_assess_maps_detections_to_tracked_objects() {
        let perception = Arc::new(SimulatedPerception::with_detections(vec![
            SimulatedPerception::detection("Person", 0.92),
            SimulatedPerception::detection("bicycle", 0.81),
            SimulatedPerception::detection("hovercraft", 0.99),
        ]));
        let assessor = WorldStateAssessor::new(perception, geo(), DEFAULT_MIN_CONFIDENCE);

        let state = assessor.assess().await.unwrap();
        assert_eq!(state.objects.len(), 3);
        assert_eq!(state.objects[0].class, ObjectClass::Person);
        assert_eq!(state.objects[0].priority, SafetyPriority::High);
        assert_eq!(state.objects[1].class, ObjectClass::Bicycle);
        assert_eq!(state.objects[1].priority, SafetyPriority::Medium);
        // 未映射的类别归 Unknown / LOW
        assert_eq!(state.objects[2].class, ObjectClass::Unknown);
        assert_eq!(state.objects[2].priority, SafetyPriority::Low);
    }

    #[tokio::test]
    async fn test_assess_enforces_confidence_floor() {
        let perception = Arc::new(SimulatedPerception::with_detections(vec![
            SimulatedPerception::detection("person", 0.95),
            SimulatedPerception::detection("person", 0.4),
        ]));
        let assessor = WorldStateAssessor::new(perception, geo(), DEFAULT_MIN_CONFIDENCE);

        let state = assessor.assess().await.unwrap();
        assert_eq!(state.objects.len(), 1);
        assert_eq!(state.nearby_person_count(), 1);
    }

    #[tokio::test]
    async fn test_perception_failure_degrades_to_empty_list() {
        let assessor =
            WorldStateAssessor::new(Arc::new(FailingPerception), geo(), DEFAULT_MIN_CONFIDENCE);

        let state = assessor.assess().await.unwrap();
        assert!(state.objects.is_empty());
        // 快照的其余部分仍然可用
        assert!(state.health.battery_percent > 0.0);
    }
}

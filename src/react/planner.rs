//! 动作规划器
//!
//! 汇总局势（位置、附近行人数、电量、任务类型）与约束文本，
//! 向推理服务提交闭集动作选项并解析其决策。推理失败不做静默兜底：
//! 负责选动作的权威不可用时，本次迭代（进而整个任务）必须失败。

use std::sync::Arc;

use crate::core::MissionError;
use crate::mission::{Action, Mission, PlannedAction, WorldState};
use crate::services::traits::{ReasoningService, SituationSummary};

pub struct ActionPlanner {
    reasoning: Arc<dyn ReasoningService>,
}

impl ActionPlanner {
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self { reasoning }
    }

    /// 约束摘要文本（提交给推理服务）
    fn constraint_text(mission: &Mission) -> String {
        let c = &mission.constraints;
        format!(
            "max altitude {}m, safety distance {}m, battery reserve {}%, max wind {} m/s",
            c.max_altitude_m,
            c.safety_distance_m,
            c.battery_reserve_percent,
            c.weather.max_wind_speed_ms
        )
    }

    /// 规划下一动作；推理失败与闭集外决策均向上传播
    pub async fn plan(
        &self,
        state: &WorldState,
        mission: &Mission,
    ) -> Result<PlannedAction, MissionError> {
        let situation = SituationSummary {
            position: state.position,
            nearby_person_count: state.nearby_person_count(),
            battery_percent: state.health.battery_percent,
            mission_type: mission.mission_type,
        };
        let constraint_text = Self::constraint_text(mission);

        let decision = self
            .reasoning
            .decide(&situation, &Action::ALL, &constraint_text)
            .await?;

        let action = Action::parse(&decision.decision).ok_or_else(|| {
            MissionError::MalformedResponse {
                service: "reasoning".to_string(),
                detail: format!("decision '{}' is not in the action set", decision.decision),
            }
        })?;

        tracing::debug!(
            action = action.as_str(),
            confidence = decision.confidence,
            "planned action"
        );

        Ok(PlannedAction {
            action,
            rationale: decision.reasoning,
            confidence: decision.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionType, Objective};
    use crate::react::assessor::{WorldStateAssessor, DEFAULT_MIN_CONFIDENCE};
    use crate::services::mock::{
        FailingReasoning, SimulatedGeospatial, SimulatedPerception, SimulatedReasoning,
    };

    async fn state() -> WorldState {
        let assessor = WorldStateAssessor::new(
            Arc::new(SimulatedPerception::default()),
            Arc::new(SimulatedGeospatial::default()),
            DEFAULT_MIN_CONFIDENCE,
        );
        assessor.assess().await.unwrap()
    }

    fn mission() -> Mission {
        Mission::new(
            "m-1",
            "patrol",
            MissionType::Patrol,
            vec![Objective::primary("o1", "patrol the area")],
        )
    }

    #[tokio::test]
    async fn test_plan_returns_chosen_action() {
        let planner = ActionPlanner::new(Arc::new(SimulatedReasoning::always(
            Action::ScanForPeople,
        )));
        let planned = planner.plan(&state().await, &mission()).await.unwrap();
        assert_eq!(planned.action, Action::ScanForPeople);
        assert!(planned.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_reasoning_failure_propagates() {
        let planner = ActionPlanner::new(Arc::new(FailingReasoning));
        let result = planner.plan(&state().await, &mission()).await;
        assert!(matches!(
            result,
            Err(MissionError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_decision_outside_action_set_is_malformed() {
        struct OffScriptReasoning;

        #[async_trait::async_trait]
        impl ReasoningService for OffScriptReasoning {
            async fn decide(
                &self,
                _: &SituationSummary,
                _: &[Action],
                _: &str,
            ) -> Result<crate::services::Decision, MissionError> {
                Ok(crate::services::Decision {
                    decision: "teleport-home".to_string(),
                    reasoning: "hallucinated".to_string(),
                    confidence: 0.99,
                })
            }

            async fn classify(
                &self,
                _: &str,
                _: &[String],
            ) -> Result<crate::services::Classification, MissionError> {
                unimplemented!()
            }

            async fn assess_safety(
                &self,
                _: &serde_json::Value,
                _: &str,
            ) -> Result<crate::services::SafetyAssessment, MissionError> {
                unimplemented!()
            }
        }

        let planner = ActionPlanner::new(Arc::new(OffScriptReasoning));
        let result = planner.plan(&state().await, &mission()).await;
        assert!(matches!(
            result,
            Err(MissionError::MalformedResponse { .. })
        ));
    }
}

//! 动作执行器
//!
//! 对动作闭集做穷尽分派；每个处理器完成领域逻辑后通过 MemoryRecorder
//! 向知识库发起尽力而为的写入（写入失败绝不导致任务失败）。
//! return / continue / avoid 属于控制信号，由范围之外的运动控制协作方消费，
//! 此处只产生状态消息。每次执行输出结构化审计日志（JSON）。

use std::sync::Arc;
use std::time::Duration;

use crate::mission::{Action, ActionResult, Mission, PlannedAction, WorldState};
use crate::services::MemoryRecorder;

/// 默认安全暂停时长
pub const DEFAULT_PAUSE_HOLD: Duration = Duration::from_secs(5);

pub struct ActionExecutor {
    recorder: Arc<MemoryRecorder>,
    /// pause-for-safety 的固定保持时长（配置而来，不做计算）
    pause_hold: Duration,
}

impl ActionExecutor {
    pub fn new(recorder: Arc<MemoryRecorder>, pause_hold: Duration) -> Self {
        Self {
            recorder,
            pause_hold,
        }
    }

    /// 执行规划出的动作并返回结果
    pub async fn execute(
        &self,
        planned: &PlannedAction,
        state: &WorldState,
        mission: &Mission,
    ) -> ActionResult {
        let result = match planned.action {
            Action::ContinuePath => ActionResult::ok("continuing on planned path"),
            Action::AvoidObstacle => ActionResult::ok("obstacle avoidance signalled"),
            Action::ReturnToBase => ActionResult::ok("return-to-base signalled"),
            Action::InspectArea => self.inspect_area(state, mission).await,
            Action::CollectData => self.collect_data(state, mission).await,
            Action::DeliverPackage => self.deliver_package(state, mission).await,
            Action::ScanForPeople => self.scan_for_people(state, mission).await,
            Action::PauseForSafety => self.pause_for_safety().await,
            Action::Abort => ActionResult::failed("abort requested by planner"),
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "mission": mission.id,
            "action": planned.action.as_str(),
            "success": result.success,
            "message": result.message,
        });
        tracing::info!(audit = %audit.to_string(), "action");

        result
    }

    async fn inspect_area(&self, state: &WorldState, mission: &Mission) -> ActionResult {
        let payload = serde_json::json!({
            "position": state.position,
            "timestamp": state.timestamp,
            "objects_observed": state.objects.len(),
            "wind_speed_ms": state.environment.wind_speed_ms,
            "visibility_m": state.environment.visibility_m,
        });
        self.recorder
            .document(
                format!("inspection report {}", mission.id),
                payload.to_string(),
                serde_json::json!({ "mission_id": mission.id, "kind": "inspection" }),
            )
            .await;
        ActionResult::ok_with("area inspected", payload)
    }

    async fn collect_data(&self, state: &WorldState, mission: &Mission) -> ActionResult {
        let payload = serde_json::json!({
            "position": state.position,
            "timestamp": state.timestamp,
            "observation_count": state.objects.len(),
            "temperature_c": state.environment.temperature_c,
            "humidity_percent": state.environment.humidity_percent,
        });
        self.recorder
            .episode(
                format!("collected environmental sample for {}: {}", mission.id, payload),
                "data-collection".to_string(),
                0.6,
            )
            .await;
        ActionResult::ok_with("data collected", payload)
    }

    /// 投递前置条件：现场至少有一个 person 分类目标作为收件人；
    /// 缺失按前置条件失败处理（success=false），不是异常
    async fn deliver_package(&self, state: &WorldState, mission: &Mission) -> ActionResult {
        let recipients = state.persons();
        if recipients.is_empty() {
            return ActionResult::failed("no recipient detected at delivery location");
        }
        self.recorder
            .episode(
                format!(
                    "package delivered for mission {} with {} person(s) present",
                    mission.id,
                    recipients.len()
                ),
                "delivery".to_string(),
                0.7,
            )
            .await;
        ActionResult::ok_with(
            "package delivered",
            serde_json::json!({ "recipients_present": recipients.len() }),
        )
    }

    /// 搜寻行人；发现任何人时额外写入重要度 1.0 的 episode（搜救类任务的紧急性）
    async fn scan_for_people(&self, state: &WorldState, mission: &Mission) -> ActionResult {
        let persons = state.persons();
        let detected: Vec<serde_json::Value> = persons
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "position": p.position,
                    "confidence": p.confidence,
                })
            })
            .collect();

        if !persons.is_empty() {
            self.recorder
                .episode(
                    format!(
                        "scan for mission {} found {} person(s)",
                        mission.id,
                        persons.len()
                    ),
                    "person-sighting".to_string(),
                    1.0,
                )
                .await;
        }

        ActionResult::ok_with(
            format!("scan complete, {} person(s) detected", persons.len()),
            serde_json::json!({ "people_detected": detected }),
        )
    }

    async fn pause_for_safety(&self) -> ActionResult {
        tokio::time::sleep(self.pause_hold).await;
        ActionResult::ok(format!(
            "held position for {}ms",
            self.pause_hold.as_millis()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionType, Objective};
    use crate::react::assessor::{WorldStateAssessor, DEFAULT_MIN_CONFIDENCE};
    use crate::services::mock::{InMemoryKnowledgeStore, SimulatedGeospatial, SimulatedPerception};

    fn mission(mission_type: MissionType) -> Mission {
        Mission::new(
            "m-1",
            "test",
            mission_type,
            vec![Objective::primary("o1", "do the thing")],
        )
    }

    fn planned(action: Action) -> PlannedAction {
        PlannedAction {
            action,
            rationale: "test".into(),
            confidence: 0.9,
        }
    }

    async fn state_with(categories: &[(&str, f64)]) -> WorldState {
        let detections = categories
            .iter()
            .map(|(c, conf)| SimulatedPerception::detection(c, *conf))
            .collect();
        let assessor = WorldStateAssessor::new(
            Arc::new(SimulatedPerception::with_detections(detections)),
            Arc::new(SimulatedGeospatial::default()),
            DEFAULT_MIN_CONFIDENCE,
        );
        assessor.assess().await.unwrap()
    }

    fn executor() -> (ActionExecutor, Arc<InMemoryKnowledgeStore>, Arc<MemoryRecorder>) {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let recorder = Arc::new(MemoryRecorder::new(store.clone(), 4));
        (
            ActionExecutor::new(recorder.clone(), Duration::from_millis(10)),
            store,
            recorder,
        )
    }

    #[tokio::test]
    async fn test_deliver_package_without_recipient_fails_precondition() {
        let (exec, store, recorder) = executor();
        let state = state_with(&[("tree", 0.9)]).await;
        let result = exec
            .execute(
                &planned(Action::DeliverPackage),
                &state,
                &mission(MissionType::Delivery),
            )
            .await;
        assert!(!result.success);
        recorder.drain().await;
        assert!(store.episodes().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_package_with_recipient_succeeds() {
        let (exec, store, recorder) = executor();
        let state = state_with(&[("person", 0.95)]).await;
        let result = exec
            .execute(
                &planned(Action::DeliverPackage),
                &state,
                &mission(MissionType::Delivery),
            )
            .await;
        assert!(result.success);
        recorder.drain().await;
        assert_eq!(store.episodes().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_for_people_records_max_importance_episode() {
        let (exec, store, recorder) = executor();
        let state = state_with(&[("person", 0.9), ("person", 0.85)]).await;
        let result = exec
            .execute(
                &planned(Action::ScanForPeople),
                &state,
                &mission(MissionType::SearchAndRescue),
            )
            .await;
        assert!(result.success);
        let people = result.data.unwrap()["people_detected"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(people, 2);

        recorder.drain().await;
        let episodes = store.episodes();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].2, 1.0);
    }

    #[tokio::test]
    async fn test_scan_with_no_people_writes_no_episode() {
        let (exec, store, recorder) = executor();
        let state = state_with(&[("building", 0.9)]).await;
        let result = exec
            .execute(
                &planned(Action::ScanForPeople),
                &state,
                &mission(MissionType::SearchAndRescue),
            )
            .await;
        assert!(result.success);
        recorder.drain().await;
        assert!(store.episodes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_for_safety_holds_fixed_duration() {
        let store = Arc::new(InMemoryKnowledgeStore::new());
        let recorder = Arc::new(MemoryRecorder::new(store, 4));
        let exec = ActionExecutor::new(recorder, Duration::from_secs(5));
        let state = state_with(&[]).await;
        let start = tokio::time::Instant::now();
        let result = exec
            .execute(
                &planned(Action::PauseForSafety),
                &state,
                &mission(MissionType::Patrol),
            )
            .await;
        assert!(result.success);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_abort_returns_failure_without_side_effects() {
        let (exec, store, recorder) = executor();
        let state = state_with(&[]).await;
        let result = exec
            .execute(&planned(Action::Abort), &state, &mission(MissionType::Patrol))
            .await;
        assert!(!result.success);
        recorder.drain().await;
        assert!(store.records().is_empty());
    }
}

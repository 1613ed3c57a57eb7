//! 任务循环集成测试：模拟协作服务驱动完整的 ReAct 循环

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use kestrel::config::AppConfig;
use kestrel::core::{create_mission_loop, MissionError, Services};
use kestrel::mission::{Action, Mission, MissionStatus, MissionType, Objective};
use kestrel::services::mock::{
    FailingReasoning, InMemoryKnowledgeStore, SimulatedGeospatial, SimulatedPerception,
    SimulatedReasoning,
};
use kestrel::services::{KnowledgeStore, PerceptionService, ReasoningService};

struct Harness {
    services: Services,
    store: Arc<InMemoryKnowledgeStore>,
    geo: Arc<SimulatedGeospatial>,
}

fn harness(
    perception: Arc<dyn PerceptionService>,
    reasoning: Arc<dyn ReasoningService>,
) -> Harness {
    let store = Arc::new(InMemoryKnowledgeStore::new());
    let geo = Arc::new(SimulatedGeospatial::default());
    let services = Services {
        perception,
        reasoning,
        knowledge: store.clone() as Arc<dyn KnowledgeStore>,
        geospatial: geo.clone(),
    };
    Harness {
        services,
        store,
        geo,
    }
}

fn scan_mission() -> Mission {
    Mission::new(
        "m-scan",
        "scan area",
        MissionType::SearchAndRescue,
        vec![Objective::primary("o1", "scan area")],
    )
}

#[tokio::test(start_paused = true)]
async fn test_scan_mission_end_to_end() {
    let h = harness(
        Arc::new(SimulatedPerception::with_detections(vec![
            SimulatedPerception::detection("person", 0.9),
            SimulatedPerception::detection("person", 0.85),
        ])),
        Arc::new(SimulatedReasoning::always(Action::ScanForPeople)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, MissionStatus::Completed);
    assert_eq!(result.objectives_completed, 1);
    assert_eq!(result.telemetry.len(), 1);

    // scan-for-people 发现行人 -> 重要度 1.0 的 episode
    let episodes = h.store.episodes();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].2, 1.0);
    assert!(episodes[0].0.contains("2 person(s)"));

    // 终态结果落库，Completed 时额外写入按任务类型打标的成功模式
    assert_eq!(h.store.mission_results().len(), 1);
    assert_eq!(h.store.mission_results()[0].0, "m-scan");
    let patterns = h.store.patterns();
    assert_eq!(patterns.len(), 1);
    assert!(patterns[0].1.contains(&"search-and-rescue".to_string()));
    assert!(patterns[0].1.contains(&"success".to_string()));

    // 未中止：lessons 包含 safety-first 确认与末次观测快照
    assert!(result
        .lessons
        .iter()
        .any(|l| l.contains("safety-first")));
    assert!(result
        .lessons
        .iter()
        .any(|l| l.contains("Final state") && l.contains("2 person(s)")));
}

#[tokio::test(start_paused = true)]
async fn test_precompleted_mission_runs_zero_iterations() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let mut mission = scan_mission();
    for o in &mut mission.objectives {
        o.completed = true;
    }

    let start = tokio::time::Instant::now();
    let result = mission_loop
        .execute_mission(mission, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, MissionStatus::Completed);
    assert!(result.telemetry.is_empty());
    // 近零耗时：暂停时钟下不应有任何迭代延迟
    assert_eq!(start.elapsed(), std::time::Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_never_completing_mission_stops_at_max_iterations() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        // continue-path 不推进目标
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    // 恰好 50 次迭代；状态保持当时值，不强行置 Completed
    assert_eq!(result.telemetry.len(), 50);
    assert_ne!(result.status, MissionStatus::Completed);
    assert_eq!(result.objectives_completed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_deliver_without_recipient_leaves_objective_incomplete() {
    let h = harness(
        // 现场没有 person 分类目标
        Arc::new(SimulatedPerception::with_detections(vec![
            SimulatedPerception::detection("tree", 0.9),
        ])),
        Arc::new(SimulatedReasoning::always(Action::DeliverPackage)),
    );
    let mut cfg = AppConfig::default();
    cfg.mission_loop.max_iterations = 3;
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let mut mission = scan_mission();
    mission.mission_type = MissionType::Delivery;

    let result = mission_loop
        .execute_mission(mission, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.objectives_completed, 0);
    assert_ne!(result.status, MissionStatus::Completed);
    for entry in &result.telemetry {
        assert_eq!(entry["success"], serde_json::json!(false));
    }
}

#[tokio::test(start_paused = true)]
async fn test_wind_breach_aborts_mission() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    h.geo.set_wind(20.0);
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, MissionStatus::Aborted);
    assert_eq!(result.telemetry.len(), 1);
    assert!(result
        .lessons
        .iter()
        .any(|l| l.starts_with("Aborted:") && l.contains("wind")));
    // Abort 不是失败：结果仍然落库
    assert_eq!(h.store.mission_results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_planner_abort_action_terminates_mission() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::Abort)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, MissionStatus::Aborted);
    assert_eq!(result.telemetry.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reasoning_outage_fails_mission_with_wrapped_error() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(FailingReasoning),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let err = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        MissionError::Execution {
            mission_id,
            iteration,
            source,
        } => {
            assert_eq!(mission_id, "m-scan");
            assert_eq!(iteration, 1);
            assert!(matches!(*source, MissionError::ServiceUnavailable(_)));
        }
        e => panic!("expected Execution error, got {:?}", e),
    }

    // 失败路径同样 finalize：结果落库且状态为 Failed
    let results = h.store.mission_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1.status, MissionStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_mission_rejected_synchronously() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let mission = Mission::new("m-bad", "no objectives", MissionType::Patrol, vec![]);
    let err = mission_loop
        .execute_mission(mission, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, MissionError::InvalidMission(_)));
    // 校验失败发生在执行之前，不落库
    assert!(h.store.records().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_mission() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = mission_loop
        .execute_mission(scan_mission(), cancel)
        .await
        .unwrap_err();

    match err {
        MissionError::Execution { source, .. } => {
            assert!(matches!(*source, MissionError::Cancelled));
        }
        e => panic!("expected Execution error, got {:?}", e),
    }
}

#[tokio::test(start_paused = true)]
async fn test_crowding_replans_and_mission_continues() {
    // 4 个 HIGH 行人 > 阈值 3：每轮 replan 而非终止；scan 仍完成目标
    let h = harness(
        Arc::new(SimulatedPerception::with_detections(vec![
            SimulatedPerception::detection("person", 0.9),
            SimulatedPerception::detection("person", 0.9),
            SimulatedPerception::detection("person", 0.9),
            SimulatedPerception::detection("person", 0.9),
        ])),
        Arc::new(SimulatedReasoning::always(Action::ScanForPeople)),
    );
    let cfg = AppConfig::default();
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    // 人群只触发 replan，不阻止任务完成
    assert_eq!(result.status, MissionStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_mission_deadline_aborts() {
    let h = harness(
        Arc::new(SimulatedPerception::default()),
        Arc::new(SimulatedReasoning::always(Action::ContinuePath)),
    );
    let mut cfg = AppConfig::default();
    cfg.mission_loop.max_duration_secs = Some(1);
    let mission_loop = create_mission_loop(&cfg, &h.services);

    let result = mission_loop
        .execute_mission(scan_mission(), CancellationToken::new())
        .await
        .unwrap();

    // 每轮 100ms 节流，暂停时钟下 10 轮后越过 1s 时限
    assert_eq!(result.status, MissionStatus::Aborted);
    assert!(result
        .lessons
        .iter()
        .any(|l| l.contains("deadline")));
    assert!(result.telemetry.len() < 50);
}

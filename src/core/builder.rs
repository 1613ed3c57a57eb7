//! 服务装配：按配置创建协作服务与任务循环
//!
//! 配置了 base_url 的协作方走 HTTP 实现，否则回退为模拟实现（warn 提示），
//! 便于离线运行与测试。ResilientClient 按协作方各建一个并以 Arc 共享，
//! 其熔断状态对所有并发任务生效。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::react::{
    ActionExecutor, ActionPlanner, LoopConfig, MissionLoop, ProgressEvaluator, WorldStateAssessor,
};
use crate::services::http::{HttpGeospatial, HttpKnowledgeStore, HttpPerception, HttpReasoning};
use crate::services::mock::{
    InMemoryKnowledgeStore, SimulatedGeospatial, SimulatedPerception, SimulatedReasoning,
};
use crate::services::{
    GeospatialService, KnowledgeStore, MemoryRecorder, PerceptionService, ReasoningService,
    ResilientClient, RetryPolicy,
};
use crate::mission::Action;

/// 装配好的协作服务集合
pub struct Services {
    pub perception: Arc<dyn PerceptionService>,
    pub reasoning: Arc<dyn ReasoningService>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub geospatial: Arc<dyn GeospatialService>,
}

fn resilient(cfg: &AppConfig, name: &str) -> Arc<ResilientClient> {
    let r = &cfg.resilience;
    Arc::new(ResilientClient::new(
        name,
        RetryPolicy {
            max_attempts: r.max_attempts,
            base_delay: Duration::from_millis(r.base_delay_ms),
            multiplier: r.backoff_multiplier,
        },
        r.failure_threshold,
        Duration::from_secs(r.reset_timeout_secs),
    ))
}

/// 按配置创建协作服务（HTTP 或模拟）
pub fn create_services(cfg: &AppConfig) -> Services {
    let perception: Arc<dyn PerceptionService> = match &cfg.perception.base_url {
        Some(url) => {
            tracing::info!(url, "using HTTP perception service");
            Arc::new(HttpPerception::new(
                url.clone(),
                Duration::from_secs(cfg.perception.timeout_secs),
                resilient(cfg, "perception"),
            ))
        }
        None => {
            tracing::warn!("no perception endpoint configured, using simulated perception");
            Arc::new(SimulatedPerception::default())
        }
    };

    let reasoning: Arc<dyn ReasoningService> = match &cfg.reasoning.base_url {
        Some(url) => {
            tracing::info!(url, "using HTTP reasoning service");
            Arc::new(HttpReasoning::new(
                url.clone(),
                Duration::from_secs(cfg.reasoning.timeout_secs),
                resilient(cfg, "reasoning"),
            ))
        }
        None => {
            tracing::warn!("no reasoning endpoint configured, using simulated reasoning");
            Arc::new(SimulatedReasoning::always(Action::InspectArea))
        }
    };

    let knowledge: Arc<dyn KnowledgeStore> = match &cfg.knowledge.base_url {
        Some(url) => {
            tracing::info!(url, "using HTTP knowledge store");
            Arc::new(HttpKnowledgeStore::new(
                url.clone(),
                Duration::from_secs(cfg.knowledge.timeout_secs),
                resilient(cfg, "knowledge-store"),
            ))
        }
        None => {
            tracing::warn!("no knowledge-store endpoint configured, using in-memory store");
            Arc::new(InMemoryKnowledgeStore::new())
        }
    };

    let geospatial: Arc<dyn GeospatialService> = match &cfg.geospatial.base_url {
        Some(url) => {
            tracing::info!(url, "using HTTP geospatial service");
            Arc::new(HttpGeospatial::new(
                url.clone(),
                Duration::from_secs(cfg.geospatial.timeout_secs),
                resilient(cfg, "geospatial"),
            ))
        }
        None => {
            tracing::warn!("no geospatial endpoint configured, using simulated telemetry");
            Arc::new(SimulatedGeospatial::default())
        }
    };

    Services {
        perception,
        reasoning,
        knowledge,
        geospatial,
    }
}

/// 从服务集合与配置装配任务循环
pub fn create_mission_loop(cfg: &AppConfig, services: &Services) -> MissionLoop {
    let recorder = Arc::new(MemoryRecorder::new(
        services.knowledge.clone(),
        cfg.knowledge.max_in_flight_writes,
    ));

    MissionLoop::new(
        WorldStateAssessor::new(
            services.perception.clone(),
            services.geospatial.clone(),
            cfg.perception.min_confidence,
        ),
        ActionPlanner::new(services.reasoning.clone()),
        ActionExecutor::new(recorder.clone(), cfg.pause_hold()),
        ProgressEvaluator::new(cfg.mission_loop.crowd_threshold),
        recorder,
        LoopConfig {
            max_iterations: cfg.mission_loop.max_iterations,
            pacing: cfg.pacing(),
            max_duration: cfg.mission_loop.max_duration_secs.map(Duration::from_secs),
        },
    )
}

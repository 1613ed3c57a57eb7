//! 模拟协作服务（用于测试与离线运行，无需外部端点）
//!
//! SimulatedPerception 回放预设检测帧；SimulatedReasoning 按规则出决策；
//! InMemoryKnowledgeStore 记录全部写入供断言；SimulatedGeospatial 返回固定遥测。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::MissionError;
use crate::mission::{Action, Environment, MissionResult, Position, VehicleHealth, Velocity};
use crate::services::traits::{
    Classification, Decision, Detection, GeospatialService, KnowledgeStore, PerceptionService,
    ReasoningService, SafetyAssessment, SituationSummary, VehicleTelemetry,
};

/// 模拟感知：每次调用依次回放一帧检测，帧耗尽后重复最后一帧
#[derive(Default)]
pub struct SimulatedPerception {
    frames: Vec<Vec<Detection>>,
    cursor: AtomicUsize,
}

impl SimulatedPerception {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 便捷构造：单帧固定检测
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self::new(vec![detections])
    }

    pub fn detection(category: &str, confidence: f64) -> Detection {
        Detection {
            category: category.to_string(),
            label: category.to_string(),
            confidence,
            bounding_box: None,
            position: None,
        }
    }
}

#[async_trait]
impl PerceptionService for SimulatedPerception {
    async fn detect_objects(
        &self,
        _frame_reference: &str,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, MissionError> {
        if self.frames.is_empty() {
            return Ok(Vec::new());
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let frame = &self.frames[idx.min(self.frames.len() - 1)];
        Ok(frame
            .iter()
            .filter(|d| d.confidence >= min_confidence)
            .cloned()
            .collect())
    }
}

/// 总是失败的感知（验证 Assessor 的降级行为）
pub struct FailingPerception;

#[async_trait]
impl PerceptionService for FailingPerception {
    async fn detect_objects(
        &self,
        _frame_reference: &str,
        _min_confidence: f64,
    ) -> Result<Vec<Detection>, MissionError> {
        Err(MissionError::ServiceUnavailable(
            "perception: simulated outage".into(),
        ))
    }
}

/// 模拟推理：按脚本依次出动作，脚本耗尽后固定返回 fallback
pub struct SimulatedReasoning {
    script: Vec<Action>,
    fallback: Action,
    cursor: AtomicUsize,
}

impl SimulatedReasoning {
    pub fn new(script: Vec<Action>, fallback: Action) -> Self {
        Self {
            script,
            fallback,
            cursor: AtomicUsize::new(0),
        }
    }

    /// 永远返回同一动作
    pub fn always(action: Action) -> Self {
        Self::new(Vec::new(), action)
    }
}

#[async_trait]
impl ReasoningService for SimulatedReasoning {
    async fn decide(
        &self,
        _situation: &SituationSummary,
        _action_options: &[Action],
        _constraint_text: &str,
    ) -> Result<Decision, MissionError> {
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let action = self.script.get(idx).copied().unwrap_or(self.fallback);
        Ok(Decision {
            decision: action.as_str().to_string(),
            reasoning: "scripted decision".to_string(),
            confidence: 0.9,
        })
    }

    async fn classify(
        &self,
        _target: &str,
        categories: &[String],
    ) -> Result<Classification, MissionError> {
        Ok(Classification {
            category: categories.first().cloned().unwrap_or_default(),
            confidence: 0.9,
            reasoning: "scripted classification".to_string(),
            alternatives: Vec::new(),
        })
    }

    async fn assess_safety(
        &self,
        _object: &serde_json::Value,
        _context: &str,
    ) -> Result<SafetyAssessment, MissionError> {
        Ok(SafetyAssessment {
            level: "LOW".to_string(),
            confidence: 0.9,
            reasoning: "scripted assessment".to_string(),
            recommended_actions: Vec::new(),
        })
    }
}

/// 总是不可用的推理（验证规划失败传播）
pub struct FailingReasoning;

#[async_trait]
impl ReasoningService for FailingReasoning {
    async fn decide(
        &self,
        _situation: &SituationSummary,
        _action_options: &[Action],
        _constraint_text: &str,
    ) -> Result<Decision, MissionError> {
        Err(MissionError::ServiceUnavailable(
            "reasoning: simulated outage".into(),
        ))
    }

    async fn classify(
        &self,
        _target: &str,
        _categories: &[String],
    ) -> Result<Classification, MissionError> {
        Err(MissionError::ServiceUnavailable(
            "reasoning: simulated outage".into(),
        ))
    }

    async fn assess_safety(
        &self,
        _object: &serde_json::Value,
        _context: &str,
    ) -> Result<SafetyAssessment, MissionError> {
        Err(MissionError::ServiceUnavailable(
            "reasoning: simulated outage".into(),
        ))
    }
}

/// 知识库写入记录（断言用）
#[derive(Debug, Clone)]
pub enum StoredRecord {
    Episode {
        content: String,
        kind: String,
        importance: f64,
    },
    Document {
        title: String,
        content: String,
        metadata: serde_json::Value,
    },
    Pattern {
        pattern: String,
        context: String,
        confidence: f64,
        tags: Vec<String>,
    },
    MissionResult {
        mission_id: String,
        result: MissionResult,
    },
}

/// 内存知识库：记录所有写入
#[derive(Default)]
pub struct InMemoryKnowledgeStore {
    records: Mutex<Vec<StoredRecord>>,
}

impl InMemoryKnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn episodes(&self) -> Vec<(String, String, f64)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                StoredRecord::Episode {
                    content,
                    kind,
                    importance,
                } => Some((content, kind, importance)),
                _ => None,
            })
            .collect()
    }

    pub fn patterns(&self) -> Vec<(String, Vec<String>)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                StoredRecord::Pattern { pattern, tags, .. } => Some((pattern, tags)),
                _ => None,
            })
            .collect()
    }

    pub fn mission_results(&self) -> Vec<(String, MissionResult)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                StoredRecord::MissionResult { mission_id, result } => {
                    Some((mission_id, result))
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryKnowledgeStore {
    async fn store_episode(
        &self,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<(), MissionError> {
        self.records.lock().unwrap().push(StoredRecord::Episode {
            content: content.to_string(),
            kind: kind.to_string(),
            importance,
        });
        Ok(())
    }

    async fn store_document(
        &self,
        title: &str,
        content: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MissionError> {
        self.records.lock().unwrap().push(StoredRecord::Document {
            title: title.to_string(),
            content: content.to_string(),
            metadata,
        });
        Ok(())
    }

    async fn store_pattern(
        &self,
        pattern: &str,
        context: &str,
        confidence: f64,
        tags: &[String],
    ) -> Result<(), MissionError> {
        self.records.lock().unwrap().push(StoredRecord::Pattern {
            pattern: pattern.to_string(),
            context: context.to_string(),
            confidence,
            tags: tags.to_vec(),
        });
        Ok(())
    }

    async fn store_mission_result(
        &self,
        mission_id: &str,
        result: &MissionResult,
    ) -> Result<(), MissionError> {
        self.records
            .lock()
            .unwrap()
            .push(StoredRecord::MissionResult {
                mission_id: mission_id.to_string(),
                result: result.clone(),
            });
        Ok(())
    }
}

/// 总是失败的知识库（验证写入失败不影响任务）
pub struct FailingKnowledgeStore;

#[async_trait]
impl KnowledgeStore for FailingKnowledgeStore {
    async fn store_episode(&self, _: &str, _: &str, _: f64) -> Result<(), MissionError> {
        Err(MissionError::ServiceUnavailable(
            "knowledge-store: simulated outage".into(),
        ))
    }

    async fn store_document(
        &self,
        _: &str,
        _: &str,
        _: serde_json::Value,
    ) -> Result<(), MissionError> {
        Err(MissionError::ServiceUnavailable(
            "knowledge-store: simulated outage".into(),
        ))
    }

    async fn store_pattern(
        &self,
        _: &str,
        _: &str,
        _: f64,
        _: &[String],
    ) -> Result<(), MissionError> {
        Err(MissionError::ServiceUnavailable(
            "knowledge-store: simulated outage".into(),
        ))
    }

    async fn store_mission_result(
        &self,
        _: &str,
        _: &MissionResult,
    ) -> Result<(), MissionError> {
        Err(MissionError::ServiceUnavailable(
            "knowledge-store: simulated outage".into(),
        ))
    }
}

/// 模拟地理遥测：固定位置，可定制健康 / 环境
pub struct SimulatedGeospatial {
    telemetry: Mutex<VehicleTelemetry>,
}

impl Default for SimulatedGeospatial {
    fn default() -> Self {
        Self::new(VehicleTelemetry {
            position: Position {
                lat: 31.2304,
                lon: 121.4737,
                alt_m: 50.0,
            },
            velocity: Velocity::default(),
            health: VehicleHealth {
                battery_percent: 95.0,
                temperature_c: 32.0,
                errors: Vec::new(),
            },
            environment: Environment {
                wind_speed_ms: 3.0,
                temperature_c: 24.0,
                humidity_percent: 55.0,
                visibility_m: 8000.0,
            },
        })
    }
}

impl SimulatedGeospatial {
    pub fn new(telemetry: VehicleTelemetry) -> Self {
        Self {
            telemetry: Mutex::new(telemetry),
        }
    }

    /// 调整电量（测试低电量判定）
    pub fn set_battery(&self, percent: f64) {
        self.telemetry.lock().unwrap().health.battery_percent = percent;
    }

    /// 调整风速（测试天气判定）
    pub fn set_wind(&self, wind_speed_ms: f64) {
        self.telemetry.lock().unwrap().environment.wind_speed_ms = wind_speed_ms;
    }

    /// 调整能见度
    pub fn set_visibility(&self, visibility_m: f64) {
        self.telemetry.lock().unwrap().environment.visibility_m = visibility_m;
    }

    /// 注入系统错误
    pub fn set_errors(&self, errors: Vec<String>) {
        self.telemetry.lock().unwrap().health.errors = errors;
    }
}

#[async_trait]
impl GeospatialService for SimulatedGeospatial {
    async fn vehicle_telemetry(&self) -> Result<VehicleTelemetry, MissionError> {
        Ok(self.telemetry.lock().unwrap().clone())
    }
}

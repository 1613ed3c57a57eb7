//! 外部协作服务接口
//!
//! 四个协作方（感知 / 推理 / 知识库 / 地理）均以窄异步 trait 表达，
//! 内部实现不在本核心范围内。所有载荷为显式 serde 结构，在边界处校验。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::MissionError;
use crate::mission::{
    Action, Environment, MissionResult, MissionType, Position, VehicleHealth, Velocity,
};

/// 感知检测框
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 单条目标检测
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub category: String,
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    /// 目标位置估计；缺省时 Assessor 回退为载具当前位置
    #[serde(default)]
    pub position: Option<Position>,
}

/// 感知协作方：目标检测
#[async_trait]
pub trait PerceptionService: Send + Sync {
    /// 返回置信度不低于 min_confidence 的检测；不可用时由调用侧降级处理
    async fn detect_objects(
        &self,
        frame_reference: &str,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, MissionError>;
}

/// 提交给推理服务的局势摘要
#[derive(Debug, Clone, Serialize)]
pub struct SituationSummary {
    pub position: Position,
    pub nearby_person_count: usize,
    pub battery_percent: f64,
    pub mission_type: MissionType,
}

/// 推理服务的决策响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub decision: String,
    pub reasoning: String,
    pub confidence: f64,
}

/// 分类响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

/// 安全评估响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub level: String,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
}

/// 推理协作方：决策 / 分类 / 安全评估（昂贵的外部推理，超时以十秒计）
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn decide(
        &self,
        situation: &SituationSummary,
        action_options: &[Action],
        constraint_text: &str,
    ) -> Result<Decision, MissionError>;

    async fn classify(
        &self,
        target: &str,
        categories: &[String],
    ) -> Result<Classification, MissionError>;

    async fn assess_safety(
        &self,
        object: &serde_json::Value,
        context: &str,
    ) -> Result<SafetyAssessment, MissionError>;
}

/// 知识库协作方：所有写入对核心而言 fire-and-forget，失败只记日志
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn store_episode(
        &self,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<(), MissionError>;

    async fn store_document(
        &self,
        title: &str,
        content: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MissionError>;

    async fn store_pattern(
        &self,
        pattern: &str,
        context: &str,
        confidence: f64,
        tags: &[String],
    ) -> Result<(), MissionError>;

    async fn store_mission_result(
        &self,
        mission_id: &str,
        result: &MissionResult,
    ) -> Result<(), MissionError>;
}

/// 载具遥测（位置 / 速度 / 健康 / 环境）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    pub position: Position,
    pub velocity: Velocity,
    pub health: VehicleHealth,
    pub environment: Environment,
}

/// 地理协作方：薄透传；参考实现允许固定 / 模拟位置
#[async_trait]
pub trait GeospatialService: Send + Sync {
    async fn vehicle_telemetry(&self) -> Result<VehicleTelemetry, MissionError>;
}

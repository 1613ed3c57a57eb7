//! 协作服务的 HTTP 实现（reqwest）
//!
//! 每个服务持有独立的 reqwest::Client（按服务配置超时：感知短、推理长）
//! 与按服务共享的 ResilientClient。响应先以 JSON Value 过弹性层，
//! 成功后再按显式 schema 反序列化，形状非法归为 MalformedResponse（瞬态类）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::MissionError;
use crate::mission::{Action, MissionResult};
use crate::services::resilient::{CallError, ResilientClient};
use crate::services::traits::{
    Classification, Decision, Detection, GeospatialService, KnowledgeStore, PerceptionService,
    ReasoningService, SafetyAssessment, SituationSummary, VehicleTelemetry,
};

/// 响应体预览上限（错误消息用）
const BODY_PREVIEW_CHARS: usize = 200;

fn classify_reqwest_error(e: reqwest::Error) -> CallError {
    if e.is_timeout() {
        CallError::Timeout
    } else {
        CallError::Network(e.to_string())
    }
}

/// 发送 JSON 请求并按状态码分类；2xx 返回原始 JSON Value
async fn send_json(
    http: &reqwest::Client,
    method: reqwest::Method,
    url: &str,
    body: Option<&serde_json::Value>,
) -> Result<serde_json::Value, CallError> {
    let mut request = http.request(method, url);
    if let Some(b) = body {
        request = request.json(b);
    }
    let response = request.send().await.map_err(classify_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
        return Err(CallError::Status {
            code: status.as_u16(),
            message: preview,
        });
    }
    response
        .json::<serde_json::Value>()
        .await
        .map_err(classify_reqwest_error)
}

/// 弹性调用 + schema 校验：传输 / 重试由 ResilientClient 负责，
/// 反序列化失败归为 MalformedResponse
async fn call<T: DeserializeOwned>(
    resilient: &ResilientClient,
    service: &str,
    http: &reqwest::Client,
    method: reqwest::Method,
    url: String,
    body: Option<serde_json::Value>,
) -> Result<T, MissionError> {
    let value = resilient
        .execute(|| send_json(http, method.clone(), &url, body.as_ref()))
        .await?;
    serde_json::from_value(value).map_err(|e| MissionError::MalformedResponse {
        service: service.to_string(),
        detail: e.to_string(),
    })
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// 感知服务 HTTP 客户端
pub struct HttpPerception {
    base_url: String,
    http: reqwest::Client,
    resilient: Arc<ResilientClient>,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    frame_reference: &'a str,
    min_confidence: f64,
}

#[derive(Deserialize)]
struct DetectResponse {
    detections: Vec<Detection>,
}

impl HttpPerception {
    pub fn new(base_url: impl Into<String>, timeout: Duration, resilient: Arc<ResilientClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http: build_http(timeout),
            resilient,
        }
    }
}

#[async_trait]
impl PerceptionService for HttpPerception {
    async fn detect_objects(
        &self,
        frame_reference: &str,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, MissionError> {
        let body = serde_json::to_value(DetectRequest {
            frame_reference,
            min_confidence,
        })
        .expect("detect request is serializable");
        let response: DetectResponse = call(
            &self.resilient,
            "perception",
            &self.http,
            reqwest::Method::POST,
            format!("{}/v1/detect", self.base_url),
            Some(body),
        )
        .await?;
        Ok(response.detections)
    }
}

/// 推理服务 HTTP 客户端
pub struct HttpReasoning {
    base_url: String,
    http: reqwest::Client,
    resilient: Arc<ResilientClient>,
}

impl HttpReasoning {
    pub fn new(base_url: impl Into<String>, timeout: Duration, resilient: Arc<ResilientClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http: build_http(timeout),
            resilient,
        }
    }
}

#[async_trait]
impl ReasoningService for HttpReasoning {
    async fn decide(
        &self,
        situation: &SituationSummary,
        action_options: &[Action],
        constraint_text: &str,
    ) -> Result<Decision, MissionError> {
        let body = serde_json::json!({
            "situation": situation,
            "action_options": action_options.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
            "constraints": constraint_text,
        });
        call(
            &self.resilient,
            "reasoning",
            &self.http,
            reqwest::Method::POST,
            format!("{}/v1/decide", self.base_url),
            Some(body),
        )
        .await
    }

    async fn classify(
        &self,
        target: &str,
        categories: &[String],
    ) -> Result<Classification, MissionError> {
        let body = serde_json::json!({ "target": target, "categories": categories });
        call(
            &self.resilient,
            "reasoning",
            &self.http,
            reqwest::Method::POST,
            format!("{}/v1/classify", self.base_url),
            Some(body),
        )
        .await
    }

    async fn assess_safety(
        &self,
        object: &serde_json::Value,
        context: &str,
    ) -> Result<SafetyAssessment, MissionError> {
        let body = serde_json::json!({ "object": object, "context": context });
        call(
            &self.resilient,
            "reasoning",
            &self.http,
            reqwest::Method::POST,
            format!("{}/v1/assess-safety", self.base_url),
            Some(body),
        )
        .await
    }
}

/// 知识库 HTTP 客户端
pub struct HttpKnowledgeStore {
    base_url: String,
    http: reqwest::Client,
    resilient: Arc<ResilientClient>,
}

impl HttpKnowledgeStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration, resilient: Arc<ResilientClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http: build_http(timeout),
            resilient,
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), MissionError> {
        // 写接口只关心是否 2xx，忽略响应体内容
        let _: serde_json::Value = call(
            &self.resilient,
            "knowledge-store",
            &self.http,
            reqwest::Method::POST,
            format!("{}{}", self.base_url, path),
            Some(body),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn store_episode(
        &self,
        content: &str,
        kind: &str,
        importance: f64,
    ) -> Result<(), MissionError> {
        self.post(
            "/v1/episodes",
            serde_json::json!({ "content": content, "kind": kind, "importance": importance }),
        )
        .await
    }

    async fn store_document(
        &self,
        title: &str,
        content: &str,
        metadata: serde_json::Value,
    ) -> Result<(), MissionError> {
        self.post(
            "/v1/documents",
            serde_json::json!({ "title": title, "content": content, "metadata": metadata }),
        )
        .await
    }

    async fn store_pattern(
        &self,
        pattern: &str,
        context: &str,
        confidence: f64,
        tags: &[String],
    ) -> Result<(), MissionError> {
        self.post(
            "/v1/patterns",
            serde_json::json!({
                "pattern": pattern,
                "context": context,
                "confidence": confidence,
                "tags": tags,
            }),
        )
        .await
    }

    async fn store_mission_result(
        &self,
        mission_id: &str,
        result: &MissionResult,
    ) -> Result<(), MissionError> {
        self.post(
            &format!("/v1/missions/{}/result", mission_id),
            serde_json::to_value(result).expect("mission result is serializable"),
        )
        .await
    }
}

/// 地理服务 HTTP 客户端
pub struct HttpGeospatial {
    base_url: String,
    http: reqwest::Client,
    resilient: Arc<ResilientClient>,
}

impl HttpGeospatial {
    pub fn new(base_url: impl Into<String>, timeout: Duration, resilient: Arc<ResilientClient>) -> Self {
        Self {
            base_url: base_url.into(),
            http: build_http(timeout),
            resilient,
        }
    }
}

#[async_trait]
impl GeospatialService for HttpGeospatial {
    async fn vehicle_telemetry(&self) -> Result<VehicleTelemetry, MissionError> {
        call(
            &self.resilient,
            "geospatial",
            &self.http,
            reqwest::Method::GET,
            format!("{}/v1/telemetry", self.base_url),
            None,
        )
        .await
    }
}

//! 任务错误类型与分类
//!
//! 分类口径：InvalidMission 在执行前同步拒绝；Client 为不可重试的 4xx 类失败；
//! ServiceUnavailable / BreakerOpen / MalformedResponse 同属瞬态服务错误；
//! Execution 包装单次迭代内的任何失败（携带任务 ID 与迭代号）。
//! Abort 判定不是错误，是正常的终止状态（MissionStatus::Aborted）。

use thiserror::Error;

/// 任务执行过程中可能出现的错误（校验、外部服务、迭代失败、取消）
#[derive(Error, Debug)]
pub enum MissionError {
    /// 任务定义不合法，提交时同步拒绝
    #[error("Invalid mission: {0}")]
    InvalidMission(String),

    /// 4xx 类客户端错误：立即失败，不消耗重试预算，不影响熔断器
    #[error("Client error ({status}): {message}")]
    Client { status: u16, message: String },

    /// 重试预算耗尽后的服务错误
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 熔断器打开，快速失败（未发起传输）
    #[error("Circuit breaker open for {0}")]
    BreakerOpen(String),

    /// 协作服务返回了无法解析的响应形状
    #[error("Malformed response from {service}: {detail}")]
    MalformedResponse { service: String, detail: String },

    /// 单次迭代内的失败，终止整个任务（状态置 Failed）
    #[error("Mission {mission_id} failed at iteration {iteration}: {source}")]
    Execution {
        mission_id: String,
        iteration: usize,
        #[source]
        source: Box<MissionError>,
    },

    /// 操作员取消
    #[error("Cancelled")]
    Cancelled,
}

impl MissionError {
    /// 是否属于瞬态服务错误（重试耗尽 / 熔断打开 / 响应形状非法）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MissionError::ServiceUnavailable(_)
                | MissionError::BreakerOpen(_)
                | MissionError::MalformedResponse { .. }
        )
    }
}

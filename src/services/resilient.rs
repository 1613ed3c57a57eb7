//! 弹性客户端：超时分类 + 指数退避重试 + 熔断
//!
//! 包装单个外部协作服务的调用：4xx 类失败立即上抛（不消耗重试预算，
//! 对熔断器记为传输层成功——服务器已响应）；
//! 5xx / 超时 / 网络失败按 base * multiplier^(attempt-1) 退避重试，
//! 预算耗尽后以 ServiceUnavailable 上抛；每次可重试失败计入熔断器。

use std::future::Future;
use std::time::Duration;

use crate::core::MissionError;
use crate::services::breaker::CircuitBreaker;

/// 传输层调用失败分类
#[derive(Debug, Clone)]
pub enum CallError {
    /// HTTP 状态类失败；4xx 不可重试，5xx 可重试
    Status { code: u16, message: String },
    /// 单次调用超时
    Timeout,
    /// 连接 / 传输失败
    Network(String),
}

impl CallError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::Status { code, .. } => *code >= 500,
            CallError::Timeout | CallError::Network(_) => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            CallError::Status { code, message } => format!("status {}: {}", code, message),
            CallError::Timeout => "timeout".to_string(),
            CallError::Network(msg) => format!("network: {}", msg),
        }
    }
}

/// 重试策略：attempt 从 1 起，第 n 次失败后延迟 base * multiplier^(n-1)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次失败后、下一次尝试前的延迟
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.base_delay.mul_f64(factor)
    }
}

/// 单个协作服务的弹性客户端；实例按服务共享（Arc），熔断状态对所有并发任务生效
pub struct ResilientClient {
    name: String,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ResilientClient {
    pub fn new(
        name: impl Into<String>,
        retry: RetryPolicy,
        failure_threshold: u32,
        reset_timeout: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            breaker: CircuitBreaker::new(name.clone(), failure_threshold, reset_timeout),
            name,
            retry,
        }
    }

    /// 执行一次受保护的调用。op 每次尝试都会被重新调用。
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, MissionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let mut last_error: Option<CallError> = None;

        for attempt in 1..=self.retry.max_attempts {
            let permit = self.breaker.try_acquire()?;

            match op().await {
                Ok(value) => {
                    permit.success();
                    return Ok(value);
                }
                // 4xx 类：立即上抛。服务器已响应，传输层对熔断器而言是成功，
                // HALF_OPEN 探测遇到 4xx 同样收口回 CLOSED 而不是卡住
                Err(CallError::Status { code, message }) if code < 500 => {
                    permit.success();
                    return Err(MissionError::Client {
                        status: code,
                        message,
                    });
                }
                Err(e) => {
                    permit.failure();
                    tracing::warn!(
                        service = %self.name,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e.describe(),
                        "retryable call failure"
                    );
                    let is_last = attempt == self.retry.max_attempts;
                    last_error = Some(e);
                    if !is_last {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        let detail = last_error
            .map(|e| e.describe())
            .unwrap_or_else(|| "no attempt made".to_string());
        Err(MissionError::ServiceUnavailable(format!(
            "{}: {} attempts exhausted, last error: {}",
            self.name, self.retry.max_attempts, detail
        )))
    }

    /// 健康检查：单次轻量调用，任何失败归结为 false，绝不上抛
    pub async fn health_check<F, Fut>(&self, probe: F) -> bool
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), CallError>>,
    {
        let Ok(permit) = self.breaker.try_acquire() else {
            return false;
        };
        match probe().await {
            Ok(()) => {
                permit.success();
                true
            }
            Err(e) => {
                if e.is_retryable() {
                    permit.failure();
                } else {
                    // 4xx：服务器可达，传输层健康
                    permit.success();
                }
                false
            }
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

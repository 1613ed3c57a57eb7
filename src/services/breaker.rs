//! 熔断器：CLOSED -> OPEN -> HALF_OPEN -> {CLOSED | OPEN}
//!
//! 状态按协作服务实例共享（多个并发任务调用同一服务时共用一个熔断器），
//! 转换由互斥锁保护。计时使用 tokio::time::Instant，测试可用暂停时钟快进。
//! try_acquire 返回 RAII 许可：调用方以 success / failure 结束本次调用；
//! 许可被丢弃（如调用 future 中途取消）时归还 HALF_OPEN 探测槽位，
//! 保证 HALF_OPEN 总能回到 CLOSED 或 OPEN，不会卡死。

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::core::MissionError;

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// HALF_OPEN 探测是否已被占用（只放行一个调用）
    probe_in_flight: bool,
}

/// 每个协作服务一个熔断器实例
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

/// 单次调用的放行许可；success / failure 记录结果，
/// 两者都未调用就丢弃时归还探测槽位（状态与计数不变）
#[must_use = "call success() or failure() to record the outcome"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    completed: bool,
}

impl CallPermit<'_> {
    /// 传输层成功（含服务器已响应的 4xx）：CLOSED 清零计数；
    /// HALF_OPEN 探测成功 -> 回到 CLOSED
    pub fn success(mut self) {
        self.completed = true;
        self.breaker.record_success();
    }

    /// 可重试失败：CLOSED 累计到阈值 -> OPEN；HALF_OPEN 探测失败 -> 重新 OPEN 并重开窗口
    pub fn failure(mut self) {
        self.completed = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.release_probe();
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            reset_timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// 调用前申请放行：OPEN 且未到重置窗口 -> 快速失败（不发起传输）；
    /// OPEN 且窗口已过 -> 转 HALF_OPEN 放行唯一探测；HALF_OPEN 探测占用中 -> 快速失败
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, MissionError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed() >= self.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    tracing::info!(breaker = %self.name, "circuit breaker half-open, probing");
                    Ok(())
                } else {
                    Err(MissionError::BreakerOpen(self.name.clone()))
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(MissionError::BreakerOpen(self.name.clone()))
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
        .map(|()| CallPermit {
            breaker: self,
            completed: false,
        })
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen {
            tracing::info!(breaker = %self.name, "circuit breaker closed after probe");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.probe_in_flight = false;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::HalfOpen | BreakerState::Open => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
            }
        }
    }

    /// 探测未记录结果即被放弃：归还槽位，让下一个调用可以继续探测
    fn release_probe(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().unwrap().consecutive_failures
    }
}

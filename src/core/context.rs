//! 执行上下文：单次任务执行独占的全部可变状态
//!
//! 并发执行多个任务时每个执行各持一份上下文，编排器上不存在共享的
//! 「当前任务」可变字段；取消令牌由操作员侧触发，循环在每次迭代顶部检查。

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::mission::{Mission, WorldState};

pub struct ExecutionContext {
    pub mission: Mission,
    /// 最近一次观测的世界状态；每次迭代整体替换
    pub world: Option<WorldState>,
    /// 当前迭代号（从 1 起）
    pub iteration: usize,
    pub started: Instant,
    pub cancel: CancellationToken,
    /// Abort 判定的原因（终止时写入 lessons）
    pub abort_reason: Option<String>,
    /// 每次迭代的原始遥测记录
    pub telemetry: Vec<serde_json::Value>,
}

impl ExecutionContext {
    pub fn new(mission: Mission, cancel: CancellationToken) -> Self {
        Self {
            mission,
            world: None,
            iteration: 0,
            started: Instant::now(),
            cancel,
            abort_reason: None,
            telemetry: Vec::new(),
        }
    }
}

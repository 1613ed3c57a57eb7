//! 任务主循环
//!
//! Assess -> Plan -> Act -> Observe -> Evaluate，受最大迭代数约束；
//! replan 记录原因后继续（重规划机制属于运动规划协作方），abort 置 Aborted 并退出。
//! 单次迭代内任何未处理失败立即终止整个任务：状态置 Failed，
//! 向调用方抛出携带任务 ID 与迭代号的包装错误；迭代本身不做重试。

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::{ExecutionContext, MissionError};
use crate::mission::{Action, Mission, MissionResult, MissionStatus};
use crate::react::{ActionExecutor, ActionPlanner, ProgressEvaluator, Verdict, WorldStateAssessor};
use crate::services::MemoryRecorder;

/// 主循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 最大迭代数，防止任务无限运行
    pub max_iterations: usize,
    /// 迭代间节流延迟，避免压垮协作服务
    pub pacing: Duration,
    /// 可选的任务级时限（超过即以 deadline 原因 Abort）
    pub max_duration: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            pacing: Duration::from_millis(100),
            max_duration: None,
        }
    }
}

/// 单次迭代的推进结论
enum StepOutcome {
    /// 继续下一轮
    Next,
    /// 终止：Abort 判定或规划器选择了 abort 动作
    Aborted(String),
}

/// 任务循环编排器：服务实例按协作方共享，任务状态全部在 ExecutionContext 内
pub struct MissionLoop {
    assessor: WorldStateAssessor,
    planner: ActionPlanner,
    executor: ActionExecutor,
    evaluator: ProgressEvaluator,
    recorder: Arc<MemoryRecorder>,
    config: LoopConfig,
}

impl MissionLoop {
    pub fn new(
        assessor: WorldStateAssessor,
        planner: ActionPlanner,
        executor: ActionExecutor,
        evaluator: ProgressEvaluator,
        recorder: Arc<MemoryRecorder>,
        config: LoopConfig,
    ) -> Self {
        Self {
            assessor,
            planner,
            executor,
            evaluator,
            recorder,
            config,
        }
    }

    /// 执行一个任务直至终态。校验失败同步拒绝；
    /// 迭代失败置 Failed 并在 finalize 之后抛出包装错误。
    pub async fn execute_mission(
        &self,
        mission: Mission,
        cancel: CancellationToken,
    ) -> Result<MissionResult, MissionError> {
        mission.validate()?;

        let mut ctx = ExecutionContext::new(mission, cancel);
        ctx.mission.status = MissionStatus::Running;
        tracing::info!(
            mission = %ctx.mission.id,
            mission_type = ctx.mission.mission_type.as_str(),
            objectives = ctx.mission.objectives.len(),
            "mission started"
        );

        let loop_result = self.run_loop(&mut ctx).await;

        match loop_result {
            Ok(()) => {
                let result = self.finalize(&mut ctx).await;
                tracing::info!(
                    mission = %ctx.mission.id,
                    status = ?result.status,
                    completed = result.objectives_completed,
                    total = result.objectives_total,
                    "mission finished"
                );
                Ok(result)
            }
            Err(e) => {
                ctx.mission.status = MissionStatus::Failed;
                let wrapped = MissionError::Execution {
                    mission_id: ctx.mission.id.clone(),
                    iteration: ctx.iteration,
                    source: Box::new(e),
                };
                tracing::error!(mission = %ctx.mission.id, error = %wrapped, "mission failed");
                let _ = self.finalize(&mut ctx).await;
                Err(wrapped)
            }
        }
    }

    async fn run_loop(&self, ctx: &mut ExecutionContext) -> Result<(), MissionError> {
        loop {
            if ctx.cancel.is_cancelled() {
                return Err(MissionError::Cancelled);
            }
            if let Some(limit) = self.config.max_duration {
                if ctx.started.elapsed() >= limit {
                    ctx.mission.status = MissionStatus::Aborted;
                    ctx.abort_reason = Some("mission deadline exceeded".to_string());
                    return Ok(());
                }
            }

            // 停止条件：目标全部完成，或状态已进入 Aborted / Failed
            if ctx.mission.all_objectives_completed() {
                ctx.mission.status = MissionStatus::Completed;
                return Ok(());
            }
            if matches!(
                ctx.mission.status,
                MissionStatus::Aborted | MissionStatus::Failed
            ) {
                return Ok(());
            }
            if ctx.iteration >= self.config.max_iterations {
                // 状态保持现值，不强行置 Completed
                tracing::warn!(
                    mission = %ctx.mission.id,
                    max_iterations = self.config.max_iterations,
                    "iteration budget exhausted"
                );
                return Ok(());
            }

            ctx.iteration += 1;
            match self.run_iteration(ctx).await? {
                StepOutcome::Next => {}
                StepOutcome::Aborted(reason) => {
                    ctx.mission.status = MissionStatus::Aborted;
                    ctx.abort_reason = Some(reason);
                    return Ok(());
                }
            }

            tokio::time::sleep(self.config.pacing).await;
        }
    }

    /// 单次迭代：Assess -> Plan -> Act -> Observe -> Evaluate
    async fn run_iteration(&self, ctx: &mut ExecutionContext) -> Result<StepOutcome, MissionError> {
        let state = self.assessor.assess().await?;
        let planned = self.planner.plan(&state, &ctx.mission).await?;
        let result = self.executor.execute(&planned, &state, &ctx.mission).await;

        if result.success && planned.action.advances_objective() {
            if let Some(id) = ctx.mission.complete_next_objective() {
                tracing::info!(mission = %ctx.mission.id, objective = %id, "objective completed");
            }
        }

        // Observe：重新评估，更新保存的世界状态
        let observed = self.assessor.assess().await?;

        ctx.telemetry.push(serde_json::json!({
            "iteration": ctx.iteration,
            "action": planned.action.as_str(),
            "success": result.success,
            "message": result.message,
            "confidence": planned.confidence,
            "battery_percent": observed.health.battery_percent,
            "nearby_persons": observed.nearby_person_count(),
        }));
        let verdict = self.evaluator.evaluate(&ctx.mission, &observed);
        ctx.world = Some(observed);

        // 规划器选择 abort：编排器负责终态转换，不再交给评估器
        if planned.action == Action::Abort {
            return Ok(StepOutcome::Aborted(if planned.rationale.is_empty() {
                "abort chosen by planner".to_string()
            } else {
                planned.rationale.clone()
            }));
        }

        match verdict {
            Verdict::Continue => Ok(StepOutcome::Next),
            Verdict::Replan(reason) => {
                self.replan(ctx, &reason).await;
                Ok(StepOutcome::Next)
            }
            Verdict::Abort(reason) => Ok(StepOutcome::Aborted(reason)),
        }
    }

    /// 重规划步骤：记录原因；轨迹级重规划属于运动规划协作方，此处无其它动作
    async fn replan(&self, ctx: &mut ExecutionContext, reason: &str) {
        ctx.mission.status = MissionStatus::Replanning;
        tracing::info!(
            mission = %ctx.mission.id,
            iteration = ctx.iteration,
            reason,
            "replanning"
        );
        ctx.mission.status = MissionStatus::Running;
    }

    /// 终结：计算结果、沉淀教训、落库（尽力而为），Completed 时额外写入成功模式
    async fn finalize(&self, ctx: &mut ExecutionContext) -> MissionResult {
        let duration = ctx.started.elapsed();
        let completed = ctx.mission.completed_objectives();
        let total = ctx.mission.objectives.len();

        let mut lessons = vec![
            format!("Completed {}/{} objectives", completed, total),
            format!(
                "Used {} of {} iterations",
                ctx.iteration, self.config.max_iterations
            ),
        ];
        match &ctx.abort_reason {
            Some(reason) => lessons.push(format!("Aborted: {}", reason)),
            None => lessons.push("Maintained safety-first posture throughout".to_string()),
        }
        // 末次观测快照进入教训，供提交方复盘终态环境
        if let Some(world) = &ctx.world {
            lessons.push(format!(
                "Final state: battery {:.1}%, wind {:.1} m/s, {} person(s) nearby",
                world.health.battery_percent,
                world.environment.wind_speed_ms,
                world.nearby_person_count()
            ));
        }

        let result = MissionResult {
            status: ctx.mission.status,
            objectives_completed: completed,
            objectives_total: total,
            duration_ms: duration.as_millis() as u64,
            distance_m: 0.0,
            energy_wh: 0.0,
            lessons,
            telemetry: std::mem::take(&mut ctx.telemetry),
        };

        self.recorder
            .mission_result(ctx.mission.id.clone(), result.clone())
            .await;

        if ctx.mission.status == MissionStatus::Completed {
            self.recorder
                .pattern(
                    format!(
                        "mission completed: {}/{} objectives in {} iterations",
                        completed, total, ctx.iteration
                    ),
                    ctx.mission.name.clone(),
                    result.completion_ratio(),
                    vec![
                        ctx.mission.mission_type.as_str().to_string(),
                        "success".to_string(),
                    ],
                )
                .await;
        }

        self.recorder.drain().await;
        result
    }
}

//! ReAct 任务循环：评估、规划、执行、评估进度与主循环编排

pub mod assessor;
pub mod evaluator;
pub mod executor;
pub mod loop_;
pub mod planner;

pub use assessor::WorldStateAssessor;
pub use evaluator::{ProgressEvaluator, Verdict};
pub use executor::ActionExecutor;
pub use loop_::{LoopConfig, MissionLoop};
pub use planner::ActionPlanner;

//! 核心层：错误分类、执行上下文、服务装配

pub mod builder;
pub mod context;
pub mod error;

pub use builder::{create_mission_loop, create_services, Services};
pub use context::ExecutionContext;
pub use error::MissionError;

//! 外部协作服务层：弹性客户端、熔断器、服务接口与实现

pub mod breaker;
pub mod http;
pub mod mock;
pub mod recorder;
pub mod resilient;
pub mod traits;

pub use breaker::{BreakerState, CallPermit, CircuitBreaker};
pub use recorder::MemoryRecorder;
pub use resilient::{CallError, ResilientClient, RetryPolicy};
pub use traits::{
    BoundingBox, Classification, Decision, Detection, GeospatialService, KnowledgeStore,
    PerceptionService, ReasoningService, SafetyAssessment, SituationSummary, VehicleTelemetry,
};

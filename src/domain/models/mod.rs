//! Domain models for the zflow AI task service.

pub mod ai_task;
pub mod analytics;
pub mod config;
pub mod requests;
pub mod task;

pub use ai_task::{
    ensure_transition, sanitize_string_list, trim_optional, AiTask, AiTaskMode, AiTaskStatus,
    AiTaskType, EnrichedAiTask, ExecutionResult, Guardrails, StatusChange, TaskMetadata,
    TaskPriority,
};
pub use analytics::{AiTaskStatistics, CostAnalysis};
pub use config::{Config, DatabaseConfig, LimitsConfig, LoggingConfig};
pub use requests::{
    BatchCreateRequest, BatchExecutionOptions, BatchItemError, BatchResult, CostEstimateRequest,
    CreateAiTaskRequest, ExecutionContext, GuardrailsInput, UpdateAiTaskRequest,
};
pub use task::Task;

//! zflow - AI task lifecycle service
//!
//! zflow is a personal productivity journal. This crate implements its AI
//! task service: delegating work to AI agents, moving tasks through their
//! status lifecycle, retrying and cancelling them, running batches, and
//! accounting for cost.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Task models, repository ports and errors
//! - **Adapters** (`adapters`): `SQLite` implementations of the ports
//! - **Service Layer** (`services`): Validation, lifecycle rules, cost accounting
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use zflow::adapters::sqlite::{initialize_database, SqliteAiTaskRepository, SqliteTaskRepository};
//! use zflow::services::AiTaskService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = initialize_database("sqlite:.zflow/zflow.db", None).await?;
//!     let service = AiTaskService::new(
//!         "local",
//!         Arc::new(SqliteAiTaskRepository::new(pool.clone())),
//!         Arc::new(SqliteTaskRepository::new(pool)),
//!     );
//!     let stats = service.get_task_statistics().await?;
//!     println!("{} tasks", stats.total);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AiTask, AiTaskMode, AiTaskStatus, AiTaskType, Config, CreateAiTaskRequest, EnrichedAiTask,
    Task, TaskPriority, UpdateAiTaskRequest,
};
pub use domain::ports::{AiTaskFilter, AiTaskRepository, TaskRepository};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AiTaskService, ApiResponse};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AiTask, AiTaskStatistics, AiTaskStatus, AiTaskType, ExecutionResult};

/// Filters for querying AI tasks
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AiTaskFilter {
    pub agent_id: Option<String>,
    pub status: Option<AiTaskStatus>,
    pub task_type: Option<AiTaskType>,
    pub task_id: Option<Uuid>,
    pub is_local_task: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AiTaskFilter {
    /// Same filter without pagination.
    pub fn unpaged(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

/// One page of AI tasks plus the count of all matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiTaskPage {
    pub tasks: Vec<AiTask>,
    pub total: u64,
}

/// Status change applied atomically by [`AiTaskRepository::update_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Status the row must still hold for the write to apply
    pub from: AiTaskStatus,
    pub to: AiTaskStatus,
    /// Replaces the stored execution result when present
    pub result: Option<ExecutionResult>,
    pub reason: Option<String>,
}

/// Repository port for AI task persistence
///
/// Every call is scoped to a user; a task owned by someone else is
/// indistinguishable from a missing one.
#[async_trait]
pub trait AiTaskRepository: Send + Sync {
    /// Filtered, paginated query with the total match count
    async fn find_advanced(&self, user_id: &str, filter: &AiTaskFilter) -> DomainResult<AiTaskPage>;

    /// Get a task by ID
    async fn find_by_user_and_id(&self, user_id: &str, id: Uuid) -> DomainResult<Option<AiTask>>;

    /// Insert a new task
    async fn create(&self, user_id: &str, task: &AiTask) -> DomainResult<AiTask>;

    /// Replace a task's mutable fields if its version still matches.
    ///
    /// Fails with `ConcurrencyConflict` when the stored version moved on.
    async fn update(&self, user_id: &str, task: &AiTask) -> DomainResult<AiTask>;

    /// Change status if the stored status still equals `update.from`,
    /// appending a history entry in the same statement.
    async fn update_status(&self, user_id: &str, id: Uuid, update: &StatusUpdate) -> DomainResult<AiTask>;

    /// Delete a task by ID
    async fn delete(&self, user_id: &str, id: Uuid) -> DomainResult<()>;

    /// Counts by status and type, cost totals and completion rate
    async fn statistics(&self, user_id: &str) -> DomainResult<AiTaskStatistics>;
}

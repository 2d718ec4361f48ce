use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;

/// Repository port for the regular tasks AI tasks link to
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task
    async fn create(&self, task: &Task) -> DomainResult<()>;

    /// Get a task owned by `user_id`
    async fn find_by_user_and_id(&self, user_id: &str, id: Uuid) -> DomainResult<Option<Task>>;
}

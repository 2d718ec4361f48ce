use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use zflow::adapters::sqlite::{create_migrated_test_pool, SqliteAiTaskRepository, SqliteTaskRepository};
use zflow::domain::models::{CreateAiTaskRequest, Task};
use zflow::domain::ports::TaskRepository;
use zflow::services::AiTaskService;

pub const TEST_USER: &str = "test-user";

pub type TestService = AiTaskService<SqliteAiTaskRepository, SqliteTaskRepository>;

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database with migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Service scoped to [`TEST_USER`] plus the id of one regular task that AI
/// tasks can hang off.
pub async fn setup_service() -> (TestService, Uuid, SqlitePool) {
    let pool = setup_test_db().await;
    let task_repo = Arc::new(SqliteTaskRepository::new(pool.clone()));

    let parent = Task::new(TEST_USER, "Parent task");
    task_repo
        .create(&parent)
        .await
        .expect("failed to create parent task");

    let service = AiTaskService::new(
        TEST_USER,
        Arc::new(SqliteAiTaskRepository::new(pool.clone())),
        task_repo,
    );
    (service, parent.id, pool)
}

/// A minimal valid create request.
pub fn create_request(task_id: Uuid, objective: &str) -> CreateAiTaskRequest {
    CreateAiTaskRequest::new(task_id, "research-agent", objective, "analysis")
}

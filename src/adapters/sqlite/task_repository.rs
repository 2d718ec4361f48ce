//! SQLite implementation of the TaskRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Task;
use crate::domain::ports::TaskRepository;

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        task.validate()?;

        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_user_and_id(&self, user_id: &str, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Task::try_from).transpose()
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_create_and_find_scoped_by_user() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteTaskRepository::new(pool);
        let task = Task::new("user-1", "Plan the week").with_description("Sunday review");

        repo.create(&task).await.unwrap();

        let found = repo.find_by_user_and_id("user-1", task.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Plan the week");
        assert_eq!(found.description.as_deref(), Some("Sunday review"));
        assert!(repo.find_by_user_and_id("user-2", task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteTaskRepository::new(pool);
        let err = repo.create(&Task::new("user-1", " ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

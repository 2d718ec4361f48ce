//! Regular task CLI commands.
//!
//! Regular tasks are what AI tasks hang off; only the operations needed to
//! create and inspect them are exposed.

use anyhow::Result;
use clap::{Args, Subcommand};
use uuid::Uuid;

use super::open_database;
use crate::adapters::sqlite::SqliteTaskRepository;
use crate::cli::output::respond_result;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, Task};
use crate::domain::ports::TaskRepository;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a regular task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show a regular task
    Show {
        /// Task ID
        id: Uuid,
    },
}

fn render_task(task: &Task) -> String {
    let mut lines = vec![
        format!("Task: {}", task.title),
        format!("ID: {}", task.id),
        format!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ];
    if let Some(description) = &task.description {
        lines.push(format!("Description: {description}"));
    }
    lines.join("\n")
}

async fn add_task(
    repo: &impl TaskRepository,
    user_id: &str,
    title: String,
    description: Option<String>,
) -> DomainResult<Task> {
    let mut task = Task::new(user_id, title);
    if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
        task = task.with_description(description.trim());
    }
    repo.create(&task).await?;
    Ok(task)
}

async fn show_task(repo: &impl TaskRepository, user_id: &str, id: Uuid) -> DomainResult<Task> {
    repo.find_by_user_and_id(user_id, id)
        .await?
        .ok_or_else(|| DomainError::not_found("Task", id))
}

pub async fn execute(args: TaskArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let repo = SqliteTaskRepository::new(pool);
    let user_id = config.user_id.as_str();

    match args.command {
        TaskCommands::Add { title, description } => {
            let result = add_task(&repo, user_id, title, description).await;
            respond_result(result, json_mode, |task| {
                format!("Task created: {}\n{}", task.id, render_task(task))
            })
        }
        TaskCommands::Show { id } => {
            respond_result(show_task(&repo, user_id, id).await, json_mode, render_task)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_add_then_show() {
        let repo = SqliteTaskRepository::new(create_migrated_test_pool().await.unwrap());

        let created = add_task(&repo, "local", "  Plan sprint ".to_string(), Some("  ".to_string()))
            .await
            .unwrap();
        assert_eq!(created.title, "Plan sprint");
        assert!(created.description.is_none());

        let shown = show_task(&repo, "local", created.id).await.unwrap();
        assert_eq!(shown.id, created.id);
    }

    #[tokio::test]
    async fn test_show_is_scoped_to_user() {
        let repo = SqliteTaskRepository::new(create_migrated_test_pool().await.unwrap());
        let created = add_task(&repo, "alice", "Mine".to_string(), None).await.unwrap();

        let err = show_task(&repo, "bob", created.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_rejects_blank_title() {
        let repo = SqliteTaskRepository::new(create_migrated_test_pool().await.unwrap());
        let err = add_task(&repo, "local", "   ".to_string(), None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

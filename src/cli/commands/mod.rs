//! CLI command implementations.

pub mod ai;
pub mod init;
pub mod task;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteAiTaskRepository, SqliteTaskRepository,
};
use crate::domain::models::Config;
use crate::services::AiTaskService;

/// The service as wired by the CLI.
pub type SqliteAiTaskService = AiTaskService<SqliteAiTaskRepository, SqliteTaskRepository>;

/// Open the configured database, applying any pending migrations.
pub async fn open_database(config: &Config) -> Result<SqlitePool> {
    initialize_database(
        &database_url(&config.database.path),
        Some(PoolConfig::from(&config.database)),
    )
    .await
    .context("Failed to initialize database. Run 'zflow init' first.")
}

/// Build the AI task service for the configured user.
pub fn build_service(pool: &SqlitePool, config: &Config) -> SqliteAiTaskService {
    AiTaskService::new(
        config.user_id.clone(),
        Arc::new(SqliteAiTaskRepository::new(pool.clone())),
        Arc::new(SqliteTaskRepository::new(pool.clone())),
    )
    .with_limits(config.limits)
}

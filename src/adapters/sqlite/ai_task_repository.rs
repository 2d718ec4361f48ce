//! SQLite implementation of the AiTaskRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_json_or_default, parse_optional_datetime, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AiTask, AiTaskMode, AiTaskStatistics, AiTaskStatus, AiTaskType, ExecutionResult, StatusChange,
};
use crate::domain::ports::{AiTaskFilter, AiTaskPage, AiTaskRepository, StatusUpdate};

const ENTITY: &str = "AI task";

#[derive(Clone)]
pub struct SqliteAiTaskRepository {
    pool: SqlitePool,
}

impl SqliteAiTaskRepository {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, user_id: &str, id: Uuid) -> DomainResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM ai_tasks WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Explain a conditional write that touched no rows.
    async fn missed_write(&self, user_id: &str, id: Uuid) -> DomainError {
        match self.exists(user_id, id).await {
            Ok(true) => DomainError::ConcurrencyConflict {
                entity: ENTITY.to_string(),
                id: id.to_string(),
            },
            Ok(false) => DomainError::not_found(ENTITY, id),
            Err(e) => e,
        }
    }

    async fn fetch_required(&self, user_id: &str, id: Uuid) -> DomainResult<AiTask> {
        self.find_by_user_and_id(user_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }
}

/// Append the `WHERE` clause shared by the page and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: &str, filter: &AiTaskFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id.to_string());

    if let Some(agent_id) = &filter.agent_id {
        qb.push(" AND agent_id = ").push_bind(agent_id.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(task_type) = filter.task_type {
        qb.push(" AND task_type = ").push_bind(task_type.as_str());
    }
    if let Some(task_id) = filter.task_id {
        qb.push(" AND task_id = ").push_bind(task_id.to_string());
    }
    if let Some(is_local) = filter.is_local_task {
        qb.push(" AND is_local_task = ").push_bind(is_local);
    }
}

#[async_trait]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
impl AiTaskRepository for SqliteAiTaskRepository {
    async fn find_advanced(&self, user_id: &str, filter: &AiTaskFilter) -> DomainResult<AiTaskPage> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM ai_tasks");
        push_filters(&mut count_qb, user_id, filter);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM ai_tasks");
        push_filters(&mut qb, user_id, filter);
        qb.push(" ORDER BY created_at DESC, id");
        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                qb.push(" LIMIT ").push_bind(limit.max(0));
                qb.push(" OFFSET ").push_bind(offset.unwrap_or(0).max(0));
            }
            (None, Some(offset)) => {
                qb.push(" LIMIT -1 OFFSET ").push_bind(offset.max(0));
            }
            (None, None) => {}
        }

        let rows: Vec<AiTaskRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let tasks = rows
            .into_iter()
            .map(AiTask::try_from)
            .collect::<DomainResult<Vec<_>>>()?;

        debug!(user_id, total, returned = tasks.len(), "queried ai tasks");
        Ok(AiTaskPage {
            tasks,
            total: total as u64,
        })
    }

    async fn find_by_user_and_id(&self, user_id: &str, id: Uuid) -> DomainResult<Option<AiTask>> {
        let row: Option<AiTaskRow> = sqlx::query_as("SELECT * FROM ai_tasks WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(AiTask::try_from).transpose()
    }

    async fn create(&self, user_id: &str, task: &AiTask) -> DomainResult<AiTask> {
        task.validate()?;
        let mut task = task.clone();
        task.user_id = user_id.to_string();

        sqlx::query(
            r#"INSERT INTO ai_tasks (id, user_id, task_id, agent_id, objective, deliverables, context,
               acceptance_criteria, task_type, mode, status, dependencies, due_at, guardrails, metadata,
               estimated_cost_usd, actual_cost_usd, estimated_duration_min, execution_result, history,
               is_local_task, executor_workspace_id, created_at, updated_at, version)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.id.to_string())
        .bind(&task.user_id)
        .bind(task.task_id.map(|id| id.to_string()))
        .bind(&task.agent_id)
        .bind(&task.objective)
        .bind(&task.deliverables)
        .bind(&task.context)
        .bind(&task.acceptance_criteria)
        .bind(task.task_type.as_str())
        .bind(task.mode.as_str())
        .bind(task.status.as_str())
        .bind(serde_json::to_string(&task.dependencies)?)
        .bind(task.due_at.as_ref().map(format_datetime))
        .bind(serde_json::to_string(&task.guardrails)?)
        .bind(serde_json::to_string(&task.metadata)?)
        .bind(task.estimated_cost_usd)
        .bind(task.actual_cost_usd)
        .bind(task.estimated_duration_min)
        .bind(task.execution_result.as_ref().map(serde_json::to_string).transpose()?)
        .bind(serde_json::to_string(&task.history)?)
        .bind(task.is_local_task)
        .bind(&task.executor_workspace_id)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .bind(task.version as i64)
        .execute(&self.pool)
        .await?;

        debug!(task_id = %task.id, user_id, "inserted ai task");
        Ok(task)
    }

    async fn update(&self, user_id: &str, task: &AiTask) -> DomainResult<AiTask> {
        let mut updated = task.clone();
        updated.updated_at = Utc::now();
        updated.version = task.version + 1;

        let result = sqlx::query(
            r#"UPDATE ai_tasks SET task_id = ?, agent_id = ?, objective = ?, deliverables = ?,
               context = ?, acceptance_criteria = ?, task_type = ?, mode = ?, status = ?,
               dependencies = ?, due_at = ?, guardrails = ?, metadata = ?, estimated_cost_usd = ?,
               actual_cost_usd = ?, estimated_duration_min = ?, execution_result = ?, history = ?,
               is_local_task = ?, executor_workspace_id = ?, updated_at = ?, version = ?
               WHERE user_id = ? AND id = ? AND version = ?"#,
        )
        .bind(updated.task_id.map(|id| id.to_string()))
        .bind(&updated.agent_id)
        .bind(&updated.objective)
        .bind(&updated.deliverables)
        .bind(&updated.context)
        .bind(&updated.acceptance_criteria)
        .bind(updated.task_type.as_str())
        .bind(updated.mode.as_str())
        .bind(updated.status.as_str())
        .bind(serde_json::to_string(&updated.dependencies)?)
        .bind(updated.due_at.as_ref().map(format_datetime))
        .bind(serde_json::to_string(&updated.guardrails)?)
        .bind(serde_json::to_string(&updated.metadata)?)
        .bind(updated.estimated_cost_usd)
        .bind(updated.actual_cost_usd)
        .bind(updated.estimated_duration_min)
        .bind(updated.execution_result.as_ref().map(serde_json::to_string).transpose()?)
        .bind(serde_json::to_string(&updated.history)?)
        .bind(updated.is_local_task)
        .bind(&updated.executor_workspace_id)
        .bind(format_datetime(&updated.updated_at))
        .bind(updated.version as i64)
        .bind(user_id)
        .bind(task.id.to_string())
        .bind(task.version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write(user_id, task.id).await);
        }

        Ok(updated)
    }

    async fn update_status(&self, user_id: &str, id: Uuid, update: &StatusUpdate) -> DomainResult<AiTask> {
        let change = StatusChange::new(Some(update.from), update.to, update.reason.clone());
        let result_json = update
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let actual_cost = update.result.as_ref().and_then(|r| r.actual_cost);

        let result = sqlx::query(
            r#"UPDATE ai_tasks SET status = ?,
               execution_result = COALESCE(?, execution_result),
               actual_cost_usd = COALESCE(?, actual_cost_usd),
               history = json_insert(history, '$[#]', json(?)),
               updated_at = ?, version = version + 1
               WHERE user_id = ? AND id = ? AND status = ?"#,
        )
        .bind(update.to.as_str())
        .bind(result_json)
        .bind(actual_cost)
        .bind(serde_json::to_string(&change)?)
        .bind(format_datetime(&change.at))
        .bind(user_id)
        .bind(id.to_string())
        .bind(update.from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missed_write(user_id, id).await);
        }

        self.fetch_required(user_id, id).await
    }

    async fn delete(&self, user_id: &str, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM ai_tasks WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(ENTITY, id));
        }

        Ok(())
    }

    async fn statistics(&self, user_id: &str) -> DomainResult<AiTaskStatistics> {
        let (total, estimated, actual): (i64, f64, f64) = sqlx::query_as(
            "SELECT COUNT(*), TOTAL(estimated_cost_usd), TOTAL(actual_cost_usd) FROM ai_tasks WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM ai_tasks WHERE user_id = ? GROUP BY status")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        let by_type: Vec<(String, i64)> =
            sqlx::query_as("SELECT task_type, COUNT(*) FROM ai_tasks WHERE user_id = ? GROUP BY task_type")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        let stats = AiTaskStatistics {
            total: total as u64,
            by_status: by_status.into_iter().map(|(k, v)| (k, v as u64)).collect(),
            by_type: by_type.into_iter().map(|(k, v)| (k, v as u64)).collect(),
            total_estimated_cost: estimated,
            total_actual_cost: actual,
            completion_rate: 0.0,
        };
        Ok(stats.finalize())
    }
}

#[derive(sqlx::FromRow)]
struct AiTaskRow {
    id: String,
    user_id: String,
    task_id: Option<String>,
    agent_id: String,
    objective: String,
    deliverables: Option<String>,
    context: Option<String>,
    acceptance_criteria: Option<String>,
    task_type: String,
    mode: String,
    status: String,
    dependencies: Option<String>,
    due_at: Option<String>,
    guardrails: Option<String>,
    metadata: Option<String>,
    estimated_cost_usd: Option<f64>,
    actual_cost_usd: Option<f64>,
    estimated_duration_min: Option<i64>,
    execution_result: Option<String>,
    history: Option<String>,
    is_local_task: bool,
    executor_workspace_id: Option<String>,
    created_at: String,
    updated_at: String,
    version: i64,
}

impl TryFrom<AiTaskRow> for AiTask {
    type Error = DomainError;

    fn try_from(row: AiTaskRow) -> Result<Self, Self::Error> {
        let task_type = AiTaskType::from_str(&row.task_type)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid task type: {}", row.task_type)))?;
        let mode = AiTaskMode::from_str(&row.mode)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid mode: {}", row.mode)))?;
        let status = AiTaskStatus::from_str(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;

        let execution_result: Option<ExecutionResult> = row
            .execution_result
            .map(|s| serde_json::from_str(&s))
            .transpose()?;

        let estimated_duration_min = row
            .estimated_duration_min
            .map(u32::try_from)
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        let version = u64::try_from(row.version)
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Self {
            id: parse_uuid(&row.id)?,
            user_id: row.user_id,
            task_id: parse_optional_uuid(row.task_id)?,
            agent_id: row.agent_id,
            objective: row.objective,
            deliverables: row.deliverables,
            context: row.context,
            acceptance_criteria: row.acceptance_criteria,
            task_type,
            mode,
            status,
            dependencies: parse_json_or_default(row.dependencies)?,
            due_at: parse_optional_datetime(row.due_at)?,
            guardrails: parse_json_or_default(row.guardrails)?,
            metadata: parse_json_or_default(row.metadata)?,
            estimated_cost_usd: row.estimated_cost_usd,
            actual_cost_usd: row.actual_cost_usd,
            estimated_duration_min,
            execution_result,
            history: parse_json_or_default(row.history)?,
            is_local_task: row.is_local_task,
            executor_workspace_id: row.executor_workspace_id,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
            version,
        })
    }
}

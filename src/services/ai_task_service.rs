//! AI task service implementing the task lifecycle.
//!
//! The service validates payloads, enforces the status transition table,
//! normalizes metadata and drives the repository. It is scoped to a single
//! user: every repository call carries the user id given at construction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::cost_tracker;
use super::validation::{self, UpdateDraft};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    ensure_transition, sanitize_string_list, trim_optional, AiTask, AiTaskStatistics,
    AiTaskStatus, BatchCreateRequest, BatchResult, CostAnalysis, CostEstimateRequest,
    CreateAiTaskRequest, EnrichedAiTask, ExecutionContext, ExecutionResult, Guardrails,
    GuardrailsInput, LimitsConfig, TaskMetadata, UpdateAiTaskRequest,
};
use crate::domain::ports::{AiTaskFilter, AiTaskRepository, StatusUpdate, TaskRepository};

const ENTITY: &str = "AI task";

/// A page of enriched tasks plus the number of all matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiTaskListing {
    pub tasks: Vec<EnrichedAiTask>,
    pub total: u64,
}

/// AI task lifecycle operations, scoped to one user.
pub struct AiTaskService<R: AiTaskRepository, T: TaskRepository> {
    user_id: String,
    ai_repo: Arc<R>,
    task_repo: Arc<T>,
    limits: LimitsConfig,
}

impl<R: AiTaskRepository, T: TaskRepository> AiTaskService<R, T> {
    /// Create a service for `user_id` with the default limits.
    pub fn new(user_id: impl Into<String>, ai_repo: Arc<R>, task_repo: Arc<T>) -> Self {
        Self {
            user_id: user_id.into(),
            ai_repo,
            task_repo,
            limits: LimitsConfig::default(),
        }
    }

    /// Create with custom batch and retry limits.
    pub const fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    async fn load(&self, id: Uuid) -> DomainResult<AiTask> {
        self.ai_repo
            .find_by_user_and_id(&self.user_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }

    /// Validate a request and persist a new task with a creation history entry.
    pub async fn create_ai_task(&self, request: CreateAiTaskRequest) -> DomainResult<EnrichedAiTask> {
        let task = self.build_task(&request).await?;
        let created = self.ai_repo.create(&self.user_id, &task).await?;

        info!(
            task_id = %created.id,
            task_type = %created.task_type,
            model = created.metadata.model.as_deref().unwrap_or("none"),
            estimated_cost = created.estimated_cost_usd.unwrap_or(0.0),
            "created AI task"
        );

        Ok(created.into())
    }

    async fn build_task(&self, req: &CreateAiTaskRequest) -> DomainResult<AiTask> {
        let (mut violations, draft) = validation::check_create(req);

        let caller_metadata = match parse_metadata(Value::Object(req.metadata.clone())) {
            Ok(metadata) => metadata,
            Err(e) => {
                violations.push(format!("Invalid metadata: {e}"));
                TaskMetadata::default()
            }
        };

        if let Some(task_id) = req.task_id {
            if self
                .task_repo
                .find_by_user_and_id(&self.user_id, task_id)
                .await?
                .is_none()
            {
                violations.push("Related task not found");
            }
        }

        violations.into_result()?;
        let draft = draft.ok_or_else(|| DomainError::validation("Invalid AI task request"))?;

        let mut task = AiTask::new(&self.user_id, draft.agent_id, draft.objective, draft.task_type)
            .with_task_id(draft.task_id)
            .with_mode(draft.mode)
            .with_status(draft.status);

        task.deliverables = trim_optional(req.deliverables.clone());
        task.context = trim_optional(req.context.clone());
        task.acceptance_criteria = trim_optional(req.acceptance_criteria.clone());
        task.dependencies = sanitize_string_list(&req.dependencies);
        task.due_at = req.due_at;
        if let Some(input) = &req.guardrails {
            apply_guardrails(&mut task.guardrails, input);
        }

        let mut metadata = caller_metadata;
        metadata.priority = draft.priority;
        if !req.tags.is_empty() {
            metadata.tags.clone_from(&req.tags);
        }
        overlay_strings(
            &mut metadata,
            req.model.as_deref(),
            req.provider.as_deref(),
            req.prompt.as_deref(),
            req.system_prompt.as_deref(),
            req.category.as_deref(),
        );
        overlay_sampling(&mut metadata, req.temperature, req.top_p, req.max_tokens);
        if let Some(max_retries) = req.max_retries {
            metadata.max_retries = max_retries;
        } else if req.metadata.get("max_retries").filter(|v| !v.is_null()).is_none() {
            metadata.max_retries = self.limits.default_max_retries;
        }
        metadata.normalize();
        task.metadata = metadata;

        task.estimated_cost_usd = req.estimated_cost.or_else(|| {
            task.metadata
                .model
                .as_deref()
                .map(|model| cost_tracker::estimate_cost(model, task.metadata.max_tokens))
        });
        task.estimated_duration_min = req.estimated_duration_min.and_then(|d| u32::try_from(d).ok());
        task.is_local_task = req.is_local_task;
        task.executor_workspace_id = trim_optional(req.executor_workspace_id.clone());

        Ok(task)
    }

    /// List the user's tasks matching `filter`.
    pub async fn find_ai_tasks(&self, filter: &AiTaskFilter) -> DomainResult<AiTaskListing> {
        let page = self.ai_repo.find_advanced(&self.user_id, filter).await?;
        Ok(AiTaskListing {
            tasks: page.tasks.into_iter().map(EnrichedAiTask::from).collect(),
            total: page.total,
        })
    }

    /// Get one task by id.
    pub async fn get_ai_task(&self, id: Uuid) -> DomainResult<EnrichedAiTask> {
        self.load(id).await.map(EnrichedAiTask::from)
    }

    /// List tasks assigned to `agent_id`, with optional extra filters.
    pub async fn get_tasks_by_agent(&self, agent_id: &str, filter: Option<AiTaskFilter>) -> DomainResult<AiTaskListing> {
        let filter = AiTaskFilter {
            agent_id: Some(agent_id.to_string()),
            ..filter.unwrap_or_default()
        };
        self.find_ai_tasks(&filter).await
    }

    /// Apply a partial update. Metadata patches are deep-merged.
    pub async fn update_ai_task(&self, id: Uuid, updates: UpdateAiTaskRequest) -> DomainResult<EnrichedAiTask> {
        let mut task = self.load(id).await?;
        let (mut violations, draft) = validation::check_update(&updates);

        let merged_metadata = match &updates.metadata {
            Some(patch) => {
                let mut current = serde_json::to_value(&task.metadata)?;
                merge_json(&mut current, Value::Object(patch.clone()));
                match parse_metadata(current) {
                    Ok(metadata) => Some(metadata),
                    Err(e) => {
                        violations.push(format!("Invalid metadata: {e}"));
                        None
                    }
                }
            }
            None => None,
        };

        violations.into_result()?;

        if let Some(status) = draft.status {
            task.transition_to(status, None)?;
        }

        apply_update(&mut task, updates, draft, merged_metadata);

        let saved = self.ai_repo.update(&self.user_id, &task).await?;
        debug!(task_id = %saved.id, version = saved.version, "updated AI task");
        Ok(saved.into())
    }

    /// Move a task along the transition table, optionally recording the
    /// executor's result in the same write.
    pub async fn update_task_status(
        &self,
        id: Uuid,
        status: AiTaskStatus,
        result: Option<ExecutionResult>,
    ) -> DomainResult<EnrichedAiTask> {
        let task = self.load(id).await?;
        ensure_transition(task.status, status)?;

        let updated = self
            .ai_repo
            .update_status(
                &self.user_id,
                id,
                &StatusUpdate {
                    from: task.status,
                    to: status,
                    result,
                    reason: None,
                },
            )
            .await?;

        info!(task_id = %id, from = %task.status, to = %status, "AI task status changed");
        Ok(updated.into())
    }

    /// Set the due date.
    pub async fn schedule_task(&self, id: Uuid, when: DateTime<Utc>) -> DomainResult<EnrichedAiTask> {
        self.update_ai_task(
            id,
            UpdateAiTaskRequest {
                due_at: Some(when),
                ..Default::default()
            },
        )
        .await
    }

    /// Send a failed task back to pending. `retry_count` is left as is.
    pub async fn retry_failed_task(&self, id: Uuid) -> DomainResult<EnrichedAiTask> {
        let mut task = self.load(id).await?;

        if task.status != AiTaskStatus::Failed {
            return Err(DomainError::business_rule(format!(
                "Only failed tasks can be retried (current status: {})",
                task.status
            )));
        }
        if task.metadata.retries_exhausted() {
            warn!(task_id = %id, retry_count = task.metadata.retry_count, "retry limit reached");
            return Err(DomainError::business_rule("Maximum retry attempts reached"));
        }

        task.transition_to(AiTaskStatus::Pending, Some("retry".to_string()))?;
        task.execution_result = None;

        let saved = self.ai_repo.update(&self.user_id, &task).await?;
        info!(task_id = %id, retry_count = saved.metadata.retry_count, "AI task queued for retry");
        Ok(saved.into())
    }

    /// Cancel from any status except completed, bypassing the transition table.
    pub async fn cancel_task(&self, id: Uuid, reason: Option<String>) -> DomainResult<EnrichedAiTask> {
        let mut task = self.load(id).await?;

        if task.status == AiTaskStatus::Completed {
            return Err(DomainError::business_rule("Cannot cancel a completed task"));
        }

        let reason = trim_optional(reason);
        if let Some(reason) = &reason {
            task.metadata.cancellation_reason = Some(reason.clone());
            task.metadata.cancelled_at = Some(Utc::now());
        }
        task.record_status(AiTaskStatus::Cancelled, reason);

        let saved = self.ai_repo.update(&self.user_id, &task).await?;
        info!(task_id = %id, "AI task cancelled");
        Ok(saved.into())
    }

    /// Delete a task unless it is currently executing.
    pub async fn delete_ai_task(&self, id: Uuid) -> DomainResult<()> {
        let task = self.load(id).await?;

        if task.status == AiTaskStatus::InProgress {
            return Err(DomainError::business_rule(
                "Cannot delete task that is currently executing",
            ));
        }

        self.ai_repo.delete(&self.user_id, id).await?;
        info!(task_id = %id, "AI task deleted");
        Ok(())
    }

    /// Create tasks one after another. Failures are recorded per item; with
    /// `fail_fast` processing stops at the first one.
    pub async fn create_batch_tasks(&self, request: BatchCreateRequest) -> DomainResult<BatchResult> {
        check_batch_size(request.tasks.len(), self.limits.max_batch_create)?;

        let fail_fast = request.execution_options.fail_fast;
        let mut result = BatchResult::new(request.tasks.len());

        for (index, item) in request.tasks.into_iter().enumerate() {
            match self.create_ai_task(item).await {
                Ok(task) => result.record_success(task),
                Err(e) => {
                    warn!(task_index = index, error = %e, "batch create item failed");
                    result.record_failure(index, None, e.to_string());
                    if fail_fast {
                        break;
                    }
                }
            }
        }

        info!(
            total = result.total_tasks,
            succeeded = result.successful_tasks,
            failed = result.failed_tasks,
            "batch create finished"
        );
        Ok(result)
    }

    /// Flip each task to in_progress. No executor is invoked.
    pub async fn execute_batch(&self, task_ids: &[Uuid], context: Option<ExecutionContext>) -> DomainResult<BatchResult> {
        check_batch_size(task_ids.len(), self.limits.max_batch_execute)?;

        let fail_fast = context.is_some_and(|c| c.fail_fast);
        let mut result = BatchResult::new(task_ids.len());

        for (index, id) in task_ids.iter().copied().enumerate() {
            match self.update_task_status(id, AiTaskStatus::InProgress, None).await {
                Ok(task) => result.record_success(task),
                Err(e) => {
                    warn!(task_index = index, task_id = %id, error = %e, "batch execute item failed");
                    result.record_failure(index, Some(id), e.to_string());
                    if fail_fast {
                        break;
                    }
                }
            }
        }

        info!(
            total = result.total_tasks,
            succeeded = result.successful_tasks,
            failed = result.failed_tasks,
            "batch execute finished"
        );
        Ok(result)
    }

    /// Estimated cost in USD for a model and token count.
    pub fn estimate_task_cost(&self, request: &CostEstimateRequest) -> DomainResult<f64> {
        let model = request.model.as_deref().map_or("unknown", str::trim);
        Ok(cost_tracker::estimate_cost(model, request.max_tokens))
    }

    /// Cost breakdown over every task matching `filter`; pagination is ignored.
    pub async fn get_cost_analysis(&self, filter: Option<AiTaskFilter>) -> DomainResult<CostAnalysis> {
        let filter = filter.unwrap_or_default().unpaged();
        let page = self.ai_repo.find_advanced(&self.user_id, &filter).await?;
        Ok(CostAnalysis::from_tasks(&page.tasks))
    }

    /// Counts by status and type, completion rate and cost totals.
    pub async fn get_task_statistics(&self) -> DomainResult<AiTaskStatistics> {
        self.ai_repo.statistics(&self.user_id).await
    }

    /// Check a task is ready to hand to an executor. All problems are
    /// reported in one validation error.
    pub fn validate_task_execution(&self, task: &AiTask, context: Option<&ExecutionContext>) -> DomainResult<()> {
        validation::check_execution(task, context, Utc::now()).into_result()
    }
}

fn check_batch_size(len: usize, max: usize) -> DomainResult<()> {
    if len == 0 || len > max {
        return Err(DomainError::validation(format!(
            "Batch must contain between 1 and {max} items (got {len})"
        )));
    }
    Ok(())
}

fn parse_metadata(value: Value) -> serde_json::Result<TaskMetadata> {
    serde_json::from_value(value)
}

/// Recursively merge `patch` into `target`. Objects merge key by key; any
/// other value replaces what was there.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn apply_guardrails(guardrails: &mut Guardrails, input: &GuardrailsInput) {
    if let Some(cap) = input.cost_cap_usd {
        guardrails.cost_cap_usd = Some(cap);
    }
    if let Some(minutes) = input.time_cap_min.and_then(|m| u32::try_from(m).ok()) {
        guardrails.time_cap_min = Some(minutes);
    }
    if let Some(approval) = input.requires_human_approval {
        guardrails.requires_human_approval = approval;
    }
    if let Some(scopes) = &input.data_scopes {
        guardrails.data_scopes = sanitize_string_list(scopes);
    }
}

fn overlay_strings(
    metadata: &mut TaskMetadata,
    model: Option<&str>,
    provider: Option<&str>,
    prompt: Option<&str>,
    system_prompt: Option<&str>,
    category: Option<&str>,
) {
    for (field, value) in [
        (&mut metadata.model, model),
        (&mut metadata.provider, provider),
        (&mut metadata.prompt, prompt),
        (&mut metadata.system_prompt, system_prompt),
        (&mut metadata.category, category),
    ] {
        if let Some(value) = value {
            *field = Some(value.to_string());
        }
    }
}

fn overlay_sampling(metadata: &mut TaskMetadata, temperature: Option<f64>, top_p: Option<f64>, max_tokens: Option<i64>) {
    if temperature.is_some() {
        metadata.temperature = temperature;
    }
    if top_p.is_some() {
        metadata.top_p = top_p;
    }
    if let Some(tokens) = max_tokens.and_then(|t| u32::try_from(t).ok()) {
        metadata.max_tokens = Some(tokens);
    }
}

/// Merge a validated update into `task`, field by field.
fn apply_update(task: &mut AiTask, updates: UpdateAiTaskRequest, draft: UpdateDraft, merged_metadata: Option<TaskMetadata>) {
    if let Some(agent_id) = trim_optional(updates.agent_id) {
        task.agent_id = agent_id;
    }
    if let Some(objective) = trim_optional(updates.objective) {
        task.objective = objective;
    }
    if updates.deliverables.is_some() {
        task.deliverables = trim_optional(updates.deliverables);
    }
    if updates.context.is_some() {
        task.context = trim_optional(updates.context);
    }
    if updates.acceptance_criteria.is_some() {
        task.acceptance_criteria = trim_optional(updates.acceptance_criteria);
    }
    if let Some(task_type) = draft.task_type {
        task.task_type = task_type;
    }
    if let Some(mode) = draft.mode {
        task.mode = mode;
    }
    if let Some(dependencies) = updates.dependencies {
        task.dependencies = sanitize_string_list(&dependencies);
    }
    if updates.due_at.is_some() {
        task.due_at = updates.due_at;
    }
    if let Some(input) = &updates.guardrails {
        apply_guardrails(&mut task.guardrails, input);
    }

    let mut metadata = merged_metadata.unwrap_or_else(|| task.metadata.clone());
    if let Some(priority) = draft.priority {
        metadata.priority = priority;
    }
    if let Some(tags) = updates.tags {
        metadata.tags = tags;
    }
    overlay_strings(
        &mut metadata,
        updates.model.as_deref(),
        updates.provider.as_deref(),
        updates.prompt.as_deref(),
        updates.system_prompt.as_deref(),
        updates.category.as_deref(),
    );
    overlay_sampling(&mut metadata, updates.temperature, updates.top_p, updates.max_tokens);
    if let Some(max_retries) = updates.max_retries {
        metadata.max_retries = max_retries;
    }
    metadata.normalize();
    task.metadata = metadata;

    if updates.estimated_cost.is_some() {
        task.estimated_cost_usd = updates.estimated_cost;
    }
    if updates.actual_cost.is_some() {
        task.actual_cost_usd = updates.actual_cost;
    }
    if let Some(minutes) = updates.estimated_duration_min.and_then(|d| u32::try_from(d).ok()) {
        task.estimated_duration_min = Some(minutes);
    }
    if updates.execution_result.is_some() {
        task.execution_result = updates.execution_result;
    }
    if let Some(is_local) = updates.is_local_task {
        task.is_local_task = is_local;
    }
    if updates.executor_workspace_id.is_some() {
        task.executor_workspace_id = trim_optional(updates.executor_workspace_id);
    }
}

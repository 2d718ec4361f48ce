//! AI task domain model.
//!
//! An AI task is a unit of work delegated to an AI agent. It is tracked
//! through a status lifecycle and carries guardrails, typed metadata and an
//! append-only status history.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Kind of work an AI task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiTaskType {
    Generation,
    Analysis,
    Summarization,
    Classification,
    Translation,
    Conversation,
    Coding,
    Reasoning,
    Other,
}

impl AiTaskType {
    pub const ALL: [Self; 9] = [
        Self::Generation,
        Self::Analysis,
        Self::Summarization,
        Self::Classification,
        Self::Translation,
        Self::Conversation,
        Self::Coding,
        Self::Reasoning,
        Self::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Analysis => "analysis",
            Self::Summarization => "summarization",
            Self::Classification => "classification",
            Self::Translation => "translation",
            Self::Conversation => "conversation",
            Self::Coding => "coding",
            Self::Reasoning => "reasoning",
            Self::Other => "other",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for AiTaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an AI task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiTaskStatus {
    /// Created and waiting to run
    #[default]
    Pending,
    /// Handed to an agent but not started
    Assigned,
    /// Currently executing
    InProgress,
    /// Execution suspended
    Paused,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped by a caller
    Cancelled,
}

impl AiTaskStatus {
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Assigned,
        Self::InProgress,
        Self::Paused,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Statuses reachable from this one through a regular status change.
    ///
    /// `Assigned` and `Paused` have no outgoing edges.
    pub const fn valid_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Failed, Self::Cancelled],
            Self::Failed | Self::Cancelled => &[Self::Pending],
            Self::Completed | Self::Assigned | Self::Paused => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for AiTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far an agent may go with a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiTaskMode {
    #[default]
    PlanOnly,
    DryRun,
    Execute,
}

impl AiTaskMode {
    pub const ALL: [Self; 3] = [Self::PlanOnly, Self::DryRun, Self::Execute];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PlanOnly => "plan_only",
            Self::DryRun => "dry_run",
            Self::Execute => "execute",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for AiTaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-assigned priority, stored inside task metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits placed on an agent working a task. Persisted in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guardrails {
    #[serde(rename = "costCapUSD", default, skip_serializing_if = "Option::is_none")]
    pub cost_cap_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_cap_min: Option<u32>,
    #[serde(default = "default_true")]
    pub requires_human_approval: bool,
    #[serde(default)]
    pub data_scopes: Vec<String>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            cost_cap_usd: None,
            time_cap_min: None,
            requires_human_approval: true,
            data_scopes: Vec::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_max_retries() -> u32 {
    3
}

/// Read an explicit JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_max_retries<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_else(default_max_retries))
}

/// Typed view over the task metadata bag.
///
/// Known keys are typed fields; anything else the caller supplied is kept in
/// `extra` and flattened back into the same JSON object on serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub priority: TaskPriority,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub retry_count: u32,
    #[serde(default = "default_max_retries", deserialize_with = "null_as_default_max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TaskMetadata {
    fn default() -> Self {
        Self {
            priority: TaskPriority::default(),
            tags: Vec::new(),
            model: None,
            provider: None,
            prompt: None,
            system_prompt: None,
            category: None,
            retry_count: 0,
            max_retries: default_max_retries(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            cancellation_reason: None,
            cancelled_at: None,
            extra: Map::new(),
        }
    }
}

impl TaskMetadata {
    /// Re-apply the normalization rules: tags sanitized, optional strings
    /// trimmed and blank ones dropped.
    pub fn normalize(&mut self) {
        self.tags = sanitize_string_list(&self.tags);
        for field in [
            &mut self.model,
            &mut self.provider,
            &mut self.prompt,
            &mut self.system_prompt,
            &mut self.category,
            &mut self.cancellation_reason,
        ] {
            *field = trim_optional(field.take());
        }
    }

    pub const fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Outcome reported by whatever executed the task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_used: Option<String>,
}

/// One entry in a task's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Option<AiTaskStatus>,
    pub to: AiTaskStatus,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn new(from: Option<AiTaskStatus>, to: AiTaskStatus, reason: Option<String>) -> Self {
        Self {
            from,
            to,
            at: Utc::now(),
            reason,
        }
    }
}

/// A task delegated to an AI agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiTask {
    pub id: Uuid,
    pub user_id: String,
    /// Regular task this AI task belongs to
    pub task_id: Option<Uuid>,
    pub agent_id: String,
    pub objective: String,
    pub deliverables: Option<String>,
    pub context: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub task_type: AiTaskType,
    pub mode: AiTaskMode,
    pub status: AiTaskStatus,
    pub dependencies: Vec<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub guardrails: Guardrails,
    pub metadata: TaskMetadata,
    pub estimated_cost_usd: Option<f64>,
    pub actual_cost_usd: Option<f64>,
    pub estimated_duration_min: Option<u32>,
    pub execution_result: Option<ExecutionResult>,
    pub history: Vec<StatusChange>,
    pub is_local_task: bool,
    pub executor_workspace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every write
    pub version: u64,
}

impl AiTask {
    /// Create a pending task with default guardrails and metadata.
    pub fn new(
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
        objective: impl Into<String>,
        task_type: AiTaskType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            task_id: None,
            agent_id: agent_id.into(),
            objective: objective.into(),
            deliverables: None,
            context: None,
            acceptance_criteria: None,
            task_type,
            mode: AiTaskMode::default(),
            status: AiTaskStatus::default(),
            dependencies: Vec::new(),
            due_at: None,
            guardrails: Guardrails::default(),
            metadata: TaskMetadata::default(),
            estimated_cost_usd: None,
            actual_cost_usd: None,
            estimated_duration_min: None,
            execution_result: None,
            history: vec![StatusChange::new(None, AiTaskStatus::Pending, None)],
            is_local_task: false,
            executor_workspace_id: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub const fn with_task_id(mut self, task_id: Uuid) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub const fn with_mode(mut self, mode: AiTaskMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the initial status, replacing the creation history entry.
    pub fn with_status(mut self, status: AiTaskStatus) -> Self {
        self.status = status;
        self.history = vec![StatusChange::new(None, status, None)];
        self
    }

    /// Move to `next` if the transition table allows it.
    ///
    /// Setting the current status again is accepted and leaves the task
    /// untouched.
    pub fn transition_to(&mut self, next: AiTaskStatus, reason: Option<String>) -> DomainResult<()> {
        if self.status == next {
            return Ok(());
        }
        ensure_transition(self.status, next)?;
        self.record_status(next, reason);
        Ok(())
    }

    /// Set the status unconditionally and append a history entry.
    pub fn record_status(&mut self, next: AiTaskStatus, reason: Option<String>) {
        self.history
            .push(StatusChange::new(Some(self.status), next, reason));
        self.status = next;
        self.updated_at = Utc::now();
    }

    /// Model the cost is attributed to: the one that actually ran, else the
    /// configured one, else `unknown`.
    pub fn resolved_model(&self) -> &str {
        self.execution_result
            .as_ref()
            .and_then(|r| r.model_used.as_deref())
            .or(self.metadata.model.as_deref())
            .unwrap_or("unknown")
    }

    /// Minimal integrity check applied before a task is persisted.
    pub fn validate(&self) -> DomainResult<()> {
        if self.objective.trim().is_empty() {
            return Err(DomainError::validation("Objective is required"));
        }
        if self.agent_id.trim().is_empty() {
            return Err(DomainError::validation("Agent ID is required"));
        }
        Ok(())
    }
}

/// Check one edge of the transition table.
pub fn ensure_transition(from: AiTaskStatus, to: AiTaskStatus) -> DomainResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::BusinessRule(format!(
            "Invalid status transition from {from} to {to}"
        )))
    }
}

/// AI task as returned to callers, with `priority` and `tags` lifted out of
/// metadata onto the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedAiTask {
    #[serde(flatten)]
    pub task: AiTask,
    pub priority: TaskPriority,
    pub tags: Vec<String>,
}

impl From<AiTask> for EnrichedAiTask {
    fn from(task: AiTask) -> Self {
        let priority = task.metadata.priority;
        let tags = task.metadata.tags.clone();
        Self {
            task,
            priority,
            tags,
        }
    }
}

/// Trim every entry, drop blanks and keep the first occurrence of each value.
pub fn sanitize_string_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}

/// Trim an optional string, mapping blank values to `None`.
pub fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

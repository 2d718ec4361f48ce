//! Caller-facing request payloads for the AI task service.
//!
//! Enumerated fields arrive as raw strings so that every invalid value can be
//! reported in a single validation error instead of failing deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::ai_task::{ExecutionResult, EnrichedAiTask};

/// Partial guardrails supplied by a caller. Missing fields keep their
/// current (or default) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardrailsInput {
    #[serde(rename = "costCapUSD")]
    pub cost_cap_usd: Option<f64>,
    pub time_cap_min: Option<i64>,
    pub requires_human_approval: Option<bool>,
    pub data_scopes: Option<Vec<String>>,
}

/// Payload for creating one AI task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateAiTaskRequest {
    pub task_id: Option<Uuid>,
    pub agent_id: Option<String>,
    pub objective: Option<String>,
    /// Used as the objective when `objective` is missing
    pub title: Option<String>,
    pub deliverables: Option<String>,
    pub context: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub task_type: Option<String>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub dependencies: Vec<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub guardrails: Option<GuardrailsInput>,
    pub tags: Vec<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub category: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<i64>,
    pub max_retries: Option<u32>,
    pub estimated_cost: Option<f64>,
    pub estimated_duration_min: Option<i64>,
    pub is_local_task: bool,
    pub executor_workspace_id: Option<String>,
    /// Extra caller metadata merged under the normalized keys
    pub metadata: Map<String, Value>,
}

impl CreateAiTaskRequest {
    /// Minimal valid request: owning task, agent, objective and type.
    pub fn new(
        task_id: Uuid,
        agent_id: impl Into<String>,
        objective: impl Into<String>,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Some(task_id),
            agent_id: Some(agent_id.into()),
            objective: Some(objective.into()),
            task_type: Some(task_type.into()),
            ..Default::default()
        }
    }
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAiTaskRequest {
    pub agent_id: Option<String>,
    pub objective: Option<String>,
    pub deliverables: Option<String>,
    pub context: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub task_type: Option<String>,
    pub mode: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub dependencies: Option<Vec<String>>,
    pub due_at: Option<DateTime<Utc>>,
    pub guardrails: Option<GuardrailsInput>,
    pub tags: Option<Vec<String>>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub category: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<i64>,
    pub max_retries: Option<u32>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub estimated_duration_min: Option<i64>,
    pub execution_result: Option<ExecutionResult>,
    pub is_local_task: Option<bool>,
    pub executor_workspace_id: Option<String>,
    /// Deep-merged into the stored metadata
    pub metadata: Option<Map<String, Value>>,
}

impl UpdateAiTaskRequest {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }
}

/// Options controlling batch processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchExecutionOptions {
    /// Stop at the first failing item
    pub fail_fast: bool,
}

/// Payload for `create_batch_tasks`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchCreateRequest {
    pub tasks: Vec<CreateAiTaskRequest>,
    pub execution_options: BatchExecutionOptions,
}

/// Context passed to batch execution and execution validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionContext {
    pub fail_fast: bool,
    /// Highest estimated cost a single task may carry
    pub per_task_cost_cap: Option<f64>,
}

/// A failed batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub task_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<Uuid>,
    pub error: String,
}

/// Aggregate outcome of a batch operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchResult {
    pub total_tasks: usize,
    pub successful_tasks: usize,
    pub failed_tasks: usize,
    pub total_cost: f64,
    pub results: Vec<EnrichedAiTask>,
    pub errors: Vec<BatchItemError>,
}

impl BatchResult {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            ..Default::default()
        }
    }

    pub(crate) fn record_success(&mut self, task: EnrichedAiTask) {
        self.total_cost += task.task.estimated_cost_usd.unwrap_or(0.0);
        self.successful_tasks += 1;
        self.results.push(task);
    }

    pub(crate) fn record_failure(&mut self, task_index: usize, task_id: Option<Uuid>, error: String) {
        self.failed_tasks += 1;
        self.errors.push(BatchItemError {
            task_index,
            task_id,
            error,
        });
    }
}

/// Input for `estimate_task_cost`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostEstimateRequest {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

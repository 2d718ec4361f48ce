//! Schema checks for AI task payloads.
//!
//! Every check records its message in a [`Violations`] collector rather than
//! returning early, so a caller sees all problems with a payload at once.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    trim_optional, AiTask, AiTaskMode, AiTaskStatus, AiTaskType, CreateAiTaskRequest,
    ExecutionContext, GuardrailsInput, TaskPriority, UpdateAiTaskRequest,
};

pub const TEMPERATURE_RANGE: (f64, f64) = (0.0, 2.0);
pub const TOP_P_RANGE: (f64, f64) = (0.0, 1.0);
pub const MAX_TOKENS_RANGE: (i64, i64) = (1, 100_000);

/// Accumulated constraint violations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise one validation error
    /// carrying every message.
    pub fn into_result(self) -> DomainResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self.0))
        }
    }
}

/// Typed values extracted from a create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDraft {
    pub task_id: Uuid,
    pub agent_id: String,
    pub objective: String,
    pub task_type: AiTaskType,
    pub mode: AiTaskMode,
    pub status: AiTaskStatus,
    pub priority: TaskPriority,
}

/// Typed enum values extracted from an update request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateDraft {
    pub task_type: Option<AiTaskType>,
    pub mode: Option<AiTaskMode>,
    pub status: Option<AiTaskStatus>,
    pub priority: Option<TaskPriority>,
}

/// Validate a create payload.
///
/// The draft is `Some` only when every required field parsed; the related
/// task lookup is left to the caller, which appends to the same collector.
pub fn check_create(req: &CreateAiTaskRequest) -> (Violations, Option<CreateDraft>) {
    let mut v = Violations::new();

    if req.task_id.is_none() {
        v.push("Task ID is required");
    }

    let agent_id = trim_optional(req.agent_id.clone());
    if agent_id.is_none() {
        v.push("Agent ID is required");
    }

    let objective = trim_optional(req.objective.clone()).or_else(|| trim_optional(req.title.clone()));
    if objective.is_none() {
        v.push("Objective is required");
    }

    let task_type = match req.task_type.as_deref() {
        None => {
            v.push("Task type is required");
            None
        }
        Some(raw) => parse_field(&mut v, "task type", raw, AiTaskType::from_str),
    };

    let priority = req
        .priority
        .as_deref()
        .map(|raw| parse_field(&mut v, "priority", raw, TaskPriority::from_str));
    let status = req
        .status
        .as_deref()
        .map(|raw| parse_field(&mut v, "status", raw, AiTaskStatus::from_str));
    let mode = req
        .mode
        .as_deref()
        .map(|raw| parse_field(&mut v, "mode", raw, AiTaskMode::from_str));

    check_sampling(&mut v, req.temperature, req.top_p, req.max_tokens);
    check_costs(&mut v, req.estimated_cost, None, req.estimated_duration_min);
    if let Some(guardrails) = &req.guardrails {
        check_guardrails(&mut v, guardrails);
    }

    let draft = match (req.task_id, agent_id, objective, task_type) {
        (Some(task_id), Some(agent_id), Some(objective), Some(task_type)) if v.is_empty() => {
            Some(CreateDraft {
                task_id,
                agent_id,
                objective,
                task_type,
                mode: mode.flatten().unwrap_or_default(),
                status: status.flatten().unwrap_or_default(),
                priority: priority.flatten().unwrap_or_default(),
            })
        }
        _ => None,
    };

    (v, draft)
}

/// Validate an update payload. Only fields that are present are checked.
pub fn check_update(req: &UpdateAiTaskRequest) -> (Violations, UpdateDraft) {
    let mut v = Violations::new();

    if req.agent_id.as_deref().is_some_and(|s| s.trim().is_empty()) {
        v.push("Agent ID cannot be empty");
    }
    if req.objective.as_deref().is_some_and(|s| s.trim().is_empty()) {
        v.push("Objective cannot be empty");
    }

    let draft = UpdateDraft {
        task_type: req
            .task_type
            .as_deref()
            .and_then(|raw| parse_field(&mut v, "task type", raw, AiTaskType::from_str)),
        mode: req
            .mode
            .as_deref()
            .and_then(|raw| parse_field(&mut v, "mode", raw, AiTaskMode::from_str)),
        status: req
            .status
            .as_deref()
            .and_then(|raw| parse_field(&mut v, "status", raw, AiTaskStatus::from_str)),
        priority: req
            .priority
            .as_deref()
            .and_then(|raw| parse_field(&mut v, "priority", raw, TaskPriority::from_str)),
    };

    check_sampling(&mut v, req.temperature, req.top_p, req.max_tokens);
    check_costs(&mut v, req.estimated_cost, req.actual_cost, req.estimated_duration_min);
    if let Some(guardrails) = &req.guardrails {
        check_guardrails(&mut v, guardrails);
    }

    (v, draft)
}

/// Pre-flight checks before a task is handed to an executor.
pub fn check_execution(task: &AiTask, context: Option<&ExecutionContext>, now: DateTime<Utc>) -> Violations {
    let mut v = Violations::new();

    if let (Some(cap), Some(estimate)) = (
        context.and_then(|c| c.per_task_cost_cap),
        task.estimated_cost_usd,
    ) {
        if estimate > cap {
            v.push(format!(
                "Estimated cost ${estimate:.2} exceeds per-task cost cap ${cap:.2}"
            ));
        }
    }

    if task.status != AiTaskStatus::Pending {
        v.push(format!(
            "Task must be pending to execute (current status: {})",
            task.status
        ));
    }

    if task.due_at.is_some_and(|due| due < now) {
        v.push("Task due date has passed");
    }

    if task.metadata.retries_exhausted() {
        v.push("Maximum retry attempts reached");
    }

    v
}

fn parse_field<T>(v: &mut Violations, label: &str, raw: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        v.push(format!("Invalid {label}: {raw}"));
    }
    parsed
}

fn check_sampling(v: &mut Violations, temperature: Option<f64>, top_p: Option<f64>, max_tokens: Option<i64>) {
    if let Some(t) = temperature {
        if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&t) {
            v.push("Temperature must be between 0 and 2");
        }
    }
    if let Some(p) = top_p {
        if !(TOP_P_RANGE.0..=TOP_P_RANGE.1).contains(&p) {
            v.push("top_p must be between 0 and 1");
        }
    }
    if let Some(n) = max_tokens {
        if !(MAX_TOKENS_RANGE.0..=MAX_TOKENS_RANGE.1).contains(&n) {
            v.push("max_tokens must be between 1 and 100000");
        }
    }
}

fn check_costs(v: &mut Violations, estimated: Option<f64>, actual: Option<f64>, duration_min: Option<i64>) {
    if estimated.is_some_and(|c| !is_non_negative(c)) {
        v.push("Estimated cost must be non-negative");
    }
    if actual.is_some_and(|c| !is_non_negative(c)) {
        v.push("Actual cost must be non-negative");
    }
    if duration_min.is_some_and(|d| d <= 0 || u32::try_from(d).is_err()) {
        v.push("Estimated duration must be a positive number of minutes");
    }
}

fn check_guardrails(v: &mut Violations, guardrails: &GuardrailsInput) {
    if guardrails.cost_cap_usd.is_some_and(|c| !is_non_negative(c)) {
        v.push("Guardrail costCapUSD must be non-negative");
    }
    if guardrails
        .time_cap_min
        .is_some_and(|t| t <= 0 || u32::try_from(t).is_err())
    {
        v.push("Guardrail timeCapMin must be positive");
    }
}

/// NaN-safe `value >= 0`.
fn is_non_negative(value: f64) -> bool {
    value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn valid_request() -> CreateAiTaskRequest {
        CreateAiTaskRequest::new(Uuid::new_v4(), "writer", "Draft a post", "generation")
    }

    #[test]
    fn test_valid_request_produces_draft_with_defaults() {
        let (v, draft) = check_create(&valid_request());
        assert!(v.is_empty());
        let draft = draft.unwrap();
        assert_eq!(draft.priority, TaskPriority::Medium);
        assert_eq!(draft.status, AiTaskStatus::Pending);
        assert_eq!(draft.mode, AiTaskMode::PlanOnly);
    }

    #[test]
    fn test_objective_falls_back_to_title() {
        let mut req = valid_request();
        req.objective = None;
        req.title = Some("  From title ".to_string());
        let (v, draft) = check_create(&req);
        assert!(v.is_empty());
        assert_eq!(draft.unwrap().objective, "From title");
    }

    #[test]
    fn test_all_violations_reported_together() {
        let req = CreateAiTaskRequest {
            task_type: Some("poetry".to_string()),
            priority: Some("critical".to_string()),
            temperature: Some(2.5),
            top_p: Some(-0.1),
            max_tokens: Some(0),
            estimated_cost: Some(-1.0),
            guardrails: Some(GuardrailsInput {
                cost_cap_usd: Some(-5.0),
                time_cap_min: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (v, draft) = check_create(&req);
        assert!(draft.is_none());
        let messages = v.messages();
        assert!(messages.contains(&"Task ID is required".to_string()));
        assert!(messages.contains(&"Agent ID is required".to_string()));
        assert!(messages.contains(&"Objective is required".to_string()));
        assert!(messages.contains(&"Invalid task type: poetry".to_string()));
        assert!(messages.contains(&"Invalid priority: critical".to_string()));
        assert!(messages.contains(&"Temperature must be between 0 and 2".to_string()));
        assert!(messages.contains(&"top_p must be between 0 and 1".to_string()));
        assert!(messages.contains(&"max_tokens must be between 1 and 100000".to_string()));
        assert!(messages.contains(&"Estimated cost must be non-negative".to_string()));
        assert!(messages.contains(&"Guardrail costCapUSD must be non-negative".to_string()));
        assert!(messages.contains(&"Guardrail timeCapMin must be positive".to_string()));
    }

    #[test]
    fn test_sampling_bounds_inclusive() {
        let mut req = valid_request();
        req.temperature = Some(2.0);
        req.top_p = Some(0.0);
        req.max_tokens = Some(100_000);
        let (v, _) = check_create(&req);
        assert!(v.is_empty());
    }

    #[test]
    fn test_nan_cost_rejected() {
        let mut req = valid_request();
        req.estimated_cost = Some(f64::NAN);
        let (v, draft) = check_create(&req);
        assert!(!v.is_empty());
        assert!(draft.is_none());
    }

    #[test]
    fn test_check_update_only_checks_present_fields() {
        let (v, draft) = check_update(&UpdateAiTaskRequest::default());
        assert!(v.is_empty());
        assert_eq!(draft, UpdateDraft::default());

        let (v, draft) = check_update(&UpdateAiTaskRequest {
            status: Some("in_progress".to_string()),
            objective: Some("   ".to_string()),
            mode: Some("yolo".to_string()),
            ..Default::default()
        });
        assert_eq!(draft.status, Some(AiTaskStatus::InProgress));
        assert_eq!(
            v.messages(),
            &["Objective cannot be empty".to_string(), "Invalid mode: yolo".to_string()]
        );
    }

    #[test]
    fn test_check_execution_collects_every_problem() {
        let mut task = AiTask::new("u", "a", "o", AiTaskType::Coding).with_status(AiTaskStatus::Failed);
        task.estimated_cost_usd = Some(5.0);
        task.due_at = Some(Utc::now() - Duration::hours(1));
        task.metadata.retry_count = 3;

        let context = ExecutionContext {
            per_task_cost_cap: Some(1.0),
            ..Default::default()
        };
        let v = check_execution(&task, Some(&context), Utc::now());
        assert_eq!(v.messages().len(), 4);
        assert!(v.into_result().is_err());
    }

    #[test]
    fn test_check_execution_passes_for_ready_task() {
        let mut task = AiTask::new("u", "a", "o", AiTaskType::Coding);
        task.due_at = Some(Utc::now() + Duration::hours(1));
        assert!(check_execution(&task, None, Utc::now()).is_empty());
    }
}

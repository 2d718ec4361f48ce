//! AI task CLI commands.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{build_service, open_database};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{respond, respond_result};
use crate::domain::models::{
    AiTaskStatus, AiTaskType, BatchCreateRequest, BatchExecutionOptions, Config, CostEstimateRequest,
    CreateAiTaskRequest, EnrichedAiTask, ExecutionContext, ExecutionResult, UpdateAiTaskRequest,
};
use crate::domain::ports::AiTaskFilter;
use crate::services::ApiResponse;

#[derive(Args, Debug)]
pub struct AiArgs {
    #[command(subcommand)]
    pub command: AiCommands,
}

#[derive(Subcommand, Debug)]
pub enum AiCommands {
    /// Delegate a new task to an AI agent
    Create(CreateArgs),
    /// List AI tasks
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Maximum number of tasks to return
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Number of tasks to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Show AI task details
    Show {
        /// AI task ID
        id: Uuid,
    },
    /// Update fields of an AI task
    Update(UpdateArgs),
    /// Move an AI task to a new status
    Status(StatusArgs),
    /// Set an AI task's due date
    Schedule {
        /// AI task ID
        id: Uuid,
        /// Due date (RFC 3339, e.g. 2026-01-31T09:00:00Z)
        when: DateTime<Utc>,
    },
    /// Send a failed AI task back to pending
    Retry {
        /// AI task ID
        id: Uuid,
    },
    /// Cancel an AI task
    Cancel {
        /// AI task ID
        id: Uuid,
        /// Why the task was cancelled
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Delete an AI task
    Delete {
        /// AI task ID
        id: Uuid,
    },
    /// Estimate the cost of a task for a model
    Estimate {
        /// Model name
        #[arg(short, long)]
        model: Option<String>,
        /// Token budget
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Cost breakdown over matching tasks
    Costs {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Aggregate statistics over all tasks
    Stats,
    /// Create AI tasks from a JSON file
    Batch {
        /// JSON file holding `{"tasks": [...]}` or a bare array of tasks
        file: PathBuf,
        /// Stop at the first failing task
        #[arg(long)]
        fail_fast: bool,
    },
    /// Start executing AI tasks
    Execute {
        /// AI task IDs
        #[arg(required = true)]
        ids: Vec<Uuid>,
        /// Stop at the first failing task
        #[arg(long)]
        fail_fast: bool,
    },
    /// Check whether an AI task is ready to execute
    Check {
        /// AI task ID
        id: Uuid,
        /// Highest estimated cost the task may carry
        #[arg(long)]
        cost_cap: Option<f64>,
    },
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Filter by agent
    #[arg(short, long)]
    pub agent: Option<String>,
    /// Filter by status
    #[arg(short, long)]
    pub status: Option<String>,
    /// Filter by task type
    #[arg(short = 't', long = "type")]
    pub task_type: Option<String>,
    /// Filter by owning regular task
    #[arg(long)]
    pub task: Option<Uuid>,
    /// Only local (or only remote) tasks
    #[arg(long)]
    pub local: Option<bool>,
}

impl FilterArgs {
    fn into_filter(self) -> Result<AiTaskFilter> {
        let status = self
            .status
            .map(|s| AiTaskStatus::from_str(&s).ok_or_else(|| anyhow!("Invalid status: {s}")))
            .transpose()?;
        let task_type = self
            .task_type
            .map(|t| AiTaskType::from_str(&t).ok_or_else(|| anyhow!("Invalid task type: {t}")))
            .transpose()?;

        Ok(AiTaskFilter {
            agent_id: self.agent,
            status,
            task_type,
            task_id: self.task,
            is_local_task: self.local,
            ..AiTaskFilter::default()
        })
    }
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// What the agent should achieve
    pub objective: Option<String>,
    /// Owning regular task ID
    #[arg(long)]
    pub task: Option<Uuid>,
    /// Agent to delegate to
    #[arg(short, long)]
    pub agent: Option<String>,
    /// Task type (generation, analysis, coding, ...)
    #[arg(short = 't', long = "type")]
    pub task_type: Option<String>,
    /// Mode (plan_only, dry_run, execute)
    #[arg(long)]
    pub mode: Option<String>,
    /// Priority (low, medium, high, urgent)
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Tag, may be repeated
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,
    /// Token budget
    #[arg(long)]
    pub max_tokens: Option<i64>,
    /// Estimated cost in USD
    #[arg(long)]
    pub estimated_cost: Option<f64>,
    /// Due date (RFC 3339)
    #[arg(long)]
    pub due: Option<DateTime<Utc>>,
    /// Read the full request from a JSON file; flags override its fields
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl CreateArgs {
    async fn into_request(self) -> Result<CreateAiTaskRequest> {
        let mut request: CreateAiTaskRequest = match &self.file {
            Some(path) => read_json(path).await?,
            None => CreateAiTaskRequest::default(),
        };

        overlay(&mut request.objective, self.objective);
        overlay(&mut request.task_id, self.task);
        overlay(&mut request.agent_id, self.agent);
        overlay(&mut request.task_type, self.task_type);
        overlay(&mut request.mode, self.mode);
        overlay(&mut request.priority, self.priority);
        overlay(&mut request.model, self.model);
        overlay(&mut request.max_tokens, self.max_tokens);
        overlay(&mut request.estimated_cost, self.estimated_cost);
        overlay(&mut request.due_at, self.due);
        if !self.tags.is_empty() {
            request.tags = self.tags;
        }

        Ok(request)
    }
}

#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// AI task ID
    pub id: Uuid,
    #[arg(long)]
    pub objective: Option<String>,
    #[arg(short, long)]
    pub agent: Option<String>,
    #[arg(short = 't', long = "type")]
    pub task_type: Option<String>,
    #[arg(long)]
    pub mode: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(short, long)]
    pub priority: Option<String>,
    /// Replace tags, may be repeated
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(short, long)]
    pub model: Option<String>,
    #[arg(long)]
    pub max_tokens: Option<i64>,
    #[arg(long)]
    pub estimated_cost: Option<f64>,
    #[arg(long)]
    pub actual_cost: Option<f64>,
    /// Read the update from a JSON file; flags override its fields
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

impl UpdateArgs {
    async fn into_request(self) -> Result<UpdateAiTaskRequest> {
        let mut request: UpdateAiTaskRequest = match &self.file {
            Some(path) => read_json(path).await?,
            None => UpdateAiTaskRequest::default(),
        };

        overlay(&mut request.objective, self.objective);
        overlay(&mut request.agent_id, self.agent);
        overlay(&mut request.task_type, self.task_type);
        overlay(&mut request.mode, self.mode);
        overlay(&mut request.status, self.status);
        overlay(&mut request.priority, self.priority);
        overlay(&mut request.model, self.model);
        overlay(&mut request.max_tokens, self.max_tokens);
        overlay(&mut request.estimated_cost, self.estimated_cost);
        overlay(&mut request.actual_cost, self.actual_cost);
        if !self.tags.is_empty() {
            request.tags = Some(self.tags);
        }

        Ok(request)
    }
}

#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// AI task ID
    pub id: Uuid,
    /// New status
    pub status: String,
    /// Executor output (JSON, or plain text)
    #[arg(long)]
    pub output: Option<String>,
    /// Error reported by the executor
    #[arg(long)]
    pub error: Option<String>,
    #[arg(long)]
    pub tokens: Option<u64>,
    /// Actual cost in USD
    #[arg(long)]
    pub cost: Option<f64>,
    #[arg(long)]
    pub duration_ms: Option<u64>,
    #[arg(long)]
    pub model_used: Option<String>,
}

impl StatusArgs {
    fn execution_result(&self) -> Option<ExecutionResult> {
        let result = ExecutionResult {
            output_data: self
                .output
                .as_deref()
                .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))),
            error_message: self.error.clone(),
            tokens_used: self.tokens,
            actual_cost: self.cost,
            execution_time_ms: self.duration_ms,
            model_used: self.model_used.clone(),
            provider_used: None,
        };
        (result != ExecutionResult::default()).then_some(result)
    }
}

/// Accepted shapes of a batch file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Request(BatchCreateRequest),
    Tasks(Vec<CreateAiTaskRequest>),
}

impl BatchFile {
    fn into_request(self, fail_fast: bool) -> BatchCreateRequest {
        let mut request = match self {
            Self::Request(request) => request,
            Self::Tasks(tasks) => BatchCreateRequest {
                tasks,
                execution_options: BatchExecutionOptions::default(),
            },
        };
        request.execution_options.fail_fast |= fail_fast;
        request
    }
}

#[derive(Debug, Serialize)]
struct CostEstimate {
    model: String,
    max_tokens: Option<u32>,
    estimated_cost: f64,
}

#[derive(Debug, Serialize)]
struct ExecutionCheck {
    task_id: Uuid,
    ready: bool,
}

fn overlay<T>(field: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *field = value;
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn render_task(enriched: &EnrichedAiTask) -> String {
    let task = &enriched.task;
    let mut lines = vec![
        format!("AI task: {}", task.objective),
        format!("ID: {}", task.id),
        format!("Agent: {}", task.agent_id),
        format!("Type: {}", task.task_type),
        format!("Mode: {}", task.mode),
        format!("Status: {}", task.status),
        format!("Priority: {}", enriched.priority),
        format!("Version: {}", task.version),
    ];

    if let Some(task_id) = task.task_id {
        lines.push(format!("Task: {task_id}"));
    }
    if !enriched.tags.is_empty() {
        lines.push(format!("Tags: {}", enriched.tags.join(", ")));
    }
    lines.push(format!("Model: {}", task.resolved_model()));
    if let Some(cost) = task.estimated_cost_usd {
        lines.push(format!("Estimated cost: ${cost:.2}"));
    }
    if let Some(cost) = task.actual_cost_usd {
        lines.push(format!("Actual cost: ${cost:.2}"));
    }
    if let Some(due) = task.due_at {
        lines.push(format!("Due: {}", due.format("%Y-%m-%d %H:%M UTC")));
    }
    lines.push(format!(
        "Retries: {}/{}",
        task.metadata.retry_count, task.metadata.max_retries
    ));
    if let Some(reason) = &task.metadata.cancellation_reason {
        lines.push(format!("Cancellation reason: {reason}"));
    }
    if let Some(error) = task.execution_result.as_ref().and_then(|r| r.error_message.as_ref()) {
        lines.push(format!("Last error: {error}"));
    }

    if !task.history.is_empty() {
        lines.push("\nHistory:".to_string());
        for change in &task.history {
            let from = change.from.map_or("-", |s| s.as_str());
            let mut line = format!(
                "  {}  {} -> {}",
                change.at.format("%Y-%m-%d %H:%M:%S"),
                from,
                change.to
            );
            if let Some(reason) = &change.reason {
                let _ = write!(line, " ({reason})");
            }
            lines.push(line);
        }
    }

    lines.join("\n")
}

pub async fn execute(args: AiArgs, config: &Config, json_mode: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let service = build_service(&pool, config);
    let tables = TableFormatter::new();

    match args.command {
        AiCommands::Create(create) => {
            let request = create.into_request().await?;
            let result = service.create_ai_task(request).await;
            respond_result(result, json_mode, |task| {
                format!("AI task created: {}\n\n{}", task.task.id, render_task(task))
            })
        }
        AiCommands::List { filter, limit, offset } => {
            let filter = AiTaskFilter {
                limit: Some(limit),
                offset: Some(offset),
                ..filter.into_filter()?
            };
            let listing = match filter.agent_id.clone() {
                Some(agent) => service.get_tasks_by_agent(&agent, Some(filter)).await,
                None => service.find_ai_tasks(&filter).await,
            };
            let response = ApiResponse::from_listing(listing);
            let total = response.total.unwrap_or(0);
            respond(response, json_mode, |tasks| {
                if tasks.is_empty() {
                    "No AI tasks found.".to_string()
                } else {
                    format!("Showing {} of {} AI task(s):\n{}", tasks.len(), total, tables.format_ai_tasks(tasks))
                }
            })
        }
        AiCommands::Show { id } => respond_result(service.get_ai_task(id).await, json_mode, render_task),
        AiCommands::Update(update) => {
            let id = update.id;
            let request = update.into_request().await?;
            respond_result(service.update_ai_task(id, request).await, json_mode, |task| {
                format!("AI task updated (version {})", task.task.version)
            })
        }
        AiCommands::Status(status_args) => {
            let status = AiTaskStatus::from_str(&status_args.status)
                .ok_or_else(|| anyhow!("Invalid status: {}", status_args.status))?;
            let result = service
                .update_task_status(status_args.id, status, status_args.execution_result())
                .await;
            respond_result(result, json_mode, |task| format!("AI task is now {}", task.task.status))
        }
        AiCommands::Schedule { id, when } => {
            respond_result(service.schedule_task(id, when).await, json_mode, |_| {
                format!("AI task due {}", when.format("%Y-%m-%d %H:%M UTC"))
            })
        }
        AiCommands::Retry { id } => respond_result(service.retry_failed_task(id).await, json_mode, |task| {
            format!(
                "AI task queued for retry ({}/{} retries used)",
                task.task.metadata.retry_count, task.task.metadata.max_retries
            )
        }),
        AiCommands::Cancel { id, reason } => {
            respond_result(service.cancel_task(id, reason).await, json_mode, |_| {
                "AI task cancelled".to_string()
            })
        }
        AiCommands::Delete { id } => {
            let result = service
                .delete_ai_task(id)
                .await
                .map(|()| serde_json::json!({ "id": id, "deleted": true }));
            respond_result(result, json_mode, |_| format!("AI task {id} deleted"))
        }
        AiCommands::Estimate { model, max_tokens } => {
            let request = CostEstimateRequest {
                model: model.clone(),
                max_tokens,
            };
            let result = service.estimate_task_cost(&request).map(|estimated_cost| CostEstimate {
                model: model.unwrap_or_else(|| "unknown".to_string()),
                max_tokens,
                estimated_cost,
            });
            respond_result(result, json_mode, |estimate| {
                format!("Estimated cost for {}: ${:.2}", estimate.model, estimate.estimated_cost)
            })
        }
        AiCommands::Costs { filter } => {
            let filter = filter.into_filter()?;
            respond_result(service.get_cost_analysis(Some(filter)).await, json_mode, |analysis| {
                tables.format_cost_analysis(analysis)
            })
        }
        AiCommands::Stats => respond_result(service.get_task_statistics().await, json_mode, |stats| {
            tables.format_statistics(stats)
        }),
        AiCommands::Batch { file, fail_fast } => {
            let request = read_json::<BatchFile>(&file).await?.into_request(fail_fast);
            respond_result(service.create_batch_tasks(request).await, json_mode, |result| {
                tables.format_batch_result(result)
            })
        }
        AiCommands::Execute { ids, fail_fast } => {
            let context = ExecutionContext {
                fail_fast,
                ..ExecutionContext::default()
            };
            respond_result(service.execute_batch(&ids, Some(context)).await, json_mode, |result| {
                tables.format_batch_result(result)
            })
        }
        AiCommands::Check { id, cost_cap } => {
            let context = ExecutionContext {
                fail_fast: false,
                per_task_cost_cap: cost_cap,
            };
            let result = service.get_ai_task(id).await.and_then(|enriched| {
                service
                    .validate_task_execution(&enriched.task, Some(&context))
                    .map(|()| ExecutionCheck { task_id: id, ready: true })
            });
            respond_result(result, json_mode, |_| "AI task is ready to execute".to_string())
        }
    }
}

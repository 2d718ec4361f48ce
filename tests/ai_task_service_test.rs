//! Integration tests for the AI task service against an in-memory SQLite
//! database.
//!
//! Covers:
//! 1. Task type validation on create
//! 2. The status transition table
//! 3. Retry limits
//! 4. Deleting running tasks
//! 5. Cost estimation
//! 6. Tag normalization
//! 7. Batch create with and without fail_fast
//! 8. Cancellation rules

mod helpers;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use helpers::database::{create_request, setup_service, TestService, TEST_USER};
use zflow::domain::errors::DomainError;
use zflow::domain::models::{
    AiTaskStatus, AiTaskType, BatchCreateRequest, BatchExecutionOptions, CostEstimateRequest,
    CreateAiTaskRequest, ExecutionContext, ExecutionResult, UpdateAiTaskRequest,
};
use zflow::domain::ports::AiTaskFilter;
use zflow::services::ApiResponse;

async fn create_with_status(service: &TestService, parent: Uuid, status: AiTaskStatus) -> Uuid {
    let request = CreateAiTaskRequest {
        status: Some(status.as_str().to_string()),
        ..create_request(parent, "Summarize findings")
    };
    service
        .create_ai_task(request)
        .await
        .expect("create should succeed")
        .task
        .id
}

async fn drive_to(service: &TestService, id: Uuid, path: &[AiTaskStatus]) {
    for status in path {
        service
            .update_task_status(id, *status, None)
            .await
            .expect("transition along the table should succeed");
    }
}

// =============================================================================
// 1. TASK TYPES
// =============================================================================

#[tokio::test]
async fn test_create_accepts_every_task_type() {
    let (service, parent, _pool) = setup_service().await;

    for task_type in AiTaskType::ALL {
        let request = CreateAiTaskRequest::new(parent, "agent", "Do the thing", task_type.as_str());
        let created = service.create_ai_task(request).await.unwrap();
        assert_eq!(created.task.task_type, task_type);
        assert_eq!(created.task.status, AiTaskStatus::Pending);
        assert_eq!(created.task.user_id, TEST_USER);
    }
}

#[tokio::test]
async fn test_create_rejects_unknown_task_type() {
    let (service, parent, _pool) = setup_service().await;

    let err = service
        .create_ai_task(CreateAiTaskRequest::new(parent, "agent", "Do it", "painting"))
        .await
        .unwrap_err();

    match err {
        DomainError::Validation(messages) => {
            assert!(messages.iter().any(|m| m == "Invalid task type: painting"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_reports_every_violation_at_once() {
    let (service, _parent, _pool) = setup_service().await;

    let request = CreateAiTaskRequest {
        temperature: Some(3.5),
        mode: Some("yolo".to_string()),
        ..CreateAiTaskRequest::default()
    };
    let err = service.create_ai_task(request).await.unwrap_err();

    let DomainError::Validation(messages) = err else {
        panic!("expected validation error");
    };
    for expected in [
        "Task ID is required",
        "Agent ID is required",
        "Objective is required",
        "Task type is required",
        "Invalid mode: yolo",
        "Temperature must be between 0 and 2",
    ] {
        assert!(messages.iter().any(|m| m == expected), "missing: {expected}");
    }
}

#[tokio::test]
async fn test_create_requires_existing_related_task() {
    let (service, _parent, _pool) = setup_service().await;

    let err = service
        .create_ai_task(create_request(Uuid::new_v4(), "Orphan"))
        .await
        .unwrap_err();

    let DomainError::Validation(messages) = err else {
        panic!("expected validation error");
    };
    assert!(messages.iter().any(|m| m == "Related task not found"));
}

// =============================================================================
// 2. TRANSITION TABLE
// =============================================================================

#[tokio::test]
async fn test_transition_table_is_enforced_for_every_pair() {
    let (service, parent, _pool) = setup_service().await;

    for from in AiTaskStatus::ALL {
        for to in AiTaskStatus::ALL {
            let id = create_with_status(&service, parent, from).await;
            let result = service.update_task_status(id, to, None).await;

            if from.can_transition_to(to) {
                let updated = result.unwrap_or_else(|e| panic!("{from} -> {to} should succeed: {e}"));
                assert_eq!(updated.task.status, to);
            } else {
                match result {
                    Err(DomainError::BusinessRule(message)) => {
                        assert_eq!(message, format!("Invalid status transition from {from} to {to}"));
                    }
                    other => panic!("{from} -> {to} should be rejected, got {other:?}"),
                }
            }
        }
    }
}

#[tokio::test]
async fn test_update_ai_task_enforces_transitions() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;

    let err = service
        .update_ai_task(id, UpdateAiTaskRequest::status("completed"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, DomainError::BusinessRule(m) if m == "Invalid status transition from pending to completed")
    );

    let updated = service
        .update_ai_task(id, UpdateAiTaskRequest::status("in_progress"))
        .await
        .unwrap();
    assert_eq!(updated.task.status, AiTaskStatus::InProgress);
    assert_eq!(updated.task.history.len(), 2);
}

#[tokio::test]
async fn test_status_update_records_execution_result() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;
    drive_to(&service, id, &[AiTaskStatus::InProgress]).await;

    let result = ExecutionResult {
        output_data: Some(json!({"summary": "done"})),
        tokens_used: Some(1200),
        actual_cost: Some(0.04),
        model_used: Some("gpt-4".to_string()),
        ..ExecutionResult::default()
    };
    let completed = service
        .update_task_status(id, AiTaskStatus::Completed, Some(result))
        .await
        .unwrap();

    assert_eq!(completed.task.status, AiTaskStatus::Completed);
    assert_eq!(completed.task.actual_cost_usd, Some(0.04));
    assert_eq!(completed.task.resolved_model(), "gpt-4");
    let stored = completed.task.execution_result.unwrap();
    assert_eq!(stored.tokens_used, Some(1200));
}

// =============================================================================
// 3. RETRY
// =============================================================================

#[tokio::test]
async fn test_retry_at_limit_fails() {
    let (service, parent, _pool) = setup_service().await;
    let mut request = create_request(parent, "Flaky job");
    request.metadata.insert("retry_count".to_string(), json!(3));
    request.max_retries = Some(3);
    let id = service.create_ai_task(request).await.unwrap().task.id;
    drive_to(&service, id, &[AiTaskStatus::InProgress, AiTaskStatus::Failed]).await;

    let err = service.retry_failed_task(id).await.unwrap_err();
    assert!(matches!(&err, DomainError::BusinessRule(m) if m == "Maximum retry attempts reached"));
}

#[tokio::test]
async fn test_retry_below_limit_resets_to_pending() {
    let (service, parent, _pool) = setup_service().await;
    let mut request = create_request(parent, "Flaky job");
    request.metadata.insert("retry_count".to_string(), json!(1));
    let id = service.create_ai_task(request).await.unwrap().task.id;
    drive_to(&service, id, &[AiTaskStatus::InProgress]).await;
    service
        .update_task_status(
            id,
            AiTaskStatus::Failed,
            Some(ExecutionResult {
                error_message: Some("timeout".to_string()),
                ..ExecutionResult::default()
            }),
        )
        .await
        .unwrap();

    let retried = service.retry_failed_task(id).await.unwrap();
    assert_eq!(retried.task.status, AiTaskStatus::Pending);
    assert_eq!(retried.task.metadata.retry_count, 1);
    assert!(retried.task.execution_result.is_none());
}

#[tokio::test]
async fn test_retry_requires_failed_status() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;

    assert!(matches!(
        service.retry_failed_task(id).await,
        Err(DomainError::BusinessRule(_))
    ));
}

// =============================================================================
// 4. DELETE
// =============================================================================

#[tokio::test]
async fn test_delete_running_task_fails() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;
    drive_to(&service, id, &[AiTaskStatus::InProgress]).await;

    let err = service.delete_ai_task(id).await.unwrap_err();
    assert!(
        matches!(&err, DomainError::BusinessRule(m) if m == "Cannot delete task that is currently executing")
    );
}

#[tokio::test]
async fn test_delete_other_statuses_succeeds() {
    let (service, parent, _pool) = setup_service().await;

    for status in AiTaskStatus::ALL
        .into_iter()
        .filter(|s| *s != AiTaskStatus::InProgress)
    {
        let id = create_with_status(&service, parent, status).await;
        service.delete_ai_task(id).await.unwrap();
        assert!(matches!(
            service.get_ai_task(id).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}

// =============================================================================
// 5. COST ESTIMATION
// =============================================================================

#[tokio::test]
async fn test_estimate_task_cost() {
    let (service, _parent, _pool) = setup_service().await;

    let gpt4 = service
        .estimate_task_cost(&CostEstimateRequest {
            model: Some("gpt-4".to_string()),
            max_tokens: Some(2000),
        })
        .unwrap();
    assert!((gpt4 - 0.06).abs() < f64::EPSILON);

    let unknown = service
        .estimate_task_cost(&CostEstimateRequest {
            model: Some("unknown-model".to_string()),
            max_tokens: Some(1000),
        })
        .unwrap();
    assert!((unknown - 0.01).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_cost_analysis_groups_by_model_and_type() {
    let (service, parent, _pool) = setup_service().await;

    let mut coding = CreateAiTaskRequest::new(parent, "coder", "Write the parser", "coding");
    coding.model = Some("claude-3-sonnet".to_string());
    let coding_id = service.create_ai_task(coding).await.unwrap().task.id;
    drive_to(&service, coding_id, &[AiTaskStatus::InProgress]).await;
    service
        .update_task_status(
            coding_id,
            AiTaskStatus::Completed,
            Some(ExecutionResult {
                actual_cost: Some(0.5),
                model_used: Some("claude-3-opus".to_string()),
                ..ExecutionResult::default()
            }),
        )
        .await
        .unwrap();
    service
        .create_ai_task(create_request(parent, "Still waiting"))
        .await
        .unwrap();

    let analysis = service.get_cost_analysis(None).await.unwrap();
    assert_eq!(analysis.task_count, 2);
    assert_eq!(analysis.completed_tasks, 1);
    assert_eq!(analysis.pending_tasks, 1);
    assert!((analysis.total_actual_cost - 0.5).abs() < 1e-9);
    assert!((analysis.cost_by_model["claude-3-opus"] - 0.5).abs() < 1e-9);
    assert!((analysis.cost_by_type["coding"] - 0.5).abs() < 1e-9);

    let stats = service.get_task_statistics().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.by_status["completed"], 1);
    assert!((stats.completion_rate - 0.5).abs() < 1e-9);
}

// =============================================================================
// 6. TAGS AND ENRICHMENT
// =============================================================================

#[tokio::test]
async fn test_tags_are_trimmed_deduplicated_and_filtered() {
    let (service, parent, _pool) = setup_service().await;

    let request = CreateAiTaskRequest {
        tags: vec![" a ".to_string(), "a".to_string(), String::new()],
        priority: Some("high".to_string()),
        ..create_request(parent, "Tagged")
    };
    let created = service.create_ai_task(request).await.unwrap();

    assert_eq!(created.tags, vec!["a".to_string()]);
    assert_eq!(created.task.metadata.tags, vec!["a".to_string()]);

    let json = serde_json::to_value(&created).unwrap();
    assert_eq!(json["tags"], json!(["a"]));
    assert_eq!(json["priority"], "high");
    assert_eq!(json["metadata"]["tags"], json!(["a"]));
}

#[tokio::test]
async fn test_metadata_update_is_deep_merged() {
    let (service, parent, _pool) = setup_service().await;
    let mut request = create_request(parent, "Merge me");
    request
        .metadata
        .insert("workspace".to_string(), json!({"repo": "journal", "branch": "main"}));
    let id = service.create_ai_task(request).await.unwrap().task.id;

    let patch = json!({"workspace": {"branch": "feature"}});
    let updated = service
        .update_ai_task(
            id,
            UpdateAiTaskRequest {
                metadata: patch.as_object().cloned(),
                ..UpdateAiTaskRequest::default()
            },
        )
        .await
        .unwrap();

    let workspace = &updated.task.metadata.extra["workspace"];
    assert_eq!(workspace["repo"], "journal");
    assert_eq!(workspace["branch"], "feature");
}

#[tokio::test]
async fn test_null_metadata_keys_create_with_defaults() {
    let (service, parent, _pool) = setup_service().await;
    let mut request = create_request(parent, "Null metadata");
    request.metadata.insert("tags".to_string(), json!(null));
    request.metadata.insert("retry_count".to_string(), json!(null));
    request.metadata.insert("max_retries".to_string(), json!(null));
    request.metadata.insert("priority".to_string(), json!(null));

    let created = service.create_ai_task(request).await.unwrap();

    let metadata = &created.task.metadata;
    assert!(metadata.tags.is_empty());
    assert_eq!(metadata.retry_count, 0);
    assert_eq!(metadata.max_retries, 3);
    assert_eq!(created.priority.as_str(), "medium");
}

#[tokio::test]
async fn test_null_tags_in_metadata_patch_clears_tags() {
    let (service, parent, _pool) = setup_service().await;
    let request = CreateAiTaskRequest {
        tags: vec!["weekly".to_string()],
        ..create_request(parent, "Tagged")
    };
    let id = service.create_ai_task(request).await.unwrap().task.id;

    let patch = json!({"tags": null, "max_retries": null});
    let updated = service
        .update_ai_task(
            id,
            UpdateAiTaskRequest {
                metadata: patch.as_object().cloned(),
                ..UpdateAiTaskRequest::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.task.metadata.tags.is_empty());
    assert_eq!(updated.task.metadata.max_retries, 3);

    let stored = service.get_ai_task(id).await.unwrap();
    assert!(stored.task.metadata.tags.is_empty());
}

// =============================================================================
// 7. BATCHES
// =============================================================================

fn three_requests(parent: Uuid) -> Vec<CreateAiTaskRequest> {
    vec![
        create_request(parent, "First"),
        CreateAiTaskRequest {
            objective: None,
            ..create_request(parent, "ignored")
        },
        create_request(parent, "Third"),
    ]
}

#[tokio::test]
async fn test_batch_create_continues_past_failures() {
    let (service, parent, _pool) = setup_service().await;

    let result = service
        .create_batch_tasks(BatchCreateRequest {
            tasks: three_requests(parent),
            execution_options: BatchExecutionOptions { fail_fast: false },
        })
        .await
        .unwrap();

    assert_eq!(result.total_tasks, 3);
    assert_eq!(result.successful_tasks, 2);
    assert_eq!(result.failed_tasks, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].task_index, 1);
    assert_eq!(result.results.len(), 2);
}

#[tokio::test]
async fn test_batch_create_fail_fast_stops_at_first_failure() {
    let (service, parent, _pool) = setup_service().await;

    let result = service
        .create_batch_tasks(BatchCreateRequest {
            tasks: three_requests(parent),
            execution_options: BatchExecutionOptions { fail_fast: true },
        })
        .await
        .unwrap();

    assert_eq!(result.successful_tasks, 1);
    assert_eq!(result.failed_tasks, 1);
    assert_eq!(result.errors[0].task_index, 1);

    let listing = service.find_ai_tasks(&AiTaskFilter::default()).await.unwrap();
    assert_eq!(listing.total, 1);
}

#[tokio::test]
async fn test_batch_create_rejects_empty_batch() {
    let (service, _parent, _pool) = setup_service().await;

    assert!(matches!(
        service.create_batch_tasks(BatchCreateRequest::default()).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_execute_batch_flips_pending_tasks() {
    let (service, parent, _pool) = setup_service().await;
    let first = create_with_status(&service, parent, AiTaskStatus::Pending).await;
    let done = create_with_status(&service, parent, AiTaskStatus::Completed).await;
    let missing = Uuid::new_v4();

    let result = service
        .execute_batch(&[first, done, missing], None)
        .await
        .unwrap();

    assert_eq!(result.successful_tasks, 1);
    assert_eq!(result.failed_tasks, 2);
    assert_eq!(result.errors[0].task_id, Some(done));
    assert_eq!(result.errors[1].task_id, Some(missing));
    assert_eq!(
        service.get_ai_task(first).await.unwrap().task.status,
        AiTaskStatus::InProgress
    );

    let stopped = service
        .execute_batch(&[done, first], Some(ExecutionContext { fail_fast: true, per_task_cost_cap: None }))
        .await
        .unwrap();
    assert_eq!(stopped.failed_tasks, 1);
    assert_eq!(stopped.successful_tasks, 0);
}

// =============================================================================
// 8. CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_cancel_completed_task_fails() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;
    drive_to(&service, id, &[AiTaskStatus::InProgress, AiTaskStatus::Completed]).await;

    let err = service.cancel_task(id, None).await.unwrap_err();
    assert!(matches!(&err, DomainError::BusinessRule(m) if m == "Cannot cancel a completed task"));
}

#[tokio::test]
async fn test_cancel_from_active_statuses() {
    let (service, parent, _pool) = setup_service().await;

    let paths: [&[AiTaskStatus]; 3] = [
        &[],
        &[AiTaskStatus::InProgress],
        &[AiTaskStatus::InProgress, AiTaskStatus::Failed],
    ];
    for path in paths {
        let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;
        drive_to(&service, id, path).await;

        let cancelled = service
            .cancel_task(id, Some("  no longer needed ".to_string()))
            .await
            .unwrap();
        assert_eq!(cancelled.task.status, AiTaskStatus::Cancelled);
        assert_eq!(
            cancelled.task.metadata.cancellation_reason.as_deref(),
            Some("no longer needed")
        );
        assert!(cancelled.task.metadata.cancelled_at.is_some());
    }
}

#[tokio::test]
async fn test_cancel_without_reason_leaves_metadata_alone() {
    let (service, parent, _pool) = setup_service().await;
    let id = create_with_status(&service, parent, AiTaskStatus::Pending).await;

    let cancelled = service.cancel_task(id, None).await.unwrap();
    assert_eq!(cancelled.task.status, AiTaskStatus::Cancelled);
    assert!(cancelled.task.metadata.cancellation_reason.is_none());
    assert!(cancelled.task.metadata.cancelled_at.is_none());
}

// =============================================================================
// SCHEDULING, EXECUTION CHECKS, LISTING
// =============================================================================

#[tokio::test]
async fn test_validate_task_execution_collects_all_violations() {
    let (service, parent, _pool) = setup_service().await;
    let mut request = create_request(parent, "Late and pricey");
    request.estimated_cost = Some(5.0);
    request.metadata.insert("retry_count".to_string(), json!(3));
    let id = service.create_ai_task(request).await.unwrap().task.id;
    service
        .schedule_task(id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    drive_to(&service, id, &[AiTaskStatus::InProgress]).await;

    let task = service.get_ai_task(id).await.unwrap().task;
    let context = ExecutionContext {
        fail_fast: false,
        per_task_cost_cap: Some(1.0),
    };
    let err = service
        .validate_task_execution(&task, Some(&context))
        .unwrap_err();

    let DomainError::Validation(messages) = err else {
        panic!("expected validation error");
    };
    assert_eq!(messages.len(), 4);
    assert!(messages.contains(&"Task due date has passed".to_string()));
    assert!(messages.contains(&"Maximum retry attempts reached".to_string()));
    assert!(messages.contains(&"Task must be pending to execute (current status: in_progress)".to_string()));
}

#[tokio::test]
async fn test_get_tasks_by_agent_and_listing_envelope() {
    let (service, parent, _pool) = setup_service().await;
    for i in 0..3 {
        service
            .create_ai_task(CreateAiTaskRequest::new(parent, "writer", format!("Draft {i}"), "generation"))
            .await
            .unwrap();
    }
    service
        .create_ai_task(create_request(parent, "Someone else's"))
        .await
        .unwrap();

    let page = service
        .get_tasks_by_agent(
            "writer",
            Some(AiTaskFilter {
                limit: Some(2),
                ..AiTaskFilter::default()
            }),
        )
        .await;
    let response = ApiResponse::from_listing(page);

    assert!(response.is_ok());
    assert_eq!(response.total, Some(3));
    let tasks = response.data.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.task.agent_id == "writer"));
}

#[tokio::test]
async fn test_not_found_maps_to_error_envelope() {
    let (service, _parent, _pool) = setup_service().await;

    let response: ApiResponse<_> = service.get_ai_task(Uuid::new_v4()).await.into();
    assert!(response.data.is_none());
    assert_eq!(response.error.unwrap().kind, "not_found");
}

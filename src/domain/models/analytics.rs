//! Cost and completion analytics over AI tasks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ai_task::{AiTask, AiTaskStatus};

/// Cost breakdown over a set of AI tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysis {
    pub total_estimated_cost: f64,
    pub total_actual_cost: f64,
    pub task_count: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub failed_tasks: usize,
    pub average_cost_per_task: f64,
    /// Actual cost keyed by the model the task resolved to
    pub cost_by_model: BTreeMap<String, f64>,
    pub cost_by_type: BTreeMap<String, f64>,
}

impl CostAnalysis {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_tasks(tasks: &[AiTask]) -> Self {
        let mut analysis = Self {
            task_count: tasks.len(),
            ..Default::default()
        };

        for task in tasks {
            let actual = task.actual_cost_usd.unwrap_or(0.0);
            analysis.total_estimated_cost += task.estimated_cost_usd.unwrap_or(0.0);
            analysis.total_actual_cost += actual;

            match task.status {
                AiTaskStatus::Completed => analysis.completed_tasks += 1,
                AiTaskStatus::Pending => analysis.pending_tasks += 1,
                AiTaskStatus::Failed => analysis.failed_tasks += 1,
                _ => {}
            }

            *analysis
                .cost_by_model
                .entry(task.resolved_model().to_string())
                .or_default() += actual;
            *analysis
                .cost_by_type
                .entry(task.task_type.as_str().to_string())
                .or_default() += actual;
        }

        if !tasks.is_empty() {
            analysis.average_cost_per_task = analysis.total_actual_cost / tasks.len() as f64;
        }

        analysis
    }
}

/// Repository-level aggregate over a user's AI tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTaskStatistics {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub total_estimated_cost: f64,
    pub total_actual_cost: f64,
    /// Completed tasks as a fraction of all tasks, 0.0 when there are none
    pub completion_rate: f64,
}

impl AiTaskStatistics {
    pub fn completed(&self) -> u64 {
        self.by_status
            .get(AiTaskStatus::Completed.as_str())
            .copied()
            .unwrap_or(0)
    }

    /// Recompute `completion_rate` from the status counts.
    #[allow(clippy::cast_precision_loss)]
    pub fn finalize(mut self) -> Self {
        self.completion_rate = if self.total == 0 {
            0.0
        } else {
            self.completed() as f64 / self.total as f64
        };
        self
    }
}

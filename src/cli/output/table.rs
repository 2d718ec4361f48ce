//! Table output formatting for CLI commands
//!
//! Renders AI task listings, statistics, cost breakdowns and batch outcomes
//! using comfy-table. Colors are dropped when `NO_COLOR` is set or the
//! terminal is dumb.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;
use std::env;

use super::truncate;
use crate::domain::models::{AiTaskStatistics, AiTaskStatus, BatchResult, CostAnalysis, EnrichedAiTask};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
    max_width: Option<u16>,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self { use_colors, max_width }
    }

    /// Format a page of AI tasks
    pub fn format_ai_tasks(&self, tasks: &[EnrichedAiTask]) -> String {
        let mut table = self.create_base_table();

        table.set_header(header(&["ID", "Objective", "Type", "Status", "Agent", "Priority", "Est. $"]));

        for enriched in tasks {
            let task = &enriched.task;
            let id = task.id.to_string();
            let estimated = task
                .estimated_cost_usd
                .map_or_else(|| "-".to_string(), |cost| format!("{cost:.2}"));

            table.add_row(vec![
                Cell::new(&id[..8]),
                Cell::new(truncate(&task.objective, 40)),
                Cell::new(task.task_type.as_str()),
                self.status_cell(task.status),
                Cell::new(truncate(&task.agent_id, 20)),
                Cell::new(enriched.priority.as_str()),
                Cell::new(estimated),
            ]);
        }

        table.to_string()
    }

    /// Format aggregate statistics
    pub fn format_statistics(&self, stats: &AiTaskStatistics) -> String {
        let mut summary = self.create_base_table();
        summary.set_header(header(&["Metric", "Value"]));
        summary.add_row(vec![Cell::new("Total tasks"), Cell::new(stats.total)]);
        summary.add_row(vec![
            Cell::new("Completion rate"),
            Cell::new(format!("{:.1}%", stats.completion_rate * 100.0)),
        ]);
        summary.add_row(vec![
            Cell::new("Estimated cost"),
            Cell::new(format!("${:.2}", stats.total_estimated_cost)),
        ]);
        summary.add_row(vec![
            Cell::new("Actual cost"),
            Cell::new(format!("${:.2}", stats.total_actual_cost)),
        ]);

        let mut by_status = self.create_base_table();
        by_status.set_header(header(&["Status", "Count"]));
        for (status, count) in &stats.by_status {
            let cell = AiTaskStatus::from_str(status)
                .map_or_else(|| Cell::new(status), |s| self.status_cell(s));
            by_status.add_row(vec![cell, Cell::new(count)]);
        }

        let by_type = self.format_breakdown(&["Type", "Count"], &stats.by_type, |count| count.to_string());

        format!("{summary}\n\n{by_status}\n\n{by_type}")
    }

    /// Format a cost breakdown
    pub fn format_cost_analysis(&self, analysis: &CostAnalysis) -> String {
        let mut summary = self.create_base_table();
        summary.set_header(header(&["Metric", "Value"]));
        summary.add_row(vec![Cell::new("Tasks"), Cell::new(analysis.task_count)]);
        summary.add_row(vec![Cell::new("Completed"), Cell::new(analysis.completed_tasks)]);
        summary.add_row(vec![Cell::new("Pending"), Cell::new(analysis.pending_tasks)]);
        summary.add_row(vec![Cell::new("Failed"), Cell::new(analysis.failed_tasks)]);
        summary.add_row(vec![
            Cell::new("Estimated cost"),
            Cell::new(format!("${:.2}", analysis.total_estimated_cost)),
        ]);
        summary.add_row(vec![
            Cell::new("Actual cost"),
            Cell::new(format!("${:.2}", analysis.total_actual_cost)),
        ]);
        summary.add_row(vec![
            Cell::new("Average per task"),
            Cell::new(format!("${:.4}", analysis.average_cost_per_task)),
        ]);

        let money = |cost: &f64| format!("${cost:.2}");
        let by_model = self.format_breakdown(&["Model", "Cost"], &analysis.cost_by_model, money);
        let by_type = self.format_breakdown(&["Type", "Cost"], &analysis.cost_by_type, money);

        format!("{summary}\n\n{by_model}\n\n{by_type}")
    }

    /// Format a batch outcome: counts, then one row per failed item
    pub fn format_batch_result(&self, result: &BatchResult) -> String {
        let mut summary = self.create_base_table();
        summary.set_header(header(&["Total", "Succeeded", "Failed", "Est. cost"]));

        let failed = if self.use_colors && result.failed_tasks > 0 {
            Cell::new(result.failed_tasks).fg(Color::Red)
        } else {
            Cell::new(result.failed_tasks)
        };
        summary.add_row(vec![
            Cell::new(result.total_tasks),
            Cell::new(result.successful_tasks),
            failed,
            Cell::new(format!("${:.2}", result.total_cost)),
        ]);

        if result.errors.is_empty() {
            return summary.to_string();
        }

        let mut errors = self.create_base_table();
        errors.set_header(header(&["Index", "Task", "Error"]));
        for item in &result.errors {
            let task = item
                .task_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()[..8].to_string());
            errors.add_row(vec![
                Cell::new(item.task_index),
                Cell::new(task),
                Cell::new(truncate(&item.error, 80)),
            ]);
        }

        format!("{summary}\n\n{errors}")
    }

    fn format_breakdown<V>(&self, titles: &[&str], rows: &BTreeMap<String, V>, render: impl Fn(&V) -> String) -> String {
        let mut table = self.create_base_table();
        table.set_header(header(titles));
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key), Cell::new(render(value))]);
        }
        table.to_string()
    }

    fn status_cell(&self, status: AiTaskStatus) -> Cell {
        if self.use_colors {
            Cell::new(status.as_str()).fg(status_color(status))
        } else {
            Cell::new(format!("{} {}", status_icon(status), status))
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).add_attribute(Attribute::Bold))
        .collect()
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

const fn status_color(status: AiTaskStatus) -> Color {
    match status {
        AiTaskStatus::Pending => Color::White,
        AiTaskStatus::Assigned => Color::Yellow,
        AiTaskStatus::InProgress => Color::Cyan,
        AiTaskStatus::Paused => Color::Magenta,
        AiTaskStatus::Completed => Color::Green,
        AiTaskStatus::Failed => Color::Red,
        AiTaskStatus::Cancelled => Color::DarkGrey,
    }
}

const fn status_icon(status: AiTaskStatus) -> &'static str {
    match status {
        AiTaskStatus::Pending => "○",
        AiTaskStatus::Assigned => "●",
        AiTaskStatus::InProgress => "⟳",
        AiTaskStatus::Paused => "‖",
        AiTaskStatus::Completed => "✓",
        AiTaskStatus::Failed => "✗",
        AiTaskStatus::Cancelled => "⊘",
    }
}

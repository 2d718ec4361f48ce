pub mod ai_task_service;
pub mod cost_tracker;
pub mod response;
pub mod validation;

pub use ai_task_service::{AiTaskListing, AiTaskService};
pub use response::{ApiError, ApiResponse};
pub use validation::Violations;

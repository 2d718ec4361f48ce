//! Domain ports (trait interfaces) for the zflow AI task service.

pub mod ai_task_repository;
pub mod task_repository;

pub use ai_task_repository::{AiTaskFilter, AiTaskPage, AiTaskRepository, StatusUpdate};
pub use task_repository::TaskRepository;

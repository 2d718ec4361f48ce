//! Domain layer for the zflow AI task service
//!
//! This module contains the task models, the repository ports and the
//! error type shared by every layer.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};

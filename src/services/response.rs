//! Uniform `{data, error, total}` envelope for service results.

use serde::Serialize;

use super::ai_task_service::AiTaskListing;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EnrichedAiTask;

/// Error half of an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Machine-readable category, e.g. `validation_error`
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl From<&DomainError> for ApiError {
    fn from(err: &DomainError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            details: err.details().to_vec(),
        }
    }
}

/// Exactly one of `data` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            total: None,
        }
    }

    pub fn err(error: &DomainError) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
            total: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl<T> From<DomainResult<T>> for ApiResponse<T> {
    fn from(result: DomainResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

impl ApiResponse<Vec<EnrichedAiTask>> {
    /// Envelope for a listing, carrying the total match count.
    pub fn from_listing(result: DomainResult<AiTaskListing>) -> Self {
        match result {
            Ok(listing) => Self::ok(listing.tasks).with_total(listing.total),
            Err(e) => Self::err(&e),
        }
    }
}

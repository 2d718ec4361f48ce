//! Domain errors for the zflow AI task service.

use thiserror::Error;

/// Domain-level errors raised by the AI task service and its repositories.
#[derive(Debug, Error)]
pub enum DomainError {
    /// One or more input constraints were violated. Every violation is listed.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{0}")]
    BusinessRule(String),

    #[error("Concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Shorthand for a single-message validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRule(message.into())
    }

    /// Stable machine-readable tag for the error category.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::BusinessRule(_) => "business_rule_error",
            Self::ConcurrencyConflict { .. } => "concurrency_conflict",
            Self::DatabaseError(_) => "database_error",
            Self::SerializationError(_) => "serialization_error",
        }
    }

    /// Individual violation messages; empty for every other kind.
    pub fn details(&self) -> &[String] {
        match self {
            Self::Validation(messages) => messages,
            _ => &[],
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_joins_all_violations() {
        let err = DomainError::Validation(vec![
            "Objective is required".to_string(),
            "Invalid task type: foo".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Objective is required; Invalid task type: foo"
        );
        assert_eq!(err.details().len(), 2);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(DomainError::validation("x").kind(), "validation_error");
        assert_eq!(DomainError::not_found("AI task", "abc").kind(), "not_found");
        assert_eq!(
            DomainError::business_rule("nope").kind(),
            "business_rule_error"
        );
    }

    #[test]
    fn test_details_only_for_validation() {
        assert_eq!(DomainError::validation("x").details(), ["x".to_string()]);
        assert!(DomainError::business_rule("nope").details().is_empty());
    }

    #[test]
    fn test_not_found_display() {
        let err = DomainError::not_found("AI task", "1234");
        assert_eq!(err.to_string(), "AI task not found: 1234");
    }
}

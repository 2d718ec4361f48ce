//! Output formatting utilities for the CLI.
//!
//! Every command renders either a human-readable view or, with `--json`, the
//! `{data, error, total}` envelope produced by the service layer.

pub mod table;

use serde::Serialize;
use std::fmt::{self, Write as _};

use crate::domain::errors::DomainResult;
use crate::services::ApiResponse;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Marks an error whose envelope has already been written to stdout.
#[derive(Debug)]
pub struct ReportedError;

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("error already reported")
    }
}

impl std::error::Error for ReportedError {}

/// Print a service result.
///
/// In JSON mode the whole envelope goes to stdout, failures included; the
/// returned error only signals a non-zero exit. In human mode the domain
/// error is handed back to the caller for `handle_error`.
pub fn respond<T: Serialize>(
    response: ApiResponse<T>,
    json_mode: bool,
    render: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return if response.is_ok() {
            Ok(())
        } else {
            Err(ReportedError.into())
        };
    }

    match (response.data, response.error) {
        (Some(data), None) => {
            println!("{}", render(&data));
            Ok(())
        }
        (_, Some(error)) => {
            let mut message = error.message;
            if error.details.len() > 1 {
                for detail in &error.details {
                    let _ = write!(message, "\n  - {detail}");
                }
            }
            Err(anyhow::anyhow!(message))
        }
        (None, None) => Ok(()),
    }
}

/// Shorthand for [`respond`] on a plain domain result.
pub fn respond_result<T: Serialize>(
    result: DomainResult<T>,
    json_mode: bool,
    render: impl FnOnce(&T) -> String,
) -> anyhow::Result<()> {
    respond(result.into(), json_mode, render)
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long objective text", 10), "a long ...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_respond_human_error_lists_details() {
        let err = respond_result::<u32>(
            Err(DomainError::Validation(vec![
                "Agent ID is required".to_string(),
                "Objective is required".to_string(),
            ])),
            false,
            ToString::to_string,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("- Agent ID is required"));
        assert!(message.contains("- Objective is required"));
    }

    #[test]
    fn test_respond_json_error_is_marked_reported() {
        let err = respond_result::<u32>(
            Err(DomainError::business_rule("Cannot cancel a completed task")),
            true,
            ToString::to_string,
        )
        .unwrap_err();
        assert!(err.downcast_ref::<ReportedError>().is_some());
    }
}

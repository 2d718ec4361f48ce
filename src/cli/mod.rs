//! Command-line interface for zflow.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use output::ReportedError;

/// Print a command failure and exit with status 1.
///
/// JSON mode errors are written as the `{data, error}` envelope on stdout;
/// human mode errors go to stderr with their context chain.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if err.downcast_ref::<ReportedError>().is_none() {
        if json_mode {
            let envelope = serde_json::json!({
                "data": null,
                "error": {
                    "kind": "cli_error",
                    "message": format!("{err:#}"),
                },
            });
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
        } else {
            eprintln!("Error: {err:#}");
        }
    }
    std::process::exit(1);
}

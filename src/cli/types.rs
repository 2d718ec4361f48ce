//! CLI type definitions
//!
//! Top-level clap structures. Each subcommand's arguments live beside its
//! implementation under `commands/`.

use clap::{Parser, Subcommand};

use super::commands::ai::AiArgs;
use super::commands::init::InitArgs;
use super::commands::task::TaskArgs;

#[derive(Parser, Debug)]
#[command(name = "zflow")]
#[command(about = "zflow - AI task lifecycle for your productivity journal", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Act as this user instead of the configured one
    #[arg(short, long, global = true)]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize zflow configuration and database
    Init(InitArgs),

    /// Regular task commands
    Task(TaskArgs),

    /// AI task commands
    Ai(AiArgs),
}

//! Implementation of the `zflow init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::adapters::sqlite::{all_embedded_migrations, create_pool, database_url, Migrator, PoolConfig};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::{ConfigLoader, CONFIG_DIR};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.yaml with defaults
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub config_written: bool,
    pub database_path: PathBuf,
    pub migrations_applied: usize,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.config_written {
            lines.push(format!("\nWrote {}/config.yaml", CONFIG_DIR));
        }
        lines.push(format!("Database: {}", self.database_path.display()));
        if self.migrations_applied > 0 {
            lines.push(format!("Applied {} migration(s)", self.migrations_applied));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: &Config, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let config_dir = target_path.join(CONFIG_DIR);
    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let config_file = config_dir.join("config.yaml");
    let config_written = write_default_config(&config_file, args.force).await?;

    let database_path = resolve_database_path(&target_path, &config.database.path);
    let pool = create_pool(
        &database_url(&database_path.to_string_lossy()),
        Some(PoolConfig::from(&config.database)),
    )
    .await
    .context("Failed to create database")?;

    let migrations_applied = Migrator::new(pool.clone())
        .run_embedded_migrations(all_embedded_migrations())
        .await
        .context("Failed to run migrations")?;
    pool.close().await;

    info!(path = %target_path.display(), migrations_applied, "project initialized");

    let message = if config_written || migrations_applied > 0 {
        "zflow initialized."
    } else {
        "zflow already initialized."
    };
    output(
        &InitOutput {
            success: true,
            message: message.to_string(),
            initialized_path: target_path,
            config_written,
            database_path,
            migrations_applied,
        },
        json_mode,
    );
    Ok(())
}

/// Write the default config unless one exists. Returns whether a file was written.
async fn write_default_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    let yaml = ConfigLoader::default_yaml()?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

fn resolve_database_path(root: &Path, configured: &str) -> PathBuf {
    let configured = Path::new(configured);
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

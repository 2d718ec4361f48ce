use serde::{Deserialize, Serialize};

/// Main configuration structure for zflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// User the CLI acts as when `--user` is not given
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Service limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

fn default_user_id() -> String {
    "local".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".zflow/zflow.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration as it appears in config files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Log retention in days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Limits applied by the AI task service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Maximum requests accepted by one batch create (1-100)
    #[serde(default = "default_max_batch_create")]
    pub max_batch_create: usize,

    /// Maximum ids accepted by one batch execute (1-50)
    #[serde(default = "default_max_batch_execute")]
    pub max_batch_execute: usize,

    /// `max_retries` stamped on new tasks that do not set one
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

const fn default_max_batch_create() -> usize {
    100
}

const fn default_max_batch_execute() -> usize {
    50
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_create: default_max_batch_create(),
            max_batch_execute: default_max_batch_execute(),
            default_max_retries: default_max_retries(),
        }
    }
}

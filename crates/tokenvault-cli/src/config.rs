use std::env;
use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tokenvault_db_postgres::PostgresConfig;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tokenvault.toml";

/// Which document store backs the OAuth collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    /// Process-local; contents vanish when the command exits.
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: Backend,
    /// Logical database (PostgreSQL schema) holding the collections.
    pub database: String,
    pub log_level: String,
    pub postgres: PostgresConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            database: "oauth".into(),
            log_level: "warn".into(),
            postgres: PostgresConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.database.trim().is_empty() {
            return Err("database must not be empty".into());
        }
        let lvl = self.log_level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("log_level must be one of {valid_levels:?}"));
        }
        if self.backend == Backend::Postgres && self.postgres.pool_size == 0 {
            return Err("postgres.pool_size must be > 0".into());
        }
        Ok(())
    }
}

/// Where the configuration file path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (TOKENVAULT_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: TOKENVAULT_CONFIG
/// 3. Default: tokenvault.toml
pub fn resolve_config_path(cli_path: Option<&str>) -> (String, ConfigSource) {
    if let Some(path) = cli_path {
        return (path.to_string(), ConfigSource::CliArgument);
    }

    if let Ok(path) = env::var("TOKENVAULT_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
}

/// Loads the configuration file (if it exists) and applies
/// `TOKENVAULT__...` environment overrides, e.g. `TOKENVAULT__POSTGRES__URL`.
pub fn load_config(path: &str) -> Result<AppConfig, String> {
    let mut builder = Config::builder();
    let pathbuf = PathBuf::from(path);
    if pathbuf.exists() {
        builder = builder.add_source(File::from(pathbuf));
    }
    builder = builder.add_source(
        Environment::with_prefix("TOKENVAULT")
            .prefix_separator("__")
            .try_parsing(true)
            .separator("__"),
    );
    let cfg = builder
        .build()
        .map_err(|e| format!("config build error: {e}"))?;
    let merged: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| format!("config deserialize error: {e}"))?;
    merged.validate()?;
    Ok(merged)
}

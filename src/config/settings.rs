//! TOML-based configuration for classmetrics.
//!
//! Supports a config file (classmetrics.toml) with environment variable
//! expansion in string values.
//!
//! Example configuration:
//! ```toml
//! [compiler]
//! dialect = "postgres"      # postgres | duckdb | sqlite
//! max_limit = 10000
//!
//! [storage]
//! database = "${CLASSMETRICS_DB}"
//! query_timeout = "30s"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compiler::CompileOptions;
use crate::sql::Dialect;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CLASSMETRICS_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid duration format: {0}")]
    InvalidDuration(String),

    #[error("No database configured")]
    NoDatabase,
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Target dialect when none is given on the command line.
    pub dialect: Dialect,

    /// Cap on requested limits; 0 disables the cap.
    pub max_limit: u64,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_limit: 10_000,
        }
    }
}

/// Storage connector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database path (supports ${ENV_VAR} expansion).
    pub database: Option<String>,

    /// Per-query timeout (e.g., "500ms", "30s", "2m").
    pub query_timeout: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database: None,
            query_timeout: "30s".to_string(),
        }
    }
}

impl StorageSettings {
    /// Database path with environment variables expanded.
    pub fn database_path(&self) -> SettingsResult<PathBuf> {
        let raw = self.database.as_deref().ok_or(SettingsError::NoDatabase)?;
        Ok(PathBuf::from(expand_env_vars(raw)?))
    }

    pub fn query_timeout(&self) -> SettingsResult<Duration> {
        parse_duration(&self.query_timeout)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CLASSMETRICS_CONFIG`
    /// 2. `./classmetrics.toml`
    /// 3. `<config dir>/classmetrics/config.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("classmetrics.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("classmetrics").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Compile options derived from the `[compiler]` section.
    pub fn compile_options(&self) -> CompileOptions {
        let options = CompileOptions::default().with_dialect(self.compiler.dialect);
        match self.compiler.max_limit {
            0 => options,
            max => options.with_max_limit(max),
        }
    }
}

/// Parse a duration such as `250ms`, `30s`, `5m` or `1h`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> SettingsResult<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| SettingsError::InvalidDuration(s.to_string()))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(SettingsError::InvalidDuration(s.to_string())),
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Lone '$'
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

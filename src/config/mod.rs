//! Configuration module for classmetrics.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, parse_duration, CompilerSettings, LoggingSettings, Settings, SettingsError,
    SettingsResult, StorageSettings, CONFIG_ENV,
};

//! Engine configuration.
//!
//! # Responsibility
//! - Hold the tunables shared by the calculator and the lifecycle service.
//! - Load them from TOML and apply `CHOREWHEEL_*` environment overrides.
//!
//! # Invariants
//! - A config returned by `from_toml_str`/`load` has passed `validate()`.
//! - `adaptive_window` is never below `MIN_ADAPTIVE_WINDOW`.

use crate::logging::{default_log_level, normalize_level};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Fewest completions from which an adaptive cadence can be derived.
pub const MIN_ADAPTIVE_WINDOW: usize = 2;
/// Completions considered by adaptive cadence when unconfigured.
pub const DEFAULT_ADAPTIVE_WINDOW: usize = 5;

pub const ENV_DEFAULT_TIMEZONE: &str = "CHOREWHEEL_DEFAULT_TIMEZONE";
pub const ENV_ADAPTIVE_WINDOW: &str = "CHOREWHEEL_ADAPTIVE_WINDOW";
pub const ENV_ROTATE_ON_SKIP: &str = "CHOREWHEEL_ROTATE_ON_SKIP";
pub const ENV_LOG_LEVEL: &str = "CHOREWHEEL_LOG_LEVEL";

/// Tunables for the recurrence and assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Zone used for calendar arithmetic when a rule names none.
    pub default_timezone: Tz,
    /// Number of most recent completions averaged by adaptive rules.
    pub adaptive_window: usize,
    /// Whether a skip hands the chore to the next assignee.
    pub rotate_on_skip: bool,
    /// Log level for `init_logging`; build-mode default when unset.
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timezone: Tz::UTC,
            adaptive_window: DEFAULT_ADAPTIVE_WINDOW,
            rotate_on_skip: true,
            log_level: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(raw.as_str())
    }

    /// Applies `CHOREWHEEL_*` overrides read through `lookup`.
    ///
    /// Pass `|key| std::env::var(key).ok()` for process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEFAULT_TIMEZONE) {
            self.default_timezone = value.trim().parse::<Tz>().map_err(|_| {
                ConfigError::InvalidValue {
                    key: ENV_DEFAULT_TIMEZONE,
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = lookup(ENV_ADAPTIVE_WINDOW) {
            self.adaptive_window = value.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue {
                    key: ENV_ADAPTIVE_WINDOW,
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = lookup(ENV_ROTATE_ON_SKIP) {
            self.rotate_on_skip = parse_flag(value.as_str()).ok_or(ConfigError::InvalidValue {
                key: ENV_ROTATE_ON_SKIP,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = Some(value);
        }
        self.validate()
    }

    /// Level to start logging with: `log_level` when set, otherwise the
    /// build-mode default.
    pub fn effective_log_level(&self) -> &'static str {
        self.log_level
            .as_deref()
            .and_then(|level| normalize_level(level).ok())
            .unwrap_or_else(default_log_level)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.adaptive_window < MIN_ADAPTIVE_WINDOW {
            return Err(ConfigError::InvalidValue {
                key: "adaptive_window",
                value: self.adaptive_window.to_string(),
            });
        }
        if let Some(level) = self.log_level.as_deref() {
            normalize_level(level).map_err(|_| ConfigError::InvalidValue {
                key: "log_level",
                value: level.to_string(),
            })?;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration load/validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config: {message}"),
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: `{value}`"),
        }
    }
}

impl Error for ConfigError {}

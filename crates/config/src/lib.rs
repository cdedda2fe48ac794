//! Configuration loading and validation for icspec.
//!
//! Loads configuration from `~/.icspec/config.toml` with environment
//! variable overrides. A missing file means defaults. Command-line flags
//! override both; that layering happens in the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Counting methods the analyzer understands.
pub const COUNTING_METHODS: [&str; 3] = ["approx", "word", "exact"];

/// Report formats the CLI can emit.
pub const OUTPUT_FORMATS: [&str; 2] = ["text", "json"];

/// The root configuration structure.
///
/// Maps directly to `~/.icspec/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session cost simulation settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report output settings
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Invocations in the simulated session
    #[serde(default = "default_invocations")]
    pub invocations: u64,

    /// Times SESSION_STATE is resent during the session
    #[serde(default = "default_session_changes")]
    pub session_changes: u64,

    /// Token counting method: approx, word or exact
    #[serde(default = "default_method")]
    pub method: String,

    /// tokenizer.json used by the exact method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer_path: Option<PathBuf>,

    /// Smallest prefix the provider will cache
    #[serde(default = "default_cache_min_tokens")]
    pub cache_min_tokens: u64,
}

fn default_invocations() -> u64 {
    10
}
fn default_session_changes() -> u64 {
    1
}
fn default_method() -> String {
    "approx".into()
}
fn default_cache_min_tokens() -> u64 {
    1024
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            invocations: default_invocations(),
            session_changes: default_session_changes(),
            method: default_method(),
            tokenizer_path: None,
            cache_min_tokens: default_cache_min_tokens(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// text or json
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "text".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.icspec/config.toml).
    ///
    /// Environment variables override file values:
    /// - `ICSPEC_INVOCATIONS`
    /// - `ICSPEC_SESSION_CHANGES`
    /// - `ICSPEC_METHOD`
    /// - `ICSPEC_TOKENIZER`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `ICSPEC_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ICSPEC_INVOCATIONS") {
            self.analysis.invocations = parse_count("ICSPEC_INVOCATIONS", &value)?;
        }
        if let Some(value) = lookup("ICSPEC_SESSION_CHANGES") {
            self.analysis.session_changes = parse_count("ICSPEC_SESSION_CHANGES", &value)?;
        }
        if let Some(method) = lookup("ICSPEC_METHOD") {
            self.analysis.method = method.trim().to_ascii_lowercase();
        }
        if let Some(path) = lookup("ICSPEC_TOKENIZER") {
            self.analysis.tokenizer_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".icspec")
    }

    /// Get the configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.invocations == 0 {
            return Err(ConfigError::ValidationError(
                "analysis.invocations must be at least 1".into(),
            ));
        }

        if !COUNTING_METHODS.contains(&self.analysis.method.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "analysis.method must be one of {}, got '{}'",
                COUNTING_METHODS.join(", "),
                self.analysis.method
            )));
        }

        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be one of {}, got '{}'",
                OUTPUT_FORMATS.join(", "),
                self.output.format
            )));
        }

        if self.analysis.method == "exact" && self.analysis.tokenizer_path.is_none() {
            tracing::warn!("analysis.method is 'exact' but no tokenizer_path is set");
        }

        Ok(())
    }

    /// Whether reports should be emitted as JSON by default.
    pub fn wants_json(&self) -> bool {
        self.output.format == "json"
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_count(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a non-negative integer, got '{value}'"))
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

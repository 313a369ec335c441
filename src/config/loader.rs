//! Configuration loading with multi-layer merge

use super::ProviderSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level code-explain configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExplainConfig {
    /// Include internal error detail in responses
    #[serde(default)]
    pub debug: bool,

    /// Upstream provider
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Input validation limits
    #[serde(default)]
    pub limits: Limits,

    /// Retry behaviour for upstream calls
    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-client request ledger
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Explanation history
    #[serde(default)]
    pub history: HistorySettings,
}

/// Input size limits
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Maximum characters in a snippet
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,

    /// Maximum lines in a snippet
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

fn default_max_code_length() -> usize {
    10_000
}

fn default_max_lines() -> usize {
    500
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_code_length: default_max_code_length(),
            max_lines: default_max_lines(),
        }
    }
}

/// Retry knobs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for timeouts, server and network errors
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Base delay for 429 responses without Retry-After
    #[serde(default = "default_rate_limit_base_ms")]
    pub rate_limit_base_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_rate_limit_base_ms() -> u64 {
    5000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            rate_limit_base_ms: default_rate_limit_base_ms(),
        }
    }
}

/// Sliding-window ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitSettings {
    /// Requests allowed per window
    #[serde(default = "default_requests")]
    pub requests: usize,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// History store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistorySettings {
    /// Record successful explanations
    #[serde(default)]
    pub enabled: bool,

    /// Database path (defaults under the user data dir)
    pub path: Option<String>,
}

impl HistorySettings {
    /// Configured path with `~` expanded
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}

impl ExplainConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/code-explain/config.toml
    /// 3. .code-explain/config.toml (project) or the explicit path
    /// 4. Environment variables
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        match explicit {
            Some(path) => {
                let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
                let file_config = Self::load_file(&expanded)
                    .with_context(|| format!("loading {}", expanded.display()))?;
                config.merge(file_config);
            }
            None => {
                let project_config_path = PathBuf::from(".code-explain/config.toml");
                if project_config_path.exists() {
                    let project_config = Self::load_file(&project_config_path)
                        .with_context(|| format!("loading {}", project_config_path.display()))?;
                    config.merge(project_config);
                }
            }
        }

        config.apply_env(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Get the user config path (~/.config/code-explain/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("code-explain/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.debug {
            self.debug = true;
        }

        let provider = other.provider;
        let defaults = ProviderSettings::default();
        if provider.url.is_some() {
            self.provider.url = provider.url;
        }
        if provider.api_key.is_some() {
            self.provider.api_key = provider.api_key;
        }
        if provider.model.is_some() {
            self.provider.model = provider.model;
        }
        if provider.temperature != defaults.temperature {
            self.provider.temperature = provider.temperature;
        }
        if provider.timeout_secs != defaults.timeout_secs {
            self.provider.timeout_secs = provider.timeout_secs;
        }
        if provider.max_tokens != defaults.max_tokens {
            self.provider.max_tokens = provider.max_tokens;
        }

        if other.limits.max_code_length != default_max_code_length() {
            self.limits.max_code_length = other.limits.max_code_length;
        }
        if other.limits.max_lines != default_max_lines() {
            self.limits.max_lines = other.limits.max_lines;
        }

        if other.retry.max_attempts != default_max_attempts() {
            self.retry.max_attempts = other.retry.max_attempts;
        }
        if other.retry.backoff_base_ms != default_backoff_base_ms() {
            self.retry.backoff_base_ms = other.retry.backoff_base_ms;
        }
        if other.retry.rate_limit_base_ms != default_rate_limit_base_ms() {
            self.retry.rate_limit_base_ms = other.retry.rate_limit_base_ms;
        }

        if other.rate_limit.requests != default_requests() {
            self.rate_limit.requests = other.rate_limit.requests;
        }
        if other.rate_limit.window_secs != default_window_secs() {
            self.rate_limit.window_secs = other.rate_limit.window_secs;
        }

        if other.history.enabled {
            self.history.enabled = true;
        }
        if other.history.path.is_some() {
            self.history.path = other.history.path;
        }
    }

    /// Overlay environment variables, read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LLM_API_URL") {
            self.provider.url = Some(url);
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.provider.model = Some(model);
        }
        if let Some(value) = lookup("LLM_TEMPERATURE") {
            self.provider.temperature = parse_env("LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = lookup("MAX_CODE_LENGTH") {
            self.limits.max_code_length = parse_env("MAX_CODE_LENGTH", &value)?;
        }
        if let Some(value) = lookup("MAX_LINES") {
            self.limits.max_lines = parse_env("MAX_LINES", &value)?;
        }
        if let Some(value) = lookup("RATE_LIMIT_REQUESTS") {
            self.rate_limit.requests = parse_env("RATE_LIMIT_REQUESTS", &value)?;
        }
        if let Some(value) = lookup("RATE_LIMIT_WINDOW") {
            self.rate_limit.window_secs = parse_env("RATE_LIMIT_WINDOW", &value)?;
        }
        if let Some(value) = lookup("DEBUG") {
            self.debug = matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(())
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", name, value))
}

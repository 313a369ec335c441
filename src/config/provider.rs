//! Upstream provider configuration

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wire format spoken by the configured endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Serper,
    Gemini,
    OpenAi,
    Anthropic,
    Generic,
}

impl ProviderKind {
    /// Classify an endpoint URL. First matching rule wins.
    pub fn detect(endpoint_url: &str) -> Self {
        let url = endpoint_url.to_lowercase();

        if url.contains("serper") {
            ProviderKind::Serper
        } else if url.contains("generativelanguage") || url.contains("gemini") {
            ProviderKind::Gemini
        } else if url.contains("openai") {
            ProviderKind::OpenAi
        } else if url.contains("anthropic") {
            ProviderKind::Anthropic
        } else {
            ProviderKind::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Serper => "serper",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Generic => "generic",
        }
    }

    /// Model sent when the config does not name one
    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("gpt-4"),
            ProviderKind::Anthropic => Some("claude-3-opus-20240229"),
            ProviderKind::Serper | ProviderKind::Gemini | ProviderKind::Generic => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `[provider]` section as written in config files
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    /// Endpoint URL (`LLM_API_URL`)
    pub url: Option<String>,

    /// API key (`LLM_API_KEY`)
    pub api_key: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Model override for providers that take one
    pub model: Option<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Output token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            temperature: default_temperature(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Resolved, read-only provider configuration shared by every request
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub endpoint_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub timeout: Duration,
}

// Hand-written so the key never reaches a log line
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &"<redacted>")
            .field("temperature", &self.temperature)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Build a config for `endpoint_url`, detecting the provider kind
    pub fn new(
        endpoint_url: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f64,
    ) -> Self {
        let endpoint_url = endpoint_url.into();
        let kind = ProviderKind::detect(&endpoint_url);
        Self {
            endpoint_url,
            api_key: api_key.into(),
            temperature,
            kind,
            model: None,
            max_tokens: default_max_tokens(),
            timeout: Duration::from_secs(default_timeout_secs()),
        }
    }

    /// Resolve settings, reporting the first missing required field
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let url = non_blank(settings.url.as_deref()).ok_or(ConfigError::MissingField("LLM_API_URL"))?;
        let key =
            non_blank(settings.api_key.as_deref()).ok_or(ConfigError::MissingField("LLM_API_KEY"))?;

        if !settings.temperature.is_finite() || settings.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "temperature must be a non-negative number, got {}",
                settings.temperature
            )));
        }
        if settings.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }

        let mut config = Self::new(url, key, settings.temperature);
        config.model = settings.model.clone();
        config.max_tokens = settings.max_tokens;
        config.timeout = Duration::from_secs(settings.timeout_secs);
        Ok(config)
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Configured model, falling back to the provider default
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().or(self.kind.default_model())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_endpoints() {
        assert_eq!(
            ProviderKind::detect("https://api.openai.com/v1/chat/completions"),
            ProviderKind::OpenAi
        );
        assert_eq!(
            ProviderKind::detect(
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
            ),
            ProviderKind::Gemini
        );
        assert_eq!(
            ProviderKind::detect("https://api.anthropic.com/v1/messages"),
            ProviderKind::Anthropic
        );
        assert_eq!(
            ProviderKind::detect("https://google.serper.dev/search"),
            ProviderKind::Serper
        );
        assert_eq!(
            ProviderKind::detect("https://my-custom-llm.example.com/infer"),
            ProviderKind::Generic
        );
    }

    #[test]
    fn test_detect_priority_order() {
        // serper beats everything else
        assert_eq!(
            ProviderKind::detect("https://serper.openai-proxy.example.com"),
            ProviderKind::Serper
        );
        // gemini beats openai
        assert_eq!(
            ProviderKind::detect("https://openai-gateway.example.com/gemini"),
            ProviderKind::Gemini
        );
        // openai beats anthropic
        assert_eq!(
            ProviderKind::detect("https://anthropic.example.com/openai/v1"),
            ProviderKind::OpenAi
        );
    }

    #[test]
    fn test_detect_is_case_insensitive() {
        assert_eq!(
            ProviderKind::detect("HTTPS://API.OPENAI.COM/V1"),
            ProviderKind::OpenAi
        );
    }

    #[test]
    fn test_from_settings_missing_url() {
        let settings = ProviderSettings {
            api_key: Some("key".into()),
            ..Default::default()
        };
        let err = ProviderConfig::from_settings(&settings).unwrap_err();
        assert_eq!(err, ConfigError::MissingField("LLM_API_URL"));
    }

    #[test]
    fn test_from_settings_missing_key() {
        let settings = ProviderSettings {
            url: Some("https://api.openai.com/v1/chat/completions".into()),
            api_key: Some("   ".into()),
            ..Default::default()
        };
        let err = ProviderConfig::from_settings(&settings).unwrap_err();
        assert_eq!(err, ConfigError::MissingField("LLM_API_KEY"));
    }

    #[test]
    fn test_from_settings_resolves_kind_and_model() {
        let settings = ProviderSettings {
            url: Some("https://api.anthropic.com/v1/messages".into()),
            api_key: Some("sk-ant".into()),
            temperature: 0.2,
            ..Default::default()
        };
        let config = ProviderConfig::from_settings(&settings).unwrap();
        assert_eq!(config.kind, ProviderKind::Anthropic);
        assert_eq!(config.model_name(), Some("claude-3-opus-20240229"));
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.timeout, Duration::from_secs(30));

        let config = config.with_model("claude-3-sonnet-20240229");
        assert_eq!(config.model_name(), Some("claude-3-sonnet-20240229"));
    }

    #[test]
    fn test_from_settings_rejects_negative_temperature() {
        let settings = ProviderSettings {
            url: Some("https://example.com".into()),
            api_key: Some("key".into()),
            temperature: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            ProviderConfig::from_settings(&settings),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig::new("https://example.com", "super-secret", 0.7);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("redacted"));
    }
}

//! Explanation pipeline
//!
//! Validates a snippet, renders the prompt, calls the configured provider
//! and splits the answer into explanation, errors and improved code.
//!
//! # Example
//!
//! ```ignore
//! use code_explain::explain::Explainer;
//!
//! let explainer = Explainer::from_config(&config, transport);
//! let result = explainer.explain(Some("python"), Some("print(1)")).await?;
//!
//! println!("{}", result.explanation);
//! ```

pub mod parser;
mod prompt;
mod types;
mod validation;

pub use parser::parse;
pub use prompt::PromptBuilder;
pub use types::{ExplainError, ExplainRequest, ExplanationResult, Language};
pub use validation::{InputValidator, MAX_LINE_LENGTH, Rejection};

use crate::config::{ConfigError, ExplainConfig, ProviderConfig};
use crate::upstream::{Extraction, ResilientCaller, RetryPolicy, Transport, adapter};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// End-to-end explanation of validated snippets
///
/// The provider is resolved once at construction. A missing URL or key is
/// kept as the error and reported on every request, after input validation.
pub struct Explainer {
    validator: InputValidator,
    prompts: PromptBuilder,
    provider: Result<ProviderConfig, ConfigError>,
    caller: ResilientCaller,
}

impl Explainer {
    pub fn new(
        validator: InputValidator,
        provider: Result<ProviderConfig, ConfigError>,
        caller: ResilientCaller,
    ) -> Self {
        Self {
            validator,
            prompts: PromptBuilder::new(),
            provider,
            caller,
        }
    }

    /// Build from loaded configuration, sending through `transport`
    pub fn from_config(config: &ExplainConfig, transport: Arc<dyn Transport>) -> Self {
        let caller = ResilientCaller::new(transport, RetryPolicy::from_settings(&config.retry));
        Self::new(
            InputValidator::from_limits(&config.limits),
            ProviderConfig::from_settings(&config.provider),
            caller,
        )
    }

    /// Resolved provider, or why it could not be resolved
    pub fn provider(&self) -> Result<&ProviderConfig, &ConfigError> {
        self.provider.as_ref()
    }

    pub fn validate(
        &self,
        language: Option<&str>,
        code: Option<&str>,
    ) -> Result<ExplainRequest, Rejection> {
        self.validator.validate(language, code)
    }

    /// Validate untrusted input and explain it
    pub async fn explain(
        &self,
        language: Option<&str>,
        code: Option<&str>,
    ) -> Result<ExplanationResult, ExplainError> {
        let request = self.validate(language, code)?;
        self.explain_request(&request).await
    }

    /// Explain an already validated snippet
    pub async fn explain_request(
        &self,
        request: &ExplainRequest,
    ) -> Result<ExplanationResult, ExplainError> {
        let provider = self.provider.as_ref().map_err(|e| e.clone())?;
        let start = Instant::now();

        let prompt = self.prompts.build(request.language(), request.code())?;
        let upstream = adapter::build_request(provider, &prompt, request);
        let body = self.caller.execute(&upstream, provider).await?;

        let result = match adapter::extract(provider, &body, request) {
            Extraction::Text(text) => {
                debug!(chars = text.len(), "parsing model output");
                parse(&text)
            }
            Extraction::Explanation(result) => result,
        };

        info!(
            language = %request.language(),
            provider = %provider.kind,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "explanation complete"
        );
        Ok(result)
    }
}

//! Request-facing service: admission control, JSON mapping and history

mod rate_limit;

pub use rate_limit::{RateLimiter, SlidingWindowLimiter};

use crate::explain::{ExplainError, ExplainRequest, ExplanationResult, Explainer};
use crate::history::HistoryStore;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{error, warn};

/// Failures surfaced to a client
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Rate limit exceeded. Maximum {max_requests} requests per {window_minutes} minutes.")]
    RateLimited {
        max_requests: usize,
        window_minutes: u64,
    },

    #[error("Invalid JSON")]
    InvalidJson,

    #[error(transparent)]
    Explain(#[from] ExplainError),
}

impl ServiceError {
    /// HTTP status for this failure
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::RateLimited { .. } => 429,
            ServiceError::InvalidJson => 400,
            ServiceError::Explain(e) if e.is_client_error() => 400,
            ServiceError::Explain(_) => 500,
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, ServiceError::Explain(e) if e.is_internal())
    }
}

/// Status code plus JSON body, ready for any HTTP front end
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    fn ok(result: &ExplanationResult) -> Self {
        Self {
            status: 200,
            body: json!({
                "explanation": result.explanation,
                "errors": result.errors,
                "improved_code": result.improved_code,
            }),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

/// Explainer behind per-client rate limiting, with optional history
pub struct ExplainService {
    explainer: Explainer,
    limiter: Arc<dyn RateLimiter>,
    history: Option<Arc<Mutex<HistoryStore>>>,
    debug: bool,
}

impl ExplainService {
    pub fn new(explainer: Explainer, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            explainer,
            limiter,
            history: None,
            debug: false,
        }
    }

    /// Record successful explanations in `store`
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(Arc::new(Mutex::new(store)));
        self
    }

    /// Expose internal error detail in responses
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn explainer(&self) -> &Explainer {
        &self.explainer
    }

    /// Explain on behalf of `client_key`, subject to its rate limit
    pub async fn explain_for(
        &self,
        client_key: &str,
        language: Option<&str>,
        code: Option<&str>,
    ) -> Result<ExplanationResult, ServiceError> {
        self.admit(client_key)?;
        self.run(language, code).await
    }

    /// Handle a raw JSON request body of the form `{"language": .., "code": ..}`
    ///
    /// Never fails: every outcome maps to a status and a JSON body.
    pub async fn handle_json(&self, client_key: &str, body: &[u8]) -> ServiceResponse {
        let outcome = match self.admit(client_key) {
            Ok(()) => match parse_body(body) {
                Ok((language, code)) => self.run(language.as_deref(), code.as_deref()).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => ServiceResponse::ok(&result),
            Err(e) => self.respond_error(&e),
        }
    }

    fn admit(&self, client_key: &str) -> Result<(), ServiceError> {
        if self.limiter.allow(client_key) {
            return Ok(());
        }

        warn!(client = client_key, "rate limit exceeded");
        Err(ServiceError::RateLimited {
            max_requests: self.limiter.max_requests(),
            window_minutes: self.limiter.window().as_secs() / 60,
        })
    }

    async fn run(
        &self,
        language: Option<&str>,
        code: Option<&str>,
    ) -> Result<ExplanationResult, ServiceError> {
        let request = self
            .explainer
            .validate(language, code)
            .map_err(ExplainError::from)?;
        let result = self.explainer.explain_request(&request).await?;
        self.remember(&request, &result).await;
        Ok(result)
    }

    /// Append to history on the blocking pool; failures are only logged
    async fn remember(&self, request: &ExplainRequest, result: &ExplanationResult) {
        let Some(history) = &self.history else {
            return;
        };

        let history = Arc::clone(history);
        let request = request.clone();
        let result = result.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let mut store = history.lock().unwrap_or_else(|e| e.into_inner());
            store.record(&request, &result)
        })
        .await;

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to record explanation history"),
            Err(e) => warn!(error = %e, "history task did not complete"),
        }
    }

    fn respond_error(&self, err: &ServiceError) -> ServiceResponse {
        if !err.is_internal() {
            return ServiceResponse::error(err.status(), err.to_string());
        }

        error!(error = %err, "internal error while explaining");
        let message = if self.debug {
            format!("Internal error: {}", err)
        } else {
            "An internal error occurred".to_string()
        };
        ServiceResponse::error(err.status(), message)
    }
}

/// Pull `language` and `code` out of a JSON object. Non-string values count
/// as absent and are reported by validation.
fn parse_body(body: &[u8]) -> Result<(Option<String>, Option<String>), ServiceError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ServiceError::InvalidJson)?;
    let object = value.as_object().ok_or(ServiceError::InvalidJson)?;

    let field = |name: &str| object.get(name).and_then(Value::as_str).map(str::to_string);
    Ok((field("language"), field("code")))
}

//! Core types for upstream calls

use crate::explain::ExplanationResult;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Longest slice of an error body echoed back in a failure message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Provider-specific request, built fresh for every call
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: String,
    pub body: Value,
    pub headers: BTreeMap<String, String>,
}

impl UpstreamRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            body,
            headers,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header lookup, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Text pulled out of a successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Model-authored prose, still to be parsed into sections
    Text(String),

    /// Already structured (search providers never write prose)
    Explanation(ExplanationResult),
}

/// Classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Timeout,
    Unauthorized,
    Forbidden,
    ServerError,
    NetworkError,
    OtherHttp,
    Internal,
}

impl FailureKind {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited
                | FailureKind::Timeout
                | FailureKind::ServerError
                | FailureKind::NetworkError
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::RateLimited => "rate_limited",
            FailureKind::Timeout => "timeout",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Forbidden => "forbidden",
            FailureKind::ServerError => "server_error",
            FailureKind::NetworkError => "network_error",
            FailureKind::OtherHttp => "other_http",
            FailureKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A failed upstream attempt, or the terminal failure of a call
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct CallFailure {
    pub kind: FailureKind,
    pub message: String,
    pub http_status: Option<u16>,
    /// Server-requested wait, from a numeric `Retry-After` header
    pub retry_after: Option<Duration>,
}

impl CallFailure {
    fn new(kind: FailureKind, message: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status,
            retry_after: None,
        }
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(
                FailureKind::RateLimited,
                "Rate limit exceeded. The API is temporarily unavailable. \
                 Please wait a few minutes before trying again. (Error: 429 Too Many Requests)",
                Some(429),
            )
        }
    }

    pub fn timeout() -> Self {
        Self::new(
            FailureKind::Timeout,
            "Request timeout - LLM API did not respond in time. Please try again.",
            None,
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(
            FailureKind::Unauthorized,
            "Invalid API key. Please check your LLM_API_KEY configuration.",
            Some(401),
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            FailureKind::Forbidden,
            "API access forbidden. Please check your API key permissions.",
            Some(403),
        )
    }

    pub fn server_error(status: u16) -> Self {
        Self::new(
            FailureKind::ServerError,
            format!("LLM API server error ({}). Please try again later.", status),
            Some(status),
        )
    }

    pub fn other_http(status: u16, body: &str) -> Self {
        let snippet: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
        Self::new(
            FailureKind::OtherHttp,
            format!("LLM API error ({}): {}", status, snippet),
            Some(status),
        )
    }

    pub fn network(detail: impl fmt::Display) -> Self {
        Self::new(
            FailureKind::NetworkError,
            format!(
                "Network error: {}. Please check your internet connection and try again.",
                detail
            ),
            None,
        )
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(
            FailureKind::Internal,
            format!("Unexpected error: {}", detail),
            None,
        )
    }

    /// Classify a non-2xx status
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        match status {
            429 => Self::rate_limited(retry_after),
            401 => Self::unauthorized(),
            403 => Self::forbidden(),
            500..=u16::MAX => Self::server_error(status),
            _ => Self::other_http(status, body),
        }
    }
}

//! Core types for the explanation pipeline

use super::validation::Rejection;
use crate::config::ConfigError;
use crate::upstream::{CallFailure, FailureKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Languages the service knows how to explain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::Cpp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or(Rejection::LanguageInvalid)
    }
}

/// A snippet that passed validation
///
/// Only [`InputValidator`](super::InputValidator) constructs these, so the
/// size and content invariants always hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainRequest {
    language: Language,
    code: String,
}

impl ExplainRequest {
    pub(crate) fn new(language: Language, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

/// The three-field explanation returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub explanation: String,
    pub errors: String,
    pub improved_code: String,
}

/// Terminal failures of the pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplainError {
    /// Caller sent something unusable
    #[error("{0}")]
    InputRejected(#[from] Rejection),

    /// Deployment is missing required settings
    #[error("{0}")]
    Configuration(#[from] ConfigError),

    /// Upstream call failed after the retry policy gave up
    #[error("{0}")]
    Upstream(#[from] CallFailure),

    /// Prompt template failed to render
    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

impl ExplainError {
    /// Whether the caller, not the deployment or upstream, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, ExplainError::InputRejected(_))
    }

    /// Whether the failure carries internal detail that production must hide
    pub fn is_internal(&self) -> bool {
        match self {
            ExplainError::Prompt(_) => true,
            ExplainError::Upstream(failure) => failure.kind == FailureKind::Internal,
            ExplainError::InputRejected(_) | ExplainError::Configuration(_) => false,
        }
    }
}

impl From<minijinja::Error> for ExplainError {
    fn from(err: minijinja::Error) -> Self {
        ExplainError::Prompt(err.to_string())
    }
}

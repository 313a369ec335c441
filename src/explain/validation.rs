//! Defensive validation of untrusted snippets

use super::types::{ExplainRequest, Language};
use crate::config::Limits;
use thiserror::Error;

/// Longest single line accepted, regardless of configured limits
pub const MAX_LINE_LENGTH: usize = 10_000;

/// Why a snippet was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Language must be \"python\" or \"cpp\"")]
    LanguageInvalid,

    #[error("Code cannot be empty")]
    CodeMissing,

    #[error("Code exceeds maximum length of {max} characters")]
    TooLong { max: usize },

    #[error("Code exceeds maximum of {max} lines")]
    TooManyLines { max: usize },

    #[error("Code contains invalid characters")]
    InvalidCharacters,

    #[error("Line exceeds maximum length of {max} characters")]
    LineTooLong { max: usize },
}

/// Validates language and code against the configured limits
#[derive(Debug, Clone)]
pub struct InputValidator {
    max_code_length: usize,
    max_lines: usize,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::from_limits(&Limits::default())
    }
}

impl InputValidator {
    pub fn new(max_code_length: usize, max_lines: usize) -> Self {
        Self {
            max_code_length,
            max_lines,
        }
    }

    pub fn from_limits(limits: &Limits) -> Self {
        Self::new(limits.max_code_length, limits.max_lines)
    }

    /// Check `language` and `code` in order; the first failing check wins.
    pub fn validate(
        &self,
        language: Option<&str>,
        code: Option<&str>,
    ) -> Result<ExplainRequest, Rejection> {
        let language: Language = language.ok_or(Rejection::LanguageInvalid)?.parse()?;

        let code = code.ok_or(Rejection::CodeMissing)?;
        if code.trim().is_empty() {
            return Err(Rejection::CodeMissing);
        }

        if code.chars().count() > self.max_code_length {
            return Err(Rejection::TooLong {
                max: self.max_code_length,
            });
        }

        if code.split('\n').count() > self.max_lines {
            return Err(Rejection::TooManyLines {
                max: self.max_lines,
            });
        }

        if code.chars().any(is_smuggled_control) {
            return Err(Rejection::InvalidCharacters);
        }

        if code
            .split('\n')
            .any(|line| line.chars().count() > MAX_LINE_LENGTH)
        {
            return Err(Rejection::LineTooLong {
                max: MAX_LINE_LENGTH,
            });
        }

        Ok(ExplainRequest::new(language, code))
    }
}

// NUL and friends; tabs, newlines and other whitespace controls are fine
fn is_smuggled_control(c: char) -> bool {
    c.is_control() && !c.is_whitespace()
}

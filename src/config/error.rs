//! Configuration errors

use thiserror::Error;

/// Deployment-side problems that stop a request before any network call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank
    #[error("{0} not configured")]
    MissingField(&'static str),

    /// A setting is present but unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Name of the missing setting, if that is the problem
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            ConfigError::MissingField(field) => Some(field),
            ConfigError::Invalid(_) => None,
        }
    }
}

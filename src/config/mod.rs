//! Configuration types and loading for code-explain

mod error;
mod loader;
mod provider;

pub use error::ConfigError;
pub use loader::{ExplainConfig, HistorySettings, Limits, RateLimitSettings, RetrySettings};
pub use provider::{ProviderConfig, ProviderKind, ProviderSettings};

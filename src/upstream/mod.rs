//! Upstream provider plumbing
//!
//! Turns a validated request into a provider-specific HTTP call, runs it
//! with bounded retries, and pulls generated text back out of the response.
//!
//! # Example
//!
//! ```ignore
//! use code_explain::upstream::{HttpTransport, ResilientCaller, RetryPolicy, adapter};
//!
//! let transport = Arc::new(HttpTransport::new(config.timeout)?);
//! let caller = ResilientCaller::new(transport, RetryPolicy::default());
//!
//! let upstream = adapter::build_request(&config, &prompt, &request);
//! let body = caller.execute(&upstream, &config).await?;
//! let extraction = adapter::extract(&config, &body, &request);
//! ```

pub mod adapter;
mod caller;
mod retry;
pub mod serper;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use caller::ResilientCaller;
pub use retry::{RetryAction, RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};
pub use types::{CallFailure, Extraction, FailureKind, UpstreamRequest};

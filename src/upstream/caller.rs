//! Bounded-retry execution of upstream requests

use super::retry::{RetryAction, RetryPolicy, Sleeper, TokioSleeper};
use super::transport::{Transport, TransportError};
use super::types::{CallFailure, UpstreamRequest};
use crate::config::ProviderConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes upstream requests, retrying per [`RetryPolicy`]
pub struct ResilientCaller {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl ResilientCaller {
    /// Create a caller that sleeps on the tokio timer
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(transport, Arc::new(TokioSleeper), policy)
    }

    pub fn with_sleeper(
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Send `request`, retrying transient failures, and return the decoded
    /// body of the first 2xx response
    ///
    /// A 2xx body that is not JSON comes back as a JSON string.
    pub async fn execute(
        &self,
        request: &UpstreamRequest,
        config: &ProviderConfig,
    ) -> Result<Value, CallFailure> {
        let mut last_failure = None;

        for attempt in 0..self.policy.max_attempts {
            let start = Instant::now();
            debug!(
                provider = %config.kind,
                attempt,
                "sending upstream request"
            );

            let failure = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    debug!(
                        provider = %config.kind,
                        status = response.status,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        bytes = response.body.len(),
                        "upstream responded"
                    );
                    return Ok(decode_body(response.body));
                }
                Ok(response) => {
                    CallFailure::from_status(response.status, response.retry_after(), &response.body)
                }
                Err(TransportError::Timeout(_)) => CallFailure::timeout(),
                Err(TransportError::Network(detail)) => CallFailure::network(detail),
                Err(TransportError::Internal(detail)) => CallFailure::internal(detail),
            };

            match self.policy.decide(attempt, &failure) {
                RetryAction::Retry(delay) => {
                    warn!(
                        provider = %config.kind,
                        attempt,
                        kind = %failure.kind,
                        status = failure.http_status,
                        delay_ms = delay.as_millis() as u64,
                        "upstream attempt failed, retrying"
                    );
                    last_failure = Some(failure);
                    self.sleeper.sleep(delay).await;
                }
                RetryAction::GiveUp => {
                    warn!(
                        provider = %config.kind,
                        attempt,
                        kind = %failure.kind,
                        status = failure.http_status,
                        "upstream call failed"
                    );
                    return Err(failure);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| CallFailure::internal("no upstream attempt was made")))
    }
}

fn decode_body(body: String) -> Value {
    serde_json::from_str(&body).unwrap_or(Value::String(body))
}

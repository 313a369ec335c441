//! HTTP transport for upstream calls

use super::types::UpstreamRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Raw response from one attempt
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Numeric `Retry-After`, in seconds
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// Failures below the HTTP status layer
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// No response within the attempt timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, reset, DNS failure and the like
    #[error("{0}")]
    Network(String),

    /// The request could not be built or the response could not be read
    #[error("{0}")]
    Internal(String),
}

/// One POST to an upstream endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport whose attempts time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_builder() {
            TransportError::Internal(format!("invalid request: {}", err))
        } else if err.is_connect() {
            TransportError::Network(format!("connection failed: {}", err))
        } else {
            TransportError::Network(format!("request failed: {}", err))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<TransportResponse, TransportError> {
        let mut http_request = self.client.post(&request.url);
        for (name, value) in &request.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }
        let http_request = http_request.json(&request.body);

        let response = match tokio::time::timeout(self.timeout, http_request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(self.classify(e)),
            Err(_) => return Err(TransportError::Timeout(self.timeout)),
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_numeric() {
        let response = TransportResponse::new(429, "").with_header("Retry-After", "12");
        assert_eq!(response.retry_after(), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_retry_after_non_numeric_ignored() {
        let response = TransportResponse::new(429, "")
            .with_header("Retry-After", "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(response.retry_after(), None);

        let response = TransportResponse::new(429, "");
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn test_is_success() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(500, "").is_success());
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(Duration::from_secs(30)).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        // Port 9 on localhost is reserved for discard and normally closed
        let request = UpstreamRequest::new("http://127.0.0.1:9/", serde_json::json!({}));
        match transport.send(&request).await {
            Err(TransportError::Network(_)) | Err(TransportError::Timeout(_)) => {}
            other => panic!("expected network failure, got {:?}", other),
        }
    }
}

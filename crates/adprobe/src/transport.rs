//! HTTP transport.
//!
//! The engine only needs "GET this URL, tell me the status". Connection
//! pooling, TLS and timeouts belong to the transport; the default
//! implementation hands all of that to a shared [`reqwest::Client`].

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response metadata seen by the result checker
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
}

impl HttpResponse {
    /// Response with a status and no headers
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }
}

/// Broad class of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Could not connect (refused, reset, DNS)
    Connection,
    /// Request exceeded the configured timeout
    Timeout,
    /// Anything else (protocol, body decode)
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::Timeout => write!(f, "Timeout"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A request that produced no usable response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error for {url}: {message}")]
pub struct TransportError {
    /// Failure class
    pub kind: TransportErrorKind,
    /// Requested URL
    pub url: String,
    /// Underlying message
    pub message: String,
}

impl TransportError {
    /// Create an error
    pub fn new(kind: TransportErrorKind, url: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connection
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, url, err.to_string())
    }
}

/// Issues GET requests on behalf of workers.
///
/// Shared by every worker, so implementations must be cheap to call
/// concurrently.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send a GET and return once the full response has been received
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a pooled [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the given per-request timeout
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("adprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();

        // Read the body so the timing covers the whole response
        resp.bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(url, &e))?;

        Ok(HttpResponse { status, headers })
    }
}

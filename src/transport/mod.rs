//! # Transport Layer
//!
//! Executes one wire request and reports what happens on a channel of
//! [`TransportEvent`]s: zero or more `Chunk`s (streaming only) followed by exactly
//! one terminal `Complete` or `Failed`, unless the request is cancelled first.
//!
//! The orchestrator consumes that channel in a single task per request, which is
//! what gives callbacks and lifecycle events their per-request ordering.

mod flags;
mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(60);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry and connection timing shared by every request of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    /// Extra attempts after a connection-level failure.
    pub retries: u32,
    pub retry_delay: Duration,
    pub keepalive: Duration,
    pub connect_timeout: Duration,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            keepalive: DEFAULT_KEEPALIVE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Fully resolved transport settings for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    pub policy: TransportPolicy,
    pub stream: bool,
    /// Reported in [`TransportConfig::flags`] only. Response bodies are read with
    /// `bytes_stream`, which hands chunks over as they arrive, so there is no
    /// client-side buffer to switch off.
    pub no_buffer: bool,
    pub tcp_nodelay: bool,
    pub compressed: bool,
    pub insecure: bool,
    pub http1_only: bool,
    pub proxy: Option<String>,
    pub max_time: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl TransportConfig {
    /// Base configuration. Streaming adds the low-latency switches and turns
    /// response compression off unless `compress` asks for it.
    pub fn new(policy: TransportPolicy, stream: bool, compress: bool) -> Self {
        Self {
            policy,
            stream,
            no_buffer: stream,
            tcp_nodelay: stream,
            compressed: if stream { compress } else { true },
            insecure: false,
            http1_only: false,
            proxy: None,
            max_time: None,
            headers: Vec::new(),
        }
    }
}

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub request_id: u64,
    pub method: reqwest::Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub config: TransportConfig,
}

/// Complete response of a request. For streaming requests `body` is empty:
/// the content already went out as chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[derive(Debug)]
pub enum TransportEvent {
    Chunk(String),
    Complete(HttpResponse),
    Failed(TransportError),
}

/// Executes wire requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run `request` to completion, sending its progress on `events`.
    ///
    /// Implementations send exactly one terminal event unless `cancel` fires, in
    /// which case they stop sending and return.
    async fn execute(
        &self,
        request: WireRequest,
        events: mpsc::UnboundedSender<TransportEvent>,
        cancel: CancellationToken,
    );
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Failures that happened before any response arrived and may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_connect() || e.is_timeout(),
            TransportError::Connect(_) | TransportError::Timeout(_) => true,
            TransportError::Other(_) => false,
        }
    }
}

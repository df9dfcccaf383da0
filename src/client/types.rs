use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::transport::HttpResponse;
use crate::Result;

/// Terminal classification of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    /// HTTP status >= 400 or transport failure.
    Error,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterSummary {
    pub name: String,
    pub formatted_name: String,
    pub model: Option<String>,
}

/// Per-request options. `id`, `adapter` and `status` are filled in by the client
/// and travel with every lifecycle event of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    pub silent: bool,
    pub status: Option<RequestStatus>,
    pub id: Option<u64>,
    /// Suffix for a second, request-specific name of every lifecycle event.
    pub event: Option<String>,
    pub adapter: Option<AdapterSummary>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn event(mut self, suffix: impl Into<String>) -> Self {
        self.event = Some(suffix.into());
        self
    }
}

/// Data handed to the request callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseValue {
    /// One piece of a streamed body, forwarded as it arrived.
    Chunk(String),
    /// The whole response of a buffered request.
    Complete(HttpResponse),
}

impl ResponseValue {
    pub fn text(&self) -> &str {
        match self {
            ResponseValue::Chunk(c) => c,
            ResponseValue::Complete(r) => &r.body,
        }
    }
}

pub type Callback = Arc<dyn Fn(Result<ResponseValue>) + Send + Sync>;
pub type DoneFn = Arc<dyn Fn() + Send + Sync>;

/// Caller hooks for one request.
///
/// `callback` sees every chunk, the full response of buffered requests, and
/// transport failures as `Err`. HTTP error statuses arrive as ordinary data.
/// `done` runs at most once, on the terminal response path only.
#[derive(Clone)]
pub struct Actions {
    pub(crate) callback: Callback,
    pub(crate) done: Option<DoneFn>,
}

impl Actions {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Result<ResponseValue>) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            done: None,
        }
    }

    pub fn on_done<F>(mut self, done: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.done = Some(Arc::new(done));
        self
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("done", &self.done.is_some())
            .finish()
    }
}

/// Everything a request produced, collected by [`Client::send`](super::Client::send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub status: RequestStatus,
    pub chunks: Vec<String>,
    pub response: Option<HttpResponse>,
}

impl Completed {
    /// Streamed chunks joined, or the buffered response body.
    pub fn text(&self) -> String {
        match &self.response {
            Some(r) if self.chunks.is_empty() => r.body.clone(),
            _ => self.chunks.concat(),
        }
    }
}

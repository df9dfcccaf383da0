use crate::transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Where a dispatch error happened: which adapter, which field, which request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    pub adapter: Option<String>,
    /// Dotted path of the offending field, e.g. `adapter.url`.
    pub field_path: Option<String>,
    pub details: Option<String>,
    pub request_id: Option<u64>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_request_id(mut self, id: u64) -> Self {
        self.request_id = Some(id);
        self
    }

    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            self.adapter.as_ref().map(|a| format!("adapter {}", a)),
            self.request_id.map(|id| format!("request {}", id)),
            self.field_path.as_ref().map(|p| format!("at {}", p)),
            self.details.clone(),
        ];
        let rendered: Vec<String> = parts.into_iter().flatten().collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Unified error type for request dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// The adapter's `setup` handler refused the request. Nothing was dispatched.
    #[error("Adapter setup failed for '{adapter}': {message}")]
    Setup { adapter: String, message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    /// The request task was stopped before it could report a status.
    #[error("Request {request_id} was cancelled")]
    Cancelled { request_id: u64 },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML syntax error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn format_context(ctx: &ErrorContext) -> String {
    if ctx.is_empty() {
        String::new()
    } else {
        format!(" [{}]", ctx)
    }
}

impl Error {
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the failure happened on the wire rather than inside the runtime.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

//! # ai-lib-dispatch
//!
//! Adapter-driven request dispatch for AI model endpoints.
//!
//! ## Overview
//!
//! An [`Adapter`](adapter::Adapter) describes one endpoint: URL, headers, env
//! placeholders, parameters, raw transport flags, and optional hooks that shape the
//! request body. A [`Client`] runs the adapter pipeline for each request, persists
//! the wire body to a request-scoped artifact, sends it over HTTP (streamed or
//! buffered), and reports progress through caller callbacks and lifecycle events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_dispatch::adapter::{Adapter, Handlers};
//! use ai_lib_dispatch::types::{Message, Payload};
//! use ai_lib_dispatch::{Actions, ClientBuilder, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_dispatch::Result<()> {
//!     let adapter = Adapter::new("openai", "https://api.openai.com/v1/chat/completions")
//!         .with_env("api_key", "OPENAI_API_KEY")
//!         .with_header("Authorization", "Bearer ${api_key}")
//!         .streaming(true)
//!         .with_handlers(Handlers::passthrough());
//!     let client = ClientBuilder::new(adapter).build()?;
//!
//!     let payload = Payload::new(vec![Message::user("Hello")]);
//!     let actions = Actions::new(|chunk| {
//!         if let Ok(value) = chunk {
//!             print!("{}", value.text());
//!         }
//!     });
//!     let handle = client.request(payload, actions, RequestOptions::new()).await?;
//!     handle.wait().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Adapter definitions, hooks, env placeholders, loading |
//! | [`compose`] | Request body composition |
//! | [`artifact`] | Request-scoped body files and their retention |
//! | [`transport`] | Wire requests, raw flags, the HTTP transport |
//! | [`client`] | Client, builder, request handles, the request state machine |
//! | [`events`] | Lifecycle events and event buses |
//! | [`config`] | Client configuration and log levels |
//! | [`types`] | Messages, tools, payloads |

pub mod adapter;
pub mod artifact;
pub mod client;
pub mod compose;
pub mod config;
pub mod events;
pub mod transport;
pub mod types;

pub use client::{
    Actions, CancelHandle, Client, ClientBuilder, Completed, RequestHandle, RequestOptions,
    RequestStatus, ResponseValue,
};
pub use config::{ClientConfig, LogLevel};
pub use events::{EventBus, LifecycleEvent};
pub use types::{Message, MessageRole, Payload};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

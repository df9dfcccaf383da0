//! # Types Module
//!
//! Provider-neutral request primitives handed to [`Client::request`](crate::Client::request).
//! Adapters turn these into their wire shape through their handlers; nothing in this
//! module knows about any particular provider.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and content |
//! | [`MessageRole`] | Message role (system, user, assistant, tool) |
//! | [`ToolDefinition`] | Tool definition offered to the model |
//! | [`Payload`] | Messages plus optional tools for one request |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_dispatch::types::{Message, Payload, ToolDefinition};
//!
//! let payload = Payload::new(vec![
//!     Message::system("You are a helpful assistant"),
//!     Message::user("What's the weather?"),
//! ])
//! .with_tools(vec![ToolDefinition::function(
//!     "get_weather",
//!     "Get current weather for a location",
//!     serde_json::json!({"type": "object", "properties": {"location": {"type": "string"}}}),
//! )]);
//! assert!(payload.has_tools());
//! ```

pub mod message;
pub mod payload;
pub mod tool;

pub use message::{ContentBlock, Message, MessageContent, MessageRole};
pub use payload::Payload;
pub use tool::{FunctionDefinition, ToolDefinition};

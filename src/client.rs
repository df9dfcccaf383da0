//! Request dispatch.
//!
//! [`Client::request`] runs the adapter pipeline (setup, env resolution, body
//! composition, artifact), hands the wire request to a [`Transport`](crate::transport::Transport)
//! task and drives the response through a per-request state machine.
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;
mod driver;
pub mod handle;
pub mod ids;
pub mod types;

pub use builder::ClientBuilder;
pub use core::Client;
pub use handle::{CancelHandle, RequestHandle};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use types::{
    Actions, AdapterSummary, Callback, Completed, DoneFn, RequestOptions, RequestStatus,
    ResponseValue,
};

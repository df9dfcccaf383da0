use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::types::RequestStatus;
use crate::{Error, ErrorContext, Result};

/// Cloneable cancellation side of a [`RequestHandle`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Stop the request. Calling this more than once, or after the request
    /// finished, has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Reference to an in-flight request.
///
/// Dropping the handle does not stop the request.
#[derive(Debug)]
pub struct RequestHandle {
    id: u64,
    cancel: CancelHandle,
    task: JoinHandle<RequestStatus>,
}

impl RequestHandle {
    pub(crate) fn new(id: u64, token: CancellationToken, task: JoinHandle<RequestStatus>) -> Self {
        Self {
            id,
            cancel: CancelHandle { token },
            task,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal path to complete (callbacks, events and cleanup).
    pub async fn wait(self) -> Result<RequestStatus> {
        let id = self.id;
        self.task.await.map_err(|e| {
            if e.is_cancelled() {
                return Error::Cancelled { request_id: id };
            }
            Error::runtime_with_context(
                format!("request task failed: {}", e),
                ErrorContext::new().with_request_id(id),
            )
        })
    }
}

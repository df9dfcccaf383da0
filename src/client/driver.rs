//! Per-request state machine.
//!
//! Consumes transport events in order and runs the terminal path exactly once:
//! a response (`Complete`), a transport failure (`Failed`), or cancellation.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{Actions, RequestOptions, RequestStatus, ResponseValue};
use crate::adapter::RequestContext;
use crate::artifact::{self, Artifact};
use crate::config::ClientConfig;
use crate::events::{self, EventBus, LifecycleEvent};
use crate::transport::{HttpResponse, TransportError, TransportEvent};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    InFlight,
    Streaming,
}

pub(crate) struct RequestDriver {
    pub ctx: RequestContext,
    pub actions: Actions,
    pub options: RequestOptions,
    pub events: Arc<dyn EventBus>,
    pub artifact: Artifact,
    pub config: ClientConfig,
    pub rx: mpsc::UnboundedReceiver<TransportEvent>,
    pub cancel: CancellationToken,
    pub started: Instant,
}

impl RequestDriver {
    pub async fn run(mut self) -> RequestStatus {
        let mut state = StreamState::InFlight;
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                event = self.rx.recv() => Some(event),
            };
            let Some(event) = next else {
                return self.cancelled().await;
            };

            match event {
                Some(TransportEvent::Chunk(chunk)) => {
                    if state == StreamState::InFlight {
                        state = StreamState::Streaming;
                        events::emit(
                            self.events.as_ref(),
                            LifecycleEvent::RequestStreaming,
                            &self.options,
                        );
                    }
                    (self.actions.callback)(Ok(ResponseValue::Chunk(chunk)));
                }
                Some(TransportEvent::Complete(response)) => return self.completed(response).await,
                Some(TransportEvent::Failed(err)) => return self.failed(err),
                None if self.cancel.is_cancelled() => return self.cancelled().await,
                None => {
                    return self.failed(TransportError::Other(
                        "transport ended without a response".to_string(),
                    ))
                }
            }
        }
    }

    async fn completed(self, response: HttpResponse) -> RequestStatus {
        if !response.body.is_empty() {
            (self.actions.callback)(Ok(ResponseValue::Complete(response.clone())));
        }

        let handlers = &self.ctx.adapter().handlers;
        if let Some(on_exit) = &handlers.on_exit {
            on_exit(&self.ctx, &response);
        }
        if let Some(teardown) = &handlers.teardown {
            teardown(&self.ctx);
        }
        if let Some(done) = &self.actions.done {
            done();
        }

        let status = if response.is_error() {
            RequestStatus::Error
        } else {
            RequestStatus::Success
        };
        info!(
            request_id = self.options.id,
            http_status = response.status,
            status = status.as_str(),
            duration_ms = self.started.elapsed().as_millis(),
            "request finished"
        );
        self.finish(status).await
    }

    /// Transport failures skip on_exit, teardown, done and cleanup.
    fn failed(mut self, err: TransportError) -> RequestStatus {
        warn!(
            request_id = self.options.id,
            error = %err,
            artifact = %self.artifact.path().display(),
            "request failed in transport"
        );
        (self.actions.callback)(Err(Error::Transport(err)));
        self.options.status = Some(RequestStatus::Error);
        events::emit(
            self.events.as_ref(),
            LifecycleEvent::RequestFinished,
            &self.options,
        );
        RequestStatus::Error
    }

    async fn cancelled(self) -> RequestStatus {
        if let Some(teardown) = &self.ctx.adapter().handlers.teardown {
            teardown(&self.ctx);
        }
        info!(
            request_id = self.options.id,
            duration_ms = self.started.elapsed().as_millis(),
            "request cancelled"
        );
        self.finish(RequestStatus::Cancelled).await
    }

    async fn finish(mut self, status: RequestStatus) -> RequestStatus {
        self.options.status = Some(status);
        events::emit(
            self.events.as_ref(),
            LifecycleEvent::RequestFinished,
            &self.options,
        );
        let level = self.config.effective_log_level();
        if artifact::cleanup(&self.artifact, level, status).await {
            debug!(request_id = self.options.id, "request artifact removed");
        }
        status
    }
}

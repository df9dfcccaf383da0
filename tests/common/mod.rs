//! Shared fixtures: a scripted transport and a journal that records hooks,
//! callbacks and lifecycle events in the order they happened.

#![allow(dead_code)]

use ai_lib_dispatch::adapter::{Adapter, Handlers};
use ai_lib_dispatch::client::RequestOptions;
use ai_lib_dispatch::events::EventBus;
use ai_lib_dispatch::transport::{
    HttpResponse, Transport, TransportError, TransportEvent, WireRequest,
};
use ai_lib_dispatch::{Actions, ResponseValue};
use async_trait::async_trait;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub enum Step {
    Chunk(String),
    Complete(u16, String),
    Fail(String),
    Pause(Duration),
    /// Block until the request is cancelled.
    Hang,
}

/// Plays back a fixed script for every request and records what it was asked to send.
pub struct ScriptedTransport {
    steps: Vec<Step>,
    seen: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: WireRequest,
        events: mpsc::UnboundedSender<TransportEvent>,
        cancel: CancellationToken,
    ) {
        self.seen.lock().unwrap().push(request);
        for step in &self.steps {
            match step {
                Step::Chunk(c) => {
                    let _ = events.send(TransportEvent::Chunk(c.clone()));
                }
                Step::Complete(status, body) => {
                    let _ = events.send(TransportEvent::Complete(HttpResponse {
                        status: *status,
                        headers: BTreeMap::new(),
                        body: body.clone(),
                    }));
                    return;
                }
                Step::Fail(msg) => {
                    let _ = events.send(TransportEvent::Failed(TransportError::Connect(
                        msg.clone(),
                    )));
                    return;
                }
                Step::Pause(d) => {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(*d) => {}
                    }
                }
                Step::Hang => {
                    cancel.cancelled().await;
                    return;
                }
            }
        }
    }
}

/// Ordered record of everything observable about a request.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }

    /// Callback that logs `chunk:<text>`, `complete:<status>:<body>` or `error`.
    pub fn actions(&self) -> Actions {
        let cb = self.clone();
        let done = self.clone();
        Actions::new(move |value| match value {
            Ok(ResponseValue::Chunk(c)) => cb.push(format!("chunk:{}", c)),
            Ok(ResponseValue::Complete(r)) => cb.push(format!("complete:{}:{}", r.status, r.body)),
            Err(_) => cb.push("error"),
        })
        .on_done(move || done.push("done"))
    }

    /// Handlers that build `{messages: [...]}` and log every lifecycle hook.
    pub fn handlers(&self) -> Handlers {
        let setup = self.clone();
        let on_exit = self.clone();
        let teardown = self.clone();
        Handlers::new()
            .with_setup(move |_| {
                setup.push("setup");
                Ok(())
            })
            .with_form_messages(|_, messages| {
                let mut out = Map::new();
                out.insert("messages".to_string(), json!(messages));
                out
            })
            .with_on_exit(move |_, response| on_exit.push(format!("on_exit:{}", response.status)))
            .with_teardown(move |_| teardown.push("teardown"))
    }
}

impl EventBus for Journal {
    fn fire(&self, event: &str, options: &RequestOptions) {
        let status = options.status.map(|s| s.as_str()).unwrap_or("-");
        self.push(format!("event:{}:{}", event, status));
    }
}

pub fn adapter(journal: &Journal, stream: bool) -> Adapter {
    Adapter::new("test", "http://127.0.0.1:9/v1/chat")
        .streaming(stream)
        .with_handlers(journal.handlers())
}

pub fn artifact_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

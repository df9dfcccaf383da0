//! Lifecycle events.
//!
//! Every request may announce `RequestStarted`, `RequestStreaming` and
//! `RequestFinished`, each optionally doubled with a caller-chosen suffix
//! (`RequestStarted` + `"Inline"` fires `RequestStartedInline` too). Firing is
//! synchronous and must not block: the bus is shared by all in-flight requests.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`EventBus`] | Trait for event destinations |
//! | [`NoopEventBus`] | Default bus (drops everything) |
//! | [`BroadcastEventBus`] | Fan-out to any number of async subscribers |
//! | [`InMemoryEventBus`] | Bounded in-memory record, for testing |
//! | [`consume`] | Drives a broadcast subscriber until the bus goes away |

use std::sync::RwLock;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::client::RequestOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    RequestStarted,
    RequestStreaming,
    RequestFinished,
}

impl LifecycleEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::RequestStarted => "RequestStarted",
            LifecycleEvent::RequestStreaming => "RequestStreaming",
            LifecycleEvent::RequestFinished => "RequestFinished",
        }
    }

    /// Names to fire for this event: the base name, then the suffixed one if any.
    pub fn names(self, suffix: Option<&str>) -> Vec<String> {
        let mut out = vec![self.as_str().to_string()];
        if let Some(s) = suffix.filter(|s| !s.is_empty()) {
            out.push(format!("{}{}", self.as_str(), s));
        }
        out
    }
}

/// Destination for lifecycle events.
pub trait EventBus: Send + Sync {
    /// Fire-and-forget. Implementations must not block or fail.
    fn fire(&self, event: &str, options: &RequestOptions);
}

/// Fire `event` for a request unless it is silent.
pub(crate) fn emit(bus: &dyn EventBus, event: LifecycleEvent, options: &RequestOptions) {
    if options.silent {
        return;
    }
    for name in event.names(options.event.as_deref()) {
        bus.fire(&name, options);
    }
}

/// A fired event together with the request snapshot it carried.
#[derive(Debug, Clone)]
pub struct FiredEvent {
    pub name: String,
    pub options: RequestOptions,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventBus;

impl EventBus for NoopEventBus {
    fn fire(&self, _event: &str, _options: &RequestOptions) {}
}

/// Broadcast bus. Events fired with no live subscriber are dropped; slow
/// subscribers observe `Lagged` rather than slowing requests down.
pub struct BroadcastEventBus {
    tx: broadcast::Sender<FiredEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FiredEvent> {
        self.tx.subscribe()
    }
}

/// Hand every event on `rx` to `on_event` until the bus is dropped.
///
/// A lagging subscriber skips what it missed and keeps going.
pub async fn consume(
    mut rx: broadcast::Receiver<FiredEvent>,
    mut on_event: impl FnMut(FiredEvent),
) {
    loop {
        match rx.recv().await {
            Ok(fired) => on_event(fired),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "lifecycle subscriber lagged; events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for BroadcastEventBus {
    fn fire(&self, event: &str, options: &RequestOptions) {
        let _ = self.tx.send(FiredEvent {
            name: event.to_string(),
            options: options.clone(),
        });
    }
}

/// In-memory bus for testing.
pub struct InMemoryEventBus {
    events: RwLock<Vec<FiredEvent>>,
    max_events: usize,
}

impl InMemoryEventBus {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max.max(1),
        }
    }

    pub fn get_events(&self) -> Vec<FiredEvent> {
        match self.events.read() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.get_events().into_iter().map(|e| e.name).collect()
    }

    pub fn get_events_by_request(&self, id: u64) -> Vec<FiredEvent> {
        self.get_events()
            .into_iter()
            .filter(|e| e.options.id == Some(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.get_events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus for InMemoryEventBus {
    fn fire(&self, event: &str, options: &RequestOptions) {
        let mut events = match self.events.write() {
            Ok(e) => e,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(FiredEvent {
            name: event.to_string(),
            options: options.clone(),
        });
        if events.len() > self.max_events {
            events.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_adds_second_name() {
        assert_eq!(
            LifecycleEvent::RequestStarted.names(Some("Chat")),
            vec!["RequestStarted", "RequestStartedChat"]
        );
        assert_eq!(
            LifecycleEvent::RequestFinished.names(Some("")),
            vec!["RequestFinished"]
        );
    }

    #[test]
    fn silent_requests_emit_nothing() {
        let bus = InMemoryEventBus::default();
        let opts = RequestOptions::default().silent(true).event("X");
        emit(&bus, LifecycleEvent::RequestStarted, &opts);
        assert!(bus.is_empty());

        let opts = RequestOptions::default().event("X");
        emit(&bus, LifecycleEvent::RequestStarted, &opts);
        assert_eq!(bus.names(), vec!["RequestStarted", "RequestStartedX"]);
    }

    #[test]
    fn in_memory_bus_is_bounded() {
        let bus = InMemoryEventBus::new(2);
        let opts = RequestOptions::default();
        for _ in 0..3 {
            emit(&bus, LifecycleEvent::RequestFinished, &opts);
        }
        assert_eq!(bus.len(), 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let bus = BroadcastEventBus::default();
        let mut rx = bus.subscribe();
        emit(&bus, LifecycleEvent::RequestStreaming, &RequestOptions::default());
        assert_eq!(rx.recv().await.unwrap().name, "RequestStreaming");
    }

    #[tokio::test]
    async fn consumer_survives_lag_and_stops_when_bus_is_dropped() {
        let bus = BroadcastEventBus::new(1);
        let rx = bus.subscribe();
        let options = RequestOptions::default();
        bus.fire("first", &options);
        bus.fire("second", &options);
        bus.fire("third", &options);
        drop(bus);

        let mut seen = Vec::new();
        consume(rx, |fired| seen.push(fired.name)).await;
        assert_eq!(seen, vec!["third".to_string()]);
    }
}

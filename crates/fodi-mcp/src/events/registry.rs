// ABOUTME: Connection registry mapping SSE subscriber ids to their output channels
// ABOUTME: Add, remove, unicast, broadcast, and the liveness sweep that pings or evicts clients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{encode_frame, ServerEvent};

/// Write half of a subscriber's stream; each item is one encoded SSE frame
pub type EventSender = mpsc::Sender<String>;

/// Registry-owned state of one subscriber
struct SseClient {
    sender: EventSender,
    /// Last write that found the buffer fully drained
    last_seen: Instant,
}

/// How a client left the registry (for logs only; both end in removal)
#[derive(Debug, Clone, Copy)]
enum Termination {
    /// Removed on request (disconnect or shutdown)
    Closed,
    /// Reader made no progress within the timeout
    Evicted,
    /// A write failed; reclaimed quietly
    Dropped,
}

/// Outcome of writing one frame to one client
enum Delivery {
    Sent,
    Unknown,
    Failed,
}

/// Counts from one liveness sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Clients that received a ping
    pub pinged: usize,
    /// Clients evicted for exceeding the timeout
    pub timed_out: usize,
    /// Clients evicted because the ping could not be written
    pub closed: usize,
}

impl SweepReport {
    /// Total clients removed by this sweep
    pub const fn removed(&self) -> usize {
        self.timed_out + self.closed
    }
}

/// Owner of every live subscription
///
/// The map is behind a single mutex and no operation awaits while holding
/// it: frames are written with `try_send`, so a full buffer fails the write
/// and the client is dropped like a disconnected one. Liveness only moves
/// when a write finds the buffer empty, so a reader that stalls with room
/// left in its buffer still times out at the next sweep past the timeout.
/// Frames reach a given client in the order the registry wrote them.
pub struct ConnectionRegistry {
    clients: Mutex<HashMap<String, SseClient>>,
    client_timeout: Duration,
}

impl ConnectionRegistry {
    /// Create an empty registry that evicts clients silent for longer than `client_timeout`
    pub fn new(client_timeout: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            client_timeout,
        }
    }

    /// Register a client and write its `connected` event
    ///
    /// On return the client is in the broadcast set, unless the `connected`
    /// write itself failed (the receiver was already gone). An existing
    /// client with the same id is replaced and its channel closed.
    pub async fn add_client(&self, id: String, sender: EventSender) {
        let frame = match encode_frame(&ServerEvent::connected(&id)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(client_id = %id, error = %e, "Refusing client, connected event failed to encode");
                return;
            }
        };

        let mut clients = self.clients.lock().await;
        let client = SseClient {
            sender,
            last_seen: Instant::now(),
        };
        if clients.insert(id.clone(), client).is_some() {
            warn!(client_id = %id, "Replaced existing client with the same id");
        }
        let total = clients.len();
        let delivered = matches!(deliver(&mut clients, &id, &frame), Delivery::Sent);
        drop(clients);

        if delivered {
            info!(client_id = %id, total, "SSE client connected");
        }
    }

    /// Remove a client and close its channel; removing a non-member is a no-op
    ///
    /// Returns whether the id was registered.
    pub async fn remove_client(&self, id: &str) -> bool {
        let removed = self.clients.lock().await.remove(id).is_some();
        if removed {
            log_termination(id, Termination::Closed, "disconnected");
        }
        removed
    }

    /// Write one event to one client; a failed write evicts the client
    ///
    /// Returns whether the frame was written.
    pub async fn send_to_client(&self, id: &str, event: &ServerEvent) -> bool {
        let frame = match encode_frame(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(client_id = id, error = %e, "Dropping unencodable event");
                return false;
            }
        };
        let mut clients = self.clients.lock().await;
        matches!(deliver(&mut clients, id, &frame), Delivery::Sent)
    }

    /// Write one event to every registered client
    ///
    /// Iterates over a snapshot of ids, so evictions triggered mid-fan-out
    /// only affect the failing client. Returns the number of deliveries.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let frame = match encode_frame(event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping unencodable broadcast");
                return 0;
            }
        };

        let mut clients = self.clients.lock().await;
        let ids: Vec<String> = clients.keys().cloned().collect();
        let delivered = ids
            .iter()
            .filter(|id| matches!(deliver(&mut clients, id, &frame), Delivery::Sent))
            .count();
        drop(clients);

        debug!(
            event = event.type_name(),
            delivered,
            attempted = ids.len(),
            "Broadcast complete"
        );
        delivered
    }

    /// Evict clients past the timeout and ping the rest
    ///
    /// Timeouts are checked by comparing each client's last drained write
    /// against the clock, so the cost is one pass over the map per sweep.
    pub async fn sweep(&self) -> SweepReport {
        let frame = match encode_frame(&ServerEvent::ping()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Skipping sweep, ping failed to encode");
                return SweepReport::default();
            }
        };

        let now = Instant::now();
        let mut report = SweepReport::default();
        let mut clients = self.clients.lock().await;

        let stale: Vec<String> = clients
            .iter()
            .filter(|(_, client)| now.duration_since(client.last_seen) > self.client_timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            clients.remove(id);
            log_termination(id, Termination::Evicted, "liveness timeout");
        }
        report.timed_out = stale.len();

        let live: Vec<String> = clients.keys().cloned().collect();
        for id in &live {
            match deliver(&mut clients, id, &frame) {
                Delivery::Sent => report.pinged += 1,
                Delivery::Failed => report.closed += 1,
                Delivery::Unknown => {}
            }
        }
        drop(clients);

        report
    }

    /// Close every channel, ending all subscription streams (used on shutdown)
    pub async fn close_all(&self) -> usize {
        let drained: Vec<String> = self.clients.lock().await.drain().map(|(id, _)| id).collect();
        for id in &drained {
            log_termination(id, Termination::Closed, "server shutdown");
        }
        drained.len()
    }

    /// Number of registered clients at (or after) the time of the call
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Whether an id is currently registered
    pub async fn contains(&self, id: &str) -> bool {
        self.clients.lock().await.contains_key(id)
    }
}

/// Write a frame to one client, evicting it when the write fails
fn deliver(clients: &mut HashMap<String, SseClient>, id: &str, frame: &str) -> Delivery {
    let Some(client) = clients.get_mut(id) else {
        return Delivery::Unknown;
    };

    // An empty buffer means the reader consumed everything sent so far
    let drained = client.sender.capacity() == client.sender.max_capacity();

    match client.sender.try_send(frame.to_owned()) {
        Ok(()) => {
            if drained {
                client.last_seen = Instant::now();
            }
            Delivery::Sent
        }
        Err(e) => {
            let reason = match e {
                TrySendError::Full(_) => "send failed: buffer full",
                TrySendError::Closed(_) => "send failed: channel closed",
            };
            clients.remove(id);
            log_termination(id, Termination::Dropped, reason);
            Delivery::Failed
        }
    }
}

fn log_termination(id: &str, termination: Termination, reason: &str) {
    match termination {
        Termination::Closed => info!(client_id = id, reason, "SSE client closed"),
        Termination::Evicted => info!(client_id = id, reason, "SSE client evicted"),
        Termination::Dropped => debug!(client_id = id, reason, "SSE client dropped"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::ChangeKind;
    use fodi::types::FileMeta;
    use tokio::sync::mpsc::Receiver;
    use tracing::field::{Field, Visit};
    use tracing::Level;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn channel() -> (EventSender, Receiver<String>) {
        mpsc::channel(8)
    }

    fn drain(rx: &mut Receiver<String>) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            let json = frame
                .strip_prefix("data: ")
                .and_then(|rest| rest.strip_suffix("\n\n"))
                .expect("sse frame");
            events.push(serde_json::from_str(json).expect("json"));
        }
        events
    }

    /// Collects the level and message of every event while installed
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<(Level, String)>>>);

    impl Captured {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
        }

        fn levels_of(&self, message: &str) -> Vec<Level> {
            self.0
                .lock()
                .expect("log lock")
                .iter()
                .filter(|(_, m)| m == message)
                .map(|(level, _)| *level)
                .collect()
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Captured {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut message = MessageField::default();
            event.record(&mut message);
            self.0
                .lock()
                .expect("log lock")
                .push((*event.metadata().level(), message.0));
        }
    }

    #[derive(Default)]
    struct MessageField(String);

    impl Visit for MessageField {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    fn change() -> ServerEvent {
        ServerEvent::file_change(ChangeKind::Created, FileMeta::file("/new.txt", 1))
    }

    #[tokio::test]
    async fn add_client_sends_connected_once() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();

        registry.add_client("c1".to_owned(), tx).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "connected");
        assert_eq!(events[0]["clientId"], "c1");
        assert_eq!(registry.client_count().await, 1);
    }

    #[tokio::test]
    async fn remove_unknown_is_noop() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        assert!(!registry.remove_client("ghost").await);
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn remove_closes_channel() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;

        assert!(registry.remove_client("c1").await);
        assert!(!registry.remove_client("c1").await);

        assert!(rx.recv().await.is_some(), "connected frame still buffered");
        assert!(rx.recv().await.is_none(), "channel closed after removal");
    }

    #[tokio::test]
    async fn broadcast_survives_one_failing_client() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx_a, mut rx_a) = channel();
        let (tx_b, rx_b) = channel();
        let (tx_c, mut rx_c) = channel();
        registry.add_client("a".to_owned(), tx_a).await;
        registry.add_client("b".to_owned(), tx_b).await;
        registry.add_client("c".to_owned(), tx_c).await;
        drop(rx_b);

        let delivered = registry.broadcast(&change()).await;

        assert_eq!(delivered, 2);
        assert_eq!(registry.client_count().await, 2);
        assert!(!registry.contains("b").await);
        for rx in [&mut rx_a, &mut rx_c] {
            let events = drain(rx);
            let changes: Vec<_> = events
                .iter()
                .filter(|e| e["type"] == "file_change")
                .collect();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0]["file"]["path"], "/new.txt");
        }
    }

    #[tokio::test]
    async fn send_to_stalled_client_evicts() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, _rx) = mpsc::channel(1);
        registry.add_client("slow".to_owned(), tx).await;

        // buffer already holds the connected frame
        assert!(!registry.send_to_client("slow", &ServerEvent::ping()).await);
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn send_to_unknown_client_is_false() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        assert!(!registry.send_to_client("ghost", &ServerEvent::ping()).await);
    }

    #[tokio::test]
    async fn per_client_order_is_preserved() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;
        registry.send_to_client("c1", &ServerEvent::ping()).await;
        registry.broadcast(&change()).await;

        let types: Vec<String> = drain(&mut rx)
            .iter()
            .map(|e| e["type"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(types, ["connected", "ping", "file_change"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_silent_client_after_timeout() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, _rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;

        tokio::time::advance(Duration::from_secs(31)).await;
        let report = registry.sweep().await;

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.pinged, 0);
        assert_eq!(registry.client_count().await, 0);
        assert!(!registry.remove_client("c1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_reading_client_alive() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;
        let mut types = Vec::new();

        for _ in 0..4 {
            types.extend(drain(&mut rx));
            tokio::time::advance(Duration::from_secs(20)).await;
            let report = registry.sweep().await;
            assert_eq!(report.pinged, 1);
            assert_eq!(report.removed(), 0);
        }
        types.extend(drain(&mut rx));

        let types: Vec<&str> = types.iter().filter_map(|e| e["type"].as_str()).collect();
        assert_eq!(types, ["connected", "ping", "ping", "ping", "ping"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_reader_is_evicted_by_first_sweep_past_timeout() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, _rx) = mpsc::channel(64);
        registry.add_client("stalled".to_owned(), tx).await;

        // 15s and 30s: still inside the window, buffer far from full
        for _ in 0..2 {
            tokio::time::advance(Duration::from_secs(15)).await;
            let report = registry.sweep().await;
            assert_eq!(report.pinged, 1);
            assert_eq!(report.removed(), 0);
        }

        tokio::time::advance(Duration::from_secs(15)).await;
        let report = registry.sweep().await;
        assert_eq!(report.timed_out, 1);
        assert_eq!(report.pinged, 0);
        assert!(!registry.contains("stalled").await);
    }

    #[tokio::test(start_paused = true)]
    async fn writes_into_a_backlog_do_not_refresh_liveness() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;

        // reader never catches up, but broadcasts keep landing in the buffer
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(10)).await;
            assert_eq!(registry.broadcast(&change()).await, 1);
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(registry.sweep().await.timed_out, 1);

        // buffered frames are still readable, then the stream ends
        assert_eq!(drain(&mut rx).len(), 4);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn sweep_evicts_disconnected_client() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;
        drop(rx);

        let report = registry.sweep().await;
        assert_eq!(report.closed, 1);
        assert_eq!(registry.client_count().await, 0);
    }

    #[tokio::test]
    async fn re_adding_id_replaces_channel() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (old_tx, mut old_rx) = channel();
        let (new_tx, mut new_rx) = channel();
        registry.add_client("dup".to_owned(), old_tx).await;
        registry.add_client("dup".to_owned(), new_tx).await;

        assert_eq!(registry.client_count().await, 1);
        assert_eq!(drain(&mut old_rx).len(), 1);
        assert!(old_rx.recv().await.is_none());
        assert_eq!(drain(&mut new_rx).len(), 1);
    }

    #[tokio::test]
    async fn close_all_ends_every_stream() {
        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, mut rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;

        assert_eq!(registry.close_all().await, 1);
        assert_eq!(registry.client_count().await, 0);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn failed_send_is_logged_at_debug() {
        let logs = Captured::default();
        let _guard = logs.install();

        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx, rx) = channel();
        registry.add_client("c1".to_owned(), tx).await;
        drop(rx);
        assert_eq!(registry.broadcast(&change()).await, 0);

        assert_eq!(logs.levels_of("SSE client connected"), [Level::INFO]);
        assert_eq!(logs.levels_of("SSE client dropped"), [Level::DEBUG]);
        assert!(logs.levels_of("SSE client closed").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_and_disconnect_are_logged_at_info() {
        let logs = Captured::default();
        let _guard = logs.install();

        let registry = ConnectionRegistry::new(TIMEOUT);
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();
        registry.add_client("a".to_owned(), tx_a).await;
        registry.add_client("b".to_owned(), tx_b).await;

        assert!(registry.remove_client("a").await);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(registry.sweep().await.timed_out, 1);

        assert_eq!(logs.levels_of("SSE client closed"), [Level::INFO]);
        assert_eq!(logs.levels_of("SSE client evicted"), [Level::INFO]);
    }
}

//! Per-conversation fan-out event bus.
//!
//! The bus is the single synchronization point between the turn pipeline
//! (publisher) and the streaming handlers (subscribers). `publish` never
//! blocks and never fails: delivery to each sink is independent, and a sink
//! whose inbox is full simply misses that envelope (the newest one is
//! dropped for that sink only, keeping the publisher live).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::types::EventEnvelope;

/// Reserved key subscribing to every conversation.
pub const WILDCARD: &str = "*";

struct SubscriberEntry {
    id: Uuid,
    tx: mpsc::Sender<EventEnvelope>,
}

/// Multiplexes published envelopes to the sinks registered under their
/// conversation id, plus any wildcard sinks.
pub struct ConversationBus {
    capacity: usize,
    sinks: RwLock<HashMap<String, Vec<SubscriberEntry>>>,
}

impl ConversationBus {
    /// Create a bus whose sink inboxes hold up to `capacity` envelopes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sinks: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new sink under `conversation_id` (or [`WILDCARD`]).
    ///
    /// The returned [`Subscription`] unregisters itself when dropped, so the
    /// registration/deregistration pairing holds on every exit path of the
    /// consuming task, cancellation included.
    pub fn subscribe(self: &Arc<Self>, conversation_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        let mut sinks = self.sinks.write().unwrap();
        sinks
            .entry(conversation_id.to_string())
            .or_default()
            .push(SubscriberEntry { id, tx });
        drop(sinks);

        tracing::info!(conversation_id, sink_id = %id, "subscriber registered");
        Subscription {
            conversation_id: conversation_id.to_string(),
            id,
            rx,
            bus: Arc::clone(self),
        }
    }

    /// Remove one sink. Idempotent; prunes the group entry once empty.
    pub fn unsubscribe(&self, conversation_id: &str, sink_id: Uuid) {
        let mut sinks = self.sinks.write().unwrap();
        if let Some(entries) = sinks.get_mut(conversation_id) {
            entries.retain(|entry| entry.id != sink_id);
            if entries.is_empty() {
                sinks.remove(conversation_id);
            }
        }
    }

    /// Deliver `envelope` to every sink under its conversation id and every
    /// wildcard sink, in registration order. FIFO per sink; publishing with
    /// no registered sinks is a no-op.
    pub fn publish(&self, envelope: &EventEnvelope) {
        let mut stale: Vec<(String, Uuid)> = Vec::new();
        {
            let sinks = self.sinks.read().unwrap();
            for key in [envelope.conversation_id.as_str(), WILDCARD] {
                let Some(entries) = sinks.get(key) else { continue };
                for entry in entries {
                    match entry.tx.try_send(envelope.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!(
                                conversation_id = %envelope.conversation_id,
                                sink_id = %entry.id,
                                kind = envelope.kind.as_str(),
                                "sink inbox full, dropping envelope"
                            );
                        }
                        Err(TrySendError::Closed(_)) => {
                            stale.push((key.to_string(), entry.id));
                        }
                    }
                }
            }
        }
        for (key, id) in stale {
            self.unsubscribe(&key, id);
        }
    }

    /// Number of sinks currently registered under `conversation_id`.
    pub fn subscriber_count(&self, conversation_id: &str) -> usize {
        self.sinks
            .read()
            .unwrap()
            .get(conversation_id)
            .map_or(0, Vec::len)
    }

    /// Number of distinct conversation groups with at least one sink.
    pub fn group_count(&self) -> usize {
        self.sinks.read().unwrap().len()
    }
}

/// One live subscriber: the receiving half of a sink inbox plus its
/// registration, released on drop.
pub struct Subscription {
    conversation_id: String,
    id: Uuid,
    rx: mpsc::Receiver<EventEnvelope>,
    bus: Arc<ConversationBus>,
}

impl Subscription {
    /// Await the next envelope. Returns `None` once the subscription has
    /// been unregistered and the inbox drained.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }

    /// Non-blocking receive, for draining in tests and shutdown paths.
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        self.rx.try_recv().ok()
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn sink_id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.conversation_id, self.id);
        tracing::info!(
            conversation_id = %self.conversation_id,
            sink_id = %self.id,
            "subscriber unregistered"
        );
    }
}

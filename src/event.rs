//! Fan-out event notifier that decouples the registry from whatever is
//! watching it. Subscribers register a callback and get back a cancellation
//! handle; delivery is synchronous within the emitting context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Severity bucket for UI-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Something the user asked for worked.
    Success,
    /// A connection attempt or live link failed.
    Error,
    /// A link went away, either remotely or via an explicit removal.
    Warning,
}

/// A discrete state change surfaced to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// A handshake finished before its deadline.
    Connected {
        /// Target whose link came up.
        target: String,
    },
    /// A handshake failed or timed out, or a live transport errored.
    ConnectionFailed {
        /// Target whose link went bad.
        target: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The remote side closed a link that was healthy.
    Disconnected {
        /// Target whose link the remote closed.
        target: String,
    },
    /// An entry left the registry via an explicit disconnect or a replace.
    Removed {
        /// Target that was evicted.
        target: String,
    },
    /// Non-looping playback consumed its final frame.
    PlaybackFinished,
}

impl RelayEvent {
    /// The severity bucket a UI would color this event with.
    pub fn kind(&self) -> EventKind {
        match self {
            RelayEvent::Connected { .. } | RelayEvent::PlaybackFinished => EventKind::Success,
            RelayEvent::ConnectionFailed { .. } => EventKind::Error,
            RelayEvent::Disconnected { .. } | RelayEvent::Removed { .. } => EventKind::Warning,
        }
    }

    /// A short human-readable description, suitable for a transient
    /// notification.
    pub fn message(&self) -> String {
        match self {
            RelayEvent::Connected { target } => format!("{} connected", target),
            RelayEvent::ConnectionFailed { target, reason } => {
                format!("{}: {}", target, reason)
            }
            RelayEvent::Disconnected { target } => format!("{} disconnected", target),
            RelayEvent::Removed { target } => format!("{} removed", target),
            RelayEvent::PlaybackFinished => "playback finished".to_owned(),
        }
    }
}

type Callback = Arc<dyn Fn(&RelayEvent) + Send + Sync + 'static>;
type Listeners = Mutex<Vec<(u64, Callback)>>;

/// Broadcasts [`RelayEvent`]s to every currently-registered subscriber.
///
/// Clones share the same subscriber list, so any component holding a clone
/// emits to the same audience.
#[derive(Clone, Default)]
pub struct EventNotifier {
    listeners: Arc<Listeners>,
    next_id: Arc<AtomicU64>,
}

impl EventNotifier {
    /// A notifier with no subscribers yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for every future event. The returned handle
    /// unsubscribes; dropping it without calling [`Subscription::cancel`]
    /// leaves the callback registered.
    pub fn subscribe(
        &self,
        callback: impl Fn(&RelayEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap()
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers an event to every subscriber. The subscriber list is
    /// snapshotted before iterating, so a callback that unsubscribes
    /// mid-broadcast cannot skip its peers. No ordering is guaranteed
    /// across subscribers.
    pub fn emit(&self, event: RelayEvent) {
        let snapshot: Vec<Callback> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(&event);
        }
    }
}

/// Cancellation handle returned by [`EventNotifier::subscribe`].
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Removes the callback from the notifier. Safe to call while a
    /// broadcast is in flight; peers already snapshotted still run.
    pub fn cancel(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().unwrap().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_out_to_all_subscribers() {
        let notifier = EventNotifier::new();
        let hits = Arc::new(Mutex::new(Vec::new()));

        let sink_a = Arc::clone(&hits);
        let _a = notifier.subscribe(move |e| sink_a.lock().unwrap().push(("a", e.clone())));
        let sink_b = Arc::clone(&hits);
        let _b = notifier.subscribe(move |e| sink_b.lock().unwrap().push(("b", e.clone())));

        notifier.emit(RelayEvent::PlaybackFinished);

        let hits = hits.lock().unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|(_, e)| *e == RelayEvent::PlaybackFinished));
    }

    #[test]
    fn cancel_stops_delivery() {
        let notifier = EventNotifier::new();
        let count = Arc::new(Mutex::new(0));

        let sink = Arc::clone(&count);
        let sub = notifier.subscribe(move |_| *sink.lock().unwrap() += 1);

        notifier.emit(RelayEvent::PlaybackFinished);
        sub.cancel();
        notifier.emit(RelayEvent::PlaybackFinished);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn unsubscribe_during_broadcast_does_not_skip_peers() {
        let notifier = EventNotifier::new();
        let count = Arc::new(Mutex::new(0));

        // The first subscriber tears down the second one mid-broadcast.
        let victim = Arc::new(Mutex::new(None::<Subscription>));
        let trigger_victim = Arc::clone(&victim);
        let _killer = notifier.subscribe(move |_| {
            if let Some(sub) = trigger_victim.lock().unwrap().take() {
                sub.cancel();
            }
        });

        let sink = Arc::clone(&count);
        let sub = notifier.subscribe(move |_| *sink.lock().unwrap() += 1);
        *victim.lock().unwrap() = Some(sub);

        // The victim was snapshotted before the killer ran, so it still
        // sees this event, and nothing panics.
        notifier.emit(RelayEvent::PlaybackFinished);
        assert_eq!(*count.lock().unwrap(), 1);

        // But it is gone for the next one.
        notifier.emit(RelayEvent::PlaybackFinished);
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn event_kinds_and_messages() {
        let connected = RelayEvent::Connected {
            target: "Head".to_owned(),
        };
        assert_eq!(connected.kind(), EventKind::Success);
        assert_eq!(connected.message(), "Head connected");

        let failed = RelayEvent::ConnectionFailed {
            target: "Head".to_owned(),
            reason: "connection timeout".to_owned(),
        };
        assert_eq!(failed.kind(), EventKind::Error);
        assert_eq!(failed.message(), "Head: connection timeout");

        assert_eq!(
            RelayEvent::Removed {
                target: "Head".to_owned()
            }
            .kind(),
            EventKind::Warning
        );
    }
}

//! Consent events.
//!
//! The consent box publishes a [`ConsentEvent`] for every visible state change
//! and every dispatch round, so a host can re-render or audit without polling.
//! Events travel over a `tokio` broadcast channel; [`ConsentBox::subscribe`]
//! hands out receivers, and publishing with no receivers is a no-op.
//!
//! [`ConsentBox::subscribe`]: crate::ConsentBox::subscribe

use crate::engine::DEFAULT_CHANNEL_CAPACITY;
use tokio::sync::broadcast;

/// A handle for receiving consent notifications.
pub type Subscription = broadcast::Receiver<ConsentEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsentEvent {
    /// The box became visible, optionally pointing at one category.
    Shown { highlight: Option<String> },
    /// The box was hidden.
    Hidden,
    /// A new consent record was written.
    ConsentSaved { ids: Vec<String> },
    /// Source filters were informed of the consent state.
    FiltersDispatched {
        granted: Vec<String>,
        revoked: Vec<String>,
        failed: Vec<String>,
    },
}

#[derive(Debug)]
pub(crate) struct ConsentBus {
    tx: broadcast::Sender<ConsentEvent>,
}

impl Default for ConsentBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl ConsentBus {
    pub(crate) fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, ev: ConsentEvent) {
        // send() fails only when there are no receivers, which is fine.
        let _ = self.tx.send(ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_ignored() {
        let bus = ConsentBus::default();
        bus.publish(ConsentEvent::Hidden);
    }

    #[test]
    fn subscribers_see_events_after_subscribing() {
        let bus = ConsentBus::default();
        bus.publish(ConsentEvent::Hidden);

        let mut rx = bus.subscribe();
        bus.publish(ConsentEvent::Shown { highlight: Some("maps".into()) });

        assert_eq!(rx.try_recv().unwrap(), ConsentEvent::Shown { highlight: Some("maps".into()) });
        assert!(rx.try_recv().is_err());
    }
}

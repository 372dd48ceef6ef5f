//! EventBus - in-process pub/sub for scheduler events.
//!
//! Each subscriber gets its own unbounded channel, so a slow subscriber never
//! blocks the scheduler and every subscriber sees events in emission order.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::domain::SchedulerEvent;
use crate::ports::EventSink;

pub type SubscriptionId = u64;

/// Receiving end of a subscription. Dropping it unsubscribes lazily.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<SchedulerEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event; `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<SchedulerEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SchedulerEvent> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<SchedulerEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, tx);
        Subscription { id, receiver }
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .is_some()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &SchedulerEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        // Drop subscribers whose receiver is gone.
        subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;

    fn started(id: &str) -> SchedulerEvent {
        SchedulerEvent::TaskStarted {
            id: TaskId::from(id),
        }
    }

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(&started("1"));
        bus.emit(&started("2"));

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.recv().await, Some(started("1")));
            assert_eq!(sub.recv().await, Some(started("2")));
        }
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));

        bus.emit(&started("1"));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn dropped_subscription_is_pruned_on_emit() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let dropped = sub.id();
        let mut keep = bus.subscribe();
        drop(sub);

        bus.emit(&started("1"));
        assert!(!bus.unsubscribe(dropped));
        assert_eq!(keep.try_recv(), Some(started("1")));
    }
}

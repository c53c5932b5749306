//! Event bus for notifications raised by the decision core.
//!
//! Listeners subscribe to a bus and receive their own copy of every event
//! published after they subscribed. Buses are plain values handed to units at
//! setup; there is no global listener list.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use umbra_common::UnitId;

/// Notifications the core raises for external listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    /// Unit died
    UnitDied {
        /// Unit ID
        unit: UnitId,
    },
    /// Boss entered a phase transition window
    PhaseTransitionStarted {
        /// Boss unit
        unit: UnitId,
        /// Phase being entered
        phase: usize,
    },
    /// Boss left its phase transition window
    PhaseTransitionEnded {
        /// Boss unit
        unit: UnitId,
        /// Phase now active
        phase: usize,
    },
    /// Unit was reset to its spawn state
    EnemyReset {
        /// Unit ID
        unit: UnitId,
    },
    /// Unit's behavior was restarted from scratch
    BehaviorReset {
        /// Unit ID
        unit: UnitId,
    },
    /// Unit acquired a target
    TargetSensed {
        /// Observer
        unit: UnitId,
        /// Sensed unit
        target: UnitId,
    },
    /// Unit lost its target
    TargetLost {
        /// Observer
        unit: UnitId,
    },
}

impl UnitEvent {
    /// Unit that raised the event.
    #[must_use]
    pub fn unit(&self) -> UnitId {
        match self {
            Self::UnitDied { unit }
            | Self::PhaseTransitionStarted { unit, .. }
            | Self::PhaseTransitionEnded { unit, .. }
            | Self::EnemyReset { unit }
            | Self::BehaviorReset { unit }
            | Self::TargetSensed { unit, .. }
            | Self::TargetLost { unit } => *unit,
        }
    }
}

/// Broadcasting event bus.
#[derive(Debug)]
pub struct EventBus {
    /// Per-subscriber senders
    subscribers: Mutex<Vec<Sender<UnitEvent>>>,
    /// Capacity of each subscriber queue
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given per-subscriber capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Registers a listener.
    pub fn subscribe(&self) -> Receiver<UnitEvent> {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Publishes an event to every live subscriber.
    pub fn publish(&self, event: UnitEvent) {
        tracing::trace!(?event, "publish");
        self.subscribers.lock().retain(|sender| {
            // Non-blocking send - if full, event is dropped for that subscriber
            !matches!(
                sender.try_send(event.clone()),
                Err(TrySendError::Disconnected(_))
            )
        });
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns the per-subscriber capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Drains all pending events of a subscription.
pub fn drain(receiver: &Receiver<UnitEvent>) -> Vec<UnitEvent> {
    receiver.try_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::new(8);
        let a = bus.subscribe();
        let b = bus.subscribe();
        let unit = UnitId::from_raw(7);

        bus.publish(UnitEvent::UnitDied { unit });

        assert_eq!(drain(&a), vec![UnitEvent::UnitDied { unit }]);
        assert_eq!(drain(&b), vec![UnitEvent::UnitDied { unit }]);
    }

    #[test]
    fn test_disconnected_subscribers_are_dropped() {
        let bus = EventBus::new(8);
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(UnitEvent::TargetLost {
            unit: UnitId::from_raw(1),
        });
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(drain(&kept).len(), 1);
    }

    #[test]
    fn test_full_queue_drops_event() {
        let bus = EventBus::new(1);
        let rx = bus.subscribe();
        let unit = UnitId::from_raw(3);
        bus.publish(UnitEvent::EnemyReset { unit });
        bus.publish(UnitEvent::BehaviorReset { unit });

        let events = drain(&rx);
        assert_eq!(events, vec![UnitEvent::EnemyReset { unit }]);
        assert_eq!(events[0].unit(), unit);
    }
}

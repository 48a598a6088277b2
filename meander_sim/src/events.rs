use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::bodies::{BodyId, BodyKindTag};

/// Structural change to the body network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyEvent {
    BodyCreated { body: BodyId, kind: BodyKindTag },
    BodyDestroyed { body: BodyId },
    SinkAdded { source: BodyId, sink: BodyId },
    SinkRemoved { source: BodyId, sink: BodyId },
}

impl fmt::Display for TopologyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyEvent::BodyCreated { body, kind } => write!(f, "created {body} ({kind})"),
            TopologyEvent::BodyDestroyed { body } => write!(f, "destroyed {body}"),
            TopologyEvent::SinkAdded { source, sink } => write!(f, "sink {source} -> {sink}"),
            TopologyEvent::SinkRemoved { source, sink } => {
                write!(f, "unsink {source} -> {sink}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Default)]
struct SubscriberSlot {
    generation: u32,
    sender: Option<Sender<TopologyEvent>>,
}

/// Multicast of topology events to external observers.
///
/// Slots freed by [`TopologyBus::unsubscribe`] are reused by later
/// subscriptions under a new generation, so a stale id never cancels them.
/// Subscribers whose receiver was dropped are pruned on the next publish.
#[derive(Debug, Default)]
pub struct TopologyBus {
    subscribers: Vec<SubscriberSlot>,
}

impl TopologyBus {
    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<TopologyEvent>) {
        let (sender, receiver) = unbounded();
        let slot = match self.subscribers.iter().position(|slot| slot.sender.is_none()) {
            Some(index) => index,
            None => {
                self.subscribers.push(SubscriberSlot::default());
                self.subscribers.len() - 1
            }
        };
        let entry = &mut self.subscribers[slot];
        entry.sender = Some(sender);
        let id = SubscriptionId {
            slot,
            generation: entry.generation,
        };
        (id, receiver)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.subscribers.get_mut(id.slot) {
            Some(entry) if entry.generation == id.generation => entry.vacate(),
            _ => false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|slot| slot.sender.is_some())
            .count()
    }

    pub fn publish(&mut self, event: TopologyEvent) {
        for slot in &mut self.subscribers {
            let disconnected = match &slot.sender {
                Some(sender) => sender.send(event).is_err(),
                None => false,
            };
            if disconnected {
                tracing::debug!(
                    target: "meander::topology",
                    "topology_bus.subscriber_dropped"
                );
                slot.vacate();
            }
        }
    }
}

impl SubscriberSlot {
    /// Drops the sender and retires the slot's current id.
    fn vacate(&mut self) -> bool {
        if self.sender.take().is_none() {
            return false;
        }
        self.generation = self.generation.wrapping_add(1);
        true
    }
}

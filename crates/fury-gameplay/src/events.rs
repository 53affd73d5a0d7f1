//! Event bus for collaborators outside the simulation (sound, HUD, tools).

use crossbeam_channel::{bounded, Receiver, Sender};
use fury_common::EntityHandle;
use serde::{Deserialize, Serialize};

use crate::collectible::CollectibleType;
use crate::damage::HitSeverity;
use crate::entity::EntityType;
use crate::slots::Slot;

/// Event types that can be sent through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Entity entered the live set
    EntitySpawned {
        /// Entity handle
        handle: EntityHandle,
        /// Entity kind
        kind: EntityType,
    },
    /// Entity left the live set
    EntityRemoved {
        /// Entity handle
        handle: EntityHandle,
        /// Entity kind
        kind: EntityType,
    },
    /// Entity lost health
    EntityDamaged {
        /// Entity handle
        handle: EntityHandle,
        /// Health lost this tick
        amount: i32,
        /// Decisive severity
        severity: HitSeverity,
        /// Health left
        remaining_health: i32,
    },
    /// Entity started dying (or, for barrels, broke)
    EntityDied {
        /// Entity handle
        handle: EntityHandle,
        /// Entity kind
        kind: EntityType,
    },
    /// The player picked up an item
    ItemPickedUp {
        /// Who picked it up
        handle: EntityHandle,
        /// The item entity
        item_handle: EntityHandle,
        /// Item type
        item: CollectibleType,
    },
    /// An enemy claimed an attack slot
    SlotClaimed {
        /// Enemy handle
        enemy: EntityHandle,
        /// Slot claimed
        slot: Slot,
    },
    /// An enemy gave its attack slot back
    SlotReleased {
        /// Enemy handle
        enemy: EntityHandle,
        /// Slot released
        slot: Slot,
    },
    /// A bullet trace was resolved
    BulletFired {
        /// Shooter handle
        shooter: EntityHandle,
        /// What it hit, if anything
        target: Option<EntityHandle>,
    },
}

/// Event bus for broadcasting events to subscribers.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events
    sender: Sender<GameEvent>,
    /// Receiver for collecting events
    receiver: Receiver<GameEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. Never blocks; a full bus drops the event.
    pub fn publish(&self, event: GameEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::trace!("event bus full, dropping event");
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Hands every pending event to a handler.
    pub fn dispatch(&self, handler: &mut dyn EventHandler) -> usize {
        let mut count = 0;
        for event in self.receiver.try_iter() {
            handler.handle(&event);
            count += 1;
        }
        count
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<GameEvent> {
        self.sender.clone()
    }
}

/// Event consumer.
pub trait EventHandler {
    /// Handles an event.
    fn handle(&mut self, event: &GameEvent);
}

//! Deferred spawn requests.
//!
//! State machines never push into the live entity collection while it is
//! being iterated. They append requests here and the world instantiates them
//! after the main pass.

use fury_common::{Direction, EntityHandle, Vec2};
use serde::{Deserialize, Serialize};

use crate::collectible::CollectibleType;
use crate::entity::EntityType;

/// Who created a spawned entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Creator handle
    pub handle: EntityHandle,
    /// Creator kind
    pub kind: EntityType,
}

impl Owner {
    /// Creates an owner record.
    #[must_use]
    pub const fn new(handle: EntityHandle, kind: EntityType) -> Self {
        Self { handle, kind }
    }
}

/// Throw a weapon along the thrower's facing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowRequest {
    /// Thrower's feet
    pub pos: Vec2,
    /// Throw direction
    pub dir: Direction,
    /// Thrower
    pub owner: Owner,
    /// What is thrown
    pub item: CollectibleType,
}

/// Drop an item that arcs to the ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropRequest {
    /// Dropper's feet
    pub pos: Vec2,
    /// Dropper's facing; the item flies the opposite way
    pub dir: Direction,
    /// Dropper
    pub owner: Owner,
    /// What is dropped
    pub item: CollectibleType,
    /// Fade out after landing instead of staying pickupable
    pub instantly_disappear: bool,
    /// Shots left, for guns
    pub ammo: u32,
}

/// Fire a hitscan bullet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRequest {
    /// Shooter's feet
    pub pos: Vec2,
    /// Shooter's height offset
    pub z: f32,
    /// Firing direction
    pub dir: Direction,
    /// Shooter
    pub owner: Owner,
}

/// One queued request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpawnRequest {
    /// Thrown weapon
    Throw(ThrowRequest),
    /// Dropped item
    Drop(DropRequest),
    /// Bullet
    Shot(ShotRequest),
}

/// Requests collected during one pass, in the order they were made.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpawnQueue {
    requests: Vec<SpawnRequest>,
}

impl SpawnQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            requests: Vec::new(),
        }
    }

    /// Queue a thrown weapon.
    pub fn throw(&mut self, request: ThrowRequest) {
        tracing::debug!(owner = %request.owner.handle, item = ?request.item, "throw requested");
        self.requests.push(SpawnRequest::Throw(request));
    }

    /// Queue a dropped item.
    pub fn drop_item(&mut self, request: DropRequest) {
        tracing::debug!(owner = %request.owner.handle, item = ?request.item, "drop requested");
        self.requests.push(SpawnRequest::Drop(request));
    }

    /// Queue a bullet.
    pub fn shoot(&mut self, request: ShotRequest) {
        tracing::debug!(owner = %request.owner.handle, "shot requested");
        self.requests.push(SpawnRequest::Shot(request));
    }

    /// Pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// No pending requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Pending requests, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SpawnRequest> {
        self.requests.iter()
    }

    /// Take every pending request, oldest first.
    pub fn drain(&mut self) -> Vec<SpawnRequest> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_order_and_empties() {
        let owner = Owner::new(EntityHandle::from_raw(1), EntityType::Player);
        let mut queue = SpawnQueue::new();
        queue.throw(ThrowRequest {
            pos: Vec2::ZERO,
            dir: Direction::Right,
            owner,
            item: CollectibleType::Knife,
        });
        queue.shoot(ShotRequest {
            pos: Vec2::ZERO,
            z: 0.0,
            dir: Direction::Left,
            owner,
        });
        assert_eq!(queue.len(), 2);

        let drained = queue.drain();
        assert!(matches!(drained[0], SpawnRequest::Throw(_)));
        assert!(matches!(drained[1], SpawnRequest::Shot(_)));
        assert!(queue.is_empty());
    }
}

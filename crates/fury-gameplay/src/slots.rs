//! Attack slot allocator.
//!
//! Four engagement points surround the player. Each can be held by at most
//! one enemy; an enemy without a slot waits and asks again next tick. Slot
//! positions are recomputed from the live player position on every call.

use fury_common::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::SlotOffsets;

/// An engagement point around the player, or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Slot {
    /// No slot held
    #[default]
    None,
    /// Behind and left of the player
    TopLeft,
    /// Behind and right of the player
    TopRight,
    /// In front and left of the player
    BottomLeft,
    /// In front and right of the player
    BottomRight,
}

impl Slot {
    /// Allocation order.
    pub const PRIORITY: [Slot; 4] = [
        Slot::TopRight,
        Slot::BottomRight,
        Slot::TopLeft,
        Slot::BottomLeft,
    ];

    /// Whether this is [`Slot::None`].
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Slot::None)
    }

    const fn index(self) -> Option<usize> {
        match self {
            Slot::None => None,
            Slot::TopLeft => Some(0),
            Slot::TopRight => Some(1),
            Slot::BottomLeft => Some(2),
            Slot::BottomRight => Some(3),
        }
    }
}

/// Slot occupancy, carried by the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSlots {
    free: [bool; 4],
    offsets: SlotOffsets,
}

impl AttackSlots {
    /// All slots free.
    #[must_use]
    pub const fn new(offsets: SlotOffsets) -> Self {
        Self {
            free: [true; 4],
            offsets,
        }
    }

    /// First free slot in priority order, or [`Slot::None`].
    #[must_use]
    pub fn find_empty_slot(&self) -> Slot {
        Slot::PRIORITY
            .into_iter()
            .find(|s| self.is_free(*s))
            .unwrap_or(Slot::None)
    }

    /// Whether a slot is free. [`Slot::None`] is never free.
    #[must_use]
    pub fn is_free(&self, slot: Slot) -> bool {
        slot.index().is_some_and(|i| self.free[i])
    }

    /// Mark a free slot taken and return its world position. Returns `None`
    /// for [`Slot::None`] or a slot someone already holds.
    pub fn claim(&mut self, slot: Slot, player_pos: Vec2) -> Option<Vec2> {
        let i = slot.index()?;
        if !self.free[i] {
            return None;
        }
        self.free[i] = false;
        self.position(slot, player_pos)
    }

    /// Mark a slot free again.
    pub fn release(&mut self, slot: Slot) {
        if let Some(i) = slot.index() {
            self.free[i] = true;
        }
    }

    /// Offset of a slot from the player's feet.
    #[must_use]
    pub const fn offset(&self, slot: Slot) -> Option<Vec2> {
        match slot {
            Slot::None => None,
            Slot::TopLeft => Some(self.offsets.top_left),
            Slot::TopRight => Some(self.offsets.top_right),
            Slot::BottomLeft => Some(self.offsets.bottom_left),
            Slot::BottomRight => Some(self.offsets.bottom_right),
        }
    }

    /// World position of a slot for the player's current position.
    #[must_use]
    pub fn position(&self, slot: Slot, player_pos: Vec2) -> Option<Vec2> {
        self.offset(slot).map(|o| player_pos + o)
    }

    /// Number of held slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.free.iter().filter(|f| !**f).count()
    }
}

impl Default for AttackSlots {
    fn default() -> Self {
        Self::new(SlotOffsets::default())
    }
}

//! Per-tick context lent to every state machine.

use fury_common::EntityHandle;
use serde::{Deserialize, Serialize};

use crate::events::EventBus;
use crate::input::InputSnapshot;
use crate::level::{Camera, LevelBounds};
use crate::settings::Settings;
use crate::spawn::SpawnQueue;
use crate::sprite::SpriteCatalog;

/// Simulation clock readings for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Scaled tick delta in seconds
    pub dt: f32,
    /// Unscaled tick delta in seconds
    pub dt_real: f32,
    /// Scaled seconds since the simulation started, this tick included
    pub now: f64,
    /// Tick counter, starting at 1 for the first tick
    pub tick: u64,
}

impl SimTime {
    /// Seconds elapsed since a timestamp taken from [`SimTime::now`].
    #[must_use]
    pub fn since(&self, timestamp: f64) -> f64 {
        self.now - timestamp
    }
}

/// Everything a state machine may read or write besides its own entity and
/// its neighbours.
#[derive(Debug)]
pub struct TickContext<'a> {
    /// Tunables
    pub settings: &'a Settings,
    /// Sprite metadata, for starting animations on spawned entities
    pub sprites: &'a SpriteCatalog,
    /// Input for this tick and the previous one
    pub input: &'a InputSnapshot,
    /// Level walls, scrolled by the player's camera follow
    pub bounds: &'a mut LevelBounds,
    /// Camera, moved by the player's camera follow
    pub camera: &'a mut Camera,
    /// Deferred spawn requests
    pub spawns: &'a mut SpawnQueue,
    /// Outgoing events
    pub events: &'a EventBus,
    /// Clock readings
    pub time: SimTime,
    /// Handle of the player, if one is alive
    pub player: Option<EntityHandle>,
}

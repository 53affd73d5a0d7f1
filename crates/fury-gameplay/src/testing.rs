//! Shared fixtures for unit tests.

use fury_common::{EntityHandle, SimResult};

use crate::context::{SimTime, TickContext};
use crate::entity::{self, Entity, Neighbors, UpdateResult};
use crate::events::EventBus;
use crate::input::{InputSnapshot, InputState};
use crate::level::{Camera, LevelBounds};
use crate::settings::Settings;
use crate::spawn::SpawnQueue;
use crate::sprite::SpriteCatalog;

pub const DT: f32 = 1.0 / 60.0;
pub const LEVEL_WIDTH: f32 = 400.0;

/// Owns everything a [`TickContext`] borrows.
pub struct Harness {
    pub settings: Settings,
    pub sprites: SpriteCatalog,
    pub input: InputSnapshot,
    pub bounds: LevelBounds,
    pub camera: Camera,
    pub spawns: SpawnQueue,
    pub events: EventBus,
    pub time: SimTime,
    pub player: Option<EntityHandle>,
}

impl Harness {
    pub fn new() -> Self {
        let settings = Settings::default();
        let bounds = LevelBounds::street(&settings, LEVEL_WIDTH);
        let camera = Camera::new(&settings, LEVEL_WIDTH);
        Self {
            settings,
            sprites: SpriteCatalog::default(),
            input: InputSnapshot::default(),
            bounds,
            camera,
            spawns: SpawnQueue::new(),
            events: EventBus::default(),
            time: SimTime::default(),
            player: None,
        }
    }

    /// Advance the clock and install this tick's input.
    pub fn begin(&mut self, input: InputState) {
        self.input.current = input;
        self.time.dt = DT;
        self.time.dt_real = DT;
        self.time.now += f64::from(DT);
        self.time.tick += 1;
    }

    pub fn ctx(&mut self) -> TickContext<'_> {
        TickContext {
            settings: &self.settings,
            sprites: &self.sprites,
            input: &self.input,
            bounds: &mut self.bounds,
            camera: &mut self.camera,
            spawns: &mut self.spawns,
            events: &self.events,
            time: self.time,
            player: self.player,
        }
    }

    /// One tick for a lone entity.
    pub fn step(&mut self, entity: &mut Entity, input: InputState) -> SimResult<UpdateResult> {
        self.step_with(entity, &mut [], input)
    }

    /// One tick for `entity` with `others` around it.
    pub fn step_with(
        &mut self,
        entity: &mut Entity,
        others: &mut [Entity],
        input: InputState,
    ) -> SimResult<UpdateResult> {
        self.begin(input);
        let mut neighbors = Neighbors::new(&mut [], others);
        let mut ctx = self.ctx();
        let result = entity::update(entity, &mut neighbors, &mut ctx);
        self.input.roll_over();
        result
    }
}

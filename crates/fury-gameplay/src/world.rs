//! The simulation world and its tick.
//!
//! One tick is a single in-order pass over the live entities. Each entity
//! sees every other one through a split borrow, queues damage on them, and
//! asks for removal or new entities through deferred queues that are applied
//! only after the pass.

use fury_common::{EntityHandle, HandleGenerator, SimResult, Vec2};
use serde::Serialize;

use crate::barrel;
use crate::bullet;
use crate::collectible::{self, CollectibleType};
use crate::context::{SimTime, TickContext};
use crate::enemy::{self, EnemyInit};
use crate::entity::{self, Entity, EntityType, Neighbors, UpdateResult};
use crate::events::{EventBus, GameEvent};
use crate::input::{InputSnapshot, InputState};
use crate::level::{Camera, LevelBounds};
use crate::player;
use crate::settings::Settings;
use crate::spawn::{SpawnQueue, SpawnRequest};
use crate::sprite::SpriteCatalog;

/// Serializable view of the simulated state, for hashing and inspection.
#[derive(Debug, Serialize)]
pub struct WorldSnapshot<'a> {
    /// Ticks run so far
    pub tick: u64,
    /// Player handle, if alive
    pub player: Option<EntityHandle>,
    /// Live entities in update order
    pub entities: &'a [Entity],
    /// Camera
    pub camera: &'a Camera,
}

/// Everything the simulation owns.
#[derive(Debug)]
pub struct World {
    settings: Settings,
    sprites: SpriteCatalog,
    entities: Vec<Entity>,
    handles: HandleGenerator,
    player: Option<EntityHandle>,
    input: InputSnapshot,
    bounds: LevelBounds,
    camera: Camera,
    spawns: SpawnQueue,
    removals: Vec<usize>,
    events: EventBus,
    time: SimTime,
    draw_order: Vec<EntityHandle>,
}

impl World {
    /// Create an empty street `level_width` pixels long.
    pub fn new(settings: Settings, sprites: SpriteCatalog, level_width: f32) -> SimResult<Self> {
        settings.validate()?;
        let bounds = LevelBounds::street(&settings, level_width);
        let camera = Camera::new(&settings, level_width);
        tracing::debug!(level_width, "world created");
        Ok(Self {
            settings,
            sprites,
            entities: Vec::new(),
            handles: HandleGenerator::new(),
            player: None,
            input: InputSnapshot::default(),
            bounds,
            camera,
            spawns: SpawnQueue::new(),
            removals: Vec::new(),
            events: EventBus::default(),
            time: SimTime::default(),
            draw_order: Vec::new(),
        })
    }

    fn insert(&mut self, entity: Entity) -> EntityHandle {
        let handle = entity.handle();
        let kind = entity.entity_type();
        tracing::debug!(%handle, %kind, "entity spawned");
        self.entities.push(entity);
        self.draw_order.push(handle);
        self.events.publish(GameEvent::EntitySpawned { handle, kind });
        handle
    }

    /// Spawn the player. A second call replaces which entity enemies chase.
    pub fn spawn_player(&mut self, pos: Vec2) -> SimResult<EntityHandle> {
        let handle = self.handles.generate();
        let entity = player::spawn(handle, pos, &self.settings, &self.sprites)?;
        if let Some(previous) = self.player {
            tracing::warn!(%previous, %handle, "replacing player");
        }
        self.player = Some(handle);
        Ok(self.insert(entity))
    }

    /// Spawn an enemy.
    pub fn spawn_enemy(&mut self, init: &EnemyInit) -> SimResult<EntityHandle> {
        let handle = self.handles.generate();
        let entity = enemy::spawn(handle, init, &self.settings, &self.sprites)?;
        Ok(self.insert(entity))
    }

    /// Spawn a barrel.
    pub fn spawn_barrel(&mut self, pos: Vec2) -> SimResult<EntityHandle> {
        let handle = self.handles.generate();
        let entity = barrel::spawn(handle, pos, &self.settings, &self.sprites)?;
        Ok(self.insert(entity))
    }

    /// Place an item on the street.
    pub fn spawn_collectible(&mut self, item: CollectibleType, pos: Vec2) -> SimResult<EntityHandle> {
        let handle = self.handles.generate();
        let entity = collectible::place(handle, item, pos, &self.settings, &self.sprites)?;
        Ok(self.insert(entity))
    }

    /// Advance the simulation by one tick.
    ///
    /// `dt` is scaled gameplay time, `dt_real` unscaled wall time. An `Err`
    /// means an invariant broke and the world should not be ticked again.
    pub fn tick(&mut self, input: InputState, dt: f32, dt_real: f32) -> SimResult<()> {
        self.input.current = input;
        self.time.dt = dt;
        self.time.dt_real = dt_real;
        self.time.now += f64::from(dt);
        self.time.tick += 1;

        self.removals.clear();
        for i in 0..self.entities.len() {
            let (before, rest) = self.entities.split_at_mut(i);
            let Some((current, after)) = rest.split_first_mut() else {
                break;
            };
            let mut neighbors = Neighbors::new(before, after);
            let mut ctx = TickContext {
                settings: &self.settings,
                sprites: &self.sprites,
                input: &self.input,
                bounds: &mut self.bounds,
                camera: &mut self.camera,
                spawns: &mut self.spawns,
                events: &self.events,
                time: self.time,
                player: self.player,
            };
            if entity::update(current, &mut neighbors, &mut ctx)? == UpdateResult::RemoveMe {
                self.removals.push(i);
            }
        }

        self.remove_queued();
        self.instantiate_spawns()?;
        self.sort_draw_order();
        self.input.roll_over();
        Ok(())
    }

    /// Erase entities queued during the pass, highest index first.
    fn remove_queued(&mut self) {
        while let Some(i) = self.removals.pop() {
            let removed = self.entities.remove(i);
            let handle = removed.handle();
            let kind = removed.entity_type();
            if self.player == Some(handle) {
                self.player = None;
            }
            tracing::debug!(%handle, %kind, "entity removed");
            self.events.publish(GameEvent::EntityRemoved { handle, kind });
        }
    }

    fn instantiate_spawns(&mut self) -> SimResult<()> {
        for request in self.spawns.drain() {
            let handle = self.handles.generate();
            let entity = match &request {
                SpawnRequest::Throw(r) => {
                    collectible::spawn_thrown(handle, r, &self.settings, &self.sprites)?
                }
                SpawnRequest::Drop(r) => {
                    collectible::spawn_dropped(handle, r, &self.settings, &self.sprites)?
                }
                SpawnRequest::Shot(r) => bullet::spawn(handle, r, &self.settings, &self.sprites)?,
            };
            self.insert(entity);
        }
        Ok(())
    }

    /// Back to front by street depth. Ties keep update order.
    fn sort_draw_order(&mut self) {
        let mut order: Vec<(f32, EntityHandle)> = self
            .entities
            .iter()
            .map(|e| (e.body.pos.y, e.handle()))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.draw_order = order.into_iter().map(|(_, h)| h).collect();
    }

    /// Live entities in update order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity by handle.
    #[must_use]
    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.iter().find(|e| e.handle() == handle)
    }

    /// Entity by handle, mutably.
    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.handle() == handle)
    }

    /// Live entities of one kind.
    pub fn of_kind(&self, kind: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.entity_type() == kind)
    }

    /// The player entity, if alive.
    #[must_use]
    pub fn player(&self) -> Option<&Entity> {
        self.player.and_then(|h| self.get(h))
    }

    /// The player handle, if alive.
    #[must_use]
    pub const fn player_handle(&self) -> Option<EntityHandle> {
        self.player
    }

    /// Event bus; drain it once per tick.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Camera.
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Level walls.
    #[must_use]
    pub const fn bounds(&self) -> &LevelBounds {
        &self.bounds
    }

    /// Clock readings of the last tick.
    #[must_use]
    pub const fn time(&self) -> SimTime {
        self.time
    }

    /// Handles back to front.
    #[must_use]
    pub fn draw_order(&self) -> &[EntityHandle] {
        &self.draw_order
    }

    /// Tunables.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Input as seen by the last tick.
    #[must_use]
    pub const fn input(&self) -> &InputSnapshot {
        &self.input
    }

    /// Serializable state for hashing.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot<'_> {
        WorldSnapshot {
            tick: self.time.tick,
            player: self.player,
            entities: &self.entities,
            camera: &self.camera,
        }
    }
}

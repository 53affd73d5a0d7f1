//! Collectible state machine: knives, guns and food.
//!
//! A collectible only ever comes into existence thrown or dropped; the
//! grounded, disappearing and picked-up states are reachable only through
//! transitions.
//!
//! ```text
//! Thrown ──hit / wall / out of range──▶ removed
//! Dropped ──landed + rotation settled──▶ OnGround ──picked up──▶ PickedUp ──next tick──▶ removed
//!                                   └──▶ Disappearing ──faded──▶ removed
//! ```

use fury_common::{Direction, EntityHandle, Rect, SimResult, Vec2};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimStartOpts, Fadeout, Rotation, RotationRange};
use crate::context::TickContext;
use crate::damage::{DamageRecord, HitSeverity};
use crate::entity::{
    kind_mismatch, Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
};
use crate::movement::{self, CollideOpts};
use crate::settings::Settings;
use crate::spawn::{DropRequest, Owner, ThrowRequest};
use crate::sprite::{SpriteCatalog, SpriteKey};

/// Collectible geometry.
pub const SHAPE: BodyShape = BodyShape {
    collision_box: Rect::new(-3.0, -1.0, 6.0, 2.0),
    hurtbox: Rect::new(0.0, 0.0, 0.0, 0.0),
    hitbox: Rect::new(-4.0, -2.0, 8.0, 4.0),
    shadow: Rect::new(-3.0, -1.0, 6.0, 2.0),
};

/// Height a weapon is thrown from.
pub const THROW_HEIGHT: f32 = -12.0;
/// Height an item is dropped from.
pub const DROP_HEIGHT: f32 = -8.0;
/// Horizontal distance from the thrower's feet where a thrown weapon appears.
const THROW_OFFSET_X: f32 = 4.0;
/// Full turns a dropped item makes before it may settle.
const DROP_ROTATIONS_MIN: u32 = 1;

/// Items never collide with anything while moving.
const COLLIDE: CollideOpts = CollideOpts::new(&[
    EntityType::Player,
    EntityType::Enemy,
    EntityType::Barrel,
    EntityType::Bullet,
    EntityType::Collectible,
]);

/// Item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleType {
    /// Throwable knife
    Knife,
    /// Gun with a few shots
    Gun,
    /// Heals on pickup
    Food,
}

impl CollectibleType {
    /// Whether the player carries it after pickup.
    #[must_use]
    pub const fn is_weapon(self) -> bool {
        matches!(self, CollectibleType::Knife | CollectibleType::Gun)
    }

    /// Spin speed while dropped.
    #[must_use]
    pub const fn drop_spin(self) -> f32 {
        match self {
            CollectibleType::Knife => 2300.0,
            CollectibleType::Gun => 1200.0,
            CollectibleType::Food => 800.0,
        }
    }

    /// Spin speed while thrown; knives fly flat.
    #[must_use]
    pub const fn throw_spin(self) -> Option<f32> {
        match self {
            CollectibleType::Knife => None,
            CollectibleType::Gun => Some(1200.0),
            CollectibleType::Food => Some(1000.0),
        }
    }

    /// Resting angles after a drop by an entity facing `dir`.
    #[must_use]
    pub fn rest_range(self, dir: Direction) -> RotationRange {
        match (self, dir) {
            (CollectibleType::Knife, Direction::Left) => RotationRange::new(269.0, 271.0),
            (CollectibleType::Knife, _) => RotationRange::new(89.0, 91.0),
            (CollectibleType::Gun | CollectibleType::Food, _) => RotationRange::new(0.0, 10.0),
        }
    }
}

/// Sprite rows of a collectible sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CollectibleAnim {
    /// The item itself
    Normal,
}

impl CollectibleAnim {
    /// Frames per row.
    pub const FRAMES: [u32; 1] = [1];
}

impl From<CollectibleAnim> for u32 {
    fn from(anim: CollectibleAnim) -> Self {
        anim as u32
    }
}

/// Collectible states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleState {
    /// Flying along the thrower's facing
    Thrown,
    /// Arcing to the ground, spinning
    Dropped,
    /// Resting, possibly pickupable
    OnGround,
    /// Fading before removal
    Disappearing,
    /// Taken by the player; removed next tick
    PickedUp,
}

impl CollectibleState {
    /// State name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CollectibleState::Thrown => "thrown",
            CollectibleState::Dropped => "dropped",
            CollectibleState::OnGround => "on_ground",
            CollectibleState::Disappearing => "disappearing",
            CollectibleState::PickedUp => "picked_up",
        }
    }
}

/// Collectible payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleData {
    /// Item type
    pub item: CollectibleType,
    /// Current state
    pub state: CollectibleState,
    /// Who threw or dropped it; `None` for items placed by the level
    pub owner: Option<Owner>,
    /// Can be picked up once on the ground
    pub pickupable: bool,
    /// Fade out after landing instead of staying around
    pub instantly_disappear: bool,
    /// Shots left, for guns
    pub ammo: u32,
    /// Where a throw started
    origin_x: f32,
    /// Tick the player took it
    picked_up_tick: Option<u64>,
}

impl CollectibleData {
    fn new(item: CollectibleType, state: CollectibleState, owner: Option<Owner>) -> Self {
        Self {
            item,
            state,
            owner,
            pickupable: false,
            instantly_disappear: false,
            ammo: 0,
            origin_x: 0.0,
            picked_up_tick: None,
        }
    }

    /// Lying on the ground and free to take.
    #[must_use]
    pub fn can_be_picked_up(&self) -> bool {
        self.state == CollectibleState::OnGround && self.pickupable
    }

    /// Whether the player has taken it.
    #[must_use]
    pub fn picked_up(&self) -> bool {
        self.picked_up_tick.is_some()
    }

    /// Hand the item over. It is removed on the next tick.
    pub fn pick_up(&mut self, tick: u64) {
        self.state = CollectibleState::PickedUp;
        self.pickupable = false;
        self.picked_up_tick = Some(tick);
    }

    fn created_by_player(&self) -> bool {
        self.owner.is_some_and(|o| o.kind == EntityType::Player)
    }
}

fn new_body(
    handle: EntityHandle,
    item: CollectibleType,
    pos: Vec2,
    sprites: &SpriteCatalog,
) -> Body {
    Body::new(handle, pos, SHAPE, sprites.get(SpriteKey::Collectible(item)))
}

/// Build a weapon flying away from its thrower.
pub fn spawn_thrown(
    handle: EntityHandle,
    request: &ThrowRequest,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let sign = request.dir.x_sign();
    let pos = request.pos + Vec2::new(sign * THROW_OFFSET_X, 0.0);
    let mut body = new_body(handle, request.item, pos, sprites)
        .with_damage(settings.thrown_damage)
        .facing(request.dir);
    body.z = THROW_HEIGHT;
    body.vel = Vec2::new(sign * settings.thrown_velocity, 0.0);

    let rotation = match request.item.throw_spin() {
        Some(speed) => Rotation::new(0.0, sign * speed).looping(),
        None => Rotation::frozen(if sign < 0.0 { 270.0 } else { 90.0 }),
    };
    body.anim
        .start(AnimStartOpts::new(CollectibleAnim::Normal).looping().with_rotation(rotation))?;

    let mut data = CollectibleData::new(request.item, CollectibleState::Thrown, Some(request.owner));
    data.origin_x = pos.x;
    Ok(Entity::new(body, EntityKind::Collectible(data)))
}

/// Build an item arcing away from whoever dropped it.
pub fn spawn_dropped(
    handle: EntityHandle,
    request: &DropRequest,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let away = -request.dir.x_sign();
    let mut body = new_body(handle, request.item, request.pos, sprites).facing(request.dir);
    body.z = DROP_HEIGHT;
    body.z_vel = settings.drop_pop_velocity;
    body.vel = Vec2::new(away * settings.drop_sideways_velocity, 0.0);

    let spin = if away < 0.0 { -1.0 } else { 1.0 } * request.item.drop_spin();
    let rotation = Rotation::new(0.0, spin)
        .with_min_rotations(DROP_ROTATIONS_MIN)
        .with_finish_range(request.item.rest_range(request.dir));
    body.anim
        .start(AnimStartOpts::new(CollectibleAnim::Normal).with_rotation(rotation))?;

    let mut data = CollectibleData::new(request.item, CollectibleState::Dropped, Some(request.owner));
    data.instantly_disappear = request.instantly_disappear;
    data.ammo = request.ammo;
    Ok(Entity::new(body, EntityKind::Collectible(data)))
}

/// Build an item the level places on the street. It settles on its first
/// ticks like any other drop.
pub fn place(
    handle: EntityHandle,
    item: CollectibleType,
    pos: Vec2,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let mut body = new_body(handle, item, pos, sprites);
    body.anim.start(AnimStartOpts::new(CollectibleAnim::Normal))?;
    let mut data = CollectibleData::new(item, CollectibleState::Dropped, None);
    if item == CollectibleType::Gun {
        data.ammo = settings.gun_ammo;
    }
    Ok(Entity::new(body, EntityKind::Collectible(data)))
}

/// Run one tick.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    let Entity { body, kind } = entity;
    let EntityKind::Collectible(item) = kind else {
        return Err(kind_mismatch(body.handle, EntityType::Collectible, kind.entity_type()).into());
    };
    let settings = ctx.settings;
    let time = ctx.time;

    // Items cannot be hurt.
    body.resolve_damage(false);
    body.anim.update(time.dt, time.dt_real);

    match item.state {
        CollectibleState::Thrown => {
            let stayed = movement::apply(
                body,
                EntityType::Collectible,
                neighbors,
                ctx.bounds,
                time.dt,
                &COLLIDE.penetrating(),
            );
            if deal_thrown_damage(body, item, neighbors) {
                tracing::debug!(handle = %body.handle, item = ?item.item, "thrown item hit");
                return Ok(UpdateResult::RemoveMe);
            }
            let out_of_range = (body.pos.x - item.origin_x).abs() > settings.screen_width;
            if !stayed || out_of_range {
                return Ok(UpdateResult::RemoveMe);
            }
        }
        CollectibleState::Dropped => {
            body.apply_gravity(settings.gravity, time.dt, settings.ground_level);
            if !movement::apply(
                body,
                EntityType::Collectible,
                neighbors,
                ctx.bounds,
                time.dt,
                &COLLIDE,
            ) {
                body.vel.x = 0.0;
            }
            if body.is_grounded(settings.ground_level) {
                body.vel = Vec2::ZERO;
                if body.anim.is_finished() {
                    settle(body, item, settings)?;
                }
            }
        }
        CollectibleState::OnGround => {}
        CollectibleState::Disappearing => {
            if body.anim.is_finished() {
                return Ok(UpdateResult::RemoveMe);
            }
        }
        CollectibleState::PickedUp => {
            if item.picked_up_tick.is_some_and(|t| time.tick > t) {
                return Ok(UpdateResult::RemoveMe);
            }
        }
    }
    Ok(UpdateResult::Keep)
}

/// Landed and stopped spinning: keep the resting angle and become either
/// grounded or fading.
fn settle(body: &mut Body, item: &mut CollectibleData, settings: &Settings) -> SimResult<()> {
    let angle = body.anim.rotation_degrees();
    item.pickupable = !item.created_by_player();

    let opts = AnimStartOpts::new(CollectibleAnim::Normal)
        .looping()
        .with_rotation(Rotation::frozen(angle));
    if item.instantly_disappear {
        item.state = CollectibleState::Disappearing;
        let mut opts = opts.with_fadeout(Fadeout::new(settings.fade_rate));
        opts.looping = false;
        body.anim.start(opts)?;
    } else {
        item.state = CollectibleState::OnGround;
        body.anim.start(opts)?;
    }
    tracing::trace!(handle = %body.handle, state = item.state.name(), "collectible settled");
    Ok(())
}

/// Damage the first player or enemy in the way that did not throw the item
/// and is not on the thrower's side. Returns true on a hit.
fn deal_thrown_damage(body: &Body, item: &CollectibleData, neighbors: &mut Neighbors<'_>) -> bool {
    let hitbox = body.world_hitbox();
    let target = neighbors.iter_mut().find(|other| {
        let kind = other.entity_type();
        if !matches!(kind, EntityType::Player | EntityType::Enemy) {
            return false;
        }
        if let Some(owner) = item.owner {
            if other.handle() == owner.handle || kind == owner.kind {
                return false;
            }
        }
        other.body.world_hurtbox().intersects(&hitbox)
    });
    let Some(target) = target else {
        return false;
    };
    let source = item.owner.map_or(EntityHandle::NULL, |o| o.handle);
    target.body.damage_queue.push(DamageRecord::new(
        body.damage,
        body.dir,
        HitSeverity::Normal,
        source,
    ));
    true
}

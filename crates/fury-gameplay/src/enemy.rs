//! Enemy state machine.
//!
//! An enemy claims one of the player's attack slots, runs to it and attacks
//! from there after a cooldown. Hits stagger it, knock it down or send it
//! flying depending on severity; it dies once a hit-derived state settles
//! with no health left and gives its slot back when removed.
//!
//! ```text
//! Standing ──slot claimed──▶ Running ──arrived──▶ InPosition ──cooldown──▶ Attacking | Throwing | Shooting
//!     ▲                          ▲                     │                          │
//!     │                          └────player moved─────┘◀─────────────────────────┘
//!     └── StandingUp ◀── OnGround ◀── KnockedDown ◀── FlyingBack (wall or timeout)
//! GotHit / KnockedDown ──no health──▶ Dying ──faded──▶ removed
//! ```

use fury_common::{Direction, EntityHandle, Rect, SimResult, Vec2};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimStartOpts, Fadeout};
use crate::bullet::MUZZLE_HEIGHT;
use crate::collectible::CollectibleType;
use crate::context::TickContext;
use crate::damage::{DamageRecord, DamageSummary, HitSeverity};
use crate::entity::{
    kind_mismatch, Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
};
use crate::events::GameEvent;
use crate::movement::{self, CollideOpts, Contact};
use crate::settings::Settings;
use crate::slots::Slot;
use crate::spawn::{DropRequest, Owner, ShotRequest, ThrowRequest};
use crate::sprite::{SpriteCatalog, SpriteKey};

/// Enemy geometry.
pub const SHAPE: BodyShape = BodyShape {
    collision_box: Rect::new(-4.0, -2.0, 8.0, 3.0),
    hurtbox: Rect::new(-5.0, -30.0, 10.0, 30.0),
    hitbox: Rect::new(3.0, -24.0, 10.0, 8.0),
    shadow: Rect::new(-6.0, -1.0, 12.0, 3.0),
};

/// Enemies walk through each other, the player and items; barrels block.
const COLLIDE: CollideOpts = CollideOpts::new(&[
    EntityType::Enemy,
    EntityType::Player,
    EntityType::Collectible,
    EntityType::Bullet,
]);

/// A flying enemy tests every wall so it can bounce, without being stopped.
const FLYING_COLLIDE: CollideOpts = COLLIDE.with_walls().penetrating();

/// Muzzle distance in front of the feet.
const MUZZLE_OFFSET_X: f32 = 8.0;

/// Sprite rows of the enemy sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EnemyAnim {
    /// Idle
    Standing,
    /// Walk cycle
    Running,
    /// Melee swing
    Attacking,
    /// Knife throw
    Throwing,
    /// Gun shot
    Shooting,
    /// Stagger
    GotHit,
    /// Falling over
    KnockedDown,
    /// Lying down
    OnGround,
    /// Getting up
    StandingUp,
    /// Long knockback flight
    FlyingBack,
    /// Dead
    Dying,
}

impl EnemyAnim {
    /// Frames per row.
    pub const FRAMES: [u32; 11] = [4, 8, 4, 3, 3, 3, 4, 1, 3, 2, 1];
}

impl From<EnemyAnim> for u32 {
    fn from(anim: EnemyAnim) -> Self {
        anim as u32
    }
}

/// Enemy sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyType {
    /// Regular street thug
    #[default]
    Thug,
    /// Slower, tougher, hits harder
    Brute,
}

/// Construction options for an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyInit {
    /// Sub-type
    pub enemy_type: EnemyType,
    /// Starting health
    pub health: i32,
    /// Melee damage
    pub damage: i32,
    /// Walk speed
    pub speed: f32,
    /// Spawn position
    pub pos: Vec2,
    /// Carries one knife
    pub has_knife: bool,
    /// Never runs out of knives
    pub can_spawn_knives: bool,
    /// Carries a gun
    pub has_gun: bool,
}

impl EnemyInit {
    /// An unarmed thug with stats from `settings`.
    #[must_use]
    pub fn new(pos: Vec2, settings: &Settings) -> Self {
        Self {
            enemy_type: EnemyType::Thug,
            health: settings.enemy_health,
            damage: settings.enemy_damage,
            speed: settings.enemy_speed,
            pos,
            has_knife: false,
            can_spawn_knives: false,
            has_gun: false,
        }
    }

    /// An unarmed brute: double health, half again the damage, slower.
    #[must_use]
    pub fn brute(pos: Vec2, settings: &Settings) -> Self {
        Self {
            enemy_type: EnemyType::Brute,
            health: settings.enemy_health * 2,
            damage: settings.enemy_damage + settings.enemy_damage / 2,
            speed: settings.enemy_speed * 0.75,
            ..Self::new(pos, settings)
        }
    }

    /// Builder: carry a knife.
    #[must_use]
    pub fn with_knife(mut self) -> Self {
        self.has_knife = true;
        self
    }

    /// Builder: throw knives forever.
    #[must_use]
    pub fn spawning_knives(mut self) -> Self {
        self.has_knife = true;
        self.can_spawn_knives = true;
        self
    }

    /// Builder: carry a gun.
    #[must_use]
    pub fn with_gun(mut self) -> Self {
        self.has_gun = true;
        self
    }
}

/// Enemy states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// Idle, looking for a slot
    #[default]
    Standing,
    /// Heading to its slot
    Running,
    /// At its slot, waiting out the cooldown
    InPosition,
    /// Melee swing
    Attacking,
    /// Knife throw
    Throwing,
    /// Gun shot
    Shooting,
    /// Staggered by a normal hit
    GotHit,
    /// Falling after a knockdown hit
    KnockedDown,
    /// Flying back after a power hit
    FlyingBack,
    /// Lying on the ground
    OnGround,
    /// Getting up
    StandingUp,
    /// Fading out
    Dying,
}

impl EnemyState {
    /// State name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EnemyState::Standing => "standing",
            EnemyState::Running => "running",
            EnemyState::InPosition => "in_position",
            EnemyState::Attacking => "attacking",
            EnemyState::Throwing => "throwing",
            EnemyState::Shooting => "shooting",
            EnemyState::GotHit => "got_hit",
            EnemyState::KnockedDown => "knocked_down",
            EnemyState::FlyingBack => "flying_back",
            EnemyState::OnGround => "on_ground",
            EnemyState::StandingUp => "standing_up",
            EnemyState::Dying => "dying",
        }
    }

    /// Hits are applied in this state; otherwise they are discarded.
    #[must_use]
    pub const fn is_receptive(self) -> bool {
        matches!(
            self,
            EnemyState::Standing
                | EnemyState::Running
                | EnemyState::InPosition
                | EnemyState::Attacking
                | EnemyState::Throwing
                | EnemyState::Shooting
        )
    }

    /// The enemy may walk in this state.
    #[must_use]
    pub const fn can_move(self) -> bool {
        matches!(self, EnemyState::Standing | EnemyState::Running)
    }
}

/// Enemy payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Sub-type
    pub enemy_type: EnemyType,
    /// Current state
    pub state: EnemyState,
    /// Attack slot held, if any
    pub slot: Slot,
    /// Player whose slot table `slot` belongs to
    pub slot_owner: Option<EntityHandle>,
    /// Slot position as of this tick
    pub target: Vec2,
    /// Earliest time the next attack may start
    pub ready_at: f64,
    /// Time the current state was entered
    pub state_since: f64,
    /// The current swing already connected
    pub hit_landed: bool,
    /// Entities already hit during the current flight
    pub collateral: Vec<EntityHandle>,
    /// Carries a knife
    pub has_knife: bool,
    /// Never runs out of knives
    pub can_spawn_knives: bool,
    /// Carries a gun
    pub has_gun: bool,
}

impl EnemyData {
    fn new(init: &EnemyInit) -> Self {
        Self {
            enemy_type: init.enemy_type,
            state: EnemyState::Standing,
            slot: Slot::None,
            slot_owner: None,
            target: init.pos,
            ready_at: 0.0,
            state_since: 0.0,
            hit_landed: false,
            collateral: Vec::new(),
            has_knife: init.has_knife,
            can_spawn_knives: init.can_spawn_knives,
            has_gun: init.has_gun,
        }
    }
}

/// Build an enemy from `init`.
pub fn spawn(
    handle: EntityHandle,
    init: &EnemyInit,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let mut body = Body::new(handle, init.pos, SHAPE, sprites.get(SpriteKey::Enemy))
        .with_health(init.health)
        .with_damage(init.damage)
        .with_speed(init.speed)
        .facing(Direction::Left);
    body.anim.start(anim_for(EnemyState::Standing, settings))?;
    Ok(Entity::new(body, EntityKind::Enemy(EnemyData::new(init))))
}

fn anim_for(state: EnemyState, settings: &Settings) -> AnimStartOpts {
    match state {
        EnemyState::Standing | EnemyState::InPosition => {
            AnimStartOpts::new(EnemyAnim::Standing).looping()
        }
        EnemyState::Running => AnimStartOpts::new(EnemyAnim::Running).looping(),
        EnemyState::Attacking => AnimStartOpts::new(EnemyAnim::Attacking),
        EnemyState::Throwing => AnimStartOpts::new(EnemyAnim::Throwing),
        EnemyState::Shooting => AnimStartOpts::new(EnemyAnim::Shooting),
        EnemyState::GotHit => AnimStartOpts::new(EnemyAnim::GotHit),
        EnemyState::KnockedDown => AnimStartOpts::new(EnemyAnim::KnockedDown),
        EnemyState::FlyingBack => AnimStartOpts::new(EnemyAnim::FlyingBack).looping(),
        EnemyState::OnGround => AnimStartOpts::new(EnemyAnim::OnGround).looping(),
        EnemyState::StandingUp => AnimStartOpts::new(EnemyAnim::StandingUp),
        EnemyState::Dying => {
            AnimStartOpts::new(EnemyAnim::Dying).with_fadeout(Fadeout::new(settings.fade_rate))
        }
    }
}

fn enter(
    body: &mut Body,
    enemy: &mut EnemyData,
    state: EnemyState,
    ctx: &TickContext<'_>,
) -> SimResult<()> {
    tracing::trace!(
        handle = %body.handle,
        from = enemy.state.name(),
        to = state.name(),
        "enemy state"
    );
    enemy.state = state;
    enemy.state_since = ctx.time.now;
    body.anim.start(anim_for(state, ctx.settings))?;
    Ok(())
}

/// Run one tick.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    let Entity { body, kind } = entity;
    let EntityKind::Enemy(enemy) = kind else {
        return Err(kind_mismatch(body.handle, EntityType::Enemy, kind.entity_type()).into());
    };

    body.anim.update(ctx.time.dt, ctx.time.dt_real);

    if let Some(hit) = body.resolve_damage(enemy.state.is_receptive()) {
        ctx.events.publish(GameEvent::EntityDamaged {
            handle: body.handle,
            amount: hit.total,
            severity: hit.severity,
            remaining_health: body.health,
        });
        take_hit(body, enemy, &hit, ctx)?;
    }

    match enemy.state {
        EnemyState::Standing | EnemyState::Running | EnemyState::InPosition => {
            engage(body, enemy, neighbors, ctx)?;
        }
        EnemyState::Attacking => {
            if !enemy.hit_landed {
                enemy.hit_landed = strike_player(body, neighbors, ctx);
            }
            finish_attack(body, enemy, ctx)?;
        }
        EnemyState::Throwing | EnemyState::Shooting => finish_attack(body, enemy, ctx)?,
        EnemyState::GotHit => {
            movement::apply(body, EntityType::Enemy, neighbors, ctx.bounds, ctx.time.dt, &COLLIDE);
            if body.anim.is_finished() {
                body.vel = Vec2::ZERO;
                recover_or_die(body, enemy, EnemyState::Standing, ctx)?;
            }
        }
        EnemyState::KnockedDown => {
            body.apply_gravity(ctx.settings.gravity, ctx.time.dt, ctx.settings.ground_level);
            movement::apply(body, EntityType::Enemy, neighbors, ctx.bounds, ctx.time.dt, &COLLIDE);
            if body.is_grounded(ctx.settings.ground_level) {
                body.vel = Vec2::ZERO;
                if body.anim.is_finished() {
                    recover_or_die(body, enemy, EnemyState::OnGround, ctx)?;
                }
            }
        }
        EnemyState::FlyingBack => fly_back(body, enemy, neighbors, ctx)?,
        EnemyState::OnGround => {
            let down_for = ctx.time.since(enemy.state_since);
            if down_for >= f64::from(ctx.settings.on_ground_duration) {
                enter(body, enemy, EnemyState::StandingUp, ctx)?;
            }
        }
        EnemyState::StandingUp => {
            if body.anim.is_finished() {
                enter(body, enemy, EnemyState::Standing, ctx)?;
            }
        }
        EnemyState::Dying => {
            if body.anim.is_finished() {
                release_slot(body.handle, enemy, neighbors, ctx);
                return Ok(UpdateResult::RemoveMe);
            }
        }
    }
    Ok(UpdateResult::Keep)
}

/// Pick the hit state for the decisive severity.
fn take_hit(
    body: &mut Body,
    enemy: &mut EnemyData,
    hit: &DamageSummary,
    ctx: &mut TickContext<'_>,
) -> SimResult<()> {
    body.dir = hit.direction.flipped_x();
    body.vel = Vec2::new(hit.knockback_x(ctx.settings), 0.0);

    match hit.severity {
        HitSeverity::Normal => enter(body, enemy, EnemyState::GotHit, ctx),
        HitSeverity::Knockdown => {
            body.z_vel = ctx.settings.knockdown_pop_velocity;
            drop_weapons(body, enemy, ctx);
            enter(body, enemy, EnemyState::KnockedDown, ctx)
        }
        HitSeverity::Power => {
            enemy.collateral.clear();
            drop_weapons(body, enemy, ctx);
            enter(body, enemy, EnemyState::FlyingBack, ctx)
        }
    }
}

fn recover_or_die(
    body: &mut Body,
    enemy: &mut EnemyData,
    recovered: EnemyState,
    ctx: &TickContext<'_>,
) -> SimResult<()> {
    if body.health > 0 {
        return enter(body, enemy, recovered, ctx);
    }
    tracing::debug!(handle = %body.handle, "enemy died");
    ctx.events.publish(GameEvent::EntityDied {
        handle: body.handle,
        kind: EntityType::Enemy,
    });
    enter(body, enemy, EnemyState::Dying, ctx)
}

fn drop_weapons(body: &Body, enemy: &mut EnemyData, ctx: &mut TickContext<'_>) {
    let owner = Owner::new(body.handle, EntityType::Enemy);
    let mut drop_item = |item, ammo| {
        ctx.spawns.drop_item(DropRequest {
            pos: body.pos,
            dir: body.dir,
            owner,
            item,
            instantly_disappear: false,
            ammo,
        });
    };
    if enemy.has_gun {
        drop_item(CollectibleType::Gun, ctx.settings.gun_ammo);
        enemy.has_gun = false;
    }
    if enemy.has_knife {
        drop_item(CollectibleType::Knife, 0);
        enemy.has_knife = false;
        enemy.can_spawn_knives = false;
    }
}

/// Claim a slot, walk to it and attack from it once the cooldown is over.
fn engage(
    body: &mut Body,
    enemy: &mut EnemyData,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<()> {
    if !enemy.slot.is_none() && enemy.slot_owner != ctx.player {
        // The player was replaced; the old claim is void.
        release_slot(body.handle, enemy, neighbors, ctx);
    }
    let Some(player) = ctx.player.and_then(|h| neighbors.find_mut(h)) else {
        // Nobody to fight: the slot table went with the player.
        enemy.slot = Slot::None;
        enemy.slot_owner = None;
        body.vel = Vec2::ZERO;
        if enemy.state != EnemyState::Standing {
            enter(body, enemy, EnemyState::Standing, ctx)?;
        }
        return Ok(());
    };
    let player_pos = player.body.pos;
    let Some(player_data) = player.as_player_mut() else {
        return Ok(());
    };

    if enemy.slot.is_none() {
        let slot = player_data.slots.find_empty_slot();
        let Some(target) = player_data.slots.claim(slot, player_pos) else {
            // Every slot is taken; ask again next tick.
            body.vel = Vec2::ZERO;
            body.face_towards(player_pos.x);
            return Ok(());
        };
        enemy.slot = slot;
        enemy.slot_owner = ctx.player;
        enemy.target = target;
        tracing::debug!(handle = %body.handle, ?slot, "slot claimed");
        ctx.events.publish(GameEvent::SlotClaimed {
            enemy: body.handle,
            slot,
        });
    }
    if let Some(target) = player_data.slots.position(enemy.slot, player_pos) {
        enemy.target = target;
    }

    let to_target = enemy.target - body.pos;
    let distance = to_target.length();
    let arrived = distance <= ctx.settings.slot_arrival_threshold;

    match (enemy.state, arrived) {
        (EnemyState::Standing | EnemyState::Running, true) => {
            body.vel = Vec2::ZERO;
            body.face_towards(player_pos.x);
            enemy.ready_at = ctx.time.now + f64::from(ctx.settings.enemy_attack_cooldown);
            enter(body, enemy, EnemyState::InPosition, ctx)?;
        }
        (EnemyState::Standing | EnemyState::InPosition, false) => {
            enter(body, enemy, EnemyState::Running, ctx)?;
        }
        (EnemyState::InPosition, true) => {
            body.face_towards(player_pos.x);
            if ctx.time.now >= enemy.ready_at {
                start_attack(body, enemy, ctx)?;
            }
        }
        _ => {}
    }
    if !arrived && enemy.state.can_move() {
        run_towards(body, to_target, distance, neighbors, ctx);
    }
    Ok(())
}

fn run_towards(
    body: &mut Body,
    to_target: Vec2,
    distance: f32,
    neighbors: &Neighbors<'_>,
    ctx: &TickContext<'_>,
) {
    let dt = ctx.time.dt;
    // Never overshoot the slot in one step.
    let speed = if dt > 0.0 {
        body.speed.min(distance / dt)
    } else {
        body.speed
    };
    body.vel = to_target.normalized() * speed;
    body.face_towards(body.pos.x + to_target.x);
    movement::apply(body, EntityType::Enemy, neighbors, ctx.bounds, dt, &COLLIDE);
}

fn start_attack(
    body: &mut Body,
    enemy: &mut EnemyData,
    ctx: &mut TickContext<'_>,
) -> SimResult<()> {
    let owner = Owner::new(body.handle, EntityType::Enemy);
    if enemy.has_gun {
        ctx.spawns.shoot(ShotRequest {
            pos: body.pos + Vec2::new(body.dir.x_sign() * MUZZLE_OFFSET_X, 0.0),
            z: MUZZLE_HEIGHT,
            dir: body.dir,
            owner,
        });
        return enter(body, enemy, EnemyState::Shooting, ctx);
    }
    if enemy.has_knife {
        ctx.spawns.throw(ThrowRequest {
            pos: body.pos,
            dir: body.dir,
            owner,
            item: CollectibleType::Knife,
        });
        enemy.has_knife = enemy.can_spawn_knives;
        return enter(body, enemy, EnemyState::Throwing, ctx);
    }
    enemy.hit_landed = false;
    enter(body, enemy, EnemyState::Attacking, ctx)
}

fn finish_attack(body: &mut Body, enemy: &mut EnemyData, ctx: &TickContext<'_>) -> SimResult<()> {
    if body.anim.is_finished() {
        enemy.ready_at = ctx.time.now + f64::from(ctx.settings.enemy_attack_cooldown);
        enter(body, enemy, EnemyState::InPosition, ctx)?;
    }
    Ok(())
}

/// Queue a melee hit on the player if the hitbox reaches. Returns true on
/// contact.
fn strike_player(body: &Body, neighbors: &mut Neighbors<'_>, ctx: &TickContext<'_>) -> bool {
    let Some(player) = ctx.player.and_then(|h| neighbors.find_mut(h)) else {
        return false;
    };
    if !body.world_hitbox().intersects(&player.body.world_hurtbox()) {
        return false;
    }
    player.body.damage_queue.push(DamageRecord::new(
        body.damage,
        body.dir,
        HitSeverity::Normal,
        body.handle,
    ));
    true
}

fn fly_back(
    body: &mut Body,
    enemy: &mut EnemyData,
    neighbors: &mut Neighbors<'_>,
    ctx: &TickContext<'_>,
) -> SimResult<()> {
    let settings = ctx.settings;
    body.apply_gravity(settings.gravity, ctx.time.dt, settings.ground_level);
    let contact = movement::apply_with_contact(
        body,
        EntityType::Enemy,
        neighbors,
        ctx.bounds,
        ctx.time.dt,
        &FLYING_COLLIDE,
    );
    hit_collateral(body, enemy, neighbors, settings);

    let bounce = settings.wall_bounce_factor;
    if let Some(Contact::Wall(border)) = contact {
        tracing::trace!(handle = %body.handle, ?border, "enemy bounced off wall");
        body.vel.x = -body.vel.x * bounce;
        body.z_vel = settings.knockdown_pop_velocity * bounce;
        return enter(body, enemy, EnemyState::KnockedDown, ctx);
    }
    if ctx.time.since(enemy.state_since) >= f64::from(settings.flying_back_duration) {
        body.vel.x *= bounce;
        body.z_vel = settings.knockdown_pop_velocity * bounce;
        return enter(body, enemy, EnemyState::KnockedDown, ctx);
    }
    Ok(())
}

/// Knock down every enemy and barrel the flying body passes, once each.
///
/// The player is never struck by a flying body.
fn hit_collateral(
    body: &Body,
    enemy: &mut EnemyData,
    neighbors: &mut Neighbors<'_>,
    settings: &Settings,
) {
    let hurtbox = body.world_hurtbox();
    let dir = if body.vel.x < 0.0 {
        Direction::Left
    } else {
        Direction::Right
    };
    for other in neighbors.iter_mut() {
        if !matches!(other.entity_type(), EntityType::Enemy | EntityType::Barrel)
            || enemy.collateral.contains(&other.handle())
            || !other.body.world_hurtbox().intersects(&hurtbox)
        {
            continue;
        }
        enemy.collateral.push(other.handle());
        other.body.damage_queue.push(DamageRecord::new(
            settings.flying_back_collateral_damage,
            dir,
            HitSeverity::Knockdown,
            body.handle,
        ));
    }
}

fn release_slot(
    handle: EntityHandle,
    enemy: &mut EnemyData,
    neighbors: &mut Neighbors<'_>,
    ctx: &TickContext<'_>,
) {
    let slot = std::mem::take(&mut enemy.slot);
    let owner = enemy.slot_owner.take();
    if slot.is_none() {
        return;
    }
    let slots = owner
        .and_then(|h| neighbors.find_mut(h))
        .and_then(Entity::as_player_mut)
        .map(|p| &mut p.slots);
    if let Some(slots) = slots {
        slots.release(slot);
        tracing::debug!(%handle, ?slot, "slot released");
        ctx.events.publish(GameEvent::SlotReleased {
            enemy: handle,
            slot,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputState;
    use crate::testing::Harness;

    fn enemy_at(h: &Harness, raw: u64, x: f32) -> Entity {
        spawn(
            EntityHandle::from_raw(raw),
            &EnemyInit::new(Vec2::new(x, 50.0), &h.settings),
            &h.settings,
            &h.sprites,
        )
        .expect("enemy")
    }

    fn player_at(h: &mut Harness, x: f32) -> Entity {
        let handle = EntityHandle::from_raw(100);
        h.player = Some(handle);
        crate::player::spawn(handle, Vec2::new(x, 50.0), &h.settings, &h.sprites).expect("player")
    }

    fn state(e: &Entity) -> EnemyState {
        e.as_enemy().map(|d| d.state).expect("enemy")
    }

    fn hit(amount: i32, severity: HitSeverity, direction: Direction) -> DamageRecord {
        DamageRecord::new(amount, direction, severity, EntityHandle::from_raw(100))
    }

    #[test]
    fn test_normal_hit_staggers_then_recovers() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 80.0);
        e.body.damage_queue.push(hit(5, HitSeverity::Normal, Direction::Right));
        h.step(&mut e, InputState::IDLE).expect("tick");

        assert_eq!(state(&e), EnemyState::GotHit);
        assert_eq!(e.body.dir, Direction::Left);
        assert!(e.body.vel.x > 0.0);
        assert_eq!(e.body.health, h.settings.enemy_health - 5);

        for _ in 0..60 {
            h.step(&mut e, InputState::IDLE).expect("tick");
        }
        assert_eq!(state(&e), EnemyState::Standing);
    }

    #[test]
    fn test_knockdown_chain_to_on_ground() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 80.0);
        e.body.damage_queue.push(hit(5, HitSeverity::Knockdown, Direction::Left));
        h.step(&mut e, InputState::IDLE).expect("tick");

        assert_eq!(state(&e), EnemyState::KnockedDown);
        assert!(e.body.z_vel != 0.0);

        let mut ticks = 0;
        while state(&e) == EnemyState::KnockedDown {
            ticks += 1;
            assert!(ticks < 600, "never got up");
            h.step(&mut e, InputState::IDLE).expect("tick");
        }
        assert_eq!(state(&e), EnemyState::OnGround);
        assert_eq!(e.body.z_vel, 0.0);
        assert_eq!(e.body.z, 0.0);

        while state(&e) != EnemyState::Standing {
            ticks += 1;
            assert!(ticks < 600, "never stood up");
            h.step(&mut e, InputState::IDLE).expect("tick");
        }
    }

    #[test]
    fn test_lethal_knockdown_dies_and_is_removed() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 80.0);
        e.body.damage_queue.push(hit(100, HitSeverity::Knockdown, Direction::Left));

        let mut ticks = 0;
        let mut seen_dying = false;
        loop {
            ticks += 1;
            assert!(ticks < 600, "never removed");
            let result = h.step(&mut e, InputState::IDLE).expect("tick");
            if state(&e) == EnemyState::Dying {
                seen_dying = true;
            }
            if result == UpdateResult::RemoveMe {
                break;
            }
        }
        assert!(seen_dying);
        assert!(h
            .events
            .drain()
            .iter()
            .any(|ev| matches!(ev, GameEvent::EntityDied { kind: EntityType::Enemy, .. })));
    }

    #[test]
    fn test_hits_discarded_while_down() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 80.0);
        e.body.damage_queue.push(hit(5, HitSeverity::Knockdown, Direction::Left));
        h.step(&mut e, InputState::IDLE).expect("tick");
        let health = e.body.health;

        e.body.damage_queue.push(hit(5, HitSeverity::Normal, Direction::Left));
        h.step(&mut e, InputState::IDLE).expect("tick");
        assert_eq!(e.body.health, health);
        assert!(e.body.damage_queue.is_empty());
        assert_eq!(state(&e), EnemyState::KnockedDown);
    }

    #[test]
    fn test_knockdown_drops_weapons() {
        let mut h = Harness::new();
        let init = EnemyInit::new(Vec2::new(80.0, 50.0), &h.settings).with_knife();
        let mut e = spawn(EntityHandle::from_raw(1), &init, &h.settings, &h.sprites).expect("enemy");
        e.body.damage_queue.push(hit(5, HitSeverity::Knockdown, Direction::Left));
        h.step(&mut e, InputState::IDLE).expect("tick");

        assert!(!e.as_enemy().expect("enemy").has_knife);
        assert_eq!(h.spawns.len(), 1);
    }

    #[test]
    fn test_flying_back_bounces_off_wall() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 10.0);
        e.body.damage_queue.push(hit(5, HitSeverity::Power, Direction::Left));
        h.step(&mut e, InputState::IDLE).expect("tick");
        assert_eq!(state(&e), EnemyState::FlyingBack);
        assert!(e.body.vel.x < 0.0);

        let mut ticks = 0;
        while state(&e) == EnemyState::FlyingBack {
            ticks += 1;
            assert!(ticks < 60, "never hit the wall");
            h.step(&mut e, InputState::IDLE).expect("tick");
        }
        assert_eq!(state(&e), EnemyState::KnockedDown);
        assert!(e.body.vel.x > 0.0);
    }

    #[test]
    fn test_flying_back_hits_collateral_once() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 60.0);
        let barrel = crate::barrel::spawn(
            EntityHandle::from_raw(2),
            Vec2::new(75.0, 50.0),
            &h.settings,
            &h.sprites,
        )
        .expect("barrel");
        let mut others = vec![barrel];
        e.body.damage_queue.push(hit(5, HitSeverity::Power, Direction::Right));

        for _ in 0..30 {
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
        }
        let records: Vec<_> = others[0].body.damage_queue.iter().copied().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, HitSeverity::Knockdown);
        assert_eq!(records[0].amount, h.settings.flying_back_collateral_damage);
    }

    #[test]
    fn test_flying_back_spares_player() {
        let mut h = Harness::new();
        let mut e = enemy_at(&h, 1, 60.0);
        let barrel = crate::barrel::spawn(
            EntityHandle::from_raw(2),
            Vec2::new(75.0, 50.0),
            &h.settings,
            &h.sprites,
        )
        .expect("barrel");
        let bystander =
            crate::player::spawn(EntityHandle::from_raw(3), Vec2::new(75.0, 50.0), &h.settings, &h.sprites)
                .expect("player");
        let mut others = vec![barrel, bystander];
        e.body.damage_queue.push(hit(5, HitSeverity::Power, Direction::Right));

        for _ in 0..30 {
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
        }
        assert_eq!(others[0].body.damage_queue.iter().count(), 1);
        assert!(others[1].body.damage_queue.is_empty());
    }

    #[test]
    fn test_claims_slot_runs_and_attacks() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        let mut e = enemy_at(&h, 1, 140.0);

        h.step_with(&mut e, &mut others, InputState::IDLE)
            .expect("tick");
        assert_eq!(e.as_enemy().map(|d| d.slot), Some(Slot::TopRight));
        assert_eq!(state(&e), EnemyState::Running);
        let slots = &others[0].as_player().expect("player").slots;
        assert!(!slots.is_free(Slot::TopRight));

        let mut ticks = 0;
        while others[0].body.damage_queue.is_empty() {
            ticks += 1;
            assert!(ticks < 600, "never attacked");
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
        }
        let target = Vec2::new(100.0, 50.0) + h.settings.slot_offsets.top_right;
        assert!(e.body.pos.distance(target) <= h.settings.slot_arrival_threshold);
        assert_eq!(e.body.dir, Direction::Left);
        let record = others[0].body.damage_queue.iter().next().copied().expect("hit");
        assert_eq!(record.source, EntityHandle::from_raw(1));
        assert_eq!(record.direction, Direction::Left);
    }

    #[test]
    fn test_waits_without_free_slot() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        if let Some(p) = others[0].as_player_mut() {
            for slot in Slot::PRIORITY {
                p.slots.claim(slot, Vec2::new(100.0, 50.0));
            }
        }
        let mut e = enemy_at(&h, 1, 140.0);
        for _ in 0..10 {
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
        }
        assert_eq!(state(&e), EnemyState::Standing);
        assert_eq!(e.as_enemy().map(|d| d.slot), Some(Slot::None));
        assert_eq!(e.body.pos, Vec2::new(140.0, 50.0));
    }

    #[test]
    fn test_armed_enemy_throws_instead_of_swinging() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        let target = Vec2::new(100.0, 50.0) + h.settings.slot_offsets.top_right;
        let init = EnemyInit::new(target, &h.settings).with_knife();
        let mut e = spawn(EntityHandle::from_raw(1), &init, &h.settings, &h.sprites).expect("enemy");

        let mut ticks = 0;
        while state(&e) != EnemyState::Throwing {
            ticks += 1;
            assert!(ticks < 300, "never threw");
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
        }
        assert!(!e.as_enemy().expect("enemy").has_knife);
        assert_eq!(h.spawns.len(), 1);
    }

    #[test]
    fn test_replaced_player_voids_old_claim() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        let mut e = enemy_at(&h, 1, 140.0);
        h.step_with(&mut e, &mut others, InputState::IDLE)
            .expect("tick");
        assert_eq!(e.as_enemy().and_then(|d| d.slot_owner), Some(EntityHandle::from_raw(100)));

        let next = EntityHandle::from_raw(101);
        h.player = Some(next);
        let mut second =
            crate::player::spawn(next, Vec2::new(100.0, 50.0), &h.settings, &h.sprites).expect("player");
        if let Some(p) = second.as_player_mut() {
            p.slots.claim(Slot::TopRight, Vec2::new(100.0, 50.0));
        }
        others.push(second);
        h.step_with(&mut e, &mut others, InputState::IDLE)
            .expect("tick");

        let enemy = e.as_enemy().expect("enemy");
        assert_eq!(enemy.slot_owner, Some(next));
        assert_ne!(enemy.slot, Slot::TopRight);
        assert!(!enemy.slot.is_none());
        assert_eq!(others[0].as_player().expect("player").slots.occupied(), 0);
        assert_eq!(others[1].as_player().expect("player").slots.occupied(), 2);
    }

    #[test]
    fn test_only_moves_in_moving_states() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        let mut e = enemy_at(&h, 1, 140.0);
        let mut last = e.body.pos;
        let mut held_still = 0;
        for _ in 0..300 {
            h.step_with(&mut e, &mut others, InputState::IDLE)
                .expect("tick");
            let s = state(&e);
            if !s.can_move() {
                assert_eq!(e.body.pos, last, "moved while {s:?}");
                held_still += 1;
            }
            last = e.body.pos;
        }
        assert!(held_still > 0);
    }

    #[test]
    fn test_dying_releases_slot() {
        let mut h = Harness::new();
        let mut others = vec![player_at(&mut h, 100.0)];
        let mut e = enemy_at(&h, 1, 140.0);
        h.step_with(&mut e, &mut others, InputState::IDLE)
            .expect("tick");
        assert_eq!(others[0].as_player().expect("player").slots.occupied(), 1);

        e.body.damage_queue.push(hit(100, HitSeverity::Normal, Direction::Right));
        let mut ticks = 0;
        while h
            .step_with(&mut e, &mut others, InputState::IDLE)
            .expect("tick")
            == UpdateResult::Keep
        {
            ticks += 1;
            assert!(ticks < 600, "never removed");
        }
        assert_eq!(others[0].as_player().expect("player").slots.occupied(), 0);
    }
}

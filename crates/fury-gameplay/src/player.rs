//! Player state machine.
//!
//! Input drives the player between standing, running, a four-step melee
//! combo, a jump arc with an optional drop kick, weapon use and item pickup.
//! The player also carries the attack slot table enemies allocate from and
//! drags the camera along as it walks right.

use fury_common::{Direction, EntityHandle, Rect, SimResult, Vec2};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimStartOpts, Fadeout};
use crate::bullet::MUZZLE_HEIGHT;
use crate::collectible::{CollectibleData, CollectibleType};
use crate::context::TickContext;
use crate::damage::{DamageRecord, DamageSummary, HitSeverity};
use crate::entity::{
    kind_mismatch, Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
};
use crate::events::GameEvent;
use crate::input::Action;
use crate::movement::{self, CollideOpts};
use crate::settings::Settings;
use crate::slots::AttackSlots;
use crate::spawn::{DropRequest, Owner, ShotRequest, ThrowRequest};
use crate::sprite::{SpriteCatalog, SpriteKey};

/// Player geometry.
pub const SHAPE: BodyShape = BodyShape {
    collision_box: Rect::new(-4.0, -2.0, 8.0, 3.0),
    hurtbox: Rect::new(-5.0, -30.0, 10.0, 30.0),
    hitbox: Rect::new(4.0, -24.0, 12.0, 8.0),
    shadow: Rect::new(-6.0, -1.0, 12.0, 3.0),
};

/// The player is blocked by walls and barrels only.
const COLLIDE: CollideOpts = CollideOpts::new(&[
    EntityType::Enemy,
    EntityType::Collectible,
    EntityType::Bullet,
]);

/// Muzzle distance in front of the feet.
const MUZZLE_OFFSET_X: f32 = 10.0;

/// Sprite rows of the player sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PlayerAnim {
    /// Idle
    Standing,
    /// Walk cycle
    Running,
    /// Combo step 1
    PunchingLeft,
    /// Combo step 2
    PunchingRight,
    /// Combo step 3
    KickingLeft,
    /// Combo step 4
    KickingRight,
    /// Airborne kick
    KickingDrop,
    /// Stagger
    GotHit,
    /// Falling dead
    Dying,
    /// Crouch before a jump
    Takeoff,
    /// In the air
    Jumping,
    /// Touching down
    Landing,
    /// Bending for an item
    PickingUp,
    /// Knife throw
    Throwing,
    /// Gun shot
    Shooting,
}

impl PlayerAnim {
    /// Frames per row.
    pub const FRAMES: [u32; 15] = [4, 8, 4, 3, 6, 6, 5, 3, 3, 2, 2, 2, 3, 3, 3];
}

impl From<PlayerAnim> for u32 {
    fn from(anim: PlayerAnim) -> Self {
        anim as u32
    }
}

/// Melee combo: animation and severity of each step. The last step knocks
/// down.
pub const COMBO: [(PlayerAnim, HitSeverity); 4] = [
    (PlayerAnim::PunchingLeft, HitSeverity::Normal),
    (PlayerAnim::PunchingRight, HitSeverity::Normal),
    (PlayerAnim::KickingLeft, HitSeverity::Normal),
    (PlayerAnim::KickingRight, HitSeverity::Knockdown),
];

/// Player states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    /// Idle
    #[default]
    Standing,
    /// Moving on the street
    Running,
    /// Mid combo step
    Attacking,
    /// Crouching before a jump
    Takeoff,
    /// In the air
    Jumping,
    /// Drop kick in the air
    KickingDrop,
    /// Touching down
    Landing,
    /// Staggered
    GotHit,
    /// Dead, fading out
    Dying,
    /// Taking an item
    PickingUp,
    /// Throwing a knife
    Throwing,
    /// Firing a gun
    Shooting,
}

impl PlayerState {
    /// State name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            PlayerState::Standing => "standing",
            PlayerState::Running => "running",
            PlayerState::Attacking => "attacking",
            PlayerState::Takeoff => "takeoff",
            PlayerState::Jumping => "jumping",
            PlayerState::KickingDrop => "kicking_drop",
            PlayerState::Landing => "landing",
            PlayerState::GotHit => "got_hit",
            PlayerState::Dying => "dying",
            PlayerState::PickingUp => "picking_up",
            PlayerState::Throwing => "throwing",
            PlayerState::Shooting => "shooting",
        }
    }

    /// Hits are applied in this state; otherwise they are discarded.
    #[must_use]
    pub const fn is_receptive(self) -> bool {
        matches!(
            self,
            PlayerState::Standing
                | PlayerState::Running
                | PlayerState::Attacking
                | PlayerState::PickingUp
                | PlayerState::Throwing
                | PlayerState::Shooting
        )
    }

    /// Input is read in this state.
    #[must_use]
    pub const fn can_act(self) -> bool {
        matches!(self, PlayerState::Standing | PlayerState::Running)
    }

    /// Off the ground.
    #[must_use]
    pub const fn is_airborne(self) -> bool {
        matches!(self, PlayerState::Jumping | PlayerState::KickingDrop)
    }
}

/// Weapon in the player's hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeldWeapon {
    /// Thrown on attack
    Knife,
    /// Fires on attack until out of ammo
    Gun {
        /// Shots left
        ammo: u32,
    },
}

/// Player payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    /// Current state
    pub state: PlayerState,
    /// Next combo step, `0..COMBO.len()`
    pub combo: usize,
    /// Time the last combo step started
    pub last_attack_at: f64,
    /// Severity of the swing in progress
    pub attack_severity: HitSeverity,
    /// Entities already hit by the swing in progress
    pub swing_hits: Vec<EntityHandle>,
    /// Held weapon
    pub held: Option<HeldWeapon>,
    /// Attack slots around the player
    pub slots: AttackSlots,
}

impl PlayerData {
    fn new(settings: &Settings) -> Self {
        Self {
            state: PlayerState::Standing,
            combo: 0,
            last_attack_at: 0.0,
            attack_severity: HitSeverity::Normal,
            swing_hits: Vec::new(),
            held: None,
            slots: AttackSlots::new(settings.slot_offsets),
        }
    }

    /// Holding a knife or gun.
    #[must_use]
    pub fn has_weapon(&self) -> bool {
        self.held.is_some()
    }
}

/// Build the player standing at `pos`.
pub fn spawn(
    handle: EntityHandle,
    pos: Vec2,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let mut body = Body::new(handle, pos, SHAPE, sprites.get(SpriteKey::Player))
        .with_health(settings.player_health)
        .with_damage(settings.player_damage)
        .with_speed(settings.player_speed);
    body.anim.start(anim_for(PlayerState::Standing, settings))?;
    Ok(Entity::new(body, EntityKind::Player(PlayerData::new(settings))))
}

fn anim_for(state: PlayerState, settings: &Settings) -> AnimStartOpts {
    match state {
        PlayerState::Standing => AnimStartOpts::new(PlayerAnim::Standing).looping(),
        PlayerState::Running => AnimStartOpts::new(PlayerAnim::Running).looping(),
        // Combo steps pick their own row.
        PlayerState::Attacking => AnimStartOpts::new(PlayerAnim::PunchingLeft)
            .with_frame_duration(settings.attack_frame_duration),
        PlayerState::Takeoff => AnimStartOpts::new(PlayerAnim::Takeoff),
        PlayerState::Jumping => AnimStartOpts::new(PlayerAnim::Jumping).looping(),
        PlayerState::KickingDrop => AnimStartOpts::new(PlayerAnim::KickingDrop),
        PlayerState::Landing => AnimStartOpts::new(PlayerAnim::Landing),
        PlayerState::GotHit => AnimStartOpts::new(PlayerAnim::GotHit),
        PlayerState::Dying => {
            AnimStartOpts::new(PlayerAnim::Dying).with_fadeout(Fadeout::new(settings.fade_rate))
        }
        PlayerState::PickingUp => AnimStartOpts::new(PlayerAnim::PickingUp),
        PlayerState::Throwing => AnimStartOpts::new(PlayerAnim::Throwing),
        PlayerState::Shooting => AnimStartOpts::new(PlayerAnim::Shooting),
    }
}

fn enter_with(
    body: &mut Body,
    player: &mut PlayerData,
    state: PlayerState,
    opts: AnimStartOpts,
) -> SimResult<()> {
    tracing::trace!(
        handle = %body.handle,
        from = player.state.name(),
        to = state.name(),
        "player state"
    );
    player.state = state;
    body.anim.start(opts)?;
    Ok(())
}

fn enter(
    body: &mut Body,
    player: &mut PlayerData,
    state: PlayerState,
    settings: &Settings,
) -> SimResult<()> {
    enter_with(body, player, state, anim_for(state, settings))
}

/// Run one tick.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    let Entity { body, kind } = entity;
    let EntityKind::Player(player) = kind else {
        return Err(kind_mismatch(body.handle, EntityType::Player, kind.entity_type()).into());
    };
    let settings = ctx.settings;
    let time = ctx.time;

    body.anim.update(time.dt, time.dt_real);

    if player.combo != 0 && time.since(player.last_attack_at) > f64::from(settings.combo_timeout) {
        tracing::trace!(handle = %body.handle, "combo reset");
        player.combo = 0;
    }

    if let Some(hit) = body.resolve_damage(player.state.is_receptive()) {
        ctx.events.publish(GameEvent::EntityDamaged {
            handle: body.handle,
            amount: hit.total,
            severity: hit.severity,
            remaining_health: body.health,
        });
        take_hit(body, player, &hit, settings)?;
    }

    match player.state {
        state if state.can_act() => act(body, player, neighbors, ctx)?,
        state if state.is_airborne() => airborne(body, player, neighbors, ctx)?,
        PlayerState::Attacking => {
            land_hits(body, player, neighbors, body.damage);
            if body.anim.is_finished() {
                enter(body, player, PlayerState::Standing, settings)?;
            }
        }
        PlayerState::Takeoff => {
            if body.anim.is_finished() {
                body.z_vel = settings.jump_velocity;
                enter(body, player, PlayerState::Jumping, settings)?;
            }
        }
        PlayerState::GotHit => {
            movement::apply(body, EntityType::Player, neighbors, ctx.bounds, time.dt, &COLLIDE);
            if body.anim.is_finished() {
                body.vel = Vec2::ZERO;
                if body.health > 0 {
                    enter(body, player, PlayerState::Standing, settings)?;
                } else {
                    tracing::info!(handle = %body.handle, "player died");
                    ctx.events.publish(GameEvent::EntityDied {
                        handle: body.handle,
                        kind: EntityType::Player,
                    });
                    enter(body, player, PlayerState::Dying, settings)?;
                }
            }
        }
        PlayerState::Dying => {
            if body.anim.is_finished() {
                return Ok(UpdateResult::RemoveMe);
            }
        }
        PlayerState::Landing
        | PlayerState::PickingUp
        | PlayerState::Throwing
        | PlayerState::Shooting => {
            if body.anim.is_finished() {
                enter(body, player, PlayerState::Standing, settings)?;
            }
        }
        // Handled by the guards above.
        PlayerState::Standing
        | PlayerState::Running
        | PlayerState::Jumping
        | PlayerState::KickingDrop => {}
    }

    if ctx.camera.follow(body.pos.x) {
        ctx.bounds.scroll_to(ctx.camera.x());
    }
    Ok(UpdateResult::Keep)
}

/// Fall under gravity, drop-kick on attack, land when grounded.
fn airborne(
    body: &mut Body,
    player: &mut PlayerData,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<()> {
    let settings = ctx.settings;
    let dt = ctx.time.dt;
    let landed = body.apply_gravity(settings.gravity, dt, settings.ground_level);
    movement::apply(body, EntityType::Player, neighbors, ctx.bounds, dt, &COLLIDE);
    if player.state == PlayerState::KickingDrop {
        land_hits(body, player, neighbors, settings.drop_kick_damage);
    } else if ctx.input.pressed(Action::Attack) {
        player.swing_hits.clear();
        player.attack_severity = HitSeverity::Power;
        enter(body, player, PlayerState::KickingDrop, settings)?;
    }
    if landed {
        body.vel = Vec2::ZERO;
        enter(body, player, PlayerState::Landing, settings)?;
    }
    Ok(())
}

fn take_hit(
    body: &mut Body,
    player: &mut PlayerData,
    hit: &DamageSummary,
    settings: &Settings,
) -> SimResult<()> {
    body.dir = hit.direction.flipped_x();
    body.vel = Vec2::new(hit.knockback_x(settings), 0.0);
    enter(body, player, PlayerState::GotHit, settings)
}

/// Read input in a state that allows it: attack, jump, pick up or walk.
fn act(
    body: &mut Body,
    player: &mut PlayerData,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<()> {
    let settings = ctx.settings;
    let input = ctx.input;

    if input.pressed(Action::Attack) {
        body.vel = Vec2::ZERO;
        return attack(body, player, ctx);
    }
    if input.pressed(Action::Jump) {
        let (dx, _) = input.current.move_direction();
        body.vel = Vec2::new(dx * body.speed, 0.0);
        return enter(body, player, PlayerState::Takeoff, settings);
    }
    if settings.auto_pickup || input.pressed(Action::Interact) {
        if let Some(item) = pick_up(body, player, neighbors, ctx) {
            body.vel = Vec2::ZERO;
            tracing::debug!(handle = %body.handle, ?item, "item picked up");
            return enter(body, player, PlayerState::PickingUp, settings);
        }
    }

    let (dx, dy) = input.current.move_direction();
    body.vel = Vec2::new(dx, dy).normalized() * body.speed;
    if dx < 0.0 {
        body.dir = Direction::Left;
    } else if dx > 0.0 {
        body.dir = Direction::Right;
    }
    movement::apply(body, EntityType::Player, neighbors, ctx.bounds, ctx.time.dt, &COLLIDE);

    let moving = input.current.has_movement();
    match (player.state, moving) {
        (PlayerState::Standing, true) => enter(body, player, PlayerState::Running, settings),
        (PlayerState::Running, false) => enter(body, player, PlayerState::Standing, settings),
        _ => Ok(()),
    }
}

/// Use the held weapon, or swing the next combo step.
fn attack(body: &mut Body, player: &mut PlayerData, ctx: &mut TickContext<'_>) -> SimResult<()> {
    let settings = ctx.settings;
    let owner = Owner::new(body.handle, EntityType::Player);

    match player.held {
        Some(HeldWeapon::Knife) => {
            ctx.spawns.throw(ThrowRequest {
                pos: body.pos,
                dir: body.dir,
                owner,
                item: CollectibleType::Knife,
            });
            player.held = None;
            enter(body, player, PlayerState::Throwing, settings)
        }
        Some(HeldWeapon::Gun { ammo }) => {
            ctx.spawns.shoot(ShotRequest {
                pos: body.pos + Vec2::new(body.dir.x_sign() * MUZZLE_OFFSET_X, 0.0),
                z: MUZZLE_HEIGHT,
                dir: body.dir,
                owner,
            });
            let ammo = ammo.saturating_sub(1);
            if ammo == 0 {
                // Empty guns are tossed and vanish.
                ctx.spawns.drop_item(DropRequest {
                    pos: body.pos,
                    dir: body.dir,
                    owner,
                    item: CollectibleType::Gun,
                    instantly_disappear: true,
                    ammo: 0,
                });
                player.held = None;
            } else {
                player.held = Some(HeldWeapon::Gun { ammo });
            }
            enter(body, player, PlayerState::Shooting, settings)
        }
        None => {
            let (anim, severity) = COMBO[player.combo];
            player.attack_severity = severity;
            player.swing_hits.clear();
            player.combo = (player.combo + 1) % COMBO.len();
            player.last_attack_at = ctx.time.now;
            let opts = AnimStartOpts::new(anim).with_frame_duration(settings.attack_frame_duration);
            enter_with(body, player, PlayerState::Attacking, opts)
        }
    }
}

/// Queue the current swing's damage on every enemy or barrel the hitbox
/// reaches, once per target per swing.
fn land_hits(body: &Body, player: &mut PlayerData, neighbors: &mut Neighbors<'_>, amount: i32) {
    let hitbox = body.world_hitbox();
    for other in neighbors.iter_mut() {
        if !matches!(other.entity_type(), EntityType::Enemy | EntityType::Barrel)
            || player.swing_hits.contains(&other.handle())
            || !other.body.world_hurtbox().intersects(&hitbox)
        {
            continue;
        }
        player.swing_hits.push(other.handle());
        other.body.damage_queue.push(DamageRecord::new(
            amount,
            body.dir,
            player.attack_severity,
            body.handle,
        ));
    }
}

fn can_take(player: &PlayerData, item: &CollectibleData) -> bool {
    item.can_be_picked_up() && (!item.item.is_weapon() || !player.has_weapon())
}

/// Take the first pickupable item under the player's feet.
fn pick_up(
    body: &mut Body,
    player: &mut PlayerData,
    neighbors: &mut Neighbors<'_>,
    ctx: &TickContext<'_>,
) -> Option<CollectibleType> {
    let feet = body.world_collision_box();
    let entity = neighbors.iter_mut().find(|other| {
        other
            .as_collectible()
            .is_some_and(|c| can_take(player, c))
            && other.body.world_collision_box().intersects(&feet)
    })?;
    let item_handle = entity.handle();
    let item = entity.as_collectible_mut()?;
    item.pick_up(ctx.time.tick);

    let settings = ctx.settings;
    match item.item {
        CollectibleType::Knife => player.held = Some(HeldWeapon::Knife),
        CollectibleType::Gun => {
            let ammo = if item.ammo == 0 { settings.gun_ammo } else { item.ammo };
            player.held = Some(HeldWeapon::Gun { ammo });
        }
        CollectibleType::Food => {
            body.health = (body.health + settings.food_heal).min(settings.player_health);
        }
    }
    ctx.events.publish(GameEvent::ItemPickedUp {
        handle: body.handle,
        item_handle,
        item: item.item,
    });
    Some(item.item)
}

//! Barrel state machine.
//!
//! Idle until its health runs out, then it is knocked away in the direction
//! of the killing blow, fades out and is removed once it has settled.

use fury_common::{EntityHandle, Rect, SimResult, Vec2};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimStartOpts, Fadeout};
use crate::context::TickContext;
use crate::entity::{
    kind_mismatch, Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
};
use crate::events::GameEvent;
use crate::movement::{self, CollideOpts};
use crate::settings::Settings;
use crate::sprite::{SpriteCatalog, SpriteKey};

/// Barrel geometry.
pub const SHAPE: BodyShape = BodyShape {
    collision_box: Rect::new(-6.0, -3.0, 12.0, 4.0),
    hurtbox: Rect::new(-7.0, -18.0, 14.0, 18.0),
    hitbox: Rect::new(0.0, 0.0, 0.0, 0.0),
    shadow: Rect::new(-7.0, -1.0, 14.0, 3.0),
};

/// A broken barrel tumbles through everything.
const DESTROYED_COLLIDE: CollideOpts = CollideOpts::new(&[
    EntityType::Player,
    EntityType::Enemy,
    EntityType::Barrel,
    EntityType::Bullet,
    EntityType::Collectible,
])
.penetrating();

/// Sprite rows of the barrel sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BarrelAnim {
    /// Standing barrel
    Idle,
    /// Breaking barrel
    Destroyed,
}

impl BarrelAnim {
    /// Frames per row.
    pub const FRAMES: [u32; 2] = [1, 2];
}

impl From<BarrelAnim> for u32 {
    fn from(anim: BarrelAnim) -> Self {
        anim as u32
    }
}

/// Barrel states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BarrelState {
    /// Standing, taking hits
    #[default]
    Idle,
    /// Broken, flying and fading
    Destroyed,
}

impl BarrelState {
    /// State name for logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            BarrelState::Idle => "idle",
            BarrelState::Destroyed => "destroyed",
        }
    }
}

/// Barrel payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrelData {
    /// Current state
    pub state: BarrelState,
}

/// Build a barrel standing at `pos`.
pub fn spawn(
    handle: EntityHandle,
    pos: Vec2,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let mut body = Body::new(handle, pos, SHAPE, sprites.get(SpriteKey::Barrel))
        .with_health(settings.barrel_health);
    body.anim.start(AnimStartOpts::new(BarrelAnim::Idle).looping())?;
    Ok(Entity::new(body, EntityKind::Barrel(BarrelData::default())))
}

/// Run one tick.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    let Entity { body, kind } = entity;
    let EntityKind::Barrel(barrel) = kind else {
        return Err(kind_mismatch(body.handle, EntityType::Barrel, kind.entity_type()).into());
    };
    let settings = ctx.settings;
    let time = ctx.time;

    body.anim.update(time.dt, time.dt_real);

    match barrel.state {
        BarrelState::Idle => {
            let Some(hit) = body.resolve_damage(true) else {
                return Ok(UpdateResult::Keep);
            };
            ctx.events.publish(GameEvent::EntityDamaged {
                handle: body.handle,
                amount: hit.total,
                severity: hit.severity,
                remaining_health: body.health,
            });
            if body.health > 0 {
                return Ok(UpdateResult::Keep);
            }

            barrel.state = BarrelState::Destroyed;
            body.vel = Vec2::new(hit.direction.x_sign() * settings.barrel_knockback, 0.0);
            body.z_vel = settings.barrel_pop_velocity;
            body.anim.start(
                AnimStartOpts::new(BarrelAnim::Destroyed)
                    .with_fadeout(Fadeout::new(settings.fade_rate)),
            )?;
            tracing::debug!(handle = %body.handle, "barrel destroyed");
            ctx.events.publish(GameEvent::EntityDied {
                handle: body.handle,
                kind: EntityType::Barrel,
            });
            Ok(UpdateResult::Keep)
        }
        BarrelState::Destroyed => {
            // Already broken: further hits are discarded.
            body.resolve_damage(false);

            body.apply_gravity(settings.gravity, time.dt, settings.ground_level);
            movement::apply(
                body,
                EntityType::Barrel,
                neighbors,
                ctx.bounds,
                time.dt,
                &DESTROYED_COLLIDE,
            );
            if body.is_grounded(settings.ground_level) {
                body.vel = Vec2::ZERO;
            }

            let settled = body.vel == Vec2::ZERO && body.is_grounded(settings.ground_level);
            if settled && body.anim.is_finished() {
                Ok(UpdateResult::RemoveMe)
            } else {
                Ok(UpdateResult::Keep)
            }
        }
    }
}

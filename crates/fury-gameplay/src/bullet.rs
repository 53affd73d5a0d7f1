//! Hitscan bullet trace.
//!
//! A bullet resolves its hit on the first tick it runs: the trace extends
//! from the muzzle along the shooter's facing, the nearest hurtbox in the way
//! takes a power hit and the trace is cut short at it. The entity then only
//! fades before removal.

use fury_common::{Direction, EntityHandle, Rect, SimResult};
use serde::{Deserialize, Serialize};

use crate::animation::{AnimStartOpts, Fadeout};
use crate::context::TickContext;
use crate::damage::{DamageRecord, HitSeverity};
use crate::entity::{
    kind_mismatch, Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
};
use crate::events::GameEvent;
use crate::settings::Settings;
use crate::spawn::{Owner, ShotRequest};
use crate::sprite::{SpriteCatalog, SpriteKey};

/// Height a gun is fired from.
pub const MUZZLE_HEIGHT: f32 = -14.0;

/// Bullets take part in no box tests of their own.
pub const SHAPE: BodyShape = BodyShape {
    collision_box: Rect::new(0.0, 0.0, 0.0, 0.0),
    hurtbox: Rect::new(0.0, 0.0, 0.0, 0.0),
    hitbox: Rect::new(0.0, 0.0, 0.0, 0.0),
    shadow: Rect::new(0.0, 0.0, 0.0, 0.0),
};

/// Sprite rows of the bullet sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BulletAnim {
    /// Single-pixel trace, stretched when drawn
    Trace,
}

impl BulletAnim {
    /// Frames per row.
    pub const FRAMES: [u32; 1] = [1];
}

impl From<BulletAnim> for u32 {
    fn from(anim: BulletAnim) -> Self {
        anim as u32
    }
}

/// Bullet payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletData {
    /// Who fired
    pub owner: Owner,
    /// Trace length; shortened to the target on a hit
    pub length: f32,
    /// Trace thickness
    pub thickness: f32,
    /// The hit has been resolved
    pub fired: bool,
    /// What was hit
    pub target: Option<EntityHandle>,
}

/// Build a bullet leaving the shooter's gun.
pub fn spawn(
    handle: EntityHandle,
    request: &ShotRequest,
    settings: &Settings,
    sprites: &SpriteCatalog,
) -> SimResult<Entity> {
    let mut body = Body::new(handle, request.pos, SHAPE, sprites.get(SpriteKey::Bullet))
        .with_damage(settings.bullet_damage)
        .facing(request.dir);
    body.z = request.z;
    body.anim.start(
        AnimStartOpts::new(BulletAnim::Trace).with_fadeout(Fadeout::new(settings.bullet_fade_rate)),
    )?;
    let data = BulletData {
        owner: request.owner,
        length: settings.bullet_length,
        thickness: settings.bullet_thickness,
        fired: false,
        target: None,
    };
    Ok(Entity::new(body, EntityKind::Bullet(data)))
}

/// World-space rectangle covered by the trace.
#[must_use]
pub fn trace_rect(body: &Body, length: f32, thickness: f32) -> Rect {
    let y = body.pos.y + body.z - thickness / 2.0;
    match body.dir {
        Direction::Left => Rect::new(body.pos.x - length, y, length, thickness),
        _ => Rect::new(body.pos.x, y, length, thickness),
    }
}

/// Run one tick.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    let Entity { body, kind } = entity;
    let EntityKind::Bullet(bullet) = kind else {
        return Err(kind_mismatch(body.handle, EntityType::Bullet, kind.entity_type()).into());
    };

    if !bullet.fired {
        bullet.fired = true;
        resolve_hit(body, bullet, neighbors);
        ctx.events.publish(GameEvent::BulletFired {
            shooter: bullet.owner.handle,
            target: bullet.target,
        });
    }

    body.anim.update(ctx.time.dt, ctx.time.dt_real);
    if body.anim.is_finished() {
        Ok(UpdateResult::RemoveMe)
    } else {
        Ok(UpdateResult::Keep)
    }
}

fn can_be_shot(other: &Entity, owner: Owner) -> bool {
    let kind = other.entity_type();
    matches!(kind, EntityType::Player | EntityType::Enemy | EntityType::Barrel)
        && other.handle() != owner.handle
        && kind != owner.kind
}

/// Distance from the muzzle to the near edge of `other`'s hurtbox.
fn distance(body: &Body, other: &Entity) -> f32 {
    let hurtbox = other.body.world_hurtbox();
    match body.dir {
        Direction::Left => body.pos.x - hurtbox.right(),
        _ => hurtbox.x - body.pos.x,
    }
    .max(0.0)
}

fn resolve_hit(body: &Body, bullet: &mut BulletData, neighbors: &mut Neighbors<'_>) {
    let trace = trace_rect(body, bullet.length, bullet.thickness);
    let owner = bullet.owner;

    let nearest = neighbors
        .iter_mut()
        .filter(|other| can_be_shot(other, owner))
        .filter(|other| other.body.world_hurtbox().intersects(&trace))
        .min_by(|a, b| distance(body, a).total_cmp(&distance(body, b)));
    let Some(target) = nearest else {
        return;
    };

    bullet.length = distance(body, target);
    bullet.target = Some(target.handle());
    target.body.damage_queue.push(DamageRecord::new(
        body.damage,
        body.dir,
        HitSeverity::Power,
        bullet.owner.handle,
    ));
    tracing::debug!(
        shooter = %bullet.owner.handle,
        target = %target.handle(),
        length = bullet.length,
        "bullet hit"
    );
}

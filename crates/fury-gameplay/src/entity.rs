//! The universal simulated object.
//!
//! An [`Entity`] is a [`Body`] (kinematics, combat stats, geometry and the
//! animation clock every kind shares) plus an [`EntityKind`] carrying exactly
//! one kind-specific payload. Kind-specific routines destructure the payload
//! and return [`EntityError::KindMismatch`] if handed the wrong kind.

use std::sync::Arc;

use fury_common::{Direction, EntityError, EntityHandle, Rect, SimResult, Vec2};
use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::barrel::{self, BarrelData};
use crate::bullet::{self, BulletData};
use crate::collectible::{self, CollectibleData};
use crate::context::TickContext;
use crate::damage::{DamageQueue, DamageSummary};
use crate::enemy::{self, EnemyData};
use crate::player::{self, PlayerData};
use crate::sprite::SpriteSheet;

/// Entity kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// The player
    Player,
    /// An enemy
    Enemy,
    /// A destructible barrel
    Barrel,
    /// A hitscan bullet trace
    Bullet,
    /// A weapon or food item
    Collectible,
}

impl EntityType {
    /// Lowercase name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EntityType::Player => "player",
            EntityType::Enemy => "enemy",
            EntityType::Barrel => "barrel",
            EntityType::Bullet => "bullet",
            EntityType::Collectible => "collectible",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a state machine wants done with its entity after this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// Keep simulating
    Keep,
    /// Queue for end-of-tick removal
    RemoveMe,
}

/// Anchor-relative geometry of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyShape {
    /// Physical blocking box
    pub collision_box: Rect,
    /// Vulnerable region, authored facing right
    pub hurtbox: Rect,
    /// Damage-dealing region, authored facing right
    pub hitbox: Rect,
    /// Shadow decal
    pub shadow: Rect,
}

/// State shared by every kind.
///
/// The anchor `pos` is the centre of the entity's feet on the street plane.
/// `z` lifts the entity off the ground and is negative in the air.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    /// Stable identity
    pub handle: EntityHandle,
    /// Feet position on the street plane
    pub pos: Vec2,
    /// Height offset, negative above ground
    pub z: f32,
    /// Street-plane velocity
    pub vel: Vec2,
    /// Height velocity, negative going up
    pub z_vel: f32,
    /// Facing
    pub dir: Direction,
    /// Facing at the start of this tick
    pub dir_prev: Direction,
    /// Remaining health
    pub health: i32,
    /// Damage this entity deals
    pub damage: i32,
    /// Movement speed
    pub speed: f32,
    /// Pending incoming hits
    pub damage_queue: DamageQueue,
    /// Anchor-relative geometry
    pub shape: BodyShape,
    /// Sprite frame size, for the draw anchor
    pub frame_size: Vec2,
    /// Animation clock
    pub anim: Animation,
}

impl Body {
    /// Creates a body at `pos`, bound to `sprite`, facing right.
    #[must_use]
    pub fn new(handle: EntityHandle, pos: Vec2, shape: BodyShape, sprite: Arc<SpriteSheet>) -> Self {
        let frame_size = Vec2::new(sprite.frame_width as f32, sprite.frame_height as f32);
        Self {
            handle,
            pos,
            z: 0.0,
            vel: Vec2::ZERO,
            z_vel: 0.0,
            dir: Direction::Right,
            dir_prev: Direction::Right,
            health: 1,
            damage: 0,
            speed: 0.0,
            damage_queue: DamageQueue::new(),
            shape,
            frame_size,
            anim: Animation::new(sprite),
        }
    }

    /// Builder: starting health.
    #[must_use]
    pub fn with_health(mut self, health: i32) -> Self {
        self.health = health;
        self
    }

    /// Builder: outgoing damage.
    #[must_use]
    pub fn with_damage(mut self, damage: i32) -> Self {
        self.damage = damage;
        self
    }

    /// Builder: movement speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Builder: facing.
    #[must_use]
    pub fn facing(mut self, dir: Direction) -> Self {
        self.dir = dir;
        self.dir_prev = dir;
        self
    }

    /// Record the facing this tick started with.
    pub fn begin_tick(&mut self) {
        self.dir_prev = self.dir;
    }

    /// Facing changed since [`Body::begin_tick`].
    #[must_use]
    pub fn flipped_this_tick(&self) -> bool {
        self.dir != self.dir_prev
    }

    fn directional(&self, offsets: Rect) -> Rect {
        if self.dir == Direction::Left {
            offsets.mirrored_x()
        } else {
            offsets
        }
    }

    /// Collision box in world space. It sits on the ground regardless of `z`.
    #[must_use]
    pub fn world_collision_box(&self) -> Rect {
        self.shape.collision_box.translated(self.pos)
    }

    /// Hurtbox in world space, mirrored when facing left.
    #[must_use]
    pub fn world_hurtbox(&self) -> Rect {
        self.directional(self.shape.hurtbox)
            .translated(Vec2::new(self.pos.x, self.pos.y + self.z))
    }

    /// Hitbox in world space, mirrored when facing left.
    #[must_use]
    pub fn world_hitbox(&self) -> Rect {
        self.directional(self.shape.hitbox)
            .translated(Vec2::new(self.pos.x, self.pos.y + self.z))
    }

    /// Shadow decal in world space, always on the ground.
    #[must_use]
    pub fn world_shadow(&self) -> Rect {
        self.shape.shadow.translated(self.pos)
    }

    /// Top-left corner to draw the current frame at so that the feet land on
    /// the anchor.
    #[must_use]
    pub fn draw_anchor(&self) -> Vec2 {
        Vec2::new(
            self.pos.x - self.frame_size.x / 2.0,
            self.pos.y - self.frame_size.y + self.z,
        )
    }

    /// Resting on the ground with no vertical motion.
    #[must_use]
    pub fn is_grounded(&self, ground: f32) -> bool {
        self.z >= ground && self.z_vel >= 0.0
    }

    /// Integrate height under gravity. Returns true on the tick the entity
    /// touches down.
    pub fn apply_gravity(&mut self, gravity: f32, dt: f32, ground: f32) -> bool {
        if self.z >= ground && self.z_vel >= 0.0 {
            self.z = ground;
            self.z_vel = 0.0;
            return false;
        }
        self.z_vel += gravity * dt;
        self.z += self.z_vel * dt;
        if self.z >= ground {
            self.z = ground;
            self.z_vel = 0.0;
            return true;
        }
        false
    }

    /// Drain the damage queue; see [`DamageQueue::resolve`].
    pub fn resolve_damage(&mut self, receptive: bool) -> Option<DamageSummary> {
        self.damage_queue.resolve(&mut self.health, receptive)
    }

    /// Face towards a point horizontally, keeping the facing when aligned.
    pub fn face_towards(&mut self, target_x: f32) {
        if let Some(dir) = Direction::towards_x(self.pos.x, target_x) {
            self.dir = dir;
        }
    }
}

/// Kind-specific payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntityKind {
    /// Player data
    Player(PlayerData),
    /// Enemy data
    Enemy(EnemyData),
    /// Barrel data
    Barrel(BarrelData),
    /// Bullet data
    Bullet(BulletData),
    /// Collectible data
    Collectible(CollectibleData),
}

impl EntityKind {
    /// Tag of the payload.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Player(_) => EntityType::Player,
            EntityKind::Enemy(_) => EntityType::Enemy,
            EntityKind::Barrel(_) => EntityType::Barrel,
            EntityKind::Bullet(_) => EntityType::Bullet,
            EntityKind::Collectible(_) => EntityType::Collectible,
        }
    }
}

/// Error for a kind-specific routine handed the wrong kind.
#[must_use]
pub fn kind_mismatch(handle: EntityHandle, expected: EntityType, actual: EntityType) -> EntityError {
    EntityError::KindMismatch {
        handle,
        expected: expected.name(),
        actual: actual.name(),
    }
}

/// A simulated object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Shared state
    pub body: Body,
    /// Kind payload
    pub kind: EntityKind,
}

impl Entity {
    /// Creates an entity.
    #[must_use]
    pub const fn new(body: Body, kind: EntityKind) -> Self {
        Self { body, kind }
    }

    /// Stable handle.
    #[must_use]
    pub const fn handle(&self) -> EntityHandle {
        self.body.handle
    }

    /// Kind tag.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    /// Error for a routine that expected another kind.
    #[must_use]
    pub fn kind_mismatch(&self, expected: EntityType) -> EntityError {
        kind_mismatch(self.handle(), expected, self.entity_type())
    }

    /// Player payload, if this is the player.
    #[must_use]
    pub fn as_player(&self) -> Option<&PlayerData> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable player payload.
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerData> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Enemy payload.
    #[must_use]
    pub fn as_enemy(&self) -> Option<&EnemyData> {
        match &self.kind {
            EntityKind::Enemy(e) => Some(e),
            _ => None,
        }
    }

    /// Barrel payload.
    #[must_use]
    pub fn as_barrel(&self) -> Option<&BarrelData> {
        match &self.kind {
            EntityKind::Barrel(b) => Some(b),
            _ => None,
        }
    }

    /// Bullet payload.
    #[must_use]
    pub fn as_bullet(&self) -> Option<&BulletData> {
        match &self.kind {
            EntityKind::Bullet(b) => Some(b),
            _ => None,
        }
    }

    /// Collectible payload.
    #[must_use]
    pub fn as_collectible(&self) -> Option<&CollectibleData> {
        match &self.kind {
            EntityKind::Collectible(c) => Some(c),
            _ => None,
        }
    }

    /// Mutable collectible payload.
    pub fn as_collectible_mut(&mut self) -> Option<&mut CollectibleData> {
        match &mut self.kind {
            EntityKind::Collectible(c) => Some(c),
            _ => None,
        }
    }

    /// Name of the current state, for logs and debug overlays.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        match &self.kind {
            EntityKind::Player(p) => p.state.name(),
            EntityKind::Enemy(e) => e.state.name(),
            EntityKind::Barrel(b) => b.state.name(),
            EntityKind::Bullet(_) => "bullet",
            EntityKind::Collectible(c) => c.state.name(),
        }
    }
}

/// Every live entity except the one being updated.
///
/// The world splits its entity slice around the current index, so the
/// updating entity is borrowed mutably while the rest stay reachable by
/// handle.
#[derive(Debug)]
pub struct Neighbors<'a> {
    before: &'a mut [Entity],
    after: &'a mut [Entity],
}

impl<'a> Neighbors<'a> {
    /// View over the entities around the current one.
    pub fn new(before: &'a mut [Entity], after: &'a mut [Entity]) -> Self {
        Self { before, after }
    }

    /// No other entities.
    #[must_use]
    pub fn empty() -> Neighbors<'static> {
        Neighbors {
            before: &mut [],
            after: &mut [],
        }
    }

    /// Number of other entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    /// No other entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Other entities in update order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.before.iter().chain(self.after.iter())
    }

    /// Other entities in update order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.before.iter_mut().chain(self.after.iter_mut())
    }

    /// Entity by handle.
    #[must_use]
    pub fn find(&self, handle: EntityHandle) -> Option<&Entity> {
        self.iter().find(|e| e.handle() == handle)
    }

    /// Entity by handle, mutably.
    pub fn find_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.iter_mut().find(|e| e.handle() == handle)
    }
}

/// Run one tick of an entity's state machine.
pub fn update(
    entity: &mut Entity,
    neighbors: &mut Neighbors<'_>,
    ctx: &mut TickContext<'_>,
) -> SimResult<UpdateResult> {
    entity.body.begin_tick();
    let result = match entity.entity_type() {
        EntityType::Player => player::update(entity, neighbors, ctx),
        EntityType::Enemy => enemy::update(entity, neighbors, ctx),
        EntityType::Barrel => barrel::update(entity, neighbors, ctx),
        EntityType::Bullet => bullet::update(entity, neighbors, ctx),
        EntityType::Collectible => collectible::update(entity, neighbors, ctx),
    }?;
    if entity.body.flipped_this_tick() {
        tracing::trace!(handle = %entity.body.handle, dir = ?entity.body.dir, "turned around");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::{DamageRecord, HitSeverity};

    fn body() -> Body {
        let shape = BodyShape {
            collision_box: Rect::new(-4.0, -2.0, 8.0, 3.0),
            hurtbox: Rect::new(-5.0, -30.0, 10.0, 30.0),
            hitbox: Rect::new(4.0, -24.0, 12.0, 8.0),
            shadow: Rect::new(-6.0, -1.0, 12.0, 3.0),
        };
        let sprite = Arc::new(SpriteSheet::new(48, 48, vec![1]));
        Body::new(EntityHandle::from_raw(1), Vec2::new(50.0, 50.0), shape, sprite)
    }

    #[test]
    fn test_hitbox_mirrors_with_facing() {
        let mut b = body();
        let right = b.world_hitbox();
        assert!(right.x > b.pos.x);

        b.dir = Direction::Left;
        let left = b.world_hitbox();
        assert!(left.right() < b.pos.x);
        assert_eq!(left.w, right.w);

        // Collision box never mirrors.
        assert_eq!(b.world_collision_box(), Rect::new(46.0, 48.0, 8.0, 3.0));
    }

    #[test]
    fn test_hurtbox_follows_height() {
        let mut b = body();
        let grounded = b.world_hurtbox();
        b.z = -10.0;
        assert!((b.world_hurtbox().y - (grounded.y - 10.0)).abs() < f32::EPSILON);
        assert_eq!(b.world_shadow(), body().world_shadow());
    }

    #[test]
    fn test_draw_anchor_centres_feet() {
        let mut b = body();
        b.z = -4.0;
        assert_eq!(b.draw_anchor(), Vec2::new(26.0, -2.0));
    }

    #[test]
    fn test_gravity_lands() {
        let mut b = body();
        b.z_vel = -60.0;
        let mut landed_ticks = 0;
        for _ in 0..200 {
            if b.apply_gravity(200.0, 1.0 / 60.0, 0.0) {
                landed_ticks += 1;
            }
        }
        assert_eq!(landed_ticks, 1);
        assert!(b.is_grounded(0.0));
        assert_eq!(b.z, 0.0);
    }

    #[test]
    fn test_resolve_damage_drains_queue() {
        let mut b = body().with_health(30);
        b.damage_queue.push(DamageRecord::new(
            12,
            Direction::Left,
            HitSeverity::Normal,
            EntityHandle::from_raw(2),
        ));
        let summary = b.resolve_damage(true).expect("summary");
        assert_eq!(summary.total, 12);
        assert_eq!(b.health, 18);
        assert!(b.damage_queue.is_empty());
    }

    #[test]
    fn test_flip_detection() {
        let mut b = body();
        b.begin_tick();
        assert!(!b.flipped_this_tick());
        b.face_towards(10.0);
        assert!(b.flipped_this_tick());
        b.begin_tick();
        b.face_towards(b.pos.x);
        assert!(!b.flipped_this_tick());
    }

    #[test]
    fn test_update_tracks_turns() {
        use crate::input::{Action, InputState};
        use crate::testing::Harness;

        let mut h = Harness::new();
        let handle = EntityHandle::from_raw(1);
        h.player = Some(handle);
        let mut p = crate::player::spawn(handle, Vec2::new(60.0, 50.0), &h.settings, &h.sprites)
            .expect("player");
        h.step(&mut p, InputState::IDLE.with(Action::MoveLeft)).expect("tick");
        assert!(p.body.flipped_this_tick());
        assert_eq!(p.body.dir_prev, Direction::Right);
        h.step(&mut p, InputState::IDLE.with(Action::MoveLeft)).expect("tick");
        assert!(!p.body.flipped_this_tick());
    }

    #[test]
    fn test_neighbors_lookup_by_handle() {
        let sprite = Arc::new(SpriteSheet::new(24, 24, vec![1, 2]));
        let mut entities: Vec<Entity> = (1..=3)
            .map(|i| {
                let b = Body::new(
                    EntityHandle::from_raw(i),
                    Vec2::ZERO,
                    barrel::SHAPE,
                    Arc::clone(&sprite),
                );
                Entity::new(b, EntityKind::Barrel(BarrelData::default()))
            })
            .collect();

        let (before, rest) = entities.split_at_mut(1);
        let (current, after) = rest.split_first_mut().expect("middle entity");
        let mut neighbors = Neighbors::new(before, after);

        assert_eq!(current.handle(), EntityHandle::from_raw(2));
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.find(EntityHandle::from_raw(2)).is_none());
        let third = neighbors
            .find_mut(EntityHandle::from_raw(3))
            .expect("third entity");
        third.body.health = 99;
        assert_eq!(entities[2].body.health, 99);
    }
}

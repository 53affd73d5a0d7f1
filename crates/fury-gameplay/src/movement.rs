//! Movement and collision resolver.
//!
//! Integrates an entity's street-plane velocity and tests the new collision
//! box against the level walls and every other live entity. Height (`z`) is
//! integrated separately by [`Body::apply_gravity`](crate::entity::Body::apply_gravity).

use fury_common::Rect;

use crate::entity::{Body, EntityType, Neighbors};
use crate::level::{Border, LevelBounds};

/// How an entity collides while moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollideOpts {
    /// Kinds passed through
    pub ignore: &'static [EntityType],
    /// Also test every level wall, not only the kind's own
    pub collide_with_walls: bool,
    /// Undo the move on impact instead of leaving the entity overlapping
    pub reset_position_on_wall_impact: bool,
}

impl CollideOpts {
    /// Rigid movement that ignores `ignore`.
    #[must_use]
    pub const fn new(ignore: &'static [EntityType]) -> Self {
        Self {
            ignore,
            collide_with_walls: false,
            reset_position_on_wall_impact: true,
        }
    }

    /// Test every wall.
    #[must_use]
    pub const fn with_walls(mut self) -> Self {
        self.collide_with_walls = true;
        self
    }

    /// Detect contacts without blocking.
    #[must_use]
    pub const fn penetrating(mut self) -> Self {
        self.reset_position_on_wall_impact = false;
        self
    }

    fn ignores(&self, kind: EntityType) -> bool {
        self.ignore.contains(&kind)
    }
}

/// Walls a kind always tests. The player is kept inside the street, enemies
/// may walk in from the sides and the bottom, items only stop at the ends.
#[must_use]
pub const fn kind_borders(kind: EntityType) -> &'static [Border] {
    match kind {
        EntityType::Player => &Border::ALL,
        EntityType::Enemy => &[Border::Top],
        EntityType::Collectible => &[Border::Left, Border::Right],
        EntityType::Barrel | EntityType::Bullet => &[],
    }
}

/// What the moved box ran into first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    /// A level wall
    Wall(Border),
    /// Another entity's collision box
    Entity(fury_common::EntityHandle),
}

/// First wall or entity the box overlaps.
pub fn first_contact(
    body: &Body,
    kind: EntityType,
    rect: &Rect,
    neighbors: &Neighbors<'_>,
    bounds: &LevelBounds,
    opts: &CollideOpts,
) -> Option<Contact> {
    let borders: &[Border] = if opts.collide_with_walls {
        &Border::ALL
    } else {
        kind_borders(kind)
    };
    if let Some(border) = bounds.first_hit(rect, borders) {
        return Some(Contact::Wall(border));
    }

    neighbors
        .iter()
        .filter(|other| other.handle() != body.handle && !opts.ignores(other.entity_type()))
        .find(|other| other.body.world_collision_box().intersects(rect))
        .map(|other| Contact::Entity(other.handle()))
}

/// Move `body` by its velocity over `dt`. Returns true if the new position
/// overlaps nothing; on impact the position is restored when
/// `opts.reset_position_on_wall_impact` is set.
pub fn apply(
    body: &mut Body,
    kind: EntityType,
    neighbors: &Neighbors<'_>,
    bounds: &LevelBounds,
    dt: f32,
    opts: &CollideOpts,
) -> bool {
    apply_with_contact(body, kind, neighbors, bounds, dt, opts).is_none()
}

/// Like [`apply`], but reports what was hit.
pub fn apply_with_contact(
    body: &mut Body,
    kind: EntityType,
    neighbors: &Neighbors<'_>,
    bounds: &LevelBounds,
    dt: f32,
    opts: &CollideOpts,
) -> Option<Contact> {
    let before = body.pos;
    body.pos += body.vel * dt;

    let moved = body.world_collision_box();
    let contact = first_contact(body, kind, &moved, neighbors, bounds, opts);
    if contact.is_some() && opts.reset_position_on_wall_impact {
        body.pos = before;
    }
    contact
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrel::{self, BarrelData};
    use crate::entity::{BodyShape, Entity, EntityKind};
    use crate::settings::Settings;
    use crate::sprite::SpriteSheet;
    use fury_common::{EntityHandle, Vec2};
    use proptest::prelude::*;
    use std::sync::Arc;

    const SHAPE: BodyShape = BodyShape {
        collision_box: Rect::new(-4.0, -2.0, 8.0, 3.0),
        hurtbox: Rect::new(-5.0, -30.0, 10.0, 30.0),
        hitbox: Rect::new(4.0, -24.0, 12.0, 8.0),
        shadow: Rect::new(-6.0, -1.0, 12.0, 3.0),
    };

    fn body_at(raw: u64, x: f32, y: f32) -> Body {
        let sprite = Arc::new(SpriteSheet::new(48, 48, vec![1]));
        Body::new(EntityHandle::from_raw(raw), Vec2::new(x, y), SHAPE, sprite)
    }

    fn barrel_at(raw: u64, x: f32, y: f32) -> Entity {
        let sprite = Arc::new(SpriteSheet::new(24, 24, vec![1, 2]));
        let body = Body::new(EntityHandle::from_raw(raw), Vec2::new(x, y), barrel::SHAPE, sprite);
        Entity::new(body, EntityKind::Barrel(BarrelData::default()))
    }

    fn bounds() -> LevelBounds {
        LevelBounds::street(&Settings::default(), 400.0)
    }

    #[test]
    fn test_free_move() {
        let mut body = body_at(1, 50.0, 50.0);
        body.vel = Vec2::new(30.0, 0.0);
        let ok = apply(
            &mut body,
            EntityType::Player,
            &Neighbors::empty(),
            &bounds(),
            0.5,
            &CollideOpts::new(&[]),
        );
        assert!(ok);
        assert_eq!(body.pos, Vec2::new(65.0, 50.0));
    }

    #[test]
    fn test_player_blocked_by_top_wall() {
        let mut body = body_at(1, 50.0, 39.0);
        body.vel = Vec2::new(0.0, -10.0);
        let ok = apply(
            &mut body,
            EntityType::Player,
            &Neighbors::empty(),
            &bounds(),
            0.5,
            &CollideOpts::new(&[]),
        );
        assert!(!ok);
        assert_eq!(body.pos, Vec2::new(50.0, 39.0));
    }

    #[test]
    fn test_enemy_ignores_side_walls_unless_asked() {
        let mut body = body_at(1, 2.0, 50.0);
        body.vel = Vec2::new(-4.0, 0.0);
        let ok = apply(
            &mut body,
            EntityType::Enemy,
            &Neighbors::empty(),
            &bounds(),
            0.5,
            &CollideOpts::new(&[]),
        );
        assert!(ok);

        let mut body = body_at(1, 2.0, 50.0);
        body.vel = Vec2::new(-4.0, 0.0);
        let contact = apply_with_contact(
            &mut body,
            EntityType::Enemy,
            &Neighbors::empty(),
            &bounds(),
            0.5,
            &CollideOpts::new(&[]).with_walls().penetrating(),
        );
        assert_eq!(contact, Some(Contact::Wall(Border::Left)));
        // Penetrating moves keep the new position.
        assert_eq!(body.pos, Vec2::new(0.0, 50.0));
    }

    #[test]
    fn test_entities_block_unless_ignored() {
        let mut others = vec![barrel_at(2, 60.0, 50.0)];
        let mut body = body_at(1, 50.0, 50.0);
        body.vel = Vec2::new(10.0, 0.0);

        let neighbors = Neighbors::new(&mut [], &mut others);
        let contact = apply_with_contact(
            &mut body,
            EntityType::Player,
            &neighbors,
            &bounds(),
            0.5,
            &CollideOpts::new(&[]),
        );
        assert_eq!(contact, Some(Contact::Entity(EntityHandle::from_raw(2))));
        assert_eq!(body.pos, Vec2::new(50.0, 50.0));

        let ok = apply(
            &mut body,
            EntityType::Player,
            &neighbors,
            &bounds(),
            0.5,
            &CollideOpts::new(&[EntityType::Barrel]),
        );
        assert!(ok);
    }

    proptest! {
        #[test]
        fn prop_reset_on_impact_restores_position(
            x in 0.0f32..120.0,
            y in 30.0f32..70.0,
            vx in -200.0f32..200.0,
            vy in -200.0f32..200.0,
            dt in 0.0f32..0.1,
            bx in 0.0f32..120.0,
            by in 30.0f32..70.0,
        ) {
            let mut others = vec![barrel_at(2, bx, by)];
            let neighbors = Neighbors::new(&mut [], &mut others);
            let mut body = body_at(1, x, y);
            body.vel = Vec2::new(vx, vy);
            let before = body.pos;

            let ok = apply(
                &mut body,
                EntityType::Player,
                &neighbors,
                &bounds(),
                dt,
                &CollideOpts::new(&[]),
            );
            if !ok {
                prop_assert_eq!(body.pos, before);
            }
        }
    }
}

//! # Fury Gameplay
//!
//! Simulation core for Fists of Fury.
//!
//! Once per fixed timestep the [`World`] runs every live entity's state
//! machine in order. This crate provides:
//! - Animation clock with frame, fade and rotation timelines
//! - Per-entity damage queues resolved once per tick
//! - Movement and collision against level walls and other entities
//! - Attack slots that ration how many enemies engage the player
//! - State machines for the player, enemies, barrels, bullets and collectibles
//! - Settings, input snapshots, level bounds and camera
//! - Deferred spawn queues and an event bus for outside collaborators

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod animation;
pub mod barrel;
pub mod bullet;
pub mod collectible;
pub mod context;
pub mod damage;
pub mod enemy;
pub mod entity;
pub mod events;
pub mod input;
pub mod level;
pub mod movement;
pub mod player;
pub mod settings;
pub mod slots;
pub mod spawn;
pub mod sprite;
pub mod world;

#[cfg(test)]
mod testing;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::animation::*;
    pub use crate::barrel::{BarrelAnim, BarrelData, BarrelState};
    pub use crate::bullet::{BulletAnim, BulletData};
    pub use crate::collectible::{
        CollectibleAnim, CollectibleData, CollectibleState, CollectibleType,
    };
    pub use crate::context::*;
    pub use crate::damage::*;
    pub use crate::enemy::{EnemyAnim, EnemyData, EnemyInit, EnemyState, EnemyType};
    pub use crate::entity::{
        Body, BodyShape, Entity, EntityKind, EntityType, Neighbors, UpdateResult,
    };
    pub use crate::events::*;
    pub use crate::input::*;
    pub use crate::level::*;
    pub use crate::movement::{CollideOpts, Contact};
    pub use crate::player::{HeldWeapon, PlayerAnim, PlayerData, PlayerState};
    pub use crate::settings::*;
    pub use crate::slots::*;
    pub use crate::spawn::*;
    pub use crate::sprite::*;
    pub use crate::world::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use fury_common::Vec2;

    #[test]
    fn test_default_catalog_covers_every_animation() {
        let sprites = SpriteCatalog::default();
        let player = sprites.get(SpriteKey::Player);
        assert_eq!(player.rows(), PlayerAnim::FRAMES.len());
        assert!(player.frames(PlayerAnim::Shooting.into()).is_ok());
        let enemy = sprites.get(SpriteKey::Enemy);
        assert!(enemy.frames(EnemyAnim::Dying.into()).is_ok());
        assert!(enemy.frames(EnemyAnim::FRAMES.len() as u32).is_err());
    }

    #[test]
    fn test_world_from_ron_settings() {
        let settings = Settings::from_ron_str("(gravity: 300.0, enemy_health: 10)").expect("settings");
        let mut world = World::new(settings, SpriteCatalog::default(), 200.0).expect("world");
        world.spawn_player(Vec2::new(20.0, 50.0)).expect("player");
        world.tick(InputState::IDLE, 1.0 / 60.0, 1.0 / 60.0).expect("tick");
        assert_eq!(world.time().tick, 1);
        assert_eq!(world.settings().enemy_health, 10);
    }
}

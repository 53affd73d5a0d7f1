//! Sprite frame metadata.
//!
//! The core never sees pixels. A [`SpriteSheet`] only records the frame size
//! and how many frames each row (animation index) holds, which is what the
//! animation clock needs to bound its indices and what the draw anchor needs
//! to centre a sprite on an entity's feet.

use std::sync::Arc;

use fury_common::AnimationError;
use serde::{Deserialize, Serialize};

use crate::barrel::BarrelAnim;
use crate::bullet::BulletAnim;
use crate::collectible::{CollectibleAnim, CollectibleType};
use crate::enemy::EnemyAnim;
use crate::entity::EntityType;
use crate::player::PlayerAnim;

/// Frame layout of one sprite sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSheet {
    /// Width of one frame in pixels
    pub frame_width: u32,
    /// Height of one frame in pixels
    pub frame_height: u32,
    /// Frame count of each row; the row index is the animation index
    pub frames_per_row: Vec<u32>,
}

impl SpriteSheet {
    /// Creates sprite metadata.
    #[must_use]
    pub fn new(frame_width: u32, frame_height: u32, frames_per_row: Vec<u32>) -> Self {
        Self {
            frame_width,
            frame_height,
            frames_per_row,
        }
    }

    /// Number of rows (animations) in the sheet.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.frames_per_row.len()
    }

    /// Frame count of a row, checked.
    pub fn frames(&self, index: u32) -> Result<u32, AnimationError> {
        let count = *self
            .frames_per_row
            .get(index as usize)
            .ok_or(AnimationError::IndexOutOfRange {
                index,
                rows: self.rows(),
            })?;
        if count == 0 {
            return Err(AnimationError::EmptyRow(index));
        }
        Ok(count)
    }
}

/// Which sheet an entity draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    /// Player sheet
    Player,
    /// Enemy sheet
    Enemy,
    /// Barrel sheet
    Barrel,
    /// Bullet trace
    Bullet,
    /// A collectible item
    Collectible(CollectibleType),
}

impl SpriteKey {
    /// Sheet used by an entity kind. Collectibles need their item type.
    #[must_use]
    pub const fn for_kind(kind: EntityType, item: CollectibleType) -> Self {
        match kind {
            EntityType::Player => SpriteKey::Player,
            EntityType::Enemy => SpriteKey::Enemy,
            EntityType::Barrel => SpriteKey::Barrel,
            EntityType::Bullet => SpriteKey::Bullet,
            EntityType::Collectible => SpriteKey::Collectible(item),
        }
    }
}

/// Sprite metadata for every drawable kind.
///
/// Sheets are shared: every entity of a kind holds an `Arc` to the same
/// metadata.
#[derive(Debug, Clone)]
pub struct SpriteCatalog {
    player: Arc<SpriteSheet>,
    enemy: Arc<SpriteSheet>,
    barrel: Arc<SpriteSheet>,
    bullet: Arc<SpriteSheet>,
    knife: Arc<SpriteSheet>,
    gun: Arc<SpriteSheet>,
    food: Arc<SpriteSheet>,
}

impl Default for SpriteCatalog {
    fn default() -> Self {
        Self {
            player: Arc::new(SpriteSheet::new(48, 48, PlayerAnim::FRAMES.to_vec())),
            enemy: Arc::new(SpriteSheet::new(48, 48, EnemyAnim::FRAMES.to_vec())),
            barrel: Arc::new(SpriteSheet::new(24, 24, BarrelAnim::FRAMES.to_vec())),
            bullet: Arc::new(SpriteSheet::new(1, 1, BulletAnim::FRAMES.to_vec())),
            knife: Arc::new(SpriteSheet::new(16, 16, CollectibleAnim::FRAMES.to_vec())),
            gun: Arc::new(SpriteSheet::new(16, 16, CollectibleAnim::FRAMES.to_vec())),
            food: Arc::new(SpriteSheet::new(16, 16, CollectibleAnim::FRAMES.to_vec())),
        }
    }
}

impl SpriteCatalog {
    /// Shared handle to a sheet.
    #[must_use]
    pub fn get(&self, key: SpriteKey) -> Arc<SpriteSheet> {
        let sheet = match key {
            SpriteKey::Player => &self.player,
            SpriteKey::Enemy => &self.enemy,
            SpriteKey::Barrel => &self.barrel,
            SpriteKey::Bullet => &self.bullet,
            SpriteKey::Collectible(CollectibleType::Knife) => &self.knife,
            SpriteKey::Collectible(CollectibleType::Gun) => &self.gun,
            SpriteKey::Collectible(CollectibleType::Food) => &self.food,
        };
        Arc::clone(sheet)
    }

    /// Replace one sheet, e.g. with metadata read by the asset collaborator.
    pub fn set(&mut self, key: SpriteKey, sheet: SpriteSheet) {
        let slot = match key {
            SpriteKey::Player => &mut self.player,
            SpriteKey::Enemy => &mut self.enemy,
            SpriteKey::Barrel => &mut self.barrel,
            SpriteKey::Bullet => &mut self.bullet,
            SpriteKey::Collectible(CollectibleType::Knife) => &mut self.knife,
            SpriteKey::Collectible(CollectibleType::Gun) => &mut self.gun,
            SpriteKey::Collectible(CollectibleType::Food) => &mut self.food,
        };
        *slot = Arc::new(sheet);
    }
}

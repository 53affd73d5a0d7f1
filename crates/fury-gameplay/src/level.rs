//! Level boundaries and camera.
//!
//! The street is bounded by four rectangles. The left, top and bottom walls
//! travel with the camera so the player can never walk back off-screen; the
//! right wall marks the end of the level.

use fury_common::{Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// One of the four boundary walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Border {
    /// Building facades at the back of the street
    Top,
    /// Kerb at the front of the street
    Bottom,
    /// Left screen edge
    Left,
    /// End of the level
    Right,
}

impl Border {
    /// All borders.
    pub const ALL: [Border; 4] = [Border::Top, Border::Bottom, Border::Left, Border::Right];
}

/// World-space boundary rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelBounds {
    /// Top wall
    pub top: Rect,
    /// Bottom wall
    pub bottom: Rect,
    /// Left wall
    pub left: Rect,
    /// Right wall
    pub right: Rect,
}

/// Screen row where the walkable street starts.
pub const STREET_TOP: f32 = 36.0;

impl LevelBounds {
    /// A street `level_width` pixels long, walkable between [`STREET_TOP`]
    /// and the bottom of the screen.
    #[must_use]
    pub fn street(settings: &Settings, level_width: f32) -> Self {
        let w = settings.screen_width;
        let h = settings.screen_height;
        Self {
            top: Rect::new(-1.0, 0.0, w + 2.0, STREET_TOP),
            bottom: Rect::new(-1.0, h, w + 2.0, 10.0),
            left: Rect::new(-1.0, 0.0, 1.0, h),
            right: Rect::new(level_width, 0.0, 1.0, h),
        }
    }

    /// Rectangle of one wall.
    #[must_use]
    pub const fn get(&self, border: Border) -> &Rect {
        match border {
            Border::Top => &self.top,
            Border::Bottom => &self.bottom,
            Border::Left => &self.left,
            Border::Right => &self.right,
        }
    }

    /// Mutable rectangle of one wall.
    pub fn get_mut(&mut self, border: Border) -> &mut Rect {
        match border {
            Border::Top => &mut self.top,
            Border::Bottom => &mut self.bottom,
            Border::Left => &mut self.left,
            Border::Right => &mut self.right,
        }
    }

    /// Walls paired with their rectangles.
    pub fn iter(&self) -> impl Iterator<Item = (Border, &Rect)> {
        Border::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// Slide the camera-bound walls to the camera's left edge.
    pub fn scroll_to(&mut self, camera_x: f32) {
        self.left.x = camera_x - 1.0;
        self.top.x = camera_x - 1.0;
        self.bottom.x = camera_x - 1.0;
    }

    /// First wall a box overlaps, among `borders`.
    #[must_use]
    pub fn first_hit(&self, rect: &Rect, borders: &[Border]) -> Option<Border> {
        borders
            .iter()
            .copied()
            .find(|b| self.get(*b).intersects(rect))
    }
}

/// The visible window into the level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Visible rectangle in world space
    pub rect: Rect,
    /// Level length; the camera never shows past it
    pub level_width: f32,
}

impl Camera {
    /// Camera at the level start.
    #[must_use]
    pub fn new(settings: &Settings, level_width: f32) -> Self {
        Self {
            rect: Rect::new(0.0, 0.0, settings.screen_width, settings.screen_height),
            level_width,
        }
    }

    /// Left edge in world space.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.rect.x
    }

    /// Scroll right once the target passes the middle of the screen, clamped
    /// to the level. Returns true if the camera moved.
    pub fn follow(&mut self, target_x: f32) -> bool {
        let before = self.rect.x;
        let half = self.rect.w / 2.0;
        if target_x - self.rect.x > half {
            self.rect.x = target_x - half;
        }
        let max_x = (self.level_width - self.rect.w).max(0.0);
        self.rect.x = self.rect.x.clamp(0.0, max_x);
        (self.rect.x - before).abs() > f32::EPSILON
    }

    /// World to screen coordinates; `z` lifts the point off the ground.
    #[must_use]
    pub fn to_screen(&self, world: Vec2, z: f32) -> Vec2 {
        Vec2::new(world.x - self.rect.x, world.y - self.rect.y + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_moves_camera_bound_walls() {
        let settings = Settings::default();
        let mut bounds = LevelBounds::street(&settings, 400.0);
        let right_before = bounds.right;
        bounds.scroll_to(50.0);
        assert_eq!(bounds.left.x, 49.0);
        assert_eq!(bounds.top.x, 49.0);
        assert_eq!(bounds.bottom.x, 49.0);
        assert_eq!(bounds.right, right_before);
    }

    #[test]
    fn test_camera_follows_past_half_screen_only() {
        let settings = Settings::default();
        let mut camera = Camera::new(&settings, 400.0);
        assert!(!camera.follow(30.0));
        assert_eq!(camera.x(), 0.0);

        assert!(camera.follow(70.0));
        assert!((camera.x() - 20.0).abs() < f32::EPSILON);

        // Walking back left never scrolls back.
        assert!(!camera.follow(40.0));
        assert!((camera.x() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_camera_clamped_to_level_end() {
        let settings = Settings::default();
        let mut camera = Camera::new(&settings, 400.0);
        camera.follow(1_000.0);
        assert!((camera.x() - 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_to_screen_applies_height() {
        let settings = Settings::default();
        let mut camera = Camera::new(&settings, 400.0);
        camera.rect.x = 10.0;
        let p = camera.to_screen(Vec2::new(30.0, 50.0), -8.0);
        assert_eq!(p, Vec2::new(20.0, 42.0));
    }

    #[test]
    fn test_first_hit_only_checks_listed_borders() {
        let settings = Settings::default();
        let bounds = LevelBounds::street(&settings, 400.0);
        let in_top_wall = Rect::new(10.0, 20.0, 4.0, 4.0);
        assert_eq!(
            bounds.first_hit(&in_top_wall, &Border::ALL),
            Some(Border::Top)
        );
        assert_eq!(bounds.first_hit(&in_top_wall, &[Border::Left]), None);
    }
}

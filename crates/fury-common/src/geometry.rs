//! 2D math shared by the simulation: vectors, rectangles and facing.
//!
//! World space is the street plane: `x` grows to the right, `y` grows towards
//! the bottom of the screen. Rectangles are stored as top-left corner plus
//! size, matching the offsets the sprite data is authored in.

use serde::{Deserialize, Serialize};

/// 2D vector for positions, offsets and velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new Vec2.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the length (magnitude) of the vector.
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns a normalized (unit length) version of the vector.
    /// Returns zero vector if the vector has zero length.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
            }
        } else {
            Self::ZERO
        }
    }

    /// Distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Axis-aligned rectangle (top-left corner + size).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns true if the rectangle has no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Checks if this rectangle overlaps another with a positive area.
    /// Empty rectangles never intersect anything.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Returns the rectangle translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Vec2) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.w, self.h)
    }

    /// Mirrors an anchor-relative offset rectangle around the anchor's
    /// vertical axis.
    #[must_use]
    pub fn mirrored_x(&self) -> Self {
        Self::new(-(self.x + self.w), self.y, self.w, self.h)
    }
}

/// One of the four cardinal facings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Facing up (into the screen)
    Up,
    /// Facing down (out of the screen)
    Down,
    /// Facing left
    Left,
    /// Facing right (default)
    #[default]
    Right,
}

impl Direction {
    /// Horizontal sign of the facing: -1 for left, +1 for right, 0 otherwise.
    #[must_use]
    pub const fn x_sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
            Direction::Up | Direction::Down => 0.0,
        }
    }

    /// Horizontal opposite; vertical facings are unchanged.
    #[must_use]
    pub const fn flipped_x(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            other => other,
        }
    }

    /// Facing towards `target` from `from` along x; `None` when aligned.
    #[must_use]
    pub fn towards_x(from: f32, target: f32) -> Option<Self> {
        if target < from {
            Some(Direction::Left)
        } else if target > from {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection_requires_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 5.0, 5.0);
        let overlapping = Rect::new(9.0, 9.0, 5.0, 5.0);
        let empty = Rect::new(2.0, 2.0, 0.0, 4.0);

        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(!a.intersects(&empty));
    }

    #[test]
    fn test_rect_mirror_around_anchor() {
        let offsets = Rect::new(2.0, -10.0, 6.0, 4.0);
        let mirrored = offsets.mirrored_x();
        assert_eq!(mirrored, Rect::new(-8.0, -10.0, 6.0, 4.0));
        assert_eq!(mirrored.mirrored_x(), offsets);
    }

    #[test]
    fn test_vec2_normalize() {
        let v = Vec2::new(3.0, 4.0);
        assert!((v.length() - 5.0).abs() < f32::EPSILON);
        let n = v.normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::Left.x_sign(), -1.0);
        assert_eq!(Direction::Right.flipped_x(), Direction::Left);
        assert_eq!(Direction::Up.flipped_x(), Direction::Up);
        assert_eq!(Direction::towards_x(5.0, 1.0), Some(Direction::Left));
        assert_eq!(Direction::towards_x(5.0, 5.0), None);
    }
}

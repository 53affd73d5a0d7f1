//! # Fury Common
//!
//! Common types and shared abstractions for Fists of Fury.
//!
//! This crate provides foundational types used across the simulation:
//! - Entity handles and the handle generator
//! - 2D math (vectors, rectangles, facing)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod geometry;
pub mod ids;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::geometry::*;
    pub use crate::ids::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_handle_generation() {
        let mut gen = HandleGenerator::new();
        let id1 = gen.generate();
        let id2 = gen.generate();
        assert_ne!(id1, id2);
    }

    proptest! {
        #[test]
        fn prop_intersection_is_symmetric(
            ax in -50.0f32..50.0, ay in -50.0f32..50.0, aw in 0.0f32..20.0, ah in 0.0f32..20.0,
            bx in -50.0f32..50.0, by in -50.0f32..50.0, bw in 0.0f32..20.0, bh in 0.0f32..20.0,
        ) {
            let a = Rect::new(ax, ay, aw, ah);
            let b = Rect::new(bx, by, bw, bh);
            prop_assert_eq!(a.intersects(&b), b.intersects(&a));
        }
    }
}

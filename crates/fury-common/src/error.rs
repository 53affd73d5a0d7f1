//! Error types for Fists of Fury.
//!
//! The simulation has no recoverable I/O: every variant here describes a
//! logic defect (a broken invariant) that the frame driver treats as fatal.
//! Expected "nothing there" outcomes such as a missing attack slot or an empty
//! flight path are modelled as `Option`s by the callers, never as errors.

use thiserror::Error;

use crate::ids::EntityHandle;

/// Top-level error type for simulation operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Animation clock errors
    #[error("Animation error: {0}")]
    Animation(#[from] AnimationError),

    /// Entity bookkeeping errors
    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),

    /// Settings errors
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),
}

/// Animation clock errors.
#[derive(Debug, Error)]
pub enum AnimationError {
    /// The clock was started before sprite metadata was bound to it
    #[error("animation started without sprite metadata")]
    NoSprite,

    /// The requested animation row does not exist in the sprite
    #[error("animation index {index} out of range (sprite has {rows} rows)")]
    IndexOutOfRange {
        /// Requested row
        index: u32,
        /// Rows available
        rows: usize,
    },

    /// The requested animation row has no frames
    #[error("animation index {0} has no frames")]
    EmptyRow(u32),
}

/// Entity errors.
#[derive(Debug, Error)]
pub enum EntityError {
    /// A kind-specific routine received an entity of another kind
    #[error("entity {handle} is a {actual}, expected a {expected}")]
    KindMismatch {
        /// Entity handle
        handle: EntityHandle,
        /// Kind the routine expected
        expected: &'static str,
        /// Kind the entity actually has
        actual: &'static str,
    },
}

/// Settings errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings text could not be parsed
    #[error("failed to parse settings: {0}")]
    Parse(String),

    /// A tunable has a value the simulation cannot work with
    #[error("invalid setting {name}: {reason}")]
    Invalid {
        /// Setting name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Result type alias for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err: SimError = AnimationError::IndexOutOfRange { index: 9, rows: 3 }.into();
        assert_eq!(
            err.to_string(),
            "Animation error: animation index 9 out of range (sprite has 3 rows)"
        );

        let err: SimError = EntityError::KindMismatch {
            handle: EntityHandle::from_raw(4),
            expected: "barrel",
            actual: "enemy",
        }
        .into();
        assert!(err.to_string().contains("#4 is a enemy"));
    }
}

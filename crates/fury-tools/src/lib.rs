//! # Fury Tools
//!
//! Development tools for Fists of Fury.
//!
//! This crate provides:
//! - Replay recording and determinism verification
//! - TOML scenarios describing a street, its line-up and scripted input
//! - Fixed timestep driver
//! - Headless runner behind the `fury-headless` binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod replay;
pub mod runner;
pub mod scenario;
pub mod timestep;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::replay::*;
    pub use crate::runner::*;
    pub use crate::scenario::*;
    pub use crate::timestep::*;
}

pub use prelude::*;

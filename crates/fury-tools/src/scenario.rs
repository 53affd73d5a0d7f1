//! Scripted scenarios loaded from TOML.
//!
//! A scenario names a street, overrides any tunables, lists what stands on
//! the street at the start and scripts the controller input tick by tick.
//!
//! ```toml
//! name = "alley"
//! level_width = 960.0
//! ticks = 600
//!
//! [settings]
//! enemy_health = 40
//!
//! [[spawns]]
//! kind = "player"
//! x = 40.0
//! y = 60.0
//!
//! [[spawns]]
//! kind = "enemy"
//! x = 200.0
//! y = 60.0
//! brute = true
//!
//! [[inputs]]
//! from = 0
//! to = 60
//! actions = ["MoveRight"]
//! ```

use std::path::Path;

use fury_common::{SimError, Vec2};
use fury_gameplay::{Action, CollectibleType, EnemyInit, InputState, Settings, SpriteCatalog, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timestep::FixedTimestep;

/// Scenario loading and setup errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not describe a scenario
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field has a value the runner cannot work with
    #[error("invalid scenario field {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The simulation refused the setup
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),
}

/// Something standing on the street when the scenario starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpawnSpec {
    /// The player
    Player {
        /// Street x
        x: f32,
        /// Street depth
        y: f32,
    },
    /// An enemy
    Enemy {
        /// Street x
        x: f32,
        /// Street depth
        y: f32,
        /// Spawn a brute instead of a thug
        #[serde(default)]
        brute: bool,
        /// Carries one knife
        #[serde(default)]
        knife: bool,
        /// Never runs out of knives
        #[serde(default)]
        endless_knives: bool,
        /// Carries a gun
        #[serde(default)]
        gun: bool,
    },
    /// A barrel
    Barrel {
        /// Street x
        x: f32,
        /// Street depth
        y: f32,
    },
    /// An item lying on the street
    Collectible {
        /// Street x
        x: f32,
        /// Street depth
        y: f32,
        /// Item type
        item: CollectibleType,
    },
}

/// Actions held over a range of ticks, `from` inclusive, `to` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpan {
    /// First tick the actions are held
    pub from: u64,
    /// First tick they are released again
    pub to: u64,
    /// Held actions
    pub actions: Vec<Action>,
}

impl InputSpan {
    /// Whether the span covers `tick`.
    #[must_use]
    pub const fn covers(&self, tick: u64) -> bool {
        tick >= self.from && tick < self.to
    }
}

fn default_level_width() -> f32 {
    960.0
}

fn default_fixed_dt() -> f32 {
    1.0 / 60.0
}

fn default_time_scale() -> f32 {
    1.0
}

/// A complete scripted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Name shown in logs and summaries
    #[serde(default)]
    pub name: String,
    /// Street length in pixels
    #[serde(default = "default_level_width")]
    pub level_width: f32,
    /// Tunables; omitted fields keep their defaults
    #[serde(default)]
    pub settings: Settings,
    /// Starting line-up, spawned in order
    #[serde(default)]
    pub spawns: Vec<SpawnSpec>,
    /// Scripted input
    #[serde(default)]
    pub inputs: Vec<InputSpan>,
    /// Ticks to simulate
    pub ticks: u64,
    /// Seconds per tick
    #[serde(default = "default_fixed_dt")]
    pub fixed_dt: f32,
    /// Multiplier applied to the simulated delta
    #[serde(default = "default_time_scale")]
    pub time_scale: f32,
    /// Seconds of wall time per driven frame; defaults to `fixed_dt`
    #[serde(default)]
    pub frame_dt: Option<f32>,
}

impl Scenario {
    /// Parse and validate a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load and validate a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), name = %scenario.name, "scenario loaded");
        Ok(scenario)
    }

    /// Check every field the runner depends on.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let invalid = |field, reason: &str| ScenarioError::Invalid {
            field,
            reason: reason.to_string(),
        };
        if self.ticks == 0 {
            return Err(invalid("ticks", "must be positive"));
        }
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(invalid("fixed_dt", "must be a positive number of seconds"));
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return Err(invalid("time_scale", "must not be negative"));
        }
        if let Some(frame_dt) = self.frame_dt {
            if !(frame_dt.is_finite() && frame_dt > 0.0) {
                return Err(invalid("frame_dt", "must be a positive number of seconds"));
            }
        }
        if !self.level_width.is_finite() || self.level_width < self.settings.screen_width {
            return Err(invalid("level_width", "must be at least one screen wide"));
        }
        if let Some(span) = self.inputs.iter().find(|span| span.from > span.to) {
            return Err(ScenarioError::Invalid {
                field: "inputs",
                reason: format!("span {}..{} runs backwards", span.from, span.to),
            });
        }
        let players = self
            .spawns
            .iter()
            .filter(|spawn| matches!(spawn, SpawnSpec::Player { .. }))
            .count();
        if players > 1 {
            return Err(invalid("spawns", "at most one player"));
        }
        self.settings
            .validate()
            .map_err(|e| ScenarioError::Sim(e.into()))
    }

    /// Controller state at tick `tick` (counted from 0).
    #[must_use]
    pub fn input_at(&self, tick: u64) -> InputState {
        self.inputs
            .iter()
            .filter(|span| span.covers(tick))
            .flat_map(|span| span.actions.iter().copied())
            .fold(InputState::IDLE, InputState::with)
    }

    /// Wall time per driven frame.
    #[must_use]
    pub fn frame_dt(&self) -> f32 {
        self.frame_dt.unwrap_or(self.fixed_dt)
    }

    /// Timestep driver matching this scenario.
    #[must_use]
    pub fn timestep(&self) -> FixedTimestep {
        FixedTimestep::new(self.fixed_dt).with_time_scale(self.time_scale)
    }

    /// Build the world in its starting state.
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        let mut world = World::new(self.settings.clone(), SpriteCatalog::default(), self.level_width)?;
        for spawn in &self.spawns {
            match *spawn {
                SpawnSpec::Player { x, y } => {
                    world.spawn_player(Vec2::new(x, y))?;
                }
                SpawnSpec::Enemy {
                    x,
                    y,
                    brute,
                    knife,
                    endless_knives,
                    gun,
                } => {
                    let pos = Vec2::new(x, y);
                    let mut init = if brute {
                        EnemyInit::brute(pos, &self.settings)
                    } else {
                        EnemyInit::new(pos, &self.settings)
                    };
                    if knife {
                        init = init.with_knife();
                    }
                    if endless_knives {
                        init = init.spawning_knives();
                    }
                    if gun {
                        init = init.with_gun();
                    }
                    world.spawn_enemy(&init)?;
                }
                SpawnSpec::Barrel { x, y } => {
                    world.spawn_barrel(Vec2::new(x, y))?;
                }
                SpawnSpec::Collectible { x, y, item } => {
                    world.spawn_collectible(item, Vec2::new(x, y))?;
                }
            }
        }
        tracing::info!(
            name = %self.name,
            entities = world.entities().len(),
            ticks = self.ticks,
            "scenario world built"
        );
        Ok(world)
    }
}

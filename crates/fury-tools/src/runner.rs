//! Headless scenario runner.
//!
//! Drives a [`World`] through a scenario with a
//! [`FixedTimestep`](crate::timestep::FixedTimestep), tallies
//! the events it publishes and reports the outcome as a serializable
//! summary.

use std::collections::BTreeMap;

use fury_common::SimError;
use fury_gameplay::{EntityType, EventHandler, GameEvent, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replay::{Replay, ReplayError, ReplayRecorder, StateHash};
use crate::scenario::{Scenario, ScenarioError};

/// Errors from a headless run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The scenario could not be loaded or set up
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// The simulation failed mid-run
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    /// Recording or hashing failed
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Per-kind counters built from the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
    /// Events seen, by event name
    pub events: BTreeMap<String, usize>,
    /// Deaths, by entity kind
    pub deaths: BTreeMap<String, usize>,
    /// Health lost across all entities
    pub damage_dealt: i64,
}

/// Short name of an event variant.
#[must_use]
pub const fn event_name(event: &GameEvent) -> &'static str {
    match event {
        GameEvent::EntitySpawned { .. } => "entity_spawned",
        GameEvent::EntityRemoved { .. } => "entity_removed",
        GameEvent::EntityDamaged { .. } => "entity_damaged",
        GameEvent::EntityDied { .. } => "entity_died",
        GameEvent::ItemPickedUp { .. } => "item_picked_up",
        GameEvent::SlotClaimed { .. } => "slot_claimed",
        GameEvent::SlotReleased { .. } => "slot_released",
        GameEvent::BulletFired { .. } => "bullet_fired",
    }
}

impl EventHandler for EventTally {
    fn handle(&mut self, event: &GameEvent) {
        *self.events.entry(event_name(event).to_string()).or_default() += 1;
        match event {
            GameEvent::EntityDied { kind, .. } => {
                *self.deaths.entry(kind.name().to_string()).or_default() += 1;
            }
            GameEvent::EntityDamaged { amount, .. } => {
                self.damage_dealt += i64::from(*amount);
            }
            _ => {}
        }
    }
}

/// Where the player ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Health left
    pub health: i32,
    /// State name
    pub state: String,
    /// Street x
    pub x: f32,
    /// Street depth
    pub y: f32,
}

/// Outcome of a headless run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name
    pub scenario: String,
    /// Ticks simulated
    pub ticks: u64,
    /// Scaled seconds simulated
    pub sim_time: f64,
    /// Surviving player, if any
    pub player: Option<PlayerSummary>,
    /// Live entities at the end, by kind
    pub entities: BTreeMap<String, usize>,
    /// Left edge of the camera at the end
    pub camera_x: f32,
    /// Event counters
    pub tally: EventTally,
    /// Combined hash of the final state
    pub final_hash: u64,
}

/// Runs one scenario to completion.
#[derive(Debug)]
pub struct Runner {
    scenario: Scenario,
    world: World,
    tally: EventTally,
    recorder: Option<ReplayRecorder>,
    ticks: u64,
}

impl Runner {
    /// Build the scenario's world.
    pub fn new(scenario: Scenario) -> Result<Self, RunError> {
        scenario.validate()?;
        let world = scenario.build_world()?;
        Ok(Self {
            scenario,
            world,
            tally: EventTally::default(),
            recorder: None,
            ticks: 0,
        })
    }

    /// Record a replay while running, hashing every `hash_interval` ticks.
    #[must_use]
    pub fn recording(mut self, hash_interval: u64) -> Self {
        let mut recorder = ReplayRecorder::new(self.scenario.clone(), hash_interval);
        recorder.start();
        self.recorder = Some(recorder);
        self
    }

    /// The world being driven.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Run a single tick at scenario tick `self.ticks`.
    fn step(&mut self, dt: f32, dt_real: f32) -> Result<(), RunError> {
        let input = self.scenario.input_at(self.ticks);
        self.world.tick(input, dt, dt_real)?;
        self.world.events().dispatch(&mut self.tally);
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_tick(input, dt, dt_real, &self.world)?;
        }
        self.ticks += 1;
        tracing::trace!(tick = self.ticks, "headless tick");
        Ok(())
    }

    /// Drive frames through the fixed timestep until the scenario's tick count is reached.
    pub fn run(mut self) -> Result<(RunSummary, Option<Replay>), RunError> {
        let mut timestep = self.scenario.timestep();
        let deltas = timestep.deltas();
        let frame_dt = self.scenario.frame_dt();

        while self.ticks < self.scenario.ticks {
            let due = timestep.accumulate(frame_dt);
            for _ in 0..due {
                if self.ticks >= self.scenario.ticks {
                    break;
                }
                self.step(deltas.dt, deltas.dt_real)?;
            }
            if self.world.player_handle().is_none() && self.has_player_spawn() {
                tracing::info!(tick = self.ticks, "player gone, ending run early");
                break;
            }
        }

        let summary = self.summary()?;
        let replay = match self.recorder.take() {
            Some(recorder) => Some(recorder.finish(&self.world)?),
            None => None,
        };
        tracing::info!(
            scenario = %summary.scenario,
            ticks = summary.ticks,
            deaths = summary.tally.deaths.values().sum::<usize>(),
            "scenario finished"
        );
        Ok((summary, replay))
    }

    fn has_player_spawn(&self) -> bool {
        self.scenario
            .spawns
            .iter()
            .any(|spawn| matches!(spawn, crate::scenario::SpawnSpec::Player { .. }))
    }

    fn summary(&self) -> Result<RunSummary, RunError> {
        let player = self.world.player().map(|entity| PlayerSummary {
            health: entity.body.health,
            state: entity.state_name().to_string(),
            x: entity.body.pos.x,
            y: entity.body.pos.y,
        });
        let mut entities = BTreeMap::new();
        for entity in self.world.entities() {
            *entities
                .entry(entity.entity_type().name().to_string())
                .or_insert(0) += 1;
        }
        let final_hash = StateHash::capture(self.ticks, &self.world)?.combined();
        Ok(RunSummary {
            scenario: self.scenario.name.clone(),
            ticks: self.ticks,
            sim_time: self.world.time().now,
            player,
            entities,
            camera_x: self.world.camera().x(),
            tally: self.tally.clone(),
            final_hash,
        })
    }
}

/// Run `scenario` without recording.
pub fn run(scenario: Scenario) -> Result<RunSummary, RunError> {
    Runner::new(scenario)?.run().map(|(summary, _)| summary)
}

/// Count of live entities of `kind` in a summary.
#[must_use]
pub fn live_count(summary: &RunSummary, kind: EntityType) -> usize {
    summary.entities.get(kind.name()).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::verify;

    const PUNCH_BARREL: &str = r#"
        name = "punch-barrel"
        ticks = 480

        [settings]
        barrel_health = 1

        [[spawns]]
        kind = "player"
        x = 40.0
        y = 60.0

        [[spawns]]
        kind = "barrel"
        x = 56.0
        y = 60.0

        [[inputs]]
        from = 5
        to = 6
        actions = ["Attack"]
    "#;

    #[test]
    fn test_event_tally_counts() {
        let mut tally = EventTally::default();
        let handle = fury_common::EntityHandle::from_raw(3);
        tally.handle(&GameEvent::EntityDied {
            handle,
            kind: EntityType::Enemy,
        });
        tally.handle(&GameEvent::EntityDamaged {
            handle,
            amount: 7,
            severity: fury_gameplay::HitSeverity::Normal,
            remaining_health: 0,
        });
        assert_eq!(tally.events.get("entity_died"), Some(&1));
        assert_eq!(tally.deaths.get("enemy"), Some(&1));
        assert_eq!(tally.damage_dealt, 7);
    }

    #[test]
    fn test_idle_run_keeps_everyone() {
        let scenario = Scenario::from_toml_str(
            "name = \"idle\"\nticks = 30\n[[spawns]]\nkind = \"player\"\nx = 40.0\ny = 60.0\n\
             [[spawns]]\nkind = \"barrel\"\nx = 80.0\ny = 60.0",
        )
        .expect("scenario");
        let summary = run(scenario).expect("run");
        assert_eq!(summary.ticks, 30);
        assert!((summary.sim_time - 0.5).abs() < 1e-3);
        assert_eq!(live_count(&summary, EntityType::Barrel), 1);
        let player = summary.player.expect("player");
        assert_eq!(player.state, "standing");
        assert_eq!(summary.tally.events.get("entity_spawned"), Some(&2));
    }

    #[test]
    fn test_punch_breaks_barrel() {
        let scenario = Scenario::from_toml_str(PUNCH_BARREL).expect("scenario");
        let summary = run(scenario).expect("run");
        assert_eq!(summary.tally.deaths.get("barrel"), Some(&1));
        assert_eq!(live_count(&summary, EntityType::Barrel), 0);
        assert!(summary.tally.damage_dealt >= 1);
    }

    #[test]
    fn test_slow_frames_still_reach_tick_count() {
        let mut scenario = Scenario::from_toml_str(PUNCH_BARREL).expect("scenario");
        scenario.frame_dt = Some(scenario.fixed_dt / 3.0);
        let summary = run(scenario).expect("run");
        assert_eq!(summary.ticks, 480);
    }

    #[test]
    fn test_time_scale_slows_sim_clock() {
        let mut scenario = Scenario::from_toml_str(PUNCH_BARREL).expect("scenario");
        scenario.time_scale = 0.5;
        scenario.ticks = 60;
        let summary = run(scenario).expect("run");
        assert!((summary.sim_time - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_recorded_run_verifies() {
        let scenario = Scenario::from_toml_str(PUNCH_BARREL).expect("scenario");
        let (summary, replay) = Runner::new(scenario.clone())
            .expect("runner")
            .recording(60)
            .run()
            .expect("run");
        let replay = replay.expect("replay");
        assert_eq!(replay.frame_count(), summary.ticks);
        assert_eq!(verify(replay).expect("verify"), 8);

        let again = run(scenario).expect("rerun");
        assert_eq!(again.final_hash, summary.final_hash);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let scenario = Scenario::from_toml_str(PUNCH_BARREL).expect("scenario");
        let summary = run(scenario).expect("run");
        let json = serde_json::to_string(&summary).expect("json");
        let back: RunSummary = serde_json::from_str(&json).expect("parse");
        assert_eq!(back.tally, summary.tally);
        assert_eq!(back.final_hash, summary.final_hash);
    }
}

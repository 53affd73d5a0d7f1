//! Replay recording, playback and determinism checks.
//!
//! A replay stores the scenario a run started from plus the controller input
//! and deltas of every tick. State hashes taken at a fixed interval let a
//! later re-simulation prove it reached the same state.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::Path;

use fury_gameplay::{InputState, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scenario::Scenario;

/// Magic bytes for replay file format.
pub const REPLAY_MAGIC: &[u8; 4] = b"FRPL";

/// Current replay format version.
pub const REPLAY_VERSION: u32 = 1;

/// Largest payload [`Replay::load`] accepts.
pub const MAX_REPLAY_BYTES: u64 = 256 * 1024 * 1024;

/// Default hash capture interval, about once a second at 60 ticks.
pub const DEFAULT_HASH_INTERVAL: u64 = 60;

/// Error types for replay operations.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// IO error during read/write
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Unsupported replay version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// The re-simulation could not be set up or failed mid-run
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Determinism verification failed
    #[error("Determinism failure at frame {frame}: expected {expected:#x}, got {actual:#x}")]
    DeterminismFailure {
        /// Frame where divergence occurred
        frame: u64,
        /// Expected hash
        expected: u64,
        /// Actual hash
        actual: u64,
    },
}

/// Input and deltas of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Frame number, counted from 0
    pub frame: u64,
    /// Controller state
    pub input: InputState,
    /// Scaled delta
    pub dt: f32,
    /// Unscaled delta
    pub dt_real: f32,
}

/// A state hash for determinism verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateHash {
    /// Frame this hash was captured after
    pub frame: u64,
    /// Hash of the tick counter, player handle and camera
    pub world_hash: u64,
    /// Hash of every live entity
    pub entity_hash: u64,
}

fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

impl StateHash {
    /// Creates a new state hash.
    #[must_use]
    pub const fn new(frame: u64, world_hash: u64, entity_hash: u64) -> Self {
        Self {
            frame,
            world_hash,
            entity_hash,
        }
    }

    /// Hash the world as it stands after `frame`.
    pub fn capture(frame: u64, world: &World) -> Result<Self, ReplayError> {
        let snapshot = world.snapshot();
        let encode = |e: bincode::Error| ReplayError::Serialization(e.to_string());
        let world_bytes =
            bincode::serialize(&(snapshot.tick, snapshot.player, snapshot.camera)).map_err(encode)?;
        let entity_bytes = bincode::serialize(snapshot.entities).map_err(encode)?;
        Ok(Self::new(
            frame,
            hash_bytes(&world_bytes),
            hash_bytes(&entity_bytes),
        ))
    }

    /// Computes a combined hash.
    #[must_use]
    pub fn combined(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.frame.hash(&mut hasher);
        self.world_hash.hash(&mut hasher);
        self.entity_hash.hash(&mut hasher);
        hasher.finish()
    }
}

/// Replay metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Version of the replay format
    pub version: u32,
    /// Human-readable name
    pub name: String,
    /// Description
    pub description: String,
    /// Duration in frames
    pub frame_count: u64,
    /// Simulated duration in seconds
    pub duration: f64,
}

impl Default for ReplayMetadata {
    fn default() -> Self {
        Self {
            version: REPLAY_VERSION,
            name: String::new(),
            description: String::new(),
            frame_count: 0,
            duration: 0.0,
        }
    }
}

/// A complete replay recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Metadata about the replay
    pub metadata: ReplayMetadata,
    /// Setup the run started from
    pub scenario: Scenario,
    /// All recorded frames
    pub frames: Vec<InputFrame>,
    /// State hashes for verification (sparse, captured at intervals)
    pub state_hashes: Vec<StateHash>,
    /// Hash capture interval (every N frames, 0 = disabled)
    pub hash_interval: u64,
}

impl Replay {
    /// Creates an empty replay of `scenario`.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        Self {
            metadata: ReplayMetadata {
                name: scenario.name.clone(),
                ..ReplayMetadata::default()
            },
            scenario,
            frames: Vec::new(),
            state_hashes: Vec::new(),
            hash_interval: DEFAULT_HASH_INTERVAL,
        }
    }

    /// Returns the total frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames.len() as u64
    }

    /// Simulated seconds covered by the recording.
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.frames.iter().map(|f| f64::from(f.dt)).sum()
    }

    /// Finds the state hash for a given frame.
    #[must_use]
    pub fn find_hash_at(&self, frame: u64) -> Option<&StateHash> {
        self.state_hashes.iter().find(|h| h.frame == frame)
    }

    /// Finds the nearest state hash at or before a given frame.
    #[must_use]
    pub fn find_hash_before(&self, frame: u64) -> Option<&StateHash> {
        self.state_hashes
            .iter()
            .filter(|h| h.frame <= frame)
            .max_by_key(|h| h.frame)
    }

    /// Serializes the replay to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>, ReplayError> {
        serde_json::to_vec(self).map_err(|e| ReplayError::Serialization(e.to_string()))
    }

    /// Deserializes a replay from JSON bytes.
    pub fn from_json(data: &[u8]) -> Result<Self, ReplayError> {
        serde_json::from_slice(data).map_err(|e| ReplayError::Deserialization(e.to_string()))
    }

    /// Saves the replay to a writer: magic, version, payload length, JSON payload.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<(), ReplayError> {
        writer.write_all(REPLAY_MAGIC)?;
        writer.write_all(&REPLAY_VERSION.to_le_bytes())?;

        let json = self.to_json()?;
        let len = json.len() as u64;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&json)?;
        Ok(())
    }

    /// Loads a replay from a reader.
    pub fn load<R: Read>(mut reader: R) -> Result<Self, ReplayError> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != REPLAY_MAGIC {
            return Err(ReplayError::InvalidFormat("Invalid magic bytes".into()));
        }

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version > REPLAY_VERSION {
            return Err(ReplayError::UnsupportedVersion(version));
        }

        let mut len_bytes = [0u8; 8];
        reader.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        if len > MAX_REPLAY_BYTES {
            return Err(ReplayError::InvalidFormat(format!(
                "payload of {len} bytes exceeds {MAX_REPLAY_BYTES}"
            )));
        }

        // Grow with the data actually present, not the declared length.
        let mut json = Vec::new();
        reader.take(len).read_to_end(&mut json)?;
        if json.len() as u64 != len {
            return Err(ReplayError::InvalidFormat(format!(
                "payload truncated: {} of {len} bytes",
                json.len()
            )));
        }
        Self::from_json(&json)
    }

    /// Saves the replay to a file.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let file = std::fs::File::create(path)?;
        self.save(std::io::BufWriter::new(file))
    }

    /// Loads a replay from a file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = std::fs::File::open(path)?;
        Self::load(std::io::BufReader::new(file))
    }
}

/// Records a run tick by tick.
#[derive(Debug)]
pub struct ReplayRecorder {
    replay: Replay,
    current_frame: u64,
    recording: bool,
}

impl ReplayRecorder {
    /// Creates a recorder for a run of `scenario`, hashing every `hash_interval` frames.
    #[must_use]
    pub fn new(scenario: Scenario, hash_interval: u64) -> Self {
        let mut replay = Replay::new(scenario);
        replay.hash_interval = hash_interval;
        Self {
            replay,
            current_frame: 0,
            recording: false,
        }
    }

    /// Sets the replay metadata.
    pub fn set_metadata(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.replay.metadata.name = name.into();
        self.replay.metadata.description = description.into();
    }

    /// Starts recording.
    pub fn start(&mut self) {
        self.recording = true;
        tracing::info!(name = %self.replay.metadata.name, "replay recording started");
    }

    /// Stops recording.
    pub fn stop(&mut self) {
        self.recording = false;
    }

    /// Returns whether recording is active.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.recording
    }

    /// Returns the next frame number.
    #[must_use]
    pub const fn current_frame(&self) -> u64 {
        self.current_frame
    }

    /// Record one tick after `world` has run it.
    pub fn record_tick(
        &mut self,
        input: InputState,
        dt: f32,
        dt_real: f32,
        world: &World,
    ) -> Result<(), ReplayError> {
        if !self.recording {
            return Ok(());
        }
        let frame = self.current_frame;
        self.replay.frames.push(InputFrame {
            frame,
            input,
            dt,
            dt_real,
        });
        let interval = self.replay.hash_interval;
        if interval > 0 && (frame + 1) % interval == 0 {
            self.replay.state_hashes.push(StateHash::capture(frame, world)?);
        }
        self.current_frame += 1;
        Ok(())
    }

    /// Finish recording, hashing the final state so every replay ends verified.
    pub fn finish(mut self, world: &World) -> Result<Replay, ReplayError> {
        self.stop();
        if let Some(last) = self.current_frame.checked_sub(1) {
            if self.replay.find_hash_at(last).is_none() {
                self.replay.state_hashes.push(StateHash::capture(last, world)?);
            }
        }
        self.replay.metadata.frame_count = self.current_frame;
        self.replay.metadata.duration = self.replay.total_duration();
        tracing::info!(
            frames = self.current_frame,
            hashes = self.replay.state_hashes.len(),
            "replay recording finished"
        );
        Ok(self.replay)
    }

    /// Returns a reference to the current replay state.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }
}

/// Plays back a replay frame by frame.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    index: usize,
}

impl ReplayPlayer {
    /// Creates a new player for the given replay.
    #[must_use]
    pub const fn new(replay: Replay) -> Self {
        Self { replay, index: 0 }
    }

    /// Returns the replay metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ReplayMetadata {
        &self.replay.metadata
    }

    /// Returns the current frame index.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.index
    }

    /// Returns the next frame and advances.
    pub fn next_frame(&mut self) -> Option<InputFrame> {
        let frame = self.replay.frames.get(self.index).copied()?;
        self.index += 1;
        Some(frame)
    }

    /// Jumps to a frame index, clamped to the end.
    pub fn seek(&mut self, frame_index: usize) {
        self.index = frame_index.min(self.replay.frames.len());
    }

    /// Back to the first frame.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Returns whether every frame has been played.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.index >= self.replay.frames.len()
    }

    /// Played fraction in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.replay.frames.is_empty() {
            return 1.0;
        }
        self.index as f64 / self.replay.frames.len() as f64
    }

    /// Compare a state captured after `actual.frame` with the recording.
    pub fn verify_state(&self, actual: &StateHash) -> Result<(), ReplayError> {
        if let Some(expected) = self.replay.find_hash_at(actual.frame) {
            if expected.combined() != actual.combined() {
                return Err(ReplayError::DeterminismFailure {
                    frame: actual.frame,
                    expected: expected.combined(),
                    actual: actual.combined(),
                });
            }
        }
        Ok(())
    }

    /// Returns a reference to the underlying replay.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Consumes the player and returns the replay.
    #[must_use]
    pub fn into_replay(self) -> Replay {
        self.replay
    }
}

/// Re-simulate `replay` from its scenario and check every recorded hash.
///
/// Returns the number of hashes that matched.
pub fn verify(replay: Replay) -> Result<usize, ReplayError> {
    let mut world = replay
        .scenario
        .build_world()
        .map_err(|e| ReplayError::Simulation(e.to_string()))?;
    let mut player = ReplayPlayer::new(replay);
    let mut matched = 0;

    while let Some(frame) = player.next_frame() {
        world
            .tick(frame.input, frame.dt, frame.dt_real)
            .map_err(|e| ReplayError::Simulation(e.to_string()))?;
        world.events().drain();

        if player.replay().find_hash_at(frame.frame).is_some() {
            let actual = StateHash::capture(frame.frame, &world)?;
            if let Err(err) = player.verify_state(&actual) {
                tracing::error!(frame = frame.frame, "replay diverged");
                return Err(err);
            }
            matched += 1;
        }
    }
    tracing::info!(
        frames = player.current_index(),
        hashes = matched,
        "replay verified"
    );
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fury_gameplay::Action;
    use std::io::Cursor;

    const BRAWL: &str = r#"
        name = "brawl"
        ticks = 90

        [[spawns]]
        kind = "player"
        x = 40.0
        y = 60.0

        [[spawns]]
        kind = "enemy"
        x = 90.0
        y = 60.0

        [[spawns]]
        kind = "barrel"
        x = 60.0
        y = 75.0

        [[inputs]]
        from = 0
        to = 20
        actions = ["MoveRight"]

        [[inputs]]
        from = 25
        to = 26
        actions = ["Attack"]
    "#;

    fn record(scenario: &Scenario, interval: u64) -> Replay {
        let mut world = scenario.build_world().expect("world");
        let mut recorder = ReplayRecorder::new(scenario.clone(), interval);
        recorder.start();
        let deltas = scenario.timestep().deltas();
        for tick in 0..scenario.ticks {
            let input = scenario.input_at(tick);
            world.tick(input, deltas.dt, deltas.dt_real).expect("tick");
            world.events().drain();
            recorder
                .record_tick(input, deltas.dt, deltas.dt_real, &world)
                .expect("record");
        }
        recorder.finish(&world).expect("finish")
    }

    #[test]
    fn test_state_hash_combined() {
        let hash1 = StateHash::new(0, 100, 200);
        let hash2 = StateHash::new(0, 100, 200);
        let hash3 = StateHash::new(0, 100, 201);

        assert_eq!(hash1.combined(), hash2.combined());
        assert_ne!(hash1.combined(), hash3.combined());
    }

    #[test]
    fn test_capture_tracks_state_changes() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let mut world = scenario.build_world().expect("world");
        let before = StateHash::capture(0, &world).expect("hash");
        assert_eq!(before, StateHash::capture(0, &world).expect("hash"));

        world
            .tick(InputState::IDLE.with(Action::MoveRight), 1.0 / 60.0, 1.0 / 60.0)
            .expect("tick");
        let after = StateHash::capture(0, &world).expect("hash");
        assert_ne!(before.world_hash, after.world_hash);
        assert_ne!(before.entity_hash, after.entity_hash);
    }

    #[test]
    fn test_recorder_hashes_at_interval() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let replay = record(&scenario, 30);
        assert_eq!(replay.frame_count(), 90);
        assert_eq!(replay.metadata.frame_count, 90);
        let frames: Vec<u64> = replay.state_hashes.iter().map(|h| h.frame).collect();
        assert_eq!(frames, vec![29, 59, 89]);
        assert!((replay.metadata.duration - 1.5).abs() < 1e-3);
        assert_eq!(replay.frames[0].input, InputState::IDLE.with(Action::MoveRight));
    }

    #[test]
    fn test_finish_hashes_last_frame() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let replay = record(&scenario, 0);
        assert_eq!(replay.state_hashes.len(), 1);
        assert_eq!(replay.find_hash_before(1000).map(|h| h.frame), Some(89));
    }

    #[test]
    fn test_stopped_recorder_ignores_ticks() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let world = scenario.build_world().expect("world");
        let mut recorder = ReplayRecorder::new(scenario, 10);
        recorder
            .record_tick(InputState::IDLE, 0.1, 0.1, &world)
            .expect("record");
        assert!(!recorder.is_recording());
        assert_eq!(recorder.current_frame(), 0);
        assert!(recorder.replay().frames.is_empty());
    }

    #[test]
    fn test_replay_save_load() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let replay = record(&scenario, 45);

        let mut buffer = Vec::new();
        replay.save(&mut buffer).expect("Failed to save");
        let loaded = Replay::load(Cursor::new(buffer)).expect("Failed to load");

        assert_eq!(loaded.frames, replay.frames);
        assert_eq!(loaded.state_hashes, replay.state_hashes);
        assert_eq!(loaded.scenario, replay.scenario);
    }

    #[test]
    fn test_replay_file_roundtrip() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let replay = record(&scenario, 45);
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("brawl.frpl");
        replay.save_to_file(&path).expect("save");
        let loaded = Replay::load_from_file(&path).expect("load");
        assert_eq!(verify(loaded).expect("verify"), 2);
    }

    #[test]
    fn test_replay_rejects_oversized_payload() {
        let mut header = Vec::new();
        header.extend_from_slice(REPLAY_MAGIC);
        header.extend_from_slice(&REPLAY_VERSION.to_le_bytes());
        header.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            Replay::load(Cursor::new(&header)),
            Err(ReplayError::InvalidFormat(_))
        ));

        let mut short = header[..8].to_vec();
        short.extend_from_slice(&1024u64.to_le_bytes());
        short.extend_from_slice(b"{}");
        assert!(matches!(
            Replay::load(Cursor::new(&short)),
            Err(ReplayError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_replay_invalid_magic() {
        let result = Replay::load(Cursor::new(b"BADM\x01\x00\x00\x00"));
        assert!(matches!(result, Err(ReplayError::InvalidFormat(_))));

        let mut future = Vec::new();
        future.extend_from_slice(REPLAY_MAGIC);
        future.extend_from_slice(&(REPLAY_VERSION + 1).to_le_bytes());
        assert!(matches!(
            Replay::load(Cursor::new(future)),
            Err(ReplayError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_player_walks_frames() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let mut player = ReplayPlayer::new(record(&scenario, 30));
        assert_eq!(player.progress(), 0.0);
        assert_eq!(player.next_frame().map(|f| f.frame), Some(0));
        player.seek(89);
        assert_eq!(player.next_frame().map(|f| f.frame), Some(89));
        assert!(player.is_complete());
        assert!(player.next_frame().is_none());
        assert_eq!(player.progress(), 1.0);
        player.reset();
        assert_eq!(player.current_index(), 0);
    }

    #[test]
    fn test_verify_detects_divergence() {
        let scenario = Scenario::from_toml_str(BRAWL).expect("scenario");
        let mut replay = record(&scenario, 30);
        assert_eq!(verify(replay.clone()).expect("verify"), 3);

        for frame in replay.frames.iter_mut().filter(|f| f.frame >= 10) {
            frame.input = InputState::IDLE.with(Action::MoveUp);
        }
        let err = verify(replay).expect_err("diverged");
        assert!(matches!(err, ReplayError::DeterminismFailure { frame: 29, .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ReplayError::DeterminismFailure {
            frame: 7,
            expected: 0xab,
            actual: 0xcd,
        };
        assert_eq!(
            err.to_string(),
            "Determinism failure at frame 7: expected 0xab, got 0xcd"
        );
    }
}

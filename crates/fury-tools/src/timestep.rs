//! Fixed timestep driver.
//!
//! Frame time is accumulated and paid out in whole simulation ticks. Each
//! tick runs with a scaled delta (`fixed_dt * time_scale`) for movement and
//! animation frames, and the unscaled `fixed_dt` for fades.

use serde::{Deserialize, Serialize};

/// Most ticks paid out for a single frame.
pub const MAX_UPDATES_PER_FRAME: u32 = 10;

/// Smallest accepted fixed delta, in seconds.
pub const MIN_FIXED_DT: f32 = 0.001;

/// Deltas handed to one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickDeltas {
    /// Scaled delta
    pub dt: f32,
    /// Unscaled delta
    pub dt_real: f32,
}

/// Accumulator that turns frame times into fixed ticks.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    fixed_dt: f32,
    time_scale: f32,
    accumulator: f32,
    ticks: u64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FixedTimestep {
    /// Create a driver ticking every `fixed_dt` seconds at normal speed.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(MIN_FIXED_DT),
            time_scale: 1.0,
            accumulator: 0.0,
            ticks: 0,
        }
    }

    /// Set the time scale used for the scaled delta.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.set_time_scale(time_scale);
        self
    }

    /// Change the time scale; negative values clamp to a full stop.
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale.max(0.0);
    }

    /// Fixed delta in seconds.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Current time scale.
    #[must_use]
    pub const fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Ticks paid out so far.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Deltas for every tick.
    #[must_use]
    pub fn deltas(&self) -> TickDeltas {
        TickDeltas {
            dt: self.fixed_dt * self.time_scale,
            dt_real: self.fixed_dt,
        }
    }

    /// Add a frame's worth of time and return how many ticks to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < MAX_UPDATES_PER_FRAME {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind after the cap: drop the backlog instead of spiralling.
        if self.accumulator > self.fixed_dt * 2.0 {
            tracing::warn!(
                backlog = self.accumulator,
                "fixed timestep fell behind, dropping backlog"
            );
            self.accumulator = 0.0;
        }

        self.ticks += u64::from(count);
        count
    }

    /// Fraction of a tick left in the accumulator, for interpolation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }

    /// Forget accumulated time (after a pause or a load).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tick_per_matching_frame() {
        let mut step = FixedTimestep::new(0.02);
        for _ in 0..5 {
            assert_eq!(step.accumulate(0.02), 1);
        }
        assert_eq!(step.ticks(), 5);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut step = FixedTimestep::new(0.02);
        assert_eq!(step.accumulate(0.01), 0);
        assert!((step.alpha() - 0.5).abs() < 1e-4);
        assert_eq!(step.accumulate(0.0125), 1);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut step = FixedTimestep::new(0.01);
        assert_eq!(step.accumulate(1.0), MAX_UPDATES_PER_FRAME);
        assert_eq!(step.alpha(), 0.0);
    }

    #[test]
    fn test_time_scale_only_scales_dt() {
        let step = FixedTimestep::new(0.02).with_time_scale(0.5);
        let deltas = step.deltas();
        assert!((deltas.dt - 0.01).abs() < 1e-6);
        assert!((deltas.dt_real - 0.02).abs() < 1e-6);

        let frozen = FixedTimestep::new(0.02).with_time_scale(-3.0);
        assert_eq!(frozen.deltas().dt, 0.0);
    }
}

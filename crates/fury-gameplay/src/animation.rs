//! Animation clock.
//!
//! Every entity owns one [`Animation`]. It runs up to three independent
//! timelines:
//!
//! - the sprite-frame timeline, advanced by scaled time
//! - an optional [`Fadeout`], advanced by real time so cosmetic fades ignore
//!   slow motion
//! - an optional [`Rotation`], advanced by scaled time
//!
//! The frame timeline accumulates integer microseconds rather than reading a
//! wall clock, so pausing and time scaling are exact and a looping clock with
//! `N` frames of duration `D` is back on frame 0 after exactly `N·D`.

use std::sync::Arc;

use fury_common::AnimationError;
use serde::{Deserialize, Serialize};

use crate::sprite::SpriteSheet;

/// Frame duration used when a state does not ask for another one.
pub const DEFAULT_FRAME_DURATION: f32 = 0.1;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Negative and non-finite steps count as no time at all.
fn sanitize_dt(seconds: f32) -> f32 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}

fn to_micros(seconds: f32) -> u64 {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }
    (f64::from(seconds) * MICROS_PER_SECOND).round() as u64
}

/// Fade-out sub-timeline, in visible percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fadeout {
    /// Whether the fade runs
    pub enabled: bool,
    /// Restart from `visible_start` after reaching `visible_end`
    pub looping: bool,
    /// Visibility when the fade starts
    pub visible_start: f32,
    /// Visibility at which the fade is done
    pub visible_end: f32,
    /// Current visibility
    pub visible_current: f32,
    /// Percent lost per real second
    pub rate_per_sec: f32,
}

impl Fadeout {
    /// Fade from fully visible to invisible at `rate_per_sec` percent per second.
    #[must_use]
    pub const fn new(rate_per_sec: f32) -> Self {
        Self {
            enabled: true,
            looping: false,
            visible_start: 100.0,
            visible_end: 0.0,
            visible_current: 100.0,
            rate_per_sec,
        }
    }

    /// Fade between custom visibility bounds.
    #[must_use]
    pub const fn with_range(mut self, start: f32, end: f32) -> Self {
        self.visible_start = start;
        self.visible_end = end;
        self.visible_current = start;
        self
    }

    /// Make the fade restart forever.
    #[must_use]
    pub const fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    fn reset(&mut self) {
        self.visible_current = self.visible_start;
    }

    fn advance(&mut self, dt_real: f32) {
        if !self.enabled {
            return;
        }
        self.visible_current -= self.rate_per_sec * sanitize_dt(dt_real);
        if self.visible_current <= self.visible_end {
            self.visible_current = if self.looping {
                self.visible_start
            } else {
                self.visible_end
            };
        }
    }

    /// Visibility reached the end threshold.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.visible_current <= self.visible_end
    }

    /// Visibility as a 0..=1 alpha for the draw collaborator.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.visible_current / 100.0).clamp(0.0, 1.0)
    }
}

/// Closed range of terminal angles, in absolute degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationRange {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl RotationRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Checks if an angle lies in the range.
    #[must_use]
    pub fn contains(&self, degrees: f32) -> bool {
        degrees >= self.min && degrees <= self.max
    }
}

/// Rotation sub-timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Whether the rotation runs
    pub enabled: bool,
    /// Spin forever
    pub looping: bool,
    /// Angle when the rotation (re)starts
    pub degrees_start: f32,
    /// Current angle
    pub degrees_current: f32,
    /// Signed spin speed
    pub deg_per_sec: f32,
    /// Full turns required before the rotation may settle
    pub rotations_min: u32,
    /// Angles the rotation may settle in; empty means any angle
    pub finish_ranges: Vec<RotationRange>,
    /// Absolute degrees swept since the start
    travelled: f32,
    /// The rotation entered a terminal range and stopped
    settled: bool,
}

impl Rotation {
    /// Spin at `deg_per_sec` from `degrees_start`, settling anywhere.
    #[must_use]
    pub fn new(degrees_start: f32, deg_per_sec: f32) -> Self {
        Self {
            enabled: true,
            looping: false,
            degrees_start,
            degrees_current: degrees_start,
            deg_per_sec,
            rotations_min: 0,
            finish_ranges: Vec::new(),
            travelled: 0.0,
            settled: false,
        }
    }

    /// A disabled rotation holding a fixed angle, so drawing keeps the
    /// orientation after settling.
    #[must_use]
    pub fn frozen(degrees: f32) -> Self {
        Self {
            enabled: false,
            ..Self::new(degrees, 0.0)
        }
    }

    /// Spin forever.
    #[must_use]
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Require full turns before settling.
    #[must_use]
    pub fn with_min_rotations(mut self, rotations: u32) -> Self {
        self.rotations_min = rotations;
        self
    }

    /// Add a terminal range.
    #[must_use]
    pub fn with_finish_range(mut self, range: RotationRange) -> Self {
        self.finish_ranges.push(range);
        self
    }

    fn reset(&mut self) {
        self.degrees_current = self.degrees_start;
        self.travelled = 0.0;
        self.settled = false;
    }

    /// Current angle folded into `0..360`.
    #[must_use]
    pub fn normalized(&self) -> f32 {
        (self.degrees_current % 360.0).abs()
    }

    /// Completed full turns.
    #[must_use]
    pub fn full_rotations(&self) -> u32 {
        (self.travelled / 360.0).floor() as u32
    }

    fn in_terminal_range(&self) -> bool {
        let angle = self.normalized();
        self.finish_ranges.is_empty() || self.finish_ranges.iter().any(|r| r.contains(angle))
    }

    fn may_settle(&self) -> bool {
        self.full_rotations() >= self.rotations_min && self.in_terminal_range()
    }

    /// Sweep in one-degree steps so a fast spin cannot jump over a narrow
    /// terminal range.
    ///
    /// The sweep stops one full turn past the required turns; a range not
    /// met by then is never met, so the rest of the step is applied at once.
    fn advance(&mut self, dt: f32) {
        if !self.enabled || self.settled {
            return;
        }
        let step = self.deg_per_sec * sanitize_dt(dt);
        if !step.is_finite() {
            return;
        }
        if self.looping {
            self.degrees_current += step;
            self.travelled += step.abs();
            return;
        }

        let sign = step.signum();
        let mut remaining = step.abs();
        let sweep_limit = 360.0 * (self.rotations_min as f32 + 1.0);
        let mut sweep = remaining.min((sweep_limit - self.travelled).max(0.0));
        remaining -= sweep;
        while sweep > 0.0 {
            let sub = sweep.min(1.0);
            self.degrees_current += sign * sub;
            self.travelled += sub;
            sweep -= sub;
            if self.may_settle() {
                self.settled = true;
                return;
            }
        }
        if remaining > 0.0 {
            self.degrees_current = (self.degrees_current + sign * remaining) % 360.0;
            self.travelled += remaining;
        }
    }

    /// Rotation stopped inside a terminal range after the required turns.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.settled || self.may_settle()
    }
}

/// Options for [`Animation::start`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimStartOpts {
    /// Sprite row
    pub index: u32,
    /// Restart the frame timeline after the last frame
    pub looping: bool,
    /// Seconds per frame
    pub frame_duration: f32,
    /// Optional fade
    pub fadeout: Option<Fadeout>,
    /// Optional rotation
    pub rotation: Option<Rotation>,
}

impl AnimStartOpts {
    /// Play row `index` once at the default frame duration.
    #[must_use]
    pub fn new(index: impl Into<u32>) -> Self {
        Self {
            index: index.into(),
            looping: false,
            frame_duration: DEFAULT_FRAME_DURATION,
            fadeout: None,
            rotation: None,
        }
    }

    /// Loop the frames.
    #[must_use]
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Set seconds per frame.
    #[must_use]
    pub fn with_frame_duration(mut self, seconds: f32) -> Self {
        self.frame_duration = seconds;
        self
    }

    /// Attach a fade.
    #[must_use]
    pub fn with_fadeout(mut self, fadeout: Fadeout) -> Self {
        self.fadeout = Some(fadeout);
        self
    }

    /// Attach a rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = Some(rotation);
        self
    }
}

/// Per-entity animation clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Animation {
    #[serde(skip)]
    sprite: Option<Arc<SpriteSheet>>,
    index: u32,
    frame_current: u32,
    frame_count: u32,
    frame_duration_us: u64,
    looping: bool,
    /// Time spent on the current frame
    elapsed_us: u64,
    /// A single-frame animation has shown its frame for a full duration
    single_frame_elapsed: bool,
    playing: bool,
    fadeout: Option<Fadeout>,
    rotation: Option<Rotation>,
}

impl Animation {
    /// Clock bound to sprite metadata but not started.
    #[must_use]
    pub fn new(sprite: Arc<SpriteSheet>) -> Self {
        Self {
            sprite: Some(sprite),
            ..Self::default()
        }
    }

    /// Bind (or rebind) sprite metadata.
    pub fn bind_sprite(&mut self, sprite: Arc<SpriteSheet>) {
        self.sprite = Some(sprite);
    }

    /// Bound sprite metadata.
    #[must_use]
    pub fn sprite(&self) -> Option<&SpriteSheet> {
        self.sprite.as_deref()
    }

    /// Reset every timeline and start playing `opts.index`.
    pub fn start(&mut self, opts: AnimStartOpts) -> Result<(), AnimationError> {
        let sprite = self.sprite.as_ref().ok_or(AnimationError::NoSprite)?;
        let frame_count = sprite.frames(opts.index)?;

        self.index = opts.index;
        self.frame_current = 0;
        self.frame_count = frame_count;
        self.frame_duration_us = to_micros(opts.frame_duration).max(1);
        self.looping = opts.looping;
        self.elapsed_us = 0;
        self.single_frame_elapsed = false;
        self.playing = true;
        self.fadeout = opts.fadeout.map(|mut f| {
            f.reset();
            f
        });
        self.rotation = opts.rotation.map(|mut r| {
            r.reset();
            r
        });
        Ok(())
    }

    /// Advance frames and rotation by scaled `dt`, the fade by `dt_real`.
    pub fn update(&mut self, dt: f32, dt_real: f32) {
        if !self.playing {
            return;
        }

        if let Some(fadeout) = &mut self.fadeout {
            fadeout.advance(dt_real);
        }
        if let Some(rotation) = &mut self.rotation {
            rotation.advance(dt);
        }

        self.elapsed_us = self.elapsed_us.saturating_add(to_micros(dt));
        if self.frame_count <= 1 {
            if self.elapsed_us >= self.frame_duration_us {
                self.single_frame_elapsed = true;
            }
            return;
        }

        let steps = self.elapsed_us / self.frame_duration_us;
        if steps == 0 {
            return;
        }
        self.elapsed_us %= self.frame_duration_us;
        let count = u64::from(self.frame_count);
        let current = u64::from(self.frame_current);
        let last = count - 1;
        let next = if self.looping {
            (current + steps % count) % count
        } else if current + steps > last {
            // Freeze on the last frame until another animation starts.
            self.elapsed_us = 0;
            last
        } else {
            current + steps
        };
        self.frame_current = next as u32;
    }

    /// Every enabled, non-looping timeline reached its end.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        if !self.playing {
            return true;
        }
        if self.looping {
            return false;
        }
        let fade_loops = self.fadeout.is_some_and(|f| f.enabled && f.looping);
        let rotation_loops = self.rotation.as_ref().is_some_and(|r| r.enabled && r.looping);
        if fade_loops || rotation_loops {
            return false;
        }

        let frames_done = if self.frame_count <= 1 {
            self.single_frame_elapsed
        } else {
            self.frame_current == self.frame_count - 1
        };
        let fade_done = self.fadeout.map_or(true, |f| !f.enabled || f.is_finished());
        let rotation_done = self
            .rotation
            .as_ref()
            .map_or(true, |r| !r.enabled || r.is_finished());

        frames_done && fade_done && rotation_done
    }

    /// Current sprite row.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Current frame within the row.
    #[must_use]
    pub const fn frame(&self) -> u32 {
        self.frame_current
    }

    /// Frames in the current row.
    #[must_use]
    pub const fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Whether the frame timeline loops.
    #[must_use]
    pub const fn is_looping(&self) -> bool {
        self.looping
    }

    /// Whether [`Animation::start`] has been called.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Fade sub-timeline, if any.
    #[must_use]
    pub fn fadeout(&self) -> Option<&Fadeout> {
        self.fadeout.as_ref()
    }

    /// Rotation sub-timeline, if any.
    #[must_use]
    pub fn rotation(&self) -> Option<&Rotation> {
        self.rotation.as_ref()
    }

    /// Visibility percent for drawing (100 without a fade).
    #[must_use]
    pub fn visible_percent(&self) -> f32 {
        self.fadeout.map_or(100.0, |f| f.visible_current)
    }

    /// Draw angle in degrees (0 without a rotation).
    #[must_use]
    pub fn rotation_degrees(&self) -> f32 {
        self.rotation.as_ref().map_or(0.0, |r| r.degrees_current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clock(rows: Vec<u32>) -> Animation {
        Animation::new(Arc::new(SpriteSheet::new(16, 16, rows)))
    }

    #[test]
    fn test_start_requires_sprite() {
        let mut anim = Animation::default();
        assert!(matches!(
            anim.start(AnimStartOpts::new(0u32)),
            Err(AnimationError::NoSprite)
        ));
    }

    #[test]
    fn test_start_checks_index() {
        let mut anim = clock(vec![4, 2]);
        assert!(matches!(
            anim.start(AnimStartOpts::new(5u32)),
            Err(AnimationError::IndexOutOfRange { index: 5, rows: 2 })
        ));
    }

    #[test]
    fn test_unstarted_counts_as_finished() {
        let anim = clock(vec![4]);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_freeze_on_last_frame() {
        let mut anim = clock(vec![3]);
        anim.start(AnimStartOpts::new(0u32)).expect("start");
        assert!(!anim.is_finished());

        anim.update(0.1, 0.1);
        assert_eq!(anim.frame(), 1);
        anim.update(0.1, 0.1);
        assert_eq!(anim.frame(), 2);
        assert!(anim.is_finished());

        anim.update(1.0, 1.0);
        assert_eq!(anim.frame(), 2);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_large_step_advances_several_frames() {
        let mut anim = clock(vec![8]);
        anim.start(AnimStartOpts::new(0u32).looping()).expect("start");
        anim.update(0.35, 0.35);
        assert_eq!(anim.frame(), 3);
        assert!(!anim.is_finished());
    }

    #[test]
    fn test_single_frame_finishes_after_duration() {
        let mut anim = clock(vec![1]);
        anim.start(AnimStartOpts::new(0u32).with_frame_duration(0.2))
            .expect("start");
        anim.update(0.1, 0.1);
        assert!(!anim.is_finished());
        anim.update(0.1, 0.1);
        assert!(anim.is_finished());
        assert_eq!(anim.frame(), 0);
    }

    #[test]
    fn test_fade_uses_real_time() {
        let mut anim = clock(vec![1]);
        anim.start(AnimStartOpts::new(0u32).with_fadeout(Fadeout::new(100.0)))
            .expect("start");

        // Gameplay paused: frames hold still but the fade keeps going.
        anim.update(0.0, 0.5);
        assert!((anim.visible_percent() - 50.0).abs() < 1e-3);
        anim.update(0.0, 0.6);
        assert!(anim.fadeout().is_some_and(Fadeout::is_finished));
        // Frame timeline never elapsed.
        assert!(!anim.is_finished());

        anim.update(0.2, 0.0);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_looping_fade_never_finishes() {
        let mut anim = clock(vec![1]);
        anim.start(AnimStartOpts::new(0u32).with_fadeout(Fadeout::new(100.0).looping()))
            .expect("start");
        for _ in 0..50 {
            anim.update(0.1, 0.1);
        }
        assert!(!anim.is_finished());
    }

    #[test]
    fn test_rotation_settles_in_range() {
        let mut anim = clock(vec![1]);
        let rotation = Rotation::new(0.0, 1200.0)
            .with_min_rotations(1)
            .with_finish_range(RotationRange::new(89.0, 91.0));
        anim.start(AnimStartOpts::new(0u32).with_rotation(rotation))
            .expect("start");

        let mut ticks = 0;
        while !anim.is_finished() && ticks < 600 {
            anim.update(1.0 / 60.0, 1.0 / 60.0);
            ticks += 1;
        }
        assert!(anim.is_finished());
        let rotation = anim.rotation().expect("rotation");
        assert!(rotation.full_rotations() >= 1);
        assert!(RotationRange::new(89.0, 91.0).contains(rotation.normalized()));

        // Settled rotation stays put.
        let angle = anim.rotation_degrees();
        anim.update(0.5, 0.5);
        assert!((anim.rotation_degrees() - angle).abs() < f32::EPSILON);
    }

    #[test]
    fn test_negative_rotation_normalizes_to_positive() {
        let mut rotation = Rotation::new(0.0, -1000.0)
            .with_finish_range(RotationRange::new(269.0, 271.0));
        rotation.advance(0.27);
        assert!(rotation.is_finished());
        assert!(RotationRange::new(269.0, 271.0).contains(rotation.normalized()));
    }

    #[test]
    fn test_huge_step_settles_or_gives_up() {
        let mut reachable = Rotation::new(0.0, 2300.0)
            .with_min_rotations(2)
            .with_finish_range(RotationRange::new(179.0, 181.0));
        reachable.advance(1.0e9);
        assert!(reachable.is_finished());
        assert!(reachable.full_rotations() >= 2);

        // Nothing between whole degrees is ever swept onto.
        let mut unreachable = Rotation::new(0.0, 2300.0)
            .with_finish_range(RotationRange::new(10.25, 10.5));
        unreachable.advance(1.0e9);
        assert!(!unreachable.is_finished());
        assert!(unreachable.degrees_current.is_finite());
    }

    #[test]
    fn test_non_finite_step_is_ignored() {
        let mut anim = clock(vec![4]);
        let rotation = Rotation::new(0.0, 1200.0).with_finish_range(RotationRange::new(89.0, 91.0));
        anim.start(
            AnimStartOpts::new(0u32)
                .looping()
                .with_fadeout(Fadeout::new(100.0))
                .with_rotation(rotation),
        )
        .expect("start");
        anim.update(f32::NAN, f32::NAN);
        anim.update(f32::INFINITY, f32::INFINITY);
        assert_eq!(anim.frame(), 0);
        assert!((anim.visible_percent() - 100.0).abs() < 1e-3);
        assert!(anim.rotation_degrees().abs() < f32::EPSILON);

        anim.update(1.0e9, 1.0e9);
        assert!(anim.frame() < 4);
        assert!(anim.rotation_degrees().is_finite());
    }

    #[test]
    fn test_frozen_rotation_keeps_angle() {
        let mut anim = clock(vec![1]);
        anim.start(AnimStartOpts::new(0u32).with_rotation(Rotation::frozen(90.0)))
            .expect("start");
        anim.update(1.0, 1.0);
        assert!((anim.rotation_degrees() - 90.0).abs() < f32::EPSILON);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_start_resets_timelines() {
        let mut anim = clock(vec![4, 4]);
        anim.start(AnimStartOpts::new(0u32)).expect("start");
        anim.update(0.25, 0.25);
        assert_eq!(anim.frame(), 2);
        anim.start(AnimStartOpts::new(1u32)).expect("restart");
        assert_eq!(anim.index(), 1);
        assert_eq!(anim.frame(), 0);
    }

    proptest! {
        #[test]
        fn prop_non_looping_frames_never_decrease(
            frames in 2u32..12,
            steps in proptest::collection::vec(0.0f32..0.3, 1..80),
        ) {
            let mut anim = clock(vec![frames]);
            anim.start(AnimStartOpts::new(0u32)).expect("start");
            let mut last = anim.frame();
            for dt in steps {
                anim.update(dt, dt);
                prop_assert!(anim.frame() >= last);
                if last == frames - 1 {
                    prop_assert_eq!(anim.frame(), last);
                }
                last = anim.frame();
            }
        }

        #[test]
        fn prop_looping_wraps_after_full_cycle(
            frames in 1u32..12,
            duration_ms in 10u32..250,
            split in 1u32..4,
        ) {
            let duration = duration_ms as f32 / 1000.0;
            let mut anim = clock(vec![frames]);
            anim.start(AnimStartOpts::new(0u32).looping().with_frame_duration(duration))
                .expect("start");
            // N·D of scaled time, fed either frame by frame or in bigger chunks.
            let chunk = duration * split as f32;
            let chunks = frames / split;
            for _ in 0..chunks {
                anim.update(chunk, chunk);
            }
            for _ in 0..(frames % split) {
                anim.update(duration, duration);
            }
            prop_assert_eq!(anim.frame(), 0);
        }
    }
}

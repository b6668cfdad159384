//! Fixed-step frame clock.
//!
//! The clock turns wall-clock samples into frame deltas and feeds them into
//! an accumulator that is drained one fixed step at a time. All arithmetic
//! is on [`Duration`], so accumulated time is exact to the nanosecond.

use std::time::{Duration, Instant};

use crate::config::LoopConfig;

/// Result of sampling the clock for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDelta {
    /// Time since the previous sample, as measured.
    pub raw: Duration,
    /// Time fed to the accumulator, after clamping.
    pub delta: Duration,
}

impl FrameDelta {
    /// Returns `true` if the raw delta exceeded the clamp.
    #[must_use]
    pub fn was_clamped(&self) -> bool {
        self.raw > self.delta
    }
}

/// Accumulator-based clock owned by the game loop.
#[derive(Debug, Clone)]
pub struct FrameClock {
    fixed_step: Duration,
    max_frame_delta: Duration,
    max_steps_per_frame: u32,
    last_sample: Option<Instant>,
    accumulator: Duration,
    simulated: Duration,
}

impl FrameClock {
    /// Creates a stopped clock with the step size and caps of `config`.
    #[must_use]
    pub fn new(config: &LoopConfig) -> Self {
        Self {
            fixed_step: config.fixed_step(),
            max_frame_delta: config.max_frame_delta(),
            max_steps_per_frame: config.max_fixed_steps_per_frame,
            last_sample: None,
            accumulator: Duration::ZERO,
            simulated: Duration::ZERO,
        }
    }

    /// Starts a fresh session at `now`: empty accumulator, zero sim time.
    pub fn restart(&mut self, now: Instant) {
        self.last_sample = Some(now);
        self.accumulator = Duration::ZERO;
        self.simulated = Duration::ZERO;
    }

    /// Moves the reference sample to `now` without touching the
    /// accumulator, so time spent paused is not simulated.
    pub fn resample(&mut self, now: Instant) {
        self.last_sample = Some(now);
    }

    /// Forgets the reference sample and all accumulated time.
    pub fn clear(&mut self) {
        self.last_sample = None;
        self.accumulator = Duration::ZERO;
        self.simulated = Duration::ZERO;
    }

    /// Samples the clock at `now` and adds the clamped delta to the
    /// accumulator.
    ///
    /// A sample earlier than the previous one yields a zero delta. Without a
    /// previous sample the delta is zero.
    pub fn sample(&mut self, now: Instant) -> FrameDelta {
        let raw = self
            .last_sample
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_sample = Some(now);
        let delta = raw.min(self.max_frame_delta);
        self.accumulator += delta;
        FrameDelta { raw, delta }
    }

    /// Consumes one fixed step if one is available and `taken` steps have
    /// not yet reached the per-frame cap.
    pub fn try_step(&mut self, taken: u32) -> bool {
        if taken >= self.max_steps_per_frame || self.accumulator < self.fixed_step {
            return false;
        }
        self.accumulator -= self.fixed_step;
        self.simulated += self.fixed_step;
        true
    }

    /// Returns `true` if at least one whole step is still waiting.
    #[must_use]
    pub fn has_backlog(&self) -> bool {
        self.accumulator >= self.fixed_step
    }

    /// Fraction of a step left in the accumulator, capped at 1.
    ///
    /// Only reaches 1 while a backlog is being deferred.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        (self.accumulator.as_secs_f64() / self.fixed_step.as_secs_f64()).min(1.0)
    }

    /// Time accumulated but not yet consumed by a fixed step.
    #[must_use]
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Duration of one fixed step.
    #[must_use]
    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Total simulated time since the last restart.
    #[must_use]
    pub fn simulated(&self) -> Duration {
        self.simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(hz: f64, max_steps: u32) -> FrameClock {
        FrameClock::new(&LoopConfig {
            fixed_hz: hz,
            max_fixed_steps_per_frame: max_steps,
            ..LoopConfig::default()
        })
    }

    fn drain(clock: &mut FrameClock) -> u32 {
        let mut taken = 0;
        while clock.try_step(taken) {
            taken += 1;
        }
        taken
    }

    #[test]
    fn test_first_sample_after_restart() {
        let t0 = Instant::now();
        let mut clock = clock(50.0, 5);
        clock.restart(t0);
        let d = clock.sample(t0 + Duration::from_millis(30));
        assert_eq!(d.delta, Duration::from_millis(30));
        assert_eq!(drain(&mut clock), 1);
        assert_eq!(clock.accumulator(), Duration::from_millis(10));
        assert!((clock.alpha() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let t0 = Instant::now();
        let mut clock = clock(50.0, 100);
        clock.restart(t0);
        let d = clock.sample(t0 + Duration::from_secs(3));
        assert!(d.was_clamped());
        assert_eq!(d.delta, Duration::from_millis(250));
        assert_eq!(drain(&mut clock), 12);
        assert_eq!(clock.accumulator(), Duration::from_millis(10));
    }

    #[test]
    fn test_backwards_sample_is_zero() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut clock = clock(50.0, 5);
        clock.restart(t0);
        let d = clock.sample(t0 - Duration::from_millis(500));
        assert_eq!(d.delta, Duration::ZERO);
        assert_eq!(clock.accumulator(), Duration::ZERO);
    }

    #[test]
    fn test_step_cap_keeps_backlog() {
        let t0 = Instant::now();
        let mut clock = clock(50.0, 2);
        clock.restart(t0);
        clock.sample(t0 + Duration::from_millis(100));
        assert_eq!(drain(&mut clock), 2);
        assert!(clock.has_backlog());
        assert_eq!(clock.accumulator(), Duration::from_millis(60));
        assert_eq!(clock.alpha(), 1.0);
        assert_eq!(clock.simulated(), Duration::from_millis(40));
    }

    #[test]
    fn test_resample_keeps_accumulator() {
        let t0 = Instant::now();
        let mut clock = clock(50.0, 5);
        clock.restart(t0);
        clock.sample(t0 + Duration::from_millis(15));
        clock.resample(t0 + Duration::from_secs(5));
        let d = clock.sample(t0 + Duration::from_secs(5) + Duration::from_millis(10));
        assert_eq!(d.raw, Duration::from_millis(10));
        assert_eq!(clock.accumulator(), Duration::from_millis(25));
    }
}

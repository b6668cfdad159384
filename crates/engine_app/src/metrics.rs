//! Rolling frame statistics.

use std::collections::VecDeque;
use std::time::Duration;

/// Read-only frame statistics published by the game loop.
///
/// FPS and min/max frame times cover the most recent `window` frames;
/// counters cover the whole session.
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    window: VecDeque<Duration>,
    capacity: usize,
    window_total: Duration,
    frames: u64,
    fixed_steps: u64,
    spiral_trips: u64,
    budget_overruns: u64,
    backlog: Duration,
    simulated: Duration,
}

impl FrameMetrics {
    /// Create empty metrics averaging over `window` frames (at least 1).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let capacity = window.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            window_total: Duration::ZERO,
            frames: 0,
            fixed_steps: 0,
            spiral_trips: 0,
            budget_overruns: 0,
            backlog: Duration::ZERO,
            simulated: Duration::ZERO,
        }
    }

    /// Records one frame.
    pub(crate) fn record(&mut self, frame: FrameSample) {
        if self.window.len() == self.capacity {
            if let Some(oldest) = self.window.pop_front() {
                self.window_total -= oldest;
            }
        }
        self.window.push_back(frame.delta);
        self.window_total += frame.delta;

        self.frames += 1;
        self.fixed_steps += u64::from(frame.fixed_steps);
        self.spiral_trips += u64::from(frame.spiral_tripped);
        self.budget_overruns += u64::from(frame.over_budget);
        self.backlog = frame.backlog;
        self.simulated = frame.simulated;
    }

    /// Clears everything.
    pub fn reset(&mut self) {
        *self = Self::new(self.capacity);
    }

    /// Frames per second over the window, or 0 before time has passed.
    #[must_use]
    pub fn fps(&self) -> f64 {
        let secs = self.window_total.as_secs_f64();
        if secs > 0.0 {
            self.window.len() as f64 / secs
        } else {
            0.0
        }
    }

    /// Mean frame time over the window.
    #[must_use]
    pub fn average_frame_time(&self) -> Option<Duration> {
        let frames = u32::try_from(self.window.len()).ok().filter(|&n| n > 0)?;
        Some(self.window_total / frames)
    }

    /// Shortest frame in the window.
    #[must_use]
    pub fn min_frame_time(&self) -> Option<Duration> {
        self.window.iter().min().copied()
    }

    /// Longest frame in the window.
    #[must_use]
    pub fn max_frame_time(&self) -> Option<Duration> {
        self.window.iter().max().copied()
    }

    /// Frames ticked this session.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Fixed steps run this session.
    #[must_use]
    pub fn fixed_steps(&self) -> u64 {
        self.fixed_steps
    }

    /// Frames that hit the per-frame step cap with time left over.
    #[must_use]
    pub fn spiral_trips(&self) -> u64 {
        self.spiral_trips
    }

    /// Frames whose processing exceeded the configured budget.
    #[must_use]
    pub fn budget_overruns(&self) -> u64 {
        self.budget_overruns
    }

    /// Accumulated time not yet simulated.
    #[must_use]
    pub fn backlog(&self) -> Duration {
        self.backlog
    }

    /// Simulated time this session.
    #[must_use]
    pub fn simulated(&self) -> Duration {
        self.simulated
    }
}

/// What the loop observed during one frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameSample {
    /// Clamped frame delta.
    pub delta: Duration,
    /// Fixed passes run.
    pub fixed_steps: u32,
    /// Whether the step cap deferred a backlog.
    pub spiral_tripped: bool,
    /// Whether processing exceeded the frame budget.
    pub over_budget: bool,
    /// Accumulator after the frame.
    pub backlog: Duration,
    /// Simulated time after the frame.
    pub simulated: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ms: u64) -> FrameSample {
        FrameSample {
            delta: Duration::from_millis(ms),
            fixed_steps: 1,
            spiral_tripped: false,
            over_budget: false,
            backlog: Duration::ZERO,
            simulated: Duration::ZERO,
        }
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = FrameMetrics::new(10);
        assert_eq!(metrics.fps(), 0.0);
        assert!(metrics.average_frame_time().is_none());
        assert!(metrics.min_frame_time().is_none());
    }

    #[test]
    fn test_fps_over_window() {
        let mut metrics = FrameMetrics::new(4);
        for _ in 0..4 {
            metrics.record(frame(20));
        }
        assert!((metrics.fps() - 50.0).abs() < 1e-9);
        assert_eq!(metrics.average_frame_time(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut metrics = FrameMetrics::new(2);
        metrics.record(frame(100));
        metrics.record(frame(10));
        metrics.record(frame(30));
        assert_eq!(metrics.min_frame_time(), Some(Duration::from_millis(10)));
        assert_eq!(metrics.max_frame_time(), Some(Duration::from_millis(30)));
        assert!((metrics.fps() - 50.0).abs() < 1e-9);
        assert_eq!(metrics.frames(), 3);
        assert_eq!(metrics.fixed_steps(), 3);
    }

    #[test]
    fn test_counters_and_reset() {
        let mut metrics = FrameMetrics::new(8);
        metrics.record(FrameSample {
            spiral_tripped: true,
            over_budget: true,
            fixed_steps: 5,
            backlog: Duration::from_millis(80),
            ..frame(250)
        });
        assert_eq!(metrics.spiral_trips(), 1);
        assert_eq!(metrics.budget_overruns(), 1);
        assert_eq!(metrics.backlog(), Duration::from_millis(80));

        metrics.reset();
        assert_eq!(metrics.frames(), 0);
        assert_eq!(metrics.fixed_steps(), 0);
    }
}

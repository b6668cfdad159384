//! Frame drivers.
//!
//! A [`FrameDriver`] stands in for whatever platform signal produces frames
//! (a display refresh callback, a timer). The loop asks it for the next frame
//! instant and ticks with it; the loop itself never sleeps or reads a
//! platform timer.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Source of frame instants.
pub trait FrameDriver {
    /// Blocks until the next frame is due and returns its timestamp, or
    /// `None` when no more frames will come.
    fn next_frame(&mut self) -> Option<Instant>;
}

/// Real-time driver pacing frames to a target rate with `thread::sleep`.
#[derive(Debug, Clone)]
pub struct PacedDriver {
    interval: Duration,
    remaining: Option<u64>,
    next_due: Option<Instant>,
}

impl PacedDriver {
    /// Paces frames at `hz` frames per second, indefinitely.
    ///
    /// Non-positive or non-finite rates fall back to 60 Hz.
    #[must_use]
    pub fn new(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 60.0 };
        Self {
            interval: Duration::from_secs_f64(1.0 / hz),
            remaining: None,
            next_due: None,
        }
    }

    /// Stops after `frames` frames.
    #[must_use]
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }

    /// Time between frames.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl FrameDriver for PacedDriver {
    fn next_frame(&mut self) -> Option<Instant> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                std::thread::sleep(due - now);
            }
        }
        let frame = Instant::now();
        // A late frame re-anchors the schedule instead of bursting to catch up.
        self.next_due = Some(match self.next_due {
            Some(due) if due + self.interval > frame => due + self.interval,
            _ => frame + self.interval,
        });
        Some(frame)
    }
}

/// Deterministic driver replaying a fixed list of frame deltas.
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    now: Instant,
    deltas: VecDeque<Duration>,
}

impl ScriptedDriver {
    /// Frames at `start + d1`, `start + d1 + d2`, and so on.
    #[must_use]
    pub fn new(start: Instant, deltas: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            now: start,
            deltas: deltas.into_iter().collect(),
        }
    }

    /// `frames` frames spaced `delta` apart.
    #[must_use]
    pub fn uniform(start: Instant, delta: Duration, frames: usize) -> Self {
        Self::new(start, std::iter::repeat_n(delta, frames))
    }

    /// Frames not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.deltas.len()
    }
}

impl FrameDriver for ScriptedDriver {
    fn next_frame(&mut self) -> Option<Instant> {
        let delta = self.deltas.pop_front()?;
        self.now += delta;
        Some(self.now)
    }
}

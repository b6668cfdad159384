//! The game loop state machine.
//!
//! Per frame, while `Running`:
//!
//! 1. Sample the clock and clamp the frame delta.
//! 2. Run fixed passes while a whole step is accumulated, up to the
//!    per-frame cap. Time beyond the cap stays in the accumulator.
//! 3. Run the variable pass once with the frame delta.
//! 4. Publish the interpolation alpha and update frame metrics.
//!
//! ```text
//! Stopped --start--> Running --pause--> Paused --resume--> Running
//!    ^                  |                  |
//!    +------stop--------+-------stop-------+
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use engine_ecs::{EntityStore, RequestSender, WorldSnapshot};
use engine_system::{PassReport, System, SystemFault, SystemId, SystemScheduler};
use tracing::{debug, info, warn};

use crate::clock::FrameClock;
use crate::config::LoopConfig;
use crate::driver::FrameDriver;
use crate::error::LoopError;
use crate::metrics::{FrameMetrics, FrameSample};
use crate::render::RenderView;

/// Lifecycle state of a [`GameLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// No session; setup, import, and registration happen here.
    Stopped,
    /// Frames tick.
    Running,
    /// Session kept, ticking suspended, accumulator frozen.
    Paused,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
            Self::Paused => f.write_str("paused"),
        }
    }
}

/// Everything that happened during one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// Frame counter since start, starting at 1.
    pub frame: u64,
    /// Clamped time since the previous frame.
    pub frame_delta: Duration,
    /// Whether the raw delta was clamped.
    pub clamped: bool,
    /// Whether the per-frame step cap left whole steps in the accumulator.
    pub spiral_tripped: bool,
    /// Interpolation alpha after this frame.
    pub alpha: f64,
    /// One report per fixed pass, in order.
    pub fixed_passes: Vec<PassReport>,
    /// The frame's variable pass.
    pub variable_pass: PassReport,
}

impl FrameReport {
    /// Number of fixed passes run this frame.
    #[must_use]
    pub fn fixed_steps(&self) -> usize {
        self.fixed_passes.len()
    }

    /// Every system fault of the frame, fixed passes first.
    pub fn faults(&self) -> impl Iterator<Item = &SystemFault> {
        self.fixed_passes
            .iter()
            .chain(std::iter::once(&self.variable_pass))
            .flat_map(|pass| pass.faults.iter())
    }

    /// Returns `true` if no system faulted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults().next().is_none()
    }
}

/// Owns the store, the scheduler, and the clock of one simulation.
#[derive(Debug)]
pub struct GameLoop {
    config: LoopConfig,
    store: EntityStore,
    scheduler: SystemScheduler,
    clock: FrameClock,
    metrics: FrameMetrics,
    state: LoopState,
    alpha: f64,
    frame: u64,
}

impl GameLoop {
    /// Create a stopped loop with an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: LoopConfig) -> Result<Self, LoopError> {
        Self::with_store(config, EntityStore::new())
    }

    /// Create a stopped loop around an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidConfig`] if `config` does not validate.
    pub fn with_store(config: LoopConfig, store: EntityStore) -> Result<Self, LoopError> {
        config.validate()?;
        Ok(Self {
            clock: FrameClock::new(&config),
            metrics: FrameMetrics::new(config.fps_window),
            config,
            store,
            scheduler: SystemScheduler::new(),
            state: LoopState::Stopped,
            alpha: 0.0,
            frame: 0,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutable store access for setup and between-frame edits.
    pub fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Registered systems and their execution order.
    #[must_use]
    pub fn scheduler(&self) -> &SystemScheduler {
        &self.scheduler
    }

    /// Interpolation alpha published by the last frame.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Frame statistics for the current session.
    #[must_use]
    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    /// Time left in the fixed-step accumulator.
    #[must_use]
    pub fn accumulator(&self) -> Duration {
        self.clock.accumulator()
    }

    /// Handle for requesting structural changes from other threads.
    ///
    /// Requests land at the start of the next pass. Handles taken before a
    /// [`stop`](Self::stop) are disconnected by it.
    #[must_use]
    pub fn request_sender(&self) -> RequestSender {
        self.store.request_sender()
    }

    /// Read-only transforms plus the current alpha.
    #[must_use]
    pub fn render_view(&self) -> RenderView<'_> {
        RenderView::new(&self.store, self.alpha)
    }

    fn require_not_running(&self, operation: &'static str) -> Result<(), LoopError> {
        if self.state == LoopState::Running {
            return Err(LoopError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    // ── Systems ─────────────────────────────────────────────────────────

    /// Registers a system.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] while the loop is running.
    pub fn register<S: System + 'static>(&mut self, system: S) -> Result<SystemId, LoopError> {
        self.require_not_running("register")?;
        Ok(self.scheduler.register(system))
    }

    /// Removes a system. Returns `Ok(false)` if it was not registered.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] while the loop is running.
    pub fn unregister(&mut self, id: SystemId) -> Result<bool, LoopError> {
        self.require_not_running("unregister")?;
        Ok(self.scheduler.unregister(id))
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Captures the committed world.
    ///
    /// # Errors
    ///
    /// Propagates store errors as [`LoopError::Ecs`].
    pub fn snapshot(&self) -> Result<WorldSnapshot, LoopError> {
        Ok(self.store.snapshot()?)
    }

    /// Loads a snapshot into the (empty) store before starting.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] unless stopped, and store errors
    /// as [`LoopError::Ecs`].
    pub fn import(&mut self, snapshot: &WorldSnapshot) -> Result<(), LoopError> {
        if self.state != LoopState::Stopped {
            return Err(LoopError::InvalidState {
                operation: "import",
                state: self.state,
            });
        }
        Ok(self.store.import(snapshot)?)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Starts the loop now.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] unless stopped.
    pub fn start(&mut self) -> Result<(), LoopError> {
        self.start_at(Instant::now())
    }

    /// Starts the loop with `now` as the first clock sample.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] unless stopped.
    pub fn start_at(&mut self, now: Instant) -> Result<(), LoopError> {
        if self.state != LoopState::Stopped {
            return Err(LoopError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        self.clock.restart(now);
        self.metrics.reset();
        self.alpha = 0.0;
        self.frame = 0;
        self.state = LoopState::Running;
        info!(
            fixed_hz = self.config.fixed_hz,
            max_fixed_steps = self.config.max_fixed_steps_per_frame,
            systems = self.scheduler.len(),
            entities = self.store.entity_count(),
            "game loop started"
        );
        Ok(())
    }

    /// Suspends ticking. The accumulator is frozen. Pausing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] when stopped.
    pub fn pause(&mut self) -> Result<(), LoopError> {
        match self.state {
            LoopState::Running => {
                self.state = LoopState::Paused;
                info!(frame = self.frame, "game loop paused");
                Ok(())
            }
            LoopState::Paused => Ok(()),
            LoopState::Stopped => Err(LoopError::InvalidState {
                operation: "pause",
                state: self.state,
            }),
        }
    }

    /// Resumes ticking now.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] when stopped.
    pub fn resume(&mut self) -> Result<(), LoopError> {
        self.resume_at(Instant::now())
    }

    /// Resumes ticking, measuring the next frame from `now` so paused
    /// wall-clock time is not simulated. Resuming a running loop is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] when stopped.
    pub fn resume_at(&mut self, now: Instant) -> Result<(), LoopError> {
        match self.state {
            LoopState::Paused => {
                self.clock.resample(now);
                self.state = LoopState::Running;
                info!(frame = self.frame, "game loop resumed");
                Ok(())
            }
            LoopState::Running => Ok(()),
            LoopState::Stopped => Err(LoopError::InvalidState {
                operation: "resume",
                state: self.state,
            }),
        }
    }

    /// Stops the loop and tears down the session.
    ///
    /// Clears timing state and resets the store: entities, components, and
    /// queued changes are discarded and outstanding request senders are
    /// disconnected. Registered systems are kept. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        let frames = self.frame;
        self.state = LoopState::Stopped;
        self.clock.clear();
        self.alpha = 0.0;
        self.store.reset();
        info!(frames, "game loop stopped");
    }

    // ── Ticking ─────────────────────────────────────────────────────────

    /// Ticks with the current time. See [`tick_at`](Self::tick_at).
    pub fn tick(&mut self) -> Option<FrameReport> {
        self.tick_at(Instant::now())
    }

    /// Runs one frame at `now`. Returns `None` unless running.
    pub fn tick_at(&mut self, now: Instant) -> Option<FrameReport> {
        if self.state != LoopState::Running {
            return None;
        }
        let work_started = Instant::now();
        self.frame += 1;

        let sampled = self.clock.sample(now);
        if sampled.was_clamped() {
            warn!(
                frame = self.frame,
                raw_ms = sampled.raw.as_millis() as u64,
                clamped_ms = sampled.delta.as_millis() as u64,
                "frame delta clamped"
            );
        }

        let step_secs = self.clock.fixed_step().as_secs_f64();
        let mut fixed_passes = Vec::new();
        let mut taken = 0u32;
        while self.clock.try_step(taken) {
            fixed_passes.push(self.scheduler.run_fixed_pass(&mut self.store, step_secs));
            taken += 1;
        }

        let spiral_tripped = self.clock.has_backlog();
        if spiral_tripped {
            warn!(
                frame = self.frame,
                steps = taken,
                backlog_ms = self.clock.accumulator().as_millis() as u64,
                "fixed-step cap reached; deferring backlog"
            );
        }

        let variable_pass = self
            .scheduler
            .run_variable_pass(&mut self.store, sampled.delta.as_secs_f64());
        self.alpha = self.clock.alpha();

        let work = work_started.elapsed();
        let over_budget = self.config.frame_budget().is_some_and(|budget| work > budget);
        if over_budget {
            warn!(
                frame = self.frame,
                elapsed_ms = work.as_millis() as u64,
                budget_ms = self.config.frame_budget_ms,
                "frame exceeded time budget"
            );
        }

        self.metrics.record(FrameSample {
            delta: sampled.delta,
            fixed_steps: taken,
            spiral_tripped,
            over_budget,
            backlog: self.clock.accumulator(),
            simulated: self.clock.simulated(),
        });

        let report = FrameReport {
            frame: self.frame,
            frame_delta: sampled.delta,
            clamped: sampled.was_clamped(),
            spiral_tripped,
            alpha: self.alpha,
            fixed_passes,
            variable_pass,
        };
        debug!(
            frame = self.frame,
            dt = sampled.delta.as_secs_f64(),
            fixed_steps = taken,
            alpha = self.alpha,
            faults = report.faults().count(),
            "frame complete"
        );
        Some(report)
    }

    /// Ticks once per frame from `driver` until it runs dry or the loop
    /// leaves `Running`. Returns the number of frames ticked.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::InvalidState`] unless running.
    pub fn run<D: FrameDriver>(&mut self, driver: &mut D) -> Result<u64, LoopError> {
        if self.state != LoopState::Running {
            return Err(LoopError::InvalidState {
                operation: "run",
                state: self.state,
            });
        }
        let mut frames = 0;
        while self.state == LoopState::Running {
            let Some(now) = driver.next_frame() else {
                break;
            };
            if self.tick_at(now).is_some() {
                frames += 1;
            }
        }
        info!(frames, fps = self.metrics.fps(), "frame driver finished");
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use engine_component::{Component, QueryDescriptor};
    use engine_ecs::EcsError;
    use engine_math::{Transform3D, Vec3};
    use engine_system::{FnSystem, SystemDescriptor};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::driver::ScriptedDriver;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Health {
        current: i32,
        max: i32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    fn config(max_steps: u32, max_delta_ms: u64) -> LoopConfig {
        LoopConfig {
            fixed_hz: 60.0,
            max_fixed_steps_per_frame: max_steps,
            max_frame_delta_ms: max_delta_ms,
            ..LoopConfig::default()
        }
    }

    fn counting(counter: &Arc<Mutex<u32>>) -> impl System + use<> {
        let counter = Arc::clone(counter);
        FnSystem::new(SystemDescriptor::new("counter", QueryDescriptor::new()), move |_ctx| {
            *counter.lock().unwrap() += 1;
            Ok(())
        })
    }

    #[test]
    fn test_tick_requires_running() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        assert!(game.tick_at(Instant::now()).is_none());
        game.start_at(Instant::now()).unwrap();
        game.pause().unwrap();
        assert!(game.tick_at(Instant::now()).is_none());
    }

    #[test]
    fn test_spiral_guard_caps_steps_and_keeps_backlog() {
        let mut game = GameLoop::new(config(5, 20_000)).unwrap();
        let fixed = Arc::new(Mutex::new(0));
        game.register(counting(&fixed)).unwrap();

        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + Duration::from_secs(10)).unwrap();

        let step = game.config().fixed_step();
        assert_eq!(report.fixed_steps(), 5);
        assert_eq!(*fixed.lock().unwrap(), 5);
        assert!(report.spiral_tripped);
        assert_eq!(game.accumulator(), Duration::from_secs(10) - step * 5);
        assert_eq!(game.alpha(), 1.0);
        assert_eq!(game.metrics().spiral_trips(), 1);
    }

    #[test]
    fn test_default_clamp_limits_huge_delta() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + Duration::from_secs(10)).unwrap();
        assert!(report.clamped);
        assert_eq!(report.frame_delta, Duration::from_millis(250));
        assert_eq!(report.fixed_steps(), 5);
        assert_eq!(
            game.accumulator(),
            Duration::from_millis(250) - game.config().fixed_step() * 5
        );
    }

    #[test]
    fn test_backlog_drains_over_later_frames() {
        let mut game = GameLoop::new(config(2, 250)).unwrap();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let step = game.config().fixed_step();

        let first = game.tick_at(t0 + step * 5).unwrap();
        assert_eq!(first.fixed_steps(), 2);
        let second = game.tick_at(t0 + step * 5).unwrap();
        assert_eq!(second.fixed_steps(), 2);
        let third = game.tick_at(t0 + step * 5).unwrap();
        assert_eq!(third.fixed_steps(), 1);
        assert!(!third.spiral_tripped);
        assert_eq!(game.accumulator(), Duration::ZERO);
        assert_eq!(game.metrics().fixed_steps(), 5);
    }

    #[test]
    fn test_fixed_steps_match_total_time() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let fixed = Arc::new(Mutex::new(0));
        game.register(counting(&fixed)).unwrap();

        let deltas: Vec<Duration> = [7, 16, 33, 5, 20, 41, 16, 9, 12, 60]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        let total: Duration = deltas.iter().sum();
        let step = game.config().fixed_step();
        let expected_steps = total.as_nanos() / step.as_nanos();

        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let mut driver = ScriptedDriver::new(t0, deltas.clone());
        let frames = game.run(&mut driver).unwrap();

        assert_eq!(frames, deltas.len() as u64);
        assert_eq!(u128::from(*fixed.lock().unwrap()), expected_steps);
        assert_eq!(game.metrics().spiral_trips(), 0);
        let expected_remainder = total - step * u32::try_from(expected_steps).unwrap();
        assert_eq!(game.accumulator(), expected_remainder);
        let alpha = expected_remainder.as_secs_f64() / step.as_secs_f64();
        assert!((game.alpha() - alpha).abs() < 1e-9);
        assert!(game.alpha() < 1.0);
    }

    #[test]
    fn test_pause_excludes_paused_time() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        game.tick_at(t0 + Duration::from_millis(16)).unwrap();
        let before = game.accumulator();

        game.pause().unwrap();
        assert!(game.tick_at(t0 + Duration::from_secs(2)).is_none());
        assert_eq!(game.accumulator(), before);

        let resumed = t0 + Duration::from_secs(5);
        game.resume_at(resumed).unwrap();
        let report = game.tick_at(resumed + Duration::from_millis(16)).unwrap();
        assert_eq!(report.frame_delta, Duration::from_millis(16));
        assert!(!report.clamped);
    }

    #[test]
    fn test_state_transitions() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        assert_eq!(game.state(), LoopState::Stopped);
        assert!(matches!(game.pause(), Err(LoopError::InvalidState { .. })));
        assert!(matches!(game.resume(), Err(LoopError::InvalidState { .. })));

        game.start().unwrap();
        assert!(matches!(
            game.start(),
            Err(LoopError::InvalidState { state: LoopState::Running, .. })
        ));
        game.pause().unwrap();
        game.pause().unwrap();
        assert_eq!(game.state(), LoopState::Paused);
        game.resume().unwrap();
        assert_eq!(game.state(), LoopState::Running);

        game.stop();
        game.stop();
        assert_eq!(game.state(), LoopState::Stopped);
        game.start().unwrap();
        game.pause().unwrap();
        game.stop();
        assert_eq!(game.state(), LoopState::Stopped);
    }

    #[test]
    fn test_registration_rejected_while_running() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let counter = Arc::new(Mutex::new(0));
        let id = game.register(counting(&counter)).unwrap();
        game.start().unwrap();

        let err = game.register(counting(&counter)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "register is not allowed while the loop is running"
        );
        assert!(game.unregister(id).is_err());

        game.pause().unwrap();
        assert!(game.register(counting(&counter)).is_ok());
        assert!(game.unregister(id).unwrap());
    }

    #[test]
    fn test_priority_order_within_fixed_pass() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let trace = Arc::new(Mutex::new(Vec::new()));
        for (name, priority) in [("system_b", 5), ("system_a", 10)] {
            let trace = Arc::clone(&trace);
            game.register(FnSystem::new(
                SystemDescriptor::new(name, QueryDescriptor::new()).with_priority(priority),
                move |_ctx| {
                    trace.lock().unwrap().push(name);
                    Ok(())
                },
            ))
            .unwrap();
        }

        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + game.config().fixed_step()).unwrap();
        assert_eq!(report.fixed_steps(), 1);
        assert_eq!(*trace.lock().unwrap(), vec!["system_a", "system_b"]);
    }

    #[test]
    fn test_damage_system_scenario() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let e1 = game.store_mut().create_entity();
        game.store_mut().attach(e1, Health { current: 100, max: 100 });
        game.register(FnSystem::new(
            SystemDescriptor::new("damage", QueryDescriptor::new().write::<Health>()),
            |ctx| {
                for entity in ctx.entities() {
                    if let Some(health) = ctx.get_mut::<Health>(entity) {
                        health.current -= 30;
                    }
                }
                Ok(())
            },
        ))
        .unwrap();

        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + game.config().fixed_step()).unwrap();
        assert_eq!(report.fixed_steps(), 1);
        assert!(report.is_clean());
        assert_eq!(game.store().get_component::<Health>(e1).unwrap().current, 70);
    }

    #[test]
    fn test_faults_surface_in_frame_report() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        game.register(FnSystem::new(
            SystemDescriptor::new("flaky", QueryDescriptor::new()).variable(),
            |_ctx| anyhow::bail!("sensor offline"),
        ))
        .unwrap();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + Duration::from_millis(5)).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.faults().next().unwrap().system, "flaky");
        assert_eq!(game.state(), LoopState::Running);
    }

    #[test]
    fn test_variable_pass_gets_frame_delta() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            game.register(FnSystem::new(
                SystemDescriptor::new("hud", QueryDescriptor::new()).variable(),
                move |ctx| {
                    seen.lock().unwrap().push(ctx.dt());
                    Ok(())
                },
            ))
            .unwrap();
        }
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + Duration::from_millis(8)).unwrap();
        assert_eq!(report.fixed_steps(), 0);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!((seen[0] - 0.008).abs() < 1e-9);
    }

    #[test]
    fn test_stop_tears_down_store_and_requests() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let e = game.store_mut().create_entity();
        let sender = game.request_sender();
        game.start().unwrap();
        game.stop();

        assert_eq!(game.store().entity_count(), 0);
        assert!(!sender.request_attach(e, Health { current: 1, max: 1 }));
        assert_eq!(game.alpha(), 0.0);
    }

    #[test]
    fn test_external_request_applies_at_next_pass() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let e = game.store_mut().create_entity();
        let sender = game.request_sender();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();

        let sent = std::thread::spawn(move || sender.request_attach(e, Health { current: 5, max: 5 }))
            .join()
            .unwrap();
        assert!(sent);
        assert!(!game.store().has_component::<Health>(e));
        game.tick_at(t0 + Duration::from_millis(1)).unwrap();
        assert!(game.store().has_component::<Health>(e));
    }

    #[test]
    fn test_snapshot_import_between_sessions() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let e = game.store_mut().create_entity();
        game.store_mut().attach(e, Health { current: 42, max: 50 });
        game.store_mut().attach(e, Transform3D::from_xyz(1.0, 2.0, 3.0));
        let snapshot = game.snapshot().unwrap();

        let mut store = EntityStore::new();
        store.register::<Health>();
        store.register::<Transform3D>();
        let mut restored = GameLoop::with_store(LoopConfig::default(), store).unwrap();
        restored.import(&snapshot).unwrap();
        assert_eq!(
            restored.store().get_component::<Health>(e),
            Some(&Health { current: 42, max: 50 })
        );
        assert_eq!(
            restored.render_view().get(e).unwrap().position,
            Vec3::new(1.0, 2.0, 3.0)
        );

        restored.start().unwrap();
        assert!(matches!(
            restored.import(&snapshot),
            Err(LoopError::InvalidState { .. })
        ));
        restored.stop();
        assert!(matches!(
            restored.import(&WorldSnapshot {
                generations: Vec::new(),
                entities: Vec::new(),
            }),
            Ok(())
        ));
        let mut occupied = GameLoop::new(LoopConfig::default()).unwrap();
        occupied.store_mut().create_entity();
        assert!(matches!(
            occupied.import(&snapshot),
            Err(LoopError::Ecs(EcsError::StoreNotEmpty))
        ));
    }

    #[test]
    fn test_out_of_range_config_is_rejected_up_front() {
        for config in [
            LoopConfig {
                fixed_hz: 1e-30,
                ..LoopConfig::default()
            },
            LoopConfig {
                fixed_hz: 1e12,
                ..LoopConfig::default()
            },
            LoopConfig {
                frame_budget_ms: Some(1e300),
                ..LoopConfig::default()
            },
        ] {
            assert!(matches!(GameLoop::new(config), Err(LoopError::InvalidConfig(_))));
        }

        let mut game = GameLoop::new(LoopConfig {
            frame_budget_ms: Some(60_000.0),
            ..LoopConfig::default()
        })
        .unwrap();
        let t0 = Instant::now();
        game.start_at(t0).unwrap();
        let report = game.tick_at(t0 + Duration::from_millis(20)).unwrap();
        assert_eq!(report.fixed_steps(), 1);
        assert_eq!(game.metrics().budget_overruns(), 0);
    }

    #[test]
    fn test_run_requires_running() {
        let mut game = GameLoop::new(LoopConfig::default()).unwrap();
        let mut driver = ScriptedDriver::uniform(Instant::now(), Duration::from_millis(16), 3);
        assert!(game.run(&mut driver).is_err());
        assert_eq!(driver.remaining(), 3);
    }
}

//! Fixed-timestep game loop for the ECS engine.
//!
//! [`GameLoop`] owns an [`EntityStore`](engine_ecs::EntityStore) and a
//! [`SystemScheduler`](engine_system::SystemScheduler). Each frame it runs
//! zero or more fixed passes at the configured rate, then one variable pass,
//! then publishes the interpolation alpha for rendering.
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use engine_app::{GameLoop, LoopConfig, ScriptedDriver};
//!
//! let mut game = GameLoop::new(LoopConfig::default())?;
//! let t0 = Instant::now();
//! game.start_at(t0)?;
//! let frames = game.run(&mut ScriptedDriver::uniform(t0, Duration::from_millis(20), 3))?;
//! assert_eq!(frames, 3);
//! assert_eq!(game.metrics().fixed_steps(), 3);
//! game.stop();
//! # Ok::<(), engine_app::LoopError>(())
//! ```

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod game_loop;
pub mod metrics;
pub mod render;

pub use clock::{FrameClock, FrameDelta};
pub use config::LoopConfig;
pub use driver::{FrameDriver, PacedDriver, ScriptedDriver};
pub use error::LoopError;
pub use game_loop::{FrameReport, GameLoop, LoopState};
pub use metrics::FrameMetrics;
pub use render::RenderView;

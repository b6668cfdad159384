//! Arena demo: a headless session under the fixed-step game loop.
//!
//! Seeds a few named entities, registers the arena systems, and drives the
//! loop with a paced frame driver. Loop settings come from the `ENGINE_*`
//! environment variables; `ARENA_FRAMES` and `ARENA_REFRESH_HZ` control the
//! driver.

mod systems;

use anyhow::{Context, Result};
use components::{Burning, Health, Lifetime, Name, Velocity};
use engine_app::{GameLoop, LoopConfig, PacedDriver};
use engine_math::Transform3D;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::systems::{Burn, Census, Expiry, Movement, Reaper, Spawner};

const FRAMES_ENV: &str = "ARENA_FRAMES";
const REFRESH_HZ_ENV: &str = "ARENA_REFRESH_HZ";
const DEFAULT_FRAMES: u64 = 300;
const DEFAULT_REFRESH_HZ: f64 = 120.0;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {name}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn seed(game: &mut GameLoop) {
    let store = game.store_mut();

    let knight = store.create_entity();
    store.attach(knight, Name::new("knight"));
    store.attach(knight, Health::full(100));
    store.attach(knight, Transform3D::from_xyz(0.0, 0.0, 0.0));

    let torch = store.create_entity();
    store.attach(torch, Name::new("torchbearer"));
    store.attach(torch, Health::full(45));
    store.attach(torch, Burning { per_tick: 1 });
    store.attach(torch, Velocity::new(0.0, 0.0, 1.5));
    store.attach(torch, Transform3D::from_xyz(-3.0, 0.0, 0.0));

    let wisp = store.create_entity();
    store.attach(wisp, Name::new("wisp"));
    store.attach(wisp, Velocity::new(4.0, 1.0, 0.0));
    store.attach(wisp, Transform3D::from_xyz(5.0, 0.0, 0.0));
    store.attach(wisp, Lifetime::seconds(1.5));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arena=info".parse()?))
        .init();

    let config = LoopConfig::from_env()?;
    let frames: u64 = env_or(FRAMES_ENV, DEFAULT_FRAMES)?;
    let refresh_hz: f64 = env_or(REFRESH_HZ_ENV, DEFAULT_REFRESH_HZ)?;

    let mut game = GameLoop::new(config)?;
    seed(&mut game);
    game.register(Spawner::every(30))?;
    game.register(Movement)?;
    game.register(Burn)?;
    game.register(Reaper)?;
    game.register(Expiry)?;
    game.register(Census::every(60))?;

    info!(frames, refresh_hz, "arena starting");
    game.start()?;
    let mut driver = PacedDriver::new(refresh_hz).with_frame_limit(frames);
    game.run(&mut driver)?;

    let metrics = game.metrics();
    info!(
        frames = metrics.frames(),
        fixed_steps = metrics.fixed_steps(),
        fps = metrics.fps(),
        spiral_trips = metrics.spiral_trips(),
        simulated_s = metrics.simulated().as_secs_f64(),
        "arena finished"
    );

    let view = game.render_view();
    for (entity, transform) in view.iter() {
        let name = game
            .store()
            .get_component::<Name>(entity)
            .map_or("?", Name::as_str);
        info!(
            entity = name,
            x = transform.position.x,
            y = transform.position.y,
            z = transform.position.z,
            alpha = view.alpha(),
            "final position"
        );
    }

    let snapshot = game.snapshot()?.encode()?;
    info!(entities = game.store().entity_count(), bytes = snapshot.len(), "snapshot taken");

    game.stop();
    Ok(())
}

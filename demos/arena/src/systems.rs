//! Arena gameplay systems.

use anyhow::Result;
use components::{Burning, Health, Lifetime, Name, Velocity};
use engine_component::{EntityId, QueryDescriptor};
use engine_math::Transform3D;
use engine_system::{System, SystemContext, SystemDescriptor};
use tracing::{debug, info};

fn label(ctx: &SystemContext<'_>, entity: EntityId) -> String {
    ctx.get::<Name>(entity)
        .map_or_else(|| format!("{entity:?}"), |name| name.as_str().to_owned())
}

/// Spawns a burning, moving, short-lived imp every `interval` fixed ticks.
#[derive(Debug)]
pub struct Spawner {
    interval: u64,
    spawned: u64,
}

impl Spawner {
    /// Spawns on every `interval`-th fixed tick.
    #[must_use]
    pub fn every(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            spawned: 0,
        }
    }
}

impl System for Spawner {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("spawner", QueryDescriptor::new()).with_priority(40)
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        if ctx.tick() % self.interval != 0 {
            return Ok(());
        }
        self.spawned += 1;
        let imp = ctx.spawn();
        ctx.attach(imp, Name::new(format!("imp-{}", self.spawned)));
        ctx.attach(imp, Health::full(20));
        ctx.attach(imp, Burning { per_tick: 1 });
        ctx.attach(imp, Velocity::new(1.0, 0.0, 0.5));
        ctx.attach(imp, Transform3D::IDENTITY);
        ctx.attach(imp, Lifetime::seconds(2.0));
        debug!(tick = ctx.tick(), entity = ?imp, "spawned imp");
        Ok(())
    }
}

/// Integrates velocity into position.
#[derive(Debug, Default)]
pub struct Movement;

impl System for Movement {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new(
            "movement",
            QueryDescriptor::new().read::<Velocity>().write::<Transform3D>(),
        )
        .with_priority(30)
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        let dt = ctx.dt();
        for entity in ctx.entities() {
            let Some(offset) = ctx.get::<Velocity>(entity).map(|v| v.displacement(dt)) else {
                continue;
            };
            if let Some(transform) = ctx.get_mut::<Transform3D>(entity) {
                transform.translate(offset);
            }
        }
        Ok(())
    }
}

/// Applies burn damage every fixed step.
#[derive(Debug, Default)]
pub struct Burn;

impl System for Burn {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new(
            "burn",
            QueryDescriptor::new().read::<Burning>().write::<Health>(),
        )
        .with_priority(20)
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        for entity in ctx.entities() {
            let Some(per_tick) = ctx.get::<Burning>(entity).map(|b| b.per_tick) else {
                continue;
            };
            if let Some(health) = ctx.get_mut::<Health>(entity) {
                health.damage(per_tick);
            }
        }
        Ok(())
    }
}

/// Destroys entities whose health reached zero.
#[derive(Debug, Default)]
pub struct Reaper;

impl System for Reaper {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("reaper", QueryDescriptor::new().read::<Health>()).with_priority(10)
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        for entity in ctx.entities() {
            if ctx.get::<Health>(entity).is_some_and(Health::is_dead) {
                info!(tick = ctx.tick(), entity = %label(ctx, entity), "burned out");
                ctx.destroy(entity);
            }
        }
        Ok(())
    }
}

/// Counts lifetimes down and destroys expired entities.
#[derive(Debug, Default)]
pub struct Expiry;

impl System for Expiry {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("expiry", QueryDescriptor::new().write::<Lifetime>())
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        let dt = ctx.dt();
        for entity in ctx.entities() {
            let expired = ctx.get_mut::<Lifetime>(entity).is_some_and(|l| l.tick(dt));
            if expired {
                debug!(tick = ctx.tick(), entity = %label(ctx, entity), "lifetime expired");
                ctx.destroy(entity);
            }
        }
        Ok(())
    }
}

/// Variable-rate census logged once every `every` frames.
#[derive(Debug)]
pub struct Census {
    every: u64,
}

impl Census {
    /// Logs on every `every`-th frame.
    #[must_use]
    pub fn every(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl System for Census {
    fn descriptor(&self) -> SystemDescriptor {
        SystemDescriptor::new("census", QueryDescriptor::new().read::<Health>()).variable()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        if ctx.tick() % self.every == 0 {
            let living = ctx.entities().len();
            info!(frame = ctx.tick(), living, dt = ctx.dt(), "census");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use engine_ecs::EntityStore;
    use engine_math::Vec3;
    use engine_system::SystemScheduler;

    use super::*;

    const DT: f64 = 0.5;

    #[test]
    fn test_burn_then_reap_in_one_pass() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.attach(e, Health { current: 1, max: 10 });
        store.attach(e, Burning { per_tick: 3 });

        let mut scheduler = SystemScheduler::new();
        scheduler.register(Burn);
        scheduler.register(Reaper);
        let report = scheduler.run_fixed_pass(&mut store, DT);

        assert!(report.is_clean());
        assert_eq!(report.commit.destroyed, 1);
        assert!(!store.is_alive(e));
    }

    #[test]
    fn test_movement_uses_fixed_dt() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.attach(e, Velocity::new(2.0, 0.0, 0.0));
        store.attach(e, Transform3D::IDENTITY);

        let mut scheduler = SystemScheduler::new();
        scheduler.register(Movement);
        scheduler.run_fixed_pass(&mut store, DT);
        scheduler.run_fixed_pass(&mut store, DT);

        let transform = store.get_component::<Transform3D>(e).unwrap();
        assert_eq!(transform.position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_spawned_imp_appears_after_commit() {
        let mut store = EntityStore::new();
        let mut scheduler = SystemScheduler::new();
        scheduler.register(Spawner::every(1));
        scheduler.register(Burn);

        let first = scheduler.run_fixed_pass(&mut store, DT);
        assert_eq!(first.commit.spawned, 1);
        let imp = store.entities().next().unwrap();
        assert_eq!(store.get_component::<Health>(imp).unwrap().current, 20);

        scheduler.run_fixed_pass(&mut store, DT);
        assert_eq!(store.get_component::<Health>(imp).unwrap().current, 19);
        assert_eq!(store.entity_count(), 2);
    }

    #[test]
    fn test_expiry_destroys_after_lifetime() {
        let mut store = EntityStore::new();
        let e = store.create_entity();
        store.attach(e, Lifetime::seconds(1.0));

        let mut scheduler = SystemScheduler::new();
        scheduler.register(Expiry);
        scheduler.run_fixed_pass(&mut store, DT);
        assert!(store.is_alive(e));
        scheduler.run_fixed_pass(&mut store, DT);
        assert!(!store.is_alive(e));
    }
}

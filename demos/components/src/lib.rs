//! Gameplay components used by the demo binaries.
//!
//! Every type here is plain data implementing [`Component`]; behaviour lives
//! in the systems that query for them.

use engine_component::Component;
use engine_math::Vec3;
use serde::{Deserialize, Serialize};

/// Linear velocity in world units per second.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    /// World units per second on each axis.
    pub linear: Vec3,
}

impl Velocity {
    /// Velocity from its components.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }

    /// Displacement after `dt` seconds.
    #[must_use]
    pub fn displacement(&self, dt: f64) -> Vec3 {
        self.linear * dt as f32
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Hit points. An entity at zero is dead and gets despawned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    /// Remaining hit points.
    pub current: i32,
    /// Hit points when fully healed.
    pub max: i32,
}

impl Health {
    /// Full health with `max` points.
    #[must_use]
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Returns `true` once health reaches zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Subtracts `amount`, never going below zero.
    pub fn damage(&mut self, amount: i32) {
        self.current = self.current.saturating_sub(amount).max(0);
    }

    /// Adds `amount`, never going above `max`.
    pub fn heal(&mut self, amount: i32) {
        self.current = self.current.saturating_add(amount).min(self.max);
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

/// Damage applied to the entity every fixed step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Burning {
    /// Hit points lost per fixed step.
    pub per_tick: i32,
}

impl Component for Burning {
    fn type_name() -> &'static str {
        "Burning"
    }
}

/// Remaining lifetime in seconds. The entity is destroyed when it runs out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Lifetime {
    /// Seconds left.
    pub remaining: f64,
}

impl Lifetime {
    /// Expires after `remaining` seconds.
    #[must_use]
    pub fn seconds(remaining: f64) -> Self {
        Self { remaining }
    }

    /// Counts down by `dt`. Returns `true` once expired.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}

/// Display name for logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    /// Wraps a display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Component for Name {
    fn type_name() -> &'static str {
        "Name"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps() {
        let mut health = Health::full(100);
        health.damage(30);
        assert_eq!(health.current, 70);
        health.heal(50);
        assert_eq!(health.current, 100);
        health.damage(i32::MAX);
        assert_eq!(health.current, 0);
        assert!(health.is_dead());
    }

    #[test]
    fn test_lifetime_expires() {
        let mut lifetime = Lifetime::seconds(0.05);
        assert!(!lifetime.tick(0.02));
        assert!(!lifetime.tick(0.02));
        assert!(lifetime.tick(0.02));
    }

    #[test]
    fn test_velocity_displacement() {
        let velocity = Velocity::new(2.0, 0.0, -4.0);
        assert_eq!(velocity.displacement(0.5), Vec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn test_name_encodes_as_messagepack() {
        let name = Name::new("goblin");
        let bytes = rmp_serde::to_vec(&name).unwrap();
        let restored: Name = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored.as_str(), "goblin");
    }
}

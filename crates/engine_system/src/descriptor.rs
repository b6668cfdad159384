//! System descriptors.

use std::fmt;

use engine_component::QueryDescriptor;

/// How often a system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateRate {
    /// Once per fixed simulation step, with the fixed step as `dt`.
    Fixed,
    /// Once per frame, with the elapsed frame time as `dt`.
    Variable,
}

impl fmt::Display for UpdateRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Variable => f.write_str("variable"),
        }
    }
}

/// Static description of a system: identity, ordering, and data access.
#[derive(Debug, Clone)]
pub struct SystemDescriptor {
    /// Human-readable system name (e.g. `"damage"`).
    pub name: String,
    /// Higher runs first among systems of the same rate.
    pub priority: i32,
    /// Which pass the system belongs to.
    pub rate: UpdateRate,
    /// The data access requirements of this system.
    pub query: QueryDescriptor,
}

impl SystemDescriptor {
    /// Create a fixed-rate, priority-0 descriptor with the given name and query.
    #[must_use]
    pub fn new(name: impl Into<String>, query: QueryDescriptor) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            rate: UpdateRate::Fixed,
            query,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the update rate.
    #[must_use]
    pub fn with_rate(mut self, rate: UpdateRate) -> Self {
        self.rate = rate;
        self
    }

    /// Run once per frame instead of once per fixed step.
    #[must_use]
    pub fn variable(self) -> Self {
        self.with_rate(UpdateRate::Variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let desc = SystemDescriptor::new("damage", QueryDescriptor::new());
        assert_eq!(desc.name, "damage");
        assert_eq!(desc.priority, 0);
        assert_eq!(desc.rate, UpdateRate::Fixed);
    }

    #[test]
    fn test_descriptor_builder() {
        let desc = SystemDescriptor::new("hud", QueryDescriptor::new())
            .with_priority(-3)
            .variable();
        assert_eq!(desc.priority, -3);
        assert_eq!(desc.rate, UpdateRate::Variable);
        assert_eq!(desc.rate.to_string(), "variable");
    }
}

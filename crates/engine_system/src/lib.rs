//! # engine_system
//!
//! Behavior for the ECS engine.
//!
//! A [`System`] declares a [`SystemDescriptor`] (name, priority, update
//! rate, query) and is handed a [`SystemContext`] once per pass. The
//! [`SystemScheduler`] orders systems and runs fixed and variable passes,
//! collecting failures into a [`PassReport`] instead of aborting the pass.
//!
//! ## Usage
//!
//! ```rust
//! use engine_component::QueryDescriptor;
//! use engine_ecs::EntityStore;
//! use engine_system::{FnSystem, SystemDescriptor, SystemScheduler};
//!
//! let mut scheduler = SystemScheduler::new();
//! scheduler.register(FnSystem::new(
//!     SystemDescriptor::new("physics", QueryDescriptor::new()).with_priority(10),
//!     |ctx| {
//!         for _entity in ctx.entities() { /* system logic */ }
//!         Ok(())
//!     },
//! ));
//!
//! let mut store = EntityStore::new();
//! let report = scheduler.run_fixed_pass(&mut store, 1.0 / 60.0);
//! assert!(report.is_clean());
//! ```

pub mod context;
pub mod descriptor;
pub mod scheduler;
pub mod system;

pub use context::SystemContext;
pub use descriptor::{SystemDescriptor, UpdateRate};
pub use scheduler::{FaultKind, PassReport, SystemFault, SystemId, SystemScheduler};
pub use system::{FnSystem, System};

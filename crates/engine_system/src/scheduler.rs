//! System scheduler: ordering, pass execution, and fault collection.
//!
//! Systems are kept in two lists, one per [`UpdateRate`], each sorted by
//! priority (descending) with registration order as the tiebreak. A pass
//! runs every system of one rate in that order, between a single
//! `begin_pass` / `end_pass` pair on the store, so all systems of a pass see
//! the same committed state and their structural changes land together.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use engine_ecs::{CommitSummary, EntityStore};
use tracing::{debug, info, warn};

use crate::context::SystemContext;
use crate::descriptor::{SystemDescriptor, UpdateRate};
use crate::system::System;

/// Handle returned by [`SystemScheduler::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

/// How a system failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// `update` returned an error.
    Failed(String),
    /// `update` panicked.
    Panicked(String),
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::Panicked(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// A failure of one system during one pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("system {system} ({rate}, priority {priority}) {kind}")]
pub struct SystemFault {
    /// The failing system's name.
    pub system: String,
    /// Its priority.
    pub priority: i32,
    /// Its rate.
    pub rate: UpdateRate,
    /// What went wrong.
    pub kind: FaultKind,
}

/// Outcome of one pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Which pass ran.
    pub rate: UpdateRate,
    /// Pass counter for this rate, starting at 1.
    pub tick: u64,
    /// Delta time handed to systems, in seconds.
    pub dt: f64,
    /// Number of systems invoked.
    pub systems_run: usize,
    /// Faults in execution order.
    pub faults: Vec<SystemFault>,
    /// What the closing commit applied.
    pub commit: CommitSummary,
}

impl PassReport {
    /// Returns `true` if no system faulted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

struct Entry {
    id: SystemId,
    descriptor: SystemDescriptor,
    system: Box<dyn System>,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Holds registered systems and runs them pass by pass.
#[derive(Debug, Default)]
pub struct SystemScheduler {
    fixed: Vec<Entry>,
    variable: Vec<Entry>,
    next_id: u64,
    fixed_ticks: u64,
    variable_ticks: u64,
}

impl SystemScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, rate: UpdateRate) -> &[Entry] {
        match rate {
            UpdateRate::Fixed => &self.fixed,
            UpdateRate::Variable => &self.variable,
        }
    }

    fn list_mut(&mut self, rate: UpdateRate) -> &mut Vec<Entry> {
        match rate {
            UpdateRate::Fixed => &mut self.fixed,
            UpdateRate::Variable => &mut self.variable,
        }
    }

    /// Registers a system and returns its handle.
    pub fn register<S: System + 'static>(&mut self, system: S) -> SystemId {
        self.register_boxed(Box::new(system))
    }

    /// Registers a boxed system and returns its handle.
    pub fn register_boxed(&mut self, system: Box<dyn System>) -> SystemId {
        let descriptor = system.descriptor();
        let id = SystemId(self.next_id);
        self.next_id += 1;

        for other in self.list(descriptor.rate) {
            if other.descriptor.priority == descriptor.priority
                && other.descriptor.query.conflicts_with(&descriptor.query)
            {
                debug!(
                    system = descriptor.name,
                    other = other.descriptor.name,
                    priority = descriptor.priority,
                    "same-priority systems share data; registration order decides"
                );
            }
        }

        info!(
            system = descriptor.name,
            priority = descriptor.priority,
            rate = %descriptor.rate,
            "registered system"
        );

        let list = self.list_mut(descriptor.rate);
        list.push(Entry {
            id,
            descriptor,
            system,
        });
        // Ids grow with registration order, so they break priority ties.
        list.sort_by(|a, b| {
            b.descriptor
                .priority
                .cmp(&a.descriptor.priority)
                .then(a.id.cmp(&b.id))
        });
        id
    }

    /// Removes a system. Returns `false` if `id` is not registered.
    pub fn unregister(&mut self, id: SystemId) -> bool {
        for list in [&mut self.fixed, &mut self.variable] {
            if let Some(pos) = list.iter().position(|entry| entry.id == id) {
                let entry = list.remove(pos);
                info!(system = entry.descriptor.name, "unregistered system");
                return true;
            }
        }
        false
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixed.len() + self.variable.len()
    }

    /// Returns `true` if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the descriptor of a registered system.
    #[must_use]
    pub fn descriptor(&self, id: SystemId) -> Option<&SystemDescriptor> {
        self.fixed
            .iter()
            .chain(&self.variable)
            .find(|entry| entry.id == id)
            .map(|entry| &entry.descriptor)
    }

    /// System names of one rate, in execution order.
    #[must_use]
    pub fn execution_order(&self, rate: UpdateRate) -> Vec<&str> {
        self.list(rate)
            .iter()
            .map(|entry| entry.descriptor.name.as_str())
            .collect()
    }

    /// Runs every fixed-rate system once with `dt` = the fixed step.
    pub fn run_fixed_pass(&mut self, store: &mut EntityStore, dt: f64) -> PassReport {
        self.fixed_ticks += 1;
        run_pass(&mut self.fixed, UpdateRate::Fixed, self.fixed_ticks, store, dt)
    }

    /// Runs every variable-rate system once with `dt` = the frame time.
    pub fn run_variable_pass(&mut self, store: &mut EntityStore, dt: f64) -> PassReport {
        self.variable_ticks += 1;
        run_pass(&mut self.variable, UpdateRate::Variable, self.variable_ticks, store, dt)
    }
}

fn run_pass(
    systems: &mut [Entry],
    rate: UpdateRate,
    tick: u64,
    store: &mut EntityStore,
    dt: f64,
) -> PassReport {
    store.begin_pass();
    let mut faults = Vec::new();

    for entry in systems.iter_mut() {
        let Entry {
            descriptor, system, ..
        } = entry;
        let mut ctx = SystemContext::new(store, descriptor, tick, dt);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| system.update(&mut ctx)));
        let kind = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => FaultKind::Failed(format!("{err:#}")),
            Err(payload) => FaultKind::Panicked(panic_message(payload.as_ref())),
        };
        let fault = SystemFault {
            system: descriptor.name.clone(),
            priority: descriptor.priority,
            rate,
            kind,
        };
        warn!(tick, %rate, %fault, "system fault");
        faults.push(fault);
    }

    let commit = store.end_pass();
    debug!(
        tick,
        %rate,
        dt,
        systems = systems.len(),
        faults = faults.len(),
        "pass complete"
    );
    PassReport {
        rate,
        tick,
        dt,
        systems_run: systems.len(),
        faults,
        commit,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

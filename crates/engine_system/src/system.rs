//! The [`System`] trait and a closure adapter.

use crate::context::SystemContext;
use crate::descriptor::SystemDescriptor;

/// A unit of behavior run once per applicable pass.
///
/// Systems are registered with a
/// [`SystemScheduler`](crate::SystemScheduler) at composition time. The
/// descriptor is read once, at registration.
pub trait System: Send {
    /// Name, priority, rate, and query of this system.
    fn descriptor(&self) -> SystemDescriptor;

    /// Runs the system for one pass.
    ///
    /// # Errors
    ///
    /// Any error is reported as a fault of this system; the rest of the pass
    /// still runs.
    fn update(&mut self, ctx: &mut SystemContext<'_>) -> anyhow::Result<()>;
}

/// Wraps a closure as a [`System`].
///
/// ```rust
/// use engine_component::QueryDescriptor;
/// use engine_system::{FnSystem, SystemDescriptor};
///
/// let tick = FnSystem::new(SystemDescriptor::new("noop", QueryDescriptor::new()), |_ctx| Ok(()));
/// # let _ = tick;
/// ```
pub struct FnSystem<F> {
    descriptor: SystemDescriptor,
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> anyhow::Result<()> + Send,
{
    /// Create a system from a descriptor and an update closure.
    #[must_use]
    pub fn new(descriptor: SystemDescriptor, f: F) -> Self {
        Self { descriptor, f }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> anyhow::Result<()> + Send,
{
    fn descriptor(&self) -> SystemDescriptor {
        self.descriptor.clone()
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> anyhow::Result<()> {
        (self.f)(ctx)
    }
}

impl<F> std::fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSystem")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

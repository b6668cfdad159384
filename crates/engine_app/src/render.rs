//! Read-only view for render consumers.

use engine_component::EntityId;
use engine_ecs::EntityStore;
use engine_math::Transform3D;

/// Transforms of every entity that has one, plus the interpolation alpha.
///
/// Borrowed from the loop between passes; there is no path back into the
/// store.
#[derive(Debug, Clone, Copy)]
pub struct RenderView<'a> {
    store: &'a EntityStore,
    alpha: f64,
}

impl<'a> RenderView<'a> {
    pub(crate) fn new(store: &'a EntityStore, alpha: f64) -> Self {
        Self { store, alpha }
    }

    /// Blend factor between the previous and current fixed step.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// `(entity, transform)` pairs in entity creation order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &'a Transform3D)> + 'a {
        let store = self.store;
        store
            .component_id::<Transform3D>()
            .into_iter()
            .flat_map(move |id| store.index().entities_with(id).iter())
            .filter_map(move |entity| store.get_component(entity).map(|t| (entity, t)))
    }

    /// The transform of one entity.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&'a Transform3D> {
        self.store.get_component(entity)
    }

    /// Number of entities with a transform.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store
            .component_id::<Transform3D>()
            .map_or(0, |id| self.store.index().entities_with(id).len())
    }

    /// Returns `true` if no entity has a transform.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

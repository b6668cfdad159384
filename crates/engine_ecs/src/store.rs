//! The entity store.
//!
//! [`EntityStore`] owns entity identities, component columns, the per-type
//! index, and the pending change set. It runs in one of two modes:
//!
//! - **Between passes**, structural mutations apply immediately.
//! - **During a pass** (after [`EntityStore::begin_pass`]), structural
//!   mutations are queued and only become visible when
//!   [`EntityStore::end_pass`] commits them. In-place component writes
//!   through [`EntityStore::get_component_mut`] are not structural and apply
//!   at once in both modes.

use engine_component::{
    BoxedComponent, Component, ComponentKey, ComponentMask, ComponentRegistry, ComponentTypeId,
    EntityAllocator, EntityId, ErasedColumn, QueryDescriptor, SparseColumn,
};
use tracing::{debug, error, info, trace, warn};

use crate::error::EcsError;
use crate::index::{ComponentIndex, EntitySet};
use crate::pending::{CommitSummary, PendingChange, PendingChangeSet};
use crate::query::QueryEngine;
use crate::requests::{RequestQueue, RequestSender};
use crate::snapshot::{ComponentRecord, EntitySnapshot, WorldSnapshot};

/// Result of a structural mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The change was applied immediately.
    Applied,
    /// A pass is active; the change will apply at the next commit.
    Queued,
    /// The entity (or, for detach, the component) does not exist.
    NotFound,
    /// The value could not be stored, e.g. its component name is taken by
    /// another type.
    Rejected,
}

impl MutationOutcome {
    /// Returns `true` if the change was applied or queued.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Applied | Self::Queued)
    }
}

/// Book-keeping for one committed entity.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    entity: EntityId,
    serial: u64,
    mask: ComponentMask,
}

impl EntityRecord {
    /// The entity's id.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The component types currently attached.
    #[must_use]
    pub fn components(&self) -> &ComponentMask {
        &self.mask
    }
}

/// Owns all entities and components of one simulation.
#[derive(Debug)]
pub struct EntityStore {
    registry: ComponentRegistry,
    allocator: EntityAllocator,
    /// Indexed by entity slot.
    records: Vec<Option<EntityRecord>>,
    columns: Vec<Box<dyn ErasedColumn>>,
    index: ComponentIndex,
    /// Every committed entity, in creation order.
    alive: EntitySet,
    next_serial: u64,
    pending: PendingChangeSet,
    requests: RequestQueue,
    pass_active: bool,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            allocator: EntityAllocator::new(),
            records: Vec::new(),
            columns: Vec::new(),
            index: ComponentIndex::new(),
            alive: EntitySet::new(),
            next_serial: 0,
            pending: PendingChangeSet::new(),
            requests: RequestQueue::new(),
            pass_active: false,
        }
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Registers component type `T` and returns its tag.
    ///
    /// Attaching a value registers its type on first use, so explicit
    /// registration is only needed before importing snapshots.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        let id = self.registry.register::<T>();
        self.ensure_columns();
        id
    }

    /// Returns the tag of `T`, if registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.id_of::<T>()
    }

    /// The component registry.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The per-type entity index.
    #[must_use]
    pub fn index(&self) -> &ComponentIndex {
        &self.index
    }

    fn ensure_columns(&mut self) {
        for meta in self.registry.iter().skip(self.columns.len()) {
            self.columns.push((meta.new_column)());
        }
        self.index.ensure(self.registry.len());
    }

    // ── Structural mutation ─────────────────────────────────────────────

    /// Creates a new entity with no components.
    ///
    /// During a pass the id is reserved at once but the entity only becomes
    /// alive (and queryable) at the next commit.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        if self.pass_active {
            trace!(%entity, "spawn queued");
            self.pending.push(PendingChange::Spawn(entity));
        } else {
            self.insert_record(entity);
            trace!(%entity, "spawned");
        }
        entity
    }

    /// Destroys `entity` and every component it holds.
    pub fn destroy_entity(&mut self, entity: EntityId) -> MutationOutcome {
        if self.pass_active {
            return self.enqueue(PendingChange::Destroy(entity));
        }
        if self.apply_destroy(entity) {
            MutationOutcome::Applied
        } else {
            MutationOutcome::NotFound
        }
    }

    /// Attaches `value` to `entity`, replacing any existing `T`.
    pub fn attach<T: Component>(&mut self, entity: EntityId, value: T) -> MutationOutcome {
        self.attach_boxed(entity, BoxedComponent::new(value))
    }

    /// Attaches a type-erased component value.
    pub fn attach_boxed(&mut self, entity: EntityId, component: BoxedComponent) -> MutationOutcome {
        if self.pass_active {
            return self.enqueue(PendingChange::Attach { entity, component });
        }
        self.apply_attach(entity, component)
    }

    /// Detaches component `T` from `entity`.
    pub fn detach<T: Component>(&mut self, entity: EntityId) -> MutationOutcome {
        self.detach_key(entity, T::key())
    }

    /// Detaches the component type named by `key` from `entity`.
    ///
    /// During a pass the request is queued as long as the entity exists; a
    /// missing component is then skipped at commit.
    pub fn detach_key(&mut self, entity: EntityId, key: ComponentKey) -> MutationOutcome {
        if self.pass_active {
            return self.enqueue(PendingChange::Detach { entity, key });
        }
        if self.apply_detach(entity, key) {
            MutationOutcome::Applied
        } else {
            MutationOutcome::NotFound
        }
    }

    fn enqueue(&mut self, change: PendingChange) -> MutationOutcome {
        let entity = change.entity();
        // Reserved ids count: they are live in the allocator.
        if !self.allocator.is_live(entity) {
            trace!(%entity, "mutation on unknown entity ignored");
            return MutationOutcome::NotFound;
        }
        trace!(%entity, ?change, "mutation queued");
        self.pending.push(change);
        MutationOutcome::Queued
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Returns `true` if `entity` is committed and alive.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.record(entity).is_some()
    }

    /// Returns the record of a committed entity.
    #[must_use]
    pub fn record(&self, entity: EntityId) -> Option<&EntityRecord> {
        self.records
            .get(entity.index() as usize)?
            .as_ref()
            .filter(|record| record.entity == entity)
    }

    fn record_mut(&mut self, entity: EntityId) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.index() as usize)?
            .as_mut()
            .filter(|record| record.entity == entity)
    }

    /// Returns the number of committed entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Iterates over committed entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter()
    }

    /// Returns `true` if `entity` holds a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.has_component_id(entity, id))
    }

    /// Returns `true` if `entity` holds the component tagged `id`.
    #[must_use]
    pub fn has_component_id(&self, entity: EntityId, id: ComponentTypeId) -> bool {
        self.record(entity)
            .is_some_and(|record| record.mask.contains(id))
    }

    /// Returns the typed column for `T`.
    #[must_use]
    pub fn column<T: Component>(&self) -> Option<&SparseColumn<T>> {
        let id = self.component_id::<T>()?;
        self.columns[id.index()].as_any().downcast_ref()
    }

    fn column_mut<T: Component>(&mut self) -> Option<&mut SparseColumn<T>> {
        let id = self.component_id::<T>()?;
        self.columns[id.index()].as_any_mut().downcast_mut()
    }

    /// Returns `entity`'s `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.column::<T>()?.get(entity)
    }

    /// Returns `entity`'s `T` for in-place mutation.
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.column_mut::<T>()?.get_mut(entity)
    }

    /// Returns a query engine over the committed state.
    #[must_use]
    pub fn query_engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.registry, &self.index, &self.alive)
    }

    /// Returns every committed entity matching `query`, in creation order.
    #[must_use]
    pub fn query(&self, query: &QueryDescriptor) -> Vec<EntityId> {
        self.query_engine().query(query)
    }

    // ── Pass protocol ───────────────────────────────────────────────────

    /// Returns `true` between [`begin_pass`](Self::begin_pass) and
    /// [`end_pass`](Self::end_pass).
    #[must_use]
    pub fn is_pass_active(&self) -> bool {
        self.pass_active
    }

    /// Returns the number of queued structural changes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Marks the start of an update pass and pulls in waiting requests.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a pass is already active. Release builds
    /// log the violation and leave the running pass untouched.
    pub fn begin_pass(&mut self) {
        if self.pass_active {
            debug_assert!(!self.pass_active, "begin_pass called while an update pass is already active");
            error!("begin_pass called while an update pass is already active; ignoring");
            return;
        }
        self.pass_active = true;
        let mut drained = 0usize;
        for change in self.requests.drain() {
            self.pending.push(change);
            drained += 1;
        }
        if drained > 0 {
            debug!(requests = drained, "drained external requests");
        }
    }

    /// Ends the current pass and commits everything it queued.
    pub fn end_pass(&mut self) -> CommitSummary {
        if !self.pass_active {
            warn!("end_pass called without an active pass");
        }
        self.pass_active = false;
        self.commit_pending()
    }

    /// Applies all queued structural changes in request order.
    ///
    /// # Panics
    ///
    /// In debug builds, panics when called during a pass. Release builds log
    /// the violation and keep the changes queued for the pass barrier.
    pub fn commit_pending(&mut self) -> CommitSummary {
        if self.pass_active {
            debug_assert!(!self.pass_active, "commit_pending called from inside an update pass");
            error!("commit_pending called from inside an update pass; deferring to the pass barrier");
            return CommitSummary::default();
        }

        let mut summary = CommitSummary::default();
        for change in self.pending.take() {
            let applied = match change {
                PendingChange::Spawn(entity) => {
                    let live = self.allocator.is_live(entity) && !self.is_alive(entity);
                    if live {
                        self.insert_record(entity);
                        summary.spawned += 1;
                    }
                    live
                }
                PendingChange::Destroy(entity) => {
                    let done = self.apply_destroy(entity);
                    summary.destroyed += usize::from(done);
                    done
                }
                PendingChange::Attach { entity, component } => {
                    let done = self.apply_attach(entity, component) == MutationOutcome::Applied;
                    summary.attached += usize::from(done);
                    done
                }
                PendingChange::Detach { entity, key } => {
                    let done = self.apply_detach(entity, key);
                    summary.detached += usize::from(done);
                    done
                }
            };
            if !applied {
                summary.skipped += 1;
            }
        }

        if !summary.is_empty() {
            debug!(
                spawned = summary.spawned,
                destroyed = summary.destroyed,
                attached = summary.attached,
                detached = summary.detached,
                skipped = summary.skipped,
                "committed pending changes"
            );
        }
        summary
    }

    /// Returns a handle other threads can use to request changes.
    #[must_use]
    pub fn request_sender(&self) -> RequestSender {
        self.requests.sender()
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Captures every committed entity and component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::PassActive`] during a pass, or
    /// [`EcsError::Component`] if a value fails to encode.
    pub fn snapshot(&self) -> Result<WorldSnapshot, EcsError> {
        if self.pass_active {
            return Err(EcsError::PassActive {
                operation: "snapshot",
            });
        }
        let mut entities = Vec::with_capacity(self.alive.len());
        for entity in self.alive.iter() {
            let Some(record) = self.record(entity) else {
                continue;
            };
            let mut components = Vec::with_capacity(record.mask.len());
            for ty in record.mask.iter() {
                let name = self.columns[ty.index()].type_name();
                if let Some(encoded) = self.columns[ty.index()].encode(entity) {
                    components.push(ComponentRecord {
                        component: name.to_owned(),
                        data: encoded?,
                    });
                }
            }
            entities.push(EntitySnapshot { entity, components });
        }
        Ok(WorldSnapshot {
            generations: self.allocator.generations().to_vec(),
            entities,
        })
    }

    /// Populates an empty store from `snapshot`.
    ///
    /// Every component name in the snapshot must already be registered. On
    /// failure the store is left empty.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StoreNotEmpty`] if the store holds entities or
    /// queued changes, [`EcsError::UnknownComponent`] for unregistered names,
    /// and [`EcsError::CorruptSnapshot`] or [`EcsError::Component`] for bad
    /// data.
    pub fn import(&mut self, snapshot: &WorldSnapshot) -> Result<(), EcsError> {
        if self.pass_active {
            return Err(EcsError::PassActive { operation: "import" });
        }
        if !self.alive.is_empty() || !self.pending.is_empty() {
            return Err(EcsError::StoreNotEmpty);
        }

        let restored = EntityAllocator::restore(
            snapshot.generations.clone(),
            snapshot.entities.iter().map(|e| e.entity),
        );
        let previous = std::mem::replace(&mut self.allocator, restored);
        if let Err(err) = self.import_entities(snapshot) {
            self.clear_entities();
            self.allocator = previous;
            return Err(err);
        }
        info!(entities = snapshot.entities.len(), "imported snapshot");
        Ok(())
    }

    fn import_entities(&mut self, snapshot: &WorldSnapshot) -> Result<(), EcsError> {
        for saved in &snapshot.entities {
            let entity = saved.entity;
            if !self.allocator.is_live(entity) {
                return Err(EcsError::CorruptSnapshot(format!(
                    "{entity} does not match the generation table"
                )));
            }
            if self.is_alive(entity) {
                return Err(EcsError::CorruptSnapshot(format!("{entity} appears twice")));
            }
            self.insert_record(entity);
            for record in &saved.components {
                let ty = self
                    .registry
                    .lookup_name(&record.component)
                    .ok_or_else(|| EcsError::UnknownComponent(record.component.clone()))?;
                self.columns[ty.index()].insert_encoded(entity, &record.data)?;
                self.mark_attached(entity, ty);
            }
        }
        Ok(())
    }

    /// Discards every entity, component, and queued change.
    ///
    /// Component registrations survive. The request queue is replaced, so
    /// senders obtained earlier are disconnected and their requests refused.
    /// Released ids keep their bumped generations, so stale handles stay
    /// invalid.
    pub fn reset(&mut self) {
        let reserved: Vec<_> = self
            .pending
            .take()
            .into_iter()
            .filter_map(|change| match change {
                PendingChange::Spawn(entity) => Some(entity),
                _ => None,
            })
            .collect();
        let committed = self.alive.to_vec();
        let discarded = committed.len();
        self.clear_entities();
        for entity in committed.into_iter().chain(reserved) {
            self.allocator.release(entity);
        }
        self.requests = RequestQueue::new();
        self.pass_active = false;
        info!(entities = discarded, "entity store reset");
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn clear_entities(&mut self) {
        self.records.clear();
        self.columns.iter_mut().for_each(|column| column.clear());
        self.index.clear();
        self.alive.clear();
    }

    fn insert_record(&mut self, entity: EntityId) {
        let slot = entity.index() as usize;
        if slot >= self.records.len() {
            self.records.resize_with(slot + 1, || None);
        }
        let serial = self.next_serial;
        self.next_serial += 1;
        self.records[slot] = Some(EntityRecord {
            entity,
            serial,
            mask: ComponentMask::new(),
        });
        self.alive.insert(serial, entity);
    }

    fn mark_attached(&mut self, entity: EntityId, ty: ComponentTypeId) {
        if let Some(record) = self.record_mut(entity) {
            record.mask.insert(ty);
            let serial = record.serial;
            self.index.insert(ty, serial, entity);
        }
    }

    fn apply_destroy(&mut self, entity: EntityId) -> bool {
        let Some(record) = self.record(entity).cloned() else {
            trace!(%entity, "destroy of unknown entity skipped");
            return false;
        };
        for ty in record.mask.iter() {
            self.columns[ty.index()].remove(entity);
            self.index.remove(ty, entity);
        }
        self.records[entity.index() as usize] = None;
        self.alive.remove(entity);
        self.allocator.release(entity);
        trace!(%entity, "destroyed");
        true
    }

    fn apply_attach(&mut self, entity: EntityId, component: BoxedComponent) -> MutationOutcome {
        let name = component.key().name();
        if !self.is_alive(entity) {
            trace!(%entity, component = name, "attach to unknown entity skipped");
            return MutationOutcome::NotFound;
        }
        let ty = match component.register_in(&mut self.registry) {
            Ok(ty) => ty,
            Err(err) => {
                warn!(%entity, component = name, %err, "attach rejected");
                return MutationOutcome::Rejected;
            }
        };
        self.ensure_columns();
        if let Err(err) = self.columns[ty.index()].insert_boxed(entity, component.into_inner()) {
            error!(%entity, component = name, %err, "attach failed");
            return MutationOutcome::Rejected;
        }
        self.mark_attached(entity, ty);
        trace!(%entity, component = name, "attached");
        MutationOutcome::Applied
    }

    fn apply_detach(&mut self, entity: EntityId, key: ComponentKey) -> bool {
        let Some(ty) = self.registry.lookup(&key) else {
            return false;
        };
        let Some(record) = self.record_mut(entity) else {
            return false;
        };
        if !record.mask.remove(ty) {
            return false;
        }
        self.columns[ty.index()].remove(entity);
        self.index.remove(ty, entity);
        trace!(%entity, component = key.name(), "detached");
        true
    }
}

//! Thread-safe structural change requests.
//!
//! Input callbacks, network handlers and timers run on their own threads and
//! must not touch the store directly. They hold a [`RequestSender`] and
//! enqueue changes; the store drains the queue when the next pass begins.
//!
//! When the store is reset its queue is replaced. Senders handed out before
//! the reset are left connected to nothing, so their requests are refused
//! instead of landing in the next session.

use crossbeam_channel::{Receiver, Sender};
use engine_component::{BoxedComponent, Component, ComponentKey, EntityId};

use crate::pending::PendingChange;

/// Receiving side of the request channel, owned by the store.
#[derive(Debug)]
pub struct RequestQueue {
    tx: Sender<PendingChange>,
    rx: Receiver<PendingChange>,
}

impl RequestQueue {
    /// Create an empty, unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Returns a new handle for enqueueing requests.
    #[must_use]
    pub fn sender(&self) -> RequestSender {
        RequestSender {
            tx: self.tx.clone(),
        }
    }

    /// Returns the number of requests waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if no request is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Takes every request currently waiting, without blocking.
    pub fn drain(&self) -> impl Iterator<Item = PendingChange> + '_ {
        self.rx.try_iter()
    }
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, `Send` handle for enqueueing structural changes.
///
/// Every method returns `false` when the owning store has been reset or
/// dropped and the request was discarded.
#[derive(Debug, Clone)]
pub struct RequestSender {
    tx: Sender<PendingChange>,
}

impl RequestSender {
    /// Requests that `value` be attached to `entity`.
    pub fn request_attach<T: Component>(&self, entity: EntityId, value: T) -> bool {
        self.send(PendingChange::Attach {
            entity,
            component: BoxedComponent::new(value),
        })
    }

    /// Requests that component `T` be detached from `entity`.
    pub fn request_detach<T: Component>(&self, entity: EntityId) -> bool {
        self.request_detach_key(entity, T::key())
    }

    /// Requests that the component named by `key` be detached from `entity`.
    pub fn request_detach_key(&self, entity: EntityId, key: ComponentKey) -> bool {
        self.send(PendingChange::Detach { entity, key })
    }

    /// Requests that `entity` be destroyed.
    pub fn request_destroy(&self, entity: EntityId) -> bool {
        self.send(PendingChange::Destroy(entity))
    }

    fn send(&self, change: PendingChange) -> bool {
        self.tx.send(change).is_ok()
    }
}

//! Entity identity, the live-entity registry, and handles.

use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::mask::Mask;
use crate::schema::Schema;

/// The id of an entity.
///
/// Ids are allocated from a per-manager monotone counter and are never
/// reused, not even after the entity is destroyed. That makes "this id was
/// deleted" and "this id still exists but changed shape" reliably
/// distinguishable for outstanding handles.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(pub(crate) u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique identity of one manager instance.
///
/// Stands in for a stable manager address: managers are movable values, so
/// foreign-handle detection compares minted tokens instead of pointers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct ManagerId(u64);

impl ManagerId {
    pub(crate) fn mint() -> ManagerId {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ManagerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The registry's view of one live entity: its id and membership mask.
#[derive(Clone, Copy, Debug)]
pub struct EntityRecord {
    pub(crate) id: EntityId,
    pub(crate) mask: Mask,
}

impl EntityRecord {
    /// The entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's current membership mask.
    pub fn mask(&self) -> Mask {
        self.mask
    }
}

/// The authoritative set of live entities.
///
/// Records are kept sorted by id; since ids are monotone, creation is a
/// push at the tail and destruction removes from the middle. The sorted
/// order is what lets queries merge-walk component storages against the
/// registry.
#[derive(Default, Debug)]
pub struct Entities {
    records: Vec<EntityRecord>,
    next: u64,
}

impl Entities {
    /// Allocates the next id and inserts an empty record for it.
    pub fn create(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        self.records.push(EntityRecord {
            id,
            mask: Mask::EMPTY,
        });
        id
    }

    /// Removes the record for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not live; callers validate first.
    pub fn destroy(&mut self, id: EntityId) {
        let at = self
            .position(id)
            .expect("destroying an entity that is not live");
        self.records.remove(at);
    }

    /// Returns `true` if `id` is live.
    pub fn live(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// The current mask of `id`, or `None` if the entity is gone.
    pub fn snapshot(&self, id: EntityId) -> Option<Mask> {
        self.position(id).map(|at| self.records[at].mask)
    }

    /// All live records, ascending by id.
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no entity is live.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn record_mut(&mut self, id: EntityId) -> &mut EntityRecord {
        let at = self
            .position(id)
            .expect("mutating an entity that is not live");
        &mut self.records[at]
    }

    /// Removes every record, keeping the id counter so ids stay monotone
    /// across the wipe.
    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, EntityRecord> {
        self.records.drain(..)
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.records.binary_search_by_key(&id, |r| r.id).ok()
    }
}

/// Validity of a handle with respect to its manager, checked on every use.
///
/// The checks run in declaration order and the first failure wins: manager
/// identity, then existence of the id, then snapshot freshness.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EntityStatus {
    /// The handle was never bound to a manager.
    Uninitialized,
    /// The handle is current and usable.
    Ok,
    /// The handle belongs to a different manager.
    ForeignManager,
    /// The entity no longer exists.
    NotFound,
    /// The entity exists, but its mask changed since this handle last
    /// observed it.
    Stale,
    /// The entity was destroyed through this very handle.
    Deleted,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let what = match self {
            EntityStatus::Uninitialized => "the handle was never bound to a manager",
            EntityStatus::Ok => "the handle is valid",
            EntityStatus::ForeignManager => "the handle belongs to a different manager",
            EntityStatus::NotFound => "no such entity exists",
            EntityStatus::Stale => "the entity changed shape since the handle was taken",
            EntityStatus::Deleted => "the entity was destroyed through this handle",
        };
        f.write_str(what)
    }
}

/// A cheap, copyable reference to an entity of one manager.
///
/// A handle carries the entity's id plus a snapshot of the membership mask
/// it last observed. Mutations performed *through* a handle refresh that
/// handle's snapshot; every other copy keeps the old snapshot and turns
/// [`Stale`](EntityStatus::Stale) on its next use. Handles do not own
/// anything and must not outlive their manager.
///
/// A default-constructed handle is
/// [`Uninitialized`](EntityStatus::Uninitialized) and rejects every
/// operation.
///
/// Equality and hashing compare identity (manager and id), not freshness.
pub struct EntityHandle<S: Schema> {
    pub(crate) manager: Option<ManagerId>,
    pub(crate) id: EntityId,
    pub(crate) snapshot: Mask,
    pub(crate) deleted: bool,
    marker: PhantomData<fn(S) -> S>,
}

impl<S: Schema> EntityHandle<S> {
    pub(crate) fn fresh(manager: ManagerId, id: EntityId, snapshot: Mask) -> Self {
        EntityHandle {
            manager: Some(manager),
            id,
            snapshot,
            deleted: false,
            marker: PhantomData,
        }
    }

    /// The referenced entity's id.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The membership mask this handle last observed.
    pub fn snapshot(&self) -> Mask {
        self.snapshot
    }
}

impl<S: Schema> Default for EntityHandle<S> {
    fn default() -> Self {
        EntityHandle {
            manager: None,
            id: EntityId(0),
            snapshot: Mask::EMPTY,
            deleted: false,
            marker: PhantomData,
        }
    }
}

impl<S: Schema> Clone for EntityHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Schema> Copy for EntityHandle<S> {}

impl<S: Schema> PartialEq for EntityHandle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.manager == other.manager && self.id == other.id
    }
}

impl<S: Schema> Eq for EntityHandle<S> {}

impl<S: Schema> core::hash::Hash for EntityHandle<S> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.manager.hash(state);
        self.id.hash(state);
    }
}

impl<S: Schema> fmt::Debug for EntityHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("id", &self.id)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}

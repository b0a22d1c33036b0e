//! The entity manager: creation, destruction, component and tag
//! operations, and compositional iteration.

use core::any::type_name;
use core::ops::ControlFlow;

use crate::entity::{Entities, EntityHandle, EntityId, EntityStatus, ManagerId};
use crate::error::{BadEntity, Error, MissingComponent};
use crate::mask::Mask;
use crate::query::Query;
use crate::schema::{Component, Schema, Tag};

/// The orchestrator of one entity population.
///
/// The manager owns the registry of live entities and one storage per
/// component of its [`Schema`]; every mutation keeps the per-entity
/// membership mask and the storages in step, from the caller's point of
/// view atomically. Handles returned from [`create`](EntityManager::create)
/// and the query methods are validated on every use; see
/// [`EntityStatus`] for the possible outcomes.
///
/// All operations are synchronous and the manager performs no internal
/// locking: callers serialize access, one manager per thread of work.
///
/// ```
/// use statecs::EntityManager;
///
/// struct Health(u32);
/// struct Burning;
///
/// statecs::schema! {
///     struct Game {
///         components { health: Health }
///         tags { Burning }
///     }
/// }
///
/// let mut game = EntityManager::<Game>::new();
/// let mut goblin = game.create();
/// game.add_component(&mut goblin, Health(30)).unwrap();
/// game.set_tag::<Burning>(&mut goblin, true).unwrap();
///
/// game.for_each::<(Health, Burning), _>(|_entity, (health, _)| {
///     health.0 -= 5;
/// });
///
/// assert_eq!(game.get_component::<Health>(&goblin).unwrap().0, 25);
/// ```
pub struct EntityManager<S: Schema> {
    storages: S,
    entities: Entities,
    token: ManagerId,
}

impl<S: Schema> Default for EntityManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Schema> EntityManager<S> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        EntityManager {
            storages: S::default(),
            entities: Entities::default(),
            token: ManagerId::mint(),
        }
    }

    /// Creates a new entity and returns a fresh handle to it.
    ///
    /// The entity starts with no components and no tags; the handle's
    /// snapshot is the empty mask and its status is
    /// [`Ok`](EntityStatus::Ok).
    pub fn create(&mut self) -> EntityHandle<S> {
        let id = self.entities.create();
        log::trace!("created entity {}", id);
        EntityHandle::fresh(self.token, id, Mask::EMPTY)
    }

    /// Destroys the entity behind `handle`.
    ///
    /// Every component the entity holds is dropped and the registry entry
    /// removed in one logical step. Afterwards `handle` reports
    /// [`Deleted`](EntityStatus::Deleted); any other handle to the same
    /// entity reports [`NotFound`](EntityStatus::NotFound), since ids are
    /// never reused.
    pub fn destroy(&mut self, handle: &mut EntityHandle<S>) -> Result<(), Error> {
        let mask = self.check(handle, "destroy")?;
        self.storages.drop_entity(mask, handle.id);
        self.entities.destroy(handle.id);
        handle.deleted = true;
        log::trace!("destroyed entity {}", handle.id);
        Ok(())
    }

    /// Computes the validity of `handle` against this manager.
    ///
    /// The checks run in a fixed order and the first failure wins:
    /// manager binding and identity, then existence of the id, then
    /// snapshot freshness.
    pub fn status_of(&self, handle: &EntityHandle<S>) -> EntityStatus {
        match self.probe(handle) {
            Ok(_) => EntityStatus::Ok,
            Err(status) => status,
        }
    }

    /// Returns whether the entity holds a component of type `C`.
    ///
    /// Lacking the component is not an error; only an invalid handle is.
    pub fn has_component<C: Component<S>>(&self, handle: &EntityHandle<S>) -> Result<bool, Error> {
        let mask = self.check(handle, "inspect")?;
        Ok(mask.contains(C::BIT))
    }

    /// Attaches `component` to the entity, unless it already holds one.
    ///
    /// Returns the stored component and whether an insertion happened.
    /// This is a strict insert: if a `C` is already attached, the existing
    /// value is returned untouched with `false` and no handle is
    /// invalidated. On a fresh insert the entity's mask changes, `handle`
    /// is refreshed in place, and every other handle to the entity turns
    /// [`Stale`](EntityStatus::Stale).
    pub fn add_component<C: Component<S>>(
        &mut self,
        handle: &mut EntityHandle<S>,
        component: C,
    ) -> Result<(&mut C, bool), Error> {
        self.check(handle, "add a component to")?;
        let record = self.entities.record_mut(handle.id);
        let (stored, inserted) = C::storage_mut(&mut self.storages).insert(handle.id, component);
        if inserted {
            record.mask.set(C::BIT);
            handle.snapshot = record.mask;
        }
        Ok((stored, inserted))
    }

    /// Detaches the `C` component from the entity, dropping its value.
    ///
    /// Returns whether anything was removed. Removing an absent component
    /// is not an error and invalidates nothing; an actual removal
    /// refreshes `handle` and stales every other copy.
    pub fn remove_component<C: Component<S>>(
        &mut self,
        handle: &mut EntityHandle<S>,
    ) -> Result<bool, Error> {
        let mask = self.check(handle, "remove a component from")?;
        if !mask.contains(C::BIT) {
            return Ok(false);
        }
        C::storage_mut(&mut self.storages)
            .remove(handle.id)
            .expect("entity mask and component storage out of sync");
        let record = self.entities.record_mut(handle.id);
        record.mask.clear(C::BIT);
        handle.snapshot = record.mask;
        Ok(true)
    }

    /// Shared access to the entity's `C` component.
    ///
    /// The reference stays valid until the next call that can mutate this
    /// entity; the borrow checker enforces exactly that.
    pub fn get_component<C: Component<S>>(&self, handle: &EntityHandle<S>) -> Result<&C, Error> {
        let mask = self.check(handle, "read a component of")?;
        if !mask.contains(C::BIT) {
            return Err(Error::MissingComponent(MissingComponent {
                entity: handle.id,
                component: type_name::<C>(),
            }));
        }
        Ok(C::storage(&self.storages)
            .get(handle.id)
            .expect("entity mask and component storage out of sync"))
    }

    /// Exclusive access to the entity's `C` component.
    ///
    /// Changing the component's value does not change the entity's mask,
    /// so no handle is invalidated.
    pub fn get_component_mut<C: Component<S>>(
        &mut self,
        handle: &EntityHandle<S>,
    ) -> Result<&mut C, Error> {
        let mask = self.check(handle, "write a component of")?;
        if !mask.contains(C::BIT) {
            return Err(Error::MissingComponent(MissingComponent {
                entity: handle.id,
                component: type_name::<C>(),
            }));
        }
        Ok(C::storage_mut(&mut self.storages)
            .get_mut(handle.id)
            .expect("entity mask and component storage out of sync"))
    }

    /// Returns whether the entity currently carries the tag `T`.
    pub fn has_tag<T: Tag<S>>(&self, handle: &EntityHandle<S>) -> Result<bool, Error> {
        let mask = self.check(handle, "inspect")?;
        Ok(mask.contains(T::BIT))
    }

    /// Sets or clears the tag `T` on the entity, returning the prior value.
    ///
    /// If the bit actually changes, `handle` is refreshed and every other
    /// handle to the entity turns [`Stale`](EntityStatus::Stale); setting
    /// a tag to its current value invalidates nothing.
    pub fn set_tag<T: Tag<S>>(
        &mut self,
        handle: &mut EntityHandle<S>,
        value: bool,
    ) -> Result<bool, Error> {
        self.check(handle, "set a tag on")?;
        let record = self.entities.record_mut(handle.id);
        let prior = record.mask.contains(T::BIT);
        if value != prior {
            if value {
                record.mask.set(T::BIT);
            } else {
                record.mask.clear(T::BIT);
            }
            handle.snapshot = record.mask;
        }
        Ok(prior)
    }

    /// Collects fresh handles to every entity matching the query, in
    /// ascending id order.
    ///
    /// `Q` is a tuple of registered types; components and tags both
    /// filter. The empty tuple enumerates every live entity.
    pub fn get_entities<Q: Query<S>>(&self) -> Vec<EntityHandle<S>> {
        let required = Q::mask();
        self.matched_records(required, Q::base(&self.storages))
            .into_iter()
            .map(|(id, mask)| EntityHandle::fresh(self.token, id, mask))
            .collect()
    }

    /// Invokes `f` for every matching entity, in ascending id order.
    ///
    /// The callback receives a fresh handle and the query's item: one
    /// `&mut C` per component member, `()` per tag member. The exclusive
    /// borrow of the manager makes structural mutation from inside the
    /// callback unrepresentable; use the yielded references to change
    /// component values.
    pub fn for_each<'a, Q, F>(&'a mut self, mut f: F)
    where
        Q: Query<S>,
        F: FnMut(EntityHandle<S>, Q::Item<'a>),
    {
        EntityManager::try_for_each::<Q, _>(self, move |handle, item| {
            f(handle, item);
            ControlFlow::Continue(())
        });
    }

    /// Like [`for_each`](EntityManager::for_each), but the callback can
    /// abort the traversal by returning [`ControlFlow::Break`].
    ///
    /// ```
    /// use core::ops::ControlFlow;
    /// use statecs::EntityManager;
    ///
    /// struct Score(u32);
    ///
    /// statecs::schema! {
    ///     struct Board {
    ///         components { scores: Score }
    ///         tags {}
    ///     }
    /// }
    ///
    /// let mut board = EntityManager::<Board>::new();
    /// for points in [10, 40, 25] {
    ///     let mut e = board.create();
    ///     board.add_component(&mut e, Score(points)).unwrap();
    /// }
    ///
    /// let mut winner = None;
    /// board.try_for_each::<(Score,), _>(|entity, (score,)| {
    ///     if score.0 >= 40 {
    ///         winner = Some(entity);
    ///         ControlFlow::Break(())
    ///     } else {
    ///         ControlFlow::Continue(())
    ///     }
    /// });
    /// assert!(winner.is_some());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `Q` lists the same type more than once; the duplicate
    /// would alias the yielded mutable borrows.
    pub fn try_for_each<'a, Q, F>(&'a mut self, mut f: F)
    where
        Q: Query<S>,
        F: FnMut(EntityHandle<S>, Q::Item<'a>) -> ControlFlow<()>,
    {
        let required = Q::mask();
        assert!(
            Q::LEN == required.count(),
            "for_each query lists the same type more than once"
        );
        let matched = self.matched_records(required, Q::base(&self.storages));
        let storages: *mut S = &mut self.storages;
        for (id, mask) in matched {
            let handle = EntityHandle::fresh(self.token, id, mask);
            // SAFETY: `storages` is exclusively borrowed for 'a, the
            // member types are pairwise distinct (checked above), and ids
            // are unique across iterations, so no two yielded borrows can
            // alias.
            let item = unsafe { Q::fetch(storages, id) };
            if let ControlFlow::Break(()) = f(handle, item) {
                break;
            }
        }
    }

    /// Destroys every live entity.
    ///
    /// Ids stay monotone across the wipe: entities created afterwards get
    /// ids greater than anything handed out before.
    pub fn clear(&mut self) {
        let count = self.entities.len();
        for record in self.entities.drain() {
            self.storages.drop_entity(record.mask, record.id);
        }
        log::trace!("cleared {} entities", count);
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity is live.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Validates `handle` and returns the entity's current mask, or the
    /// status that made the first check fail.
    fn probe(&self, handle: &EntityHandle<S>) -> Result<Mask, EntityStatus> {
        let owner = match handle.manager {
            Some(owner) => owner,
            None => return Err(EntityStatus::Uninitialized),
        };
        if owner != self.token {
            return Err(EntityStatus::ForeignManager);
        }
        if handle.deleted {
            return Err(EntityStatus::Deleted);
        }
        match self.entities.snapshot(handle.id) {
            None => Err(EntityStatus::NotFound),
            Some(mask) if mask != handle.snapshot => Err(EntityStatus::Stale),
            Some(mask) => Ok(mask),
        }
    }

    fn check(&self, handle: &EntityHandle<S>, action: &'static str) -> Result<Mask, Error> {
        self.probe(handle).map_err(|status| {
            Error::BadEntity(BadEntity {
                action,
                status,
                entity: handle.id,
            })
        })
    }

    /// Resolves a query against the registry: walks the base substrate
    /// (smallest member storage, or the registry itself) and keeps every
    /// entity whose mask is a superset of `required`.
    fn matched_records(
        &self,
        required: Mask,
        base: Option<&[EntityId]>,
    ) -> Vec<(EntityId, Mask)> {
        let mut matched = Vec::new();
        match base {
            None => {
                for record in self.entities.records() {
                    if record.mask.contains_all(required) {
                        matched.push((record.id, record.mask));
                    }
                }
            }
            Some(ids) => {
                // Both sides are sorted by id, so this is a linear merge.
                let mut records = self.entities.records().iter().peekable();
                for &id in ids {
                    while let Some(record) = records.peek() {
                        if record.id < id {
                            records.next();
                        } else {
                            break;
                        }
                    }
                    match records.peek() {
                        Some(record) if record.id == id => {
                            if record.mask.contains_all(required) {
                                matched.push((record.id, record.mask));
                            }
                            records.next();
                        }
                        // A storage id missing from the registry would
                        // violate the membership invariant; skip it rather
                        // than losing the rest of the walk.
                        Some(_) => {}
                        None => break,
                    }
                }
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Common(u32);
    struct Rare(u32);
    struct Marked;

    crate::schema! {
        struct Fixture {
            components {
                common: Common,
                rare: Rare,
            }
            tags { Marked }
        }
    }

    struct Lonely;

    crate::schema! {
        struct TagsOnly {
            components {}
            tags { Lonely }
        }
    }

    fn populated() -> (EntityManager<Fixture>, Vec<EntityHandle<Fixture>>) {
        let mut manager = EntityManager::new();
        let mut handles = Vec::new();
        for i in 0..6u32 {
            let mut e = manager.create();
            manager.add_component(&mut e, Common(i)).unwrap();
            if i % 3 == 0 {
                manager.add_component(&mut e, Rare(i)).unwrap();
            }
            if i % 2 == 0 {
                manager.set_tag::<Marked>(&mut e, true).unwrap();
            }
            handles.push(e);
        }
        (manager, handles)
    }

    #[test]
    fn intersection_uses_the_smallest_storage() {
        let (manager, handles) = populated();

        // Rare is the sparse side; the result is the Rare/Common intersection.
        let both = manager.get_entities::<(Common, Rare)>();
        assert_eq!(both, vec![handles[0], handles[3]]);

        let rare_marked = manager.get_entities::<(Rare, Marked)>();
        assert_eq!(rare_marked, vec![handles[0]]);
    }

    #[test]
    fn iteration_yields_components_and_units_for_tags() {
        let (mut manager, _) = populated();

        let mut seen = Vec::new();
        manager.for_each::<(Common, Marked), _>(|_entity, (common, _marked)| {
            seen.push(common.0);
            common.0 += 100;
        });
        assert_eq!(seen, vec![0, 2, 4]);

        let marked = manager.get_entities::<(Marked,)>();
        for handle in &marked {
            assert!(manager.get_component::<Common>(handle).unwrap().0 >= 100);
        }
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn duplicate_query_members_are_rejected() {
        let (mut manager, _) = populated();
        manager.try_for_each::<(Common, Common), _>(|_, _| ControlFlow::Continue(()));
    }

    #[test]
    fn tags_only_schemas_iterate_the_registry() {
        let mut manager = EntityManager::<TagsOnly>::new();
        let mut a = manager.create();
        let _b = manager.create();
        manager.set_tag::<Lonely>(&mut a, true).unwrap();

        assert_eq!(manager.get_entities::<()>().len(), 2);
        assert_eq!(manager.get_entities::<(Lonely,)>(), vec![a]);
    }

    #[test]
    fn clear_preserves_id_monotonicity() {
        let (mut manager, handles) = populated();
        let highest = handles.last().unwrap().id();

        manager.clear();
        assert!(manager.is_empty());
        assert!(manager.get_entities::<()>().is_empty());

        let fresh = manager.create();
        assert!(fresh.id() > highest);
        assert_eq!(manager.len(), 1);
    }
}

//! A minimal typed publish/subscribe bus.
//!
//! The event manager is a collaborator of the ECS core, not a dependency
//! of it: nothing on the entity path touches this module. Handlers are
//! plain closures stored per event type and invoked synchronously, in
//! registration order, by [`broadcast`](EventManager::broadcast). No
//! ordering or concurrency guarantees exist beyond that.

use core::any::{Any, TypeId};

use ahash::AHashMap as HashMap;

/// Identifies one registered handler, for later removal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct HandlerId {
    event: TypeId,
    id: u64,
}

struct HandlerList<E: 'static> {
    entries: Vec<(u64, Box<dyn FnMut(&E)>)>,
}

/// Type-erased view of a [`HandlerList`], so lists for different event
/// types can live in one table.
trait AnyHandlers {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove(&mut self, id: u64) -> bool;
    fn len(&self) -> usize;
}

impl<E: 'static> AnyHandlers for HandlerList<E> {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove(&mut self, id: u64) -> bool {
        match self.entries.iter().position(|(entry, _)| *entry == id) {
            Some(at) => {
                self.entries.remove(at);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A synchronous event bus dispatching values to registered handlers.
///
/// ```
/// use statecs::EventManager;
///
/// struct Collision {
///     damage: u32,
/// }
///
/// let mut events = EventManager::new();
/// let total = std::rc::Rc::new(std::cell::Cell::new(0));
///
/// let sink = total.clone();
/// events.register_handler(move |event: &Collision| {
///     sink.set(sink.get() + event.damage);
/// });
///
/// events.broadcast(Collision { damage: 7 });
/// events.broadcast(Collision { damage: 5 });
/// assert_eq!(total.get(), 12);
/// ```
#[derive(Default)]
pub struct EventManager {
    handlers: HashMap<TypeId, Box<dyn AnyHandlers>>,
    next: u64,
}

impl EventManager {
    /// Creates a bus with no handlers.
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `handler` for events of type `E`.
    ///
    /// Handlers for one event type run in registration order on every
    /// [`broadcast`](EventManager::broadcast) until removed.
    pub fn register_handler<E, F>(&mut self, handler: F) -> HandlerId
    where
        E: 'static,
        F: FnMut(&E) + 'static,
    {
        let event = TypeId::of::<E>();
        let id = self.next;
        self.next += 1;

        let list = self
            .handlers
            .entry(event)
            .or_insert_with(|| Box::new(HandlerList::<E> { entries: Vec::new() }));
        list.as_any_mut()
            .downcast_mut::<HandlerList<E>>()
            .expect("handler list keyed under the wrong event type")
            .entries
            .push((id, Box::new(handler)));

        HandlerId { event, id }
    }

    /// Removes a previously registered handler.
    ///
    /// Returns whether the handler was still registered.
    pub fn remove_handler(&mut self, handler: HandlerId) -> bool {
        match self.handlers.get_mut(&handler.event) {
            Some(list) => list.remove(handler.id),
            None => false,
        }
    }

    /// Number of handlers currently registered for `E`.
    pub fn handler_count<E: 'static>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.len())
    }

    /// Delivers `event` to every handler registered for `E`, synchronously
    /// and in registration order.
    pub fn broadcast<E: 'static>(&mut self, event: E) {
        if let Some(list) = self.handlers.get_mut(&TypeId::of::<E>()) {
            let list = list
                .as_any_mut()
                .downcast_mut::<HandlerList<E>>()
                .expect("handler list keyed under the wrong event type");
            for (_, handler) in &mut list.entries {
                handler(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Ping(u32);
    struct Pong;

    #[test]
    fn handlers_run_in_registration_order() {
        let mut events = EventManager::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = order.clone();
        events.register_handler(move |_: &Ping| sink.borrow_mut().push("first"));
        let sink = order.clone();
        events.register_handler(move |_: &Ping| sink.borrow_mut().push("second"));

        events.broadcast(Ping(0));
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn broadcast_reaches_only_the_matching_type() {
        let mut events = EventManager::new();
        let hits = Rc::new(RefCell::new(0));

        let sink = hits.clone();
        events.register_handler(move |event: &Ping| *sink.borrow_mut() += event.0);

        events.broadcast(Pong);
        assert_eq!(*hits.borrow(), 0);

        events.broadcast(Ping(3));
        assert_eq!(*hits.borrow(), 3);
    }

    #[test]
    fn removed_handlers_stop_firing() {
        let mut events = EventManager::new();
        let hits = Rc::new(RefCell::new(0u32));

        let sink = hits.clone();
        let id = events.register_handler(move |_: &Ping| *sink.borrow_mut() += 1);
        assert_eq!(events.handler_count::<Ping>(), 1);

        events.broadcast(Ping(0));
        assert!(events.remove_handler(id));
        assert!(!events.remove_handler(id));
        events.broadcast(Ping(0));

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(events.handler_count::<Ping>(), 0);
    }
}

//! Loft Core - Named-message publish/subscribe
//!
//! Every model and view instance embeds an [`EventBus`]. Listeners are either
//! plain callbacks or object-style subscribers that receive every message by
//! name and decide which ones to react to.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Reserved wildcard name: listeners registered here receive every message.
pub const ANY: &str = "*";

/// Object-style listener. Receives every message delivered to it together
/// with the message name; a subscriber that does not care about a name
/// simply ignores the call.
pub trait Subscribe<T> {
    fn on_message(&self, name: &str, ctx: &T);
}

/// A registered listener: a plain callback or an object-style subscriber.
///
/// Subscribers are held weakly so a dropped subscriber never keeps a slot
/// occupied; dead entries are pruned during delivery.
pub enum Listener<T> {
    Callback(Rc<dyn Fn(&T)>),
    Subscriber(Weak<dyn Subscribe<T>>),
}

impl<T> Listener<T> {
    /// Wrap a plain callback.
    pub fn callback(f: impl Fn(&T) + 'static) -> Self {
        Listener::Callback(Rc::new(f))
    }

    /// Wrap an object-style subscriber.
    pub fn subscriber(s: Weak<dyn Subscribe<T>>) -> Self {
        Listener::Subscriber(s)
    }

    /// Identity comparison. Listeners have no structural equality; two
    /// registrations are the same only when they share the allocation.
    fn same_as(&self, other: &Listener<T>) -> bool {
        match (self, other) {
            (Listener::Callback(a), Listener::Callback(b)) => Rc::ptr_eq(a, b),
            (Listener::Subscriber(a), Listener::Subscriber(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Deliver a message. Returns false when the listener is dead and
    /// should be pruned.
    fn deliver(&self, name: &str, ctx: &T) -> bool {
        match self {
            Listener::Callback(f) => {
                f(ctx);
                true
            }
            Listener::Subscriber(weak) => match weak.upgrade() {
                Some(sub) => {
                    sub.on_message(name, ctx);
                    true
                }
                None => false,
            },
        }
    }

    fn is_dead(&self) -> bool {
        match self {
            Listener::Callback(_) => false,
            Listener::Subscriber(weak) => weak.strong_count() == 0,
        }
    }
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        match self {
            Listener::Callback(f) => Listener::Callback(Rc::clone(f)),
            Listener::Subscriber(w) => Listener::Subscriber(Weak::clone(w)),
        }
    }
}

/// Publish/subscribe bus over a payload type.
///
/// Single-threaded by design: delivery happens synchronously inside `say`,
/// name-scoped listeners first, wildcard listeners second. Delivery iterates
/// a snapshot, so handlers may freely register and unregister listeners
/// while a message is in flight.
pub struct EventBus<T> {
    slots: RefCell<HashMap<String, Vec<Listener<T>>>>,
    // The wildcard is a reserved sentinel, kept out of the name map so a
    // message literally named "*" cannot collide with it.
    any: RefCell<Vec<Listener<T>>>,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(HashMap::new()),
            any: RefCell::new(Vec::new()),
        }
    }

    /// Register a listener under a message name (or [`ANY`]).
    /// Registering the same listener twice is a no-op.
    pub fn listen(&self, name: &str, listener: Listener<T>) {
        if name == ANY {
            Self::add_to(&mut self.any.borrow_mut(), listener);
            return;
        }
        let mut slots = self.slots.borrow_mut();
        Self::add_to(slots.entry(name.to_string()).or_default(), listener);
    }

    /// Register several listeners at once from (name, listener) pairs.
    pub fn listen_all(&self, entries: impl IntoIterator<Item = (String, Listener<T>)>) {
        for (name, listener) in entries {
            self.listen(&name, listener);
        }
    }

    /// Remove a listener from a name. With `None`, clears every listener
    /// registered under the name. Removing an unregistered listener is a
    /// no-op.
    pub fn unlisten(&self, name: &str, listener: Option<&Listener<T>>) {
        if name == ANY {
            Self::remove_from(&mut self.any.borrow_mut(), listener);
            return;
        }
        if let Some(vec) = self.slots.borrow_mut().get_mut(name) {
            Self::remove_from(vec, listener);
        }
    }

    /// Deliver `ctx` to every listener under `name`, then to every wildcard
    /// listener, exactly once per registration.
    pub fn say(&self, name: &str, ctx: &T) {
        tracing::trace!(name, "say");
        let scoped: Vec<Listener<T>> = self
            .slots
            .borrow()
            .get(name)
            .map(|v| v.to_vec())
            .unwrap_or_default();
        let mut saw_dead = self.deliver_all(&scoped, name, ctx);

        let wild: Vec<Listener<T>> = self.any.borrow().to_vec();
        saw_dead |= self.deliver_all(&wild, name, ctx);

        if saw_dead {
            self.prune();
        }
    }

    /// Number of live listeners registered under a name.
    pub fn listener_count(&self, name: &str) -> usize {
        if name == ANY {
            return self.any.borrow().iter().filter(|l| !l.is_dead()).count();
        }
        self.slots
            .borrow()
            .get(name)
            .map(|v| v.iter().filter(|l| !l.is_dead()).count())
            .unwrap_or(0)
    }

    fn deliver_all(&self, listeners: &[Listener<T>], name: &str, ctx: &T) -> bool {
        let mut saw_dead = false;
        for listener in listeners {
            saw_dead |= !listener.deliver(name, ctx);
        }
        saw_dead
    }

    fn prune(&self) {
        self.any.borrow_mut().retain(|l| !l.is_dead());
        for vec in self.slots.borrow_mut().values_mut() {
            vec.retain(|l| !l.is_dead());
        }
    }

    fn add_to(vec: &mut Vec<Listener<T>>, listener: Listener<T>) {
        if !vec.iter().any(|l| l.same_as(&listener)) {
            vec.push(listener);
        }
    }

    fn remove_from(vec: &mut Vec<Listener<T>>, listener: Option<&Listener<T>>) {
        match listener {
            Some(target) => vec.retain(|l| !l.same_as(target)),
            None => vec.clear(),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("names", &self.slots.borrow().len())
            .field("wildcard", &self.any.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_delivery_exactly_once() {
        let bus: EventBus<i32> = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let h = Rc::clone(&hits);
        bus.listen("ping", Listener::callback(move |v| h.set(h.get() + *v)));

        bus.say("ping", &1);
        bus.say("ping", &1);
        assert_eq!(hits.get(), 2);

        bus.say("pong", &1);
        assert_eq!(hits.get(), 2, "unrelated names must not deliver");
    }

    #[test]
    fn test_wildcard_receives_everything() {
        let bus: EventBus<i32> = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let h = Rc::clone(&hits);
        bus.listen(ANY, Listener::callback(move |_| h.set(h.get() + 1)));

        bus.say("a", &0);
        bus.say("b", &0);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_duplicate_registration_is_deduped() {
        let bus: EventBus<i32> = EventBus::new();
        let hits = Rc::new(Cell::new(0));

        let h = Rc::clone(&hits);
        let listener = Listener::callback(move |_| h.set(h.get() + 1));
        bus.listen("ping", listener.clone());
        bus.listen("ping", listener);

        bus.say("ping", &0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_unlisten_specific_and_all() {
        let bus: EventBus<i32> = EventBus::new();
        let a = Rc::new(Cell::new(0));
        let b = Rc::new(Cell::new(0));

        let ac = Rc::clone(&a);
        let la = Listener::callback(move |_| ac.set(ac.get() + 1));
        let bc = Rc::clone(&b);
        let lb = Listener::callback(move |_| bc.set(bc.get() + 1));

        bus.listen("ping", la.clone());
        bus.listen("ping", lb);
        bus.unlisten("ping", Some(&la));
        bus.say("ping", &0);
        assert_eq!((a.get(), b.get()), (0, 1));

        bus.unlisten("ping", None);
        bus.say("ping", &0);
        assert_eq!((a.get(), b.get()), (0, 1));
    }

    #[test]
    fn test_unlisten_unknown_is_noop() {
        let bus: EventBus<i32> = EventBus::new();
        let stranger = Listener::callback(|_| {});
        bus.unlisten("ping", Some(&stranger));
        bus.unlisten("never-registered", None);
    }

    #[test]
    fn test_mutation_during_delivery_is_stable() {
        // A handler that unregisters another handler mid-delivery must not
        // disturb the current delivery round.
        let bus: Rc<EventBus<i32>> = Rc::new(EventBus::new());
        let second_hits = Rc::new(Cell::new(0));

        let sc = Rc::clone(&second_hits);
        let second = Listener::callback(move |_| sc.set(sc.get() + 1));
        let second_for_removal = second.clone();

        let bus2 = Rc::clone(&bus);
        let first = Listener::callback(move |_| {
            bus2.unlisten("ping", Some(&second_for_removal));
        });

        bus.listen("ping", first);
        bus.listen("ping", second);

        bus.say("ping", &0);
        assert_eq!(second_hits.get(), 1, "snapshot iteration still delivers");

        bus.say("ping", &0);
        assert_eq!(second_hits.get(), 1, "removal takes effect next round");
    }

    struct Selective {
        seen: Cell<u32>,
    }

    impl Subscribe<i32> for Selective {
        fn on_message(&self, name: &str, _ctx: &i32) {
            if name == "update" {
                self.seen.set(self.seen.get() + 1);
            }
        }
    }

    #[test]
    fn test_object_subscriber_skips_unknown_names() {
        let bus: EventBus<i32> = EventBus::new();
        let sub = Rc::new(Selective { seen: Cell::new(0) });
        let weak: Weak<dyn Subscribe<i32>> = Rc::<Selective>::downgrade(&sub);
        bus.listen(ANY, Listener::subscriber(weak));

        bus.say("update", &0);
        bus.say("destroy", &0);
        assert_eq!(sub.seen.get(), 1);
    }

    #[test]
    fn test_dead_subscriber_is_pruned() {
        let bus: EventBus<i32> = EventBus::new();
        let sub = Rc::new(Selective { seen: Cell::new(0) });
        let weak: Weak<dyn Subscribe<i32>> = Rc::<Selective>::downgrade(&sub);
        bus.listen(ANY, Listener::subscriber(weak));
        assert_eq!(bus.listener_count(ANY), 1);

        drop(sub);
        bus.say("update", &0);
        assert_eq!(bus.listener_count(ANY), 0);
    }
}

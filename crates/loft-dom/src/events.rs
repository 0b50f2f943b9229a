//! DOM events.
//!
//! UI event kinds, the event object handed to listeners, and listener
//! identifiers used for teardown. Dispatch itself lives on [`Document`].
//!
//! [`Document`]: crate::Document

use std::any::Any;
use std::rc::Rc;

use crate::NodeId;

/// UI event kinds.
///
/// `Click`, `Submit` and `Change` are hook kinds: attaching a handler for
/// one of them replaces any existing handler on the node
/// (property-assignment semantics), and the handler's return value decides
/// default prevention. Everything else is an additive listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Submit,
    Change,
    Input,
    Custom(String),
}

impl EventKind {
    pub fn custom(name: impl Into<String>) -> Self {
        EventKind::Custom(name.into())
    }

    pub fn is_hook(&self) -> bool {
        matches!(self, EventKind::Click | EventKind::Submit | EventKind::Change)
    }

    pub fn name(&self) -> &str {
        match self {
            EventKind::Click => "click",
            EventKind::Submit => "submit",
            EventKind::Change => "change",
            EventKind::Input => "input",
            EventKind::Custom(name) => name,
        }
    }
}

/// Identifier of an attached listener, used to detach it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// A dispatched event.
#[derive(Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub current_target: NodeId,
    /// Opaque payload for custom events.
    pub detail: Option<Rc<dyn Any>>,
    pub bubbles: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: NodeId, bubbles: bool) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            detail: None,
            bubbles,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_detail(mut self, detail: Rc<dyn Any>) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl std::fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomEvent")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("bubbles", &self.bubbles)
            .field("default_prevented", &self.default_prevented)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_kinds() {
        assert!(EventKind::Click.is_hook());
        assert!(EventKind::Submit.is_hook());
        assert!(EventKind::Change.is_hook());
        assert!(!EventKind::Input.is_hook());
        assert!(!EventKind::custom("move").is_hook());
    }

    #[test]
    fn test_event_flags() {
        let mut e = DomEvent::new(EventKind::Click, NodeId(1), true);
        assert!(!e.is_default_prevented());
        e.prevent_default();
        e.stop_propagation();
        assert!(e.is_default_prevented());
        assert!(e.is_propagation_stopped());
    }
}

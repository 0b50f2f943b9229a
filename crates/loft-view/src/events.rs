//! Declarative event tables.
//!
//! A behavior's `handle` hook fills an [`EventTable`] mapping (target,
//! event kind) pairs to handlers. The view attaches each entry to the
//! resolved element when it loads; entries for later-set children are kept
//! and attached on [`View::set_child`](crate::View::set_child).

use std::rc::Rc;

use loft_dom::{DomEvent, EventKind};

use crate::{View, ViewError};

/// A declared event handler.
///
/// For hook kinds (click/submit/change) the returned value controls
/// default prevention: `Ok(Some(true))` allows the default, anything else
/// (including errors, which are logged at the dispatch boundary) prevents
/// it. Additive kinds ignore the return value.
pub type EventHandler = Rc<dyn Fn(&Rc<View>, &mut DomEvent) -> Result<Option<bool>, ViewError>>;

/// Where a handler attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    /// The view's root element.
    Root,
    /// An element located by identifier, or a child view's root element.
    Named(String),
}

/// Table of declared handlers for one view.
#[derive(Default)]
pub struct EventTable {
    entries: Vec<(EventTarget, EventKind, EventHandler)>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler to the view's root element.
    pub fn on_root(
        &mut self,
        kind: EventKind,
        handler: impl Fn(&Rc<View>, &mut DomEvent) -> Result<Option<bool>, ViewError> + 'static,
    ) {
        self.entries.push((EventTarget::Root, kind, Rc::new(handler)));
    }

    /// Attach a handler to a named element or child view.
    pub fn on(
        &mut self,
        target: impl Into<String>,
        kind: EventKind,
        handler: impl Fn(&Rc<View>, &mut DomEvent) -> Result<Option<bool>, ViewError> + 'static,
    ) {
        self.entries
            .push((EventTarget::Named(target.into()), kind, Rc::new(handler)));
    }

    pub(crate) fn entries(&self) -> &[(EventTarget, EventKind, EventHandler)] {
        &self.entries
    }
}

impl std::fmt::Debug for EventTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTable")
            .field("entries", &self.entries.len())
            .finish()
    }
}

//! View behavior hooks.

use std::rc::Rc;

use loft_dom::Markup;
use loft_model::Value;

use crate::{EventTable, View, ViewError};

/// The overridable surface of a view. Every hook has a no-op default, so a
/// concrete behavior implements only what it needs.
pub trait Behavior {
    /// Transform the initial data handed in at construction. The returned
    /// value becomes the bound data; the default passes it through.
    fn init(&self, defaults: Option<Value>) -> Option<Value> {
        defaults
    }

    /// The markup template for views that construct their own subtree.
    /// `None` means the view binds to an existing element instead.
    fn render(&self, data: Option<&Value>) -> Option<Markup> {
        let _ = data;
        None
    }

    /// Declare child views.
    fn load(&self, view: &Rc<View>, children: &mut Children) -> Result<(), ViewError> {
        let _ = (view, children);
        Ok(())
    }

    /// Declare event handlers.
    fn handle(&self, events: &mut EventTable) {
        let _ = events;
    }

    /// Called once the view is fully built and bound.
    fn completed(&self, view: &Rc<View>) {
        let _ = view;
    }

    /// Called at the start of destruction, and for list item views when
    /// they are dropped from the list.
    fn unload(&self, view: &View) {
        let _ = view;
    }

    /// Compose the document title. `inner` is the title produced by the
    /// current page; the default passes it through unchanged.
    fn title(&self, inner: &str) -> String {
        inner.to_string()
    }
}

/// Child view declarations collected by [`Behavior::load`].
pub struct Children {
    entries: Vec<(String, Rc<View>)>,
}

impl Children {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a child view under a name. The name doubles as the marker
    /// element identifier when the child needs embedding.
    pub fn set(&mut self, name: impl Into<String>, view: Rc<View>) {
        self.entries.push((name.into(), view));
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Rc<View>)> {
        self.entries
    }
}

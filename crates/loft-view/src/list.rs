//! List-mode views.
//!
//! A view built with a [`ListSpec`] renders its bound
//! [`List`](loft_model::List) as a dynamic sequence of item views inside
//! the content element. Each item view is registered under a generated
//! token, and the token is written onto the item's root element
//! ([`TOKEN_ATTR`](crate::TOKEN_ATTR)) for reverse lookup by position.

use std::rc::Rc;

use loft_dom::NodeId;
use loft_model::Value;

use crate::{next_token, Behavior, View, ViewConfig, ViewError, TOKEN_ATTR};

/// List-mode configuration: how to build the behavior for one element.
#[derive(Clone)]
pub struct ListSpec {
    make_item: Rc<dyn Fn(&Value) -> Rc<dyn Behavior>>,
}

impl ListSpec {
    /// The item behavior factory. It receives the element value, so a
    /// list may choose different item views per element.
    pub fn new(make_item: impl Fn(&Value) -> Rc<dyn Behavior> + 'static) -> Self {
        Self {
            make_item: Rc::new(make_item),
        }
    }
}

impl std::fmt::Debug for ListSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ListSpec")
    }
}

impl View {
    /// Append an item view for a new trailing element.
    pub(crate) fn add_item(&self, item: &Value) {
        match self.create_item_view(item) {
            Ok(view) => {
                if let Some(el) = view.el() {
                    self.append_el(el);
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to build list item view"),
        }
    }

    /// Insert an item view before the element currently at `index`; with
    /// no element there, this appends.
    pub(crate) fn insert_item(&self, item: &Value, index: usize) {
        let anchor = self.child_el_at(index);
        match self.create_item_view(item) {
            Ok(view) => {
                if let (Some(content), Some(el)) = (self.content_el.get(), view.el()) {
                    self.doc().insert_before(content, el, anchor);
                }
            }
            Err(err) => tracing::error!(error = %err, "failed to build list item view"),
        }
    }

    /// Reassign the data of the item view currently at `index`.
    pub(crate) fn update_item(&self, item: &Value, index: usize) {
        let Some(el) = self.child_el_at(index) else {
            tracing::warn!(index, "no list element at update index");
            return;
        };
        let Some(token) = self.doc().attr(el, TOKEN_ATTR) else {
            return;
        };
        if let Some(child) = self.child(&token) {
            child.set_data(Some(item.clone()));
        }
    }

    /// Drop the item view currently at `index` and remove its element.
    pub(crate) fn remove_item_at(&self, index: usize) {
        let Some(el) = self.child_el_at(index) else {
            tracing::warn!(index, "no list element at remove index");
            return;
        };
        self.remove_item_el(el);
    }

    /// Drop an item view located by its view handle.
    pub fn remove_item_by_view(&self, view: &View) {
        if let Some(el) = view.el() {
            self.remove_item_el(el);
        }
    }

    fn remove_item_el(&self, el: NodeId) {
        if let Some(token) = self.doc().attr(el, TOKEN_ATTR) {
            let child = {
                let mut children = self.children.borrow_mut();
                children
                    .iter()
                    .position(|(n, _)| n == &token)
                    .map(|i| children.remove(i).1)
            };
            if let Some(child) = child {
                // Dropped items are unloaded, not destroyed; the item
                // model may live on elsewhere.
                child.behavior.unload(&child);
            }
        }
        self.doc().detach(el);
    }

    /// Full resync: tear down every current item view, then rebuild one
    /// per current element in sequence order. Mirrors the model's own
    /// reset semantics; never a diff.
    pub(crate) fn resync_list(&self) {
        let current: Vec<Rc<View>> = self
            .children
            .borrow()
            .iter()
            .map(|(_, v)| Rc::clone(v))
            .collect();
        for child in current {
            self.remove_item_by_view(&child);
        }

        let values = match self.data() {
            Some(Value::List(list)) => list.items(),
            Some(Value::Seq(values)) => values,
            _ => Vec::new(),
        };
        for value in &values {
            self.add_item(value);
        }
    }

    fn create_item_view(&self, item: &Value) -> Result<Rc<View>, ViewError> {
        let spec = self
            .list
            .as_ref()
            .ok_or_else(|| ViewError::Handler("not a list view".into()))?;
        let token = next_token();
        let behavior = (spec.make_item)(item);
        let view = View::build(self.doc(), behavior, ViewConfig::with_data(item.clone()))?;
        if let Some(el) = view.el() {
            self.doc().set_attr(el, TOKEN_ATTR, &token);
        }
        *view.parent.borrow_mut() = self.this.clone();
        self.children.borrow_mut().push((token, Rc::clone(&view)));
        Ok(view)
    }

    fn child_el_at(&self, index: usize) -> Option<NodeId> {
        self.content_el
            .get()
            .and_then(|content| self.doc().child_at(content, index))
    }
}

//! Model-to-view binders.
//!
//! A binder is owned by exactly one view and lives as long as that view's
//! current data binding. It subscribes itself as an object-style wildcard
//! listener on the model at construction and unsubscribes on `detach`. The
//! model's bus holds it weakly, so a dropped binder never outlives its
//! registration.

use std::rc::{Rc, Weak};

use loft_core::{Listener, Subscribe, ANY};
use loft_model::{Item, List, ModelEvent};

use crate::View;

pub(crate) trait BinderHandle {
    fn detach(&self);
}

/// Forwards item field updates to the owning view.
pub(crate) struct ItemBinder {
    item: Item,
    view: Weak<View>,
    this: Weak<ItemBinder>,
}

impl ItemBinder {
    pub(crate) fn bind(item: Item, view: Weak<View>) -> Rc<ItemBinder> {
        let binder = Rc::new_cyclic(|this| ItemBinder {
            item,
            view,
            this: this.clone(),
        });
        let weak: Weak<dyn Subscribe<ModelEvent>> = binder.this.clone();
        binder.item.bus().listen(ANY, Listener::subscriber(weak));
        binder
    }
}

impl Subscribe<ModelEvent> for ItemBinder {
    fn on_message(&self, _name: &str, event: &ModelEvent) {
        let Some(view) = self.view.upgrade() else {
            return;
        };
        if let ModelEvent::Update { field, new_value, .. } = event {
            view.apply_field_update(field, new_value.clone());
        }
    }
}

impl BinderHandle for ItemBinder {
    fn detach(&self) {
        let weak: Weak<dyn Subscribe<ModelEvent>> = self.this.clone();
        self.item.bus().unlisten(ANY, Some(&Listener::subscriber(weak)));
    }
}

/// Forwards list mutations to the owning list-mode view.
pub(crate) struct ListBinder {
    list: List,
    view: Weak<View>,
    this: Weak<ListBinder>,
}

impl ListBinder {
    pub(crate) fn bind(list: List, view: Weak<View>) -> Rc<ListBinder> {
        let binder = Rc::new_cyclic(|this| ListBinder {
            list,
            view,
            this: this.clone(),
        });
        let weak: Weak<dyn Subscribe<ModelEvent>> = binder.this.clone();
        binder.list.bus().listen(ANY, Listener::subscriber(weak));
        binder
    }
}

impl Subscribe<ModelEvent> for ListBinder {
    fn on_message(&self, _name: &str, event: &ModelEvent) {
        let Some(view) = self.view.upgrade() else {
            return;
        };
        match event {
            // No index means append; index zero means "insert first".
            ModelEvent::Add { item, index: None } => view.add_item(item),
            ModelEvent::Add { item, index: Some(i) } => view.insert_item(item, *i),
            ModelEvent::UpdateAt { item, index } => view.update_item(item, *index),
            ModelEvent::Remove { index, .. } => view.remove_item_at(*index),
            ModelEvent::Update { .. } | ModelEvent::Destroy => {}
        }
    }
}

impl BinderHandle for ListBinder {
    fn detach(&self) {
        let weak: Weak<dyn Subscribe<ModelEvent>> = self.this.clone();
        self.list.bus().unlisten(ANY, Some(&Listener::subscriber(weak)));
    }
}

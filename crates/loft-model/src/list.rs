//! Observable sequence.

use std::cell::RefCell;
use std::rc::Rc;

use loft_core::EventBus;

use crate::{Item, ModelEvent, Value};

/// How raw values are wrapped when inserted into a [`List`].
#[derive(Clone)]
pub enum WrapPolicy {
    /// Keep values as-is.
    None,
    /// Wrap map values as plain [`Item`]s.
    Wrap,
    /// Wrap each value through a custom constructor.
    WrapWith(Rc<dyn Fn(&Value) -> Item>),
}

struct ListInner {
    data: RefCell<Vec<Value>>,
    wrap: WrapPolicy,
    bus: EventBus<ModelEvent>,
}

/// An ordered sequence of values with an embedded event bus.
///
/// `List` is a shared handle; cloning it shares the sequence. Element
/// identity is positional: `add`, `update` and `remove` each carry the
/// element plus its index, with `index: None` on `add` meaning append.
#[derive(Clone)]
pub struct List {
    inner: Rc<ListInner>,
}

impl List {
    pub fn new(wrap: WrapPolicy) -> Self {
        Self {
            inner: Rc::new(ListInner {
                data: RefCell::new(Vec::new()),
                wrap,
                bus: EventBus::new(),
            }),
        }
    }

    /// Create a list with initial elements, wrapped per policy. No events
    /// fire for the initial set.
    pub fn from_values(values: impl IntoIterator<Item = Value>, wrap: WrapPolicy) -> Self {
        let list = Self::new(wrap);
        {
            let mut data = list.inner.data.borrow_mut();
            for value in values {
                let wrapped = list.wrap_value(value);
                data.push(wrapped);
            }
        }
        list
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.data.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    /// Snapshot of the elements in order.
    pub fn items(&self) -> Vec<Value> {
        self.inner.data.borrow().clone()
    }

    /// Insert an element at `index`, or append with `None`. The emitted
    /// `add` event carries the index as given: consumers must read `None`
    /// as "append", not as index zero.
    pub fn add(&self, item: Value, index: Option<usize>) {
        let item = self.wrap_value(item);
        {
            let mut data = self.inner.data.borrow_mut();
            match index {
                Some(i) => {
                    let i = i.min(data.len());
                    data.insert(i, item.clone());
                }
                None => data.push(item.clone()),
            }
        }
        self.say(ModelEvent::Add { item, index });
    }

    /// Replace the element at `index`, or with `None` locate the element
    /// by equality first (the path taken when an element announced its own
    /// change and only needs its view refreshed). Always emits `update`,
    /// even when the reference is unchanged.
    pub fn update(&self, item: Value, index: Option<usize>) {
        let index = match index {
            Some(i) => i,
            None => match self.index_of_value(&item) {
                Some(i) => i,
                None => {
                    tracing::warn!("update target not present in list");
                    return;
                }
            },
        };
        if index >= self.len() {
            tracing::warn!(index, len = self.len(), "update index out of range");
            return;
        }
        let item = {
            let mut data = self.inner.data.borrow_mut();
            if data[index] != item {
                let wrapped = self.wrap_value(item);
                data[index] = wrapped;
            }
            data[index].clone()
        };
        self.say(ModelEvent::UpdateAt { item, index });
    }

    /// Remove and return the element at `index`, emitting `remove`.
    pub fn remove_at(&self, index: usize) -> Option<Value> {
        let item = {
            let mut data = self.inner.data.borrow_mut();
            if index >= data.len() {
                tracing::warn!(index, len = data.len(), "remove index out of range");
                return None;
            }
            data.remove(index)
        };
        self.say(ModelEvent::Remove { item: item.clone(), index });
        Some(item)
    }

    /// Remove an element located by equality.
    pub fn remove_item(&self, item: &Value) -> Option<Value> {
        let index = self.index_of_value(item)?;
        self.remove_at(index)
    }

    /// Add several elements. A fixed `index` is reused for every insert,
    /// so the batch ends up in reverse order at that position; `None`
    /// appends in order.
    pub fn add_all(&self, items: impl IntoIterator<Item = Value>, index: Option<usize>) {
        for item in items {
            self.add(item, index);
        }
    }

    /// Remove every element one at a time, firing `remove` per element.
    /// Forward order removes index 0 repeatedly; `reverse` removes from
    /// the last index down so observers see last-to-first.
    pub fn remove_all(&self, reverse: bool) {
        if reverse {
            for index in (0..self.len()).rev() {
                self.remove_at(index);
            }
        } else {
            while !self.is_empty() {
                self.remove_at(0);
            }
        }
    }

    pub fn remove_last(&self) -> Option<Value> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        self.remove_at(len - 1)
    }

    /// Replace the whole content: a full teardown (`remove` per element,
    /// forward order) followed by a rebuild (`add` per new element). Never
    /// a diff.
    pub fn reset(&self, values: impl IntoIterator<Item = Value>) {
        self.remove_all(false);
        self.add_all(values, None);
    }

    /// Index of the first element equal to `value`.
    pub fn index_of_value(&self, value: &Value) -> Option<usize> {
        self.inner.data.borrow().iter().position(|v| v == value)
    }

    /// Index of the first element whose `field` equals `value`. Elements
    /// without the field never match.
    pub fn index_of_field(&self, field: &str, value: &Value) -> Option<usize> {
        self.index_where(|v| match v {
            Value::Item(item) => item.get(field).as_ref() == Some(value),
            Value::Map(_) => v.entry(field) == Some(value),
            _ => false,
        })
    }

    /// Index of the first element matching the predicate.
    pub fn index_where(&self, pred: impl Fn(&Value) -> bool) -> Option<usize> {
        self.inner.data.borrow().iter().position(pred)
    }

    pub fn find_by_field(&self, field: &str, value: &Value) -> Option<Value> {
        self.index_of_field(field, value).and_then(|i| self.get(i))
    }

    pub fn find_where(&self, pred: impl Fn(&Value) -> bool) -> Option<Value> {
        self.index_where(pred).and_then(|i| self.get(i))
    }

    pub fn for_each(&self, mut f: impl FnMut(&Value)) {
        for value in self.items() {
            f(&value);
        }
    }

    pub fn any(&self, pred: impl Fn(&Value) -> bool) -> bool {
        self.inner.data.borrow().iter().any(pred)
    }

    /// Announce destruction. Elements are not destroyed.
    pub fn destroy(&self) {
        self.say(ModelEvent::Destroy);
    }

    pub fn bus(&self) -> &EventBus<ModelEvent> {
        &self.inner.bus
    }

    pub fn say(&self, event: ModelEvent) {
        self.inner.bus.say(event.name(), &event);
    }

    /// Handle identity.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn wrap_value(&self, value: Value) -> Value {
        if matches!(value, Value::Item(_) | Value::List(_)) {
            return value;
        }
        match &self.inner.wrap {
            WrapPolicy::None => value,
            WrapPolicy::Wrap => match value {
                Value::Map(pairs) => Value::Item(Item::from_pairs(pairs)),
                other => other,
            },
            WrapPolicy::WrapWith(make) => Value::Item(make(&value)),
        }
    }
}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("len", &self.len())
            .finish()
    }
}

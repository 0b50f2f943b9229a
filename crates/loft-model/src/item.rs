//! Observable record.

use std::cell::RefCell;
use std::rc::Rc;

use loft_core::EventBus;

use crate::value::value_add;
use crate::{ModelEvent, Value};

struct ItemInner {
    // Field counts are small; storage is an ordered pair list scanned
    // linearly, which also keeps application order deterministic.
    fields: RefCell<Vec<(String, Value)>>,
    bus: EventBus<ModelEvent>,
}

/// A record of named fields with an embedded event bus.
///
/// `Item` is a shared handle; cloning it shares the record. Every field
/// mutation that is not delegated into a nested model fires an `update`
/// message carrying the field name plus old and new values.
#[derive(Clone)]
pub struct Item {
    inner: Rc<ItemInner>,
}

impl Item {
    pub fn new() -> Self {
        Self::from_pairs(Vec::<(String, Value)>::new())
    }

    /// Create an item with initial fields. No events fire for the initial
    /// set.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<Value>)>,
    ) -> Self {
        Self {
            inner: Rc::new(ItemInner {
                fields: RefCell::new(
                    pairs
                        .into_iter()
                        .map(|(k, v)| (k.into(), v.into()))
                        .collect(),
                ),
                bus: EventBus::new(),
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner
            .fields
            .borrow()
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v.clone())
    }

    /// Snapshot of the fields in insertion order.
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.inner.fields.borrow().clone()
    }

    /// Merge a value into a field. A sequence field is appended to in
    /// place, and the emitted event then carries the same mutated sequence
    /// as both old and new value. Anything else goes through additive merge
    /// (numeric addition or string concatenation) with distinct old/new.
    pub fn add(&self, field: &str, value: Value) {
        let cur = self.get(field).unwrap_or(Value::Null);
        if let Value::Seq(_) = cur {
            {
                let mut fields = self.inner.fields.borrow_mut();
                if let Some((_, Value::Seq(seq))) =
                    fields.iter_mut().find(|(name, _)| name == field)
                {
                    seq.push(value);
                }
            }
            let now = self.get(field).unwrap_or(Value::Null);
            self.say(ModelEvent::Update {
                field: field.to_string(),
                new_value: now.clone(),
                old_value: now,
            });
        } else {
            self.update_field(field, value_add(&cur, &value));
        }
    }

    /// Flip the boolean coercion of a field.
    pub fn toggle(&self, field: &str) {
        let cur = self.get(field).map(|v| v.truthy()).unwrap_or(false);
        self.update_field(field, Value::Bool(!cur));
    }

    /// Apply several field updates, each through the single-field rule.
    pub fn update(&self, pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<Value>)>) {
        for (field, value) in pairs {
            self.update_field(&field.into(), value.into());
        }
    }

    /// Announce destruction. Nested models are not destroyed; that is the
    /// caller's decision.
    pub fn destroy(&self) {
        self.say(ModelEvent::Destroy);
    }

    /// The single-field update rule. A field currently holding a nested
    /// model delegates into it (`List` resets, `Item` merges) instead of
    /// replacing the reference; otherwise the field is assigned and an
    /// `update` event fires.
    pub fn update_field(&self, field: &str, value: Value) {
        match self.get(field) {
            Some(Value::List(list)) => {
                let values = match value {
                    Value::Seq(vs) => vs,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                list.reset(values);
            }
            Some(Value::Item(child)) => match value {
                Value::Map(pairs) => child.update(pairs),
                other => {
                    tracing::debug!(field, ?other, "non-map update for nested item ignored");
                }
            },
            cur => {
                let old = cur.unwrap_or(Value::Null);
                self.assign(field, value.clone());
                self.say(ModelEvent::Update {
                    field: field.to_string(),
                    new_value: value,
                    old_value: old,
                });
            }
        }
    }

    /// Assign a field without firing events.
    pub(crate) fn assign(&self, field: &str, value: Value) {
        let mut fields = self.inner.fields.borrow_mut();
        match fields.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => fields.push((field.to_string(), value)),
        }
    }

    pub fn bus(&self) -> &EventBus<ModelEvent> {
        &self.inner.bus
    }

    pub fn say(&self, event: ModelEvent) {
        self.inner.bus.say(event.name(), &event);
    }

    /// Handle identity.
    pub fn ptr_eq(&self, other: &Item) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("fields", &self.inner.fields.borrow())
            .finish()
    }
}

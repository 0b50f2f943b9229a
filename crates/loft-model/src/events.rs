//! Model change events.

use crate::Value;

/// A structured change emitted by [`Item`](crate::Item) and
/// [`List`](crate::List) mutations. The bus message name is [`name`].
///
/// [`name`]: ModelEvent::name
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// A field of an item changed.
    Update {
        field: String,
        new_value: Value,
        old_value: Value,
    },
    /// An element was added to a list. `index: None` means append.
    Add { item: Value, index: Option<usize> },
    /// A list element was replaced (or refreshed) at an index.
    UpdateAt { item: Value, index: usize },
    /// A list element was removed from an index.
    Remove { item: Value, index: usize },
    /// The model was explicitly destroyed.
    Destroy,
}

impl ModelEvent {
    /// The bus message name this event is published under.
    pub fn name(&self) -> &'static str {
        match self {
            ModelEvent::Update { .. } | ModelEvent::UpdateAt { .. } => "update",
            ModelEvent::Add { .. } => "add",
            ModelEvent::Remove { .. } => "remove",
            ModelEvent::Destroy => "destroy",
        }
    }
}

//! Loft Model - Observable data containers
//!
//! [`Item`] is a record of named fields, [`List`] an ordered sequence of
//! values; both emit structured [`ModelEvent`]s through an embedded
//! [`EventBus`](loft_core::EventBus) on every mutation. Views subscribe via
//! binders and translate events into UI updates.

mod events;
mod item;
mod json;
mod list;
mod value;

pub use events::ModelEvent;
pub use item::Item;
pub use json::{item_from_json, list_from_json, to_json, value_from_json};
pub use list::{List, WrapPolicy};
pub use value::Value;

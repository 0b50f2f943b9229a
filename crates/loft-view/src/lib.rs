//! Loft View - Binding documents to observable models
//!
//! A [`View`] owns a document subtree, applies bound data to identified
//! elements, composes child views, traps UI events declared by its
//! [`Behavior`], and keeps the subtree in sync with an observable model
//! through a binder. List-mode views render a [`List`](loft_model::List)
//! as a dynamic sequence of item views.

use std::cell::Cell;

mod behavior;
mod binder;
mod events;
mod form;
mod list;
mod view;

pub use behavior::{Behavior, Children};
pub use events::{EventHandler, EventTable, EventTarget};
pub use list::ListSpec;
pub use view::{ContentRef, RootRef, View, ViewConfig};

/// Attribute carrying the generated identity token of a list item element.
pub const TOKEN_ATTR: &str = "data-loft-id";

/// View layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// An identifier-based root (or marker) element could not be located.
    #[error("element not found: {id}")]
    MissingRootElement { id: String },
    /// A user-supplied event handler reported a failure.
    #[error("handler failed: {0}")]
    Handler(String),
}

/// Generated identity tokens for list item views. Single-threaded, so a
/// thread-local counter is enough.
pub(crate) fn next_token() -> String {
    thread_local! {
        static COUNTER: Cell<u64> = const { Cell::new(0) };
    }
    COUNTER.with(|c| {
        let n = c.get();
        c.set(n + 1);
        format!("_lf{n}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = next_token();
        let b = next_token();
        assert_ne!(a, b);
        assert!(a.starts_with("_lf"));
    }
}

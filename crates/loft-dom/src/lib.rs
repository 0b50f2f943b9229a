//! Loft DOM - Headless document substrate
//!
//! Arena-based node tree with attributes, queries, event dispatch and
//! markup instantiation. The view layer consumes this as its platform API;
//! nothing here knows about models or views.

mod document;
mod events;
mod markup;
mod node;

pub use document::Document;
pub use events::{DomEvent, EventKind, ListenerId};
pub use markup::Markup;
pub use node::{Attribute, ElementData, Node, NodeData};

/// Node identifier (index into the document arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The document body, always present at index 0.
    pub const BODY: NodeId = NodeId(0);

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

//! Document: arena node tree plus listener table.
//!
//! The listener table lives apart from the node arena so event handlers can
//! mutate the tree re-entrantly while a dispatch is in flight; dispatch
//! iterates a snapshot of the callbacks attached to each node.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::events::{DomEvent, EventKind, ListenerId};
use crate::markup::Markup;
use crate::node::{Node, NodeData};
use crate::NodeId;

type Callback = Rc<dyn Fn(&mut DomEvent)>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    callback: Callback,
}

#[derive(Default)]
struct NodeListeners {
    /// Single-slot handlers (click/submit/change property assignment).
    hooks: Vec<ListenerEntry>,
    /// Additive listeners.
    extra: Vec<ListenerEntry>,
}

struct DocInner {
    nodes: RefCell<Vec<Node>>,
    listeners: RefCell<HashMap<NodeId, NodeListeners>>,
    next_listener: Cell<u64>,
    title: RefCell<String>,
}

/// Shared handle over a document. Cloning shares the arena.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocInner>,
}

impl Document {
    /// Create a document with an empty `<body>` at [`NodeId::BODY`].
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocInner {
                nodes: RefCell::new(vec![Node::element("body")]),
                listeners: RefCell::new(HashMap::new()),
                next_listener: Cell::new(0),
                title: RefCell::new(String::new()),
            }),
        }
    }

    pub fn body(&self) -> NodeId {
        NodeId::BODY
    }

    pub fn title(&self) -> String {
        self.inner.title.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        *self.inner.title.borrow_mut() = title.to_string();
    }

    // ---- node construction ----

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.alloc(Node::element(tag))
    }

    pub fn create_text(&self, content: &str) -> NodeId {
        self.alloc(Node::text(content))
    }

    /// Build a detached subtree from a markup template; returns its root.
    pub fn instantiate(&self, markup: &Markup) -> NodeId {
        match markup {
            Markup::Text(content) => self.create_text(content),
            Markup::Element { tag, attrs, children } => {
                let el = self.create_element(tag);
                for (name, value) in attrs {
                    self.set_attr(el, name, value);
                }
                for child in children {
                    let c = self.instantiate(child);
                    self.append_child(el, c);
                }
                el
            }
        }
    }

    // ---- tree structure ----

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.nodes.borrow().get(node.index()).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .nodes
            .borrow()
            .get(node.index())
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.inner
            .nodes
            .borrow()
            .get(node.index())
            .and_then(|n| n.children.get(index).copied())
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.inner
            .nodes
            .borrow()
            .get(node.index())
            .map(|n| n.children.len())
            .unwrap_or(0)
    }

    /// Whether the node is reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.inner.nodes.borrow();
        let mut cur = node;
        loop {
            if cur == NodeId::BODY {
                return true;
            }
            match nodes.get(cur.index()).and_then(|n| n.parent) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let mut nodes = self.inner.nodes.borrow_mut();
        nodes[parent.index()].children.push(child);
        nodes[child.index()].parent = Some(parent);
    }

    /// Insert `new` before `anchor` among `parent`'s children; append when
    /// the anchor is absent.
    pub fn insert_before(&self, parent: NodeId, new: NodeId, anchor: Option<NodeId>) {
        self.detach(new);
        let mut nodes = self.inner.nodes.borrow_mut();
        let pos = anchor.and_then(|a| nodes[parent.index()].children.iter().position(|&c| c == a));
        match pos {
            Some(pos) => nodes[parent.index()].children.insert(pos, new),
            None => nodes[parent.index()].children.push(new),
        }
        nodes[new.index()].parent = Some(parent);
    }

    /// Replace `old` with `new` among `parent`'s children.
    pub fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) {
        self.detach(new);
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(pos) = nodes[parent.index()].children.iter().position(|&c| c == old) {
            nodes[parent.index()].children[pos] = new;
            nodes[new.index()].parent = Some(parent);
            nodes[old.index()].parent = None;
        }
    }

    /// Remove the node from its parent. Detached subtrees stay alive and
    /// can be re-inserted.
    pub fn detach(&self, node: NodeId) {
        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(parent) = nodes[node.index()].parent.take() {
            nodes[parent.index()].children.retain(|&c| c != node);
        }
    }

    // ---- attributes ----

    pub fn tag(&self, node: NodeId) -> Option<String> {
        self.inner
            .nodes
            .borrow()
            .get(node.index())
            .and_then(|n| n.as_element().map(|e| e.tag.clone()))
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .nodes
            .borrow()
            .get(node.index())
            .and_then(|n| n.as_element().and_then(|e| e.get_attr(name).map(String::from)))
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.inner.nodes.borrow_mut()[node.index()].as_element_mut() {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        if let Some(el) = self.inner.nodes.borrow_mut()[node.index()].as_element_mut() {
            el.remove_attr(name);
        }
    }

    // ---- queries ----

    /// Find an attached element by its `id` attribute.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_descendant(NodeId::BODY, &mut |doc, n| doc.attr(n, "id").as_deref() == Some(id))
    }

    /// Find a descendant of `scope` by its `data-id` attribute.
    pub fn query_data_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.find_descendant(scope, &mut |doc, n| {
            doc.attr(n, "data-id").as_deref() == Some(id)
        })
    }

    /// All descendants of `scope` carrying the given attribute, in document
    /// order.
    pub fn descendants_with_attr(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            if self.attr(n, name).is_some() {
                out.push(n);
            }
            stack.extend(self.children(n).into_iter().rev());
        }
        out
    }

    fn find_descendant(
        &self,
        scope: NodeId,
        pred: &mut dyn FnMut(&Document, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(n) = stack.pop() {
            if pred(self, n) {
                return Some(n);
            }
            stack.extend(self.children(n).into_iter().rev());
        }
        None
    }

    // ---- content ----

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let text = self
            .inner
            .nodes
            .borrow()
            .get(node.index())
            .and_then(|n| n.as_text().map(String::from));
        if let Some(t) = text {
            out.push_str(&t);
            return;
        }
        for child in self.children(node) {
            self.collect_text(child, out);
        }
    }

    /// Replace the node's children with a single text node.
    pub fn set_text_content(&self, node: NodeId, content: &str) {
        self.clear_children(node);
        let t = self.create_text(content);
        self.append_child(node, t);
    }

    /// Store opaque markup on the node. No parsing happens: the raw string
    /// is kept as a single text child.
    pub fn set_raw_html(&self, node: NodeId, html: &str) {
        self.set_text_content(node, html);
    }

    /// Whether the element carries a writable `value` (form controls).
    pub fn is_form_control(&self, node: NodeId) -> bool {
        matches!(
            self.tag(node).as_deref(),
            Some("input") | Some("textarea") | Some("select")
        )
    }

    pub fn value(&self, node: NodeId) -> Option<String> {
        self.attr(node, "value")
    }

    pub fn set_value(&self, node: NodeId, value: &str) {
        self.set_attr(node, "value", value);
    }

    fn clear_children(&self, node: NodeId) {
        for child in self.children(node) {
            self.detach(child);
        }
    }

    // ---- events ----

    /// Attach a single-slot handler, replacing any existing handler of the
    /// same kind on this node.
    pub fn set_hook(&self, node: NodeId, kind: EventKind, callback: Callback) -> ListenerId {
        let id = self.next_listener_id();
        let mut listeners = self.inner.listeners.borrow_mut();
        let slot = listeners.entry(node).or_default();
        if slot.hooks.iter().any(|e| e.kind == kind) {
            tracing::debug!(?node, kind = kind.name(), "replacing hook handler");
        }
        slot.hooks.retain(|e| e.kind != kind);
        slot.hooks.push(ListenerEntry { id, kind, callback });
        id
    }

    /// Attach an additive listener.
    pub fn add_listener(&self, node: NodeId, kind: EventKind, callback: Callback) -> ListenerId {
        let id = self.next_listener_id();
        let mut listeners = self.inner.listeners.borrow_mut();
        listeners
            .entry(node)
            .or_default()
            .extra
            .push(ListenerEntry { id, kind, callback });
        id
    }

    /// Detach a listener (hook or additive) by id.
    pub fn remove_listener(&self, node: NodeId, id: ListenerId) {
        let mut listeners = self.inner.listeners.borrow_mut();
        if let Some(slot) = listeners.get_mut(&node) {
            slot.hooks.retain(|e| e.id != id);
            slot.extra.retain(|e| e.id != id);
        }
    }

    /// Deliver an event to its target, then bubble through ancestors unless
    /// stopped. Returns the event's final state so callers can inspect
    /// default prevention.
    pub fn dispatch(&self, mut event: DomEvent) -> DomEvent {
        tracing::trace!(kind = event.kind.name(), target = ?event.target, "dispatch");
        let mut current = Some(event.target);
        while let Some(node) = current {
            event.current_target = node;
            for cb in self.callbacks_for(node, &event.kind) {
                cb(&mut event);
            }
            if !event.bubbles || event.is_propagation_stopped() {
                break;
            }
            current = self.parent(node);
        }
        event
    }

    fn callbacks_for(&self, node: NodeId, kind: &EventKind) -> Vec<Callback> {
        let listeners = self.inner.listeners.borrow();
        let Some(slot) = listeners.get(&node) else {
            return Vec::new();
        };
        slot.hooks
            .iter()
            .chain(slot.extra.iter())
            .filter(|e| &e.kind == kind)
            .map(|e| Rc::clone(&e.callback))
            .collect()
    }

    fn next_listener_id(&self) -> ListenerId {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        ListenerId(id)
    }

    fn alloc(&self, node: Node) -> NodeId {
        let mut nodes = self.inner.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(node);
        id
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.inner.nodes.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn doc_with_list() -> (Document, NodeId) {
        let doc = Document::new();
        let ul = doc.create_element("ul");
        doc.append_child(doc.body(), ul);
        (doc, ul)
    }

    #[test]
    fn test_append_and_order() {
        let (doc, ul) = doc_with_list();
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        doc.append_child(ul, a);
        doc.append_child(ul, b);
        assert_eq!(doc.children(ul), vec![a, b]);
        assert_eq!(doc.parent(a), Some(ul));
    }

    #[test]
    fn test_insert_before_and_replace() {
        let (doc, ul) = doc_with_list();
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let c = doc.create_element("li");
        doc.append_child(ul, a);
        doc.insert_before(ul, b, Some(a));
        assert_eq!(doc.children(ul), vec![b, a]);

        doc.replace_child(ul, c, b);
        assert_eq!(doc.children(ul), vec![c, a]);
        assert_eq!(doc.parent(b), None);
    }

    #[test]
    fn test_detach_and_attachment() {
        let (doc, ul) = doc_with_list();
        let a = doc.create_element("li");
        doc.append_child(ul, a);
        assert!(doc.is_attached(a));

        doc.detach(a);
        assert!(!doc.is_attached(a));
        assert_eq!(doc.children(ul), Vec::<NodeId>::new());
    }

    #[test]
    fn test_queries() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attr(div, "id", "root");
        doc.append_child(doc.body(), div);
        let span = doc.create_element("span");
        doc.set_attr(span, "data-id", "name");
        doc.append_child(div, span);

        assert_eq!(doc.get_element_by_id("root"), Some(div));
        assert_eq!(doc.query_data_id(div, "name"), Some(span));
        assert_eq!(doc.query_data_id(div, "missing"), None);
        assert_eq!(doc.descendants_with_attr(doc.body(), "data-id"), vec![span]);
    }

    #[test]
    fn test_text_content() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span);
        doc.set_text_content(span, "hello");
        let tail = doc.create_text(" world");
        doc.append_child(div, tail);

        assert_eq!(doc.text_content(div), "hello world");

        doc.set_text_content(div, "reset");
        assert_eq!(doc.text_content(div), "reset");
    }

    #[test]
    fn test_instantiate_markup() {
        let doc = Document::new();
        let el = doc.instantiate(
            &Markup::el("div")
                .data_id("card")
                .child(Markup::el("span").data_id("name").child(Markup::text("n/a"))),
        );
        assert_eq!(doc.tag(el).as_deref(), Some("div"));
        assert_eq!(doc.parent(el), None);
        let span = doc.query_data_id(el, "name").unwrap();
        assert_eq!(doc.text_content(span), "n/a");
    }

    #[test]
    fn test_dispatch_bubbles_and_stops() {
        let doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("button");
        doc.append_child(doc.body(), outer);
        doc.append_child(outer, inner);

        let inner_hits = Rc::new(Cell::new(0));
        let outer_hits = Rc::new(Cell::new(0));

        let ih = Rc::clone(&inner_hits);
        doc.add_listener(inner, EventKind::Input, Rc::new(move |_| ih.set(ih.get() + 1)));
        let oh = Rc::clone(&outer_hits);
        doc.add_listener(outer, EventKind::Input, Rc::new(move |_| oh.set(oh.get() + 1)));

        doc.dispatch(DomEvent::new(EventKind::Input, inner, true));
        assert_eq!((inner_hits.get(), outer_hits.get()), (1, 1));

        // Stopping propagation keeps the event on the target.
        let ih = Rc::clone(&inner_hits);
        doc.add_listener(
            inner,
            EventKind::Input,
            Rc::new(move |e| {
                e.stop_propagation();
                ih.set(ih.get());
            }),
        );
        doc.dispatch(DomEvent::new(EventKind::Input, inner, true));
        assert_eq!((inner_hits.get(), outer_hits.get()), (2, 1));
    }

    #[test]
    fn test_hook_replaces_previous() {
        let doc = Document::new();
        let btn = doc.create_element("button");
        doc.append_child(doc.body(), btn);

        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let f = Rc::clone(&first);
        doc.set_hook(btn, EventKind::Click, Rc::new(move |_| f.set(f.get() + 1)));
        let s = Rc::clone(&second);
        doc.set_hook(btn, EventKind::Click, Rc::new(move |_| s.set(s.get() + 1)));

        doc.dispatch(DomEvent::new(EventKind::Click, btn, false));
        assert_eq!((first.get(), second.get()), (0, 1));
    }

    #[test]
    fn test_remove_listener() {
        let doc = Document::new();
        let btn = doc.create_element("button");
        doc.append_child(doc.body(), btn);

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let id = doc.add_listener(btn, EventKind::Input, Rc::new(move |_| h.set(h.get() + 1)));

        doc.dispatch(DomEvent::new(EventKind::Input, btn, false));
        doc.remove_listener(btn, id);
        doc.dispatch(DomEvent::new(EventKind::Input, btn, false));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_handler_can_mutate_tree() {
        let doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div);

        let d = doc.clone();
        doc.add_listener(
            div,
            EventKind::Input,
            Rc::new(move |e| {
                let child = d.create_element("span");
                d.append_child(e.target, child);
            }),
        );
        doc.dispatch(DomEvent::new(EventKind::Input, div, false));
        assert_eq!(doc.child_count(div), 1);
    }

    #[test]
    fn test_form_control_value() {
        let doc = Document::new();
        let input = doc.create_element("input");
        assert!(doc.is_form_control(input));
        doc.set_value(input, "abc");
        assert_eq!(doc.value(input).as_deref(), Some("abc"));

        let div = doc.create_element("div");
        assert!(!doc.is_form_control(div));
    }
}

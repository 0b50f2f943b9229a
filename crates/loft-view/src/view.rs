//! The view core.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use loft_dom::{Document, DomEvent, EventKind, ListenerId, NodeId};
use loft_model::Value;

use crate::binder::{BinderHandle, ItemBinder, ListBinder};
use crate::{Behavior, Children, EventTable, EventTarget, ListSpec, ViewError};

/// How the root element is obtained.
#[derive(Debug, Clone)]
pub enum RootRef {
    /// An existing node.
    Node(NodeId),
    /// An identifier resolved against the parent's lookup scope (or the
    /// whole document when there is no parent). Resolution failure is a
    /// construction error.
    Id(String),
}

/// Where child elements are inserted. Defaults to the root element.
#[derive(Debug, Clone)]
pub enum ContentRef {
    Node(NodeId),
    Id(String),
}

/// Construction properties for a view.
#[derive(Default)]
pub struct ViewConfig {
    pub root: Option<RootRef>,
    pub content: Option<ContentRef>,
    pub data: Option<Value>,
    /// Present for list-mode views.
    pub list: Option<ListSpec>,
}

impl ViewConfig {
    pub fn with_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

/// A view instance: a document subtree bound to data, with child views,
/// trapped events and an optional model binder.
///
/// Views are shared handles (`Rc<View>`); a parent owns its children
/// strongly and children refer back weakly.
pub struct View {
    pub(crate) this: Weak<View>,
    doc: Document,
    pub(crate) behavior: Rc<dyn Behavior>,
    pub(crate) el: Cell<Option<NodeId>>,
    root_ref: RefCell<Option<RootRef>>,
    content_ref: RefCell<Option<ContentRef>>,
    pub(crate) content_el: Cell<Option<NodeId>>,
    pub(crate) parent: RefCell<Weak<View>>,
    pub(crate) children: RefCell<Vec<(String, Rc<View>)>>,
    data: RefCell<Option<Value>>,
    binders: RefCell<Vec<Rc<dyn BinderHandle>>>,
    events: RefCell<EventTable>,
    el_cache: RefCell<HashMap<String, NodeId>>,
    traps: RefCell<Vec<(NodeId, ListenerId)>>,
    pub(crate) list: Option<ListSpec>,
    destroyed: Cell<bool>,
}

impl View {
    /// Build a top-level view.
    pub fn build(
        doc: &Document,
        behavior: Rc<dyn Behavior>,
        config: ViewConfig,
    ) -> Result<Rc<View>, ViewError> {
        Self::build_inner(doc, behavior, config, None)
    }

    /// Build a view owned by `parent`. A template-rendered child is
    /// appended to the parent's content element immediately.
    pub fn build_child(
        parent: &Rc<View>,
        behavior: Rc<dyn Behavior>,
        config: ViewConfig,
    ) -> Result<Rc<View>, ViewError> {
        Self::build_inner(&parent.doc, behavior, config, Some(parent))
    }

    /// Create a view with no root element yet. Intended for renderless
    /// children declared in a `load` hook: the parent locates an element
    /// named after the child and completes the build there.
    pub fn declare(doc: &Document, behavior: Rc<dyn Behavior>) -> Rc<View> {
        Self::alloc(doc, behavior, ViewConfig::default(), None)
    }

    /// [`declare`](View::declare) with explicit construction properties.
    pub fn declare_with(doc: &Document, behavior: Rc<dyn Behavior>, config: ViewConfig) -> Rc<View> {
        Self::alloc(doc, behavior, config, None)
    }

    fn build_inner(
        doc: &Document,
        behavior: Rc<dyn Behavior>,
        config: ViewConfig,
        parent: Option<&Rc<View>>,
    ) -> Result<Rc<View>, ViewError> {
        let view = Self::alloc(doc, behavior, config, parent);
        view.set_root_node(view.root_ref.borrow_mut().take(), parent)?;
        if view.el.get().is_some() {
            view.finish_load()?;
        }
        Ok(view)
    }

    fn alloc(
        doc: &Document,
        behavior: Rc<dyn Behavior>,
        config: ViewConfig,
        parent: Option<&Rc<View>>,
    ) -> Rc<View> {
        let ViewConfig { root, content, data, list } = config;
        let data = behavior.init(data);

        Rc::new_cyclic(|this| View {
            this: this.clone(),
            doc: doc.clone(),
            behavior,
            el: Cell::new(None),
            root_ref: RefCell::new(root),
            content_ref: RefCell::new(content),
            content_el: Cell::new(None),
            parent: RefCell::new(match parent {
                Some(p) => Rc::downgrade(p),
                None => Weak::new(),
            }),
            children: RefCell::new(Vec::new()),
            data: RefCell::new(data),
            binders: RefCell::new(Vec::new()),
            events: RefCell::new(EventTable::new()),
            el_cache: RefCell::new(HashMap::new()),
            traps: RefCell::new(Vec::new()),
            list,
            destroyed: Cell::new(false),
        })
    }

    /// Resolve the root element. A template behavior renders a fresh
    /// subtree, replacing a located root in place (or going to the
    /// parent's content area); otherwise the located root is adopted
    /// directly. A view may also end up rootless here and be completed
    /// later by its parent at a marker element.
    fn set_root_node(
        &self,
        root: Option<RootRef>,
        parent: Option<&Rc<View>>,
    ) -> Result<(), ViewError> {
        let resolved = match root {
            Some(RootRef::Node(node)) => Some(node),
            Some(RootRef::Id(id)) => {
                let found = match parent {
                    Some(p) => p.find_el(&id),
                    None => self.doc.get_element_by_id(&id),
                };
                Some(found.ok_or(ViewError::MissingRootElement { id })?)
            }
            None => None,
        };

        let markup = {
            let data = self.data.borrow();
            self.behavior.render(data.as_ref())
        };
        if let Some(markup) = markup {
            let el = self.doc.instantiate(&markup);
            self.el.set(Some(el));
            if let Some(parent) = parent {
                parent.append_el(el);
            } else if let Some(root) = resolved {
                if let Some(anchor_parent) = self.doc.parent(root) {
                    self.doc.replace_child(anchor_parent, el, root);
                }
            }
        } else if let Some(root) = resolved {
            self.el.set(Some(root));
        }
        Ok(())
    }

    /// The attach phase: resolve the content element, load children and
    /// events, apply data to the UI and bind it, then report completion.
    pub(crate) fn finish_load(&self) -> Result<(), ViewError> {
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };
        let Some(el) = self.el.get() else {
            return Ok(());
        };

        let content = match self.content_ref.borrow_mut().take() {
            Some(ContentRef::Node(node)) => node,
            Some(ContentRef::Id(id)) => self
                .find_el(&id)
                .ok_or(ViewError::MissingRootElement { id })?,
            None => el,
        };
        self.content_el.set(Some(content));

        self.load_views_events(&this)?;
        self.apply_data_to_ui();
        self.bind_data();
        self.behavior.completed(&this);
        Ok(())
    }

    fn load_views_events(&self, this: &Rc<View>) -> Result<(), ViewError> {
        let mut declared = Children::new();
        self.behavior.load(this, &mut declared)?;

        for (name, child) in declared.into_entries() {
            match child.el.get() {
                None => {
                    // The child binds to an element of this view's subtree
                    // named after it, and finishes its own build there.
                    let el = self
                        .find_el(&name)
                        .ok_or_else(|| ViewError::MissingRootElement { id: name.clone() })?;
                    child.el.set(Some(el));
                    child.finish_load()?;
                }
                Some(el) if self.doc.parent(el).is_none() && el != self.doc.body() => {
                    // A detached child is embedded at its marker element,
                    // or appended when no marker exists.
                    match self.find_el(&name) {
                        Some(marker) => match self.doc.parent(marker) {
                            Some(marker_parent) => {
                                self.doc.replace_child(marker_parent, el, marker)
                            }
                            None => self.append_el(el),
                        },
                        None => self.append_el(el),
                    }
                }
                Some(_) => {}
            }
            *child.parent.borrow_mut() = Rc::downgrade(this);
            self.children.borrow_mut().push((name, child));
        }

        let mut table = EventTable::new();
        self.behavior.handle(&mut table);
        for (target, kind, handler) in table.entries() {
            let el = match target {
                EventTarget::Root => self.el.get(),
                EventTarget::Named(name) => self
                    .child(name)
                    .and_then(|v| v.el())
                    .or_else(|| self.find_el(name)),
            };
            match el {
                Some(el) => self.trap(el, kind.clone(), Rc::clone(handler)),
                None => tracing::debug!(?target, "no element for declared handler"),
            }
        }
        *self.events.borrow_mut() = table;
        Ok(())
    }

    /// Attach a handler to an element, recording it for teardown. Hook
    /// kinds use single-slot assignment; a handler's `Some(true)` allows
    /// the default action, anything else prevents it. Handler failures are
    /// caught and logged here so one failing handler cannot break
    /// delivery.
    pub(crate) fn trap(&self, el: NodeId, kind: EventKind, handler: crate::EventHandler) {
        let weak = self.this.clone();
        let is_hook = kind.is_hook();
        let callback: Rc<dyn Fn(&mut DomEvent)> = Rc::new(move |event| {
            let Some(view) = weak.upgrade() else {
                return;
            };
            let outcome = match handler(&view, event) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(error = %err, kind = event.kind.name(), "event handler failed");
                    None
                }
            };
            if is_hook && outcome != Some(true) {
                event.prevent_default();
            }
        });

        let id = if is_hook {
            self.doc.set_hook(el, kind, callback)
        } else {
            self.doc.add_listener(el, kind, callback)
        };
        self.traps.borrow_mut().push((el, id));
    }

    // ---- data binding ----

    pub fn data(&self) -> Option<Value> {
        self.data.borrow().clone()
    }

    /// Replace the bound data wholesale: the old binder is dropped, the UI
    /// re-applied, and a new binder created. Safe to call repeatedly and
    /// with `None`.
    pub fn set_data(&self, value: Option<Value>) {
        *self.data.borrow_mut() = value;
        self.unbind_data();
        self.apply_data_to_ui();
        self.bind_data();
    }

    fn bind_data(&self) {
        let data = self.data.borrow().clone();
        let binder: Option<Rc<dyn BinderHandle>> = if self.list.is_some() {
            match data {
                Some(Value::List(list)) => Some(ListBinder::bind(list, self.this.clone())),
                _ => None,
            }
        } else {
            match data {
                Some(Value::Item(item)) => Some(ItemBinder::bind(item, self.this.clone())),
                _ => None,
            }
        };
        if let Some(binder) = binder {
            self.binders.borrow_mut().push(binder);
        }
    }

    fn unbind_data(&self) {
        if let Some(binder) = self.binders.borrow_mut().pop() {
            binder.detach();
        }
    }

    pub(crate) fn apply_data_to_ui(&self) {
        if self.list.is_some() {
            self.resync_list();
            return;
        }
        let data = self.data.borrow().clone();
        match data {
            None => {}
            Some(Value::Item(item)) => {
                for (name, value) in item.fields() {
                    self.set_field_value(&name, value);
                }
            }
            Some(Value::Map(pairs)) => {
                for (name, value) in pairs {
                    self.set_field_value(&name, value);
                }
            }
            Some(Value::List(_)) => {
                tracing::debug!("list data bound to a non-list view is not applied");
            }
            Some(scalar) => {
                if let Some(el) = self.el.get() {
                    self.set_el_value(el, &scalar);
                }
            }
        }
    }

    /// Route one field to its target: a child view named after the field
    /// takes the value as its data; otherwise an identified element takes
    /// it as content. Returns false when no target exists.
    pub fn set_field_value(&self, name: &str, value: Value) -> bool {
        let child = self.child(name);
        if let Some(child) = child {
            child.set_data(Some(value));
            return true;
        }
        match self.find_el(name) {
            Some(el) => {
                self.set_el_value(el, &value);
                true
            }
            None => false,
        }
    }

    /// Write a value into an element: raw markup for `data-type="html"`
    /// elements, the value property for form controls, text content
    /// otherwise.
    fn set_el_value(&self, el: NodeId, value: &Value) {
        let text = value.display_text();
        if self.doc.attr(el, "data-type").as_deref() == Some("html") {
            self.doc.set_raw_html(el, &text);
        } else if self.doc.is_form_control(el) {
            self.doc.set_value(el, &text);
        } else {
            self.doc.set_text_content(el, &text);
        }
    }

    /// Binder entry point for a single model field change.
    pub(crate) fn apply_field_update(&self, field: &str, value: Value) {
        if !self.set_field_value(field, value) {
            tracing::debug!(field, "no binding target for updated field");
        }
    }

    // ---- lookup ----

    /// Locate an element by its `data-id` within this view's subtree,
    /// falling back to a document-wide `id` lookup. Hits are cached; a
    /// cached entry whose node has been detached is re-resolved.
    pub fn find_el(&self, id: &str) -> Option<NodeId> {
        if let Some(&cached) = self.el_cache.borrow().get(id) {
            if self.doc.parent(cached).is_some() {
                return Some(cached);
            }
        }
        let found = self
            .el
            .get()
            .and_then(|el| self.doc.query_data_id(el, id))
            .or_else(|| self.doc.get_element_by_id(id));
        if let Some(node) = found {
            self.el_cache.borrow_mut().insert(id.to_string(), node);
        }
        found
    }

    /// Append an element to the content area.
    pub fn append_el(&self, el: NodeId) {
        if let Some(content) = self.content_el.get() {
            self.doc.append_child(content, el);
        }
    }

    // ---- composition ----

    pub fn child(&self, name: &str) -> Option<Rc<View>> {
        self.children
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| Rc::clone(v))
    }

    pub fn parent(&self) -> Option<Rc<View>> {
        self.parent.borrow().upgrade()
    }

    /// Replace (or remove, with `None`) the named child view after load.
    /// The outgoing child is destroyed and its element detached; the
    /// incoming one is appended and receives this view's declared handlers
    /// for its name.
    pub fn set_child(&self, name: &str, view: Option<Rc<View>>) {
        let existing = {
            let mut children = self.children.borrow_mut();
            children
                .iter()
                .position(|(n, _)| n == name)
                .map(|i| children.remove(i).1)
        };
        if let Some(old) = existing {
            old.destroy();
            if let Some(el) = old.el() {
                self.doc.detach(el);
            }
        }

        if let Some(view) = view {
            if let Some(el) = view.el() {
                self.append_el(el);
                let table = self.events.borrow();
                for (target, kind, handler) in table.entries() {
                    if matches!(target, EventTarget::Named(n) if n == name) {
                        self.trap(el, kind.clone(), Rc::clone(handler));
                    }
                }
            }
            *view.parent.borrow_mut() = self.this.clone();
            self.children.borrow_mut().push((name.to_string(), view));
        }
    }

    /// Dispatch a bubbling event from this view's root element.
    pub fn fire(&self, kind: EventKind, detail: Option<Rc<dyn Any>>) {
        let Some(el) = self.el.get() else {
            return;
        };
        let mut event = DomEvent::new(kind, el, true);
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.doc.dispatch(event);
    }

    /// Invoke `f` on this view and every descendant, depth-first.
    pub fn broadcast(&self, f: &dyn Fn(&View)) {
        f(self);
        let children: Vec<Rc<View>> = self
            .children
            .borrow()
            .iter()
            .map(|(_, v)| Rc::clone(v))
            .collect();
        for child in children {
            child.broadcast(f);
        }
    }

    /// Tear the view down: unload hook, children (each exactly once),
    /// element cache, binder, trapped events, parent link. Idempotent.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        self.behavior.unload(self);

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for (_, child) in children {
            child.destroy();
        }
        self.el_cache.borrow_mut().clear();
        self.unbind_data();
        for (el, id) in self.traps.borrow_mut().drain(..) {
            self.doc.remove_listener(el, id);
        }
        *self.parent.borrow_mut() = Weak::new();
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Document title produced by this view's behavior for the given inner
    /// title.
    pub fn title(&self, inner: &str) -> String {
        self.behavior.title(inner)
    }

    pub fn el(&self) -> Option<NodeId> {
        self.el.get()
    }

    pub fn content_el(&self) -> Option<NodeId> {
        self.content_el.get()
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("el", &self.el.get())
            .field("children", &self.children.borrow().len())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loft_dom::Markup;
    use loft_model::Item;
    use std::cell::Cell;

    struct Card;

    impl Behavior for Card {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(
                Markup::el("div").child(Markup::el("span").data_id("foo")),
            )
        }
    }

    fn text_of(view: &View, id: &str) -> String {
        let el = view.find_el(id).unwrap();
        view.doc().text_content(el)
    }

    #[test]
    fn test_field_binding_round_trip() {
        let doc = Document::new();
        let item = Item::from_pairs([("foo", "bar")]);
        let view = View::build(
            &doc,
            Rc::new(Card),
            ViewConfig::with_data(Value::Item(item.clone())),
        )
        .unwrap();

        assert_eq!(text_of(&view, "foo"), "bar");

        // A model update flows through the binder into the same element,
        // without rebuilding the view.
        let el_before = view.find_el("foo").unwrap();
        item.update([("foo", "baz")]);
        assert_eq!(text_of(&view, "foo"), "baz");
        assert_eq!(view.find_el("foo"), Some(el_before));
    }

    #[test]
    fn test_plain_map_binding() {
        let doc = Document::new();
        let view = View::build(
            &doc,
            Rc::new(Card),
            ViewConfig::with_data(Value::Map(vec![(
                "foo".to_string(),
                Value::Str("hello".into()),
            )])),
        )
        .unwrap();
        assert_eq!(text_of(&view, "foo"), "hello");
    }

    #[test]
    fn test_set_data_rebinds() {
        let doc = Document::new();
        let first = Item::from_pairs([("foo", "one")]);
        let view = View::build(
            &doc,
            Rc::new(Card),
            ViewConfig::with_data(Value::Item(first.clone())),
        )
        .unwrap();

        let second = Item::from_pairs([("foo", "two")]);
        view.set_data(Some(Value::Item(second.clone())));
        assert_eq!(text_of(&view, "foo"), "two");

        // The old item no longer drives the view.
        first.update([("foo", "stale")]);
        assert_eq!(text_of(&view, "foo"), "two");

        second.update([("foo", "three")]);
        assert_eq!(text_of(&view, "foo"), "three");

        view.set_data(None);
        assert_eq!(text_of(&view, "foo"), "three", "none is a no-op application");
    }

    #[test]
    fn test_missing_root_id_fails_loudly() {
        let doc = Document::new();
        struct Bare;
        impl Behavior for Bare {}
        let err = View::build(
            &doc,
            Rc::new(Bare),
            ViewConfig {
                root: Some(RootRef::Id("nowhere".into())),
                ..ViewConfig::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ViewError::MissingRootElement { id } if id == "nowhere"));
    }

    struct Clicky {
        hits: Rc<Cell<u32>>,
        allow_default: bool,
    }

    impl Behavior for Clicky {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(Markup::el("div").child(Markup::el("button").data_id("go")))
        }

        fn handle(&self, events: &mut EventTable) {
            let hits = Rc::clone(&self.hits);
            let allow = self.allow_default;
            events.on("go", EventKind::Click, move |_view, _event| {
                hits.set(hits.get() + 1);
                Ok(Some(allow))
            });
        }
    }

    #[test]
    fn test_declared_click_handler_and_default_prevention() {
        let doc = Document::new();
        let hits = Rc::new(Cell::new(0));
        let view = View::build(
            &doc,
            Rc::new(Clicky { hits: Rc::clone(&hits), allow_default: false }),
            ViewConfig::default(),
        )
        .unwrap();

        let btn = view.find_el("go").unwrap();
        let event = doc.dispatch(DomEvent::new(EventKind::Click, btn, true));
        assert_eq!(hits.get(), 1);
        assert!(event.is_default_prevented());
    }

    #[test]
    fn test_handler_allowing_default() {
        let doc = Document::new();
        let hits = Rc::new(Cell::new(0));
        let view = View::build(
            &doc,
            Rc::new(Clicky { hits, allow_default: true }),
            ViewConfig::default(),
        )
        .unwrap();

        let btn = view.find_el("go").unwrap();
        let event = doc.dispatch(DomEvent::new(EventKind::Click, btn, true));
        assert!(!event.is_default_prevented());
    }

    #[test]
    fn test_failing_handler_is_caught() {
        struct Failing;
        impl Behavior for Failing {
            fn render(&self, _data: Option<&Value>) -> Option<Markup> {
                Some(Markup::el("button"))
            }
            fn handle(&self, events: &mut EventTable) {
                events.on_root(EventKind::Click, |_view, _event| {
                    Err(ViewError::Handler("boom".into()))
                });
            }
        }

        let doc = Document::new();
        let view = View::build(&doc, Rc::new(Failing), ViewConfig::default()).unwrap();
        let el = view.el().unwrap();
        // The error stays at the dispatch boundary; the failed hook
        // prevents the default action.
        let event = doc.dispatch(DomEvent::new(EventKind::Click, el, true));
        assert!(event.is_default_prevented());
    }

    struct Shell;

    impl Behavior for Shell {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(
                Markup::el("div")
                    .child(Markup::el("header").data_id("head"))
                    .child(Markup::el("section").data_id("inner")),
            )
        }

        fn load(&self, view: &Rc<View>, children: &mut Children) -> Result<(), ViewError> {
            // Binds to the element named after it inside this subtree.
            struct Head;
            impl Behavior for Head {}
            children.set("head", View::declare(view.doc(), Rc::new(Head)));
            Ok(())
        }
    }

    #[test]
    fn test_child_bound_to_named_element() {
        let doc = Document::new();
        let view = View::build(&doc, Rc::new(Shell), ViewConfig::default()).unwrap();
        let head = view.child("head").unwrap();
        assert_eq!(head.el(), view.find_el("head"));
        assert!(head.parent().is_some());
    }

    #[test]
    fn test_destroy_is_recursive_and_idempotent() {
        let doc = Document::new();
        let item = Item::from_pairs([("foo", "x")]);
        let view = View::build(
            &doc,
            Rc::new(Shell),
            ViewConfig::with_data(Value::Item(item.clone())),
        )
        .unwrap();
        let head = view.child("head").unwrap();

        view.destroy();
        view.destroy();
        assert!(view.is_destroyed());
        assert!(head.is_destroyed());
        assert!(view.child("head").is_none());
        assert_eq!(item.bus().listener_count(loft_core::ANY), 0, "binder detached");
    }

    #[test]
    fn test_broadcast_depth_first() {
        let doc = Document::new();
        let view = View::build(&doc, Rc::new(Shell), ViewConfig::default()).unwrap();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        view.broadcast(&move |_| c.set(c.get() + 1));
        assert_eq!(count.get(), 2, "self plus one child");
    }

    #[test]
    fn test_find_el_cache_survives_detach() {
        let doc = Document::new();
        let view = View::build(&doc, Rc::new(Card), ViewConfig::default()).unwrap();
        let span = view.find_el("foo").unwrap();
        doc.detach(span);

        // The stale cache entry is dropped and the lookup re-resolves
        // (here: nothing to find).
        assert_eq!(view.find_el("foo"), None);
    }
}

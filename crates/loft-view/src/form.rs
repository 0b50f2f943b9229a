//! Form value collection.
//!
//! Views bound to form subtrees gather their current control values into a
//! map, coercing each control through its `data-type` marker. Mirrors the
//! binding priority used for writing: named controls first, identified
//! elements second, child views last.

use loft_dom::NodeId;
use loft_model::Value;

use crate::View;

impl View {
    /// Collect the form's current state: the bound data's fields overlaid
    /// with every named control, every identified control, and every child
    /// view's data.
    pub fn collect(&self) -> Vec<(String, Value)> {
        let mut result: Vec<(String, Value)> = match self.data() {
            Some(Value::Map(pairs)) => pairs,
            Some(Value::Item(item)) => item.fields(),
            _ => Vec::new(),
        };
        let Some(el) = self.el() else {
            return result;
        };

        for control in self.doc().descendants_with_attr(el, "name") {
            if let (Some(name), Some(value)) =
                (self.doc().attr(control, "name"), self.typed_value(control))
            {
                put(&mut result, name, value);
            }
        }
        for control in self.doc().descendants_with_attr(el, "data-id") {
            if let (Some(name), Some(value)) =
                (self.doc().attr(control, "data-id"), self.typed_value(control))
            {
                put(&mut result, name, value);
            }
        }

        let children: Vec<(String, Value)> = self
            .children
            .borrow()
            .iter()
            .filter_map(|(name, child)| child.data().map(|d| (name.clone(), d)))
            .collect();
        for (name, value) in children {
            put(&mut result, name, value);
        }
        result
    }

    /// Current value of one field: a control located by `name` attribute
    /// or identifier, else a child view's data.
    pub fn value_of(&self, field: &str) -> Option<Value> {
        let el = self.el()?;
        let control = self
            .doc()
            .descendants_with_attr(el, "name")
            .into_iter()
            .find(|&c| self.doc().attr(c, "name").as_deref() == Some(field))
            .or_else(|| self.find_el(field));
        if let Some(control) = control {
            if let Some(value) = self.typed_value(control) {
                return Some(value);
            }
        }
        self.child(field).and_then(|child| child.data())
    }

    /// Read a control's value coerced by its `data-type` marker. `number`
    /// parses; `bool` follows truthiness of the raw string (any non-empty
    /// string is true). Elements without a value yield `None`.
    fn typed_value(&self, el: NodeId) -> Option<Value> {
        let raw = self.doc().value(el)?;
        let kind = self.doc().attr(el, "data-type");
        Some(match kind.as_deref() {
            Some("number") => match raw.parse::<i64>() {
                Ok(n) => Value::Int(n),
                Err(_) => match raw.parse::<f64>() {
                    Ok(f) => Value::Float(f),
                    Err(_) => Value::Str(raw),
                },
            },
            Some("bool") => Value::Bool(!raw.is_empty()),
            _ => Value::Str(raw),
        })
    }
}

fn put(result: &mut Vec<(String, Value)>, name: String, value: Value) {
    match result.iter_mut().find(|(n, _)| n == &name) {
        Some(slot) => slot.1 = value,
        None => result.push((name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Behavior, ViewConfig};
    use loft_dom::{Document, Markup};
    use std::rc::Rc;

    struct SignupForm;

    impl Behavior for SignupForm {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(
                Markup::el("form")
                    .child(Markup::el("input").attr("name", "email"))
                    .child(
                        Markup::el("input")
                            .attr("name", "age")
                            .attr("data-type", "number"),
                    )
                    .child(
                        Markup::el("input")
                            .data_id("agreed")
                            .attr("data-type", "bool"),
                    ),
            )
        }
    }

    fn form(doc: &Document) -> Rc<View> {
        View::build(doc, Rc::new(SignupForm), ViewConfig::default()).unwrap()
    }

    #[test]
    fn test_collect_typed_values() {
        let doc = Document::new();
        let view = form(&doc);
        let el = view.el().unwrap();
        for control in doc.descendants_with_attr(el, "name") {
            match doc.attr(control, "name").as_deref() {
                Some("email") => doc.set_value(control, "a@b.c"),
                Some("age") => doc.set_value(control, "34"),
                _ => {}
            }
        }
        let agreed = view.find_el("agreed").unwrap();
        doc.set_value(agreed, "on");

        let collected = view.collect();
        let get = |n: &str| {
            collected
                .iter()
                .find(|(name, _)| name == n)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("email"), Some(Value::Str("a@b.c".into())));
        assert_eq!(get("age"), Some(Value::Int(34)));
        assert_eq!(get("agreed"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_bool_coercion_follows_raw_truthiness() {
        let doc = Document::new();
        let view = form(&doc);
        let agreed = view.find_el("agreed").unwrap();

        doc.set_value(agreed, "");
        assert_eq!(view.value_of("agreed"), Some(Value::Bool(false)));

        // Any non-empty string is true, even "false".
        doc.set_value(agreed, "false");
        assert_eq!(view.value_of("agreed"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_collect_overlays_bound_data() {
        let doc = Document::new();
        let view = View::build(
            &doc,
            Rc::new(SignupForm),
            ViewConfig::with_data(Value::Map(vec![
                ("plan".to_string(), Value::Str("basic".into())),
                ("email".to_string(), Value::Str("old@b.c".into())),
            ])),
        )
        .unwrap();

        let el = view.el().unwrap();
        let email = doc
            .descendants_with_attr(el, "name")
            .into_iter()
            .find(|&c| doc.attr(c, "name").as_deref() == Some("email"))
            .unwrap();
        doc.set_value(email, "new@b.c");

        let collected = view.collect();
        let get = |n: &str| {
            collected
                .iter()
                .find(|(name, _)| name == n)
                .map(|(_, v)| v.clone())
        };
        // Untouched bound fields survive; control values win.
        assert_eq!(get("plan"), Some(Value::Str("basic".into())));
        assert_eq!(get("email"), Some(Value::Str("new@b.c".into())));
    }
}

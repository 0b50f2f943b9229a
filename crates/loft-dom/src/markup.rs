//! Markup templates.
//!
//! An explicit template tree instantiated into document nodes. This stands
//! in for HTML-string templating: views describe their structure with
//! builders instead of strings, so no parsing is involved.

/// A template node.
#[derive(Debug, Clone)]
pub enum Markup {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Markup>,
    },
    Text(String),
}

impl Markup {
    /// Start an element.
    pub fn el(tag: impl Into<String>) -> Self {
        Markup::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A text node.
    pub fn text(content: impl Into<String>) -> Self {
        Markup::Text(content.into())
    }

    /// Add an attribute. No-op on text nodes.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Markup::Element { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }

    /// Shorthand for the `data-id` lookup attribute.
    pub fn data_id(self, id: impl Into<String>) -> Self {
        self.attr("data-id", id)
    }

    /// Append a child. No-op on text nodes.
    pub fn child(mut self, child: Markup) -> Self {
        if let Markup::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Append several children.
    pub fn children(mut self, iter: impl IntoIterator<Item = Markup>) -> Self {
        if let Markup::Element { children, .. } = &mut self {
            children.extend(iter);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shape() {
        let m = Markup::el("ul")
            .data_id("list")
            .child(Markup::el("li").child(Markup::text("one")))
            .child(Markup::el("li").child(Markup::text("two")));

        let Markup::Element { tag, attrs, children } = m else {
            panic!("expected element");
        };
        assert_eq!(tag, "ul");
        assert_eq!(attrs, vec![("data-id".to_string(), "list".to_string())]);
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_attr_on_text_is_noop() {
        let m = Markup::text("hi").attr("id", "x").child(Markup::text("y"));
        assert!(matches!(m, Markup::Text(t) if t == "hi"));
    }
}

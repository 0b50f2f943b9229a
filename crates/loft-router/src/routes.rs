//! Route specification and its parsed tree.

/// Specification build errors, raised once at router construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteSpecError {
    /// Two differently named wildcard segments declared as siblings. One
    /// would silently shadow the other, so this is rejected outright.
    #[error("duplicate wildcard segment ':{0}' at one tree level")]
    DuplicateWildcard(String),
}

enum Entry<P> {
    Page(P),
    Redirect(String),
    Nested(Routes<P>),
}

/// A nested route specification, built fluently.
///
/// Segments starting with `:` are wildcard captures; a redirect string is
/// either absolute (`/`-prefixed) or relative (`../`-prefixed ascent).
///
/// ```
/// # use loft_router::Routes;
/// #[derive(Clone)]
/// enum Page { Home, BookList, BookDetail }
///
/// let routes = Routes::new()
///     .page("index", Page::Home)
///     .nest(
///         "books",
///         Routes::new()
///             .page("index", Page::BookList)
///             .nest(":bookId", Routes::new().page("index", Page::BookDetail)),
///     );
/// ```
pub struct Routes<P> {
    entries: Vec<(String, Entry<P>)>,
}

impl<P> Routes<P> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Map a segment to a page.
    pub fn page(mut self, segment: impl Into<String>, page: P) -> Self {
        self.put(segment.into(), Entry::Page(page));
        self
    }

    /// Map a segment to a redirect.
    pub fn redirect(mut self, segment: impl Into<String>, dest: impl Into<String>) -> Self {
        self.put(segment.into(), Entry::Redirect(dest.into()));
        self
    }

    /// Map a segment to a nested specification.
    pub fn nest(mut self, segment: impl Into<String>, routes: Routes<P>) -> Self {
        self.put(segment.into(), Entry::Nested(routes));
        self
    }

    // A re-declared segment replaces the earlier one.
    fn put(&mut self, segment: String, entry: Entry<P>) {
        match self.entries.iter_mut().find(|(s, _)| *s == segment) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((segment, entry)),
        }
    }

    pub(crate) fn into_tree(self) -> Result<Tree<P>, RouteSpecError> {
        let mut tree = Tree {
            entries: Vec::new(),
            wildcard: None,
        };
        for (segment, entry) in self.entries {
            if let Some(param) = segment.strip_prefix(':') {
                // A terminal under a wildcard becomes that level's index.
                let children = match entry {
                    Entry::Page(page) => Tree::index_only(Node::Page(page)),
                    Entry::Redirect(dest) => Tree::index_only(Node::Redirect(dest)),
                    Entry::Nested(routes) => routes.into_tree()?,
                };
                if tree.wildcard.is_some() {
                    return Err(RouteSpecError::DuplicateWildcard(param.to_string()));
                }
                tree.wildcard = Some(Wildcard {
                    param: param.to_string(),
                    children: Box::new(children),
                });
            } else {
                let node = match entry {
                    Entry::Page(page) => Node::Page(page),
                    Entry::Redirect(dest) => Node::Redirect(dest),
                    Entry::Nested(routes) => Node::Tree(routes.into_tree()?),
                };
                tree.entries.push((segment, node));
            }
        }
        Ok(tree)
    }
}

impl<P> Default for Routes<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// One level of the parsed matching tree. Immutable after construction.
#[derive(Debug)]
pub(crate) struct Tree<P> {
    entries: Vec<(String, Node<P>)>,
    wildcard: Option<Wildcard<P>>,
}

#[derive(Debug)]
pub(crate) struct Wildcard<P> {
    pub(crate) param: String,
    pub(crate) children: Box<Tree<P>>,
}

#[derive(Debug)]
pub(crate) enum Node<P> {
    Page(P),
    Redirect(String),
    Tree(Tree<P>),
}

impl<P> Tree<P> {
    fn index_only(node: Node<P>) -> Self {
        Self {
            entries: vec![("index".to_string(), node)],
            wildcard: None,
        }
    }

    pub(crate) fn get(&self, segment: &str) -> Option<&Node<P>> {
        self.entries
            .iter()
            .find(|(s, _)| s == segment)
            .map(|(_, n)| n)
    }

    pub(crate) fn wildcard(&self) -> Option<&Wildcard<P>> {
        self.wildcard.as_ref()
    }
}

//! Path resolution.

use std::collections::{HashMap, VecDeque};

use crate::routes::{Node, Routes, Tree};
use crate::{RouteError, RouteSpecError};

/// Redirect hops allowed per resolution before giving up.
pub const MAX_REDIRECTS: usize = 16;

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Route<P> {
    pub page: P,
    /// Wildcard captures, keyed by parameter name.
    pub params: HashMap<String, String>,
    /// The absolute path of the final hop. Differs from the requested
    /// path when a redirect was followed; drivers use this to rewrite the
    /// address silently.
    pub path: String,
}

enum Step<P> {
    Done(Route<P>),
    Redirect(String),
}

/// Resolves absolute paths against the parsed route tree.
pub struct Router<P> {
    tree: Tree<P>,
}

impl<P: Clone> Router<P> {
    /// Parse the specification. Fails on a malformed spec, never at
    /// resolution time.
    pub fn new(routes: Routes<P>) -> Result<Self, RouteSpecError> {
        Ok(Self {
            tree: routes.into_tree()?,
        })
    }

    pub fn can_go(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// Resolve a path, following redirects to a terminal page.
    pub fn resolve(&self, path: &str) -> Result<Route<P>, RouteError> {
        let mut path = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            match self.resolve_once(&path)? {
                Step::Done(route) => return Ok(route),
                Step::Redirect(next) => {
                    tracing::debug!(from = %path, to = %next, "redirect");
                    path = next;
                }
            }
        }
        Err(RouteError::RedirectLoop(path))
    }

    /// One resolution hop.
    ///
    /// Normalization: force a leading slash, read the bare root as
    /// `/index`, strip one trailing slash and a trailing `.html`. The walk
    /// then consumes one segment at a time, preferring an exact match and
    /// falling back to the wildcard branch; interior nodes with no
    /// segments left get an implicit `index` segment.
    fn resolve_once(&self, requested: &str) -> Result<Step<P>, RouteError> {
        let abs = ensure_leading_slash(requested);
        let mut pt = abs.clone();
        if pt == "/" {
            pt.push_str("index");
        }
        pt = chop_end_slash(&pt);
        if let Some(stripped) = pt.strip_suffix(".html") {
            pt = stripped.to_string();
        }

        let mut segments: VecDeque<String> = pt.split('/').skip(1).map(String::from).collect();
        let mut tree = &self.tree;
        let mut params = HashMap::new();
        let mut page: Option<P> = None;
        let mut implicit = false;

        while let Some(segment) = segments.pop_front() {
            let target = if let Some(node) = tree.get(&segment) {
                node
            } else if let Some(wild) = tree.wildcard() {
                params.insert(wild.param.clone(), segment);
                tree = wild.children.as_ref();
                if !segments.is_empty() {
                    continue;
                }
                match tree.get("index") {
                    Some(node) => node,
                    None => return Err(RouteError::PageNotDefined(abs)),
                }
            } else if implicit {
                return Err(RouteError::PageNotDefined(abs));
            } else {
                return Err(RouteError::NotFound(abs));
            };

            match target {
                Node::Redirect(dest) => {
                    return Ok(Step::Redirect(resolve_redirect(&abs, dest)));
                }
                Node::Page(p) => {
                    page = Some(p.clone());
                }
                Node::Tree(sub) => {
                    tree = sub;
                    if segments.is_empty() {
                        segments.push_back("index".to_string());
                        implicit = true;
                    }
                }
            }
        }

        match page {
            Some(page) => Ok(Step::Done(Route { page, params, path: abs })),
            None => Err(RouteError::NotFound(abs)),
        }
    }
}

/// Resolve a redirect target against the absolute path it was reached
/// from. An absolute target wins outright; each leading `../` pops one
/// trailing segment off the source, and the remainder is spliced on
/// verbatim.
fn resolve_redirect(src: &str, dest: &str) -> String {
    if dest.starts_with('/') {
        return dest.to_string();
    }
    let mut parts: Vec<&str> = src.split('/').collect();
    let mut rest = dest;
    loop {
        if let Some(after) = rest.strip_prefix("../") {
            parts.pop();
            rest = after;
        } else if let Some(after) = rest.strip_prefix("..") {
            parts.pop();
            rest = after;
        } else {
            break;
        }
    }
    format!("{}{}", parts.join("/"), rest)
}

pub(crate) fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

pub(crate) fn chop_end_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(chopped) => chopped.to_string(),
        None => path.to_string(),
    }
}

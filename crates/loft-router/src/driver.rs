//! Navigation drivers.
//!
//! Both drivers share the resolution algorithm and differ only in how
//! they observe and write the address: history mode uses the path, hash
//! mode the fragment after a prefix. Resolution failures are caught here
//! and fall back to the root path; a followed redirect rewrites the
//! address with a silent replace, never a push.

use std::rc::Rc;

use crate::router::ensure_leading_slash;
use crate::{AddressSurface, Route, RouteError, Router};

/// Callback invoked with every successfully resolved route.
pub type OnMove<P> = Box<dyn Fn(Route<P>)>;

/// History-mode driver: full paths, push/replace entries, back/forward
/// restores.
pub struct HistoryDriver<P> {
    router: Router<P>,
    address: Rc<dyn AddressSurface>,
    base_path: String,
    on_move: OnMove<P>,
}

impl<P: Clone> HistoryDriver<P> {
    pub fn new(
        router: Router<P>,
        address: Rc<dyn AddressSurface>,
        base_path: impl Into<String>,
        on_move: OnMove<P>,
    ) -> Self {
        Self {
            router,
            address,
            base_path: base_path.into(),
            on_move,
        }
    }

    /// First activation: normalize a redundant trailing slash with a
    /// silent replace, then resolve the current address.
    pub fn depart(&self) {
        let mut path = self.local_path();
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
            self.address
                .replace(&format!("{}{}", self.base_path, path));
        }
        self.navigate(&path);
    }

    /// Navigate to a path, pushing a history entry.
    pub fn go(&self, path: &str) {
        self.address
            .push(&format!("{}{}", self.base_path, path));
        self.navigate(path);
    }

    /// A back/forward restore happened; re-resolve the restored address.
    pub fn handle_pop(&self) {
        let path = self.local_path();
        self.navigate(&path);
    }

    /// An in-app link click. Links targeting `_top` and links outside the
    /// base path pass through untouched; everything else is captured and
    /// navigated. Returns whether the click was captured (the caller
    /// prevents the default for captured clicks).
    pub fn handle_link(&self, href: &str, target: Option<&str>) -> bool {
        if target == Some("_top") {
            return false;
        }
        let Some(path) = href.strip_prefix(&self.base_path) else {
            return false;
        };
        let path = if path.is_empty() { "/" } else { path };
        self.go(path);
        true
    }

    fn local_path(&self) -> String {
        let full = self.address.pathname();
        let path = full.strip_prefix(&self.base_path).unwrap_or(&full);
        if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        }
    }

    fn navigate(&self, path: &str) {
        match self.router.resolve(path) {
            Ok(route) => {
                if route.path != ensure_leading_slash(path) {
                    self.address
                        .replace(&format!("{}{}", self.base_path, route.path));
                }
                (self.on_move)(route);
            }
            Err(err) => self.fall_back(path, err),
        }
    }

    fn fall_back(&self, path: &str, err: RouteError) {
        tracing::warn!(error = %err, path, "navigation failed, falling back to root");
        if path == "/" {
            return;
        }
        self.address.replace(&format!("{}/", self.base_path));
        match self.router.resolve("/") {
            Ok(route) => (self.on_move)(route),
            Err(err) => tracing::error!(error = %err, "root path is not routable"),
        }
    }
}

/// Hash-mode driver: paths live in the fragment after a prefix
/// (default `#!`).
pub struct HashDriver<P> {
    router: Router<P>,
    address: Rc<dyn AddressSurface>,
    head: String,
    on_move: OnMove<P>,
}

impl<P: Clone> HashDriver<P> {
    pub fn new(router: Router<P>, address: Rc<dyn AddressSurface>, on_move: OnMove<P>) -> Self {
        Self::with_head(router, address, "#!", on_move)
    }

    pub fn with_head(
        router: Router<P>,
        address: Rc<dyn AddressSurface>,
        head: impl Into<String>,
        on_move: OnMove<P>,
    ) -> Self {
        Self {
            router,
            address,
            head: head.into(),
            on_move,
        }
    }

    /// The path encoded in the current fragment; empty when the fragment
    /// is missing or carries a different prefix.
    pub fn current_path(&self) -> String {
        let hash = self.address.hash();
        hash.strip_prefix(&self.head).unwrap_or("").to_string()
    }

    /// First activation: resolve the current fragment.
    pub fn depart(&self) {
        let path = self.current_path();
        self.navigate(&path);
    }

    /// Navigate to a path, pushing a fragment entry.
    pub fn go(&self, path: &str) {
        self.address.set_hash(&format!("{}{}", self.head, path));
        self.handle_change();
    }

    /// The fragment changed (including back/forward); re-resolve it.
    pub fn handle_change(&self) {
        let path = self.current_path();
        let path = if path.is_empty() { "/".to_string() } else { path };
        self.navigate(&path);
    }

    fn navigate(&self, path: &str) {
        match self.router.resolve(path) {
            Ok(route) => {
                if route.path != ensure_leading_slash(path) {
                    self.address
                        .replace_hash(&format!("{}{}", self.head, route.path));
                }
                (self.on_move)(route);
            }
            Err(err) => self.fall_back(path, err),
        }
    }

    fn fall_back(&self, path: &str, err: RouteError) {
        tracing::warn!(error = %err, path, "navigation failed, falling back to root");
        if path == "/" {
            return;
        }
        self.address.replace_hash(&format!("{}/", self.head));
        match self.router.resolve("/") {
            Ok(route) => (self.on_move)(route),
            Err(err) => tracing::error!(error = %err, "root path is not routable"),
        }
    }
}

//! Loft App - Application shell
//!
//! Wires the router to the view layer: a root view over the document
//! body, a route table mapping paths to page builders, and a navigation
//! driver whose arrivals swap the current page view in and out. The page
//! lifecycle is owned here: the outgoing page is destroyed and its
//! element removed before the incoming page is built, and the document
//! title is recomposed through the root behavior after every move.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use loft_dom::Document;
use loft_model::Value;
use loft_router::{
    AddressSurface, HashDriver, HistoryDriver, MemoryAddress, OnMove, Route, RouteSpecError,
    Router, Routes,
};
use loft_view::{Behavior, RootRef, View, ViewConfig, ViewError};

/// Activation errors. Navigation itself never errors; resolution failures
/// fall back to the root path inside the driver.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("route specification: {0}")]
    Spec(#[from] RouteSpecError),
    #[error(transparent)]
    View(#[from] ViewError),
}

/// Builds the behavior for a page arrival. Receives the route parameters
/// merged with any context handed to [`App::go`].
pub type PageBuilder = Rc<dyn Fn(&HashMap<String, String>) -> Rc<dyn Behavior>>;

/// Wrap a plain behavior constructor as a [`PageBuilder`].
pub fn page<B>(f: impl Fn(&HashMap<String, String>) -> B + 'static) -> PageBuilder
where
    B: Behavior + 'static,
{
    Rc::new(move |params| Rc::new(f(params)) as Rc<dyn Behavior>)
}

/// Which navigation driver carries the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full paths on the address surface.
    History,
    /// Paths in the fragment after [`AppOptions::path_head`].
    Hash,
}

/// Activation options.
pub struct AppOptions {
    pub mode: Mode,
    /// Prefix stripped from and prepended to every history-mode path.
    pub root_path: String,
    /// Fragment prefix for hash mode.
    pub path_head: String,
    pub address: Rc<dyn AddressSurface>,
    /// Data bound to the first page only; later arrivals start blank.
    pub init_page_data: Option<Value>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            mode: Mode::History,
            root_path: String::new(),
            path_head: "#!".to_string(),
            address: Rc::new(MemoryAddress::new("/")),
            init_page_data: None,
        }
    }
}

enum AppDriver {
    History(HistoryDriver<PageBuilder>),
    Hash(HashDriver<PageBuilder>),
}

struct AppInner {
    doc: Document,
    root_area: Rc<View>,
    driver: RefCell<Option<AppDriver>>,
    current_page: RefCell<Option<Rc<View>>>,
    /// Context from a pending `go`, merged into the next arrival's params.
    pre_ctx: RefCell<Option<HashMap<String, String>>>,
    init_data: RefCell<Option<Value>>,
}

/// The running application.
pub struct App {
    inner: Rc<AppInner>,
    address: Rc<dyn AddressSurface>,
}

impl App {
    /// Build the root view over the document body, parse the routes, and
    /// resolve the current address into the first page.
    pub fn activate(
        doc: &Document,
        root_behavior: Rc<dyn Behavior>,
        routes: Routes<PageBuilder>,
        options: AppOptions,
    ) -> Result<App, AppError> {
        let root_area = View::build(
            doc,
            root_behavior,
            ViewConfig {
                root: Some(RootRef::Node(doc.body())),
                ..ViewConfig::default()
            },
        )?;

        let inner = Rc::new(AppInner {
            doc: doc.clone(),
            root_area,
            driver: RefCell::new(None),
            current_page: RefCell::new(None),
            pre_ctx: RefCell::new(None),
            init_data: RefCell::new(options.init_page_data),
        });

        let weak = Rc::downgrade(&inner);
        let on_move: OnMove<PageBuilder> = Box::new(move |route| {
            if let Some(inner) = weak.upgrade() {
                inner.arrive(route);
            }
        });

        let router = Router::new(routes)?;
        let address = options.address;
        let driver = match options.mode {
            Mode::History => AppDriver::History(HistoryDriver::new(
                router,
                Rc::clone(&address),
                options.root_path,
                on_move,
            )),
            Mode::Hash => AppDriver::Hash(HashDriver::with_head(
                router,
                Rc::clone(&address),
                options.path_head,
                on_move,
            )),
        };
        *inner.driver.borrow_mut() = Some(driver);

        inner.with_driver(|driver| match driver {
            AppDriver::History(d) => d.depart(),
            AppDriver::Hash(d) => d.depart(),
        });
        Ok(App { inner, address })
    }

    /// Navigate to a path. `ctx` entries overlay the route's wildcard
    /// captures for this one arrival.
    pub fn go(&self, path: &str, ctx: Option<HashMap<String, String>>) {
        *self.inner.pre_ctx.borrow_mut() = ctx;
        self.inner.with_driver(|driver| match driver {
            AppDriver::History(d) => d.go(path),
            AppDriver::Hash(d) => d.go(path),
        });
    }

    /// Move back one history entry and re-resolve. Returns whether the
    /// address actually moved.
    pub fn back(&self) -> bool {
        if !self.address.go_back() {
            return false;
        }
        self.inner.restore();
        true
    }

    /// Move forward one history entry and re-resolve.
    pub fn forward(&self) -> bool {
        if !self.address.go_forward() {
            return false;
        }
        self.inner.restore();
        true
    }

    /// An in-app link click; history mode only. Returns whether the click
    /// was captured (the caller prevents the default for captured clicks).
    pub fn handle_link(&self, href: &str, target: Option<&str>) -> bool {
        let mut captured = false;
        self.inner.with_driver(|driver| {
            if let AppDriver::History(d) = driver {
                captured = d.handle_link(href, target);
            }
        });
        captured
    }

    pub fn current_page(&self) -> Option<Rc<View>> {
        self.inner.current_page.borrow().clone()
    }

    pub fn root(&self) -> Rc<View> {
        Rc::clone(&self.inner.root_area)
    }

    pub fn doc(&self) -> &Document {
        &self.inner.doc
    }
}

impl AppInner {
    fn with_driver(&self, f: impl FnOnce(&AppDriver)) {
        let driver = self.driver.borrow();
        if let Some(driver) = driver.as_ref() {
            f(driver);
        }
    }

    /// A back/forward restore moved the address; re-resolve it.
    fn restore(&self) {
        self.with_driver(|driver| match driver {
            AppDriver::History(d) => d.handle_pop(),
            AppDriver::Hash(d) => d.handle_change(),
        });
    }

    /// A resolved arrival: build the page behavior from the merged
    /// context, swap the page view, recompute the title.
    fn arrive(self: &Rc<Self>, route: Route<PageBuilder>) {
        let mut ctx = route.params;
        if let Some(pre) = self.pre_ctx.borrow_mut().take() {
            ctx.extend(pre);
        }
        tracing::debug!(path = %route.path, "arriving");

        let behavior = (route.page)(&ctx);
        self.replace_page(behavior);
        self.update_title();
    }

    fn replace_page(&self, behavior: Rc<dyn Behavior>) {
        if let Some(old) = self.current_page.borrow_mut().take() {
            let el = old.el();
            old.destroy();
            if let Some(el) = el {
                self.doc.detach(el);
            }
        }

        let data = self.init_data.borrow_mut().take();
        let config = ViewConfig {
            data,
            ..ViewConfig::default()
        };
        match View::build_child(&self.root_area, behavior, config) {
            Ok(page) => *self.current_page.borrow_mut() = Some(page),
            Err(err) => tracing::error!(error = %err, "page construction failed"),
        }
    }

    fn update_title(&self) {
        let inner = match self.current_page.borrow().as_ref() {
            Some(page) => page.title(""),
            None => String::new(),
        };
        self.doc.set_title(&self.root_area.title(&inner));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loft_dom::Markup;
    use loft_model::Item;
    use loft_router::MemoryAddress;

    struct Shell;

    impl Behavior for Shell {
        fn title(&self, inner: &str) -> String {
            if inner.is_empty() {
                "Loft".to_string()
            } else {
                format!("{inner} - Loft")
            }
        }
    }

    struct HomePage;

    impl Behavior for HomePage {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(Markup::el("section").child(Markup::text("welcome")))
        }

        fn title(&self, _inner: &str) -> String {
            "Home".to_string()
        }
    }

    struct BookPage {
        id: String,
    }

    impl Behavior for BookPage {
        fn render(&self, _data: Option<&Value>) -> Option<Markup> {
            Some(
                Markup::el("article")
                    .child(Markup::el("span").data_id("book").child(Markup::text(self.id.clone()))),
            )
        }

        fn title(&self, _inner: &str) -> String {
            format!("Book {}", self.id)
        }
    }

    fn routes() -> Routes<PageBuilder> {
        Routes::new().page("index", page(|_| HomePage)).nest(
            "books",
            Routes::new().nest(
                ":bookId",
                Routes::new()
                    .page(
                        "index",
                        page(|params| BookPage {
                            id: params.get("bookId").cloned().unwrap_or_default(),
                        }),
                    )
                    .nest("readers", Routes::new().redirect("index", "../")),
            ),
        )
    }

    fn books_app(initial: &str) -> (App, Rc<MemoryAddress>) {
        let doc = Document::new();
        let address = Rc::new(MemoryAddress::new(initial));
        let app = App::activate(
            &doc,
            Rc::new(Shell),
            routes(),
            AppOptions {
                address: Rc::clone(&address) as Rc<dyn AddressSurface>,
                ..AppOptions::default()
            },
        )
        .unwrap();
        (app, address)
    }

    fn body_text(app: &App) -> String {
        app.doc().text_content(app.doc().body())
    }

    #[test]
    fn test_activation_resolves_first_page() {
        let (app, _address) = books_app("/");
        assert!(app.current_page().is_some());
        assert_eq!(app.doc().title(), "Home - Loft");
        assert!(body_text(&app).contains("welcome"));
    }

    #[test]
    fn test_go_swaps_page_and_title() {
        let (app, _address) = books_app("/");
        let home = app.current_page().unwrap();

        app.go("/books/3", None);
        assert_eq!(app.doc().title(), "Book 3 - Loft");
        assert!(home.is_destroyed());

        let text = body_text(&app);
        assert!(text.contains('3'));
        assert!(!text.contains("welcome"), "old page element removed");
    }

    #[test]
    fn test_back_and_forward() {
        let (app, _address) = books_app("/");
        app.go("/books/3", None);

        assert!(app.back());
        assert_eq!(app.doc().title(), "Home - Loft");

        assert!(app.forward());
        assert_eq!(app.doc().title(), "Book 3 - Loft");

        assert!(!app.forward(), "nothing ahead of the newest entry");
    }

    #[test]
    fn test_redirect_lands_on_parent() {
        let (app, address) = books_app("/");
        app.go("/books/3/readers", None);
        assert_eq!(app.doc().title(), "Book 3 - Loft");
        assert_eq!(address.pathname(), "/books/3");
    }

    #[test]
    fn test_unroutable_falls_back_to_root() {
        let (app, address) = books_app("/mystery");
        assert_eq!(app.doc().title(), "Home - Loft");
        assert_eq!(address.pathname(), "/");
    }

    #[test]
    fn test_go_context_overlays_params() {
        let seen = Rc::new(RefCell::new(HashMap::new()));
        let log = Rc::clone(&seen);
        let routes = Routes::new().page("index", page(|_| HomePage)).nest(
            ":bookId",
            Routes::new().page(
                "index",
                Rc::new(move |params: &HashMap<String, String>| {
                    *log.borrow_mut() = params.clone();
                    Rc::new(HomePage) as Rc<dyn Behavior>
                }) as PageBuilder,
            ),
        );

        let doc = Document::new();
        let app = App::activate(&doc, Rc::new(Shell), routes, AppOptions::default()).unwrap();

        let mut ctx = HashMap::new();
        ctx.insert("bookId".to_string(), "override".to_string());
        ctx.insert("ref".to_string(), "nav".to_string());
        app.go("/42", Some(ctx));
        assert_eq!(seen.borrow().get("bookId").map(String::as_str), Some("override"));
        assert_eq!(seen.borrow().get("ref").map(String::as_str), Some("nav"));

        // The context is one-shot.
        app.go("/7", None);
        assert_eq!(seen.borrow().get("bookId").map(String::as_str), Some("7"));
        assert_eq!(seen.borrow().get("ref"), None);
    }

    #[test]
    fn test_init_data_reaches_first_page_only() {
        struct Greeting;

        impl Behavior for Greeting {
            fn render(&self, _data: Option<&Value>) -> Option<Markup> {
                Some(Markup::el("p").child(Markup::el("span").data_id("greeting")))
            }
        }

        let routes = Routes::new()
            .page("index", page(|_| Greeting))
            .page("other", page(|_| Greeting));

        let doc = Document::new();
        let app = App::activate(
            &doc,
            Rc::new(Shell),
            routes,
            AppOptions {
                init_page_data: Some(Value::from(Item::from_pairs([("greeting", "hello")]))),
                ..AppOptions::default()
            },
        )
        .unwrap();
        assert!(body_text(&app).contains("hello"));

        app.go("/other", None);
        assert!(!body_text(&app).contains("hello"), "later pages start blank");
    }

    #[test]
    fn test_hash_mode() {
        let doc = Document::new();
        let address = Rc::new(MemoryAddress::new("/"));
        let app = App::activate(
            &doc,
            Rc::new(Shell),
            routes(),
            AppOptions {
                mode: Mode::Hash,
                address: Rc::clone(&address) as Rc<dyn AddressSurface>,
                ..AppOptions::default()
            },
        )
        .unwrap();
        assert_eq!(app.doc().title(), "Home - Loft");

        app.go("/books/7", None);
        assert_eq!(address.hash(), "#!/books/7");
        assert_eq!(app.doc().title(), "Book 7 - Loft");

        assert!(app.back());
        assert_eq!(app.doc().title(), "Home - Loft");
    }

    #[test]
    fn test_link_capture() {
        let (app, _address) = books_app("/");
        assert!(!app.handle_link("/books/3", Some("_top")));
        assert!(app.handle_link("/books/3", None));
        assert_eq!(app.doc().title(), "Book 3 - Loft");
    }
}

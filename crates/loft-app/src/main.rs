//! Loft Books - Headless demo application
//!
//! A small books catalogue driven entirely in memory: a shared `List`
//! model, a list page with a reactive shelf, a wildcard detail page and a
//! redirect. Each step prints the document title and body text so the
//! whole navigation story is visible on stdout.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Result;
use loft_app::{page, App, AppOptions, PageBuilder};
use loft_dom::{Document, Markup};
use loft_model::{Item, List, Value, WrapPolicy};
use loft_router::{AddressSurface, MemoryAddress, Routes};
use loft_view::{Behavior, Children, ListSpec, View, ViewConfig, ViewError};

struct Shell;

impl Behavior for Shell {
    fn title(&self, inner: &str) -> String {
        if inner.is_empty() {
            "Loft Books".to_string()
        } else {
            format!("{inner} - Loft Books")
        }
    }
}

struct HomePage;

impl Behavior for HomePage {
    fn render(&self, _data: Option<&Value>) -> Option<Markup> {
        Some(
            Markup::el("section")
                .child(Markup::el("h1").child(Markup::text("Welcome")))
                .child(Markup::text("Browse the catalogue at /books.")),
        )
    }

    fn title(&self, _inner: &str) -> String {
        "Home".to_string()
    }
}

struct BookListPage {
    books: List,
}

impl Behavior for BookListPage {
    fn render(&self, _data: Option<&Value>) -> Option<Markup> {
        Some(
            Markup::el("section")
                .child(Markup::el("h1").child(Markup::text("Catalogue")))
                .child(Markup::el("ul").data_id("shelf")),
        )
    }

    fn load(&self, view: &Rc<View>, children: &mut Children) -> Result<(), ViewError> {
        let shelf = View::declare_with(
            view.doc(),
            Rc::new(Shelf),
            ViewConfig {
                data: Some(Value::from(self.books.clone())),
                list: Some(ListSpec::new(|_| Rc::new(BookRow) as Rc<dyn Behavior>)),
                ..ViewConfig::default()
            },
        );
        children.set("shelf", shelf);
        Ok(())
    }

    fn title(&self, _inner: &str) -> String {
        "Catalogue".to_string()
    }
}

struct Shelf;

impl Behavior for Shelf {}

struct BookRow;

impl Behavior for BookRow {
    fn render(&self, _data: Option<&Value>) -> Option<Markup> {
        Some(Markup::el("li").child(Markup::el("span").data_id("title")))
    }
}

struct BookPage {
    book: Option<Value>,
    id: String,
}

impl Behavior for BookPage {
    fn render(&self, _data: Option<&Value>) -> Option<Markup> {
        let body = match &self.book {
            Some(book) => {
                let title = book
                    .as_item()
                    .and_then(|item| item.get("title"))
                    .map(|v| v.display_text())
                    .unwrap_or_default();
                Markup::el("h1").child(Markup::text(title))
            }
            None => Markup::el("p").child(Markup::text(format!("No book #{}", self.id))),
        };
        Some(Markup::el("article").child(body))
    }

    fn title(&self, _inner: &str) -> String {
        format!("Book {}", self.id)
    }
}

fn book(id: i64, title: &str) -> Value {
    Value::from(Item::from_pairs([
        ("id", Value::from(id)),
        ("title", Value::from(title)),
    ]))
}

fn library() -> List {
    let books = List::new(WrapPolicy::Wrap);
    books.add(book(1, "The Pale Harbor"), None);
    books.add(book(2, "Glass Orchards"), None);
    books
}

fn routes(books: &List) -> Routes<PageBuilder> {
    let shelf = books.clone();
    let detail = books.clone();
    Routes::new().page("index", page(|_| HomePage)).nest(
        "books",
        Routes::new()
            .page(
                "index",
                page(move |_| BookListPage {
                    books: shelf.clone(),
                }),
            )
            .nest(
                ":bookId",
                Routes::new()
                    .page(
                        "index",
                        page(move |params: &HashMap<String, String>| {
                            let id = params.get("bookId").cloned().unwrap_or_default();
                            let wanted = id.parse::<i64>().map(Value::from).unwrap_or(Value::Null);
                            BookPage {
                                book: detail.find_by_field("id", &wanted),
                                id,
                            }
                        }),
                    )
                    .nest("readers", Routes::new().redirect("index", "../")),
            ),
    )
}

fn print_screen(doc: &Document) {
    println!("=== {} ===", doc.title());
    println!("{}", doc.text_content(doc.body()));
    println!();
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting books demo");

    let doc = Document::new();
    let books = library();
    let address = Rc::new(MemoryAddress::new("/"));
    let app = App::activate(
        &doc,
        Rc::new(Shell),
        routes(&books),
        AppOptions {
            address: Rc::clone(&address) as Rc<dyn AddressSurface>,
            ..AppOptions::default()
        },
    )?;
    print_screen(&doc);

    app.go("/books", None);
    print_screen(&doc);

    // The shelf is live: a model mutation shows up without a rebuild.
    books.add(book(3, "A Winter Ledger"), None);
    print_screen(&doc);

    app.go("/books/2", None);
    print_screen(&doc);

    app.go("/books/1/readers", None);
    print_screen(&doc);

    app.back();
    print_screen(&doc);

    Ok(())
}

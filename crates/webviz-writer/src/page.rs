//! Page registration and output locations.
//!
//! Pages are registered either as the index page or as a sub page. Each
//! registration assigns the page its final location immediately; nothing is
//! rendered or written until the session flushes.

use std::fmt;

use crate::layout::{Folder, INDEX_FILE};

/// A page that can be placed in a site.
///
/// The writer reads the title to derive a file name and sets the location
/// once, when the page is registered.
pub trait Page {
    /// Human-readable page title.
    fn title(&self) -> &str;

    /// Output location relative to the destination root, once registered.
    fn location(&self) -> Option<&str>;

    /// Record the output location assigned at registration.
    fn set_location(&mut self, location: String);
}

/// Relative path from a page's output location back to the site root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootPath {
    /// The page is written at the root (`.`).
    Here,
    /// The page is written one folder below the root (`..`).
    Parent,
}

impl RootPath {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RootPath::Here => ".",
            RootPath::Parent => "..",
        }
    }
}

impl fmt::Display for RootPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered page waiting for the flush.
#[derive(Debug)]
pub struct PendingPage<'p, P: ?Sized> {
    page: &'p P,
    root: RootPath,
    location: String,
}

impl<'p, P: ?Sized> PendingPage<'p, P> {
    /// The registered page.
    #[must_use]
    pub fn page(&self) -> &'p P {
        self.page
    }

    /// Path from the page back to the site root.
    #[must_use]
    pub fn root(&self) -> RootPath {
        self.root
    }

    /// Output location relative to the destination root.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// Ordered record of registered pages.
///
/// Registration order is also the order pages are rendered and written in.
#[derive(Debug)]
pub struct PageRegistry<'p, P: ?Sized> {
    pages: Vec<PendingPage<'p, P>>,
}

impl<P: ?Sized> Default for PageRegistry<'_, P> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<'p, P: Page + ?Sized> PageRegistry<'p, P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `page` as the site's index page and return its location.
    pub fn register_index(&mut self, page: &'p mut P) -> String {
        self.register(page, INDEX_FILE.to_owned(), RootPath::Here)
    }

    /// Register `page` as a sub page and return its location.
    ///
    /// The file name is the page's slug followed by the number of pages
    /// registered so far, so equal titles never collide within one registry.
    pub fn register_sub_page(&mut self, page: &'p mut P) -> String {
        let file_name = format!("{}_{}.html", slugify(page.title()), self.pages.len());
        let location = format!("{}/{file_name}", Folder::SubPages.name());
        self.register(page, location, RootPath::Parent)
    }

    fn register(&mut self, page: &'p mut P, location: String, root: RootPath) -> String {
        page.set_location(location.clone());
        tracing::debug!(title = page.title(), %location, %root, "registered page");
        self.pages.push(PendingPage {
            page,
            root,
            location: location.clone(),
        });
        location
    }
}

impl<'p, P: ?Sized> PageRegistry<'p, P> {
    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Registered pages in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingPage<'p, P>> {
        self.pages.iter()
    }

    /// Drop every recorded page reference.
    pub(crate) fn clear(&mut self) {
        self.pages.clear();
    }
}

/// Derive a filesystem-safe token from a page title.
///
/// Lower-cases the title, turns spaces into underscores and drops every
/// character outside `[a-z0-9_]`.
#[must_use]
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

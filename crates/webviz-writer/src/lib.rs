//! Static report site writer.
//!
//! This crate turns in-memory pages and resources into a browsable site on
//! disk:
//!
//! - [`SiteLayout`]: the fixed output skeleton (`index.html`, `resources/`,
//!   `sub_pages/`), with clean checks and clean-up
//! - [`ResourceWriter`]: copies files and drains streams into `resources/`
//! - [`PageRegistry`]: assigns output locations to pages in registration order
//! - [`SiteWriter`] / [`WriterSession`]: ties the above together and renders
//!   every page exactly once, when the session is finished
//!
//! Markup is produced by a [`TemplateEngine`]. [`JinjaEngine`] wraps a
//! `minijinja` template.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use serde::Serialize;
//! use webviz_writer::{JinjaEngine, Page, Parameters, ResourceSource, SiteWriter};
//!
//! #[derive(Serialize)]
//! struct Report {
//!     title: String,
//!     location: Option<String>,
//! }
//!
//! impl Page for Report {
//!     fn title(&self) -> &str {
//!         &self.title
//!     }
//!     fn location(&self) -> Option<&str> {
//!         self.location.as_deref()
//!     }
//!     fn set_location(&mut self, location: String) {
//!         self.location = Some(location);
//!     }
//! }
//!
//! let engine = JinjaEngine::from_source("page", "<h1>{{ page.title }}</h1>")?;
//! let mut writer = SiteWriter::new("html_output", Parameters::new(), engine);
//! let mut index = Report { title: "Overview".to_owned(), location: None };
//! let mut details = Report { title: "Details".to_owned(), location: None };
//!
//! writer.write_with(|session| {
//!     if !session.is_clean() {
//!         session.clean_up()?;
//!     }
//!     session.set_up()?;
//!     session.write_js_file(ResourceSource::path("menu.js"))?;
//!     session.write_index_page(&mut index);
//!     session.write_sub_page(&mut details);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

mod error;
mod layout;
mod page;
mod resource;
mod session;
mod template;

pub use error::WriteError;
pub use layout::{Folder, INDEX_FILE, SiteLayout};
pub use page::{Page, PageRegistry, PendingPage, RootPath, slugify};
pub use resource::{ResourceOptions, ResourceSource, ResourceWriter};
pub use session::{SessionState, SiteWriter, WriterSession};
pub use template::{JinjaEngine, Parameters, RenderContext, RenderError, TemplateEngine};
pub use webviz_config::OnExisting;

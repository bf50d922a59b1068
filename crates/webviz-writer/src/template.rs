//! Template engine seam.
//!
//! The writer never produces markup itself. At flush time it hands every
//! registered page to a [`TemplateEngine`] together with a [`RenderContext`]
//! describing where the page sits in the site.
//!
//! [`JinjaEngine`] is the bundled implementation, backed by `minijinja`. A
//! template rendered by it sees:
//!
//! - `page`: the serialized page
//! - `root_folder`: `.` or `..`, for building links back to the root
//! - `current_page`: location of the page being rendered
//! - every global parameter, at top level

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::page::{Page, RootPath};

/// Global parameters passed to every render.
pub type Parameters = Map<String, Value>;

/// Global parameters whose names collide with the per-page keys
/// [`JinjaEngine`] sets (`page`, `root_folder`, `current_page`).
///
/// Such parameters are hidden from templates.
pub(crate) fn shadowed_parameters(parameters: &Parameters) -> Vec<&str> {
    webviz_config::RESERVED_PARAMETERS
        .into_iter()
        .filter(|name| parameters.contains_key(*name))
        .collect()
}

/// Per-page information passed to the template engine.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Path from the rendered page back to the site root.
    pub root_folder: RootPath,
    /// Global parameters of the writer.
    pub parameters: &'a Parameters,
    /// Location of the page being rendered.
    pub current_location: &'a str,
}

impl RenderContext<'_> {
    /// Whether `page` is the page being rendered.
    ///
    /// Used by navigation markup to highlight the current entry.
    pub fn is_current<P: Page + ?Sized>(&self, page: &P) -> bool {
        page.location() == Some(self.current_location)
    }
}

/// Error returned by a [`TemplateEngine`].
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Renders a page to text.
pub trait TemplateEngine<P: ?Sized> {
    /// Render `page` in the given context.
    fn render(&self, page: &P, ctx: &RenderContext<'_>) -> Result<String, RenderError>;
}

impl<P: ?Sized, E: TemplateEngine<P> + ?Sized> TemplateEngine<P> for &E {
    fn render(&self, page: &P, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        (**self).render(page, ctx)
    }
}

/// [`TemplateEngine`] backed by a single `minijinja` template.
pub struct JinjaEngine {
    env: minijinja::Environment<'static>,
    name: String,
}

impl JinjaEngine {
    /// Compile a template from source.
    ///
    /// `name` is used in error messages. Names ending in `.html` turn on
    /// HTML auto-escaping of interpolated values.
    pub fn from_source(name: &str, source: &str) -> Result<Self, RenderError> {
        let mut env = minijinja::Environment::new();
        env.add_template_owned(name.to_owned(), source.to_owned())?;
        Ok(Self {
            env,
            name: name.to_owned(),
        })
    }

    /// Read and compile a template file.
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let source = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map_or_else(|| "page".to_owned(), |n| n.to_string_lossy().into_owned());
        Self::from_source(&name, &source)
    }
}

impl<P: Page + Serialize + ?Sized> TemplateEngine<P> for JinjaEngine {
    fn render(&self, page: &P, ctx: &RenderContext<'_>) -> Result<String, RenderError> {
        let template = self.env.get_template(&self.name)?;

        let mut context: BTreeMap<&str, minijinja::Value> = ctx
            .parameters
            .iter()
            .map(|(key, value)| (key.as_str(), minijinja::Value::from_serialize(value)))
            .collect();
        context.insert("page", minijinja::Value::from_serialize(page));
        context.insert("root_folder", minijinja::Value::from(ctx.root_folder.as_str()));
        context.insert("current_page", minijinja::Value::from(ctx.current_location));

        Ok(template.render(context)?)
    }
}

//! Writer sessions.
//!
//! A [`SiteWriter`] holds what stays fixed across runs: the destination, the
//! global parameters and the template engine. Each run happens in a
//! [`WriterSession`]:
//!
//! ```text
//! Created --begin--> Active --finish/drop--> Flushing --> Closed
//! ```
//!
//! While active, the session sets up or cleans the destination, registers
//! pages and writes resources. Resources hit the disk right away; pages are
//! rendered and written in registration order when the session is finished.
//!
//! The flush stops at the first failing page. Pages before it stay on disk,
//! nothing is rolled back, and the session ends up closed either way.

use std::fs;
use std::path::{Path, PathBuf};

use webviz_config::{Config, OnExisting};

use crate::error::WriteError;
use crate::layout::{Folder, SiteLayout};
use crate::page::{Page, PageRegistry, PendingPage};
use crate::resource::{ResourceOptions, ResourceSource, ResourceWriter};
use crate::template::{
    JinjaEngine, Parameters, RenderContext, TemplateEngine, shadowed_parameters,
};

/// Lifecycle of a [`WriterSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Flushing,
    Closed,
}

/// Entry point for writing a site to a destination directory.
pub struct SiteWriter<E> {
    destination: PathBuf,
    parameters: Parameters,
    engine: E,
    on_existing: OnExisting,
}

impl<E> SiteWriter<E> {
    /// Create a writer for `destination`.
    ///
    /// Every page is rendered by `engine` with `parameters` as globals.
    ///
    /// Parameters named `page`, `root_folder` or `current_page` are hidden
    /// by the per-page context of [`JinjaEngine`] and logged as a warning.
    pub fn new(destination: impl Into<PathBuf>, parameters: Parameters, engine: E) -> Self {
        for name in shadowed_parameters(&parameters) {
            tracing::warn!(parameter = name, "global parameter is shadowed by the page context");
        }
        Self {
            destination: destination.into(),
            parameters,
            engine,
            on_existing: OnExisting::default(),
        }
    }

    /// Create a writer from loaded configuration.
    pub fn from_config(config: &Config, engine: E) -> Self {
        Self::new(
            config.output_resolved.destination.clone(),
            config.parameters.clone(),
            engine,
        )
        .with_on_existing(config.output_resolved.on_existing)
    }

    /// Set the policy applied by [`WriterSession::prepare`].
    #[must_use]
    pub fn with_on_existing(mut self, on_existing: OnExisting) -> Self {
        self.on_existing = on_existing;
        self
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Open a session.
    ///
    /// The writer stays borrowed until the session is finished or dropped,
    /// so only one session per writer can be active.
    pub fn begin<'p, P>(&mut self) -> WriterSession<'_, 'p, P, E>
    where
        P: Page + ?Sized + 'p,
        E: TemplateEngine<P>,
    {
        let mut session = WriterSession {
            layout: SiteLayout::new(self.destination.clone()),
            resources: ResourceWriter::new(self.destination.join(Folder::Resources.name())),
            registry: PageRegistry::new(),
            parameters: &self.parameters,
            engine: &self.engine,
            on_existing: self.on_existing,
            state: SessionState::Created,
        };
        session.state = SessionState::Active;
        tracing::debug!(destination = %self.destination.display(), "session opened");
        session
    }

    /// Run `body` inside a session and flush it afterwards.
    ///
    /// The session is flushed and closed even when `body` fails. In that case
    /// the error of `body` is returned; a flush error on top of it is logged.
    pub fn write_with<'p, P, T, F>(&mut self, body: F) -> Result<T, WriteError>
    where
        P: Page + ?Sized + 'p,
        E: TemplateEngine<P>,
        F: for<'w> FnOnce(&mut WriterSession<'w, 'p, P, E>) -> Result<T, WriteError>,
    {
        let mut session = self.begin();
        let body_result = body(&mut session);
        let flush_result = session.finish();

        match (body_result, flush_result) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) | (Err(err), Ok(())) => Err(err),
            (Err(err), Err(flush_err)) => {
                tracing::warn!(error = %flush_err, "flush failed after session error");
                Err(err)
            }
        }
    }
}

impl SiteWriter<JinjaEngine> {
    /// Create a writer from loaded configuration, rendering with the
    /// template file set in `[template] path`.
    pub fn from_config_template(config: &Config) -> Result<Self, WriteError> {
        let path = config
            .template_resolved
            .path
            .as_deref()
            .ok_or(WriteError::MissingTemplate)?;
        let engine = JinjaEngine::from_file(path)?;
        tracing::debug!(template = %path.display(), "loaded page template");
        Ok(Self::from_config(config, engine))
    }
}

/// An open writing session. See the [module docs](self).
pub struct WriterSession<'w, 'p, P, E>
where
    P: Page + ?Sized,
    E: TemplateEngine<P>,
{
    layout: SiteLayout,
    resources: ResourceWriter,
    registry: PageRegistry<'p, P>,
    parameters: &'w Parameters,
    engine: &'w E,
    on_existing: OnExisting,
    state: SessionState,
}

impl<'p, P, E> WriterSession<'_, 'p, P, E>
where
    P: Page + ?Sized,
    E: TemplateEngine<P>,
{
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    /// Whether the destination holds no output from a previous run.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.layout.is_clean()
    }

    /// Create the destination and its subfolders where missing.
    pub fn set_up(&self) -> Result<(), WriteError> {
        Ok(self.layout.set_up()?)
    }

    /// Remove output of a previous run.
    pub fn clean_up(&self) -> Result<(), WriteError> {
        Ok(self.layout.clean_up()?)
    }

    /// Check the destination against the writer's [`OnExisting`] policy,
    /// then set it up.
    ///
    /// A dirty destination is an error under [`OnExisting::Fail`], is
    /// cleaned under [`OnExisting::Clean`] and is written over under
    /// [`OnExisting::Keep`].
    pub fn prepare(&self) -> Result<(), WriteError> {
        if !self.layout.is_clean() {
            match self.on_existing {
                OnExisting::Fail => {
                    return Err(WriteError::NotClean(self.layout.root().to_path_buf()));
                }
                OnExisting::Clean => self.layout.clean_up()?,
                OnExisting::Keep => {
                    tracing::info!(
                        destination = %self.layout.root().display(),
                        "writing over previous output"
                    );
                }
            }
        }
        self.set_up()
    }

    /// Register the index page and return its location.
    pub fn write_index_page(&mut self, page: &'p mut P) -> String {
        self.registry.register_index(page)
    }

    /// Register a sub page and return its location.
    pub fn write_sub_page(&mut self, page: &'p mut P) -> String {
        self.registry.register_sub_page(page)
    }

    /// Write a resource now and return its path relative to the site root.
    pub fn write_resource(
        &self,
        source: ResourceSource<'_>,
        options: &ResourceOptions,
    ) -> Result<String, WriteError> {
        self.resources.write(source, options)
    }

    /// Write a script into `resources/js`.
    pub fn write_js_file(&self, source: ResourceSource<'_>) -> Result<String, WriteError> {
        self.resources.write_js(source)
    }

    /// Write a stylesheet into `resources/css`.
    pub fn write_css_file(&self, source: ResourceSource<'_>) -> Result<String, WriteError> {
        self.resources.write_css(source)
    }

    /// Pages registered so far, in write order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingPage<'p, P>> {
        self.registry.iter()
    }

    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Render and write every registered page, then close the session.
    pub fn finish(mut self) -> Result<(), WriteError> {
        self.flush()
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.state = SessionState::Flushing;
        let result = self.write_pages();
        self.registry.clear();
        self.state = SessionState::Closed;
        result
    }

    fn write_pages(&self) -> Result<(), WriteError> {
        for pending in self.registry.iter() {
            let ctx = RenderContext {
                root_folder: pending.root(),
                parameters: self.parameters,
                current_location: pending.location(),
            };
            let html = self
                .engine
                .render(pending.page(), &ctx)
                .map_err(|source| WriteError::Render {
                    location: pending.location().to_owned(),
                    source,
                })?;
            fs::write(self.layout.root().join(pending.location()), html)?;
            tracing::debug!(location = pending.location(), "wrote page");
        }
        tracing::info!(
            destination = %self.layout.root().display(),
            pages = self.registry.len(),
            "site written"
        );
        Ok(())
    }
}

impl<P, E> Drop for WriterSession<'_, '_, P, E>
where
    P: Page + ?Sized,
    E: TemplateEngine<P>,
{
    fn drop(&mut self) {
        if self.state != SessionState::Active || std::thread::panicking() {
            return;
        }
        if let Err(err) = self.flush() {
            tracing::warn!(error = %err, "flush of dropped session failed");
        }
    }
}

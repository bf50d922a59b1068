//! Error type of the site writer.

use std::path::PathBuf;

use crate::template::RenderError;

/// Error returned by writer operations.
///
/// Filesystem errors are passed through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The template engine failed on a page. Pages registered before it are
    /// already on disk; it and every later page are not.
    #[error("failed to render {location}: {source}")]
    Render {
        location: String,
        #[source]
        source: RenderError,
    },

    /// The destination holds output from a previous run.
    #[error("destination is not clean: {}", .0.display())]
    NotClean(PathBuf),

    /// A resource has no usable target: a path source without a file name,
    /// a target name that is not a plain file name, or a subfolder that
    /// would leave `resources/`.
    #[error("invalid resource target: {}", .0.display())]
    InvalidSource(PathBuf),

    /// No `[template] path` is configured.
    #[error("no page template configured")]
    MissingTemplate,

    /// The page template could not be loaded.
    #[error("failed to load template: {0}")]
    Template(#[from] RenderError),
}

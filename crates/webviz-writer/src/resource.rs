//! Resource placement.
//!
//! Resources are written into the `resources` folder of the destination as
//! soon as they are handed to the writer, unlike pages which wait for the
//! flush. A resource comes either from a file on disk or from a readable
//! stream; see [`ResourceSource`].
//!
//! ## Naming
//!
//! The target file name is chosen in this order:
//!
//! 1. the explicit `target_name` of [`ResourceOptions`]
//! 2. the base name of the source path, or the declared name of a stream
//! 3. a random UUID followed by `target_postfix` (streams only)
//!
//! An existing file with the same name is overwritten. A `target_name` must be
//! a plain file name and a `subdir` must stay below `resources/`; anything
//! else is rejected with [`WriteError::InvalidSource`].

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::error::WriteError;
use crate::layout::Folder;

/// Input of a resource write.
pub enum ResourceSource<'a> {
    /// Copy an existing file byte for byte.
    Path(PathBuf),
    /// Drain a reader into a new file.
    ///
    /// The reader is dropped once the write finishes, whether it succeeded
    /// or not.
    Stream {
        reader: Box<dyn Read + 'a>,
        /// Name the stream was opened under, if any.
        name: Option<String>,
    },
}

impl<'a> ResourceSource<'a> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// A stream without a name of its own.
    pub fn stream(reader: impl Read + 'a) -> Self {
        Self::Stream {
            reader: Box::new(reader),
            name: None,
        }
    }

    /// A stream that knows its own (file) name.
    pub fn named_stream(reader: impl Read + 'a, name: impl Into<String>) -> Self {
        Self::Stream {
            reader: Box::new(reader),
            name: Some(name.into()),
        }
    }
}

impl From<PathBuf> for ResourceSource<'_> {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ResourceSource<'_> {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Placement options for a resource write.
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    /// File name to write to, overriding the derived name.
    pub target_name: Option<String>,
    /// Suffix of generated names (e.g. `.js`).
    pub target_postfix: String,
    /// Folder below `resources/` to write into.
    pub subdir: Option<String>,
}

impl ResourceOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.target_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn postfix(mut self, postfix: impl Into<String>) -> Self {
        self.target_postfix = postfix.into();
        self
    }

    #[must_use]
    pub fn subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }
}

/// Writes resources below a `resources` directory.
#[derive(Debug, Clone)]
pub struct ResourceWriter {
    dir: PathBuf,
}

impl ResourceWriter {
    /// Create a writer for the given `resources` directory.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Write `source` and return its path relative to the site root.
    ///
    /// The returned path always uses forward slashes, e.g.
    /// `resources/js/app.js`, so it can be used in markup as is.
    pub fn write(
        &self,
        source: ResourceSource<'_>,
        options: &ResourceOptions,
    ) -> Result<String, WriteError> {
        if let Some(name) = &options.target_name
            && !is_file_name(name)
        {
            return Err(WriteError::InvalidSource(PathBuf::from(name)));
        }
        let dest = match &options.subdir {
            Some(subdir) if !is_nested_dir(subdir) => {
                return Err(WriteError::InvalidSource(PathBuf::from(subdir)));
            }
            Some(subdir) => self.dir.join(subdir),
            None => self.dir.clone(),
        };
        if !dest.exists() {
            fs::create_dir_all(&dest)?;
        }

        let target_name = match source {
            ResourceSource::Path(path) => {
                let name = match &options.target_name {
                    Some(name) => name.clone(),
                    None => base_name(&path)
                        .ok_or_else(|| WriteError::InvalidSource(path.clone()))?,
                };
                let bytes = fs::copy(&path, dest.join(&name))?;
                tracing::debug!(source = %path.display(), %name, bytes, "copied resource");
                name
            }
            ResourceSource::Stream { reader, name } => {
                let name = options
                    .target_name
                    .clone()
                    .or_else(|| name.as_deref().and_then(|n| base_name(Path::new(n))))
                    .unwrap_or_else(|| format!("{}{}", Uuid::new_v4(), options.target_postfix));
                let bytes = copy_stream(reader, &dest.join(&name))?;
                tracing::debug!(%name, bytes, "streamed resource");
                name
            }
        };

        Ok(relative_path(options.subdir.as_deref(), &target_name))
    }

    /// Write a script into `resources/js`.
    pub fn write_js(&self, source: ResourceSource<'_>) -> Result<String, WriteError> {
        self.write(source, &ResourceOptions::new().subdir("js").postfix(".js"))
    }

    /// Write a stylesheet into `resources/css`.
    pub fn write_css(&self, source: ResourceSource<'_>) -> Result<String, WriteError> {
        self.write(source, &ResourceOptions::new().subdir("css").postfix(".css"))
    }
}

/// Drain `reader` into a new file at `target`.
///
/// Takes the reader by value so it is released on every return path.
fn copy_stream(mut reader: Box<dyn Read + '_>, target: &Path) -> io::Result<u64> {
    let mut file = BufWriter::new(File::create(target)?);
    let bytes = io::copy(&mut reader, &mut file)?;
    file.flush()?;
    Ok(bytes)
}

/// Whether `name` is a single plain path component.
fn is_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Whether `subdir` is a non-empty relative path of plain components.
fn is_nested_dir(subdir: &str) -> bool {
    !subdir.is_empty()
        && Path::new(subdir)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn relative_path(subdir: Option<&str>, name: &str) -> String {
    let resources = Folder::Resources.name();
    match subdir {
        Some(subdir) => format!("{resources}/{subdir}/{name}"),
        None => format!("{resources}/{name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Cursor;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Reader that records when it is dropped.
    struct TrackedReader {
        inner: Option<Cursor<Vec<u8>>>,
        closed: Rc<Cell<u32>>,
    }

    impl TrackedReader {
        fn new(data: &[u8], closed: &Rc<Cell<u32>>) -> Self {
            Self {
                inner: Some(Cursor::new(data.to_vec())),
                closed: Rc::clone(closed),
            }
        }

        fn failing(closed: &Rc<Cell<u32>>) -> Self {
            Self {
                inner: None,
                closed: Rc::clone(closed),
            }
        }
    }

    impl Read for TrackedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match &mut self.inner {
                Some(cursor) => cursor.read(buf),
                None => Err(io::Error::other("stream broke")),
            }
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    fn writer(tmp: &TempDir) -> ResourceWriter {
        ResourceWriter::new(tmp.path().join("resources"))
    }

    #[test]
    fn test_path_source_into_subdir() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("chart.svg");
        let svg = b"<svg xmlns=\"http://www.w3.org/2000/svg\"><rect/></svg>\n\x00\xff";
        fs::write(&source, svg).unwrap();

        let path = writer(&tmp)
            .write(
                ResourceSource::path(&source),
                &ResourceOptions::new().subdir("img"),
            )
            .unwrap();

        assert_eq!(path, "resources/img/chart.svg");
        let written = fs::read(tmp.path().join("resources/img/chart.svg")).unwrap();
        assert_eq!(written, svg);
    }

    #[test]
    fn test_path_source_without_subdir() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("data.csv");
        fs::write(&source, "a,b\n1,2\n").unwrap();

        let path = writer(&tmp)
            .write(source.as_path().into(), &ResourceOptions::new())
            .unwrap();

        assert_eq!(path, "resources/data.csv");
        assert!(tmp.path().join("resources/data.csv").is_file());
    }

    #[test]
    fn test_path_source_honors_target_name() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("bundle-3f9a.js");
        fs::write(&source, "let x = 1;").unwrap();

        let path = writer(&tmp)
            .write(
                ResourceSource::path(&source),
                &ResourceOptions::new().subdir("js").target_name("app.js"),
            )
            .unwrap();

        assert_eq!(path, "resources/js/app.js");
        assert_eq!(
            fs::read_to_string(tmp.path().join("resources/js/app.js")).unwrap(),
            "let x = 1;"
        );
    }

    #[test]
    fn test_path_source_overwrites_existing() {
        let tmp = TempDir::new().unwrap();
        let writer = writer(&tmp);
        let source = tmp.path().join("style.css");

        fs::write(&source, "body { color: red; }").unwrap();
        writer.write_css(ResourceSource::path(&source)).unwrap();
        fs::write(&source, "body { color: blue; }").unwrap();
        writer.write_css(ResourceSource::path(&source)).unwrap();

        assert_eq!(
            fs::read_to_string(tmp.path().join("resources/css/style.css")).unwrap(),
            "body { color: blue; }"
        );
    }

    #[test]
    fn test_path_source_missing_file() {
        let tmp = TempDir::new().unwrap();
        let result = writer(&tmp).write(
            ResourceSource::path(tmp.path().join("missing.js")),
            &ResourceOptions::new(),
        );
        assert!(matches!(result, Err(WriteError::Io(_))));
    }

    #[test]
    fn test_path_source_without_file_name() {
        let tmp = TempDir::new().unwrap();
        let result = writer(&tmp).write(ResourceSource::path(".."), &ResourceOptions::new());
        assert!(matches!(result, Err(WriteError::InvalidSource(_))));
    }

    #[test]
    fn test_nameless_stream_gets_generated_name() {
        let tmp = TempDir::new().unwrap();
        let closed = Rc::new(Cell::new(0));
        let reader = TrackedReader::new(b"body { margin: 0; }\n", &closed);

        let path = writer(&tmp)
            .write_css(ResourceSource::stream(reader))
            .unwrap();

        assert!(path.starts_with("resources/css/"));
        assert!(path.ends_with(".css"));
        let stem = path
            .trim_start_matches("resources/css/")
            .trim_end_matches(".css");
        assert!(Uuid::parse_str(stem).is_ok(), "not a uuid: {stem}");
        assert_eq!(
            fs::read_to_string(tmp.path().join(&path)).unwrap(),
            "body { margin: 0; }\n"
        );
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_generated_names_are_unique() {
        let tmp = TempDir::new().unwrap();
        let writer = writer(&tmp);

        let a = writer
            .write_js(ResourceSource::stream(Cursor::new(b"1".to_vec())))
            .unwrap();
        let b = writer
            .write_js(ResourceSource::stream(Cursor::new(b"2".to_vec())))
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_named_stream_uses_base_name() {
        let tmp = TempDir::new().unwrap();
        let reader = Cursor::new(b"console.log('menu');".to_vec());

        let path = writer(&tmp)
            .write_js(ResourceSource::named_stream(reader, "/tmp/build/menu.js"))
            .unwrap();

        assert_eq!(path, "resources/js/menu.js");
    }

    #[test]
    fn test_failing_stream_is_closed() {
        let tmp = TempDir::new().unwrap();
        let closed = Rc::new(Cell::new(0));
        let reader = TrackedReader::failing(&closed);

        let result = writer(&tmp).write_css(ResourceSource::stream(reader));

        assert!(matches!(result, Err(WriteError::Io(_))));
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_stream_closed_when_target_cannot_be_created() {
        let tmp = TempDir::new().unwrap();
        let closed = Rc::new(Cell::new(0));
        let writer = writer(&tmp);
        // A directory in place of the target file makes File::create fail
        fs::create_dir_all(tmp.path().join("resources/css/taken.css")).unwrap();

        let result = writer.write_css(ResourceSource::named_stream(
            TrackedReader::new(b"a{}", &closed),
            "taken.css",
        ));

        assert!(result.is_err());
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_nested_subdir_created() {
        let tmp = TempDir::new().unwrap();
        let path = writer(&tmp)
            .write(
                ResourceSource::named_stream(Cursor::new(b"{}".to_vec()), "data.json"),
                &ResourceOptions::new().subdir("data/2024"),
            )
            .unwrap();

        assert_eq!(path, "resources/data/2024/data.json");
        assert!(tmp.path().join("resources/data/2024/data.json").is_file());
    }

    #[test]
    fn test_target_name_cannot_leave_resources() {
        let tmp = TempDir::new().unwrap();
        let site = tmp.path().join("site");
        let writer = ResourceWriter::new(site.join("resources"));
        let source = tmp.path().join("notes.txt");
        fs::write(&source, "notes").unwrap();

        for name in ["../../escape.txt", "nested/escape.txt", "/tmp/escape.txt", ".."] {
            let result = writer.write(
                ResourceSource::path(&source),
                &ResourceOptions::new().target_name(name),
            );
            assert!(
                matches!(result, Err(WriteError::InvalidSource(_))),
                "accepted {name}"
            );
        }
        assert!(!tmp.path().join("escape.txt").exists());
        assert!(!site.join("resources").exists());
    }

    #[test]
    fn test_rejected_target_name_closes_stream() {
        let tmp = TempDir::new().unwrap();
        let closed = Rc::new(Cell::new(0));

        let result = writer(&tmp).write(
            ResourceSource::stream(TrackedReader::new(b"a{}", &closed)),
            &ResourceOptions::new().target_name("../a.css"),
        );

        assert!(matches!(result, Err(WriteError::InvalidSource(_))));
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_subdir_cannot_leave_resources() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("outside");
        let writer = writer(&tmp);

        let subdirs = [
            outside.to_string_lossy().into_owned(),
            "../js".to_owned(),
            String::new(),
        ];
        for subdir in subdirs {
            let result = writer.write(
                ResourceSource::named_stream(Cursor::new(b"a()".to_vec()), "a.js"),
                &ResourceOptions::new().subdir(subdir.clone()),
            );
            assert!(
                matches!(result, Err(WriteError::InvalidSource(_))),
                "accepted {subdir:?}"
            );
        }
        assert!(!outside.exists());
        assert!(!tmp.path().join("js").exists());
    }
}

//! Output directory skeleton.
//!
//! [`SiteLayout`] owns the fixed structure of a written site:
//!
//! ```text
//! {destination}/
//! +-- index.html         # the index page
//! +-- resources/         # copied and streamed resources
//! +-- sub_pages/         # one file per sub page
//! ```
//!
//! A destination is *clean* when neither subfolder nor the index file exists.
//! Files outside these paths are never touched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the index page, relative to the destination.
pub const INDEX_FILE: &str = "index.html";

/// Subfolders tracked by [`SiteLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Folder {
    /// Resources (scripts, stylesheets, images).
    Resources,
    /// Rendered sub pages.
    SubPages,
}

impl Folder {
    /// All tracked folders, in creation order.
    pub const ALL: [Folder; 2] = [Folder::Resources, Folder::SubPages];

    /// Directory name relative to the destination.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Folder::Resources => "resources",
            Folder::SubPages => "sub_pages",
        }
    }
}

/// Directory skeleton of a site destination.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
    folders: [PathBuf; 2],
    index_path: PathBuf,
}

impl SiteLayout {
    /// Create a layout rooted at `root`. Does not touch the filesystem.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let folders = Folder::ALL.map(|folder| root.join(folder.name()));
        let index_path = root.join(INDEX_FILE);
        Self {
            root,
            folders,
            index_path,
        }
    }

    /// Destination root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a tracked folder.
    #[must_use]
    pub fn folder(&self, folder: Folder) -> &Path {
        &self.folders[folder as usize]
    }

    /// Absolute path of the index file.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Whether the destination holds no output from a previous run.
    ///
    /// Returns `false` if any tracked subfolder or the index file exists.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.folders.iter().any(|folder| folder.exists()) && !self.index_path.exists()
    }

    /// Create the destination root and every tracked subfolder that is missing.
    ///
    /// Existing folders and their contents are kept as they are.
    pub fn set_up(&self) -> io::Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        for folder in &self.folders {
            if !folder.exists() {
                fs::create_dir(folder)?;
            }
        }
        tracing::debug!(root = %self.root.display(), "site layout ready");
        Ok(())
    }

    /// Remove every tracked subfolder and the index file.
    ///
    /// The destination root and untracked files inside it are left alone.
    pub fn clean_up(&self) -> io::Result<()> {
        let mut removed = 0usize;
        for folder in &self.folders {
            if folder.is_dir() {
                fs::remove_dir_all(folder)?;
                removed += 1;
            } else if folder.exists() {
                fs::remove_file(folder)?;
                removed += 1;
            }
        }
        if self.index_path.exists() {
            fs::remove_file(&self.index_path)?;
            removed += 1;
        }
        tracing::info!(root = %self.root.display(), removed, "removed previous site output");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout_in(tmp: &TempDir) -> SiteLayout {
        SiteLayout::new(tmp.path().join("site"))
    }

    #[test]
    fn test_paths() {
        let layout = SiteLayout::new(PathBuf::from("/out"));
        assert_eq!(layout.root(), Path::new("/out"));
        assert_eq!(layout.folder(Folder::Resources), Path::new("/out/resources"));
        assert_eq!(layout.folder(Folder::SubPages), Path::new("/out/sub_pages"));
        assert_eq!(layout.index_path(), Path::new("/out/index.html"));
    }

    #[test]
    fn test_missing_destination_is_clean() {
        let tmp = TempDir::new().unwrap();
        assert!(layout_in(&tmp).is_clean());
    }

    #[test]
    fn test_empty_destination_is_clean() {
        let tmp = TempDir::new().unwrap();
        let layout = SiteLayout::new(tmp.path().to_path_buf());
        assert!(layout.is_clean());
    }

    #[test]
    fn test_set_up_creates_skeleton() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);

        layout.set_up().unwrap();

        assert!(layout.root().is_dir());
        assert!(layout.folder(Folder::Resources).is_dir());
        assert!(layout.folder(Folder::SubPages).is_dir());
        assert!(!layout.index_path().exists());
    }

    #[test]
    fn test_set_up_is_idempotent_and_keeps_contents() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        layout.set_up().unwrap();
        let kept = layout.folder(Folder::Resources).join("app.js");
        fs::write(&kept, "console.log(1)").unwrap();

        layout.set_up().unwrap();

        assert_eq!(fs::read_to_string(&kept).unwrap(), "console.log(1)");
    }

    #[test]
    fn test_subfolder_makes_destination_dirty() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        fs::create_dir_all(layout.folder(Folder::SubPages)).unwrap();
        assert!(!layout.is_clean());
    }

    #[test]
    fn test_index_file_makes_destination_dirty() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        fs::create_dir_all(layout.root()).unwrap();
        fs::write(layout.index_path(), "<html></html>").unwrap();
        assert!(!layout.is_clean());
    }

    #[test]
    fn test_set_up_then_clean_up_is_clean() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        layout.set_up().unwrap();
        fs::write(layout.index_path(), "<html></html>").unwrap();
        fs::write(layout.folder(Folder::SubPages).join("a_1.html"), "a").unwrap();
        assert!(!layout.is_clean());

        layout.clean_up().unwrap();

        assert!(layout.is_clean());
        assert!(layout.root().is_dir());
    }

    #[test]
    fn test_clean_up_keeps_untracked_files() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        layout.set_up().unwrap();
        let notes = layout.root().join("notes.txt");
        fs::write(&notes, "keep me").unwrap();

        layout.clean_up().unwrap();

        assert_eq!(fs::read_to_string(&notes).unwrap(), "keep me");
    }

    #[test]
    fn test_clean_up_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let layout = layout_in(&tmp);
        layout.clean_up().unwrap();
        layout.clean_up().unwrap();
        assert!(layout.is_clean());
    }
}

use crate::paths;
use std::path::{Path, PathBuf};

/// A Markdown source document, identified by its path relative to the source
/// root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Page {
    pub relative: PathBuf,
}

impl Page {
    pub fn new(relative: impl Into<PathBuf>) -> Page {
        Page {
            relative: relative.into(),
        }
    }

    /// The first directory of the page's path, if any (`posts/a.md` ->
    /// `posts`).
    pub fn category(&self) -> Option<String> {
        paths::category(&self.relative)
    }

    /// Aggregator pages (e.g. `index.md`) list summaries of other pages
    /// rather than standing on their own authored body alone.
    pub fn is_aggregator(&self) -> bool {
        self.category().is_none()
            && self
                .relative
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("index."))
    }

    pub fn source_path(&self, source_directory: &Path) -> PathBuf {
        source_directory.join(&self.relative)
    }

    /// The output path relative to the output root.
    pub fn build_path(&self) -> PathBuf {
        paths::build_path(&self.relative)
    }

    /// The template wrapping this page, relative to the source root.
    pub fn parent_template(&self) -> PathBuf {
        paths::parent_template(self.category().as_deref())
    }
}

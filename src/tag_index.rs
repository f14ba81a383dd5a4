//! The on-disk tag index: one plain-text file per tag (`{dir}/{tag}.txt`)
//! listing, one per line, the source paths of the pages carrying that tag.
//!
//! The index is append-only. Associating a page with a tag adds it to the
//! tag's file, but nothing ever removes a page whose tags changed, so the
//! index is only consistent right after [`TagIndex::wipe`] followed by a full
//! build.

use crate::tag::Tag;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "txt";

/// Handle on a tag index directory.
pub struct TagIndex {
    directory: PathBuf,
}

impl TagIndex {
    pub fn new(directory: impl Into<PathBuf>) -> TagIndex {
        TagIndex {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Deletes every record and recreates the (empty) index directory. A
    /// missing directory is nothing to clean.
    pub fn wipe(&self) -> Result<()> {
        match fs::remove_dir_all(&self.directory) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(self.io_error(&self.directory, e)),
        }
        fs::create_dir_all(&self.directory).map_err(|e| self.io_error(&self.directory, e))
    }

    fn tag_path(&self, tag: &Tag) -> PathBuf {
        self.directory.join(format!("{}.{}", tag, EXTENSION))
    }

    /// Makes `page` a member of `tag`'s set, creating the record (and the
    /// index directory) on first sight of the tag. Associating the same pair
    /// twice is a no-op.
    pub fn associate(&self, page: &Path, tag: &Tag) -> Result<()> {
        let tag_path = self.tag_path(tag);
        fs::create_dir_all(&self.directory).map_err(|e| self.io_error(&self.directory, e))?;

        let mut pages: BTreeSet<PathBuf> = self.paths(tag)?.into_iter().collect();
        if !pages.insert(page.to_owned()) && tag_path.exists() {
            return Ok(());
        }

        let contents = pages
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&tag_path, contents).map_err(|e| self.io_error(&tag_path, e))?;
        log::debug!("{} {:?}", tag, pages);
        Ok(())
    }

    /// Returns the pages associated with `tag`. A tag with no record has no
    /// pages.
    pub fn paths(&self, tag: &Tag) -> Result<Vec<PathBuf>> {
        let tag_path = self.tag_path(tag);
        match fs::read_to_string(&tag_path) {
            Ok(contents) => Ok(contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(PathBuf::from)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(self.io_error(&tag_path, e)),
        }
    }

    /// Returns every tag with a record, sorted by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(&self.directory, e)),
        };

        let mut tags = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| self.io_error(&self.directory, e))?.path();
            if path.extension().map_or(false, |ext| ext == EXTENSION) {
                if let Some(stem) = path.file_stem() {
                    tags.push(Tag::from_normalized(stem.to_string_lossy().into_owned()));
                }
            }
        }
        tags.sort();
        Ok(tags)
    }

    fn io_error(&self, path: &Path, err: io::Error) -> Error {
        Error {
            path: path.to_owned(),
            err,
        }
    }
}

/// The result of a fallible tag-index operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Returned when the tag index storage can't be read or written.
#[derive(Debug, thiserror::Error)]
#[error("tag index file '{}': {err}", .path.display())]
pub struct Error {
    pub path: PathBuf,
    #[source]
    pub err: io::Error,
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag(name: &str) -> Tag {
        Tag::normalize(name).unwrap()
    }

    #[test]
    fn test_associate_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("tags"));
        let news = tag("news");

        index.associate(Path::new("posts/a.md"), &news)?;
        index.associate(Path::new("posts/a.md"), &news)?;
        assert_eq!(vec![PathBuf::from("posts/a.md")], index.paths(&news)?);
        Ok(())
    }

    #[test]
    fn test_two_pages_one_tag() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("tags"));
        index.wipe()?;
        let news = tag("news");

        for _ in 0..2 {
            index.associate(Path::new("posts/a.md"), &news)?;
            index.associate(Path::new("posts/b.md"), &news)?;
        }
        let mut paths = index.paths(&news)?;
        paths.sort();
        assert_eq!(
            vec![PathBuf::from("posts/a.md"), PathBuf::from("posts/b.md")],
            paths
        );
        Ok(())
    }

    #[test]
    fn test_unwritable_record_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("tags"));
        fs::create_dir_all(dir.path().join("tags/news.txt")).unwrap();

        let result = index.associate(Path::new("posts/a.md"), &tag("news"));
        let err = result.unwrap_err();
        assert_eq!(dir.path().join("tags/news.txt"), err.path);
    }

    #[test]
    fn test_missing_record_is_empty() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("never-created"));
        assert!(index.paths(&tag("nothing"))?.is_empty());
        assert!(index.tags()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_wipe_discards_stale_membership() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("tags"));
        index.associate(Path::new("posts/a.md"), &tag("old"))?;
        index.associate(Path::new("posts/a.md"), &tag("new"))?;
        assert_eq!(vec![tag("new"), tag("old")], index.tags()?);

        index.wipe()?;
        assert!(index.tags()?.is_empty());
        assert!(index.directory().is_dir());
        Ok(())
    }

    #[test]
    fn test_record_format() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex::new(dir.path().join("tags"));
        index.associate(Path::new("posts/b.md"), &tag("x"))?;
        index.associate(Path::new("posts/a.md"), &tag("x"))?;
        let contents = fs::read_to_string(dir.path().join("tags/x.txt")).unwrap();
        let mut lines: Vec<&str> = contents.lines().collect();
        lines.sort();
        assert_eq!(vec!["posts/a.md", "posts/b.md"], lines);
        Ok(())
    }
}

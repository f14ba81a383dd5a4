//! Output path transforms. Everything here is a pure function of a path (and
//! category); nothing touches the file system.
//!
//! | Source              | Output                   | Parent template          |
//! |---------------------|--------------------------|--------------------------|
//! | `index.md`          | `index.html`             | `_templates/index.html`  |
//! | `posts/hello.md`    | `posts/hello.html`       | `_templates/posts.html`  |
//! | tag `web-dev`       | `tag/web-dev/index.html` | `_templates/tags.html`   |

use crate::tag::Tag;
use std::path::{Component, Path, PathBuf};

/// Directory (relative to the source root) holding the parent templates.
pub const TEMPLATES_DIR: &str = "_templates";

/// Directory (relative to the source root) reserved for the tag index.
pub const TAGS_DIR: &str = "tags";

const MARKDOWN_EXTENSION: &str = "md";
const HTML_EXTENSION: &str = "html";

/// Returns `path` relative to the source root or, failing that, the output
/// root. Paths under neither (including already-relative paths) are returned
/// unchanged apart from dropping `.` components. Only one root is stripped,
/// so `{source}/build/x` yields `build/x`.
pub fn relative_path(path: &Path, source_root: &Path, output_root: &Path) -> PathBuf {
    let relative = match path.strip_prefix(source_root) {
        Ok(relative) => relative,
        Err(_) => path.strip_prefix(output_root).unwrap_or(path),
    };
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// The category of a page is the name of its first directory, if it has one.
pub fn category(relative: &Path) -> Option<String> {
    let mut components = relative.components().filter(|c| matches!(c, Component::Normal(_)));
    let first = components.next()?;
    // a bare file name has no category
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

/// `posts/hello.md` -> `posts/hello.html`.
pub fn build_path(relative: &Path) -> PathBuf {
    relative.with_extension(HTML_EXTENSION)
}

/// The inverse of [`build_path`]: `posts/hello.html` -> `posts/hello.md`.
pub fn source_path(built: &Path) -> PathBuf {
    built.with_extension(MARKDOWN_EXTENSION)
}

/// The template wrapping pages of `category`, relative to the source root.
pub fn parent_template(category: Option<&str>) -> PathBuf {
    Path::new(TEMPLATES_DIR).join(format!("{}.html", category.unwrap_or("index")))
}

/// The template wrapping tag pages.
pub fn tag_template() -> PathBuf {
    Path::new(TEMPLATES_DIR).join("tags.html")
}

/// The output path of a tag's page: `tag/{tag}/index.html`.
pub fn tag_build_path(tag: &Tag) -> PathBuf {
    Path::new("tag").join(tag.as_str()).join("index.html")
}

/// The site-relative URL of an output path, prefixed with `baseurl`.
pub fn url(baseurl: &str, built: &Path) -> String {
    let segments: Vec<String> = built
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    format!("{}/{}", baseurl.trim_end_matches('/'), segments.join("/"))
}

/// Whether a source path is one of the reserved, non-page directories.
pub fn is_reserved(relative: &Path) -> bool {
    match relative.components().next() {
        Some(Component::Normal(first)) => first == TEMPLATES_DIR || first == TAGS_DIR,
        _ => false,
    }
}

/// Whether the path names a Markdown source file.
pub fn is_markdown(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == MARKDOWN_EXTENSION)
}

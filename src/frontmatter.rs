//! Splits a source document into its YAML front matter and its body.
//!
//! A document carries front matter when its first line is exactly `---`; the
//! block runs until the next `---` line:
//!
//! ```md
//! ---
//! title: Hello, world!
//! tags: greeting, meta
//! ---
//! # Hello
//! ```

use serde_yaml::{Mapping, Value};
use std::path::Path;

const FENCE: &str = "---";

/// The metadata of a document. A document without a front-matter block is
/// [`Metadata::Absent`], which is distinct from a block that is empty (or
/// malformed), which is [`Metadata::Present`] with an empty mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum Metadata {
    Absent,
    Present(Mapping),
}

impl Metadata {
    /// Returns the mapping, treating absent metadata as empty.
    pub fn mapping(&self) -> Option<&Mapping> {
        match self {
            Metadata::Absent => None,
            Metadata::Present(m) => Some(m),
        }
    }

    /// Looks up a key in the front matter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping()
            .and_then(|m| m.get(&Value::String(key.to_owned())))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Metadata::Present(_))
    }
}

/// A document split into metadata and body.
#[derive(Debug)]
pub struct Document<'a> {
    pub metadata: Metadata,
    pub body: &'a str,
}

/// Represents an error parsing a front-matter block.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the block is not valid YAML.
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Returned when the block is valid YAML but not a mapping.
    #[error("front matter must be a mapping of keys to values")]
    NotAMapping,
}

/// Returns the byte offsets `(yaml_start, yaml_stop, body_start)` of a
/// front-matter block, or `None` if the document doesn't open with a fence
/// or the fence is never closed.
fn frontmatter_indices(input: &str) -> Option<(usize, usize, usize)> {
    let mut offset = 0;
    let mut lines = input.split_inclusive('\n');

    let first = lines.next()?;
    if trim_newline(first) != FENCE {
        return None;
    }
    offset += first.len();
    let yaml_start = offset;

    for line in lines {
        if trim_newline(line) == FENCE {
            return Some((yaml_start, offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

fn trim_newline(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// Parses a front-matter block. An empty block (or one holding only `null`)
/// is an empty mapping.
fn parse_block(yaml: &str) -> Result<Mapping, Error> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::NotAMapping),
    }
}

/// Splits `input` into metadata and body, failing if the block is malformed.
/// When no block is present the whole input is the body.
pub fn parse(input: &str) -> Result<Document<'_>, Error> {
    match frontmatter_indices(input) {
        None => Ok(Document {
            metadata: Metadata::Absent,
            body: input,
        }),
        Some((yaml_start, yaml_stop, body_start)) => Ok(Document {
            metadata: Metadata::Present(parse_block(&input[yaml_start..yaml_stop])?),
            body: &input[body_start..],
        }),
    }
}

/// Like [`parse`], but a malformed block is logged and replaced with empty
/// metadata so that one bad page doesn't abort the build. The body is still
/// stripped of the block.
pub fn extract<'a>(path: &Path, input: &'a str) -> Document<'a> {
    log::debug!("get front matter for: {}", path.display());
    match parse(input) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!(
                "Error while parsing YAML front matter in {}: {}",
                path.display(),
                e
            );
            let body = match frontmatter_indices(input) {
                Some((_, _, body_start)) => &input[body_start..],
                None => input,
            };
            Document {
                metadata: Metadata::Present(Mapping::new()),
                body,
            }
        }
    }
}

//! Defines the [`Tag`] type, which represents a normalized page tag, and the
//! logic for parsing tags out of front matter.

use minijinja::Value;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Runs of these characters are collapsed into a single hyphen. We can't use a
/// simple `[^a-z0-9]` exclusion because tags may be written in any script.
static STRIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\s"'()+,\-/:;<=>\[\]_`{|}~!@#$%^&*.?]+"#).unwrap()
});

/// Represents a normalized tag. The name is lower-cased with punctuation and
/// whitespace collapsed to hyphens, so `Web Dev` and `web-dev` resolve to the
/// same value and the name can be dropped into a URL path.
///
/// Tags that differ only in stripped characters collide (`C++` and `C` both
/// become `c`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    /// Normalizes a single raw tag. Returns `None` if nothing is left after
    /// stripping.
    pub fn normalize(raw: &str) -> Option<Tag> {
        let lowered = raw.to_lowercase();
        let collapsed = STRIP.replace_all(&lowered, "-");
        let name = collapsed.trim_matches('-');
        match name.is_empty() {
            true => None,
            false => Some(Tag(name.to_owned())),
        }
    }

    /// Splits a comma-separated list (`"C++, Web Dev"`) and normalizes each
    /// entry independently. Duplicates are kept out, first occurrence wins.
    pub fn parse_list(raw: &str) -> Vec<Tag> {
        let mut tags: Vec<Tag> = Vec::new();
        for tag in raw.split(',').filter_map(Tag::normalize) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Reads tags from a front-matter `tags` value, which may be either a
    /// comma-separated string or a sequence of strings. Anything else yields
    /// no tags.
    pub fn from_yaml(value: &serde_yaml::Value) -> Vec<Tag> {
        use serde_yaml::Value as Yaml;
        match value {
            Yaml::String(s) => Tag::parse_list(s),
            Yaml::Sequence(items) => {
                let mut tags: Vec<Tag> = Vec::new();
                for item in items {
                    if let Yaml::String(s) = item {
                        for tag in Tag::parse_list(s) {
                            if !tags.contains(&tag) {
                                tags.push(tag);
                            }
                        }
                    }
                }
                tags
            }
            _ => Vec::new(),
        }
    }

    /// Wraps a name that is already normalized, e.g. one read back from the
    /// tag index directory.
    pub(crate) fn from_normalized(name: String) -> Tag {
        Tag(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        Value::from(t.0.as_str())
    }
}

//! Site configuration, loaded from the `_config.yml` at the project root.
//!
//! ```yaml
//! title: My Blog
//! description: Notes and such
//! url: https://example.com
//! baseurl: /
//! feed: feed.xml
//! author:
//!   name: Jane Doe
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::paths::TAGS_DIR;

/// The name of the project file. Its directory is the project root.
pub const PROJECT_FILE: &str = "_config.yml";

const SOURCE_DIR: &str = "src";
const BUILD_DIR: &str = "build";
const PUBLIC_DIR: &str = "public";

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

fn default_baseurl() -> String {
    String::from("/")
}

fn default_feed() -> String {
    String::from("feed.xml")
}

fn default_collect() -> Vec<String> {
    vec![String::from("posts"), String::from("pages")]
}

fn default_invalidates() -> BTreeMap<String, Vec<PathBuf>> {
    let mut m = BTreeMap::new();
    m.insert(String::from("posts"), vec![PathBuf::from("index.md")]);
    m
}

#[derive(Deserialize)]
struct Project {
    #[serde(default)]
    title: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    url: String,

    #[serde(default = "default_baseurl")]
    baseurl: String,

    #[serde(default = "default_feed")]
    feed: String,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default = "default_collect")]
    collect: Vec<String>,

    #[serde(default = "default_invalidates")]
    invalidates: BTreeMap<String, Vec<PathBuf>>,
}

/// Everything a build needs to know: where things live and the site-wide
/// values made available to every template.
#[derive(Clone, Debug)]
pub struct Config {
    /// Markdown sources and templates (`{root}/src`).
    pub source_directory: PathBuf,

    /// Rendered output (`{root}/build`).
    pub output_directory: PathBuf,

    /// The tag index (`{root}/src/tags`). It lives among the sources but is
    /// derived, and is wiped on every full build.
    pub tags_directory: PathBuf,

    /// Static assets copied verbatim to `{output_directory}/public`.
    pub public_source_directory: PathBuf,
    pub public_output_directory: PathBuf,

    pub title: String,
    pub description: String,

    /// The site's domain, e.g. `https://example.com`.
    pub url: String,

    /// The path prefix of every page URL, e.g. `/` or `/blog/`.
    pub baseurl: String,

    /// The feed's path relative to the output directory.
    pub feed: PathBuf,

    pub author: Option<Author>,

    /// Categories whose pages are summarized on aggregator pages.
    pub collect: Vec<String>,

    /// Which aggregator pages must be re-rendered when a page of a category
    /// changes.
    pub invalidates: BTreeMap<String, Vec<PathBuf>>,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a project file and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration from '{}'", path.display()))
        } else {
            match dir.parent() {
                Some(dir) => Config::from_directory(dir),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Config::parse(project_root, &contents),
        }
    }

    /// Builds a configuration for the project rooted at `project_root` from
    /// the contents of its project file.
    pub fn parse(project_root: &Path, contents: &str) -> Result<Config> {
        let project: Project = if contents.trim().is_empty() {
            serde_yaml::from_str("{}")?
        } else {
            serde_yaml::from_str(contents)?
        };
        let source_directory = project_root.join(SOURCE_DIR);
        let output_directory = project_root.join(BUILD_DIR);
        Ok(Config {
            tags_directory: source_directory.join(TAGS_DIR),
            public_source_directory: project_root.join(PUBLIC_DIR),
            public_output_directory: output_directory.join(PUBLIC_DIR),
            source_directory,
            output_directory,
            title: project.title,
            description: project.description,
            url: project.url,
            baseurl: project.baseurl,
            feed: PathBuf::from(project.feed),
            author: project.author,
            collect: project.collect,
            invalidates: project.invalidates,
        })
    }

    /// The absolute URL of the site root: `url` followed by `baseurl`.
    pub fn site_url(&self) -> String {
        format!(
            "{}/{}",
            self.url.trim_end_matches('/'),
            self.baseurl.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = Config::parse(Path::new("/site"), "title: Hi\nurl: https://example.com\n")?;
        assert_eq!("Hi", config.title);
        assert_eq!("/", config.baseurl);
        assert_eq!(PathBuf::from("feed.xml"), config.feed);
        assert_eq!(vec!["posts", "pages"], config.collect);
        assert_eq!(
            Some(&vec![PathBuf::from("index.md")]),
            config.invalidates.get("posts")
        );
        assert_eq!(PathBuf::from("/site/src/tags"), config.tags_directory);
        assert_eq!(PathBuf::from("/site/build/public"), config.public_output_directory);
        assert_eq!("https://example.com/", config.site_url());
        Ok(())
    }

    #[test]
    fn test_empty_project_file() -> Result<()> {
        let config = Config::parse(Path::new("/site"), "")?;
        assert_eq!("", config.title);
        Ok(())
    }

    #[test]
    fn test_from_directory_searches_ancestors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join(PROJECT_FILE), "title: Found\nbaseurl: /blog/\n")?;
        let nested = dir.path().join("src/posts");
        std::fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!("Found", config.title);
        assert_eq!(dir.path().join("src"), config.source_directory);
        Ok(())
    }
}

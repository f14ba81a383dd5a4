//! Builds the template variables for pages.
//!
//! A page's context merges, from lowest to highest precedence:
//!
//! 1. computed defaults: `url`, `date`, `category`, `tags`,
//!    `post_content_html` and `siteConfig`, plus one list of summaries per
//!    collected category for aggregator pages;
//! 2. the page's own front-matter keys, which overwrite the defaults.
//!
//! Summaries are page contexts built in [`Mode::Summary`], which skips body
//! conversion, tag-index updates and nested summaries.

use crate::config::Config;
use crate::date;
use crate::frontmatter::{self, Metadata};
use crate::markdown;
use crate::page::Page;
use crate::paths;
use crate::tag::Tag;
use crate::tag_index::{self, TagIndex};
use chrono::NaiveDateTime;
use minijinja::Value;
use serde_yaml::Value as Yaml;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Whether a page's context is being built for rendering the page itself or
/// only to summarize it on another page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Render,
    Summary,
}

/// The computed context of a single page.
#[derive(Clone, Debug)]
pub struct PageContext {
    pub page: Page,

    /// The page's site-relative URL, prefixed with `baseurl`.
    pub url: String,

    pub metadata: Metadata,
    pub tags: Vec<Tag>,
    pub date: NaiveDateTime,
    pub category: Option<String>,

    /// The rendered body. Only set in [`Mode::Render`].
    pub content_html: Option<String>,

    /// Summaries of each collected category. Only set for aggregator pages in
    /// [`Mode::Render`].
    pub summaries: BTreeMap<String, Vec<PageContext>>,
}

impl PageContext {
    /// A display title: the front-matter `title` or else the file stem.
    pub fn title(&self) -> String {
        match self.metadata.get("title").and_then(|t| t.as_str()) {
            Some(title) => title.to_owned(),
            None => self
                .page
                .relative
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Converts the context into a template map value. `site` is the
    /// `siteConfig` value shared by every page.
    pub fn to_value(&self, site: &Value) -> Value {
        let mut m: BTreeMap<String, Value> = BTreeMap::new();
        m.insert("url".to_owned(), Value::from(self.url.as_str()));
        m.insert(
            "date".to_owned(),
            Value::from(date::format(&self.date)),
        );
        m.insert("category".to_owned(), Value::from(self.category.clone()));
        m.insert("tags".to_owned(), self.tags.iter().map(Value::from).collect());
        m.insert("siteConfig".to_owned(), site.clone());

        if let Some(html) = &self.content_html {
            m.insert("post_content_html".to_owned(), Value::from(html.as_str()));
        }
        for (category, summaries) in &self.summaries {
            m.insert(
                category.clone(),
                summaries.iter().map(|s| s.to_value(site)).collect(),
            );
        }

        // Front matter wins, except that `tags` is already normalized and a
        // `date` that parsed is already reflected above.
        if let Some(mapping) = self.metadata.mapping() {
            for (k, v) in mapping {
                let key = key_string(k);
                match key.as_str() {
                    "tags" => continue,
                    "date" if date::from_front_matter(v).is_some() => continue,
                    _ => {
                        m.insert(key, Value::from_serialize(v));
                    }
                }
            }
        }
        Value::from(m)
    }
}

/// The string form of a front-matter key. Keys that aren't strings (`3:`,
/// `true:`) are rendered as YAML.
fn key_string(key: &Yaml) -> String {
    match key {
        Yaml::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_start_matches("---").trim().to_owned())
            .unwrap_or_default(),
    }
}

/// The context of a tag page.
#[derive(Clone, Debug)]
pub struct TagContext {
    pub tag: Tag,
    pub tagged_pages: Vec<PageContext>,
}

impl TagContext {
    pub fn to_value(&self, site: &Value) -> Value {
        let mut m: BTreeMap<String, Value> = BTreeMap::new();
        m.insert("tag".to_owned(), Value::from(&self.tag));
        m.insert(
            "tagged_pages".to_owned(),
            self.tagged_pages.iter().map(|p| p.to_value(site)).collect(),
        );
        m.insert("siteConfig".to_owned(), site.clone());
        Value::from(m)
    }
}

/// Builds page contexts. Holds everything context building depends on so
/// that none of it has to be ambient.
pub struct Builder<'a> {
    pub config: &'a Config,
    pub tag_index: &'a TagIndex,

    /// Every page of the site, used to gather summaries.
    pub pages: &'a [Page],
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a Config, tag_index: &'a TagIndex, pages: &'a [Page]) -> Builder<'a> {
        Builder {
            config,
            tag_index,
            pages,
        }
    }

    /// The `siteConfig` value.
    pub fn site(&self) -> Value {
        let mut m: BTreeMap<String, Value> = BTreeMap::new();
        m.insert("title".to_owned(), Value::from(self.config.title.as_str()));
        m.insert(
            "description".to_owned(),
            Value::from(self.config.description.as_str()),
        );
        m.insert("url".to_owned(), Value::from(self.config.site_url()));
        m.insert("domain".to_owned(), Value::from(self.config.url.as_str()));
        Value::from(m)
    }

    /// Builds the context of `page`. In [`Mode::Render`] this also records the
    /// page's tags in the tag index.
    pub fn page(&self, page: &Page, mode: Mode) -> Result<PageContext> {
        let source = page.source_path(&self.config.source_directory);
        let contents = std::fs::read_to_string(&source).map_err(|err| Error::Read {
            path: source.clone(),
            err,
        })?;
        let doc = frontmatter::extract(&page.relative, &contents);

        let tags = match doc.metadata.get("tags") {
            Some(tags) => Tag::from_yaml(tags),
            None => Vec::new(),
        };
        if mode == Mode::Render {
            log::debug!("update tags for {}: {:?}", page.relative.display(), tags);
            for tag in &tags {
                self.tag_index.associate(&page.relative, tag)?;
                log::info!("tagged {} with `{}`", page.relative.display(), tag);
            }
        }

        let date = match doc.metadata.get("date").and_then(date::from_front_matter) {
            Some(date) => date,
            None => date::file_date(&source).map_err(|err| Error::Date {
                path: source.clone(),
                err,
            })?,
        };

        let content_html = match mode {
            Mode::Render => {
                let mut html = String::new();
                markdown::to_html(&mut html, doc.body);
                Some(html)
            }
            Mode::Summary => None,
        };

        let mut summaries = BTreeMap::new();
        if mode == Mode::Render && page.is_aggregator() {
            for category in &self.config.collect {
                summaries.insert(category.clone(), self.summaries(category)?);
            }
        }

        Ok(PageContext {
            url: paths::url(&self.config.baseurl, &page.build_path()),
            category: page.category(),
            page: page.clone(),
            metadata: doc.metadata,
            tags,
            date,
            content_html,
            summaries,
        })
    }

    /// Summaries of the pages directly inside `category` (`posts/*.md`, not
    /// `posts/2025/*.md`), newest first.
    pub fn summaries(&self, category: &str) -> Result<Vec<PageContext>> {
        let mut summaries = self
            .pages
            .iter()
            .filter(|p| p.relative.parent() == Some(Path::new(category)))
            .map(|p| self.page(p, Mode::Summary))
            .collect::<Result<Vec<_>>>()?;
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }

    /// The context of `tag`'s page: summaries of the pages in its index
    /// entry, newest first. Entries whose source file no longer exists are
    /// skipped.
    pub fn tag(&self, tag: &Tag) -> Result<TagContext> {
        let mut tagged_pages = Vec::new();
        for relative in self.tag_index.paths(tag)? {
            let page = Page::new(relative);
            if !page.source_path(&self.config.source_directory).is_file() {
                log::warn!(
                    "tag `{}` lists missing page {}",
                    tag,
                    page.relative.display()
                );
                continue;
            }
            tagged_pages.push(self.page(&page, Mode::Summary)?);
        }
        sort_newest_first(&mut tagged_pages);
        Ok(TagContext {
            tag: tag.clone(),
            tagged_pages,
        })
    }
}

fn sort_newest_first(pages: &mut [PageContext]) {
    pages.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.page.cmp(&b.page)));
}

/// The result of a fallible context-building operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a page context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a page's source can't be read.
    #[error("reading page '{}': {err}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when a page has no usable date and its file timestamp can't
    /// be read.
    #[error("reading timestamp of '{}': {err}", .path.display())]
    Date {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the tag index can't be updated or read.
    #[error(transparent)]
    TagIndex(#[from] tag_index::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: Config,
        tag_index: TagIndex,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::parse(dir.path(), "title: Test\nurl: https://example.com\n").unwrap();
        for (path, contents) in files {
            let path = config.source_directory.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        let tag_index = TagIndex::new(&config.tags_directory);
        tag_index.wipe().unwrap();
        Fixture {
            _dir: dir,
            config,
            tag_index,
        }
    }

    fn attr(value: &Value, key: &str) -> String {
        value
            .get_attr(key)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default()
    }

    #[test]
    fn test_render_mode() -> Result<()> {
        let f = fixture(&[(
            "posts/2025-02-03-hello.md",
            "---\ntitle: Hello\ntags: C++, Web Dev\n---\n# Hi\n",
        )]);
        let pages = vec![Page::new("posts/2025-02-03-hello.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);

        let ctx = builder.page(&pages[0], Mode::Render)?;
        assert_eq!(
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            ctx.date
        );
        assert_eq!(Some("posts".to_owned()), ctx.category);
        assert_eq!("/posts/2025-02-03-hello.html", ctx.url);
        assert_eq!(Some("<h1 id=\"hi\">Hi</h1>\n".to_owned()), ctx.content_html);
        assert_eq!("Hello", ctx.title());

        let c = Tag::normalize("c").unwrap();
        assert_eq!(vec![PathBuf::from("posts/2025-02-03-hello.md")], f.tag_index.paths(&c)?);

        let value = ctx.to_value(&builder.site());
        assert_eq!("Hello", attr(&value, "title"));
        assert_eq!("2025-02-03", attr(&value, "date"));
        assert_eq!("<h1 id=\"hi\">Hi</h1>\n", attr(&value, "post_content_html"));
        Ok(())
    }

    #[test]
    fn test_summary_mode_has_no_side_effects() -> Result<()> {
        let f = fixture(&[("posts/a.md", "---\ntags: news\n---\nbody\n")]);
        let pages = vec![Page::new("posts/a.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);

        let ctx = builder.page(&pages[0], Mode::Summary)?;
        assert_eq!(None, ctx.content_html);
        assert!(f.tag_index.tags()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_front_matter_overrides_defaults() -> Result<()> {
        let f = fixture(&[(
            "pages/about.md",
            "---\ncategory: custom\ndate: 2020-01-02\nurl: /elsewhere.html\n---\nbody\n",
        )]);
        let pages = vec![Page::new("pages/about.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);

        let value = builder.page(&pages[0], Mode::Render)?.to_value(&builder.site());
        assert_eq!("custom", attr(&value, "category"));
        assert_eq!("2020-01-02", attr(&value, "date"));
        assert_eq!("/elsewhere.html", attr(&value, "url"));
        Ok(())
    }

    #[test]
    fn test_date_keeps_time_of_day() -> Result<()> {
        let f = fixture(&[("posts/a.md", "---\ndate: 2025-01-01 08:30\n---\n")]);
        let pages = vec![Page::new("posts/a.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);
        let value = builder.page(&pages[0], Mode::Summary)?.to_value(&builder.site());
        assert_eq!("2025-01-01 08:30:00", attr(&value, "date"));
        Ok(())
    }

    #[test]
    fn test_unparseable_date_passes_through() -> Result<()> {
        let f = fixture(&[("pages/a.md", "---\ndate: someday\n---\n")]);
        let pages = vec![Page::new("pages/a.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);
        let value = builder.page(&pages[0], Mode::Summary)?.to_value(&builder.site());
        assert_eq!("someday", attr(&value, "date"));
        Ok(())
    }

    #[test]
    fn test_malformed_front_matter_still_renders() -> Result<()> {
        let f = fixture(&[("posts/2024-01-01-bad.md", "---\ntags: [oops\n---\nstill here\n")]);
        let pages = vec![Page::new("posts/2024-01-01-bad.md")];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);
        let ctx = builder.page(&pages[0], Mode::Render)?;
        assert!(ctx.tags.is_empty());
        assert_eq!(Some("<p>still here</p>\n".to_owned()), ctx.content_html);
        Ok(())
    }

    #[test]
    fn test_aggregator_summaries() -> Result<()> {
        let f = fixture(&[
            ("index.md", "Welcome\n"),
            ("posts/2025-01-01-old.md", "---\ntitle: Old\n---\nold\n"),
            ("posts/2025-03-01-new.md", "---\ntitle: New\n---\nnew\n"),
            ("pages/about.md", "---\ntitle: About\ndate: 2020-01-01\n---\n"),
        ]);
        let pages = vec![
            Page::new("index.md"),
            Page::new("pages/about.md"),
            Page::new("posts/2025-01-01-old.md"),
            Page::new("posts/2025-03-01-new.md"),
        ];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);

        let ctx = builder.page(&pages[0], Mode::Render)?;
        let posts: Vec<String> = ctx.summaries["posts"].iter().map(PageContext::title).collect();
        assert_eq!(vec!["New", "Old"], posts);
        assert_eq!(1, ctx.summaries["pages"].len());
        assert!(ctx.summaries["posts"].iter().all(|s| s.content_html.is_none()));
        assert!(ctx.summaries["posts"].iter().all(|s| s.summaries.is_empty()));

        // summarizing the aggregator itself doesn't recurse
        let summary = builder.page(&pages[0], Mode::Summary)?;
        assert!(summary.summaries.is_empty());
        Ok(())
    }

    #[test]
    fn test_summaries_skip_nested_pages() -> Result<()> {
        let f = fixture(&[
            ("posts/2025-01-01-top.md", "top\n"),
            ("posts/2025/2025-02-01-nested.md", "nested\n"),
        ]);
        let pages = vec![
            Page::new("posts/2025-01-01-top.md"),
            Page::new("posts/2025/2025-02-01-nested.md"),
        ];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);
        let summaries = builder.summaries("posts")?;
        assert_eq!(1, summaries.len());
        assert_eq!(Path::new("posts/2025-01-01-top.md"), summaries[0].page.relative);
        Ok(())
    }

    #[test]
    fn test_tag_context() -> Result<()> {
        let f = fixture(&[
            ("posts/2025-01-01-a.md", "---\ntags: news\n---\n"),
            ("posts/2025-02-01-b.md", "---\ntags: News, other\n---\n"),
        ]);
        let pages = vec![
            Page::new("posts/2025-01-01-a.md"),
            Page::new("posts/2025-02-01-b.md"),
        ];
        let builder = Builder::new(&f.config, &f.tag_index, &pages);
        for page in &pages {
            builder.page(page, Mode::Render)?;
        }

        let news = builder.tag(&Tag::normalize("news").unwrap())?;
        let urls: Vec<&str> = news.tagged_pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(vec!["/posts/2025-02-01-b.html", "/posts/2025-01-01-a.html"], urls);

        std::fs::remove_file(f.config.source_directory.join("posts/2025-01-01-a.md")).unwrap();
        let news = builder.tag(&Tag::normalize("news").unwrap())?;
        assert_eq!(1, news.tagged_pages.len());
        assert_eq!(Path::new("posts/2025-02-01-b.md"), news.tagged_pages[0].page.relative);
        Ok(())
    }

    #[test]
    fn test_non_string_keys() {
        assert_eq!("3", key_string(&Yaml::from(3)));
        assert_eq!("true", key_string(&Yaml::Bool(true)));
    }
}

//! Exports the [`Site`] handle, which stitches together the high-level steps
//! of building the output static site: discovering pages, rendering content
//! pages ([`crate::context`], [`crate::render`]), rendering the aggregators
//! they invalidate ([`crate::deps`]), rendering tag pages from the tag index,
//! copying the static `public` directory, and generating the Atom feed.

use crate::config::Config;
use crate::context::{self, Builder, Mode};
use crate::deps::Invalidations;
use crate::feed;
use crate::page::Page;
use crate::paths;
use crate::render::{self, Templates};
use crate::tag::Tag;
use crate::tag_index::{self, TagIndex};
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The category whose pages make up the feed.
const FEED_CATEGORY: &str = "posts";

/// Everything that happened during a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// Content pages rendered, by relative source path.
    pub pages: Vec<PathBuf>,

    /// Aggregator pages rendered, by relative source path.
    pub aggregators: Vec<PathBuf>,

    /// Tags whose pages were rendered.
    pub tags: Vec<Tag>,
}

/// A site and the state that persists between builds: the configuration, the
/// tag index, the template cache and the list of known pages.
pub struct Site {
    config: Config,
    tag_index: TagIndex,
    templates: Templates,
    invalidations: Invalidations,
    pages: Vec<Page>,
}

impl Site {
    pub fn new(config: Config) -> Site {
        Site {
            tag_index: TagIndex::new(&config.tags_directory),
            templates: Templates::new(&config.source_directory),
            invalidations: Invalidations::new(config.invalidates.clone()),
            pages: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tag_index(&self) -> &TagIndex {
        &self.tag_index
    }

    /// The pages found by the last build, sorted by path.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Builds the whole site from scratch. The output directory and the tag
    /// index are wiped first, so afterwards the tag index matches the sources
    /// exactly.
    pub fn build(&mut self) -> Result<Report> {
        // Blow away the old output so pages that no longer have a source don't
        // linger.
        rmdir(&self.config.output_directory)?;
        self.tag_index.wipe()?;
        self.templates.clear();

        copy_dir(
            &self.config.public_source_directory,
            &self.config.public_output_directory,
        )?;

        self.refresh_pages()?;
        log::info!("found {} pages", self.pages.len());

        let mut report = Report::default();
        let (aggregators, content): (Vec<&Page>, Vec<&Page>) =
            self.pages.iter().partition(|page| page.is_aggregator());

        for page in &content {
            self.render_page(page)?;
            report.pages.push(page.relative.clone());
        }

        for page in aggregators {
            self.render_page(page)?;
            report.aggregators.push(page.relative.clone());
        }

        report.tags = self.render_tags()?;
        self.write_feed()?;
        log::info!(
            "built {} pages, {} aggregators and {} tag pages into {}",
            report.pages.len(),
            report.aggregators.len(),
            report.tags.len(),
            self.config.output_directory.display()
        );
        Ok(report)
    }

    /// Re-renders the pages at `changed` (absolute or relative to the source
    /// or output root), the aggregators they invalidate, every tag page and
    /// the feed. Templates are reloaded.
    ///
    /// Tag associations are only ever added here: a page that dropped a tag
    /// stays listed under it until the next [`Site::build`].
    pub fn rebuild(&mut self, changed: &[PathBuf]) -> Result<Report> {
        self.templates.clear();
        self.refresh_pages()?;

        let mut changed_pages: BTreeSet<Page> = BTreeSet::new();
        for path in changed {
            let relative = paths::relative_path(
                path,
                &self.config.source_directory,
                &self.config.output_directory,
            );
            let page = Page::new(match paths::is_markdown(&relative) {
                true => relative,
                false => paths::source_path(&relative),
            });
            if !self.pages.contains(&page) {
                log::warn!("skipping {}: not a page of this site", path.display());
                continue;
            }
            changed_pages.insert(page);
        }

        let mut report = Report::default();
        let (aggregators, content): (Vec<&Page>, Vec<&Page>) =
            changed_pages.iter().partition(|page| page.is_aggregator());

        for page in &content {
            self.render_page(page)?;
            report.pages.push(page.relative.clone());
        }

        let mut dirty = self.invalidations.dirty(content.iter().copied());
        dirty.extend(aggregators.into_iter().map(|page| page.relative.clone()));
        for relative in dirty {
            let page = Page::new(relative);
            if !self.pages.contains(&page) {
                log::warn!("invalidated aggregator {} does not exist", page.relative.display());
                continue;
            }
            log::info!("re-render {}", page.relative.display());
            self.render_page(&page)?;
            report.aggregators.push(page.relative);
        }

        report.tags = self.render_tags()?;
        self.write_feed()?;
        Ok(report)
    }

    /// Refreshes the page list and, since aggregators may have come or gone,
    /// the invalidation graph.
    fn refresh_pages(&mut self) -> Result<()> {
        self.pages = discover(&self.config.source_directory)?;
        self.invalidations = Invalidations::new(self.config.invalidates.clone())
            .with_collected(
                &self.config.collect,
                self.pages.iter().filter(|page| page.is_aggregator()),
            );
        Ok(())
    }

    fn builder(&self) -> Builder<'_> {
        Builder::new(&self.config, &self.tag_index, &self.pages)
    }

    fn render_page(&self, page: &Page) -> Result<()> {
        let builder = self.builder();
        let context = builder.page(page, Mode::Render)?;
        let output = self.config.output_directory.join(page.build_path());
        log::info!("render {} -> {}", page.relative.display(), output.display());
        self.templates.render(
            &page.parent_template(),
            context.to_value(&builder.site()),
            &output,
        )?;
        Ok(())
    }

    fn render_tags(&self) -> Result<Vec<Tag>> {
        let builder = self.builder();
        let site = builder.site();
        let tags = self.tag_index.tags()?;
        for tag in &tags {
            let context = builder.tag(tag)?;
            let output = self
                .config
                .output_directory
                .join(paths::tag_build_path(tag));
            log::info!(
                "render tag `{}` ({} pages) -> {}",
                tag,
                context.tagged_pages.len(),
                output.display()
            );
            self.templates
                .render(&paths::tag_template(), context.to_value(&site), &output)?;
        }
        Ok(tags)
    }

    fn write_feed(&self) -> Result<()> {
        let pages = self.builder().summaries(FEED_CATEGORY)?;
        let path = self.config.output_directory.join(&self.config.feed);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        let file = File::create(&path).map_err(|err| Error::Io {
            path: path.clone(),
            err,
        })?;
        feed::write_feed(&self.config, &pages, file)?;
        log::info!("wrote feed with {} entries to {}", pages.len(), path.display());
        Ok(())
    }
}

/// Lists the Markdown pages under `source_directory`, skipping the reserved
/// template and tag index directories. Sorted by path.
fn discover(source_directory: &Path) -> Result<Vec<Page>> {
    let mut pages = Vec::new();
    for entry in WalkDir::new(source_directory).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(source_directory) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        if paths::is_reserved(relative) || !paths::is_markdown(relative) {
            continue;
        }
        pages.push(Page::new(relative));
    }
    pages.sort();
    Ok(pages)
}

/// Copies the `src` tree into `dst`. A missing `src` means there is nothing
/// to copy.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        log::debug!("no static directory at {}", src.display());
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        let copied = match entry.file_type().is_dir() {
            true => std::fs::create_dir_all(&target),
            false => std::fs::copy(entry.path(), &target).map(|_| ()),
        };
        copied.map_err(|err| Error::Io { path: target, err })?;
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

/// The result of a fallible build operation.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can come from building page
/// contexts, rendering templates, the tag index, the feed, cleaning the output
/// directory, and other I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Context(#[from] context::Error),

    #[error(transparent)]
    Render(#[from] render::Error),

    #[error(transparent)]
    TagIndex(#[from] tag_index::Error),

    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned for I/O problems while cleaning the output directory.
    #[error("cleaning directory '{}': {err}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the source or static tree can't be traversed.
    #[error("walking directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned for other I/O errors.
    #[error("'{}': {err}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

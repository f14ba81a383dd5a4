//! Support for creating Atom feeds from a list of page summaries.

use crate::config::{Author, Config};
use crate::context::PageContext;
use atom_syndication::{Entry, Error as AtomError, Feed, FixedDateTime, Link, Person, Text};
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::io::Write;
use url::Url;

/// Creates a feed for the site described by `config` from `pages` (expected
/// newest first) and writes the result to a [`std::io::Write`].
pub fn write_feed<W: Write>(config: &Config, pages: &[PageContext], w: W) -> Result<()> {
    feed(config, pages).write_to(w)?;
    Ok(())
}

fn feed(config: &Config, pages: &[PageContext]) -> Feed {
    let home_page = config.site_url();
    let mut feed = Feed::default();
    feed.set_title(config.title.as_str());
    feed.set_id(home_page.as_str());
    feed.set_updated(match pages.iter().map(|p| p.date).max() {
        Some(date) => fixed(date),
        None => Utc::now().into(),
    });
    feed.set_authors(author_to_people(config.author.as_ref()));
    feed.set_links(vec![alternate(home_page.clone())]);
    if !config.description.is_empty() {
        feed.set_subtitle(Text::plain(config.description.as_str()));
    }
    feed.set_entries(
        pages
            .iter()
            .map(|page| feed_entry(config, &home_page, page))
            .collect::<Vec<_>>(),
    );
    feed
}

fn feed_entry(config: &Config, home_page: &str, page: &PageContext) -> Entry {
    let url = absolute_url(home_page, &page.url);
    let date = fixed(page.date);

    let mut entry = Entry::default();
    entry.set_id(url.as_str());
    entry.set_title(page.title());
    entry.set_updated(date);
    entry.set_published(Some(date));
    entry.set_authors(author_to_people(config.author.as_ref()));
    entry.set_links(vec![alternate(url)]);
    let summary = ["description", "summary"]
        .iter()
        .find_map(|key| page.metadata.get(key).and_then(|v| v.as_str()));
    if let Some(summary) = summary {
        entry.set_summary(Some(Text::plain(summary)));
    }
    entry
}

/// Joins a page URL onto the site URL. Without a usable site URL the page URL
/// is used as is.
fn absolute_url(home_page: &str, page_url: &str) -> String {
    match Url::parse(home_page).and_then(|base| base.join(page_url)) {
        Ok(url) => url.to_string(),
        Err(_) => page_url.to_owned(),
    }
}

fn alternate(href: String) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

/// Page dates carry no zone; they are published as UTC.
fn fixed(date: NaiveDateTime) -> FixedDateTime {
    Utc.from_utc_datetime(&date).into()
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

/// The result of a fallible feed operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when serializing the feed or writing it out fails.
    #[error("writing feed: {0}")]
    Atom(#[from] AtomError),
}

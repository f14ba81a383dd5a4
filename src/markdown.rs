use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::{ParseError as UrlParseError, Url};

/// Characters dropped from heading text before it becomes an anchor.
static ANCHOR_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

static ANCHOR_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

const MARKDOWN_EXTENSION: &str = ".md";
const HTML_EXTENSION: &str = ".html";

/// Converts markdown to HTML, appending the result onto `w`.
///
/// Besides CommonMark this enables footnotes, smart punctuation,
/// strikethrough, tables and task lists. Single newlines inside a paragraph
/// are kept as line breaks, relative links to other Markdown sources are
/// pointed at their rendered `.html` counterparts, and every heading gets an
/// `id` anchor derived from its text (`## Getting Started` ->
/// `id="getting-started"`, repeats suffixed `_1`, `_2`, ...).
pub fn to_html(w: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let events: Vec<Event<'_>> = Parser::new_ext(markdown, options).map(convert).collect();
    let ids = heading_ids(&events);
    html::push_html(w, with_heading_ids(events, &ids));
}

/// One anchor per heading, in document order.
fn heading_ids(events: &[Event<'_>]) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    let mut text: Option<String> = None;
    for ev in events {
        match ev {
            Event::Start(Tag::Heading(..)) => text = Some(String::new()),
            Event::Text(t) | Event::Code(t) => {
                if let Some(text) = text.as_mut() {
                    text.push_str(t);
                }
            }
            Event::End(Tag::Heading(..)) => {
                let base = anchor(&text.take().unwrap_or_default());
                let mut id = base.clone();
                let mut n = 0;
                while !seen.insert(id.clone()) {
                    n += 1;
                    id = format!("{}_{}", base, n);
                }
                ids.push(id);
            }
            _ => {}
        }
    }
    ids
}

fn anchor(text: &str) -> String {
    let stripped = ANCHOR_STRIP.replace_all(text, "");
    let lowered = stripped.trim().to_lowercase();
    let id = ANCHOR_SEPARATORS.replace_all(&lowered, "-").into_owned();
    match id.is_empty() {
        true => String::from("section"),
        false => id,
    }
}

fn with_heading_ids<'a>(
    events: Vec<Event<'a>>,
    ids: &'a [String],
) -> impl Iterator<Item = Event<'a>> {
    let mut ids = ids.iter();
    events.into_iter().map(move |ev| match ev {
        Event::Start(Tag::Heading(level, _, classes)) => Event::Start(Tag::Heading(
            level,
            ids.next().map(String::as_str),
            classes,
        )),
        _ => ev,
    })
}

fn convert(ev: Event<'_>) -> Event<'_> {
    match ev {
        Event::Start(tag) => Event::Start(convert_tag(tag)),
        Event::End(tag) => Event::End(convert_tag(tag)),
        Event::SoftBreak => Event::HardBreak,
        _ => ev,
    }
}

fn convert_tag(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        // Internal links (e.g. a post linking to `other.md`) need to point at
        // the output file (`other.html`).
        Tag::Link(
            link @ (LinkType::Inline
            | LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown),
            url,
            title,
        ) => Tag::Link(link, convert_link(url), title),
        _ => tag,
    }
}

/// Rewrites a relative link to a Markdown file into a link to the HTML file,
/// keeping any query or fragment. Absolute URLs are left alone.
fn convert_link(link: CowStr<'_>) -> CowStr<'_> {
    match Url::parse(&link) {
        Err(UrlParseError::RelativeUrlWithoutBase) => {}
        _ => return link,
    }

    let split = link.find(['?', '#']).unwrap_or(link.len());
    let (path, suffix) = link.split_at(split);
    let converted = path
        .strip_suffix(MARKDOWN_EXTENSION)
        .map(|stem| format!("{}{}{}", stem, HTML_EXTENSION, suffix));
    match converted {
        Some(converted) => CowStr::Boxed(converted.into_boxed_str()),
        None => link,
    }
}

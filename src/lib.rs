//! The library code for the `scriptorium` static site generator. A site is a
//! directory of Markdown files with YAML front matter, rendered through
//! per-category templates. Building one breaks down into these steps:
//!
//! 1. Discovering the pages under the source directory ([`crate::build`])
//! 2. Rendering each content page, which also records its tags in the on-disk
//!    tag index ([`crate::context`], [`crate::tag_index`])
//! 3. Rendering the aggregator pages (e.g. `index.md`) invalidated by that
//!    content, once each ([`crate::deps`])
//! 4. Rendering one page per tag from the tag index
//! 5. Writing the Atom feed ([`crate::feed`])
//!
//! Page contexts are where pages get cross-referenced: an aggregator's
//! context holds a summary of every page in each collected category, and a
//! tag page's context holds a summary of every page carrying that tag.
//! Summaries are contexts built without rendering the body, touching the tag
//! index, or nesting further summaries.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod context;
pub mod date;
pub mod deps;
pub mod feed;
pub mod frontmatter;
pub mod markdown;
pub mod page;
pub mod paths;
pub mod render;
pub mod tag;
pub mod tag_index;

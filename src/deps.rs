//! Tracks which aggregator pages must be rendered again when content pages
//! change. Edges run from a category to the aggregators that summarize it;
//! aggregators themselves have no outgoing edges, so a rebuild never cascades.

use crate::page::Page;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Clone, Debug, Default)]
pub struct Invalidations {
    edges: BTreeMap<String, Vec<PathBuf>>,
}

impl Invalidations {
    pub fn new(edges: BTreeMap<String, Vec<PathBuf>>) -> Invalidations {
        Invalidations { edges }
    }

    /// Adds an edge from each of `categories` to each of `aggregators`, since
    /// every aggregator summarizes every collected category.
    pub fn with_collected<'a>(
        mut self,
        categories: &[String],
        aggregators: impl IntoIterator<Item = &'a Page>,
    ) -> Invalidations {
        let aggregators: Vec<&Page> = aggregators.into_iter().collect();
        for category in categories {
            let edges = self.edges.entry(category.clone()).or_default();
            for aggregator in &aggregators {
                if !edges.contains(&aggregator.relative) {
                    edges.push(aggregator.relative.clone());
                }
            }
        }
        self
    }

    /// The aggregators (by relative source path) invalidated by `page`.
    pub fn invalidated_by(&self, page: &Page) -> &[PathBuf] {
        if page.is_aggregator() {
            return &[];
        }
        page.category()
            .and_then(|category| self.edges.get(&category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every aggregator invalidated by any of `pages`, each listed once.
    pub fn dirty<'a>(&self, pages: impl IntoIterator<Item = &'a Page>) -> BTreeSet<PathBuf> {
        pages
            .into_iter()
            .flat_map(|page| self.invalidated_by(page).iter().cloned())
            .collect()
    }
}

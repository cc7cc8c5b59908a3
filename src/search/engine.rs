//! Ranking of single pages, full listings and merged multi-query results

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::identifier::IdentifierParser;
use crate::search::scoring::{Query, Searchable, relevance};

/// One fetched item and its computed relevance (always >= 0)
#[derive(Debug, Clone, PartialEq)]
pub struct RankedItem<T> {
    pub item: T,
    pub relevance: f64,
}

/// One page of a cursor-paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the following page, `None` on the last page
    pub next_page: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page: Option<String>) -> Self {
        Self { items, next_page }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Fetches one page of results for a query.
///
/// `page_token` is `None` for the first page and otherwise the `next_page`
/// returned by the previous call.
#[async_trait::async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, query: &str, page_token: Option<&str>)
    -> Result<Page<T>, RegistryError>;
}

/// Scores, sorts and merges searchable items.
///
/// Holds only immutable configuration.
#[derive(Debug, Clone)]
pub struct RelevanceSearchEngine {
    parser: IdentifierParser,
    max_pages: usize,
}

impl RelevanceSearchEngine {
    pub fn new(parser: IdentifierParser, max_pages: usize) -> Self {
        Self {
            parser,
            max_pages: max_pages.max(1),
        }
    }

    /// Upper bound on fetcher calls per traversal
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn rank_one_page<T: Searchable>(&self, query: &str, items: Vec<T>) -> Vec<RankedItem<T>> {
        self.rank_one_page_at(query, items, Utc::now())
    }

    /// Rank with recency measured from `now`.
    ///
    /// Sorted by descending relevance; equal scores keep their input order.
    pub fn rank_one_page_at<T: Searchable>(
        &self,
        query: &str,
        items: Vec<T>,
        now: DateTime<Utc>,
    ) -> Vec<RankedItem<T>> {
        let query = Query::new(query);
        let mut ranked: Vec<RankedItem<T>> = items
            .into_iter()
            .map(|item| {
                let relevance = relevance(&item, &query, now);
                RankedItem { item, relevance }
            })
            .collect();

        // sort_by is stable
        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });
        ranked
    }

    /// Fetch every page for `query`, then rank the whole listing
    pub async fn rank_all<T, F>(
        &self,
        query: &str,
        fetcher: &F,
    ) -> Result<Vec<RankedItem<T>>, RegistryError>
    where
        T: Searchable + Send,
        F: PageFetcher<T> + ?Sized,
    {
        let items = self.collect_all(query, fetcher).await?;
        Ok(self.rank_one_page(query, items))
    }

    /// Walk the listing one page at a time, in fetch order.
    ///
    /// Stops on a page without a cursor, on an empty page, or after
    /// `max_pages` calls.
    pub async fn collect_all<T, F>(&self, query: &str, fetcher: &F) -> Result<Vec<T>, RegistryError>
    where
        T: Send,
        F: PageFetcher<T> + ?Sized,
    {
        let mut items = Vec::new();
        let mut token: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let page = fetcher.fetch_page(query, token.as_deref()).await?;
            debug!(
                page = page_number,
                items = page.items.len(),
                has_next = page.next_page.is_some(),
                "Fetched page for '{}'",
                query
            );

            if page.items.is_empty() {
                return Ok(items);
            }
            items.extend(page.items);

            match page.next_page {
                Some(next) => token = Some(next),
                None => return Ok(items),
            }
        }

        warn!(
            "Stopped listing '{}' after {} pages with more pages available; returning {} items",
            query,
            self.max_pages,
            items.len()
        );
        Ok(items)
    }

    /// Merge result lists of several queries, keyed by identifier.
    ///
    /// The first occurrence of an identifier is kept in its first-seen
    /// position; later duplicates are dropped.
    pub fn merge_unique<T: Searchable>(&self, batches: Vec<Vec<T>>) -> Vec<T> {
        let mut merged: IndexMap<String, T> = IndexMap::new();
        for item in batches.into_iter().flatten() {
            merged.entry(item.identifier().to_string()).or_insert(item);
        }
        merged.into_values().collect()
    }

    /// Collapse versions of the same module or policy to the greatest one.
    ///
    /// The greatest version takes over the slot of the first-seen version.
    /// Items whose identifier carries no version are kept as they are.
    pub fn keep_latest_versions<T: Searchable>(&self, items: Vec<T>) -> Vec<T> {
        let versions = self.parser.versions();
        let mut latest: IndexMap<String, (Option<String>, T)> = IndexMap::new();

        for item in items {
            let identity = self.parser.identity(item.identifier());
            match latest.entry(identity.key) {
                Entry::Vacant(slot) => {
                    slot.insert((identity.version, item));
                }
                Entry::Occupied(mut slot) => {
                    let newer = match (&slot.get().0, &identity.version) {
                        (Some(kept), Some(candidate)) => {
                            versions.compare(candidate, kept) == Ordering::Greater
                        }
                        _ => false,
                    };
                    if newer {
                        slot.insert((identity.version, item));
                    }
                }
            }
        }

        latest.into_values().map(|(_, item)| item).collect()
    }

    /// Merge several result lists and rank them against one query
    pub fn rank_merged<T: Searchable>(&self, query: &str, batches: Vec<Vec<T>>) -> Vec<RankedItem<T>> {
        let merged = self.merge_unique(batches);
        self.rank_one_page(query, merged)
    }
}

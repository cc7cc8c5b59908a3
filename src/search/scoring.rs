//! Relevance scoring
//!
//! Every component is non-negative, so the total never is either:
//!
//! | signal                         | weight              |
//! |--------------------------------|---------------------|
//! | name equals query              | +10                 |
//! | name contains query            | +5                  |
//! | name contains every term       | +3                  |
//! | description contains query     | +3                  |
//! | description contains every term| +1.5                |
//! | namespace contains query       | +2                  |
//! | provider contains query        | +1                  |
//! | verified                       | +2                  |
//! | downloads                      | 0..=3 (log10 scale) |
//! | published < 30 / < 90 days ago | +1 / +0.5           |

use chrono::{DateTime, Utc};

const EXACT_NAME_WEIGHT: f64 = 10.0;
const NAME_CONTAINS_WEIGHT: f64 = 5.0;
const NAME_TERMS_WEIGHT: f64 = 3.0;
const DESCRIPTION_CONTAINS_WEIGHT: f64 = 3.0;
const DESCRIPTION_TERMS_WEIGHT: f64 = 1.5;
const NAMESPACE_WEIGHT: f64 = 2.0;
const PROVIDER_WEIGHT: f64 = 1.0;
const VERIFIED_WEIGHT: f64 = 2.0;

const DOWNLOADS_FLOOR: f64 = 1.0;
const DOWNLOADS_CEILING: f64 = 10_000_000.0;
const DOWNLOADS_MAX_WEIGHT: f64 = 3.0;

const RECENT_DAYS: i64 = 30;
const RECENT_WEIGHT: f64 = 1.0;
const FAIRLY_RECENT_DAYS: i64 = 90;
const FAIRLY_RECENT_WEIGHT: f64 = 0.5;

/// An item that can be ranked against a query.
///
/// Only `identifier` and `name` are required; the remaining signals default
/// to "absent" and contribute nothing.
pub trait Searchable {
    /// Stable unique ID, used to merge results of several queries
    fn identifier(&self) -> &str;

    fn name(&self) -> &str;

    /// Description or title
    fn description(&self) -> &str {
        ""
    }

    fn namespace(&self) -> &str {
        ""
    }

    fn provider(&self) -> &str {
        ""
    }

    fn verified(&self) -> bool {
        false
    }

    fn downloads(&self) -> u64 {
        0
    }

    fn published_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// A lowercased query and its whitespace-separated terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    terms: Vec<String>,
}

impl Query {
    pub fn new(query: &str) -> Self {
        let text = query.trim().to_lowercase();
        let terms = text.split_whitespace().map(str::to_string).collect();
        Self { text, terms }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    fn all_terms_in(&self, haystack: &str) -> bool {
        self.terms.iter().all(|term| haystack.contains(term.as_str()))
    }
}

/// Relevance of `item` for `query`, with recency measured from `now`
pub fn relevance<T: Searchable + ?Sized>(item: &T, query: &Query, now: DateTime<Utc>) -> f64 {
    let mut score = text_match(item, query);

    if item.verified() {
        score += VERIFIED_WEIGHT;
    }

    score += download_score(item.downloads());

    if let Some(published_at) = item.published_at() {
        score += recency_score(published_at, now);
    }

    score
}

/// The share of `relevance` earned by matching the query text: name,
/// description, namespace and provider. Zero means the query appears nowhere.
pub fn text_match<T: Searchable + ?Sized>(item: &T, query: &Query) -> f64 {
    let q = query.text();
    let name = item.name().to_lowercase();
    let description = item.description().to_lowercase();

    let mut score = 0.0;

    if name == q {
        score += EXACT_NAME_WEIGHT;
    } else if name.contains(q) {
        score += NAME_CONTAINS_WEIGHT;
    } else if query.all_terms_in(&name) {
        score += NAME_TERMS_WEIGHT;
    }

    if description.contains(q) {
        score += DESCRIPTION_CONTAINS_WEIGHT;
    } else if query.all_terms_in(&description) {
        score += DESCRIPTION_TERMS_WEIGHT;
    }

    if item.namespace().to_lowercase().contains(q) {
        score += NAMESPACE_WEIGHT;
    }
    if item.provider().to_lowercase().contains(q) {
        score += PROVIDER_WEIGHT;
    }

    score
}

/// Maps `[1, 10_000_000]` downloads onto `[0, 3]` logarithmically
fn download_score(downloads: u64) -> f64 {
    if downloads == 0 {
        return 0.0;
    }
    let value = (downloads as f64).clamp(DOWNLOADS_FLOOR, DOWNLOADS_CEILING);
    let scaled = (value.log10() - DOWNLOADS_FLOOR.log10())
        / (DOWNLOADS_CEILING.log10() - DOWNLOADS_FLOOR.log10());
    (scaled * DOWNLOADS_MAX_WEIGHT).clamp(0.0, DOWNLOADS_MAX_WEIGHT)
}

fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age = now.signed_duration_since(published_at);
    if age < chrono::Duration::days(RECENT_DAYS) {
        RECENT_WEIGHT
    } else if age < chrono::Duration::days(FAIRLY_RECENT_DAYS) {
        FAIRLY_RECENT_WEIGHT
    } else {
        0.0
    }
}

//! Search over stored articles.
//!
//! A thin layer that maps user filters onto [`ArticleStore`] queries and
//! renders records as plain text. Every field of a record may be missing and
//! renders as a placeholder.

use crate::models::ArticleRecord;
use crate::store::{ArticleStore, StoreError, StoreField};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("at least one search criterion is required")]
    EmptyFilter,
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Search criteria; all present criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Exact primary category, any case.
    pub category: Option<String>,
    /// Exact subcategory or listing tag, any case.
    pub subcategory: Option<String>,
    /// Exact author, any case.
    pub author: Option<String>,
    /// Substring of the title, any case.
    pub title: Option<String>,
    /// Inclusive lower bound on `YYYY-MM-DD` dates.
    pub date_from: Option<String>,
    /// Inclusive upper bound on `YYYY-MM-DD` dates.
    pub date_to: Option<String>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        [
            &self.category,
            &self.subcategory,
            &self.author,
            &self.title,
            &self.date_from,
            &self.date_to,
        ]
        .iter()
        .all(|c| c.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}

fn exact(value: &str) -> String {
    format!("^{}$", regex::escape(value.trim()))
}

fn contains(value: &str) -> String {
    regex::escape(value.trim())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_canonical_date(date: &str) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// A non-blank range bound, which must be a `YYYY-MM-DD` date.
fn date_bound(value: &Option<String>) -> Result<Option<&str>, SearchError> {
    match non_blank(value) {
        Some(bound) if !is_canonical_date(bound) => Err(SearchError::InvalidDate(bound.to_string())),
        bound => Ok(bound),
    }
}

/// Records matching every criterion of `filter`, in store order.
///
/// # Arguments
///
/// * `store` - The store to query
/// * `filter` - Criteria, combined with AND; blank members are ignored
///
/// # Returns
///
/// The matching records. Records whose `date` is not `YYYY-MM-DD` never
/// match a date range.
///
/// # Errors
///
/// [`SearchError::EmptyFilter`] when no criterion is set,
/// [`SearchError::InvalidDate`] when a range bound is not `YYYY-MM-DD`, or a
/// store error.
pub fn search<S: ArticleStore>(store: &S, filter: &SearchFilter) -> Result<Vec<ArticleRecord>, SearchError> {
    if filter.is_empty() {
        return Err(SearchError::EmptyFilter);
    }
    let from = date_bound(&filter.date_from)?;
    let to = date_bound(&filter.date_to)?;

    let mut candidate_sets: Vec<HashSet<String>> = Vec::new();
    let urls = |records: Vec<ArticleRecord>| records.into_iter().map(|r| r.url).collect::<HashSet<_>>();

    if let Some(category) = non_blank(&filter.category) {
        candidate_sets.push(urls(store.query_by_field(StoreField::Categories, &exact(category), true)?));
    }
    if let Some(sub) = non_blank(&filter.subcategory) {
        let mut set = urls(store.query_by_field(StoreField::Subcategories, &exact(sub), true)?);
        set.extend(urls(store.query_by_field(StoreField::Subcategory, &exact(sub), true)?));
        candidate_sets.push(set);
    }
    if let Some(author) = non_blank(&filter.author) {
        candidate_sets.push(urls(store.query_by_field(StoreField::Author, &exact(author), true)?));
    }
    if let Some(title) = non_blank(&filter.title) {
        candidate_sets.push(urls(store.query_by_field(StoreField::Title, &contains(title), true)?));
    }

    let in_range = |record: &ArticleRecord| {
        if from.is_none() && to.is_none() {
            return true;
        }
        record.date.as_deref().is_some_and(|date| {
            is_canonical_date(date)
                && from.is_none_or(|from| date >= from)
                && to.is_none_or(|to| date <= to)
        })
    };

    Ok(store
        .all()?
        .into_iter()
        .filter(|r| candidate_sets.iter().all(|set| set.contains(&r.url)))
        .filter(|r| in_range(r))
        .collect())
}

/// Subcategories and listing tags used by articles of `category`.
pub fn subcategories_for_category<S: ArticleStore>(
    store: &S,
    category: &str,
) -> Result<Vec<String>, SearchError> {
    let records = store.query_by_field(StoreField::Categories, &exact(category), true)?;
    let values: BTreeSet<String> = records
        .iter()
        .flat_map(|r| r.subcategories.iter().chain(r.subcategory.iter()))
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect();
    Ok(values.into_iter().collect())
}

/// Store-wide counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total_articles: usize,
    pub categories_count: usize,
    pub subcategories_count: usize,
    pub authors_count: usize,
}

/// Every subcategory value: unwound `subcategories` plus listing tags.
pub fn all_subcategories<S: ArticleStore>(store: &S) -> Result<Vec<String>, SearchError> {
    let mut values: BTreeSet<String> = store
        .aggregate_unwind_group(StoreField::Subcategories)?
        .into_iter()
        .map(|(value, _)| value)
        .collect();
    values.extend(store.distinct_values(StoreField::Subcategory)?);
    Ok(values.into_iter().filter(|v| !v.trim().is_empty()).collect())
}

/// Primary categories with their article counts, sorted by category.
pub fn category_counts<S: ArticleStore>(store: &S) -> Result<Vec<(String, usize)>, SearchError> {
    Ok(store
        .aggregate_unwind_group(StoreField::Categories)?
        .into_iter()
        .filter(|(value, _)| !value.trim().is_empty())
        .collect())
}

pub fn stats<S: ArticleStore>(store: &S) -> Result<StoreStats, SearchError> {
    Ok(StoreStats {
        total_articles: store.count()?,
        categories_count: store.distinct_values(StoreField::Categories)?.len(),
        subcategories_count: all_subcategories(store)?.len(),
        authors_count: store.distinct_values(StoreField::Author)?.len(),
    })
}

const PLACEHOLDER: &str = "N/A";

fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(PLACEHOLDER)
}

fn title_or_untitled(record: &ArticleRecord) -> &str {
    Some(record.title.as_str())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Untitled")
}

fn categories_line(record: &ArticleRecord) -> String {
    if record.primary_category.is_none() && record.subcategories.is_empty() {
        return PLACEHOLDER.to_string();
    }
    record
        .primary_category
        .iter()
        .chain(record.subcategories.iter())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn summary_or_default(record: &ArticleRecord) -> Option<&str> {
    record.summary.as_deref().filter(|s| !s.trim().is_empty())
}

/// Plain-text rendering of one record, numbered `index`.
///
/// Absent fields print as `N/A`; the summary is cut to 100 characters.
pub fn render_record(index: usize, record: &ArticleRecord) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{index}. {}", title_or_untitled(record));
    let _ = writeln!(out, "   Tag: {}", or_placeholder(record.subcategory.as_deref()));
    let _ = writeln!(out, "   Categories: {}", categories_line(record));
    let _ = writeln!(out, "   Author: {}", or_placeholder(record.author.as_deref()));
    let _ = writeln!(out, "   Date: {}", or_placeholder(record.date.as_deref()));
    let _ = writeln!(out, "   URL: {}", or_placeholder(Some(record.url.as_str())));
    let _ = writeln!(out, "   Images: {}", record.images.len());
    match summary_or_default(record) {
        Some(summary) => {
            let short: String = summary.chars().take(100).collect();
            let ellipsis = if summary.chars().count() > 100 { "..." } else { "" };
            let _ = writeln!(out, "   Summary: {short}{ellipsis}");
        }
        None => {
            let _ = writeln!(out, "   Summary: No summary");
        }
    }
    out
}

/// Full rendering of one record: every field, each image with its caption,
/// and the whole body text.
pub fn render_detail(record: &ArticleRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title_or_untitled(record));
    let _ = writeln!(out, "URL: {}", or_placeholder(Some(record.url.as_str())));
    let _ = writeln!(
        out,
        "Date: {} (displayed as: {})",
        or_placeholder(record.date.as_deref()),
        or_placeholder(record.original_date.as_deref())
    );
    let _ = writeln!(out, "Author: {}", or_placeholder(record.author.as_deref()));
    let _ = writeln!(out, "Tag: {}", or_placeholder(record.subcategory.as_deref()));
    let _ = writeln!(out, "Categories: {}", categories_line(record));
    let _ = writeln!(out, "Thumbnail: {}", or_placeholder(record.thumbnail.as_deref()));
    let _ = writeln!(out, "Scraped at: {}", record.scraped_at.to_rfc3339());
    let _ = writeln!(out, "Summary: {}", summary_or_default(record).unwrap_or("No summary"));

    if record.images.is_empty() {
        let _ = writeln!(out, "Images: {PLACEHOLDER}");
    } else {
        let _ = writeln!(out, "Images:");
        for (key, image) in record.images.iter() {
            let _ = writeln!(out, "  {key}: {}", image.url);
            let _ = writeln!(out, "    {}", image.caption);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", or_placeholder(record.content.as_deref()));
    out
}

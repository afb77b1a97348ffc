//! Article storage.
//!
//! The pipeline talks to storage through [`ArticleStore`]: upsert keyed by
//! URL, regex queries on a field, and distinct-value listings used by the
//! search façade. Two implementations are provided:
//!
//! - [`MemoryStore`]: insertion-ordered, in-process
//! - [`JsonFileStore`]: a `MemoryStore` persisted to a JSON file
//!
//! A store is constructed once and passed explicitly to whoever needs it;
//! a store that cannot be opened is a [`StoreError::Unavailable`] from its
//! constructor.

use crate::models::ArticleRecord;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable at {path}: {reason}")]
    Unavailable { path: PathBuf, reason: String },
    #[error("record has an empty url")]
    MissingKey,
    #[error("invalid query pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Queryable record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreField {
    Title,
    /// The legacy single-valued primary tag.
    Subcategory,
    Categories,
    Subcategories,
    Author,
}

impl StoreField {
    /// Values of this field in `record`; array fields yield every element.
    pub fn values(self, record: &ArticleRecord) -> Vec<&str> {
        match self {
            StoreField::Title => vec![record.title.as_str()],
            StoreField::Subcategory => record.subcategory.as_deref().into_iter().collect(),
            StoreField::Categories => record.primary_category.as_deref().into_iter().collect(),
            StoreField::Subcategories => record.subcategories.iter().map(String::as_str).collect(),
            StoreField::Author => record.author.as_deref().into_iter().collect(),
        }
    }
}

/// A record as kept by a store, with bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    #[serde(flatten)]
    pub record: ArticleRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage collaborator of the pipeline and the search façade.
pub trait ArticleStore {
    /// Insert or replace the record with the same URL.
    ///
    /// Returns `true` when the URL was new.
    fn upsert(&mut self, record: &ArticleRecord) -> Result<bool, StoreError>;

    /// Records with at least one value of `field` matching the regex `pattern`.
    fn query_by_field(
        &self,
        field: StoreField,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Vec<ArticleRecord>, StoreError>;

    /// Sorted, non-blank distinct values of `field`.
    fn distinct_values(&self, field: StoreField) -> Result<Vec<String>, StoreError>;

    /// Unwind an array field and group by value.
    ///
    /// Returns `(value, number of records holding it)`, sorted by value.
    fn aggregate_unwind_group(&self, field: StoreField) -> Result<Vec<(String, usize)>, StoreError>;

    fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError>;

    /// Every record, in insertion order.
    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;
}

/// In-memory store keyed by URL, preserving insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Vec<StoredArticle>,
    by_url: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_documents(docs: Vec<StoredArticle>) -> Self {
        let mut store = Self::new();
        for doc in docs {
            match store.by_url.get(&doc.record.url) {
                Some(&i) => store.docs[i] = doc,
                None => {
                    store.by_url.insert(doc.record.url.clone(), store.docs.len());
                    store.docs.push(doc);
                }
            }
        }
        store
    }

    pub fn documents(&self) -> &[StoredArticle] {
        &self.docs
    }
}

impl ArticleStore for MemoryStore {
    fn upsert(&mut self, record: &ArticleRecord) -> Result<bool, StoreError> {
        if record.url.trim().is_empty() {
            return Err(StoreError::MissingKey);
        }
        let now = Utc::now();
        match self.by_url.get(&record.url) {
            Some(&i) => {
                let doc = &mut self.docs[i];
                doc.record = record.clone();
                doc.updated_at = now;
                Ok(false)
            }
            None => {
                self.by_url.insert(record.url.clone(), self.docs.len());
                self.docs.push(StoredArticle {
                    record: record.clone(),
                    created_at: now,
                    updated_at: now,
                });
                Ok(true)
            }
        }
    }

    fn query_by_field(
        &self,
        field: StoreField,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(self
            .docs
            .iter()
            .filter(|doc| field.values(&doc.record).iter().any(|v| re.is_match(v)))
            .map(|doc| doc.record.clone())
            .collect())
    }

    fn distinct_values(&self, field: StoreField) -> Result<Vec<String>, StoreError> {
        let values: BTreeSet<&str> = self
            .docs
            .iter()
            .flat_map(|doc| field.values(&doc.record))
            .filter(|v| !v.trim().is_empty())
            .collect();
        Ok(values.into_iter().map(str::to_string).collect())
    }

    fn aggregate_unwind_group(&self, field: StoreField) -> Result<Vec<(String, usize)>, StoreError> {
        let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in &self.docs {
            for value in field.values(&doc.record) {
                *groups.entry(value).or_default() += 1;
            }
        }
        Ok(groups
            .into_iter()
            .map(|(value, count)| (value.to_string(), count))
            .collect())
    }

    fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.by_url.get(url).map(|&i| self.docs[i].record.clone()))
    }

    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        Ok(self.docs.iter().map(|doc| doc.record.clone()).collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.docs.len())
    }
}

/// A [`MemoryStore`] persisted as a JSON array at `path`.
///
/// Changes are kept in memory until [`JsonFileStore::flush`].
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open (or create) the store file.
    ///
    /// An unreadable or corrupt file, or a parent directory that cannot be
    /// created, makes the store [`StoreError::Unavailable`].
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |reason: String| StoreError::Unavailable {
            path: path.clone(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable(e.to_string()))?;
        }

        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let docs: Vec<StoredArticle> = if exists {
            let raw = fs::read_to_string(&path)
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| unavailable(e.to_string()))?
            }
        } else {
            Vec::new()
        };

        info!(documents = docs.len(), "Opened article store");
        Ok(Self {
            inner: MemoryStore::from_documents(docs),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store to disk (temp file, then rename).
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self.inner.documents())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(documents = self.inner.docs.len(), "Flushed article store");
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    fn upsert(&mut self, record: &ArticleRecord) -> Result<bool, StoreError> {
        self.inner.upsert(record)
    }

    fn query_by_field(
        &self,
        field: StoreField,
        pattern: &str,
        case_insensitive: bool,
    ) -> Result<Vec<ArticleRecord>, StoreError> {
        self.inner.query_by_field(field, pattern, case_insensitive)
    }

    fn distinct_values(&self, field: StoreField) -> Result<Vec<String>, StoreError> {
        self.inner.distinct_values(field)
    }

    fn aggregate_unwind_group(&self, field: StoreField) -> Result<Vec<(String, usize)>, StoreError> {
        self.inner.aggregate_unwind_group(field)
    }

    fn find_by_url(&self, url: &str) -> Result<Option<ArticleRecord>, StoreError> {
        self.inner.find_by_url(url)
    }

    fn all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        self.inner.all()
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.inner.count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ArticleDetail, ArticlePreview, CategorySet};
    use chrono::TimeZone;

    pub(crate) fn record(url: &str, title: &str) -> ArticleRecord {
        ArticleRecord::assemble(
            ArticlePreview {
                title: title.to_string(),
                url: url.to_string(),
                thumbnail_url: None,
                primary_tag: None,
                raw_date: None,
                normalized_date: None,
                summary: None,
            },
            ArticleDetail::default(),
            Utc.with_ymd_and_hms(2025, 7, 16, 12, 0, 0).unwrap(),
        )
    }

    pub(crate) fn categorized(
        url: &str,
        title: &str,
        category: &str,
        tag: Option<&str>,
        subcategories: &[&str],
        author: Option<&str>,
        date: Option<&str>,
    ) -> ArticleRecord {
        let mut r = record(url, title);
        r.primary_category = Some(category.to_string());
        r.subcategory = tag.map(str::to_string);
        r.subcategories = subcategories.iter().map(|s| s.to_string()).collect();
        r.author = author.map(str::to_string);
        r.date = date.map(str::to_string);
        r
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("article_harvest_{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_upsert_reports_new_then_update() {
        let mut store = MemoryStore::new();
        assert!(store.upsert(&record("https://x/1", "Un")).unwrap());
        assert!(store.upsert(&record("https://x/2", "Deux")).unwrap());
        assert!(!store.upsert(&record("https://x/1", "Un (modifié)")).unwrap());

        assert_eq!(store.count().unwrap(), 2);
        let titles: Vec<String> = store.all().unwrap().into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Un (modifié)", "Deux"]);

        let doc = &store.documents()[0];
        assert!(doc.updated_at >= doc.created_at);
    }

    #[test]
    fn test_upsert_rejects_empty_url() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.upsert(&record("  ", "Sans URL")),
            Err(StoreError::MissingKey)
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_query_by_field() {
        let mut store = MemoryStore::new();
        store
            .upsert(&categorized("https://x/1", "ChatGPT arrive", "Web", None, &["IA"], Some("Alice"), None))
            .unwrap();
        store
            .upsert(&categorized("https://x/2", "Le SEO en 2025", "Marketing", None, &["SEO", "ia"], None, None))
            .unwrap();

        let hits = store.query_by_field(StoreField::Subcategories, "^ia$", true).unwrap();
        assert_eq!(hits.len(), 2);
        let hits = store.query_by_field(StoreField::Subcategories, "^ia$", false).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://x/2");

        let hits = store.query_by_field(StoreField::Title, "seo", true).unwrap();
        assert_eq!(hits.len(), 1);
        let hits = store.query_by_field(StoreField::Author, "^alice$", true).unwrap();
        assert_eq!(hits[0].url, "https://x/1");

        assert!(matches!(
            store.query_by_field(StoreField::Title, "(", false),
            Err(StoreError::Pattern(_))
        ));
    }

    #[test]
    fn test_distinct_and_unwind() {
        let mut store = MemoryStore::new();
        store
            .upsert(&categorized("https://x/1", "A", "Web", Some("Tech"), &["SEO", "IA"], Some("Alice"), None))
            .unwrap();
        store
            .upsert(&categorized("https://x/2", "B", "Social", None, &["IA", " "], Some("Bob"), None))
            .unwrap();

        assert_eq!(store.distinct_values(StoreField::Categories).unwrap(), vec!["Social", "Web"]);
        assert_eq!(store.distinct_values(StoreField::Subcategories).unwrap(), vec!["IA", "SEO"]);
        assert_eq!(store.distinct_values(StoreField::Subcategory).unwrap(), vec!["Tech"]);
        assert_eq!(
            store.aggregate_unwind_group(StoreField::Subcategories).unwrap(),
            vec![(" ".to_string(), 1), ("IA".to_string(), 2), ("SEO".to_string(), 1)]
        );
        assert_eq!(
            store.aggregate_unwind_group(StoreField::Categories).unwrap(),
            vec![("Social".to_string(), 1), ("Web".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let path = temp_path("round_trip/articles.json");
        let _ = fs::remove_file(&path).await;

        let mut store = JsonFileStore::open(&path).await.unwrap();
        store
            .upsert(&categorized("https://x/1", "Été", "Web", None, &["IA"], None, Some("2025-07-16")))
            .unwrap();
        store.flush().await.unwrap();
        assert!(!fs::try_exists(path.with_extension("json.tmp")).await.unwrap());

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        let record = reopened.find_by_url("https://x/1").unwrap().unwrap();
        assert_eq!(record.title, "Été");
        assert_eq!(record.primary_category.as_deref(), Some("Web"));
        assert_eq!(record.subcategories, vec!["IA"]);
        assert!(reopened.find_by_url("https://x/2").unwrap().is_none());

        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_corrupt_json_store_is_unavailable() {
        let path = temp_path("corrupt/articles.json");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "{ not json").await.unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Unavailable { .. })
        ));
        let _ = fs::remove_file(&path).await;
    }
}

//! Data models for scraped articles and their normalized representation.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticlePreview`]: Stub parsed from one listing-page item
//! - [`ArticleDetail`]: Author, body, images and categories from a detail page
//! - [`ArticleRecord`]: The canonical, merged record handed to storage and output
//! - Supporting types: [`CaptionedImage`], [`ImageSet`], [`CategorySet`]
//!
//! Field names of [`ArticleRecord`] follow the document shape consumed by the
//! search façade and the JSON export (`date`, `original_date`, `subcategory`,
//! `categories`, `thumbnail`, `content`, `scraped_at`, ...).

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A lightweight article stub parsed from a listing page.
///
/// `title` and `url` are required: the preview extractor never builds an
/// `ArticlePreview` without both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePreview {
    /// Headline text.
    pub title: String,
    /// Absolute article URL; the identity key of the final record.
    pub url: String,
    /// Thumbnail image URL (secure scheme only).
    pub thumbnail_url: Option<String>,
    /// Primary tag label shown on the listing card.
    pub primary_tag: Option<String>,
    /// The date as displayed on the page.
    pub raw_date: Option<String>,
    /// `YYYY-MM-DD`, or the raw text when it could not be parsed.
    pub normalized_date: Option<String>,
    /// Excerpt text.
    pub summary: Option<String>,
}

/// An image discovered in an article body, with a non-empty caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionedImage {
    pub url: String,
    pub caption: String,
}

/// Images of one article, in discovery order.
///
/// Serialized as a JSON object keyed `image_1`, `image_2`, ... in discovery
/// order. Keys are derived from the position, so they stay contiguous and are
/// never reused. URLs are unique within a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    images: Vec<CaptionedImage>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image unless its URL is already present.
    ///
    /// Returns the key allocated to the image, or `None` for a duplicate URL.
    pub fn push(&mut self, url: String, caption: String) -> Option<String> {
        if self.contains_url(&url) {
            return None;
        }
        self.images.push(CaptionedImage { url, caption });
        Some(Self::key_for(self.images.len()))
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.images.iter().any(|img| img.url == url)
    }

    /// Number the next accepted image would get.
    pub fn next_index(&self) -> usize {
        self.images.len() + 1
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&CaptionedImage> {
        let index: usize = key.strip_prefix("image_")?.parse().ok()?;
        index.checked_sub(1).and_then(|i| self.images.get(i))
    }

    /// Iterate `(key, image)` pairs in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &CaptionedImage)> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, img)| (Self::key_for(i + 1), img))
    }

    fn key_for(index: usize) -> String {
        format!("image_{index}")
    }
}

impl Serialize for ImageSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.images.len()))?;
        for (key, img) in self.iter() {
            map.serialize_entry(&key, img)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ImageSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Keys sort lexically in a BTreeMap ("image_10" < "image_2"), so order
        // by the numeric suffix before rebuilding.
        let raw = BTreeMap::<String, CaptionedImage>::deserialize(deserializer)?;
        let mut entries: Vec<(usize, CaptionedImage)> = raw
            .into_iter()
            .map(|(key, img)| {
                let n = key
                    .strip_prefix("image_")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(usize::MAX);
                (n, img)
            })
            .collect();
        entries.sort_by_key(|(n, _)| *n);

        let mut set = ImageSet::new();
        for (_, img) in entries {
            set.push(img.url, img.caption);
        }
        Ok(set)
    }
}

/// One primary category and an ordered list of distinct subcategories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet {
    pub primary: Option<String>,
    pub subcategories: Vec<String>,
}

/// Everything a detail page contributes to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetail {
    pub author: Option<String>,
    /// Heading and paragraph text joined by blank lines; empty when absent.
    pub body_text: String,
    pub images: ImageSet,
    pub categories: CategorySet,
}

/// The canonical article record.
///
/// Uniquely identified by `url`. Built once by [`ArticleRecord::assemble`] and
/// not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    /// Normalized date (`YYYY-MM-DD` or the raw text).
    pub date: Option<String>,
    /// Date text exactly as displayed on the listing page.
    pub original_date: Option<String>,
    /// Primary tag from the listing card (legacy single value).
    pub subcategory: Option<String>,
    /// The primary category, serialized as a zero-or-one element array.
    #[serde(rename = "categories", with = "primary_as_list", default)]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub images: ImageSet,
    pub content: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Merge a preview with detail data captured at `scraped_at`.
    ///
    /// Preview fields supply title, url, thumbnail, tag, dates and summary;
    /// the detail supplies author, body, images and categories. An empty body
    /// becomes an absent `content`.
    pub fn assemble(
        preview: ArticlePreview,
        detail: ArticleDetail,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let ArticleDetail {
            author,
            body_text,
            images,
            categories,
        } = detail;

        Self {
            title: preview.title,
            url: preview.url,
            date: preview.normalized_date,
            original_date: preview.raw_date,
            subcategory: preview.primary_tag,
            primary_category: categories.primary,
            subcategories: categories.subcategories,
            author,
            summary: preview.summary,
            thumbnail: preview.thumbnail_url,
            images,
            content: (!body_text.is_empty()).then_some(body_text),
            scraped_at,
        }
    }
}

mod primary_as_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        value.iter().collect::<Vec<_>>().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let list = Vec::<String>::deserialize(d)?;
        Ok(list.into_iter().next())
    }
}

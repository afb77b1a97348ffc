//! Run summary.
//!
//! Distinct categories, subcategories and authors over the records of one
//! run, logged once the scrape is over.

use crate::models::ArticleRecord;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub articles: usize,
    pub categories: BTreeSet<String>,
    pub subcategories: BTreeSet<String>,
    pub authors: BTreeSet<String>,
    pub images: usize,
}

impl RunSummary {
    pub fn from_records(records: &[ArticleRecord]) -> Self {
        let mut summary = RunSummary {
            articles: records.len(),
            ..Default::default()
        };
        for record in records {
            summary.categories.extend(record.primary_category.iter().cloned());
            summary.subcategories.extend(record.subcategories.iter().cloned());
            summary.authors.extend(record.author.iter().cloned());
            summary.images += record.images.len();
        }
        summary
    }

    /// Emit the summary and a preview of the first few records.
    pub fn log(&self, records: &[ArticleRecord]) {
        info!(
            articles = self.articles,
            categories = self.categories.len(),
            subcategories = self.subcategories.len(),
            authors = self.authors.len(),
            images = self.images,
            "Run summary"
        );
        if !self.categories.is_empty() {
            info!(categories = ?self.categories.iter().take(5).collect::<Vec<_>>(), "Categories seen");
        }
        for record in records.iter().take(3) {
            info!(
                title = %record.title,
                tag = record.subcategory.as_deref().unwrap_or("N/A"),
                author = record.author.as_deref().unwrap_or("N/A"),
                date = record.date.as_deref().unwrap_or("N/A"),
                images = record.images.len(),
                "Collected"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::categorized;

    #[test]
    fn test_from_records() {
        let mut with_image = categorized("https://x/1", "A", "Web", None, &["IA", "SEO"], Some("Alice"), None);
        with_image.images.push("https://cdn/1.jpg".into(), "Image 1".into());
        let records = vec![
            with_image,
            categorized("https://x/2", "B", "Web", None, &["IA"], Some("Bob"), None),
            categorized("https://x/3", "C", "Tech", None, &[], None, None),
        ];

        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.articles, 3);
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.subcategories.len(), 2);
        assert_eq!(summary.authors.len(), 2);
        assert_eq!(summary.images, 1);
    }
}

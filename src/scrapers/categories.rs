//! Category and subcategory extraction.
//!
//! The primary category is the `data-cat` attribute of the `span.cat` marker
//! inside `.cats-list`. Subcategories are the link texts of the `<li>` items of
//! every `.tags-list` on the page, deduplicated by exact text with the first
//! occurrence kept in place.

use crate::models::CategorySet;
use crate::utils::{non_blank_attr, non_blank_text, selector};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::debug;

static PRIMARY_MARKER: Lazy<Selector> = Lazy::new(|| selector(".cats-list span.cat[data-cat]"));
static TAG_LISTS: Lazy<Selector> = Lazy::new(|| selector(".tags-list"));
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| selector("li"));
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));

fn primary_category(scope: ElementRef<'_>) -> Option<String> {
    scope
        .select(&PRIMARY_MARKER)
        .next()
        .and_then(|marker| non_blank_attr(marker, "data-cat"))
}

fn subcategories(scope: ElementRef<'_>) -> Vec<String> {
    scope
        .select(&TAG_LISTS)
        .flat_map(|list| list.select(&LIST_ITEM))
        .filter_map(|li| li.select(&LINK).next())
        .filter_map(non_blank_text)
        .unique()
        .collect()
}

/// Extract the primary category and ordered, distinct subcategories.
pub fn extract_categories(scope: ElementRef<'_>) -> CategorySet {
    let set = CategorySet {
        primary: primary_category(scope),
        subcategories: subcategories(scope),
    };
    debug!(
        primary = ?set.primary,
        subcategories = set.subcategories.len(),
        "Extracted categories"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_primary_and_subcategories() {
        let html = Html::parse_document(
            r#"<div class="cats-list">
                 <span class="cat" data-cat=" Social ">Social</span>
                 <span class="cat" data-cat="Web">Web</span>
               </div>
               <ul class="tags-list">
                 <li><a href="/tag/ia">IA</a></li>
                 <li><a href="/tag/seo">SEO</a></li>
                 <li><a href="/tag/ia">IA</a></li>
                 <li>sans lien</li>
               </ul>
               <div class="tags-list"><ul>
                 <li><a href="/tag/seo">SEO</a></li>
                 <li><a href="/tag/ia-2">ia</a></li>
                 <li><a href="/tag/vide"> </a></li>
               </ul></div>"#,
        );
        let set = extract_categories(html.root_element());
        assert_eq!(set.primary.as_deref(), Some("Social"));
        assert_eq!(set.subcategories, vec!["IA", "SEO", "ia"]);
    }

    #[test]
    fn test_marker_without_data_attribute_is_ignored() {
        let html = Html::parse_document(
            r#"<div class="cats-list"><span class="cat">Web</span></div>
               <span class="cat" data-cat="Outside">Outside</span>"#,
        );
        let set = extract_categories(html.root_element());
        assert!(set.primary.is_none());
        assert!(set.subcategories.is_empty());
    }

    #[test]
    fn test_blank_primary_is_absent() {
        let html = Html::parse_document(
            r#"<div class="cats-list"><span class="cat" data-cat="   "></span></div>"#,
        );
        assert!(extract_categories(html.root_element()).primary.is_none());
    }
}

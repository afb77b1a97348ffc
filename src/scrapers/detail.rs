//! Article detail page parsing.
//!
//! Given the HTML of an article page, [`extract_detail`] locates the
//! `<article>` container and reads the author, body text, captioned images and
//! categories. A page without an `<article>` yields an empty
//! [`ArticleDetail`].

use crate::models::ArticleDetail;
use crate::scrapers::author::resolve_author;
use crate::scrapers::categories::extract_categories;
use crate::scrapers::images::extract_images;
use crate::utils::{element_text, first_match, selector, selectors};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

/// Content containers inside the article, in order of preference.
const CONTENT_SELECTORS: &[&str] = &["div.entry-content", "div.content", "main"];

/// Text blocks shorter than this (in characters, after trimming) are noise.
pub const MIN_BLOCK_CHARS: usize = 20;

static ARTICLE: Lazy<Selector> = Lazy::new(|| selector("article"));
static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| selectors(CONTENT_SELECTORS));
static TEXT_BLOCKS: Lazy<Selector> = Lazy::new(|| selector("p, h1, h2, h3, h4, h5, h6"));

/// Extract author, body, images and categories from a detail page.
pub fn extract_detail(document: &Html) -> ArticleDetail {
    let Some(article) = document.select(&ARTICLE).next() else {
        debug!("No <article> on detail page");
        return ArticleDetail::default();
    };

    let author = resolve_author(article, document);
    // Categories may sit outside the article container.
    let categories = extract_categories(document.root_element());

    let (body_text, images) = match first_match(article, &CONTENT) {
        Some(content) => {
            let body = content
                .select(&TEXT_BLOCKS)
                .map(element_text)
                .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
                .collect::<Vec<_>>()
                .join("\n\n");
            (body, extract_images(content))
        }
        None => {
            debug!("No content container inside <article>");
            (String::new(), Default::default())
        }
    };

    debug!(
        author = ?author,
        body_chars = body_text.chars().count(),
        images = images.len(),
        "Extracted article detail"
    );

    ArticleDetail {
        author,
        body_text,
        images,
        categories,
    }
}

/// Parse raw HTML and run [`extract_detail`] on it.
pub fn extract_detail_from_html(html: &str) -> ArticleDetail {
    extract_detail(&Html::parse_document(html))
}

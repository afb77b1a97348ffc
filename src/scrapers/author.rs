//! Author resolution.
//!
//! Bylines are marked up in several ways across the site's templates. The
//! selectors in [`AUTHOR_SELECTORS`] are tried in order against the article
//! container; the page's `<meta name="author">` is the last resort.

use crate::utils::{non_blank_attr, non_blank_text, selector, selectors};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Byline selectors, most specific first.
pub const AUTHOR_SELECTORS: &[&str] = &[
    "span.author",
    "a.author",
    "p.author",
    ".author-name",
    ".byline",
    ".entry-meta .author",
    r#"span[rel="author"]"#,
    ".post-author",
    ".article-author",
    r#".entry-meta a[href*="/author/"]"#,
];

/// Shortest accepted author name, in characters.
const MIN_AUTHOR_CHARS: usize = 3;

static STRATEGIES: Lazy<Vec<Selector>> = Lazy::new(|| selectors(AUTHOR_SELECTORS));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="author"]"#));
static BYLINE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^par\s+").unwrap());

fn clean_byline(text: &str) -> Option<String> {
    let name = BYLINE_PREFIX.replace(text.trim(), "").trim().to_string();
    (name.chars().count() >= MIN_AUTHOR_CHARS).then_some(name)
}

/// Author from the byline markup of `article`, without the metadata fallback.
///
/// For every selector, only its first match is considered; a match whose
/// text is too short after cleanup moves on to the next selector.
pub fn author_from_byline(article: ElementRef<'_>) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| {
        article
            .select(strategy)
            .next()
            .and_then(non_blank_text)
            .and_then(|text| clean_byline(&text))
    })
}

/// Author from `<meta name="author" content="...">`.
pub fn author_from_meta(document: &Html) -> Option<String> {
    document
        .select(&META_AUTHOR)
        .next()
        .and_then(|meta| non_blank_attr(meta, "content"))
}

/// Resolve the author of `article`, falling back to page metadata.
pub fn resolve_author(article: ElementRef<'_>, document: &Html) -> Option<String> {
    author_from_byline(article).or_else(|| author_from_meta(document))
}

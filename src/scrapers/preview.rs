//! Listing page parsing.
//!
//! A listing page holds one `<article>` card per story inside `<main>`. Each
//! card is reduced to an [`ArticlePreview`]; cards without a title or a link
//! are dropped here, before any detail page is requested.

use crate::models::ArticlePreview;
use crate::scrapers::dates::{normalize_optional, parse_datetime_attr};
use crate::scrapers::images::resolve_image_url;
use crate::utils::{first_match, non_blank_attr, non_blank_text, selector, selectors};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

const THUMBNAIL_SELECTORS: &[&str] = &[".post-thumbnail img", ".entry-thumbnail img"];
const TAG_SELECTORS: &[&str] = &[".entry-meta span.favtag.color-b", ".entry-meta span.favtag"];
const HEADER_SELECTORS: &[&str] = &[".entry-meta header.entry-header", "header"];
const TITLE_SELECTORS: &[&str] = &["h3", "h2", "h1"];
const SUMMARY_SELECTORS: &[&str] = &[".entry-meta div.entry-excerpt", "div.entry-excerpt"];

/// Where a card's date may live.
struct DateSource {
    selector: &'static str,
    /// Attribute holding a machine-readable date, preferred over the text.
    machine_attr: Option<&'static str>,
}

const DATE_SOURCES: &[DateSource] = &[
    DateSource {
        selector: "time.entry-date",
        machine_attr: Some("datetime"),
    },
    DateSource {
        selector: ".entry-meta span.posted-on",
        machine_attr: None,
    },
];

static THUMBNAIL: Lazy<Vec<Selector>> = Lazy::new(|| selectors(THUMBNAIL_SELECTORS));
static TAG: Lazy<Vec<Selector>> = Lazy::new(|| selectors(TAG_SELECTORS));
static HEADER: Lazy<Vec<Selector>> = Lazy::new(|| selectors(HEADER_SELECTORS));
static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(TITLE_SELECTORS));
static SUMMARY: Lazy<Vec<Selector>> = Lazy::new(|| selectors(SUMMARY_SELECTORS));
static DATE: Lazy<Vec<(Selector, Option<&'static str>)>> = Lazy::new(|| {
    DATE_SOURCES
        .iter()
        .map(|source| (selector(source.selector), source.machine_attr))
        .collect()
});
static LINK: Lazy<Selector> = Lazy::new(|| selector("a"));
static LISTING_ITEMS: Lazy<Selector> = Lazy::new(|| selector("main article"));
static MAIN: Lazy<Selector> = Lazy::new(|| selector("main"));

/// Raw and normalized date of a card.
fn extract_date(item: ElementRef<'_>) -> (Option<String>, Option<String>) {
    let Some((element, machine_attr)) = DATE
        .iter()
        .find_map(|(sel, attr)| item.select(sel).next().map(|el| (el, *attr)))
    else {
        return (None, None);
    };

    let raw = non_blank_text(element);
    let normalized = machine_attr
        .and_then(|attr| element.value().attr(attr))
        .and_then(parse_datetime_attr)
        .or_else(|| normalize_optional(raw.as_deref()));
    // A bare machine date stands in for the missing visible text.
    let raw = raw.or_else(|| normalized.clone());
    (raw, normalized)
}

/// Title and absolute URL from the card's header link.
fn extract_title_and_url(item: ElementRef<'_>, base: Option<&Url>) -> (Option<String>, Option<String>) {
    let Some(link) = first_match(item, &HEADER).and_then(|header| header.select(&LINK).next()) else {
        return (None, None);
    };

    let url = non_blank_attr(link, "href").map(|href| match base {
        Some(base) => base.join(&href).map(String::from).unwrap_or(href),
        None => href,
    });
    let title = first_match(link, &TITLE).and_then(non_blank_text);
    (title, url)
}

/// Parse one listing card.
///
/// # Arguments
///
/// * `item` - The card's `<article>` element
/// * `base` - The listing page URL, used to resolve relative links
///
/// # Returns
///
/// `None` when the title or URL is missing; every other field degrades to
/// `None` on its own.
pub fn extract_preview(item: ElementRef<'_>, base: Option<&Url>) -> Option<ArticlePreview> {
    let (title, url) = extract_title_and_url(item, base);
    let (Some(title), Some(url)) = (title, url) else {
        debug!("Listing item without title or link");
        return None;
    };

    let (raw_date, normalized_date) = extract_date(item);

    Some(ArticlePreview {
        title,
        url,
        thumbnail_url: first_match(item, &THUMBNAIL).and_then(resolve_image_url),
        primary_tag: first_match(item, &TAG).and_then(non_blank_text),
        raw_date,
        normalized_date,
        summary: first_match(item, &SUMMARY).and_then(non_blank_text),
    })
}

/// All previews of a listing page, in page order.
#[derive(Debug, Default)]
pub struct Listing {
    pub previews: Vec<ArticlePreview>,
    /// Cards found, valid or not.
    pub items_found: usize,
    /// Whether the page had a `<main>` region at all.
    pub has_main: bool,
}

impl Listing {
    pub fn skipped(&self) -> usize {
        self.items_found - self.previews.len()
    }
}

/// Parse every card of a listing page.
pub fn extract_listing(document: &Html, base: Option<&Url>) -> Listing {
    let has_main = document.select(&MAIN).next().is_some();
    let mut listing = Listing {
        has_main,
        ..Default::default()
    };
    for item in document.select(&LISTING_ITEMS) {
        listing.items_found += 1;
        if let Some(preview) = extract_preview(item, base) {
            listing.previews.push(preview);
        }
    }
    listing
}

//! Image URL resolution and captioned image discovery.
//!
//! The site lazy-loads most images: the real URL sits in `data-lazy-src` or
//! `data-src` while `src` holds a placeholder. [`resolve_image_url`] probes
//! those attributes in that order and only accepts `https://` URLs.
//!
//! [`extract_images`] walks a content block in three tiers:
//!
//! 1. `<figure>` elements, captioned by their `<figcaption>`
//! 2. containers whose class mentions `caption` (e.g. `wp-caption`)
//! 3. every remaining `<img>` in the block
//!
//! A URL already captured by an earlier tier is skipped, and keys are numbered
//! across all tiers in the order images are accepted.

use crate::models::ImageSet;
use crate::utils::{collapse_whitespace, first_img, non_blank_attr, non_blank_text, selector};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use tracing::debug;

/// Attributes that may carry an image URL, highest priority first.
pub const IMAGE_URL_ATTRIBUTES: [&str; 3] = ["data-lazy-src", "data-src", "src"];

const SECURE_SCHEME: &str = "https://";

static FIGURE: Lazy<Selector> = Lazy::new(|| selector("figure"));
static FIGCAPTION: Lazy<Selector> = Lazy::new(|| selector("figcaption"));
static DIV: Lazy<Selector> = Lazy::new(|| selector("div"));
static ANY: Lazy<Selector> = Lazy::new(|| selector("*"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));

static CAPTION_CONTAINER_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(caption|wp-caption)").unwrap());
static CAPTION_TEXT_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(caption-text|wp-caption-text)").unwrap());

/// Pick the best URL of an `<img>` element.
///
/// Returns the first present attribute of [`IMAGE_URL_ATTRIBUTES`] whose value
/// starts with `https://`, or `None`.
pub fn resolve_image_url(img: ElementRef<'_>) -> Option<String> {
    IMAGE_URL_ATTRIBUTES.iter().find_map(|attr| {
        img.value()
            .attr(attr)
            .map(str::trim)
            .filter(|url| url.starts_with(SECURE_SCHEME))
            .map(str::to_string)
    })
}

fn has_class_matching(element: ElementRef<'_>, pattern: &Regex) -> bool {
    element.value().classes().any(|class| pattern.is_match(class))
}

/// Caption from the image's own attributes: alt, then title, then "Image N".
fn fallback_caption(img: ElementRef<'_>, set: &ImageSet) -> String {
    non_blank_attr(img, "alt")
        .or_else(|| non_blank_attr(img, "title"))
        .unwrap_or_else(|| format!("Image {}", set.next_index()))
}

/// Tier 1: images inside `<figure>`, captioned by `<figcaption>`.
fn collect_figures(block: ElementRef<'_>, set: &mut ImageSet) {
    for figure in block.select(&FIGURE) {
        let Some(img) = first_img(figure) else { continue };
        let Some(url) = resolve_image_url(img) else { continue };
        if set.contains_url(&url) {
            continue;
        }
        let caption = figure
            .select(&FIGCAPTION)
            .next()
            .and_then(non_blank_text)
            .unwrap_or_else(|| fallback_caption(img, set));
        set.push(url, caption);
    }
}

/// Tier 2: `<div>` containers whose class mentions a caption.
fn collect_caption_containers(block: ElementRef<'_>, set: &mut ImageSet) {
    let containers = block
        .select(&DIV)
        .filter(|div| has_class_matching(*div, &CAPTION_CONTAINER_CLASS));

    for container in containers {
        let Some(img) = first_img(container) else { continue };
        let Some(url) = resolve_image_url(img) else { continue };
        if set.contains_url(&url) {
            continue;
        }
        let caption = container
            .select(&ANY)
            .find(|el| has_class_matching(*el, &CAPTION_TEXT_CLASS))
            .and_then(non_blank_text)
            .or_else(|| {
                let own = collapse_whitespace(&container.text().collect::<String>());
                (!own.is_empty()).then_some(own)
            })
            .unwrap_or_else(|| fallback_caption(img, set));
        set.push(url, caption);
    }
}

/// Tier 3: every other `<img>` in the block.
fn collect_bare_images(block: ElementRef<'_>, set: &mut ImageSet) {
    for img in block.select(&IMG) {
        let Some(url) = resolve_image_url(img) else { continue };
        if set.contains_url(&url) {
            continue;
        }
        let caption = fallback_caption(img, set);
        set.push(url, caption);
    }
}

/// Discover captioned images inside a content block.
pub fn extract_images(block: ElementRef<'_>) -> ImageSet {
    let mut set = ImageSet::new();
    collect_figures(block, &mut set);
    let after_figures = set.len();
    collect_caption_containers(block, &mut set);
    let after_containers = set.len();
    collect_bare_images(block, &mut set);

    debug!(
        figures = after_figures,
        captioned = after_containers - after_figures,
        bare = set.len() - after_containers,
        "Extracted images"
    );
    set
}

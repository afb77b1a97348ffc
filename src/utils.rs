//! Utility functions for text cleanup, selector probing, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Whitespace collapsing and element text extraction for HTML nodes
//! - Ordered selector probing ("try A, else B, else C")
//! - String truncation for logging
//! - File system validation for output locations

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Parse a list of CSS selectors that are known at compile time.
///
/// Used to build the ordered strategy lists of the extractors; the selector
/// strings are constants, so a parse failure is a programming error.
pub fn selectors(sources: &[&str]) -> Vec<Selector> {
    sources
        .iter()
        .map(|s| Selector::parse(s).unwrap_or_else(|e| panic!("invalid selector {s:?}: {e}")))
        .collect()
}

/// Parse a single constant selector. See [`selectors`].
pub fn selector(source: &str) -> Selector {
    Selector::parse(source).unwrap_or_else(|e| panic!("invalid selector {source:?}: {e}"))
}

/// Return the first element matched by the first selector that matches anything.
///
/// Selectors are tried in order; this is how every "primary container, else
/// fallback" lookup in the extractors is expressed.
pub fn first_match<'a>(scope: ElementRef<'a>, strategies: &[Selector]) -> Option<ElementRef<'a>> {
    strategies
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

/// Collapse every run of whitespace to a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  a \n\t b "), "a b");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Visible text of an element, or `None` when it is blank.
pub fn non_blank_text(element: ElementRef<'_>) -> Option<String> {
    let text = element_text(element);
    (!text.is_empty()).then_some(text)
}

/// A trimmed attribute value, or `None` when missing or blank.
pub fn non_blank_attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("img"));

/// First `<img>` nested anywhere inside `element`.
pub fn first_img(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.select(&IMG_SELECTOR).next()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended. Truncation respects character boundaries.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure the parent directory of `path` exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_parent(path: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&dir).await?;

    // A small sync write using std fs has the simpler error surface.
    let probe_path = dir.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

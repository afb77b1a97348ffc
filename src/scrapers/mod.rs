//! HTML extractors for listing and article pages.
//!
//! Every extractor is a pure function over parsed HTML: none of them touch the
//! network, and none of them fail. A missing element degrades only the field
//! it would have filled.
//!
//! # Extractors
//!
//! | Concern | Module | Entry point |
//! |---------|--------|-------------|
//! | Listing cards | [`preview`] | `extract_listing`, `extract_preview` |
//! | Article pages | [`detail`] | `extract_detail` |
//! | Bylines | [`author`] | `resolve_author` |
//! | Category markers | [`categories`] | `extract_categories` |
//! | Images and captions | [`images`] | `extract_images`, `resolve_image_url` |
//! | French dates | [`dates`] | `normalize_date` |
//!
//! # Common Patterns
//!
//! Fallback chains ("primary container, else generic container, else main")
//! are kept as ordered selector lists and evaluated with
//! [`crate::utils::first_match`], so adding a strategy means adding a line
//! to a list.

pub mod author;
pub mod categories;
pub mod dates;
pub mod detail;
pub mod images;
pub mod preview;

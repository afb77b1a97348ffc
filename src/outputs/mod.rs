//! Output generation for collected articles.
//!
//! # Submodules
//!
//! - [`json`]: Writes the collected records to a JSON file
//! - [`summary`]: Aggregate counts of a run, for the final log lines
//!
//! # Output Structure
//!
//! ```text
//! articles.json   # [ { "title": ..., "url": ..., "images": { "image_1": ... } }, ... ]
//! ```

pub mod json;
pub mod summary;

//! JSON export of collected articles.
//!
//! Records are written as a pretty-printed JSON array in collection order.
//! Non-ASCII text (accents, typographic quotes) is written as-is.

use crate::models::ArticleRecord;
use crate::utils::ensure_writable_parent;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `records` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written, or if
/// serialization fails.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_articles(records: &[ArticleRecord], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Err(e) = ensure_writable_parent(path).await {
        error!(error = %e, "Output directory is not writable");
        return Err(e);
    }

    fs::write(path, json).await?;
    info!("Wrote JSON export");
    Ok(())
}

//! Command-line interface definitions for Article Harvest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags override the values of the optional YAML configuration file.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Article Harvest application.
///
/// # Examples
///
/// ```sh
/// # Collect 30 articles from the default sections into the store
/// article_harvest scrape
///
/// # Two custom sources, 10 articles, JSON export, no store
/// article_harvest scrape --url https://www.blogdumoderateur.com/tech/ \
///     --url https://www.blogdumoderateur.com/web/page/2/ \
///     --count 10 --output articles.json --no-store
///
/// # Query the store
/// article_harvest search --category Web --from 2025-07-01
///
/// # Read one article with its images and body text
/// article_harvest show --url https://www.blogdumoderateur.com/web/nouvel-outil/
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON file backing the article store
    #[arg(long, global = true, env = "ARTICLE_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect articles from the listing pages
    Scrape(ScrapeArgs),
    /// Search stored articles
    Search(SearchArgs),
    /// Show one stored article in full
    Show {
        /// URL of the article
        #[arg(short, long)]
        url: String,
    },
    /// Show store statistics
    Stats,
    /// List categories, or the subcategories of one category
    Categories {
        /// Show subcategories used by this category
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Args, Debug, Default)]
pub struct ScrapeArgs {
    /// Maximum number of articles across all sources
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Listing page to visit (repeatable, visited in order)
    #[arg(short, long = "url")]
    pub urls: Vec<String>,

    /// Pause between requests, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Also export the collected articles to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not save the articles to the store
    #[arg(long)]
    pub no_store: bool,
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub subcategory: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    /// Words contained in the title
    #[arg(long)]
    pub title: Option<String>,
    /// Earliest date, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<String>,
    /// Latest date, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<String>,
}

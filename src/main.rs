//! # Article Harvest
//!
//! Collects article previews and article pages from the listing pages of a
//! news blog, assembles one structured record per article, and saves them to
//! a JSON-backed store that can then be searched from the command line.
//!
//! ## Usage
//!
//! ```sh
//! article_harvest scrape --count 30 --output ./out/articles.json
//! article_harvest search --category Web --author "Alice Martin"
//! article_harvest show --url https://www.blogdumoderateur.com/web/nouvel-outil/
//! article_harvest stats
//! article_harvest categories --category Tech
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: Read every card of each source page, in order
//! 2. **Detail**: Fetch each new article page and extract author, body, images and categories
//! 3. **Assembly**: Merge preview and detail into one record, stopping at the target count
//! 4. **Output**: Upsert the records into the store and optionally export them as JSON

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod search;
mod store;
mod utils;

use cli::{Cli, Command, ScrapeArgs, SearchArgs};
use config::Config;
use fetch::HttpFetcher;
use outputs::{json, summary::RunSummary};
use pipeline::{persist_records, Aggregator};
use search::{render_detail, render_record, SearchFilter};
use store::{ArticleStore, JsonFileStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(store) = args.store {
        config.store_path = store;
    }

    match args.command {
        Command::Scrape(scrape_args) => scrape(config, scrape_args).await,
        Command::Search(search_args) => run_search(&config, search_args).await,
        Command::Show { url } => run_show(&config, &url).await,
        Command::Stats => run_stats(&config).await,
        Command::Categories { category } => run_categories(&config, category.as_deref()).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn scrape(mut config: Config, args: ScrapeArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();

    if let Some(count) = args.count {
        config.target_count = count;
    }
    if !args.urls.is_empty() {
        config.sources = args.urls;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.request_delay_ms = delay_ms;
    }

    // A store that cannot be opened fails the run before any request.
    let mut store = if args.no_store {
        None
    } else {
        Some(JsonFileStore::open(&config.store_path).await?)
    };

    let fetcher = HttpFetcher::new(&config.fetch())?;
    info!(
        sources = config.sources.len(),
        target = config.target_count,
        delay_ms = config.request_delay_ms,
        "Starting scrape"
    );
    let report = Aggregator::new(&fetcher, config.aggregation())
        .run(&config.sources)
        .await;

    if report.records.is_empty() {
        warn!("No articles collected");
    }

    if let Some(output) = &args.output {
        if let Err(e) = json::write_articles(&report.records, output).await {
            error!(path = %output.display(), error = %e, "Failed to write JSON export");
        }
    }

    let persisted = match store.as_mut() {
        Some(store) => {
            let saved = persist_records(store, &report.records);
            if let Err(e) = store.flush().await {
                error!(path = %store.path().display(), error = %e, "Failed to flush article store");
            }
            saved.persisted()
        }
        None => 0,
    };

    RunSummary::from_records(&report.records).log(&report.records);
    info!(
        requested = report.requested,
        retrieved = report.retrieved(),
        persisted,
        elapsed_secs = start_time.elapsed().as_secs_f64(),
        "Scrape complete"
    );
    Ok(())
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::open(&config.store_path).await?;
    let filter = SearchFilter {
        category: args.category,
        subcategory: args.subcategory,
        author: args.author,
        title: args.title,
        date_from: args.from,
        date_to: args.to,
    };

    let records = search::search(&store, &filter)?;
    info!(count = records.len(), "Search complete");
    if records.is_empty() {
        println!("No matching articles.");
    }
    for (i, record) in records.iter().enumerate() {
        println!("{}", render_record(i + 1, record));
    }
    Ok(())
}

async fn run_show(config: &Config, url: &str) -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::open(&config.store_path).await?;
    match store.find_by_url(url.trim())? {
        Some(record) => print!("{}", render_detail(&record)),
        None => {
            warn!(url, "Article not found");
            println!("Article not found.");
        }
    }
    Ok(())
}

async fn run_stats(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::open(&config.store_path).await?;
    let stats = search::stats(&store)?;
    println!("Articles:      {}", stats.total_articles);
    println!("Categories:    {}", stats.categories_count);
    println!("Subcategories: {}", stats.subcategories_count);
    println!("Authors:       {}", stats.authors_count);
    Ok(())
}

async fn run_categories(config: &Config, category: Option<&str>) -> Result<(), Box<dyn Error>> {
    let store = JsonFileStore::open(&config.store_path).await?;
    let lines: Vec<String> = match category {
        Some(category) => search::subcategories_for_category(&store, category)?
            .into_iter()
            .map(|sub| format!("- {sub}"))
            .collect(),
        None => search::category_counts(&store)?
            .into_iter()
            .map(|(category, count)| format!("- {category} ({count})"))
            .collect(),
    };
    if lines.is_empty() {
        println!("None found.");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

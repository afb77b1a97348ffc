//! Multi-page aggregation.
//!
//! [`Aggregator::run`] walks an ordered list of listing pages, reads every
//! card, fetches each new article's page and assembles the records. It keeps
//! one seen-URL set for the whole run, stops as soon as the target count is
//! reached, and waits a fixed delay between consecutive requests.
//!
//! Requests are issued one at a time, in page order, so the output order is
//! the order in which cards were read and the first occurrence of a URL wins.
//! A failed listing page is skipped; a failed article page still yields a
//! record, with the detail fields left empty.

use crate::fetch::Fetcher;
use crate::models::{ArticleDetail, ArticleRecord};
use crate::scrapers::detail::extract_detail_from_html;
use crate::scrapers::preview::{extract_listing, Listing};
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Settings of one aggregation run.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    /// Maximum number of records across all source pages.
    pub target_count: usize,
    /// Pause between two consecutive requests.
    pub request_delay: Duration,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            target_count: 30,
            request_delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of a run: the records plus what happened along the way.
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub records: Vec<ArticleRecord>,
    pub requested: usize,
    pub pages_visited: usize,
    pub listing_failures: usize,
    pub detail_failures: usize,
    /// Cards dropped for lack of a title or link.
    pub invalid_previews: usize,
    /// Cards whose URL had already been accepted.
    pub duplicates: usize,
}

impl AggregationReport {
    pub fn retrieved(&self) -> usize {
        self.records.len()
    }
}

/// Enforces the fixed delay between consecutive requests.
#[derive(Debug)]
struct Pacer {
    delay: Duration,
    started: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: false,
        }
    }

    /// Wait before a request; the first request of a run goes out immediately.
    async fn ready(&mut self) {
        if self.started && !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.started = true;
    }
}

/// Drives listing and detail extraction over several source pages.
pub struct Aggregator<'a, F> {
    fetcher: &'a F,
    config: AggregationConfig,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, F: Fetcher> Aggregator<'a, F> {
    pub fn new(fetcher: &'a F, config: AggregationConfig) -> Self {
        Self {
            fetcher,
            config,
            clock: Utc::now,
        }
    }

    /// Use `clock` for the `scraped_at` timestamp of every record.
    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Aggregate records from `sources`, in order, up to the target count.
    ///
    /// # Arguments
    ///
    /// * `sources` - Listing page URLs, visited in the given order
    ///
    /// # Returns
    ///
    /// An [`AggregationReport`] whose `records` hold at most `target_count`
    /// articles with distinct URLs, in the order their cards were read. Fetch
    /// failures never abort the run; they are counted in the report.
    #[instrument(level = "info", skip_all, fields(sources = sources.len(), target = self.config.target_count))]
    pub async fn run(&self, sources: &[String]) -> AggregationReport {
        let target = self.config.target_count;
        let mut report = AggregationReport {
            requested: target,
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut pacer = Pacer::new(self.config.request_delay);

        for source in sources {
            if report.records.len() >= target {
                break;
            }

            pacer.ready().await;
            let listing = match self.fetch_listing(source).await {
                Some(listing) => listing,
                None => {
                    report.listing_failures += 1;
                    continue;
                }
            };
            report.pages_visited += 1;
            report.invalid_previews += listing.skipped();

            for preview in listing.previews {
                if report.records.len() >= target {
                    break;
                }
                if seen.contains(&preview.url) {
                    debug!(url = %preview.url, "Already collected; skipping");
                    report.duplicates += 1;
                    continue;
                }

                pacer.ready().await;
                let detail = match self.fetcher.fetch(&preview.url).await {
                    Ok(body) => extract_detail_from_html(&body),
                    Err(e) => {
                        warn!(url = %preview.url, error = %e, "Article fetch failed; keeping preview only");
                        report.detail_failures += 1;
                        ArticleDetail::default()
                    }
                };

                info!(
                    index = report.records.len() + 1,
                    title = %truncate_for_log(&preview.title, 60),
                    "Collected article"
                );
                seen.insert(preview.url.clone());
                report
                    .records
                    .push(ArticleRecord::assemble(preview, detail, (self.clock)()));
            }
        }

        info!(
            requested = report.requested,
            retrieved = report.retrieved(),
            pages = report.pages_visited,
            listing_failures = report.listing_failures,
            detail_failures = report.detail_failures,
            duplicates = report.duplicates,
            invalid = report.invalid_previews,
            "Aggregation finished"
        );
        report
    }

    /// Fetch and parse one listing page; `None` when the fetch fails.
    async fn fetch_listing(&self, source: &str) -> Option<Listing> {
        let body = match self.fetcher.fetch(source).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %source, error = %e, "Listing fetch failed; moving to next source");
                return None;
            }
        };

        let base = Url::parse(source).ok();
        let listing = extract_listing(&Html::parse_document(&body), base.as_ref());
        if !listing.has_main {
            warn!(url = %source, "No <main> region on listing page");
        }
        info!(
            url = %source,
            items = listing.items_found,
            valid = listing.previews.len(),
            "Parsed listing page"
        );
        Some(listing)
    }
}

/// Counts from saving a batch of records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

impl PersistReport {
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Upsert every record into `store`; failures are logged and counted.
///
/// # Returns
///
/// A [`PersistReport`]: new URLs count as `inserted`, known URLs as
/// `updated`, and records the store refused as `failed`.
#[instrument(level = "info", skip_all, fields(count = records.len()))]
pub fn persist_records<S: ArticleStore>(store: &mut S, records: &[ArticleRecord]) -> PersistReport {
    let mut report = PersistReport::default();
    for record in records {
        if record.url.is_empty() {
            report.failed += 1;
            continue;
        }
        match store.upsert(record) {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.updated += 1,
            Err(e) => {
                error!(url = %record.url, error = %e, "Failed to save article");
                report.failed += 1;
            }
        }
    }
    info!(
        inserted = report.inserted,
        updated = report.updated,
        failed = report.failed,
        "Saved articles"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tokio::time::Instant;

    /// Serves canned pages and records every requested URL.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
        request_times: RefCell<Vec<Instant>>,
    }

    impl StubFetcher {
        fn page(mut self, url: &str, body: String) -> Self {
            self.pages.insert(url.to_string(), body);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }

        /// Offsets of every request from `start`, in request order.
        fn offsets_since(&self, start: Instant) -> Vec<Duration> {
            self.request_times
                .borrow()
                .iter()
                .map(|t| t.duration_since(start))
                .collect()
        }
    }

    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            self.request_times.borrow_mut().push(Instant::now());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn listing(slugs: &[&str]) -> String {
        let cards: String = slugs
            .iter()
            .map(|slug| {
                format!(
                    r#"<article><div class="entry-meta">
                         <span class="favtag">Web</span>
                         <span class="posted-on">2 janvier 2025</span>
                         <header class="entry-header"><a href="/{slug}/"><h3>Titre {slug}</h3></a></header>
                       </div></article>"#
                )
            })
            .collect();
        format!("<html><body><main>{cards}</main></body></html>")
    }

    fn detail(author: &str) -> String {
        format!(
            r#"<html><body>
                 <div class="cats-list"><span class="cat" data-cat="Web"></span></div>
                 <article>
                   <span class="author">{author}</span>
                   <div class="entry-content"><p>Un paragraphe suffisamment long pour compter.</p></div>
                 </article>
               </body></html>"#
        )
    }

    const SITE: &str = "https://www.example.com";

    fn url(slug: &str) -> String {
        format!("{SITE}/{slug}/")
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn config(target_count: usize) -> AggregationConfig {
        AggregationConfig {
            target_count,
            request_delay: Duration::ZERO,
        }
    }

    fn sources(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| format!("{SITE}/{p}")).collect()
    }

    fn two_page_site() -> StubFetcher {
        StubFetcher::default()
            .page(&format!("{SITE}/web/"), listing(&["a", "b", "c"]))
            .page(&format!("{SITE}/tech/"), listing(&["c", "d", "e"]))
            .page(&url("a"), detail("Alice Martin"))
            .page(&url("b"), detail("Bob Durand"))
            .page(&url("c"), detail("Claire Leroy"))
            .page(&url("d"), detail("David Petit"))
            .page(&url("e"), detail("Emma Roux"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_requests() {
        let delay = Duration::from_millis(150);
        let fetcher = StubFetcher::default()
            .page(&format!("{SITE}/web/"), listing(&["a", "b"]))
            .page(&url("a"), detail("Alice Martin"))
            .page(&url("b"), detail("Bob Durand"));
        let config = AggregationConfig {
            target_count: 10,
            request_delay: delay,
        };

        let start = Instant::now();
        let report = Aggregator::new(&fetcher, config).run(&sources(&["web/"])).await;

        assert_eq!(report.retrieved(), 2);
        let offsets = fetcher.offsets_since(start);
        assert_eq!(offsets.len(), 3);
        // The first request goes out at once, each later one waits the delay.
        assert_eq!(offsets[0], Duration::ZERO);
        for gap in offsets.windows(2).map(|w| w[1] - w[0]) {
            assert!(gap >= delay, "gap {gap:?} shorter than {delay:?}");
            assert!(gap < delay + Duration::from_millis(10), "gap {gap:?} too long");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_target_never_sleeps() {
        let fetcher = two_page_site();
        let config = AggregationConfig {
            target_count: 0,
            request_delay: Duration::from_secs(5),
        };

        let start = Instant::now();
        let report = Aggregator::new(&fetcher, config)
            .run(&sources(&["web/", "tech/"]))
            .await;

        assert!(report.records.is_empty());
        assert!(fetcher.requests().is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_overlapping_pages_are_deduplicated() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(10))
            .run(&sources(&["web/", "tech/"]))
            .await;

        let urls: Vec<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec![url("a"), url("b"), url("c"), url("d"), url("e")]);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.pages_visited, 2);
        // The shared article is fetched once.
        let c_fetches = fetcher.requests().iter().filter(|u| **u == url("c")).count();
        assert_eq!(c_fetches, 1);

        let first = &report.records[0];
        assert_eq!(first.author.as_deref(), Some("Alice Martin"));
        assert_eq!(first.date.as_deref(), Some("2025-01-02"));
        assert_eq!(first.subcategory.as_deref(), Some("Web"));
        assert_eq!(first.primary_category.as_deref(), Some("Web"));
    }

    #[tokio::test]
    async fn test_target_count_caps_results_and_requests() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(2))
            .run(&sources(&["web/", "tech/"]))
            .await;

        assert_eq!(report.retrieved(), 2);
        assert_eq!(report.requested, 2);
        // The cap is checked before each article fetch and before each page.
        assert_eq!(
            fetcher.requests(),
            vec![format!("{SITE}/web/"), url("a"), url("b")]
        );
    }

    #[tokio::test]
    async fn test_cap_spans_source_pages() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(4))
            .run(&sources(&["web/", "tech/"]))
            .await;

        let urls: Vec<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec![url("a"), url("b"), url("c"), url("d")]);
        assert!(!fetcher.requests().contains(&url("e")));
    }

    #[tokio::test]
    async fn test_zero_target_makes_no_requests() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(0))
            .run(&sources(&["web/"]))
            .await;
        assert!(report.records.is_empty());
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_moves_to_next_source() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(10))
            .run(&sources(&["missing/", "tech/"]))
            .await;

        assert_eq!(report.listing_failures, 1);
        assert_eq!(report.pages_visited, 1);
        let urls: Vec<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec![url("c"), url("d"), url("e")]);
    }

    #[tokio::test]
    async fn test_detail_failure_keeps_preview_fields() {
        let fetcher = StubFetcher::default()
            .page(&format!("{SITE}/web/"), listing(&["gone", "a"]))
            .page(&url("a"), detail("Alice Martin"));
        let report = Aggregator::new(&fetcher, config(10))
            .run(&sources(&["web/"]))
            .await;

        assert_eq!(report.retrieved(), 2);
        assert_eq!(report.detail_failures, 1);
        let gone = &report.records[0];
        assert_eq!(gone.url, url("gone"));
        assert_eq!(gone.title, "Titre gone");
        assert!(gone.author.is_none());
        assert!(gone.content.is_none());
        assert!(gone.images.is_empty());
        assert!(gone.primary_category.is_none());
        assert_eq!(report.records[1].author.as_deref(), Some("Alice Martin"));
    }

    #[tokio::test]
    async fn test_invalid_previews_are_never_fetched() {
        let page = r#"<html><body><main>
              <article><header><h3>Pas de lien</h3></header></article>
              <article><header><a href="/a/"><h3>Titre a</h3></a></header></article>
            </main></body></html>"#;
        let fetcher = StubFetcher::default()
            .page(&format!("{SITE}/web/"), page.to_string())
            .page(&url("a"), detail("Alice Martin"));
        let report = Aggregator::new(&fetcher, config(10))
            .run(&sources(&["web/"]))
            .await;

        assert_eq!(report.invalid_previews, 1);
        assert_eq!(fetcher.requests(), vec![format!("{SITE}/web/"), url("a")]);
    }

    #[tokio::test]
    async fn test_duplicate_on_same_page() {
        let fetcher = StubFetcher::default()
            .page(&format!("{SITE}/web/"), listing(&["a", "a", "b"]))
            .page(&url("a"), detail("Alice Martin"))
            .page(&url("b"), detail("Bob Durand"));
        let report = Aggregator::new(&fetcher, config(10))
            .run(&sources(&["web/"]))
            .await;

        assert_eq!(report.retrieved(), 2);
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_runs_are_deterministic() {
        let fetcher = two_page_site();
        let sources = sources(&["web/", "tech/"]);
        let first = Aggregator::new(&fetcher, config(4))
            .with_clock(fixed_clock)
            .run(&sources)
            .await;
        let second = Aggregator::new(&fetcher, config(4))
            .with_clock(fixed_clock)
            .run(&sources)
            .await;

        assert_eq!(
            serde_json::to_string(&first.records).unwrap(),
            serde_json::to_string(&second.records).unwrap()
        );
        assert!(first.records.iter().all(|r| r.scraped_at == fixed_clock()));
    }

    #[tokio::test]
    async fn test_persist_records_counts_inserts_and_updates() {
        let fetcher = two_page_site();
        let report = Aggregator::new(&fetcher, config(3))
            .run(&sources(&["web/"]))
            .await;

        let mut store = MemoryStore::new();
        let first = persist_records(&mut store, &report.records);
        assert_eq!(first, PersistReport { inserted: 3, updated: 0, failed: 0 });

        let again = persist_records(&mut store, &report.records[..1]);
        assert_eq!(again.updated, 1);
        assert_eq!(again.persisted(), 1);
        assert_eq!(store.count().unwrap(), 3);
    }
}

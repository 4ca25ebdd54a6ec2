//! Crawl pipeline: listing navigation, filter application, tile harvesting
//! and article extraction, run over every filter combination in turn.

pub mod article;
pub mod consent;
pub mod date;
pub mod filter;
pub mod listing;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::{wait_for_ready, BrowserSession};
use crate::config::{FilterDimension, Settings};
use crate::document::{Document, FilterCombination};

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub combinations: usize,
    pub harvested: usize,
    pub extracted: usize,
    pub skipped: usize,
}

/// Full cross-product of the dimension values; the first dimension varies slowest.
pub fn combinations(filters: &[FilterDimension]) -> Vec<FilterCombination> {
    if filters.is_empty() {
        return Vec::new();
    }
    filters
        .iter()
        .map(|d| d.values.iter().map(move |v| (d.name.clone(), v.clone())))
        .multi_cartesian_product()
        .map(FilterCombination)
        .collect()
}

/// Drives one browser session over every filter combination and keeps the
/// documents it finds.
pub struct Crawler<S: BrowserSession> {
    session: S,
    settings: Settings,
    documents: Vec<Document>,
    stats: CrawlStats,
    progress: bool,
}

impl<S: BrowserSession> Crawler<S> {
    pub fn new(session: S, settings: Settings) -> Self {
        debug!("Crawler init completed for {}", settings.host);
        Self {
            session,
            settings,
            documents: Vec::new(),
            stats: CrawlStats::default(),
            progress: false,
        }
    }

    /// Show a progress bar over combinations.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    #[cfg(test)]
    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.session.close().await {
            error!("Browser session did not close cleanly: {}", e);
        }
    }

    /// Crawl every filter combination once, in cross-product order.
    pub async fn run(&mut self) -> &[Document] {
        self.documents.clear();
        self.stats = CrawlStats::default();
        debug!("Parse process start: {}", self.settings.host);

        let combos = combinations(&self.settings.filters);
        let pb = if self.progress {
            let pb = ProgressBar::new(combos.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for combo in &combos {
            pb.set_message(combo.to_string());
            self.crawl_combination(combo).await;
            self.stats.combinations += 1;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "Crawled {} combinations: {} tiles, {} documents, {} skipped",
            self.stats.combinations, self.stats.harvested, self.stats.extracted, self.stats.skipped
        );
        debug!("Parse process finished");
        &self.documents
    }

    async fn crawl_combination(&mut self, combo: &FilterCombination) {
        self.open_listing().await;

        let entries = listing::harvest(&mut self.session, &self.settings, combo).await;
        self.stats.harvested += entries.len();

        let cap = self.settings.max_documents;
        for (index, entry) in entries.iter().enumerate() {
            if index >= cap {
                debug!("Max count documents reached ({}) for {}", cap, combo);
                break;
            }
            match article::extract_article(&mut self.session, &self.settings, &entry.date_text, &entry.url)
                .await
            {
                Ok(doc) => {
                    self.documents.push(doc);
                    self.stats.extracted += 1;
                }
                Err(e) => {
                    error!("No document from {}: {}", entry.url, e);
                    self.stats.skipped += 1;
                }
            }
            sleep(self.settings.delays.between_articles()).await;
        }
    }

    /// Fresh load of the listing host; earlier filter state is discarded.
    async fn open_listing(&mut self) {
        let timeouts = &self.settings.timeouts;
        debug!("Parser enter to {}", self.settings.host);
        if let Err(e) = self.session.navigate(&self.settings.host).await {
            error!("Listing did not load: {}", e);
        } else if let Err(e) = wait_for_ready(&mut self.session, timeouts.ready(), timeouts.poll()).await {
            debug!("Listing not ready, falling back to settle delay: {}", e);
        }
        sleep(self.settings.delays.listing()).await;
        consent::dismiss_consent(&mut self.session, &self.settings.selectors, timeouts).await;
    }
}

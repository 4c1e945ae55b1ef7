// src/checker/mod.rs
// =============================================================================
// This module verifies that persisted links still work.
//
// Submodules:
// - http: the Fetcher trait, its reqwest implementation and LinkStatus
//
// LinkChecker ties a Fetcher to the link index: it checks each unique URL
// once, concurrently, and writes status / fail_count / last_checked back
// onto every record that carries the URL.
// =============================================================================

mod http;

use chrono::Utc;
use futures::stream::{self, StreamExt}; // StreamExt gives us .buffer_unordered()
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::index::{LinkId, LinkIndex, LinkRecord};

pub use http::{Fetcher, HttpFetcher, LinkCheckResult, LinkStatus};

/// Totals of a full pass over the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub ok: usize,
    pub broken: usize,
}

pub struct LinkChecker {
    fetcher: Arc<dyn Fetcher>,
    index: Arc<dyn LinkIndex>,
    concurrency: usize,
    page_size: usize,
    /// Budget per fetch when the caller does not pass one.
    timeout: Duration,
}

impl LinkChecker {
    pub fn new(fetcher: Arc<dyn Fetcher>, index: Arc<dyn LinkIndex>, settings: &Settings) -> Self {
        Self {
            fetcher,
            index,
            concurrency: settings.check.concurrency.max(1),
            page_size: settings.batch_size.max(1),
            timeout: Duration::from_secs(settings.check.timeout_secs),
        }
    }

    /// The `check.timeout_secs` setting.
    pub fn default_timeout(&self) -> Duration {
        self.timeout
    }

    /// [`Self::check_all`] with the configured timeout.
    pub async fn check_all_default(&self) -> Result<CheckSummary> {
        self.check_all(self.timeout).await
    }

    // Checks the given records and stores the outcome on each of them
    //
    // Returns one result per unique URL, in no particular order
    // (buffer_unordered hands results back as requests finish).
    pub async fn check_links(
        &self,
        records: Vec<LinkRecord>,
        timeout: Duration,
    ) -> Result<Vec<LinkCheckResult>> {
        let mut by_url: HashMap<String, Vec<LinkRecord>> = HashMap::new();
        for record in records {
            by_url.entry(record.url.clone()).or_default().push(record);
        }

        let fetcher = Arc::clone(&self.fetcher);
        let results: Vec<LinkCheckResult> = stream::iter(by_url.keys().cloned())
            .map(|url| {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.fetch(&checkable_url(&url), timeout).await.with_url(url) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let checked_at = Utc::now();
        for result in &results {
            let Some(records) = by_url.get_mut(&result.url) else {
                continue;
            };
            for record in records.iter_mut() {
                record.status = Some(result.status.clone());
                record.last_checked = Some(checked_at);
                record.fail_count = if result.is_ok() { 0 } else { record.fail_count + 1 };
                if record.id.is_some() {
                    self.index.update(record).await.map_err(Error::Storage)?;
                }
            }
            debug!(url = %result.url, status = ?result.status, "link checked");
        }

        Ok(results)
    }

    /// Checks every record in the index, one page at a time.
    pub async fn check_all(&self, timeout: Duration) -> Result<CheckSummary> {
        let mut summary = CheckSummary::default();
        let mut cursor: Option<LinkId> = None;

        loop {
            let page = self
                .index
                .load_page(cursor, self.page_size)
                .await
                .map_err(Error::Storage)?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id;

            for result in self.check_links(page, timeout).await? {
                summary.checked += 1;
                if result.is_ok() {
                    summary.ok += 1;
                } else {
                    summary.broken += 1;
                }
            }

            if cursor.is_none() {
                break;
            }
        }

        info!(
            checked = summary.checked,
            ok = summary.ok,
            broken = summary.broken,
            "liveness check finished"
        );
        Ok(summary)
    }
}

impl LinkCheckResult {
    // Report against the URL as stored, not the form we sent over the wire
    fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }
}

// Scheme-relative links are checked over http
fn checkable_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("http:{}", url)
    } else {
        url.to_string()
    }
}

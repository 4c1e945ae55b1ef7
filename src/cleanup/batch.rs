// src/cleanup/batch.rs
// =============================================================================
// Bulk removal of every link record, one page at a time.
//
// How it works:
// 1. Load up to page_size records after the cursor
// 2. Delete them in a single call (one atomic unit)
// 3. Only after the delete succeeded, move the cursor past them
// 4. Repeat until a page comes back empty and the index reports zero records
//
// Why pages?
// - The index can hold millions of records; one giant delete would hold
//   locks for ages and lose all progress on a crash
// - A crash or cancellation loses at most the page in flight; the progress
//   can be stored by the host and handed back to RemoveAllBatch::resume
//
// Records created behind the cursor while the job runs are caught by a
// final sweep: an empty page with records remaining restarts from the top.
// =============================================================================

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::index::{LinkId, LinkIndex};

/// Where a removal job stands. Serializable so the host can persist it
/// between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Id of the last record of the last deleted page.
    pub cursor: Option<LinkId>,
    pub pages: usize,
    pub deleted: usize,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page was processed; holds how many records it removed.
    Deleted(usize),
    /// Nothing left to remove.
    Finished,
}

pub struct RemoveAllBatch {
    index: Arc<dyn LinkIndex>,
    page_size: usize,
    progress: BatchProgress,
}

impl RemoveAllBatch {
    pub fn new(index: Arc<dyn LinkIndex>, page_size: usize) -> Self {
        Self::resume(index, page_size, BatchProgress::default())
    }

    /// Continues a job from progress saved by an earlier run.
    pub fn resume(index: Arc<dyn LinkIndex>, page_size: usize, progress: BatchProgress) -> Self {
        Self {
            index,
            page_size: page_size.max(1),
            progress,
        }
    }

    pub fn progress(&self) -> &BatchProgress {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.progress.finished
    }

    // Deletes the next page
    //
    // On a storage error the cursor stays where it was, so calling this
    // again retries exactly the same page.
    pub async fn process_page(&mut self) -> Result<PageOutcome> {
        if self.progress.finished {
            return Ok(PageOutcome::Finished);
        }

        let page = self
            .index
            .load_page(self.progress.cursor, self.page_size)
            .await
            .map_err(Error::Storage)?;

        if page.is_empty() {
            let remaining = self.index.count_remaining().await.map_err(Error::Storage)?;
            if remaining == 0 {
                self.progress.finished = true;
                return Ok(PageOutcome::Finished);
            }
            if self.progress.cursor.is_none() {
                return Err(Error::Storage(anyhow!(
                    "link index reports {} records but returned an empty first page",
                    remaining
                )));
            }
            debug!(remaining, "records left behind the cursor, sweeping again");
            self.progress.cursor = None;
            return Ok(PageOutcome::Deleted(0));
        }

        let ids: Vec<LinkId> = page.iter().filter_map(|record| record.id).collect();
        let deleted = self.index.delete(&ids).await.map_err(Error::Storage)?;

        self.progress.cursor = ids.iter().max().copied().or(self.progress.cursor);
        self.progress.pages += 1;
        self.progress.deleted += deleted;
        Ok(PageOutcome::Deleted(deleted))
    }

    // Runs pages until the index is empty
    //
    // The token is checked before every page; a cancelled run returns
    // Error::Cancelled and keeps its progress, so run() can be called again.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<BatchProgress> {
        while !self.progress.finished {
            if cancel.is_cancelled() {
                info!(deleted = self.progress.deleted, "link removal cancelled");
                return Err(Error::Cancelled);
            }

            if let PageOutcome::Deleted(count) = self.process_page().await? {
                debug!(count, pages = self.progress.pages, "deleted page of links");
            }
        }

        info!(
            deleted = self.progress.deleted,
            pages = self.progress.pages,
            "all links removed"
        );
        Ok(self.progress.clone())
    }
}

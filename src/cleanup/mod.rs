// src/cleanup/mod.rs
// =============================================================================
// The link clean-up service: removes link records that no longer match
// their content.
//
// Submodules:
// - locks: one async mutex per owning content
// - batch: resumable, cancellable removal of every record
//
// A record is stale when:
// - its owning content is gone (missing or deleted)
// - its field is no longer scanned
// - its URL is no longer a link we track (unsupported, blacklisted, or a
//   link type that is not checked)
// - its URL is not among the links currently extracted from its field and
//   language
//
// Clean-up only ever deletes. New links are the extraction service's job.
// =============================================================================

mod batch;
mod locks;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::content::{OwningContent, ParentRef};
use crate::error::{Error, Result};
use crate::index::{LinkId, LinkRecord};
use crate::service::LinkExtractorService;

pub use batch::{BatchProgress, PageOutcome, RemoveAllBatch};
pub use locks::OwnerLocks;

/// What one clean-up pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanUpReport {
    pub kept: usize,
    pub deleted: usize,
}

pub struct LinkCleanUp {
    extractor: Arc<LinkExtractorService>,
    locks: OwnerLocks,
}

impl LinkCleanUp {
    pub fn new(extractor: Arc<LinkExtractorService>) -> Self {
        Self {
            extractor,
            locks: OwnerLocks::new(),
        }
    }

    // Deletes the records of `content` that are no longer in it
    //
    // Runs under the owner lock, so two passes over the same content never
    // interleave. Running it twice in a row deletes nothing the second time.
    pub async fn clean_up_for_entity(&self, content: &dyn OwningContent) -> Result<CleanUpReport> {
        let parent = content.parent();
        let _guard = self.locks.lock(&parent).await;

        let records = self.load_owned(&parent).await?;
        if records.is_empty() {
            return Ok(CleanUpReport::default());
        }

        let stale: Vec<LinkId> = if content.exists() {
            self.stale_records(content, &records)
        } else {
            records.iter().filter_map(|record| record.id).collect()
        };

        self.delete_stale(&parent, records.len(), stale).await
    }

    /// Deletes every record of content that has been deleted.
    pub async fn clean_up_for_deleted(&self, parent: &ParentRef) -> Result<CleanUpReport> {
        let _guard = self.locks.lock(parent).await;

        let records = self.load_owned(parent).await?;
        let ids: Vec<LinkId> = records.iter().filter_map(|record| record.id).collect();
        self.delete_stale(parent, records.len(), ids).await
    }

    /// Loads the content through the content source, then cleans it up.
    /// Content the source no longer knows counts as deleted.
    pub async fn clean_up_by_ref(&self, parent: &ParentRef) -> Result<CleanUpReport> {
        let content = self
            .extractor
            .contents()
            .load(parent)
            .await
            .map_err(Error::ContentSource)?;

        match content {
            Some(content) => self.clean_up_for_entity(content.as_ref()).await,
            None => self.clean_up_for_deleted(parent).await,
        }
    }

    /// A fresh job that removes every record, `batch_size` per page.
    pub fn remove_all_batch(&self) -> RemoveAllBatch {
        RemoveAllBatch::new(
            Arc::clone(self.extractor.index()),
            self.extractor.settings().batch_size,
        )
    }

    /// Runs [`Self::remove_all_batch`] to the end.
    pub async fn remove_all(&self, cancel: &CancellationToken) -> Result<BatchProgress> {
        self.remove_all_batch().run(cancel).await
    }

    async fn load_owned(&self, parent: &ParentRef) -> Result<Vec<LinkRecord>> {
        self.extractor
            .index()
            .load_by_owner(parent, None)
            .await
            .map_err(Error::Storage)
    }

    fn stale_records(&self, content: &dyn OwningContent, records: &[LinkRecord]) -> Vec<LinkId> {
        let base = self.extractor.base_for(content);
        let classifier = self.extractor.classifier();

        // (field, langcode) -> links currently in that field
        let mut current: HashMap<(&str, &str), HashSet<String>> = HashMap::new();
        let mut stale = Vec::new();

        for record in records {
            let Some(id) = record.id else {
                continue;
            };
            let recorded = classifier.classify(&record.url, &base);
            if !recorded.kept || !self.extractor.is_scanned(content, &record.entity_field) {
                stale.push(id);
                continue;
            }

            let key = (record.entity_field.as_str(), record.entity_langcode.as_str());
            let links = current.entry(key).or_insert_with(|| {
                self.extractor
                    .extract_from_field(content, key.0, key.1)
                    .into_iter()
                    .collect()
            });

            if !links.contains(&recorded.url) {
                stale.push(id);
            }
        }

        stale
    }

    async fn delete_stale(
        &self,
        parent: &ParentRef,
        total: usize,
        stale: Vec<LinkId>,
    ) -> Result<CleanUpReport> {
        if stale.is_empty() {
            debug!(parent = %parent, links = total, "no stale links");
            return Ok(CleanUpReport {
                kept: total,
                deleted: 0,
            });
        }

        let deleted = self
            .extractor
            .index()
            .delete(&stale)
            .await
            .map_err(Error::Storage)?;

        info!(parent = %parent, deleted, "removed stale links");
        Ok(CleanUpReport {
            kept: total - stale.len(),
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::content::{ContentRecord, FieldConfig, MemoryContentSource};
    use crate::extract::HTML_LINK_EXTRACTOR;
    use crate::index::{LinkIndex, MemoryLinkIndex};

    struct Fixture {
        contents: Arc<MemoryContentSource>,
        index: Arc<MemoryLinkIndex>,
        cleanup: LinkCleanUp,
    }

    fn fixture() -> Fixture {
        let contents = Arc::new(MemoryContentSource::new());
        let index = Arc::new(MemoryLinkIndex::new());
        let service =
            LinkExtractorService::new(Settings::default(), contents.clone(), index.clone());
        Fixture {
            contents,
            index,
            cleanup: LinkCleanUp::new(Arc::new(service)),
        }
    }

    fn node(body: &str) -> ContentRecord {
        ContentRecord::new(ParentRef::new("node", "1"))
            .with_field("body", "en", vec![body.to_string()])
            .with_field_config("body", FieldConfig::scanned(HTML_LINK_EXTRACTOR))
    }

    async fn add_link(index: &MemoryLinkIndex, url: &str, field: &str) {
        index
            .create(LinkRecord::new(url, ParentRef::new("node", "1"), field, "en"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_removes_only_missing_links() {
        let f = fixture();
        add_link(&f.index, "https://kept.test", "body").await;
        add_link(&f.index, "https://gone.test", "body").await;

        let content = node(r#"<a href="https://kept.test">kept</a>"#);
        let report = f.cleanup.clean_up_for_entity(&content).await.unwrap();
        assert_eq!(report, CleanUpReport { kept: 1, deleted: 1 });

        let left = f.index.all().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].url, "https://kept.test");

        let again = f.cleanup.clean_up_for_entity(&content).await.unwrap();
        assert_eq!(again, CleanUpReport { kept: 1, deleted: 0 });
    }

    #[tokio::test]
    async fn test_relative_links_match_their_resolved_form() {
        let f = fixture();
        add_link(&f.index, "http://localhost/about", "body").await;

        let report = f
            .cleanup
            .clean_up_for_entity(&node(r#"<a href="/about">about</a>"#))
            .await
            .unwrap();
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn test_unscanned_field_links_are_stale() {
        let f = fixture();
        add_link(&f.index, "https://a.test", "notes").await;

        let content = node("").with_field_config("notes", FieldConfig::ignored());
        let report = f.cleanup.clean_up_for_entity(&content).await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_unsupported_record_url_is_stale() {
        let f = fixture();
        add_link(&f.index, "", "body").await;
        add_link(&f.index, "http://localhost", "body").await;

        let content = node(r#"<a href="http://localhost">home</a>"#);
        let report = f.cleanup.clean_up_for_entity(&content).await.unwrap();
        assert_eq!(report, CleanUpReport { kept: 1, deleted: 1 });
        assert_eq!(f.index.all().await[0].url, "http://localhost");
    }

    #[tokio::test]
    async fn test_deleted_content_loses_all_links() {
        let f = fixture();
        add_link(&f.index, "https://kept.test", "body").await;

        let mut content = node(r#"<a href="https://kept.test">kept</a>"#);
        content.deleted = true;
        let report = f.cleanup.clean_up_for_entity(&content).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(f.index.count_remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clean_up_by_ref_treats_missing_content_as_deleted() {
        let f = fixture();
        add_link(&f.index, "https://a.test", "body").await;
        add_link(&f.index, "https://b.test", "body").await;

        let parent = ParentRef::new("node", "1");
        f.contents.insert(node(r#"<a href="https://a.test">a</a>"#)).await;
        let report = f.cleanup.clean_up_by_ref(&parent).await.unwrap();
        assert_eq!(report.deleted, 1);

        f.contents.remove(&parent).await;
        let report = f.cleanup.clean_up_by_ref(&parent).await.unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(f.index.count_remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_all_empties_index() {
        let f = fixture();
        for i in 0..120 {
            add_link(&f.index, &format!("https://{}.test", i), "body").await;
        }

        let progress = f.cleanup.remove_all(&CancellationToken::new()).await.unwrap();
        assert_eq!(progress.deleted, 120);
        assert_eq!(progress.pages, 3);
        assert_eq!(f.index.count_remaining().await.unwrap(), 0);
    }
}

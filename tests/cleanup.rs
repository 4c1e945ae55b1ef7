// tests/cleanup.rs
// =============================================================================
// Entity clean-up and bulk removal, end to end.
// =============================================================================

mod common;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use common::{harness, node, settings};
use linkchecker::cleanup::{BatchProgress, PageOutcome, RemoveAllBatch};
use linkchecker::content::{MemoryContentSource, ParentRef};
use linkchecker::index::{LinkId, LinkIndex, LinkRecord, MemoryLinkIndex};
use linkchecker::{Error, LinkCleanUp, LinkExtractorService, LinkTypes, Settings};

async fn add_link(index: &dyn LinkIndex, url: &str, parent: &ParentRef, field: &str) {
    index
        .create(LinkRecord::new(url, parent.clone(), field, "en"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_entity_cleanup_removes_stale_link() {
    common::init_tracing();
    let h = harness(settings("", LinkTypes::All));
    let content = node("1", r#"<a href="http://httpstat.us/304">The nightmare continues</a>"#);
    let parent = content.parent.clone();

    add_link(h.index.as_ref(), "http://httpstat.us/304", &parent, "body").await;
    add_link(h.index.as_ref(), "http://httpstat.us/503", &parent, "body").await;
    assert_eq!(h.index.count_remaining().await.unwrap(), 2);

    let index = h.index.clone();
    let cleanup = LinkCleanUp::new(Arc::new(h.service));

    cleanup.clean_up_for_entity(&content).await.unwrap();
    let left = index.all().await;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].url, "http://httpstat.us/304");

    let report = cleanup.clean_up_for_entity(&content).await.unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(index.count_remaining().await.unwrap(), 1);
}

#[tokio::test]
async fn test_cleanup_leaves_other_owners_alone() {
    let h = harness(settings("", LinkTypes::All));
    let mine = node("1", "");
    let other = ParentRef::new("node", "2");
    add_link(h.index.as_ref(), "https://a.test", &mine.parent, "body").await;
    add_link(h.index.as_ref(), "https://a.test", &other, "body").await;

    let index = h.index.clone();
    let cleanup = LinkCleanUp::new(Arc::new(h.service));
    cleanup.clean_up_for_entity(&mine).await.unwrap();

    let left = index.all().await;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].parent, other);
}

#[tokio::test]
async fn test_parallel_cleanups_of_one_owner() {
    let h = harness(settings("", LinkTypes::All));
    let content = Arc::new(node("1", r#"<a href="https://kept.test">k</a>"#));
    for i in 0..20 {
        let url = format!("https://gone{}.test", i);
        add_link(h.index.as_ref(), &url, &content.parent, "body").await;
    }
    add_link(h.index.as_ref(), "https://kept.test", &content.parent, "body").await;

    let index = h.index.clone();
    let cleanup = Arc::new(LinkCleanUp::new(Arc::new(h.service)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cleanup = Arc::clone(&cleanup);
            let content = Arc::clone(&content);
            tokio::spawn(async move {
                cleanup
                    .clean_up_for_entity(content.as_ref())
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut deleted = 0;
    for handle in handles {
        deleted += handle.await.unwrap().deleted;
    }
    assert_eq!(deleted, 20);
    assert_eq!(index.count_remaining().await.unwrap(), 1);
}

#[tokio::test]
async fn test_remove_all_batch() {
    let h = harness(Settings::default());
    let dummy = ParentRef::new("dummy_type", "1");
    for url in [
        "https://existing.com",
        "https://not-existing.com",
        "https://example.com/existing",
    ] {
        add_link(h.index.as_ref(), url, &dummy, "dummy_field").await;
    }

    let index = h.index.clone();
    let cleanup = LinkCleanUp::new(Arc::new(h.service));

    let mut batch = cleanup.remove_all_batch();
    let progress = batch.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(progress.deleted, 3);
    assert_eq!(index.count_remaining().await.unwrap(), 0);

    // Running again, finished or fresh, is harmless.
    batch.run(&CancellationToken::new()).await.unwrap();
    let fresh = cleanup.remove_all(&CancellationToken::new()).await.unwrap();
    assert_eq!(fresh.deleted, 0);
}

#[tokio::test]
async fn test_cancelled_batch_resumes_from_saved_progress() {
    let index = Arc::new(MemoryLinkIndex::new());
    let parent = ParentRef::new("node", "1");
    for i in 0..10 {
        add_link(index.as_ref(), &format!("https://{}.test", i), &parent, "body").await;
    }

    let mut batch = RemoveAllBatch::new(index.clone(), 4);
    assert_eq!(batch.process_page().await.unwrap(), PageOutcome::Deleted(4));

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(batch.run(&cancel).await, Err(Error::Cancelled)));

    // The host stores the progress and restarts later.
    let saved = serde_json::to_string(batch.progress()).unwrap();
    let restored: BatchProgress = serde_json::from_str(&saved).unwrap();
    assert_eq!(restored.cursor, Some(LinkId(4)));

    let mut resumed = RemoveAllBatch::resume(index.clone(), 4, restored);
    let progress = resumed.run(&CancellationToken::new()).await.unwrap();
    assert_eq!(progress.deleted, 10);
    assert_eq!(index.count_remaining().await.unwrap(), 0);
}

// Delegates to a MemoryLinkIndex, but the next delete fails while `fail_next` is set
#[derive(Default)]
struct FlakyIndex {
    inner: MemoryLinkIndex,
    fail_next: AtomicBool,
}

#[async_trait]
impl LinkIndex for FlakyIndex {
    async fn create(&self, record: LinkRecord) -> anyhow::Result<LinkRecord> {
        self.inner.create(record).await
    }

    async fn update(&self, record: &LinkRecord) -> anyhow::Result<()> {
        self.inner.update(record).await
    }

    async fn load_by_owner(
        &self,
        parent: &ParentRef,
        field: Option<&str>,
    ) -> anyhow::Result<Vec<LinkRecord>> {
        self.inner.load_by_owner(parent, field).await
    }

    async fn load_page(
        &self,
        after: Option<LinkId>,
        limit: usize,
    ) -> anyhow::Result<Vec<LinkRecord>> {
        self.inner.load_page(after, limit).await
    }

    async fn delete(&self, ids: &[LinkId]) -> anyhow::Result<usize> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("connection reset");
        }
        self.inner.delete(ids).await
    }

    async fn count_remaining(&self) -> anyhow::Result<usize> {
        self.inner.count_remaining().await
    }
}

#[tokio::test]
async fn test_failed_delete_does_not_advance_cursor() {
    let index = Arc::new(FlakyIndex::default());
    let parent = ParentRef::new("node", "1");
    for i in 0..6 {
        add_link(index.as_ref(), &format!("https://{}.test", i), &parent, "body").await;
    }

    let mut batch = RemoveAllBatch::new(index.clone(), 3);
    assert_eq!(batch.process_page().await.unwrap(), PageOutcome::Deleted(3));
    let before = batch.progress().clone();

    index.fail_next.store(true, Ordering::SeqCst);
    let err = batch.process_page().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(batch.progress(), &before);

    // The retry deletes exactly the page that failed.
    assert_eq!(batch.process_page().await.unwrap(), PageOutcome::Deleted(3));
    assert_eq!(batch.process_page().await.unwrap(), PageOutcome::Finished);
    assert_eq!(batch.progress().deleted, 6);
}

#[tokio::test]
async fn test_cleanup_by_ref_for_removed_content() {
    let contents = Arc::new(MemoryContentSource::new());
    let index = Arc::new(MemoryLinkIndex::new());
    let service = LinkExtractorService::new(Settings::default(), contents.clone(), index.clone());
    let cleanup = LinkCleanUp::new(Arc::new(service));

    let parent = ParentRef::new("node", "5");
    add_link(index.as_ref(), "https://a.test", &parent, "body").await;
    add_link(index.as_ref(), "https://b.test", &parent, "body").await;

    let report = cleanup.clean_up_by_ref(&parent).await.unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(index.count_remaining().await.unwrap(), 0);
}

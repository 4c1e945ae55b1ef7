// src/index/memory.rs
// =============================================================================
// In-memory LinkIndex.
//
// Records live in a BTreeMap keyed by id, so pages come out in id order
// without sorting. A tokio RwLock guards the map; every method takes the
// lock once, which makes each call (including a multi-id delete) atomic.
// =============================================================================

use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::{LinkId, LinkIndex, LinkRecord};
use crate::content::ParentRef;

#[derive(Debug, Default)]
pub struct MemoryLinkIndex {
    records: RwLock<BTreeMap<LinkId, LinkRecord>>,
    next_id: AtomicU64,
}

impl MemoryLinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, in id order.
    pub async fn all(&self) -> Vec<LinkRecord> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn get(&self, id: LinkId) -> Option<LinkRecord> {
        self.records.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl LinkIndex for MemoryLinkIndex {
    async fn create(&self, mut record: LinkRecord) -> anyhow::Result<LinkRecord> {
        // Ids start at 1
        let id = LinkId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        record.id = Some(id);
        self.records.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, record: &LinkRecord) -> anyhow::Result<()> {
        let id = record
            .id
            .ok_or_else(|| anyhow!("cannot update a link record that was never created"))?;
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(anyhow!("link record {} does not exist", id)),
        }
    }

    async fn load_by_owner(
        &self,
        parent: &ParentRef,
        field: Option<&str>,
    ) -> anyhow::Result<Vec<LinkRecord>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|record| &record.parent == parent)
            .filter(|record| field.map_or(true, |f| record.entity_field == f))
            .cloned()
            .collect())
    }

    async fn load_page(
        &self,
        after: Option<LinkId>,
        limit: usize,
    ) -> anyhow::Result<Vec<LinkRecord>> {
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let records = self.records.read().await;
        Ok(records
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn delete(&self, ids: &[LinkId]) -> anyhow::Result<usize> {
        let mut records = self.records.write().await;
        Ok(ids.iter().filter(|id| records.remove(*id).is_some()).count())
    }

    async fn count_remaining(&self) -> anyhow::Result<usize> {
        Ok(self.records.read().await.len())
    }
}

// src/index/mod.rs
// =============================================================================
// The link index: persisted link records and the storage interface.
//
// The storage engine belongs to the host application (SQL table, key-value
// store, ...). This module only defines the record shape and the operations
// the services need, plus an in-memory implementation.
// =============================================================================

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::checker::LinkStatus;
use crate::content::ParentRef;

pub use memory::MemoryLinkIndex;

/// Identifier assigned by the index when a record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One URL found in one field of one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// None until the record has been created in the index.
    pub id: Option<LinkId>,
    pub url: String,
    pub parent: ParentRef,
    pub entity_field: String,
    pub entity_langcode: String,
    /// Outcome of the last liveness check, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
    /// Consecutive failed liveness checks.
    pub fail_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl LinkRecord {
    pub fn new(
        url: impl Into<String>,
        parent: ParentRef,
        entity_field: impl Into<String>,
        entity_langcode: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            url: url.into(),
            parent,
            entity_field: entity_field.into(),
            entity_langcode: entity_langcode.into(),
            status: None,
            fail_count: 0,
            last_checked: None,
        }
    }

    /// Same URL in the same field, language and content.
    pub fn same_occurrence(&self, other: &LinkRecord) -> bool {
        self.url == other.url
            && self.parent == other.parent
            && self.entity_field == other.entity_field
            && self.entity_langcode == other.entity_langcode
    }
}

/// Storage for link records.
///
/// Errors are reported as `anyhow::Error`; the services wrap them in
/// [`crate::Error::Storage`] and treat them as retryable.
#[async_trait]
pub trait LinkIndex: Send + Sync {
    /// Persists a new record and returns it with its id set.
    async fn create(&self, record: LinkRecord) -> anyhow::Result<LinkRecord>;

    /// Overwrites the stored record with the same id.
    async fn update(&self, record: &LinkRecord) -> anyhow::Result<()>;

    /// Records of one owner, optionally limited to one field.
    async fn load_by_owner(
        &self,
        parent: &ParentRef,
        field: Option<&str>,
    ) -> anyhow::Result<Vec<LinkRecord>>;

    /// Up to `limit` records with an id greater than `after`, in id order.
    async fn load_page(
        &self,
        after: Option<LinkId>,
        limit: usize,
    ) -> anyhow::Result<Vec<LinkRecord>>;

    /// Deletes the given records as one unit. Returns how many existed.
    async fn delete(&self, ids: &[LinkId]) -> anyhow::Result<usize>;

    async fn count_remaining(&self) -> anyhow::Result<usize>;
}

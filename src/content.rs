// src/content.rs
// =============================================================================
// The owning-content side of the system.
//
// Link records point back at the content they were found in. The core never
// knows what that content is (a page, a product, a comment); it only needs:
// - the field values per language
// - per-field scan settings (scan on/off, which extractor)
// - whether the content still exists
//
// ContentRecord is a plain in-memory implementation, handy for hosts that
// already hold their content as data and for tests.
// =============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Identifies the content a link belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentRef {
    pub entity_type_id: String,
    pub entity_id: String,
}

impl ParentRef {
    pub fn new(entity_type_id: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type_id: entity_type_id.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type_id, self.entity_id)
    }
}

/// Per-field link scanning settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Whether the field is scanned at all.
    pub scan: bool,
    /// Extractor id, see [`crate::extract::ExtractorRegistry`].
    pub extractor: String,
}

impl FieldConfig {
    pub fn scanned(extractor: impl Into<String>) -> Self {
        Self {
            scan: true,
            extractor: extractor.into(),
        }
    }

    pub fn ignored() -> Self {
        Self {
            scan: false,
            extractor: String::new(),
        }
    }
}

pub trait OwningContent: Send + Sync {
    fn parent(&self) -> ParentRef;

    /// False once the content has been deleted.
    fn exists(&self) -> bool;

    fn field_names(&self) -> Vec<String>;

    /// Markup values of a field in one language. Unknown fields or
    /// languages have no values.
    fn field(&self, field_name: &str, langcode: &str) -> Vec<String>;

    fn field_config(&self, field_name: &str) -> Option<FieldConfig>;

    /// Languages the content has values in.
    fn langcodes(&self) -> Vec<String>;

    /// URL of the content itself; relative links in its fields resolve
    /// against it. None means "use the site URL".
    fn base_path(&self) -> Option<String> {
        None
    }
}

/// Loads owning content by reference.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// `Ok(None)` when the content is gone.
    async fn load(&self, parent: &ParentRef) -> anyhow::Result<Option<Arc<dyn OwningContent>>>;
}

/// Content held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub parent: ParentRef,
    pub deleted: bool,
    pub base_path: Option<String>,
    /// field name -> langcode -> values
    pub fields: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub field_configs: BTreeMap<String, FieldConfig>,
}

impl ContentRecord {
    pub fn new(parent: ParentRef) -> Self {
        Self {
            parent,
            deleted: false,
            base_path: None,
            fields: BTreeMap::new(),
            field_configs: BTreeMap::new(),
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    /// Sets the values of a field in one language.
    pub fn with_field(
        mut self,
        field_name: impl Into<String>,
        langcode: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        self.fields
            .entry(field_name.into())
            .or_default()
            .insert(langcode.into(), values);
        self
    }

    pub fn with_field_config(mut self, field_name: impl Into<String>, config: FieldConfig) -> Self {
        self.field_configs.insert(field_name.into(), config);
        self
    }
}

impl OwningContent for ContentRecord {
    fn parent(&self) -> ParentRef {
        self.parent.clone()
    }

    fn exists(&self) -> bool {
        !self.deleted
    }

    fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fields.keys().cloned().collect();
        for name in self.field_configs.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn field(&self, field_name: &str, langcode: &str) -> Vec<String> {
        self.fields
            .get(field_name)
            .and_then(|by_lang| by_lang.get(langcode))
            .cloned()
            .unwrap_or_default()
    }

    fn field_config(&self, field_name: &str) -> Option<FieldConfig> {
        self.field_configs.get(field_name).cloned()
    }

    fn langcodes(&self) -> Vec<String> {
        let mut langcodes: Vec<String> = self
            .fields
            .values()
            .flat_map(|by_lang| by_lang.keys().cloned())
            .collect();
        langcodes.sort();
        langcodes.dedup();
        langcodes
    }

    fn base_path(&self) -> Option<String> {
        self.base_path.clone()
    }
}

/// A ContentSource backed by a map of [`ContentRecord`]s.
#[derive(Default)]
pub struct MemoryContentSource {
    records: tokio::sync::RwLock<HashMap<ParentRef, Arc<ContentRecord>>>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: ContentRecord) {
        self.records
            .write()
            .await
            .insert(record.parent.clone(), Arc::new(record));
    }

    pub async fn remove(&self, parent: &ParentRef) -> Option<Arc<ContentRecord>> {
        self.records.write().await.remove(parent)
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn load(&self, parent: &ParentRef) -> anyhow::Result<Option<Arc<dyn OwningContent>>> {
        let records = self.records.read().await;
        Ok(records
            .get(parent)
            .map(|record| Arc::clone(record) as Arc<dyn OwningContent>))
    }
}

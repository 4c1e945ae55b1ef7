// src/service.rs
// =============================================================================
// The link extraction service.
//
// This is where the pieces meet:
//   field values --(extractor)--> raw URLs --(resolve + classify)--> links
//
// Main operations:
// - get_links: filter a list of raw URLs down to the links worth tracking
// - extract_from_field / extract_from_entity: scan content
// - save_links: persist newly found links
// - is_link_exists: is a persisted link still in its content?
//
// A note on the blacklist: get_links drops blacklisted URLs, but
// is_link_exists ignores the blacklist on purpose. Editing the blacklist
// must not make already-recorded links look like they vanished from their
// content; only the link-type filter applies there.
// =============================================================================

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::content::{ContentSource, OwningContent};
use crate::error::{Error, Result};
use crate::extract::ExtractorRegistry;
use crate::index::{LinkIndex, LinkRecord};
use crate::urls::Classifier;

pub struct LinkExtractorService {
    settings: Settings,
    classifier: Classifier,
    registry: ExtractorRegistry,
    contents: Arc<dyn ContentSource>,
    index: Arc<dyn LinkIndex>,
}

impl LinkExtractorService {
    pub fn new(
        settings: Settings,
        contents: Arc<dyn ContentSource>,
        index: Arc<dyn LinkIndex>,
    ) -> Self {
        let classifier = Classifier::from_settings(&settings);
        Self {
            settings,
            classifier,
            registry: ExtractorRegistry::default(),
            contents,
            index,
        }
    }

    /// Replaces the built-in extractor registry.
    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Swaps in new settings; the classifier is rebuilt from them.
    pub fn set_settings(&mut self, settings: Settings) {
        self.classifier = Classifier::from_settings(&settings);
        self.settings = settings;
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub(crate) fn index(&self) -> &Arc<dyn LinkIndex> {
        &self.index
    }

    pub(crate) fn contents(&self) -> &Arc<dyn ContentSource> {
        &self.contents
    }

    // Filters raw URLs down to the links that should be tracked
    //
    // Parameters:
    //   urls: raw URL strings as found in content (bytes are accepted so
    //         callers can pass through unvalidated input)
    //   base_path: what relative URLs resolve against; the site URL if None
    //
    // Returns: resolved URLs, deduplicated, in order of first occurrence.
    // Unsupported, blacklisted and disallowed link types are dropped.
    pub fn get_links<I, S>(&self, urls: I, base_path: Option<&str>) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let base = base_path.unwrap_or_else(|| self.classifier.site_url());
        filter_links(&self.classifier, urls, base)
    }

    /// Runs the field's extractor over its values in one language and
    /// filters the result through [`Self::get_links`].
    ///
    /// Fields that are missing or not scan-enabled yield nothing.
    pub fn extract_from_field(
        &self,
        content: &dyn OwningContent,
        field: &str,
        langcode: &str,
    ) -> Vec<String> {
        let Some(raw) = self.extract_raw(content, field, langcode) else {
            return Vec::new();
        };
        let base = self.base_for(content);
        filter_links(&self.classifier, raw, &base)
    }

    /// Unsaved link records for every scan-enabled field and language.
    pub fn extract_from_entity(&self, content: &dyn OwningContent) -> Vec<LinkRecord> {
        let parent = content.parent();
        let langcodes = content.langcodes();
        let mut records = Vec::new();

        for field in content.field_names() {
            if !self.is_scanned(content, &field) {
                continue;
            }
            for langcode in &langcodes {
                for url in self.extract_from_field(content, &field, langcode) {
                    records.push(LinkRecord::new(
                        url,
                        parent.clone(),
                        field.as_str(),
                        langcode.as_str(),
                    ));
                }
            }
        }

        debug!(parent = %parent, links = records.len(), "extracted links from content");
        records
    }

    /// Creates the records that are not in the index yet.
    ///
    /// Returns the newly created records; existing occurrences are left
    /// alone, so saving the same extraction twice creates nothing.
    pub async fn save_links(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>> {
        let mut created: Vec<LinkRecord> = Vec::new();

        for record in records {
            let existing = self
                .index
                .load_by_owner(&record.parent, Some(&record.entity_field))
                .await
                .map_err(Error::Storage)?;

            let known = existing.iter().any(|e| e.same_occurrence(&record))
                || created.iter().any(|c| c.same_occurrence(&record));
            if known {
                continue;
            }

            let saved = self.index.create(record).await.map_err(Error::Storage)?;
            created.push(saved);
        }

        if !created.is_empty() {
            info!(created = created.len(), "saved new links");
        }
        Ok(created)
    }

    /// Whether a persisted link still appears in its owning content.
    ///
    /// Content is loaded fresh on every call. Missing or deleted content
    /// means the link does not exist.
    pub async fn is_link_exists(&self, link: &LinkRecord) -> Result<bool> {
        let content = self
            .contents
            .load(&link.parent)
            .await
            .map_err(Error::ContentSource)?;

        match content {
            Some(content) if content.exists() => Ok(self.link_in_content(content.as_ref(), link)),
            _ => {
                debug!(parent = %link.parent, url = %link.url, "owning content is gone");
                Ok(false)
            }
        }
    }

    /// Synchronous half of [`Self::is_link_exists`], for content already in hand.
    pub fn link_in_content(&self, content: &dyn OwningContent, link: &LinkRecord) -> bool {
        let Some(raw) = self.extract_raw(content, &link.entity_field, &link.entity_langcode) else {
            return false;
        };

        let base = self.base_for(content);
        let classifier = self.classifier.without_blacklist();
        let wanted = classifier.classify(&link.url, &base);
        if !wanted.kept {
            return false;
        }

        filter_links(&classifier, raw, &base).contains(&wanted.url)
    }

    /// The content's own URL, or the site URL when it has none.
    pub(crate) fn base_for(&self, content: &dyn OwningContent) -> String {
        content
            .base_path()
            .unwrap_or_else(|| self.classifier.site_url().to_string())
    }

    pub(crate) fn is_scanned(&self, content: &dyn OwningContent, field: &str) -> bool {
        content.field_config(field).map(|c| c.scan).unwrap_or(false)
    }

    // Raw URLs of one field/language, or None when the field is not scanned
    fn extract_raw(
        &self,
        content: &dyn OwningContent,
        field: &str,
        langcode: &str,
    ) -> Option<Vec<String>> {
        let config = content.field_config(field).filter(|c| c.scan)?;
        let values = content.field(field, langcode);
        Some(self.registry.extract(&config.extractor, &values, &self.settings.extract))
    }
}

// Resolve, classify, keep, dedupe
fn filter_links<I, S>(classifier: &Classifier, urls: I, base: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for raw in urls {
        let classified = match classifier.classify_bytes(raw.as_ref(), base) {
            Ok(classified) => classified,
            Err(e) => {
                warn!(error = %e, "skipping URL");
                continue;
            }
        };
        if classified.kept && seen.insert(classified.url.clone()) {
            links.push(classified.url);
        }
    }

    links
}

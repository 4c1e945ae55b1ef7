// src/extract/mod.rs
// =============================================================================
// This module turns field values into raw link strings.
//
// Submodules:
// - html: anchors, media, embeds, objects, iframes and images in HTML
// - markdown: links and images in Markdown (plus any raw HTML inside it)
// - link: link fields, where the value already is the URL
//
// Each field names its extractor by id in its FieldConfig. The registry maps
// that id to a plain function, so picking an extractor is a HashMap lookup.
// =============================================================================

mod html;
mod link;
mod markdown;

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::config::ExtractSettings;

pub use html::extract_html_links;
pub use link::extract_link_field;
pub use markdown::extract_markdown_links;

pub const HTML_LINK_EXTRACTOR: &str = "html_link_extractor";
pub const LINK_LINK_EXTRACTOR: &str = "link_link_extractor";
pub const MARKDOWN_LINK_EXTRACTOR: &str = "markdown_link_extractor";

/// An extractor reads one field value and returns the raw URLs in it.
pub type ExtractFn = fn(&str, &ExtractSettings) -> Vec<String>;

#[derive(Debug, Clone)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, ExtractFn>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(HTML_LINK_EXTRACTOR, extract_html_links);
        registry.register(LINK_LINK_EXTRACTOR, extract_link_field);
        registry.register(MARKDOWN_LINK_EXTRACTOR, extract_markdown_links);
        registry
    }
}

impl ExtractorRegistry {
    /// A registry with no extractors at all.
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Adds or replaces the extractor for `id`.
    pub fn register(&mut self, id: impl Into<String>, extractor: ExtractFn) {
        self.extractors.insert(id.into(), extractor);
    }

    pub fn get(&self, id: &str) -> Option<ExtractFn> {
        self.extractors.get(id).copied()
    }

    /// Runs extractor `id` over every value of a field.
    ///
    /// Unknown ids yield nothing; a field pointing at a removed extractor
    /// must not break scanning of the rest of the content.
    pub fn extract(&self, id: &str, values: &[String], settings: &ExtractSettings) -> Vec<String> {
        let Some(extractor) = self.get(id) else {
            warn!(extractor = id, "unknown link extractor, skipping field");
            return Vec::new();
        };

        let urls = values
            .iter()
            .flat_map(|value| extractor(value, settings))
            .collect();
        unique(urls)
    }
}

// Drops duplicates, keeping the first occurrence of each URL
pub(crate) fn unique(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

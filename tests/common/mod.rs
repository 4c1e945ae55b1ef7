// tests/common/mod.rs
// =============================================================================
// Shared fixtures for the integration tests.
// =============================================================================

#![allow(dead_code)]

use std::sync::Arc;

use linkchecker::content::{ContentRecord, FieldConfig, MemoryContentSource, ParentRef};
use linkchecker::extract::HTML_LINK_EXTRACTOR;
use linkchecker::index::MemoryLinkIndex;
use linkchecker::{LinkExtractorService, LinkTypes, Settings};

/// Site URL under the default settings.
pub const SITE_URL: &str = "http://localhost";

pub struct Harness {
    pub contents: Arc<MemoryContentSource>,
    pub index: Arc<MemoryLinkIndex>,
    pub service: LinkExtractorService,
}

pub fn harness(settings: Settings) -> Harness {
    let contents = Arc::new(MemoryContentSource::new());
    let index = Arc::new(MemoryLinkIndex::new());
    let service = LinkExtractorService::new(settings, contents.clone(), index.clone());
    Harness {
        contents,
        index,
        service,
    }
}

pub fn settings(blacklist: &str, types: LinkTypes) -> Settings {
    let mut settings = Settings {
        check_links_types: types,
        ..Settings::default()
    };
    settings.check.disable_link_check_for_urls = blacklist.to_string();
    settings
}

/// A node with a scanned HTML body in English.
pub fn node(id: &str, body: &str) -> ContentRecord {
    ContentRecord::new(ParentRef::new("node", id))
        .with_field("body", "en", vec![body.to_string()])
        .with_field_config("body", FieldConfig::scanned(HTML_LINK_EXTRACTOR))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

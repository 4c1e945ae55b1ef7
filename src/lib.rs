// src/lib.rs
// =============================================================================
// linkchecker: finds the links embedded in content fields, decides which of
// them are worth tracking, and keeps the persisted link index in step with
// the content.
//
// The flow:
// 1. extract: pull raw URLs out of field markup (HTML, Markdown, link fields)
// 2. urls: resolve relative URLs and classify them (internal, external,
//    blacklisted, unsupported)
// 3. service: filter, save and re-verify links against their content
// 4. cleanup: delete records whose link is no longer in the content
// 5. checker: check persisted links over HTTP
//
// Storage and content loading belong to the host application; it plugs
// them in through the LinkIndex and ContentSource traits.
// =============================================================================

pub mod checker; // src/checker/ - HTTP liveness checks
pub mod cleanup; // src/cleanup/ - stale link removal
pub mod config; // src/config.rs - settings
pub mod content; // src/content.rs - owning content traits
pub mod error; // src/error.rs - crate error type
pub mod extract; // src/extract/ - per-format URL extractors
pub mod index; // src/index/ - link records and their storage
pub mod service; // src/service.rs - the link extraction service
pub mod urls; // src/urls/ - resolution and classification

pub use checker::{Fetcher, HttpFetcher, LinkChecker, LinkCheckResult, LinkStatus};
pub use cleanup::{BatchProgress, CleanUpReport, LinkCleanUp, RemoveAllBatch};
pub use config::{LinkTypes, Settings};
pub use content::{
    ContentRecord, ContentSource, FieldConfig, MemoryContentSource, OwningContent, ParentRef,
};
pub use error::{Error, Result};
pub use extract::ExtractorRegistry;
pub use index::{LinkId, LinkIndex, LinkRecord, MemoryLinkIndex};
pub use service::LinkExtractorService;
pub use urls::{Classifier, LinkType};

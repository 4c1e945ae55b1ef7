// src/config.rs
// =============================================================================
// Linkchecker settings.
//
// The host application hands us its configuration as JSON. Keys follow the
// dotted names the CMS uses (extract.from_a, check.disable_link_check_for_urls,
// ...), which map onto nested structs here. Every field has a default, so a
// partial document like {"base_path": "example.org"} is valid.
//
// Rust concepts:
// - #[serde(default)]: missing keys fall back to Default::default()
// - Enums with rename_all: "internal" / "external" / "all" in JSON
// =============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::urls::LinkType;

/// Which element categories the HTML extractor visits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// `<a>` and `<area>` href
    pub from_a: bool,
    pub from_audio: bool,
    pub from_embed: bool,
    pub from_iframe: bool,
    pub from_img: bool,
    pub from_object: bool,
    pub from_video: bool,
}

impl Default for ExtractSettings {
    // Only hyperlinks are scanned out of the box, media is opt-in.
    fn default() -> Self {
        Self {
            from_a: true,
            from_audio: false,
            from_embed: false,
            from_iframe: false,
            from_img: false,
            from_object: false,
            from_video: false,
        }
    }
}

impl ExtractSettings {
    /// Every category enabled.
    pub fn all() -> Self {
        Self {
            from_a: true,
            from_audio: true,
            from_embed: true,
            from_iframe: true,
            from_img: true,
            from_object: true,
            from_video: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Newline-delimited substrings; matching URLs are never checked.
    pub disable_link_check_for_urls: String,
    /// How many liveness requests may be in flight at once.
    pub concurrency: usize,
    /// Per-request timeout for liveness checks, in seconds.
    pub timeout_secs: u64,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            disable_link_check_for_urls: "example.com\nexample.net\nexample.org".to_string(),
            concurrency: 50,
            timeout_secs: 30,
        }
    }
}

/// Which link types are tracked: `internal`, `external` or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTypes {
    #[default]
    All,
    External,
    Internal,
}

impl LinkTypes {
    /// Blacklisted and unsupported links are never permitted.
    pub fn permits(self, link_type: LinkType) -> bool {
        match (self, link_type) {
            (LinkTypes::All, LinkType::Internal | LinkType::External) => true,
            (LinkTypes::Internal, LinkType::Internal) => true,
            (LinkTypes::External, LinkType::External) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub extract: ExtractSettings,
    pub check: CheckSettings,
    pub check_links_types: LinkTypes,
    /// Scheme used to build the site URL, including "://".
    pub default_url_scheme: String,
    /// Host plus optional sub-directory of the site, e.g. "example.org/cms".
    pub base_path: String,
    /// Page size of the bulk removal job.
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extract: ExtractSettings::default(),
            check: CheckSettings::default(),
            check_links_types: LinkTypes::default(),
            default_url_scheme: "http://".to_string(),
            base_path: "localhost".to_string(),
            batch_size: 50,
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// The site's own URL: scheme + host + base directory, no trailing slash.
    ///
    /// Example: "http://" + "example.org/cms/" -> "http://example.org/cms"
    pub fn site_url(&self) -> String {
        let scheme = self.default_url_scheme.trim_end_matches("://");
        let scheme = scheme.trim_end_matches(':');
        let host_and_path = self.base_path.trim_start_matches('/').trim_end_matches('/');
        format!("{}://{}", scheme, host_and_path)
    }

    /// Blacklist patterns, one per non-empty line.
    pub fn blacklist_patterns(&self) -> Vec<String> {
        self.check
            .disable_link_check_for_urls
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// src/urls/classify.rs
// =============================================================================
// Decides what kind of link a URL string is.
//
// Every URL falls into exactly one bucket:
// - unsupported: empty, mailto:, javascript:, data:, tel:, too long, or
//   anything that does not resolve to an http(s) URL
// - blacklisted: contains one of the configured substrings
// - internal: same scheme + host + port as the site
// - external: everything else
//
// Only internal/external links permitted by the configured link types are
// kept. Classification is a pure function of its inputs.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Origin, Url};

use super::resolve::resolve;
use crate::config::{LinkTypes, Settings};
use crate::error::{Error, Result};

/// Longest URL the link index can store.
pub const MAX_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Internal,
    External,
    Blacklisted,
    Unsupported,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkType::Internal => "internal",
            LinkType::External => "external",
            LinkType::Blacklisted => "blacklisted",
            LinkType::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Outcome of classifying one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// The resolved (absolute) form of the input.
    pub url: String,
    pub link_type: LinkType,
    /// Whether the link should be tracked under the current settings.
    pub kept: bool,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    site_url: String,
    site_origin: Option<Origin>,
    blacklist: Vec<String>,
    allowed: LinkTypes,
}

impl Classifier {
    pub fn new(site_url: impl Into<String>, blacklist: Vec<String>, allowed: LinkTypes) -> Self {
        let site_url = site_url.into();
        let site_origin = Url::parse(&site_url).ok().map(|url| url.origin());
        Self {
            site_url,
            site_origin,
            blacklist,
            allowed,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.site_url(),
            settings.blacklist_patterns(),
            settings.check_links_types,
        )
    }

    /// Same site and link types, but nothing is blacklisted.
    ///
    /// Used when re-checking links that are already persisted: a blacklist
    /// edit must not make recorded links look like they disappeared.
    pub fn without_blacklist(&self) -> Self {
        Self {
            blacklist: Vec::new(),
            ..self.clone()
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    /// Plain, case-sensitive substring match: "example.com" also matches
    /// "example.community".
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.blacklist.iter().any(|pattern| url.contains(pattern.as_str()))
    }

    /// Classifies `raw` after resolving it against `base_path`.
    pub fn classify(&self, raw: &str, base_path: &str) -> Classified {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return self.finish(String::new(), LinkType::Unsupported);
        }

        let resolved = resolve(trimmed, base_path, &self.site_url);
        if resolved.chars().count() > MAX_URL_LENGTH {
            return self.finish(resolved, LinkType::Unsupported);
        }

        let link_type = match self.http_origin(&resolved) {
            None => LinkType::Unsupported,
            Some(_) if self.is_blacklisted(&resolved) => LinkType::Blacklisted,
            Some(origin) if Some(&origin) == self.site_origin.as_ref() => LinkType::Internal,
            Some(_) => LinkType::External,
        };

        self.finish(resolved, link_type)
    }

    /// Like [`Classifier::classify`], for input that may not be text.
    pub fn classify_bytes(&self, raw: &[u8], base_path: &str) -> Result<Classified> {
        let raw = std::str::from_utf8(raw)
            .map_err(|e| Error::InvalidUrl(format!("not valid UTF-8: {}", e)))?;
        Ok(self.classify(raw, base_path))
    }

    fn finish(&self, url: String, link_type: LinkType) -> Classified {
        Classified {
            url,
            link_type,
            kept: self.allowed.permits(link_type),
        }
    }

    // Origin of an http(s) URL, or None for anything we cannot check.
    fn http_origin(&self, resolved: &str) -> Option<Origin> {
        let candidate = if resolved.starts_with("//") {
            let scheme = self.site_url.split("://").next().unwrap_or("http");
            format!("{}:{}", scheme, resolved)
        } else {
            resolved.to_string()
        };

        // Editors paste URLs with raw spaces; encode them so parsing succeeds.
        let url = Url::parse(&candidate.replace(' ', "%20")).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        Some(url.origin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://host/folder1/folder2";

    fn classifier(blacklist: &[&str], allowed: LinkTypes) -> Classifier {
        Classifier::new(
            "http://host",
            blacklist.iter().map(|s| s.to_string()).collect(),
            allowed,
        )
    }

    #[test]
    fn test_unsupported_inputs() {
        let c = classifier(&[], LinkTypes::All);
        for url in [
            "",
            "   ",
            "mailto:test@example.com",
            "javascript:foo()",
            "data:image/png;base64,iVBORw0KGgo=",
            "tel:+123456",
            "ftp://files.example.org/a.zip",
        ] {
            let result = c.classify(url, BASE);
            assert_eq!(result.link_type, LinkType::Unsupported, "{}", url);
            assert!(!result.kept);
        }
    }

    #[test]
    fn test_http_is_never_unsupported() {
        let c = classifier(&[], LinkTypes::All);
        for url in ["http://www.msn.de/", "https://x", "HTTP://LOUD.example/"] {
            assert_ne!(c.classify(url, BASE).link_type, LinkType::Unsupported);
        }
    }

    #[test]
    fn test_overlong_url_is_unsupported() {
        let c = classifier(&[], LinkTypes::All);
        let prefix = "https://httpbin.org/anything/";
        let fits = format!("{}{}", prefix, "x".repeat(MAX_URL_LENGTH - prefix.len()));
        let too_long = format!("{}yz", fits);

        assert_eq!(c.classify(&fits, BASE).link_type, LinkType::External);
        assert_eq!(c.classify(&too_long, BASE).link_type, LinkType::Unsupported);
    }

    #[test]
    fn test_internal_vs_external() {
        let c = classifier(&[], LinkTypes::All);
        assert_eq!(c.classify("../a.png", BASE).link_type, LinkType::Internal);
        assert_eq!(c.classify("http://host:80/a", BASE).link_type, LinkType::Internal);
        assert_eq!(c.classify("//host/a", BASE).link_type, LinkType::Internal);
        assert_eq!(c.classify("https://host/a", BASE).link_type, LinkType::External);
        assert_eq!(c.classify("http://host:8080/a", BASE).link_type, LinkType::External);
        assert_eq!(c.classify("http://www.adobe.com/", BASE).link_type, LinkType::External);
    }

    #[test]
    fn test_relative_url_is_resolved() {
        let c = classifier(&[], LinkTypes::Internal);
        let result = c.classify("./foo2/bar2", BASE);
        assert_eq!(result.url, "http://host/folder1/foo2/bar2");
        assert!(result.kept);
    }

    #[test]
    fn test_blacklist_is_substring_match() {
        let c = classifier(&["example.com"], LinkTypes::All);
        let hit = c.classify("http://example.community/page", BASE);
        assert_eq!(hit.link_type, LinkType::Blacklisted);
        assert!(!hit.kept);

        // Case-sensitive.
        assert_eq!(c.classify("http://EXAMPLE.COM/", BASE).link_type, LinkType::External);
    }

    #[test]
    fn test_without_blacklist_keeps_link() {
        let c = classifier(&["example.com"], LinkTypes::All);
        let result = c.without_blacklist().classify("https://example.com/existing", BASE);
        assert_eq!(result.link_type, LinkType::External);
        assert!(result.kept);
    }

    #[test]
    fn test_allowed_types_filter() {
        let internal = classifier(&[], LinkTypes::Internal);
        assert!(!internal.classify("http://www.msn.de/", BASE).kept);
        assert!(internal.classify("/foo", BASE).kept);

        let external = classifier(&[], LinkTypes::External);
        assert!(external.classify("http://www.msn.de/", BASE).kept);
        assert!(!external.classify("/foo", BASE).kept);
    }

    #[test]
    fn test_framework_path_is_internal() {
        let c = classifier(&[], LinkTypes::All);
        let result = c.classify("internal:/node/add", BASE);
        assert_eq!(result.url, "http://host/node/add");
        assert_eq!(result.link_type, LinkType::Internal);
    }

    #[test]
    fn test_space_in_path_is_classified() {
        let c = classifier(&[], LinkTypes::All);
        let result = c.classify("http://other.org/foo bar/is_valid-hack.test", BASE);
        assert_eq!(result.link_type, LinkType::External);
        assert_eq!(result.url, "http://other.org/foo bar/is_valid-hack.test");
    }

    #[test]
    fn test_non_utf8_input_is_invalid() {
        let c = classifier(&[], LinkTypes::All);
        let err = c.classify_bytes(&[0x68, 0xff, 0xfe], BASE).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(c.classify_bytes(b"https://x", BASE).unwrap().kept);
    }
}

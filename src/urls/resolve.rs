// src/urls/resolve.rs
// =============================================================================
// Resolves relative URL references against a base path.
//
// Why not Url::join?
// - Url::join percent-encodes and normalizes ("foo bar" -> "foo%20bar",
//   "http://x" -> "http://x/"), but link records must keep the exact text
//   an editor wrote so later comparisons match byte for byte.
// - The site may live in a sub-directory ("http://host/cms"); a leading "/"
//   means the site root, not the host root.
//
// So we do RFC 3986 style segment merging on plain strings instead:
//   base = "http://host/folder1/folder2"   (folder2 is the "document")
//   "../foo1/test.png"     -> "http://host/foo1/test.png"
//   "./foo2/bar2"          -> "http://host/folder1/foo2/bar2"
//   "../foo3/../foo4/foo5" -> "http://host/foo4/foo5"
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;

// Constant pattern, known to be valid.
static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Path-prefix tokens the CMS uses for its own URIs. They are replaced by the
/// site URL instead of being treated as a scheme.
const FRAMEWORK_TOKENS: [&str; 4] = ["internal:", "base:", "entity:", "route:"];

/// Returns true for "http:...", "mailto:...", "internal:..." and friends.
pub fn has_scheme(raw: &str) -> bool {
    SCHEME.is_match(raw)
}

/// Resolves `raw` against `base_path`.
///
/// `site_url` is the site root (scheme + host + optional sub-directory, no
/// trailing slash). Already-absolute URLs and scheme-relative `//host/...`
/// references come back unchanged.
pub fn resolve(raw: &str, base_path: &str, site_url: &str) -> String {
    let raw = raw.trim();

    if let Some(payload) = strip_framework_token(raw) {
        return format!("{}/{}", site_url, payload.trim_start_matches('/'));
    }

    if raw.starts_with("//") || has_scheme(raw) {
        return raw.to_string();
    }

    let base = base_path.trim();
    let base_without_fragment = base.split('#').next().unwrap_or(base);

    if raw.is_empty() {
        return base_without_fragment.to_string();
    }
    if raw.starts_with('#') {
        return format!("{}{}", base_without_fragment, raw);
    }
    let base_without_query = base_without_fragment
        .split('?')
        .next()
        .unwrap_or(base_without_fragment);
    if raw.starts_with('?') {
        return format!("{}{}", base_without_query, raw);
    }

    let (root, base_dir) = split_base(base_without_query, site_url);

    // Query and fragment of the reference ride along untouched.
    let suffix_at = raw.find(|c: char| c == '?' || c == '#').unwrap_or(raw.len());
    let (path, suffix) = raw.split_at(suffix_at);

    let mut segments: Vec<&str> = if path.starts_with('/') {
        Vec::new()
    } else {
        let mut dir: Vec<&str> = base_dir.trim_start_matches('/').split('/').collect();
        // The last base segment is the document itself.
        dir.pop();
        dir
    };

    let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        match *part {
            ".." => {
                segments.pop();
                if i == last {
                    segments.push("");
                }
            }
            "." => {
                if i == last {
                    segments.push("");
                }
            }
            other => segments.push(other),
        }
    }

    format!("{}/{}{}", root, segments.join("/"), suffix)
}

fn strip_framework_token(raw: &str) -> Option<&str> {
    FRAMEWORK_TOKENS
        .iter()
        .find_map(|token| raw.strip_prefix(token))
}

// Splits a base into (root, path below the root).
//
// The root is the site URL when the base lives under it, otherwise the
// base's own "scheme://authority". A base without a scheme is a path on
// the site.
fn split_base<'a>(base: &'a str, site_url: &'a str) -> (&'a str, &'a str) {
    if let Some(rest) = base.strip_prefix(site_url) {
        if rest.is_empty() || rest.starts_with('/') {
            return (site_url, rest);
        }
    }

    if let Some(scheme_end) = base.find("://") {
        let authority_start = scheme_end + 3;
        let path_start = base[authority_start..]
            .find('/')
            .map(|i| authority_start + i)
            .unwrap_or(base.len());
        return base.split_at(path_start);
    }

    (site_url, base)
}

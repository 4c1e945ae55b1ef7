// src/extract/markdown.rs
// =============================================================================
// This module extracts links from Markdown field values.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Is fast and memory-efficient (it's a streaming parser)
//
// Markdown can embed raw HTML, so every Html event is collected and run
// through the HTML extractor at the end. Links follow settings.from_a and
// images follow settings.from_img, same as their HTML counterparts.
// =============================================================================

use pulldown_cmark::{Event, LinkType, Parser, Tag};

use super::html::extract_html_links;
use super::unique;
use crate::config::ExtractSettings;

// Extracts link and image targets from Markdown text
//
// Example input:
//   "Check out [Rust](https://www.rust-lang.org)! ![logo](logo.png)"
//
// Example output (from_a and from_img enabled):
//   vec!["https://www.rust-lang.org", "logo.png"]
pub fn extract_markdown_links(markdown: &str, settings: &ExtractSettings) -> Vec<String> {
    let mut links = Vec::new();
    let mut raw_html = String::new();

    for event in Parser::new(markdown) {
        match event {
            // In pulldown-cmark 0.9, Link is Tag::Link(link_type, dest_url, title)
            Event::Start(Tag::Link(link_type, dest_url, _title)) => {
                // <user@example.com> autolinks have no scheme to check
                if settings.from_a && link_type != LinkType::Email {
                    links.push(dest_url.to_string());
                }
            }
            Event::Start(Tag::Image(_link_type, dest_url, _title)) => {
                if settings.from_img {
                    links.push(dest_url.to_string());
                }
            }
            Event::Html(html) => raw_html.push_str(&html),
            _ => {}
        }
    }

    if !raw_html.is_empty() {
        links.extend(extract_html_links(&raw_html, settings));
    }

    links.retain(|url| !url.trim().is_empty());
    unique(links)
}

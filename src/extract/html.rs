// src/extract/html.rs
// =============================================================================
// This module extracts link targets from HTML fragments.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever, so unclosed tags and stray attributes are
//   repaired the way a browser would, never rejected
//
// Which elements and attributes are read depends on ExtractSettings:
//   from_a      <a href>, <area href>
//   from_audio  <audio src>, nested <source src>, <track src>
//   from_embed  <embed src pluginurl pluginspage>
//   from_iframe <iframe src>
//   from_img    <img src longdesc>
//   from_object <object data codebase>, nested <param value>
//   from_video  <video poster src>, nested <source src>, <track src>
//
// Values come back exactly as written (entities decoded), without
// resolution. Resolving and classifying is the extraction service's job.
// =============================================================================

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::unique;
use crate::config::ExtractSettings;

// Selector::parse only fails on invalid CSS; these are constants known to be valid.
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a, area").unwrap());
static AUDIO: Lazy<Selector> = Lazy::new(|| Selector::parse("audio").unwrap());
static EMBED: Lazy<Selector> = Lazy::new(|| Selector::parse("embed").unwrap());
static IFRAME: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static OBJECT: Lazy<Selector> = Lazy::new(|| Selector::parse("object").unwrap());
static PARAM: Lazy<Selector> = Lazy::new(|| Selector::parse("param").unwrap());
static VIDEO: Lazy<Selector> = Lazy::new(|| Selector::parse("video").unwrap());
static MEDIA_CHILDREN: Lazy<Selector> = Lazy::new(|| Selector::parse("source, track").unwrap());

/// `<param name="...">` values that carry a URL.
const URL_PARAM_NAMES: [&str; 6] = ["archive", "filename", "href", "movie", "src", "url"];

// Extracts all link targets from an HTML fragment
//
// Parameters:
//   markup: the HTML to parse (a field value, not a full page)
//   settings: which element categories to look at
//
// Returns: deduplicated, non-blank attribute values in document order
//
// Example:
//   markup = "<a href='/docs'>Docs</a><img src='a.png'>"
//   settings.from_a = true, settings.from_img = false
//   result = ["/docs"]
pub fn extract_html_links(markup: &str, settings: &ExtractSettings) -> Vec<String> {
    if markup.trim().is_empty() {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(markup);
    let mut urls = Vec::new();

    if settings.from_a {
        for link in fragment.select(&ANCHORS) {
            push_attrs(link, &["href"], &mut urls);
        }
    }

    if settings.from_audio {
        for audio in fragment.select(&AUDIO) {
            push_attrs(audio, &["src"], &mut urls);
            for child in audio.select(&MEDIA_CHILDREN) {
                push_attrs(child, &["src"], &mut urls);
            }
        }
    }

    if settings.from_embed {
        for embed in fragment.select(&EMBED) {
            push_attrs(embed, &["src", "pluginurl", "pluginspage"], &mut urls);
        }
    }

    if settings.from_iframe {
        for iframe in fragment.select(&IFRAME) {
            push_attrs(iframe, &["src"], &mut urls);
        }
    }

    if settings.from_img {
        for img in fragment.select(&IMG) {
            push_attrs(img, &["src", "longdesc"], &mut urls);
        }
    }

    if settings.from_object {
        for object in fragment.select(&OBJECT) {
            push_attrs(object, &["data", "codebase"], &mut urls);
            for param in object.select(&PARAM) {
                if param_carries_url(param) {
                    push_attrs(param, &["value"], &mut urls);
                }
            }
        }
    }

    if settings.from_video {
        for video in fragment.select(&VIDEO) {
            push_attrs(video, &["poster", "src"], &mut urls);
            for child in video.select(&MEDIA_CHILDREN) {
                push_attrs(child, &["src"], &mut urls);
            }
        }
    }

    unique(urls)
}

// Reads the given attributes of an element, skipping missing and blank ones
fn push_attrs(element: ElementRef<'_>, attrs: &[&str], urls: &mut Vec<String>) {
    for attr in attrs {
        if let Some(value) = element.value().attr(attr) {
            let value = value.trim();
            if !value.is_empty() {
                urls.push(value.to_string());
            }
        }
    }
}

// <param name="movie" value="..."> or the older <param src="movie" value="...">
fn param_carries_url(param: ElementRef<'_>) -> bool {
    let element = param.value();
    let named = element
        .attr("name")
        .map(|name| URL_PARAM_NAMES.contains(&name))
        .unwrap_or(false);
    let movie_src = element.attr("src") == Some("movie");
    named || movie_src
}

// src/extract/link.rs
// Link fields store one URL per value, so there is nothing to parse.

use super::unique;
use crate::config::ExtractSettings;

pub fn extract_link_field(value: &str, _settings: &ExtractSettings) -> Vec<String> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    unique(vec![value.to_string()])
}

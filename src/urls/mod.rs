// src/urls/mod.rs
// =============================================================================
// URL handling: resolving relative references and classifying the result.
//
// Submodules:
// - resolve: relative reference -> absolute URL, string based
// - classify: internal / external / blacklisted / unsupported
// =============================================================================

mod classify;
mod resolve;

pub use classify::{Classified, Classifier, LinkType, MAX_URL_LENGTH};
pub use resolve::{has_scheme, resolve};

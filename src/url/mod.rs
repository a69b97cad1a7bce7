//! URL handling module for Ripple-Harvest
//!
//! This module provides URL canonicalization (the dedup key for the frontier),
//! host extraction and wildcard host matching.

mod canonicalize;
mod domain;
mod matcher;

// Re-export main functions
pub use canonicalize::{canonical_url, canonicalize};
pub use domain::{extract_domain, host_of};
pub use matcher::{matches_any, matches_wildcard};

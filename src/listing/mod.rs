//! Listing URL handling for Kotoba-Harvest
//!
//! This module turns user-supplied listing URLs into canonical listing keys,
//! builds per-page URLs from a key and an offset, and derives the stable file
//! stem each listing's records are stored under.

mod identity;
mod normalize;

// Re-export main functions
pub use identity::IdentityResolver;
pub use normalize::{normalize_listing_url, page_url};

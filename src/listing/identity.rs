use crate::ConfigError;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Length of the hash prefix used for listings the pattern does not match
const FALLBACK_HASH_LEN: usize = 12;

/// Length of the hash suffix appended to a matched stem
const SUFFIX_HASH_LEN: usize = 8;

/// Derives the file stem a listing's records are stored under
///
/// The stem is the first capture group of the configured pattern, with
/// hyphens replaced by underscores, followed by `_<hash prefix>` of the full
/// listing key. Two listings that share a slug therefore never share a file.
/// Listings the pattern does not match get `listing_<hash prefix>`. The same
/// key always maps to the same file.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    pattern: Regex,
}

impl IdentityResolver {
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
        Ok(Self { pattern })
    }

    /// Returns the file stem for a listing key
    ///
    /// # Examples
    ///
    /// ```
    /// use kotoba_harvest::listing::IdentityResolver;
    ///
    /// let resolver = IdentityResolver::new(r"novel/\d+/([^/]+)").unwrap();
    /// let stem = resolver.stem_for("https://jpdb.io/novel/5829/kino-no-tabi/vocabulary-list");
    /// assert!(stem.starts_with("kino_no_tabi_"));
    /// ```
    pub fn stem_for(&self, listing_key: &str) -> String {
        let matched = self
            .pattern
            .captures(listing_key)
            .and_then(|caps| caps.get(1))
            .map(|m| sanitize_stem(&m.as_str().replace('-', "_")))
            .filter(|stem| !stem.is_empty());

        match matched {
            Some(stem) => format!("{}_{}", stem, &key_digest(listing_key)[..SUFFIX_HASH_LEN]),
            None => fallback_stem(listing_key),
        }
    }
}

/// Keeps the stem usable as a file name on every platform
fn sanitize_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn key_digest(listing_key: &str) -> String {
    hex::encode(Sha256::digest(listing_key.as_bytes()))
}

fn fallback_stem(listing_key: &str) -> String {
    format!("listing_{}", &key_digest(listing_key)[..FALLBACK_HASH_LEN])
}

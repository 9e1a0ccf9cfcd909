use crate::HarvestError;
use url::Url;

/// Normalizes a listing URL into its canonical listing key
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject empty input
/// 2. Parse the URL; reject if malformed or not HTTP(S)
/// 3. Remove fragment and query (pagination is re-added per page)
/// 4. Remove trailing slashes from the path
/// 5. Append the listing suffix segment unless the path already ends with it
///
/// # Arguments
///
/// * `input` - The URL as supplied by the caller or the progress store
/// * `suffix` - The path segment every listing URL ends with
///
/// # Examples
///
/// ```
/// use kotoba_harvest::listing::normalize_listing_url;
///
/// let key = normalize_listing_url("https://jpdb.io/novel/5829/kino-no-tabi/", "vocabulary-list").unwrap();
/// assert_eq!(key, "https://jpdb.io/novel/5829/kino-no-tabi/vocabulary-list");
/// ```
pub fn normalize_listing_url(input: &str, suffix: &str) -> Result<String, HarvestError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(HarvestError::NoListing);
    }

    let mut url = Url::parse(input).map_err(|e| HarvestError::InvalidListing {
        url: input.to_string(),
        message: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(HarvestError::InvalidListing {
            url: input.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    url.set_fragment(None);
    url.set_query(None);

    let suffix = suffix.trim_matches('/');
    let path = url.path().trim_end_matches('/').to_string();
    let path = if path.ends_with(suffix) {
        path
    } else {
        format!("{}/{}", path, suffix)
    };
    url.set_path(&path);

    Ok(url.to_string())
}

/// Builds the URL of the listing page starting at `offset`
pub fn page_url(listing_key: &str, offset: u64) -> Result<Url, HarvestError> {
    let mut url = Url::parse(listing_key).map_err(|e| HarvestError::InvalidListing {
        url: listing_key.to_string(),
        message: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("offset", &offset.to_string());
    Ok(url)
}

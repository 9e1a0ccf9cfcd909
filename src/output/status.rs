//! Progress status report
//!
//! Shows which listings have been harvested and how far each one got.

use crate::storage::{ListingProgress, ProgressStore};
use crate::HarvestError;

/// Snapshot of a progress store
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStatus {
    pub listings: Vec<ListingProgress>,
    pub last_listing: Option<String>,
}

/// Reads every listing and the last listing pointer from a store
pub fn load_status(store: &dyn ProgressStore) -> Result<ProgressStatus, HarvestError> {
    Ok(ProgressStatus {
        listings: store.list_progress()?,
        last_listing: store.load_last_listing()?,
    })
}

/// Formats the status as plain text
pub fn format_status(status: &ProgressStatus) -> String {
    let mut out = String::new();

    out.push_str("=== Harvest Progress ===\n\n");

    if status.listings.is_empty() {
        out.push_str("No listings harvested yet.\n");
    } else {
        out.push_str(&format!("Listings ({}):\n", status.listings.len()));
        for entry in &status.listings {
            let marker = if status.last_listing.as_deref() == Some(entry.listing_key.as_str()) {
                "*"
            } else {
                "-"
            };
            out.push_str(&format!(
                "  {} {} (offset {})\n",
                marker, entry.listing_key, entry.last_offset
            ));
        }
    }

    if let Some(last) = &status.last_listing {
        out.push_str(&format!("\nLast listing: {}\n", last));
    }

    out
}

/// Prints the status to stdout
pub fn print_status(status: &ProgressStatus) {
    print!("{}", format_status(status));
}

//! Output module for everything derived from harvested data
//!
//! This module handles:
//! - Assembling flashcard decks from records files
//! - Reporting the progress of stored listings

mod deck;
mod status;

pub use deck::{
    average_popularity, build_deck, format_deck, format_meanings, DeckCard, DeckSummary,
    Popularity, DECK_COLUMNS,
};
pub use status::{format_status, load_status, print_status, ProgressStatus};

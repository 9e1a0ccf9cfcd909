//! Flashcard deck assembly
//!
//! This module turns a records file into a flashcard deck written in Anki's
//! plain-text import format: a few `#key:value` header lines followed by one
//! tab-separated note per record (word, reading, meanings, popularity).

use crate::storage::VocabularyRecord;
use crate::HarvestError;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Field names of every note, in column order
pub const DECK_COLUMNS: [&str; 4] = ["Word", "Reading", "Meanings", "AveragePopularity"];

/// Average of the numeric frequency values of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Popularity {
    /// Mean of the convertible values, rounded to 2 decimals
    Average(f64),
    /// No value converted to a number
    NoData,
}

impl fmt::Display for Popularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Average(value) if value.fract() == 0.0 => write!(f, "{:.1}", value),
            Self::Average(value) => write!(f, "{}", value),
            Self::NoData => write!(f, "No data"),
        }
    }
}

/// Averages the values of `tags` that parse as numbers
pub fn average_popularity(tags: &BTreeMap<String, String>) -> Popularity {
    let values: Vec<f64> = tags
        .values()
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect();

    if values.is_empty() {
        return Popularity::NoData;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Popularity::Average((mean * 100.0).round() / 100.0)
}

/// Renders meanings as an HTML ordered list
pub fn format_meanings(meanings: &[String]) -> String {
    if meanings.is_empty() {
        return "<i>No meanings available</i>".to_string();
    }

    let items: String = meanings
        .iter()
        .map(|m| format!("<li>{}</li>", m))
        .collect();
    format!("<ol>{}</ol>", items)
}

/// One note of the deck
#[derive(Debug, Clone, PartialEq)]
pub struct DeckCard {
    pub word: String,
    pub reading: String,
    pub meanings_html: String,
    pub popularity: Popularity,
}

impl DeckCard {
    pub fn from_record(record: &VocabularyRecord) -> Self {
        Self {
            word: record.word.clone(),
            reading: record.reading.clone(),
            meanings_html: format_meanings(&record.meanings),
            popularity: average_popularity(&record.frequency_tags),
        }
    }

    /// The card as one tab-separated line (without the newline)
    pub fn to_line(&self) -> String {
        [
            field(&self.word),
            field(&self.reading),
            field(&self.meanings_html),
            field(&self.popularity.to_string()),
        ]
        .join("\t")
    }
}

/// Tabs and line breaks would split the note
fn field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}

/// A deck that was written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSummary {
    pub deck_name: String,
    pub output_path: PathBuf,
    pub cards: usize,
}

/// Formats a complete deck file
pub fn format_deck(deck_name: &str, cards: &[DeckCard]) -> String {
    let mut out = String::new();

    out.push_str("#separator:tab\n");
    out.push_str("#html:true\n");
    out.push_str(&format!("#deck:{}\n", field(deck_name)));
    out.push_str(&format!("#columns:{}\n", DECK_COLUMNS.join("\t")));

    for card in cards {
        out.push_str(&card.to_line());
        out.push('\n');
    }

    out
}

/// Builds a deck from a records file
///
/// The deck is named after the input file's stem and written next to it as
/// `<stem>.txt` unless `output` is given.
///
/// # Arguments
///
/// * `input` - Records file produced by a crawl
/// * `output` - Optional destination of the deck file
///
/// # Returns
///
/// * `Ok(DeckSummary)` - Where the deck went and how many cards it holds
/// * `Err(HarvestError)` - The records file could not be read or parsed, or
///   the deck could not be written
pub fn build_deck(input: &Path, output: Option<&Path>) -> Result<DeckSummary, HarvestError> {
    let content = fs::read_to_string(input)?;
    let records: Vec<VocabularyRecord> = serde_json::from_str(&content)?;

    let deck_name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vocabulary".to_string());
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("txt"));

    let cards: Vec<DeckCard> = records.iter().map(DeckCard::from_record).collect();

    let mut file = File::create(&output_path)?;
    file.write_all(format_deck(&deck_name, &cards).as_bytes())?;

    tracing::info!(
        "Deck '{}' with {} cards saved to {}",
        deck_name,
        cards.len(),
        output_path.display()
    );

    Ok(DeckSummary {
        deck_name,
        output_path,
        cards: cards.len(),
    })
}

//! Vocabulary record extraction
//!
//! This module turns one parsed listing page into vocabulary records:
//! - Entry containers are located with a CSS selector
//! - The word and its ruby-annotated reading come from the first anchor
//! - Frequency tags come from a tooltip attribute on the tag element
//! - Meanings come from the block that follows the tag element
//!
//! Every field degrades to its empty value when the markup is missing a
//! piece; a malformed entry never costs the rest of the page.

use crate::config::MarkupConfig;
use crate::storage::VocabularyRecord;
use crate::ConfigError;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::BTreeMap;

/// Records found on one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Records in document order
    pub records: Vec<VocabularyRecord>,

    /// False when the page held no entries
    pub continuation: bool,
}

/// A listing markup dialect
pub trait Extractor {
    /// Extracts the records of a page whose first entry follows `offset`
    fn extract(&self, document: &Html, offset: u64) -> Extraction;

    /// Reads the total number of entries in the listing, if the page says
    fn total_entries(&self, document: &Html) -> Option<u64>;
}

/// How a text node inside the word anchor contributes to the reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextRole {
    /// Inside `<rt>`: the annotation itself
    Annotation,
    /// Inside `<rp>`: fallback parentheses, ignored
    Fallback,
    /// Base text: kana kept, kanji dropped
    Base,
}

/// Extractor for the default vocabulary list markup
///
/// ```html
/// <div class="entry">
///   <a href="/vocabulary/1/読む"><ruby>読<rt>よ</rt></ruby>む</a>
///   <div class="tag tooltip" data-tooltip="Novel:5.2 Manga:3.8">Top 5%</div>
///   <div>to read; to recite</div>
/// </div>
/// ```
#[derive(Debug, Clone)]
pub struct VocabularyListExtractor {
    entry: Selector,
    anchor: Selector,
    ruby: Selector,
    tag: Selector,
    tag_attribute: String,
    paragraph: Selector,
    caption: Regex,
}

impl VocabularyListExtractor {
    /// Builds an extractor from the markup configuration
    pub fn from_config(config: &MarkupConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            entry: selector(&config.entry_selector)?,
            anchor: selector("a")?,
            ruby: selector("ruby")?,
            tag: selector(&config.tag_selector)?,
            tag_attribute: config.tag_attribute.clone(),
            paragraph: selector("p")?,
            caption: Regex::new(&config.caption_pattern).map_err(|e| {
                ConfigError::InvalidPattern(format!("'{}': {}", config.caption_pattern, e))
            })?,
        })
    }

    fn extract_entry(&self, entry: ElementRef<'_>, sequence_id: u64) -> VocabularyRecord {
        let anchor = entry.select(&self.anchor).next();

        let word = anchor.map(visible_text).unwrap_or_default();
        let reading = anchor
            .map(|a| self.extract_reading(a))
            .unwrap_or_default();

        let tag = entry.select(&self.tag).next();
        let frequency_tags = tag
            .and_then(|t| t.value().attr(&self.tag_attribute))
            .map(parse_frequency_tags)
            .unwrap_or_default();
        let meanings = tag.map(extract_meanings).unwrap_or_default();

        VocabularyRecord {
            sequence_id,
            word,
            reading,
            meanings,
            frequency_tags,
        }
    }

    /// Rebuilds the reading of a ruby-annotated word
    ///
    /// Walks the anchor's text in document order: `<rt>` text is taken as
    /// is, `<rp>` text is skipped, and base text keeps everything except CJK
    /// unified ideographs. Without any `<ruby>` the reading is empty.
    fn extract_reading(&self, anchor: ElementRef<'_>) -> String {
        if anchor.select(&self.ruby).next().is_none() {
            return String::new();
        }

        let mut segments = Vec::new();
        text_segments(anchor, TextRole::Base, &mut segments);

        let mut reading = String::new();
        for (role, text) in segments {
            match role {
                TextRole::Annotation => reading.push_str(text),
                TextRole::Fallback => {}
                TextRole::Base => reading.extend(text.chars().filter(|c| !is_ideograph(*c))),
            }
        }

        reading.trim().to_string()
    }
}

impl Extractor for VocabularyListExtractor {
    fn extract(&self, document: &Html, offset: u64) -> Extraction {
        let records: Vec<VocabularyRecord> = document
            .select(&self.entry)
            .enumerate()
            .map(|(idx, entry)| self.extract_entry(entry, offset + idx as u64 + 1))
            .collect();

        let continuation = !records.is_empty();
        Extraction {
            records,
            continuation,
        }
    }

    fn total_entries(&self, document: &Html) -> Option<u64> {
        document.select(&self.paragraph).find_map(|p| {
            let text = p.text().collect::<String>();
            self.caption
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    }
}

fn selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
}

/// Inclusive range of the CJK Unified Ideographs block
fn is_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Collects text nodes in document order, tagged by the nearest `<rt>`/`<rp>`
fn text_segments<'a>(element: ElementRef<'a>, role: TextRole, segments: &mut Vec<(TextRole, &'a str)>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => segments.push((role, &**text)),
            Node::Element(el) => {
                let child_role = match el.name() {
                    "rt" => TextRole::Annotation,
                    "rp" => TextRole::Fallback,
                    _ => role,
                };
                if let Some(child) = ElementRef::wrap(child) {
                    text_segments(child, child_role, segments);
                }
            }
            _ => {}
        }
    }
}

/// Anchor text without ruby annotations, trimmed
fn visible_text(anchor: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    text_segments(anchor, TextRole::Base, &mut segments);

    let text: String = segments
        .into_iter()
        .filter(|(role, _)| *role == TextRole::Base)
        .map(|(_, text)| text)
        .collect();
    text.trim().to_string()
}

/// Parses `category:value` tokens; tokens without a colon are ignored
fn parse_frequency_tags(raw: &str) -> BTreeMap<String, String> {
    raw.split_whitespace()
        .filter_map(|token| token.split_once(':'))
        .map(|(category, value)| (category.to_lowercase(), value.trim().to_string()))
        .collect()
}

/// Splits the text of the block following the tag element on `;`
fn extract_meanings(tag: ElementRef<'_>) -> Vec<String> {
    let Some(block) = tag
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "div")
    else {
        return Vec::new();
    };

    let text: String = block.text().map(str::trim).collect();
    split_meanings(&text)
}

fn split_meanings(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

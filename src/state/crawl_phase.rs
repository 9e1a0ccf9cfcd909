//! Phase definitions for a single crawl run
//!
//! A run always starts in `ResolveSource` and ends in `Done` or `Abort`.

use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Setup Phases =====
    /// Determining which listing URL to crawl
    ResolveSource,

    /// Loading the stored offset and records, deciding resume vs fresh
    ResumeOrFresh,

    /// Fetching the first page to learn the total entry count
    FetchTotal,

    // ===== Active Phase =====
    /// Fetching, extracting and persisting one page per iteration
    Paging,

    // ===== Terminal Phases =====
    /// Run finished; no further I/O
    Done,

    /// Run could not start (no usable listing URL)
    Abort,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Abort)
    }

    /// Returns true if `next` is a legal successor of this phase
    ///
    /// Setup phases advance strictly in order, any non-terminal phase may
    /// abort, and `FetchTotal`/`Paging` may finish early.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (Self::ResolveSource, Self::ResumeOrFresh) => true,
            (Self::ResumeOrFresh, Self::FetchTotal) => true,
            (Self::FetchTotal, Self::Paging) => true,
            (Self::FetchTotal, Self::Done) => true,
            (Self::Paging, Self::Done) => true,
            (from, Self::Abort) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResolveSource => "resolve_source",
            Self::ResumeOrFresh => "resume_or_fresh",
            Self::FetchTotal => "fetch_total",
            Self::Paging => "paging",
            Self::Done => "done",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

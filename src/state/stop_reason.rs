use std::fmt;

/// Why a crawl run left the paging loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The committed offset reached the server-reported total
    Completed,

    /// The extractor reported that no further pages follow
    NoContinuation,

    /// A page was fetched but yielded no entries while the server total says
    /// entries remain; the markup may have changed and needs a look
    EmptyPage { offset: u64, remaining: u64 },

    /// The entry count could not be read from the first page, so no page
    /// was requested
    TotalUnknown,

    /// A page could not be fetched after every retry
    PageUnavailable { offset: u64 },

    /// The per-run page budget was used up
    PageBudget { pages: u32 },

    /// An unexpected error ended the loop
    Failed { offset: u64, message: String },
}

impl StopReason {
    /// Returns true if the listing is fully harvested
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed | Self::NoContinuation)
    }

    /// Returns true if a later run should be able to continue the listing
    pub fn is_resumable(&self) -> bool {
        !self.is_complete()
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "all entries harvested"),
            Self::NoContinuation => write!(f, "listing reported no further pages"),
            Self::EmptyPage { offset, remaining } => write!(
                f,
                "page at offset {} had no entries but {} remain",
                offset, remaining
            ),
            Self::TotalUnknown => write!(f, "listing entry count unavailable"),
            Self::PageUnavailable { offset } => {
                write!(f, "page at offset {} unavailable", offset)
            }
            Self::PageBudget { pages } => write!(f, "page budget of {} reached", pages),
            Self::Failed { offset, message } => {
                write!(f, "failed at offset {}: {}", offset, message)
            }
        }
    }
}

//! Randomized pause between listing pages
//!
//! The pause only spreads requests out; correctness never depends on it.

use crate::config::CrawlerConfig;
use std::time::Duration;

/// Uniformly distributed delay within a fixed range
#[derive(Debug, Clone, Copy)]
pub struct PageDelay {
    min_ms: u64,
    max_ms: u64,
}

impl PageDelay {
    /// Creates a delay range; bounds are swapped if given in reverse
    pub fn new(min: Duration, max: Duration) -> Self {
        let (a, b) = (min.as_millis() as u64, max.as_millis() as u64);
        Self {
            min_ms: a.min(b),
            max_ms: a.max(b),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_page_delay_ms),
            Duration::from_millis(config.max_page_delay_ms),
        )
    }

    /// Draws the next delay
    pub fn next_delay(&self) -> Duration {
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a freshly drawn delay and returns it
    pub async fn pause(&self) -> Duration {
        let delay = self.next_delay();
        tracing::debug!("Pausing {:?} before the next page", delay);
        tokio::time::sleep(delay).await;
        delay
    }
}

//! State module for tracking crawl progress
//!
//! This module provides the state machine the crawl orchestrator walks
//! through for a single run, and the reasons a run can stop.
//!
//! # Components
//!
//! - `CrawlPhase`: the phase of one run (resolve source, resume, total, paging, done)
//! - `StopReason`: why the paging loop ended

mod crawl_phase;
mod stop_reason;

// Re-export main types
pub use crawl_phase::CrawlPhase;
pub use stop_reason::StopReason;

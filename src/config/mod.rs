//! Configuration module for Kotoba-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file section falls back to the defaults
//! the harvester has always used (50 entries per page, 3 attempts, 2-5 second
//! pauses between pages).
//!
//! # Example
//!
//! ```no_run
//! use kotoba_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Entries per page: {}", config.crawler.page_step);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HttpConfig, MarkupConfig, OutputConfig, ProgressBackend,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

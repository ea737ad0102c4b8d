//! Configuration module for Index-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only `[crawler] base-url` is required; every other key has a default.
//!
//! # Example
//!
//! ```no_run
//! use index_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DownloadConfig, OutputConfig, UserAgentConfig, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config_text, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;

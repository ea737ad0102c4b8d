//! Index-Harvester: inventory and download numbered directory listings
//!
//! This crate crawls servers that expose auto-generated directory-listing
//! pages organized as numerically-named folders. It can build an inventory
//! of every folder and file it finds, or walk the numeric namespace and
//! download each directory's files to local storage.

pub mod config;
pub mod crawler;
pub mod download;
pub mod inventory;
pub mod output;
pub mod shutdown;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Index-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Failed to create directory {path}: {source}")]
    LocalDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Inventory serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rename plan export error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Not a directory id: {0:?}")]
    InvalidDirectoryId(String),

    #[error("URL has no file name: {0}")]
    MissingFileName(String),
}

/// Result type alias for Index-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use inventory::{FileRecord, FolderRecord, Inventory};
pub use shutdown::CancellationFlag;
pub use url::DirectoryId;

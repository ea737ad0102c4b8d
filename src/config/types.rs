use crate::crawler::CrawlSettings;
use crate::download::TransferSettings;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent; some listing servers refuse unknown clients
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Main configuration structure for Index-Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl phase configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Base URL whose numbered subdirectories are crawled
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum depth to follow subfolders from the root folders
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of concurrent listing fetches
    #[serde(rename = "max-concurrency", default = "default_crawl_concurrency")]
    pub max_concurrency: u32,

    /// Exclusive upper bound of the bounded scan `[1, range-end)`
    #[serde(rename = "range-end", default = "default_range_end")]
    pub range_end: u64,

    /// Timeout for one listing fetch (seconds)
    #[serde(rename = "timeout-secs", default = "default_crawl_timeout")]
    pub timeout_secs: u64,
}

/// Download phase configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Maximum number of concurrent file transfers within a directory
    #[serde(rename = "max-concurrency", default = "default_download_concurrency")]
    pub max_concurrency: u32,

    /// Write buffer size in bytes
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Stall timeout for one file transfer (seconds)
    #[serde(rename = "timeout-secs", default = "default_download_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per file
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed wait between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// First directory number of the sequential walk
    #[serde(rename = "start-number", default = "default_start_number")]
    pub start_number: u64,

    /// Local root under which `{n}/` directories are created
    #[serde(rename = "save-root", default = "default_save_root")]
    pub save_root: PathBuf,

    /// Opt-in stop after this many consecutive absent or empty directories
    #[serde(rename = "max-consecutive-empty", default)]
    pub max_consecutive_empty: Option<u64>,

    /// Timeout for the HEAD existence probe (seconds)
    #[serde(rename = "probe-timeout-secs", default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value sent in the User-Agent header
    #[serde(default = "default_user_agent")]
    pub value: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the inventory JSON file
    #[serde(rename = "inventory-path", default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// Path to the rename plan CSV file
    #[serde(rename = "rename-plan-path", default = "default_rename_plan_path")]
    pub rename_plan_path: PathBuf,
}

impl Config {
    /// Settings for the crawl coordinator
    pub fn crawl_settings(&self) -> CrawlSettings {
        CrawlSettings {
            max_depth: self.crawler.max_depth,
            max_concurrency: self.crawler.max_concurrency as usize,
            timeout: Duration::from_secs(self.crawler.timeout_secs),
        }
    }

    /// Settings for each file transfer
    pub fn transfer_settings(&self) -> TransferSettings {
        TransferSettings {
            chunk_size: self.download.chunk_size,
            timeout: Duration::from_secs(self.download.timeout_secs),
            retries: self.download.retries,
            retry_delay: Duration::from_millis(self.download.retry_delay_ms),
            ..TransferSettings::default()
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_download_concurrency(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_download_timeout(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            start_number: default_start_number(),
            save_root: default_save_root(),
            max_consecutive_empty: None,
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: default_user_agent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            inventory_path: default_inventory_path(),
            rename_plan_path: default_rename_plan_path(),
        }
    }
}

fn default_max_depth() -> u32 {
    2
}

fn default_crawl_concurrency() -> u32 {
    20
}

fn default_range_end() -> u64 {
    6315
}

fn default_crawl_timeout() -> u64 {
    15
}

fn default_download_concurrency() -> u32 {
    12
}

fn default_chunk_size() -> usize {
    128 * 1024
}

fn default_download_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_start_number() -> u64 {
    1
}

fn default_save_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("file_structure.json")
}

fn default_rename_plan_path() -> PathBuf {
    PathBuf::from("rename_plan.csv")
}

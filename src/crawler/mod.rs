//! Crawler module for directory-listing traversal
//!
//! This module contains the crawl side of the harvester, including:
//! - Listing page parsing into folder and file entries
//! - The numbered directory namespace and its scan policies
//! - HTTP fetching of listings and existence probes
//! - Concurrent crawl coordination into an inventory

mod coordinator;
mod fetcher;
mod namespace;
mod parser;

pub use coordinator::{CrawlCoordinator, CrawlOutcome, CrawlSettings, FolderTask};
pub use fetcher::{build_http_client, fetch_listing, probe_directory, FetchResult};
pub use namespace::{DirectoryNamespace, SequentialScan};
pub use parser::{extract_file_urls, parse_listing, Entry, EntryKind};

use crate::config::Config;
use crate::shutdown::CancellationFlag;
use crate::HarvestError;

/// Runs a complete bounded crawl
///
/// Every directory in `[1, range-end)` under the configured base URL is
/// submitted as a depth-0 root; subfolders are followed down to
/// `max-depth`.
///
/// # Example
///
/// ```no_run
/// use index_harvester::config::load_config;
/// use index_harvester::crawler::crawl;
/// use index_harvester::CancellationFlag;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let outcome = crawl(&config, CancellationFlag::new()).await?;
/// println!("{} folders", outcome.inventory.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, cancel: CancellationFlag) -> Result<CrawlOutcome, HarvestError> {
    let namespace = DirectoryNamespace::new(&config.crawler.base_url)?;
    let settings = config.crawl_settings();
    let client = build_http_client(
        &config.user_agent.value,
        settings.timeout,
        settings.max_concurrency,
    )?;

    tracing::info!("Crawling {}", namespace.base());
    let roots = namespace
        .bounded(config.crawler.range_end)
        .map(|(_, url)| url)
        .collect();

    let coordinator = CrawlCoordinator::new(client, settings, cancel);
    Ok(coordinator.run(roots).await)
}

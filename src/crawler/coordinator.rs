//! Crawler coordinator - concurrent traversal of numbered listings
//!
//! This module drives the crawl:
//! - Seeding root folders (depth 0) from the namespace
//! - Running up to `max_concurrency` folder visits at once
//! - Deduplicating visits through the shared `VisitedSet`
//! - Recording each listed folder in the shared inventory
//! - Queueing discovered subfolders one level deeper
//!
//! Subfolders are queued as new tasks rather than visited recursively, so
//! fan-out never grows the call stack.

use crate::crawler::fetcher::{fetch_listing, FetchResult};
use crate::crawler::parser::{parse_listing, EntryKind};
use crate::inventory::{FileRecord, FolderRecord, Inventory, SharedInventory, VisitedSet};
use crate::output::CrawlStatistics;
use crate::shutdown::CancellationFlag;
use crate::url::directory_id_from_url;
use chrono::Utc;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// How often (in completed folder visits) a progress line is logged
const PROGRESS_INTERVAL: u64 = 100;

/// Tunables for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Deepest level fetched; roots are depth 0
    pub max_depth: u32,

    /// Maximum number of folder visits in flight
    pub max_concurrency: usize,

    /// Timeout for a single listing fetch
    pub timeout: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_concurrency: 20,
            timeout: Duration::from_secs(15),
        }
    }
}

/// A folder waiting to be visited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderTask {
    pub url: Url,
    pub depth: u32,
}

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub inventory: Inventory,
    pub stats: CrawlStatistics,
}

#[derive(Debug, Default)]
struct CrawlCounters {
    fetches: AtomicU64,
    absent: AtomicU64,
    empty: AtomicU64,
    failed: AtomicU64,
}

/// State shared by every worker of one crawl
struct CrawlContext {
    client: Client,
    settings: CrawlSettings,
    visited: VisitedSet,
    inventory: SharedInventory,
    counters: CrawlCounters,
}

/// Main crawl coordinator structure
pub struct CrawlCoordinator {
    context: Arc<CrawlContext>,
    cancel: CancellationFlag,
}

impl CrawlCoordinator {
    /// Creates a coordinator with empty visited set and inventory
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client shared by all workers
    /// * `settings` - Depth, concurrency and timeout limits
    /// * `cancel` - Flag that stops new visits from being dispatched
    pub fn new(client: Client, settings: CrawlSettings, cancel: CancellationFlag) -> Self {
        Self {
            context: Arc::new(CrawlContext {
                client,
                settings,
                visited: VisitedSet::new(),
                inventory: SharedInventory::new(),
                counters: CrawlCounters::default(),
            }),
            cancel,
        }
    }

    /// Number of listing fetches issued so far
    pub fn fetch_count(&self) -> u64 {
        self.context.counters.fetches.load(Ordering::Relaxed)
    }

    /// Visits a single folder and returns the subfolders it queued
    ///
    /// Calling this again for a URL that was already dispatched is a no-op.
    pub async fn visit_folder(&self, url: Url, depth: u32) -> Vec<FolderTask> {
        visit_folder(&self.context, FolderTask { url, depth }).await
    }

    /// Crawls every root at depth 0 and everything reachable beneath them
    ///
    /// Roots may overlap with each other or with discovered children; the
    /// visited set collapses the duplicates. Per-folder failures are logged
    /// and counted but never stop the run.
    pub async fn run(&self, roots: Vec<Url>) -> CrawlOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        let limit = self.context.settings.max_concurrency.max(1);

        let mut pending: VecDeque<FolderTask> = roots
            .into_iter()
            .map(|url| FolderTask { url, depth: 0 })
            .collect();
        let roots_submitted = pending.len() as u64;

        tracing::info!(
            "Starting crawl: {} root folders, max depth {}, {} workers",
            roots_submitted,
            self.context.settings.max_depth,
            limit
        );

        let mut workers = JoinSet::new();
        let mut completed: u64 = 0;
        let mut cancelled = false;

        loop {
            while workers.len() < limit {
                if self.cancel.is_cancelled() {
                    if !cancelled {
                        tracing::warn!(
                            "Crawl interrupted, dropping {} queued folders",
                            pending.len()
                        );
                        cancelled = true;
                    }
                    pending.clear();
                    break;
                }

                let Some(task) = pending.pop_front() else {
                    break;
                };
                let context = Arc::clone(&self.context);
                workers.spawn(async move { visit_folder(&context, task).await });
            }

            match workers.join_next().await {
                Some(Ok(children)) => pending.extend(children),
                Some(Err(e)) => tracing::error!("Crawl worker failed: {}", e),
                None => break,
            }

            completed += 1;
            if completed % PROGRESS_INTERVAL == 0 {
                let rate = completed as f64 / start.elapsed().as_secs_f64().max(0.001);
                tracing::info!(
                    "Progress: {} folders checked, {} recorded, {} queued, {:.2} folders/sec",
                    completed,
                    self.context.inventory.len(),
                    pending.len(),
                    rate
                );
            }
        }

        let inventory = self.context.inventory.snapshot();
        let counters = &self.context.counters;
        let stats = CrawlStatistics {
            started_at,
            elapsed: start.elapsed(),
            roots_submitted,
            fetches: counters.fetches.load(Ordering::Relaxed),
            absent: counters.absent.load(Ordering::Relaxed),
            empty: counters.empty.load(Ordering::Relaxed),
            failed_fetches: counters.failed.load(Ordering::Relaxed),
            folders_retained: inventory.len(),
            folders_with_files: inventory.folders_with_files(),
            total_files: inventory.total_files(),
            cancelled,
        };

        tracing::info!(
            "Crawl finished: {} folders recorded, {} files, {} failed fetches in {:.2}s",
            stats.folders_retained,
            stats.total_files,
            stats.failed_fetches,
            stats.elapsed.as_secs_f64()
        );

        CrawlOutcome { inventory, stats }
    }
}

/// Visits one folder: fetch, parse, record, and return the children to queue
async fn visit_folder(context: &CrawlContext, task: FolderTask) -> Vec<FolderTask> {
    let max_depth = context.settings.max_depth;
    if task.depth > max_depth {
        return Vec::new();
    }

    let Some(id) = directory_id_from_url(&task.url) else {
        tracing::debug!("Skipping non-numeric folder URL {}", task.url);
        return Vec::new();
    };

    if context.inventory.contains(&id) {
        return Vec::new();
    }

    // Marked before the fetch so concurrent duplicates never fetch twice
    if !context.visited.mark(task.url.as_str()) {
        return Vec::new();
    }

    tracing::debug!("Processing: {} (depth {})", task.url, task.depth);
    context.counters.fetches.fetch_add(1, Ordering::Relaxed);

    let result = fetch_listing(&context.client, &task.url, context.settings.timeout).await;
    let entries = match result {
        FetchResult::Success {
            final_url, body, ..
        } => parse_listing(&body, &final_url),
        FetchResult::Absent { status_code } => {
            tracing::debug!("Folder {} absent (HTTP {})", task.url, status_code);
            context.counters.absent.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }
        FetchResult::HttpError { status_code } => {
            tracing::warn!("Failed to list {}: HTTP {}", task.url, status_code);
            context.counters.failed.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to list {}: {}", task.url, error);
            context.counters.failed.fetch_add(1, Ordering::Relaxed);
            return Vec::new();
        }
    };

    if entries.is_empty() {
        tracing::debug!("Folder {} has no entries", task.url);
        context.counters.empty.fetch_add(1, Ordering::Relaxed);
        return Vec::new();
    }

    let mut record = FolderRecord::new(task.url.as_str());
    let mut children = Vec::new();

    for entry in entries {
        match entry.kind {
            EntryKind::Folder => {
                if record.push_subfolder(&entry.name) && task.depth < max_depth {
                    children.push(FolderTask {
                        url: entry.url,
                        depth: task.depth + 1,
                    });
                }
            }
            EntryKind::File => {
                record.push_file(FileRecord {
                    original_name: entry.name,
                    url: entry.url.to_string(),
                    size: entry.size,
                    date: entry.modified,
                });
            }
        }
    }

    let file_count = record.files.len();
    if !context.inventory.insert_if_absent(id.clone(), record) {
        tracing::debug!("Folder {} already recorded by another worker", id);
        return Vec::new();
    }

    tracing::debug!(
        "Recorded folder {}: {} files, {} subfolders queued",
        id,
        file_count,
        children.len()
    );
    children
}

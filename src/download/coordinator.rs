//! Download coordinator - per-directory fan-out and the sequential harvest
//!
//! `download_directory` runs one transfer per file URL with at most
//! `max_concurrency` in flight and gathers the outcomes in completion
//! order. `harvest_from` walks the numbered namespace one directory at a
//! time: probe, list, fan out, advance.

use crate::crawler::{extract_file_urls, fetch_listing, probe_directory, DirectoryNamespace, FetchResult};
use crate::download::transfer::{TransferManager, TransferOutcome};
use crate::output::DownloadStatistics;
use crate::shutdown::CancellationFlag;
use crate::url::file_name_from_url;
use crate::HarvestError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Result for one file of a directory
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub url: Url,
    /// Local destination; the directory itself when no file name could be derived
    pub path: PathBuf,
    pub outcome: TransferOutcome,
}

/// Every file outcome of one directory, in completion order
#[derive(Debug, Clone)]
pub struct DirectoryReport {
    pub number: u64,
    pub directory: PathBuf,
    pub outcomes: Vec<FileOutcome>,
    /// Files never started because the run was cancelled
    pub not_started: Vec<Url>,
}

impl DirectoryReport {
    /// True when every file of the directory was attempted
    pub fn is_complete(&self) -> bool {
        self.not_started.is_empty()
    }

    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, TransferOutcome::Downloaded { .. }))
    }

    pub fn already_present(&self) -> usize {
        self.count(|o| matches!(o, TransferOutcome::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| !o.is_success())
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|file| file.outcome.bytes_transferred())
            .sum()
    }

    fn count(&self, predicate: impl Fn(&TransferOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|file| predicate(&file.outcome))
            .count()
    }
}

/// Fans transfers out over a directory's files
pub struct DownloadCoordinator {
    transfer: Arc<TransferManager>,
    save_root: PathBuf,
    max_concurrency: usize,
    probe_timeout: Duration,
}

impl DownloadCoordinator {
    /// # Arguments
    ///
    /// * `transfer` - Manager used for every file
    /// * `save_root` - Local root; directory `n` is written to `{save_root}/{n}/`
    /// * `max_concurrency` - Transfers in flight within one directory
    pub fn new(transfer: TransferManager, save_root: impl Into<PathBuf>, max_concurrency: usize) -> Self {
        Self {
            transfer: Arc::new(transfer),
            save_root: save_root.into(),
            max_concurrency: max_concurrency.max(1),
            probe_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn save_root(&self) -> &Path {
        &self.save_root
    }

    /// Local directory for directory number `number`
    pub fn directory_path(&self, number: u64) -> PathBuf {
        self.save_root.join(number.to_string())
    }

    /// Downloads every file of one directory
    ///
    /// The local directory is created if absent. A repeated URL is
    /// transferred once; a different URL whose local name collides with an
    /// earlier one is recorded as failed without a request. A failed file
    /// never cancels its siblings; only failing to create the local
    /// directory is an error. Once `cancel` is raised no further transfer
    /// starts and the remaining URLs are listed in `not_started`.
    pub async fn download_directory(
        &self,
        number: u64,
        file_urls: &[Url],
        cancel: &CancellationFlag,
    ) -> Result<DirectoryReport, HarvestError> {
        let directory = self.directory_path(number);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|source| HarvestError::LocalDirectory {
                path: directory.clone(),
                source,
            })?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();
        let mut destinations: HashMap<PathBuf, &Url> = HashMap::new();
        let mut outcomes = Vec::with_capacity(file_urls.len());
        let mut not_started = Vec::new();

        for (index, url) in file_urls.iter().enumerate() {
            if cancel.is_cancelled() {
                not_started.extend_from_slice(&file_urls[index..]);
                break;
            }

            let name = match file_name_from_url(url) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Cannot derive a file name from {}: {}", url, e);
                    outcomes.push(FileOutcome {
                        url: url.clone(),
                        path: directory.clone(),
                        outcome: TransferOutcome::Failed {
                            attempts: 0,
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let path = directory.join(name);
            if let Some(earlier) = destinations.get(&path) {
                if *earlier == url {
                    tracing::debug!("Duplicate link {}, skipping", url);
                } else {
                    let error = format!("destination {} collides with {}", path.display(), earlier);
                    tracing::warn!("[failed] {}: {}", url, error);
                    outcomes.push(FileOutcome {
                        url: url.clone(),
                        path,
                        outcome: TransferOutcome::Failed { attempts: 0, error },
                    });
                }
                continue;
            }
            destinations.insert(path.clone(), url);

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            // The wait for a permit can outlast an interrupt
            if cancel.is_cancelled() {
                not_started.extend_from_slice(&file_urls[index..]);
                break;
            }
            let transfer = Arc::clone(&self.transfer);
            let url = url.clone();
            workers.spawn(async move {
                let _permit = permit;
                let outcome = transfer.download(&url, &path).await;
                FileOutcome { url, path, outcome }
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(file) => {
                    if let TransferOutcome::Failed { error, .. } = &file.outcome {
                        tracing::warn!("[failed] {}: {}", file.url, error);
                    }
                    outcomes.push(file);
                }
                Err(e) => tracing::error!("Transfer task failed: {}", e),
            }
        }

        let report = DirectoryReport {
            number,
            directory,
            outcomes,
            not_started,
        };
        tracing::info!(
            "[folder {}] {} downloaded, {} already present, {} failed",
            number,
            report.downloaded(),
            report.already_present(),
            report.failed()
        );
        if !report.is_complete() {
            tracing::warn!(
                "[folder {}] interrupted, {} files not started",
                number,
                report.not_started.len()
            );
        }
        Ok(report)
    }

    /// Walks the namespace from `start` one directory at a time
    ///
    /// Absent and empty directories advance the walk like any other. With
    /// no `cutoff` the walk only ends when `cancel` is raised; with one it
    /// also ends after that many consecutive absent or empty directories.
    /// Transfers in flight when `cancel` is raised are finished; a directory
    /// left incomplete stays the resume point in `next_number`.
    pub async fn harvest_from(
        &self,
        namespace: &DirectoryNamespace,
        start: u64,
        cutoff: Option<u64>,
        cancel: &CancellationFlag,
    ) -> DownloadStatistics {
        let mut scan = namespace.sequential(start).with_miss_cutoff(cutoff);
        let mut stats = DownloadStatistics::new(scan.current());

        tracing::info!(
            "Harvesting {} from directory {} into {}",
            namespace.base(),
            scan.current(),
            self.save_root.display()
        );

        while let Some((number, url)) = scan.next_candidate() {
            if cancel.is_cancelled() {
                tracing::warn!("Harvest interrupted before directory {}", number);
                stats.cancelled = true;
                break;
            }

            match self.harvest_directory(number, &url, &mut stats, cancel).await {
                DirectoryVisit::Found => scan.advance(true),
                DirectoryVisit::Missing => scan.advance(false),
                DirectoryVisit::Interrupted => {
                    tracing::warn!("Harvest interrupted in directory {}", number);
                    stats.cancelled = true;
                    break;
                }
            }
        }

        if scan.is_exhausted() {
            tracing::info!(
                "Stopping after {} consecutive empty directories",
                scan.consecutive_misses()
            );
            stats.stopped_by_cutoff = true;
        }

        stats.finish(scan.current());
        stats
    }

    /// Probes, lists and downloads one directory
    async fn harvest_directory(
        &self,
        number: u64,
        url: &Url,
        stats: &mut DownloadStatistics,
        cancel: &CancellationFlag,
    ) -> DirectoryVisit {
        let client = self.transfer.client();

        if !probe_directory(client, url, self.probe_timeout).await {
            tracing::debug!("[skip] directory {} not found", number);
            stats.directories_absent += 1;
            return DirectoryVisit::Missing;
        }

        let listing_timeout = self.transfer.settings().timeout;
        let result = fetch_listing(client, url, listing_timeout).await;
        if result.is_failure() {
            stats.directories_failed_listing += 1;
        }
        let (page_url, body) = match result {
            FetchResult::Success {
                final_url, body, ..
            } => (final_url, body),
            FetchResult::Absent { status_code } => {
                tracing::debug!("[skip] directory {} gone (HTTP {})", number, status_code);
                stats.directories_absent += 1;
                return DirectoryVisit::Missing;
            }
            FetchResult::HttpError { status_code } => {
                tracing::warn!("Failed to list {}: HTTP {}", url, status_code);
                return DirectoryVisit::Missing;
            }
            FetchResult::NetworkError { error } => {
                tracing::warn!("Failed to list {}: {}", url, error);
                return DirectoryVisit::Missing;
            }
        };

        let file_urls = extract_file_urls(&body, &page_url);
        if file_urls.is_empty() {
            tracing::info!("[skip] no files in directory {}", number);
            stats.directories_empty += 1;
            return DirectoryVisit::Missing;
        }

        tracing::info!("[folder {}] {} files", number, file_urls.len());
        match self.download_directory(number, &file_urls, cancel).await {
            Ok(report) => {
                stats.record(&report);
                if !report.is_complete() {
                    return DirectoryVisit::Interrupted;
                }
            }
            Err(e) => {
                tracing::error!("Directory {}: {}", number, e);
                stats.directories_failed += 1;
            }
        }
        DirectoryVisit::Found
    }
}

/// How the walk should treat a visited directory
enum DirectoryVisit {
    /// Listed files; resets the miss count
    Found,
    /// Absent, empty, or its listing failed
    Missing,
    /// Cancelled with files not yet started
    Interrupted,
}

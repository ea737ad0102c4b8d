//! Run statistics for crawls, harvests and saved inventories
//!
//! This module provides the summary types each phase produces and the
//! functions that print them.

use crate::download::{format_speed, DirectoryReport};
use crate::download::progress::{format_megabytes, throughput};
use crate::inventory::Inventory;
use crate::url::DirectoryId;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Number of folders listed by [`print_inventory_summary`]
const TOP_FOLDERS: usize = 10;

/// Crawl run summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,

    /// Depth-0 folders submitted
    pub roots_submitted: u64,

    /// Listing fetches actually issued
    pub fetches: u64,

    /// Fetches answered with 404 / 410
    pub absent: u64,

    /// Listings that contained no folder or file entries
    pub empty: u64,

    /// Fetches that failed with another status or a network error
    pub failed_fetches: u64,

    /// Folders recorded in the inventory
    pub folders_retained: usize,

    pub folders_with_files: usize,
    pub total_files: usize,

    /// Whether an interrupt dropped queued folders
    pub cancelled: bool,
}

/// Sequential harvest summary
#[derive(Debug, Clone)]
pub struct DownloadStatistics {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,

    /// First directory number of the walk
    pub start_number: u64,

    /// Directory number the walk would visit next; resume from here
    pub next_number: u64,

    /// Directories whose files were fanned out
    pub directories_completed: u64,

    /// Directories that failed the probe or whose listing was gone
    pub directories_absent: u64,

    /// Directories whose listing fetch hit a server or network error
    pub directories_failed_listing: u64,

    /// Directories listed without any file links
    pub directories_empty: u64,

    /// Directories whose local folder could not be created
    pub directories_failed: u64,

    pub files_downloaded: u64,
    pub files_already_present: u64,
    pub files_failed: u64,
    pub bytes_transferred: u64,

    pub stopped_by_cutoff: bool,
    pub cancelled: bool,

    started: Instant,
}

impl DownloadStatistics {
    pub fn new(start_number: u64) -> Self {
        Self {
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            start_number,
            next_number: start_number,
            directories_completed: 0,
            directories_absent: 0,
            directories_failed_listing: 0,
            directories_empty: 0,
            directories_failed: 0,
            files_downloaded: 0,
            files_already_present: 0,
            files_failed: 0,
            bytes_transferred: 0,
            stopped_by_cutoff: false,
            cancelled: false,
            started: Instant::now(),
        }
    }

    /// Adds one directory's outcomes
    ///
    /// A directory cut short by cancellation adds its file counts but is
    /// not counted as completed.
    pub fn record(&mut self, report: &DirectoryReport) {
        if report.is_complete() {
            self.directories_completed += 1;
        }
        self.files_downloaded += report.downloaded() as u64;
        self.files_already_present += report.already_present() as u64;
        self.files_failed += report.failed() as u64;
        self.bytes_transferred += report.bytes_transferred();
    }

    /// Stamps the elapsed time and the resume point
    pub fn finish(&mut self, next_number: u64) {
        self.next_number = next_number;
        self.elapsed = self.started.elapsed();
    }

    pub fn directories_checked(&self) -> u64 {
        self.directories_completed
            + self.directories_absent
            + self.directories_failed_listing
            + self.directories_empty
            + self.directories_failed
    }
}

/// Shape of a saved inventory
#[derive(Debug, Clone, PartialEq)]
pub struct InventorySummary {
    pub folders: usize,
    pub folders_with_files: usize,
    pub total_files: usize,
    pub subfolder_links: usize,
    pub lowest_id: Option<DirectoryId>,
    pub highest_id: Option<DirectoryId>,

    /// Folders with the most files, largest first
    pub largest_folders: Vec<(DirectoryId, usize)>,
}

impl InventorySummary {
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut largest: Vec<(DirectoryId, usize)> = inventory
            .folders()
            .filter(|(_, record)| record.has_files())
            .map(|(id, record)| (id.clone(), record.files.len()))
            .collect();
        // Stable sort keeps ascending id order among equal counts
        largest.sort_by(|a, b| b.1.cmp(&a.1));
        largest.truncate(TOP_FOLDERS);

        Self {
            folders: inventory.len(),
            folders_with_files: inventory.folders_with_files(),
            total_files: inventory.total_files(),
            subfolder_links: inventory
                .folders()
                .map(|(_, record)| record.subfolders.len())
                .sum(),
            lowest_id: inventory.ids().next().cloned(),
            highest_id: inventory.ids().last().cloned(),
            largest_folders: largest,
        }
    }
}

/// Prints a crawl summary to stdout
pub fn print_crawl_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run:");
    println!("  Started: {}", stats.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Elapsed: {:.2}s", stats.elapsed.as_secs_f64());
    if stats.cancelled {
        println!("  Interrupted before the queue was drained");
    }
    println!();

    println!("Fetches:");
    println!("  Root folders submitted: {}", stats.roots_submitted);
    println!("  Listings fetched: {}", stats.fetches);
    println!("  Absent (404/410): {}", stats.absent);
    println!("  Empty listings: {}", stats.empty);
    println!("  Failed: {}", stats.failed_fetches);
    println!();

    println!("Inventory:");
    println!("  Folders recorded: {}", stats.folders_retained);
    println!("  Folders with files: {}", stats.folders_with_files);
    println!("  Total files: {}", stats.total_files);
}

/// Prints a harvest summary to stdout
pub fn print_download_statistics(stats: &DownloadStatistics) {
    println!("=== Download Statistics ===\n");

    println!("Directories:");
    println!(
        "  Range walked: {}..{}",
        stats.start_number, stats.next_number
    );
    println!("  Checked: {}", stats.directories_checked());
    println!("  Downloaded: {}", stats.directories_completed);
    println!("  Absent: {}", stats.directories_absent);
    println!("  Empty: {}", stats.directories_empty);
    println!("  Listing failures: {}", stats.directories_failed_listing);
    if stats.directories_failed > 0 {
        println!("  Local errors: {}", stats.directories_failed);
    }
    println!();

    println!("Files:");
    println!("  Downloaded: {}", stats.files_downloaded);
    println!("  Already present: {}", stats.files_already_present);
    println!("  Failed: {}", stats.files_failed);
    println!(
        "  Transferred: {} in {:.2}s ({})",
        format_megabytes(stats.bytes_transferred),
        stats.elapsed.as_secs_f64(),
        format_speed(throughput(stats.bytes_transferred, stats.elapsed))
    );

    if stats.stopped_by_cutoff {
        println!("\nStopped after a run of empty directories");
    }
    if stats.cancelled {
        println!("\nInterrupted; resume with --start {}", stats.next_number);
    }
}

/// Prints the shape of a saved inventory to stdout
pub fn print_inventory_summary(summary: &InventorySummary) {
    println!("=== Inventory Statistics ===\n");

    println!("Overview:");
    println!("  Folders: {}", summary.folders);
    println!("  Folders with files: {}", summary.folders_with_files);
    println!("  Total files: {}", summary.total_files);
    println!("  Subfolder links: {}", summary.subfolder_links);
    if let (Some(low), Some(high)) = (&summary.lowest_id, &summary.highest_id) {
        println!("  Id range: {}..={}", low, high);
    }

    if !summary.largest_folders.is_empty() {
        println!("\nLargest Folders:");
        for (id, count) in &summary.largest_folders {
            println!("  {}: {} files", id, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{FileOutcome, TransferOutcome};
    use crate::inventory::{FileRecord, FolderRecord};
    use std::path::PathBuf;
    use url::Url;

    fn folder(url: &str, files: usize) -> FolderRecord {
        let mut record = FolderRecord::new(url);
        for i in 0..files {
            record.push_file(FileRecord {
                original_name: format!("f{}.zip", i),
                url: format!("{}f{}.zip", url, i),
                size: "1K".to_string(),
                date: String::new(),
            });
        }
        record
    }

    #[test]
    fn test_inventory_summary() {
        let mut inventory = Inventory::new();
        let mut three = folder("http://example.com/3/", 1);
        three.push_subfolder("30");
        inventory.insert(DirectoryId::from_number(3), three);
        inventory.insert(DirectoryId::from_number(30), folder("http://example.com/3/30/", 3));
        inventory.insert(DirectoryId::from_number(12), folder("http://example.com/12/", 0));

        let summary = InventorySummary::from_inventory(&inventory);
        assert_eq!(summary.folders, 3);
        assert_eq!(summary.folders_with_files, 2);
        assert_eq!(summary.total_files, 4);
        assert_eq!(summary.subfolder_links, 1);
        assert_eq!(summary.lowest_id, Some(DirectoryId::from_number(3)));
        assert_eq!(summary.highest_id, Some(DirectoryId::from_number(30)));
        assert_eq!(
            summary.largest_folders,
            vec![
                (DirectoryId::from_number(30), 3),
                (DirectoryId::from_number(3), 1)
            ]
        );
    }

    #[test]
    fn test_empty_inventory_summary() {
        let summary = InventorySummary::from_inventory(&Inventory::new());
        assert_eq!(summary.folders, 0);
        assert!(summary.lowest_id.is_none());
        assert!(summary.largest_folders.is_empty());
    }

    #[test]
    fn test_download_statistics_record() {
        let file = |outcome| FileOutcome {
            url: Url::parse("http://example.com/1/a").unwrap(),
            path: PathBuf::from("1/a"),
            outcome,
        };
        let report = DirectoryReport {
            number: 1,
            directory: PathBuf::from("1"),
            outcomes: vec![
                file(TransferOutcome::Downloaded {
                    bytes: 100,
                    elapsed: Duration::from_millis(10),
                }),
                file(TransferOutcome::AlreadyPresent),
                file(TransferOutcome::Failed {
                    attempts: 3,
                    error: "HTTP 500".to_string(),
                }),
            ],
            not_started: Vec::new(),
        };

        let mut stats = DownloadStatistics::new(1);
        stats.record(&report);
        stats.directories_absent += 2;
        stats.directories_failed_listing += 1;
        stats.finish(5);

        assert_eq!(stats.directories_completed, 1);
        assert_eq!(stats.directories_checked(), 4);
        assert_eq!(stats.files_downloaded, 1);
        assert_eq!(stats.files_already_present, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.bytes_transferred, 100);
        assert_eq!(stats.next_number, 5);
    }
}

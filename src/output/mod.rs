//! Output module for run summaries and reports
//!
//! This module handles:
//! - Crawl, harvest and inventory statistics
//! - Exporting the rename plan spreadsheet from an inventory

mod rename_plan;
pub mod stats;

pub use rename_plan::{write_rename_plan, write_rename_plan_to, RENAME_PLAN_HEADERS};
pub use stats::{
    print_crawl_statistics, print_download_statistics, print_inventory_summary, CrawlStatistics,
    DownloadStatistics, InventorySummary,
};

//! Download module for fetching directory contents to local storage
//!
//! This module contains the download side of the harvester, including:
//! - Single-file transfers with retry and partial-file cleanup
//! - Progress reporting through an observer interface
//! - Per-directory fan-out and the sequential namespace harvest

mod coordinator;
pub mod progress;
mod transfer;

pub use coordinator::{DirectoryReport, DownloadCoordinator, FileOutcome};
pub use progress::{
    format_speed, BarObserver, NoopObserver, ProgressObserver, ProgressUpdate, TracingObserver,
};
pub use transfer::{
    partial_path, TransferError, TransferManager, TransferOutcome, TransferSettings, TransferTask,
};

use crate::config::Config;
use crate::crawler::{build_http_client, DirectoryNamespace};
use crate::output::DownloadStatistics;
use crate::shutdown::CancellationFlag;
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;

/// Runs the sequential harvest described by `config`
///
/// Starts at `download.start-number` and writes into `download.save-root`.
/// Runs until `cancel` is raised or the optional empty-directory cutoff is
/// reached. Progress is logged through `tracing`.
pub async fn harvest(config: &Config, cancel: CancellationFlag) -> Result<DownloadStatistics, HarvestError> {
    harvest_with_observer(config, cancel, Arc::new(TracingObserver)).await
}

/// Same as [`harvest`], reporting transfer progress to `observer`
pub async fn harvest_with_observer(
    config: &Config,
    cancel: CancellationFlag,
    observer: Arc<dyn ProgressObserver>,
) -> Result<DownloadStatistics, HarvestError> {
    let namespace = DirectoryNamespace::new(&config.crawler.base_url)?;
    let download = &config.download;
    let settings = config.transfer_settings();
    let client = build_http_client(
        &config.user_agent.value,
        settings.timeout,
        download.max_concurrency as usize,
    )?;

    let transfer = TransferManager::new(client, settings).with_observer(observer);
    let coordinator = DownloadCoordinator::new(
        transfer,
        &download.save_root,
        download.max_concurrency as usize,
    )
    .with_probe_timeout(Duration::from_secs(download.probe_timeout_secs));

    Ok(coordinator
        .harvest_from(
            &namespace,
            download.start_number,
            download.max_consecutive_empty,
            &cancel,
        )
        .await)
}

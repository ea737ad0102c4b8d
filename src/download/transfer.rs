//! Single-file transfer with retry
//!
//! A transfer streams the response body into `{destination}.part` through a
//! fixed-size write buffer and renames it onto the destination only after
//! the whole body has been written and flushed. A failed attempt removes
//! the partial file, waits a fixed delay, and tries again.

use crate::download::progress::{ProgressObserver, ProgressThrottle, ProgressUpdate, TracingObserver};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Suffix of the in-progress file next to the destination
pub const PARTIAL_SUFFIX: &str = ".part";

/// Tunables for every transfer made by one manager
#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Write buffer size in bytes
    pub chunk_size: usize,

    /// Longest wait for the response headers or for any single body chunk
    pub timeout: Duration,

    /// Total attempts per file
    pub retries: u32,

    /// Fixed wait between attempts
    pub retry_delay: Duration,

    /// Minimum time between progress events
    pub progress_interval: Duration,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            chunk_size: 128 * 1024,
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            progress_interval: Duration::from_millis(500),
        }
    }
}

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timed out after {timeout:?} waiting on {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("Incomplete body for {url}: expected {expected} bytes, received {received}")]
    Incomplete {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    fn network(url: &Url, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Local filesystem failures; retrying the network will not fix these
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Final result of [`TransferManager::download`]
#[derive(Debug, Clone, PartialEq)]
pub enum TransferOutcome {
    /// The file was fetched and written
    Downloaded { bytes: u64, elapsed: Duration },

    /// The destination already existed; nothing was requested
    AlreadyPresent,

    /// Every attempt failed
    Failed { attempts: u32, error: String },
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn bytes_transferred(&self) -> u64 {
        match self {
            Self::Downloaded { bytes, .. } => *bytes,
            _ => 0,
        }
    }
}

/// One attempt at one file
#[derive(Debug)]
pub struct TransferTask {
    pub url: Url,
    pub destination: PathBuf,
    pub transferred: u64,
    pub started: Instant,
    pub attempt: u32,
}

impl TransferTask {
    fn new(url: &Url, destination: &Path, attempt: u32) -> Self {
        Self {
            url: url.clone(),
            destination: destination.to_path_buf(),
            transferred: 0,
            started: Instant::now(),
            attempt,
        }
    }
}

/// The `.part` path used while `destination` is being written
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut path = destination.as_os_str().to_owned();
    path.push(PARTIAL_SUFFIX);
    PathBuf::from(path)
}

/// Downloads single files with retry and progress reporting
#[derive(Clone)]
pub struct TransferManager {
    client: Client,
    settings: TransferSettings,
    observer: Arc<dyn ProgressObserver>,
}

impl TransferManager {
    /// Creates a manager that reports progress through `tracing`
    pub fn new(client: Client, settings: TransferSettings) -> Self {
        Self {
            client,
            settings,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Downloads `url` to `local_path`
    ///
    /// An existing `local_path` is treated as complete and returned as
    /// [`TransferOutcome::AlreadyPresent`] without any request. Otherwise up
    /// to `retries` attempts are made. This never returns an error; the
    /// outcome says whether the file is in place.
    pub async fn download(&self, url: &Url, local_path: &Path) -> TransferOutcome {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());

        match fs::try_exists(local_path).await {
            Ok(true) => {
                self.observer.on_skipped(&file_name);
                return TransferOutcome::AlreadyPresent;
            }
            Ok(false) => {}
            Err(e) => {
                let error = TransferError::io(local_path, e).to_string();
                tracing::error!("Cannot check {}: {}", local_path.display(), error);
                return TransferOutcome::Failed { attempts: 0, error };
            }
        }

        let retries = self.settings.retries.max(1);
        let part = partial_path(local_path);
        let mut attempts = 0;
        let mut last_error = String::new();

        while attempts < retries {
            attempts += 1;
            let mut task = TransferTask::new(url, local_path, attempts);

            match self.attempt(&mut task, &part, &file_name).await {
                Ok(()) => {
                    let elapsed = task.started.elapsed();
                    self.observer
                        .on_complete(&file_name, task.transferred, elapsed);
                    return TransferOutcome::Downloaded {
                        bytes: task.transferred,
                        elapsed,
                    };
                }
                Err(e) => {
                    discard_partial(&part).await;
                    last_error = e.to_string();
                    self.observer.on_attempt_failed(
                        &file_name,
                        url.as_str(),
                        task.attempt,
                        retries,
                        &last_error,
                    );

                    if e.is_local() {
                        break;
                    }
                    if attempts < retries {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!(
            "Giving up on {} after {} attempts: {}",
            url,
            attempts,
            last_error
        );
        TransferOutcome::Failed {
            attempts,
            error: last_error,
        }
    }

    async fn attempt(
        &self,
        task: &mut TransferTask,
        part: &Path,
        file_name: &str,
    ) -> Result<(), TransferError> {
        let timeout = self.settings.timeout;
        let timed_out = |url: &Url| TransferError::Timeout {
            url: url.to_string(),
            timeout,
        };

        let response = tokio::time::timeout(timeout, self.client.get(task.url.clone()).send())
            .await
            .map_err(|_| timed_out(&task.url))?
            .map_err(|e| TransferError::network(&task.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::HttpStatus {
                url: task.url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let file = File::create(part)
            .await
            .map_err(|e| TransferError::io(part, e))?;
        let mut writer = BufWriter::with_capacity(self.settings.chunk_size.max(1), file);
        let mut stream = response.bytes_stream();
        let mut throttle = ProgressThrottle::new(self.settings.progress_interval);

        while let Some(chunk) = tokio::time::timeout(timeout, stream.next())
            .await
            .map_err(|_| timed_out(&task.url))?
        {
            let chunk = chunk.map_err(|e| TransferError::network(&task.url, e))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| TransferError::io(part, e))?;
            task.transferred += chunk.len() as u64;

            if throttle.ready() {
                self.observer.on_progress(&ProgressUpdate {
                    file_name,
                    transferred: task.transferred,
                    total,
                    elapsed: task.started.elapsed(),
                });
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| TransferError::io(part, e))?;
        drop(writer);

        if let Some(expected) = total {
            if expected != task.transferred {
                return Err(TransferError::Incomplete {
                    url: task.url.to_string(),
                    expected,
                    received: task.transferred,
                });
            }
        }

        fs::rename(part, &task.destination)
            .await
            .map_err(|e| TransferError::io(&task.destination, e))?;
        Ok(())
    }
}

/// Removes a partial file, ignoring a file that was never created
async fn discard_partial(part: &Path) {
    match fs::remove_file(part).await {
        Ok(()) => tracing::debug!("Removed partial file {}", part.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial file {}: {}", part.display(), e),
    }
}

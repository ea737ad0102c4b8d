//! Transfer progress reporting
//!
//! The transfer loop reports through the [`ProgressObserver`] trait and
//! never writes to the console itself. [`TracingObserver`] logs through
//! `tracing`, [`BarObserver`] draws one `indicatif` bar per file on a
//! terminal, and [`NoopObserver`] discards everything for headless use.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// A snapshot of one in-flight transfer
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate<'a> {
    pub file_name: &'a str,
    pub transferred: u64,
    /// Declared length of the body, when the server sent one
    pub total: Option<u64>,
    pub elapsed: Duration,
}

impl ProgressUpdate<'_> {
    pub fn bytes_per_sec(&self) -> f64 {
        throughput(self.transferred, self.elapsed)
    }
}

/// Receives transfer events
pub trait ProgressObserver: Send + Sync {
    /// Called at most once per progress interval while a body is streaming
    fn on_progress(&self, update: &ProgressUpdate<'_>);

    /// Called once after a file has been written completely
    fn on_complete(&self, _file_name: &str, _bytes: u64, _elapsed: Duration) {}

    /// Called after a failed attempt
    fn on_attempt_failed(
        &self,
        _file_name: &str,
        _url: &str,
        _attempt: u32,
        _retries: u32,
        _error: &str,
    ) {
    }

    /// Called when the destination already exists and nothing is fetched
    fn on_skipped(&self, _file_name: &str) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _update: &ProgressUpdate<'_>) {}
}

/// Reports progress as `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        tracing::info!(
            "[downloading] {} {} | {}",
            update.file_name,
            format_progress(update.transferred, update.total),
            format_speed(update.bytes_per_sec())
        );
    }

    fn on_complete(&self, file_name: &str, bytes: u64, elapsed: Duration) {
        tracing::info!(
            "[done] {} ({} @ {})",
            file_name,
            format_megabytes(bytes),
            format_speed(throughput(bytes, elapsed))
        );
    }

    fn on_attempt_failed(&self, _file_name: &str, url: &str, attempt: u32, retries: u32, error: &str) {
        tracing::warn!("[retry {}/{}] {} error: {}", attempt, retries, url, error);
    }

    fn on_skipped(&self, file_name: &str) {
        tracing::info!("[skip] file already exists: {}", file_name);
    }
}

const BAR_TEMPLATE: &str =
    "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec})";
const SPINNER_TEMPLATE: &str = "{spinner} {msg} {bytes} ({binary_bytes_per_sec})";

/// Draws a progress bar per in-flight file
///
/// Bars appear on the first progress update and are cleared when the file
/// completes or an attempt fails. Completion and retry lines are printed
/// above the bars.
pub struct BarObserver {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl BarObserver {
    /// Draws to stderr
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    /// Number of bars currently drawn
    pub fn active(&self) -> usize {
        self.lock_bars().len()
    }

    fn lock_bars(&self) -> MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_bar(&self, file_name: &str, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) if total > 0 => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            _ => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        bar.set_message(file_name.to_string());
        self.multi.add(bar)
    }

    fn clear(&self, file_name: &str) {
        if let Some(bar) = self.lock_bars().remove(file_name) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn print(&self, line: String) {
        if self.multi.println(&line).is_err() {
            tracing::info!("{}", line);
        }
    }
}

impl Default for BarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BarObserver {
    fn on_progress(&self, update: &ProgressUpdate<'_>) {
        let mut bars = self.lock_bars();
        let bar = bars
            .entry(update.file_name.to_string())
            .or_insert_with(|| self.new_bar(update.file_name, update.total));
        bar.set_position(update.transferred);
    }

    fn on_complete(&self, file_name: &str, bytes: u64, elapsed: Duration) {
        self.clear(file_name);
        self.print(format!(
            "[done] {} ({} @ {})",
            file_name,
            format_megabytes(bytes),
            format_speed(throughput(bytes, elapsed))
        ));
    }

    fn on_attempt_failed(&self, file_name: &str, url: &str, attempt: u32, retries: u32, error: &str) {
        self.clear(file_name);
        tracing::warn!("[retry {}/{}] {} error: {}", attempt, retries, url, error);
    }

    fn on_skipped(&self, file_name: &str) {
        tracing::info!("[skip] file already exists: {}", file_name);
    }
}

/// Limits how often progress is emitted
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Instant,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: Instant::now(),
        }
    }

    /// Returns true (and resets the timer) once the interval has elapsed
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_emit) >= self.interval {
            self.last_emit = now;
            true
        } else {
            false
        }
    }
}

/// Average bytes per second, guarding against a zero duration
pub fn throughput(bytes: u64, elapsed: Duration) -> f64 {
    bytes as f64 / elapsed.as_secs_f64().max(0.001)
}

/// Formats a transfer rate as KB/s below 1 MiB/s and MB/s above
pub fn format_speed(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= MIB {
        format!("{:.2} MB/s", bytes_per_sec / MIB)
    } else {
        format!("{:.2} KB/s", bytes_per_sec / KIB)
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / MIB)
}

/// `transferred/total` when the total is known, otherwise just `transferred`
pub fn format_progress(transferred: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => format!(
            "{:.2}/{:.2}MB",
            transferred as f64 / MIB,
            total as f64 / MIB
        ),
        _ => format_megabytes(transferred),
    }
}

//! Numbered directory namespace
//!
//! Remote directories are addressed as `{base}/{n}/` for small positive
//! integers. The namespace is sparse: most integers are absent or empty,
//! and a gap never means the end of the range.

use crate::url::{directory_url, parse_base_url};
use crate::UrlResult;
use url::Url;

/// The addressable space of numbered directories under one base URL
#[derive(Debug, Clone)]
pub struct DirectoryNamespace {
    base: Url,
}

impl DirectoryNamespace {
    /// Creates a namespace rooted at `base`
    ///
    /// A trailing separator is added to the base path if it is missing.
    pub fn new(base: &str) -> UrlResult<Self> {
        Ok(Self {
            base: parse_base_url(base)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL of directory `n`
    pub fn directory_url(&self, n: u64) -> UrlResult<Url> {
        directory_url(&self.base, n)
    }

    /// Every directory in `[1, end)`, in ascending order
    pub fn bounded(&self, end: u64) -> impl Iterator<Item = (u64, Url)> + '_ {
        (1..end).filter_map(move |n| match self.directory_url(n) {
            Ok(url) => Some((n, url)),
            Err(e) => {
                tracing::warn!("Skipping directory {}: {}", n, e);
                None
            }
        })
    }

    /// An open-ended walk starting at `start`
    pub fn sequential(&self, start: u64) -> SequentialScan {
        SequentialScan {
            namespace: self.clone(),
            next: start.max(1),
            consecutive_misses: 0,
            max_consecutive_misses: None,
        }
    }
}

/// Unbounded one-at-a-time walk over the namespace
///
/// Every probe result advances to `n + 1`, hit or miss. With no cutoff the
/// scan never ends on its own; the caller stops it on interrupt. An
/// optional cutoff ends the scan after a run of consecutive misses.
#[derive(Debug, Clone)]
pub struct SequentialScan {
    namespace: DirectoryNamespace,
    next: u64,
    consecutive_misses: u64,
    max_consecutive_misses: Option<u64>,
}

impl SequentialScan {
    /// Stops the scan after `limit` consecutive absent or empty directories
    pub fn with_miss_cutoff(mut self, limit: Option<u64>) -> Self {
        self.max_consecutive_misses = limit.filter(|l| *l > 0);
        self
    }

    /// The number that the next call to [`next_candidate`](Self::next_candidate) yields
    pub fn current(&self) -> u64 {
        self.next
    }

    pub fn consecutive_misses(&self) -> u64 {
        self.consecutive_misses
    }

    /// Whether the opt-in cutoff has been reached
    pub fn is_exhausted(&self) -> bool {
        self.max_consecutive_misses
            .is_some_and(|limit| self.consecutive_misses >= limit)
    }

    /// Returns the next directory to probe without advancing
    pub fn next_candidate(&self) -> Option<(u64, Url)> {
        if self.is_exhausted() {
            return None;
        }
        match self.namespace.directory_url(self.next) {
            Ok(url) => Some((self.next, url)),
            Err(e) => {
                tracing::error!("Cannot build URL for directory {}: {}", self.next, e);
                None
            }
        }
    }

    /// Records the outcome for the current directory and moves to the next one
    pub fn advance(&mut self, found: bool) {
        if found {
            self.consecutive_misses = 0;
        } else {
            self.consecutive_misses += 1;
        }
        self.next = self.next.saturating_add(1);
    }
}

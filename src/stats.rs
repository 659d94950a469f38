//! Best-effort counters exposed to external monitoring.
//!
//! The snapshot is an immutable value replaced wholesale on every update; it
//! is independent of the durable checkpoint and lost on restart without
//! consequence.

use serde::Serialize;

/// Counter snapshot for one downloader instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloaderStats {
    pub successful_downloads: u32,
    pub failed_downloads: u32,
    pub skipped_downloads: u32,
    pub expired_datasets: u32,
    /// Number of datasets currently tracked by the checkpoint state
    pub dataset_count: u32,
    /// Cumulative wall time spent on successful downloads, in milliseconds
    pub total_download_time_ms: u64,
}

impl DownloaderStats {
    pub const EMPTY: DownloaderStats = DownloaderStats {
        successful_downloads: 0,
        failed_downloads: 0,
        skipped_downloads: 0,
        expired_datasets: 0,
        dataset_count: 0,
        total_download_time_ms: 0,
    };

    pub fn successful_download(self, elapsed_ms: u64) -> Self {
        DownloaderStats {
            successful_downloads: self.successful_downloads + 1,
            total_download_time_ms: self.total_download_time_ms + elapsed_ms,
            ..self
        }
    }

    pub fn failed_download(self) -> Self {
        DownloaderStats {
            failed_downloads: self.failed_downloads + 1,
            ..self
        }
    }

    pub fn skipped_download(self) -> Self {
        DownloaderStats {
            skipped_downloads: self.skipped_downloads + 1,
            ..self
        }
    }

    pub fn expired_datasets(self, count: u32) -> Self {
        DownloaderStats {
            expired_datasets: self.expired_datasets + count,
            ..self
        }
    }

    pub fn count(self, datasets: usize) -> Self {
        DownloaderStats {
            dataset_count: datasets as u32,
            ..self
        }
    }
}

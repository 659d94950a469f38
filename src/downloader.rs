//! The dataset downloader: singleton sync task.
//!
//! One instance runs fleet-wide at a time (the host enforces this). Each
//! cycle fetches the remote catalog, refreshes changed datasets chunk by
//! chunk, expires datasets the configuration no longer covers, and re-arms
//! itself after the poll interval. Per-dataset progress is checkpointed so a
//! takeover by another node resumes instead of re-downloading.

use crate::catalog::{fetch_catalog, resolve_url, CatalogEntry};
use crate::config::SettingsHandle;
use crate::error::Result;
use crate::http::RemoteFetch;
use crate::state::{DatasetMetadata, TaskState};
use crate::stats::DownloaderStats;
use crate::store::{CheckpointStore, ChunkFilter, ChunkStore};
use crate::task::{TaskFlags, TaskHandle};
use crate::writer::write_chunks;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct Downloader {
    fetch: Arc<dyn RemoteFetch>,
    chunks: Arc<dyn ChunkStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    settings: SettingsHandle,
    state: TaskState,
    stats: DownloaderStats,
    status_tx: watch::Sender<Option<DownloaderStats>>,
    flags: Arc<TaskFlags>,
}

impl Downloader {
    pub fn new(
        fetch: Arc<dyn RemoteFetch>,
        chunks: Arc<dyn ChunkStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        settings: SettingsHandle,
    ) -> (Downloader, TaskHandle) {
        let flags = Arc::new(TaskFlags::default());
        let (status_tx, status_rx) = watch::channel(Some(DownloaderStats::EMPTY));
        let handle = TaskHandle::new(Arc::clone(&flags), status_rx);
        let downloader = Downloader {
            fetch,
            chunks,
            checkpoints,
            settings,
            state: TaskState::new(),
            stats: DownloaderStats::EMPTY,
            status_tx,
            flags,
        };
        (downloader, handle)
    }

    /// Seed the task state from a previously acknowledged checkpoint, e.g.
    /// after this node took the task over.
    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn stats(&self) -> DownloaderStats {
        self.stats
    }

    /// Run until cancelled or completed. Cancellation is observed only at
    /// the top of a cycle; an in-flight cycle always runs to completion.
    pub async fn run(mut self) {
        loop {
            if self.flags.is_cancelled() || self.flags.is_completed() {
                break;
            }
            self.run_cycle().await;

            let delay = self.settings.poll_interval();
            if self.flags.is_cancelled() || self.flags.is_completed() {
                break;
            }
            tokio::select! {
                _ = sleep(delay) => {}
                changed = self.settings.changed() => {
                    match changed {
                        // A settings update cancels the pending delay; the
                        // next cycle starts promptly under the new interval.
                        Ok(()) => sleep(Duration::from_millis(1)).await,
                        // Settings source gone: nothing can ever reconfigure
                        // us again, treat as terminal.
                        Err(_) => break,
                    }
                }
                _ = self.flags.wake.notified() => {}
            }
        }
        let _ = self.status_tx.send(None);
    }

    /// One full cycle: synchronize then expire, each phase under its own
    /// blanket error containment so neither can suppress the other or the
    /// rescheduling step.
    pub async fn run_cycle(&mut self) {
        if let Err(e) = self.update_datasets().await {
            error!(error = %e, "exception during dataset update");
        }
        if let Err(e) = self.clean_datasets().await {
            error!(error = %e, "exception during dataset cleanup");
        }
    }

    /// Fetch the catalog and process each recognized entry independently;
    /// one entry's failure never prevents the rest from being attempted.
    async fn update_datasets(&mut self) -> Result<()> {
        info!("updating datasets");
        let endpoint = self.settings.current().endpoint;
        let catalog = fetch_catalog(self.fetch.as_ref(), &endpoint).await?;
        for entry in &catalog {
            let Some(name) = entry.dataset_name() else {
                continue;
            };
            if let Err(e) = self.process_dataset(&name, entry, &endpoint).await {
                self.stats = self.stats.failed_download();
                self.publish_stats();
                error!(dataset = %name, error = %e, "error updating dataset");
            }
        }
        Ok(())
    }

    async fn process_dataset(
        &mut self,
        name: &str,
        entry: &CatalogEntry,
        endpoint: &str,
    ) -> Result<()> {
        if let Some(old) = self.state.get(name).cloned() {
            if old.md5 == entry.md5_hash {
                return self.touch_dataset(name, old).await;
            }
        }
        info!(dataset = %name, "updating dataset");

        let url = resolve_url(endpoint, &entry.url);
        let start = Utc::now().timestamp_millis();
        let mut stream = self.fetch.get_stream(&url).await?;

        let old = self.state.get(name).cloned();
        let first_chunk = old.as_ref().map(|m| m.last_chunk + 1).unwrap_or(0);
        let next_chunk = write_chunks(
            self.chunks.as_ref(),
            name,
            stream.as_mut(),
            first_chunk,
            &entry.md5_hash,
            start,
        )
        .await?;

        if next_chunk > first_chunk {
            let meta = DatasetMetadata {
                last_update: start,
                first_chunk: old.map(|m| m.first_chunk).unwrap_or(first_chunk),
                last_chunk: next_chunk - 1,
                md5: entry.md5_hash.clone(),
                last_check: start,
            };
            let keep_from = meta.first_chunk;
            self.commit_state(self.state.put(name, meta)).await?;
            let elapsed = (Utc::now().timestamp_millis() - start).max(0) as u64;
            self.stats = self
                .stats
                .successful_download(elapsed)
                .count(self.state.len());
            self.publish_stats();
            info!(dataset = %name, "updated dataset");
            self.delete_old_chunks(name, keep_from);
        }
        Ok(())
    }

    /// Checksum-equal short circuit: the dataset is unchanged, refresh only
    /// `last_check` and skip the payload fetch entirely.
    async fn touch_dataset(&mut self, name: &str, old: DatasetMetadata) -> Result<()> {
        info!(dataset = %name, "dataset is up to date, updated timestamp");
        let meta = DatasetMetadata {
            last_check: Utc::now().timestamp_millis(),
            ..old
        };
        self.stats = self.stats.skipped_download();
        self.publish_stats();
        self.commit_state(self.state.put(name, meta)).await
    }

    /// Expire checkpoint entries no longer valid under current settings:
    /// prune their whole chunk range and rewind `last_check` by one tick so
    /// the entry stays flagged for re-evaluation rather than being removed.
    async fn clean_datasets(&mut self) -> Result<()> {
        let settings = self.settings.current();
        let now = Utc::now().timestamp_millis();
        let stale: Vec<(String, DatasetMetadata)> = self
            .state
            .iter()
            .filter(|(name, meta)| !meta.is_valid(name.as_str(), &settings, now))
            .map(|(name, meta)| (name.clone(), meta.clone()))
            .collect();

        let mut expired = 0u32;
        for (name, meta) in stale {
            self.delete_old_chunks(&name, meta.last_chunk + 1);
            let demoted = DatasetMetadata {
                last_check: meta.last_check - 1,
                ..meta
            };
            self.commit_state(self.state.put(&name, demoted)).await?;
            expired += 1;
            info!(dataset = %name, "expired stale dataset");
        }
        self.stats = self.stats.expired_datasets(expired);
        self.publish_stats();
        Ok(())
    }

    /// Best-effort asynchronous delete of chunks below `keep_from`. Failure
    /// is logged and never retried; leftover chunks are harmless garbage.
    fn delete_old_chunks(&self, name: &str, keep_from: u32) {
        let chunks = Arc::clone(&self.chunks);
        let name = name.to_string();
        tokio::spawn(async move {
            let filter = ChunkFilter {
                name: name.clone(),
                chunk_below: keep_from,
            };
            if let Err(e) = chunks.delete_by_query(filter).await {
                warn!(dataset = %name, error = %e, "could not delete old chunks");
            }
        });
    }

    /// Persist a candidate state and swap the in-memory reference to the
    /// acknowledged value. On failure the in-memory state is left unchanged,
    /// so memory never claims durability it doesn't have.
    async fn commit_state(&mut self, candidate: TaskState) -> Result<()> {
        self.state = self.checkpoints.persist(candidate).await?;
        Ok(())
    }

    fn publish_stats(&self) {
        self.status_tx.send_replace(Some(self.stats));
    }
}

//! In-memory store implementations.
//!
//! Used by the integration tests and by `fleetsync-poll` dry runs. The chunk
//! store counts flush/refresh calls so tests can observe the durability
//! barrier.

use super::{CheckpointStore, ChunkDocument, ChunkFilter, ChunkStore};
use crate::error::{Result, SyncError};
use crate::state::TaskState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct ChunkStoreInner {
    docs: BTreeMap<String, ChunkDocument>,
    flushes: u64,
    refreshes: u64,
}

/// In-memory [`ChunkStore`] with create-only semantics.
#[derive(Default)]
pub struct MemoryChunkStore {
    inner: Mutex<ChunkStoreInner>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed chunk indices for `name`, in ascending order.
    pub fn chunk_indices(&self, name: &str) -> Vec<u32> {
        let inner = self.inner.lock().unwrap();
        let mut indices: Vec<u32> = inner
            .docs
            .values()
            .filter(|d| d.name == name)
            .map(|d| d.chunk)
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Reassembled payload for `name` over the given inclusive chunk range.
    pub fn payload(&self, name: &str, first: u32, last: u32) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        let mut docs: Vec<&ChunkDocument> = inner
            .docs
            .values()
            .filter(|d| d.name == name && d.chunk >= first && d.chunk <= last)
            .collect();
        docs.sort_by_key(|d| d.chunk);
        docs.iter().flat_map(|d| d.data.iter().copied()).collect()
    }

    pub fn doc_count(&self) -> usize {
        self.inner.lock().unwrap().docs.len()
    }

    pub fn flush_count(&self) -> u64 {
        self.inner.lock().unwrap().flushes
    }

    pub fn refresh_count(&self) -> u64 {
        self.inner.lock().unwrap().refreshes
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn create(&self, doc: ChunkDocument) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.docs.contains_key(&doc.id) {
            return Err(SyncError::StorageWrite(format!(
                "document [{}] already exists",
                doc.id
            )));
        }
        inner.docs.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.inner.lock().unwrap().flushes += 1;
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.inner.lock().unwrap().refreshes += 1;
        Ok(())
    }

    async fn delete_by_query(&self, filter: ChunkFilter) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.docs.len();
        inner
            .docs
            .retain(|_, d| !(d.name == filter.name && d.chunk < filter.chunk_below));
        Ok((before - inner.docs.len()) as u64)
    }
}

/// In-memory [`CheckpointStore`] that acknowledges exactly what it is given.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    persisted: Mutex<Option<TaskState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last durably acknowledged state, if any.
    pub fn persisted(&self) -> Option<TaskState> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn persist(&self, state: TaskState) -> Result<TaskState> {
        *self.persisted.lock().unwrap() = Some(state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_create_is_create_only() {
        let store = MemoryChunkStore::new();
        let doc = ChunkDocument::new("geo.db", 0, 42, Bytes::from_static(b"x"));

        store.create(doc.clone()).await.unwrap();
        let err = store.create(doc).await.unwrap_err();
        assert!(matches!(err, SyncError::StorageWrite(_)));
    }

    #[tokio::test]
    async fn test_delete_by_query_is_range_bounded() {
        let store = MemoryChunkStore::new();
        for chunk in 0..5 {
            store
                .create(ChunkDocument::new("geo.db", chunk, 42, Bytes::from_static(b"x")))
                .await
                .unwrap();
        }
        store
            .create(ChunkDocument::new("asn.db", 0, 42, Bytes::from_static(b"x")))
            .await
            .unwrap();

        let deleted = store
            .delete_by_query(ChunkFilter {
                name: "geo.db".to_string(),
                chunk_below: 3,
            })
            .await
            .unwrap();

        assert_eq!(deleted, 3);
        assert_eq!(store.chunk_indices("geo.db"), [3, 4]);
        assert_eq!(store.chunk_indices("asn.db"), [0]);
    }

    #[tokio::test]
    async fn test_checkpoint_store_acknowledges() {
        let store = MemoryCheckpointStore::new();
        assert!(store.persisted().is_none());

        let state = TaskState::new();
        let acked = store.persist(state.clone()).await.unwrap();
        assert_eq!(acked, state);
        assert_eq!(store.persisted().unwrap(), state);
    }
}

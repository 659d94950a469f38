//! Storage interfaces consumed by the downloader.
//!
//! The chunk store is a replicated append/query collection addressed by
//! document id; the checkpoint store is the cluster-durable home of the
//! task state. Both live outside this crate; only their interfaces appear
//! here.

pub mod memory;

use crate::error::Result;
use crate::state::TaskState;
use async_trait::async_trait;
use bytes::Bytes;

/// One committed chunk of a dataset's byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDocument {
    /// Composite id: `"{name}_{chunk}_{timestamp}"`
    pub id: String,
    pub name: String,
    pub chunk: u32,
    pub data: Bytes,
}

impl ChunkDocument {
    pub fn new(name: &str, chunk: u32, timestamp_ms: i64, data: Bytes) -> Self {
        ChunkDocument {
            id: format!("{name}_{chunk}_{timestamp_ms}"),
            name: name.to_string(),
            chunk,
            data,
        }
    }
}

/// Delete filter: name equality plus an exclusive upper bound on the chunk
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFilter {
    pub name: String,
    /// Delete chunks with index strictly below this value
    pub chunk_below: u32,
}

/// Durable chunked storage collection.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Create-only write: fails if a document with the same id exists.
    async fn create(&self, doc: ChunkDocument) -> Result<()>;

    /// Force pending writes to durable storage.
    async fn flush(&self) -> Result<()>;

    /// Make committed writes visible to readers.
    async fn refresh(&self) -> Result<()>;

    /// Delete all documents matching the filter; returns how many went away.
    async fn delete_by_query(&self, filter: ChunkFilter) -> Result<u64>;
}

/// Cluster-durable checkpoint store for the task state.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist the state and return the acknowledged value. The returned
    /// state is authoritative; the host may have reconciled it.
    async fn persist(&self, state: TaskState) -> Result<TaskState>;
}

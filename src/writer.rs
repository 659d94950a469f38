//! Chunk writer and verifier.
//!
//! Streams a dataset body into fixed-size chunks, feeds each into a running
//! MD5, and commits each as a create-only document. Chunks are processed in
//! strict stream order; the loop does not advance until the current chunk is
//! committed.

use crate::error::{Result, SyncError};
use crate::http::ChunkRead;
use crate::store::{ChunkDocument, ChunkStore};
use md5::{Digest, Md5};

/// Maximum chunk payload size. A short final chunk ends the stream.
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Stream `stream` into chunk documents for `name` starting at `chunk`,
/// returning the next free index.
///
/// After the stream is exhausted a flush + refresh barrier runs against the
/// store, then the accumulated hash is compared to `expected_md5`. On
/// mismatch the already committed chunks stay in place; the caller must not
/// update its checkpoint, so they remain unreferenced until a later resume
/// extends past them.
pub async fn write_chunks(
    store: &dyn ChunkStore,
    name: &str,
    stream: &mut dyn ChunkRead,
    mut chunk: u32,
    expected_md5: &str,
    timestamp_ms: i64,
) -> Result<u32> {
    let mut digest = Md5::new();
    loop {
        let block = read_block(stream).await?;
        if block.is_empty() {
            break;
        }
        digest.update(&block);
        store
            .create(ChunkDocument::new(name, chunk, timestamp_ms, block.into()))
            .await?;
        chunk += 1;
    }

    // Large chunk documents should not linger unflushed, and they must be
    // visible to readers before the checkpoint can reference them.
    store.flush().await?;
    store.refresh().await?;

    let actual = hex::encode(digest.finalize());
    if actual != expected_md5 {
        return Err(SyncError::ChecksumMismatch {
            expected: expected_md5.to_string(),
            actual,
        });
    }
    Ok(chunk)
}

/// Read one block of at most [`MAX_CHUNK_SIZE`] bytes, looping over short
/// reads until the block is full or the stream ends. Empty result means end
/// of stream.
async fn read_block(stream: &mut dyn ChunkRead) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_CHUNK_SIZE];
    let mut filled = 0;
    while filled < MAX_CHUNK_SIZE {
        let read = stream.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    buf.truncate(filled);
    Ok(buf)
}

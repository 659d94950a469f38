//! HTTP transport for catalog and payload fetches.
//!
//! The downloader only sees the [`RemoteFetch`] trait so tests can substitute
//! canned responses; the production implementation wraps `reqwest`.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bytes::Bytes;

/// Minimal pull-based byte stream.
///
/// `read` fills as much of `buf` as it can and returns the number of bytes
/// written; `Ok(0)` signals end of stream.
#[async_trait]
pub trait ChunkRead: Send {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Remote fetch interface: one-shot body fetch plus streaming reads.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Bytes>;

    async fn get_stream(&self, url: &str) -> Result<Box<dyn ChunkRead>>;
}

/// `reqwest`-backed transport.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(request_timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(HttpClient { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SyncError::Transport(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteFetch for HttpClient {
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        Ok(self.get(url).await?.bytes().await?)
    }

    async fn get_stream(&self, url: &str) -> Result<Box<dyn ChunkRead>> {
        let response = self.get(url).await?;
        Ok(Box::new(ResponseStream {
            response,
            pending: Bytes::new(),
        }))
    }
}

/// Adapts a `reqwest` response body to [`ChunkRead`], buffering the tail of
/// the last network chunk between reads.
struct ResponseStream {
    response: reqwest::Response,
    pending: Bytes,
}

#[async_trait]
impl ChunkRead for ResponseStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        while self.pending.is_empty() {
            match self.response.chunk().await? {
                Some(bytes) => self.pending = bytes,
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }
}

/// In-memory stream over a byte buffer, used by tests and the one-shot
/// binary's dry runs.
#[async_trait]
impl ChunkRead for Bytes {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.len());
        buf[..n].copy_from_slice(&self.split_to(n));
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bytes_stream_drains() {
        let mut stream = Bytes::from_static(b"hello world");
        let mut buf = [0u8; 5];

        assert_eq!(stream.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(stream.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf, b" worl");
        assert_eq!(stream.read(&mut buf).await.unwrap(), 1);
        assert_eq!(buf[0], b'd');
        assert_eq!(stream.read(&mut buf).await.unwrap(), 0);
    }
}

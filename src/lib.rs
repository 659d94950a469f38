//! fleetsync - cluster-singleton dataset downloader.
//!
//! Exactly one downloader instance runs across a fleet at a time. It
//! periodically pulls a remote catalog of versioned datasets, streams changed
//! payloads into 1 MiB chunk documents with MD5 verification, and checkpoints
//! per-dataset progress into cluster-durable state so a takeover resumes
//! instead of starting over.
//!
//! The cluster membership layer, the chunk storage backend, and the catalog
//! server are external collaborators; this crate consumes them through the
//! traits in [`http`] and [`store`].

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod state;
pub mod stats;
pub mod store;
pub mod task;
pub mod writer;

pub use catalog::CatalogEntry;
pub use config::{Settings, SettingsHandle};
pub use downloader::Downloader;
pub use error::{Result, SyncError};
pub use state::{DatasetMetadata, TaskState};
pub use stats::DownloaderStats;
pub use task::TaskHandle;

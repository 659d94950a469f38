//! Remote catalog: the manifest of available datasets.

use crate::error::{Result, SyncError};
use crate::http::RemoteFetch;
use serde::Deserialize;
use tracing::info;

/// Query parameter appended to every catalog fetch, an external contract
/// with the catalog server.
const TOS_QUERY: &str = "service_tos=agree";

/// Archive suffix recognized in catalog entry names.
pub const ARCHIVE_SUFFIX: &str = ".tgz";

/// Extension of the canonical dataset name stored in the chunk collection.
pub const DATASET_EXTENSION: &str = ".db";

/// One catalog entry, fetched fresh each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub md5_hash: String,
    pub url: String,
}

impl CatalogEntry {
    /// Canonical dataset name: archive suffix stripped, storage extension
    /// appended. `None` for entries that are not recognized archives.
    pub fn dataset_name(&self) -> Option<String> {
        self.name
            .strip_suffix(ARCHIVE_SUFFIX)
            .map(|stem| format!("{stem}{DATASET_EXTENSION}"))
    }
}

/// Fetch and parse the catalog from `endpoint`.
pub async fn fetch_catalog(fetch: &dyn RemoteFetch, endpoint: &str) -> Result<Vec<CatalogEntry>> {
    let url = format!("{endpoint}?{TOS_QUERY}");
    info!(%url, "fetching dataset catalog");
    let body = fetch.get_bytes(&url).await?;
    let entries: Vec<CatalogEntry> =
        serde_json::from_slice(&body).map_err(|e| SyncError::Format(e.to_string()))?;
    Ok(entries)
}

/// Resolve a catalog entry's download URL against the catalog endpoint.
///
/// Absolute URLs are used verbatim. Relative URLs resolve as a sibling of
/// the endpoint's last path segment: the final component is replaced, or the
/// URL is appended when the endpoint has no path beyond its authority.
pub fn resolve_url(endpoint: &str, url: &str) -> String {
    if url.starts_with("http") {
        return url.to_string();
    }
    let authority_start = endpoint.find("://").map(|i| i + 3).unwrap_or(0);
    match endpoint[authority_start..].rfind('/') {
        Some(i) => format!("{}/{}", &endpoint[..authority_start + i], url),
        None => format!("{endpoint}/{url}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_name_strips_archive_suffix() {
        let entry = CatalogEntry {
            name: "geo.tgz".to_string(),
            md5_hash: "abc123".to_string(),
            url: "geo.tgz".to_string(),
        };
        assert_eq!(entry.dataset_name().unwrap(), "geo.db");
    }

    #[test]
    fn test_dataset_name_rejects_other_suffixes() {
        let entry = CatalogEntry {
            name: "geo.zip".to_string(),
            md5_hash: "abc123".to_string(),
            url: "geo.zip".to_string(),
        };
        assert!(entry.dataset_name().is_none());
    }

    #[test]
    fn test_resolve_absolute_url_verbatim() {
        assert_eq!(
            resolve_url("https://host/v1/database", "https://cdn/geo.tgz"),
            "https://cdn/geo.tgz"
        );
    }

    #[test]
    fn test_resolve_relative_url_as_sibling() {
        assert_eq!(
            resolve_url("https://host/v1/database", "geo.tgz"),
            "https://host/v1/geo.tgz"
        );
        assert_eq!(
            resolve_url("https://host/v1/database", "v2/geo.tgz"),
            "https://host/v1/v2/geo.tgz"
        );
    }

    #[test]
    fn test_resolve_relative_url_without_path() {
        assert_eq!(resolve_url("https://host", "geo.tgz"), "https://host/geo.tgz");
    }

    #[test]
    fn test_parse_catalog_json() {
        let body = br#"[{"name":"geo.tgz","md5_hash":"abc123","url":"geo.tgz"}]"#;
        let entries: Vec<CatalogEntry> = serde_json::from_slice(body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].md5_hash, "abc123");
    }
}

//! On-disk registry cache.
//!
//! One JSON file per project under the OS temp directory, named by the hex
//! SHA-256 of the project root path (`"-"` when there is none). The cache is
//! an accelerator: missing or corrupt content is treated as empty and store
//! failures are logged, never surfaced.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

use super::entry::RegistryEntry;

/// Cache file location for a project root. Deterministic, so external
/// tooling (and tests) can find or pre-seed the cache.
pub fn cache_path(project_root: Option<&Path>) -> PathBuf {
    let key = project_root
        .map(|root| root.to_string_lossy().into_owned())
        .unwrap_or_else(|| "-".to_string());
    let digest = Sha256::digest(key.as_bytes());
    std::env::temp_dir().join(hex::encode(digest))
}

pub(crate) async fn load(path: &Path) -> FxHashMap<String, RegistryEntry> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            if err.kind() != ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %err, "registry cache unreadable");
            }
            return FxHashMap::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "registry cache corrupt");
            FxHashMap::default()
        }
    }
}

pub(crate) async fn store(path: &Path, entries: &FxHashMap<String, RegistryEntry>) {
    let payload = match serde_json::to_vec(entries) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize registry cache");
            return;
        }
    };
    if let Err(err) = tokio::fs::write(path, payload).await {
        tracing::warn!(path = %path.display(), error = %err, "failed to write registry cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_path_is_stable_and_distinct() {
        let a = cache_path(Some(Path::new("/project/a")));
        let b = cache_path(Some(Path::new("/project/b")));
        let none = cache_path(None);
        assert_eq!(a, cache_path(Some(Path::new("/project/a"))));
        assert_ne!(a, b);
        assert_ne!(a, none);
        // Hex SHA-256 basename, 64 chars.
        assert_eq!(a.file_name().unwrap().to_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn missing_cache_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let entries = load(&dir.path().join("does-not-exist")).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn corrupt_cache_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache");
        std::fs::write(&path, "not json at all").unwrap();
        let entries = load(&path).await;
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn round_trips_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache");

        let mut entries = FxHashMap::default();
        let mut entry = RegistryEntry::new("1.2.3");
        entry.idents.insert("lodash".to_string());
        entry.props.insert("map".to_string());
        entries.insert("lodash".to_string(), entry);

        store(&path, &entries).await;
        let loaded = load(&path).await;
        assert_eq!(loaded, entries);
    }
}

//! Storage abstraction for JSON persistence
//!
//! Reads the Home Assistant `.storage/` directory format with versioning.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage key mismatch: expected {expected}, found {found}")]
    KeyMismatch { expected: String, found: String },

    #[error("Lock poisoned while loading {0}")]
    LockPoisoned(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage file wrapper with version tracking
///
/// JSON format:
/// ```json
/// {
///   "version": 1,
///   "minor_version": 1,
///   "key": "core.entity_registry",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    /// Major version - breaking changes
    pub version: u32,
    /// Minor version - migrations within major version
    #[serde(default = "default_minor_version")]
    pub minor_version: u32,
    /// Storage key (file identifier)
    pub key: String,
    /// The actual data
    pub data: T,
}

fn default_minor_version() -> u32 {
    1
}

/// Data that lives under a fixed storage key
pub trait Storable: DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
}

/// Storage manager for the `.storage/` directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Create a storage manager rooted at `<config_dir>/.storage`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Load the data stored for `T::KEY`
    ///
    /// Returns `None` if the file doesn't exist. A newer major version than
    /// the one we know is loaded anyway, with a warning.
    pub async fn load<T: Storable>(&self) -> StorageResult<Option<StorageFile<T>>> {
        let path = self.file_path(T::KEY);

        if !fs::try_exists(&path).await? {
            debug!("Storage file not found: {}", T::KEY);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let storage_file: StorageFile<T> = serde_json::from_str(&content)?;

        if storage_file.key != T::KEY {
            return Err(StorageError::KeyMismatch {
                expected: T::KEY.to_string(),
                found: storage_file.key,
            });
        }
        if storage_file.version > T::VERSION {
            warn!(
                "Storage file {} has version {}, newer than supported {}",
                T::KEY,
                storage_file.version,
                T::VERSION
            );
        }

        debug!(
            "Loaded storage file: {} (v{}.{})",
            T::KEY,
            storage_file.version,
            storage_file.minor_version
        );

        Ok(Some(storage_file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        values: Vec<String>,
    }

    impl Storable for Sample {
        const KEY: &'static str = "test.sample";
        const VERSION: u32 = 1;
    }

    fn write_sample(storage: &Storage, content: &str) {
        std::fs::create_dir_all(storage.storage_dir()).unwrap();
        std::fs::write(storage.file_path(Sample::KEY), content).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        let loaded = storage.load::<Sample>().await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_reads_envelope() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        write_sample(
            &storage,
            r#"{"version": 1, "minor_version": 2, "key": "test.sample", "data": {"values": ["a", "b"]}}"#,
        );

        let loaded = storage.load::<Sample>().await.unwrap().unwrap();

        assert_eq!(loaded.key, "test.sample");
        assert_eq!(loaded.minor_version, 2);
        assert_eq!(
            loaded.data,
            Sample {
                values: vec!["a".into(), "b".into()]
            }
        );
    }

    #[tokio::test]
    async fn test_newer_version_still_loads() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        write_sample(
            &storage,
            r#"{"version": 3, "key": "test.sample", "data": {"values": []}}"#,
        );

        let loaded = storage.load::<Sample>().await.unwrap().unwrap();

        assert_eq!(loaded.version, 3);
        assert_eq!(loaded.minor_version, 1);
    }

    #[tokio::test]
    async fn test_key_mismatch() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        write_sample(
            &storage,
            r#"{"version": 1, "key": "other.key", "data": {"values": []}}"#,
        );

        let result = storage.load::<Sample>().await;
        assert!(matches!(result, Err(StorageError::KeyMismatch { .. })));
    }
}

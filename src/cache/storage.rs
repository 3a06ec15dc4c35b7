use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("i/o error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(key: &str, source: std::io::Error) -> Self {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Key/value blob storage rooted in a directory, with keys mapping to
/// relative paths. Every write lands through a temp file and a rename.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf, base_url: String) -> Self {
        Self { base_dir, base_url }
    }

    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(key, err)),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StorageError::Corrupt {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io(key, err))?;
        }
        let tmp = path.with_file_name(format!(
            ".{}.{}.tmp",
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("blob"),
            Uuid::new_v4().simple()
        ));
        if let Err(err) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::io(key, err));
        }
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::io(key, err));
        }
        Ok(())
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let payload = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.put(key, &payload).await
    }

    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key);
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(key, err)),
        }
    }

    /// Removes a single blob; a missing blob is not an error.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.resolve_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io(key, err)),
        }
    }

    /// Removes every blob below `prefix`.
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        match fs::remove_dir_all(self.resolve_path(prefix)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::io(prefix, err)),
        }
    }

    /// Names of the direct children of `prefix`, sorted.
    pub async fn list_children(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let dir_path = self.resolve_path(prefix);
        let mut dir = match fs::read_dir(&dir_path).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::io(prefix, err)),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|err| StorageError::io(prefix, err))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn get_public_url(&self, key: &str) -> String {
        let trimmed = normalize_scheme(self.base_url.trim_end_matches('/'));
        let key = key.trim_start_matches('/');
        format!("{trimmed}/{key}")
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}

/// Collapses doubled schemes such as `http://https://host` that appear when
/// a configured domain already carries a scheme.
pub fn normalize_scheme(raw: &str) -> String {
    let mut base = raw.to_string();
    loop {
        let next = if base.starts_with("http://http://") {
            base.replacen("http://http://", "http://", 1)
        } else if base.starts_with("https://https://") {
            base.replacen("https://https://", "https://", 1)
        } else if base.starts_with("http://https://") {
            base.replacen("http://https://", "https://", 1)
        } else if base.starts_with("https://http://") {
            base.replacen("https://http://", "http://", 1)
        } else {
            return base;
        };
        base = next;
    }
}

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

/// Blob holding every user account (with credentials)
pub const USERS_BLOB: &str = "users";
/// Blob holding every task record, across all users
pub const TODOS_BLOB: &str = "todos";
/// Blob holding the active session's user (without credentials)
pub const CURRENT_USER_BLOB: &str = "currentUser";

/// Error type for blob store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read blob {name}: {source}")]
    Read { name: String, source: io::Error },
    #[error("could not write blob {name}: {source}")]
    Write { name: String, source: io::Error },
    #[error("blob {name} is corrupt: {source}")]
    Corrupt {
        name: String,
        source: serde_json::Error,
    },
    #[error("could not encode blob {name}: {source}")]
    Encode {
        name: String,
        source: serde_json::Error,
    },
}

/// A durable key-value store of whole named blobs.
///
/// Blobs are always read and written in full; there are no partial updates.
pub trait BlobStore {
    /// Read a blob. `Ok(None)` means the blob has never been written.
    fn read_blob(&self, name: &str) -> Result<Option<String>, StoreError>;
    /// Replace a blob's contents.
    fn write_blob(&mut self, name: &str, contents: &str) -> Result<(), StoreError>;
    /// Remove a blob. Removing an absent blob is not an error.
    fn remove_blob(&mut self, name: &str) -> Result<(), StoreError>;
}

impl<S: BlobStore + ?Sized> BlobStore for &mut S {
    fn read_blob(&self, name: &str) -> Result<Option<String>, StoreError> {
        (**self).read_blob(name)
    }

    fn write_blob(&mut self, name: &str, contents: &str) -> Result<(), StoreError> {
        (**self).write_blob(name, contents)
    }

    fn remove_blob(&mut self, name: &str) -> Result<(), StoreError> {
        (**self).remove_blob(name)
    }
}

/// Read and decode a JSON blob.
pub fn read_json<T, S>(store: &S, name: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: BlobStore + ?Sized,
{
    match store.read_blob(name)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                name: name.to_string(),
                source,
            }),
    }
}

/// Encode a value as JSON and write it as a whole blob.
pub fn write_json<T, S>(store: &mut S, name: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
    S: BlobStore + ?Sized,
{
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
        name: name.to_string(),
        source,
    })?;
    store.write_blob(name, &text)
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Stores each blob as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Write {
            name: dir.display().to_string(),
            source,
        })?;
        Ok(FileStore { dir })
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl BlobStore for FileStore {
    fn read_blob(&self, name: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.blob_path(name)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                name: name.to_string(),
                source,
            }),
        }
    }

    fn write_blob(&mut self, name: &str, contents: &str) -> Result<(), StoreError> {
        atomic_write(&self.blob_path(name), contents.as_bytes()).map_err(|source| {
            StoreError::Write {
                name: name.to_string(),
                source,
            }
        })?;
        tracing::trace!(blob = name, bytes = contents.len(), "blob written");
        Ok(())
    }

    fn remove_blob(&mut self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.blob_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Write {
                name: name.to_string(),
                source,
            }),
        }
    }
}

/// Write to a temp file in the same directory, then rename over the target.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A store held entirely in memory. Used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, String>,
    /// When set, every write and remove fails (simulates a full disk)
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents of a blob, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.blobs.get(name).map(|s| s.as_str())
    }

    /// Seed a blob with raw contents, bypassing `fail_writes`
    pub fn insert(&mut self, name: &str, contents: impl Into<String>) {
        self.blobs.insert(name.to_string(), contents.into());
    }

    fn write_failure(name: &str) -> StoreError {
        StoreError::Write {
            name: name.to_string(),
            source: io::Error::other("storage quota exceeded"),
        }
    }
}

impl BlobStore for MemoryStore {
    fn read_blob(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.get(name).cloned())
    }

    fn write_blob(&mut self, name: &str, contents: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(Self::write_failure(name));
        }
        self.blobs.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn remove_blob(&mut self, name: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(Self::write_failure(name));
        }
        self.blobs.remove(name);
        Ok(())
    }
}

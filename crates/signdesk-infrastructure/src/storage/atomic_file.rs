//! Atomic file writes with advisory locking.
//!
//! Writes go to a hidden temp file in the same directory, are fsynced, then
//! renamed over the target so readers never see a torn file.

use serde::{Serialize, de::DeserializeOwned};
use signdesk_core::SignDeskError;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum AtomicFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl From<AtomicFileError> for SignDeskError {
    fn from(err: AtomicFileError) -> Self {
        match err {
            AtomicFileError::Io(e) => e.into(),
            AtomicFileError::Json(e) => e.into(),
            other => SignDeskError::backend(other.to_string()),
        }
    }
}

/// Replaces `path` with `contents` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AtomicFileError> {
    let parent = path
        .parent()
        .ok_or_else(|| AtomicFileError::InvalidPath(format!("{} has no parent", path.display())))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| AtomicFileError::InvalidPath(format!("{} has no file name", path.display())))?;
    fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(contents)?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// A JSON document on disk with locked read-modify-write.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document. Missing or empty files yield `None`.
    pub fn load(&self) -> Result<Option<T>, AtomicFileError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, data: &T) -> Result<(), AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;
        write_atomic(&self.path, &serde_json::to_vec_pretty(data)?)
    }

    /// Removes the document. Returns `true` if it existed.
    pub fn remove(&self) -> Result<bool, AtomicFileError> {
        let _lock = FileLock::acquire(&self.path)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Exclusive advisory lock on `<path>.lock`, released on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicFileError::Lock(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

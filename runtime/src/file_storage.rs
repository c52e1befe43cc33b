//! File-backed implementation of [`KeyValueStorage`].
//!
//! Each key maps to one file inside a data directory. Keys are escaped into
//! file names made only of ASCII alphanumerics, `-` and `_xx` byte escapes,
//! so namespaced keys such as `todokit/todos/v1` never create
//! subdirectories and never collide with each other or with temp files.
//!
//! Writes go to a sibling temp file which is flushed and then renamed over
//! the target, so a crash mid-write leaves the previous value intact. Every
//! write gets its own temp file, and writes and removals of the same key
//! are serialized, so overlapping calls never interleave their bytes.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt};
use todokit_core::storage::{KeyValueStorage, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

const VALUE_EXTENSION: &str = "kv";
const TEMP_EXTENSION: &str = "tmp";

/// Sequence shared by every `FileStorage` in the process, so two handles on
/// the same directory never pick the same temp name.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// One-file-per-key storage rooted at a directory.
///
/// The directory is created on first write. Clones share the per-key
/// locks, so writes through any clone are ordered against each other.
///
/// # Example
///
/// ```no_run
/// use todokit_core::storage::KeyValueStorage;
/// use todokit_runtime::FileStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = FileStorage::new(".todokit");
/// storage.set("todokit/todos/v1", b"{}".to_vec()).await?;
/// assert!(storage.get("todokit/todos/v1").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl FileStorage {
    /// Create a storage rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Arc::default(),
        }
    }

    /// Directory holding the stored values
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file that holds `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{VALUE_EXTENSION}", escape_key(key)))
    }

    /// Fresh temp path for one write of `key`
    fn temp_path_for(&self, key: &str) -> PathBuf {
        let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            "{}.{}-{sequence}.{TEMP_EXTENSION}",
            escape_key(key),
            std::process::id()
        ))
    }

    /// Waits for exclusive access to `key`
    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.to_owned()).or_default())
        };
        lock.lock_owned().await
    }

    async fn write_atomic(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock_key(key).await;
        tokio::fs::create_dir_all(&self.root).await?;

        let target = self.path_for(key);
        let temp = self.temp_path_for(key);

        let written = async {
            let mut file = tokio::fs::File::create(&temp).await?;
            file.write_all(value).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp, &target).await
        }
        .await;

        if let Err(error) = written {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(error.into());
        }
        tracing::trace!(path = %target.display(), bytes = value.len(), "Wrote value");
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        async move {
            match tokio::fs::read(self.path_for(key)).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        async move { self.write_atomic(key, &value).await }.boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let _guard = self.lock_key(key).await;
            match tokio::fs::remove_file(self.path_for(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }
}

/// Escape a key into a portable file stem.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "_{byte:02x}");
        }
    }
    out
}

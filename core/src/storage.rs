//! Key/value storage trait - the persistence gateway.
//!
//! Features persist state by writing whole snapshots under a fixed key. The
//! gateway only needs three operations and no transactional guarantees:
//!
//! - `get`: read the bytes stored under a key, if any
//! - `set`: replace the bytes stored under a key
//! - `remove`: delete a key (deleting a missing key is not an error)
//!
//! # Implementations
//!
//! - `FileStorage` (in `todokit-runtime`): one file per key on local disk
//! - `InMemoryStorage` (in `todokit-testing`): map-backed, with failure injection
//!
//! # Design
//!
//! This trait uses explicit boxed-future returns instead of `async fn`
//! so it can be used as a trait object (`Arc<dyn KeyValueStorage>`) inside
//! reducer environments, where effects capture it by value.

use futures::future::BoxFuture;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem or device I/O failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The storage backend is not available
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Asynchronous key/value byte storage.
///
/// # Example
///
/// ```ignore
/// async fn roundtrip(storage: &dyn KeyValueStorage) -> Result<()> {
///     storage.set("app/state/v1", b"{}".to_vec()).await?;
///     let data = storage.get("app/state/v1").await?;
///     assert_eq!(data.as_deref(), Some(&b"{}"[..]));
///     storage.remove("app/state/v1").await
/// }
/// ```
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key has never been written or was removed.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    /// Delete the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the delete fails. A missing key is not a failure.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>>;
}

//! Ordered writes and removals of the stored snapshot.
//!
//! The reducer stamps every storage operation with a revision, increasing
//! in the order the operations were issued. The gate applies operations one
//! at a time and skips any whose revision is not newer than the last one
//! applied, so however the effect tasks get scheduled, the stored value
//! ends up matching the newest operation.

use todokit_core::storage::{KeyValueStorage, Result};
use tokio::sync::Mutex;

/// A change to the stored snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Replace the stored bytes
    Write(Vec<u8>),
    /// Delete the key
    Remove,
}

impl StorageOp {
    /// Short name for logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Write(_) => "write",
            Self::Remove => "remove",
        }
    }
}

/// Serializes storage operations and drops superseded ones
///
/// Shared by every clone of the environment it lives in.
#[derive(Debug, Default)]
pub struct PersistGate {
    applied: Mutex<u64>,
}

impl PersistGate {
    /// Creates a gate that has applied nothing yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `op` unless an operation with a revision at least as new
    /// has already been applied
    ///
    /// Returns `None` when the operation was superseded, otherwise the
    /// gateway's result. A failed operation still counts as applied.
    pub async fn apply(
        &self,
        storage: &dyn KeyValueStorage,
        key: &str,
        revision: u64,
        op: StorageOp,
    ) -> Option<Result<()>> {
        let mut applied = self.applied.lock().await;
        if *applied >= revision {
            tracing::trace!(
                revision,
                applied = *applied,
                op = op.label(),
                "Skipping superseded storage operation"
            );
            return None;
        }
        *applied = revision;

        Some(match op {
            StorageOp::Write(bytes) => storage.set(key, bytes).await,
            StorageOp::Remove => storage.remove(key).await,
        })
    }

    /// Revision of the newest operation applied so far
    pub async fn applied_revision(&self) -> u64 {
        *self.applied.lock().await
    }
}

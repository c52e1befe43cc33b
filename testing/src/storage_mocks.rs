//! In-memory storage testing utilities
//!
//! [`InMemoryStorage`] is a `HashMap`-backed [`KeyValueStorage`] that records
//! every call it receives and can be told to fail or stall individual
//! operations, so tests can exercise the "storage errors are swallowed"
//! paths and writes that complete out of order.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use todokit_core::storage::{KeyValueStorage, Result, StorageError};

/// One recorded call against [`InMemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    /// `get(key)`
    Get(String),
    /// `set(key, value)`
    Set(String, Vec<u8>),
    /// `remove(key)`
    Remove(String),
}

#[derive(Debug, Default)]
struct Inner {
    data: HashMap<String, Vec<u8>>,
    calls: Vec<StorageCall>,
    fail_get: bool,
    fail_set: bool,
    fail_remove: bool,
    set_delays: VecDeque<Duration>,
}

/// In-memory key/value storage for fast, deterministic testing.
///
/// Clones share the same underlying map, so a test can keep one handle
/// while the code under test owns another.
///
/// # Example
///
/// ```
/// use todokit_testing::InMemoryStorage;
/// use todokit_core::storage::KeyValueStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = InMemoryStorage::new();
/// storage.set("k", b"v".to_vec()).await?;
/// assert_eq!(storage.value("k"), Some(b"v".to_vec()));
///
/// storage.fail_gets(true);
/// assert!(storage.get("k").await.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStorage {
    /// Create a new empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with `value` under `key`
    #[must_use]
    pub fn with_value(key: &str, value: impl Into<Vec<u8>>) -> Self {
        let storage = Self::new();
        storage
            .inner
            .write()
            .unwrap()
            .data
            .insert(key.to_string(), value.into());
        storage
    }

    /// Make every subsequent `get` fail
    pub fn fail_gets(&self, fail: bool) {
        self.inner.write().unwrap().fail_get = fail;
    }

    /// Make every subsequent `set` fail
    pub fn fail_sets(&self, fail: bool) {
        self.inner.write().unwrap().fail_set = fail;
    }

    /// Make every subsequent `remove` fail
    pub fn fail_removes(&self, fail: bool) {
        self.inner.write().unwrap().fail_remove = fail;
    }

    /// Make the next `set` call wait `delay` before it takes effect
    ///
    /// Queued delays apply to successive `set` calls in the order the calls
    /// start. The call is recorded when it takes effect.
    pub fn delay_next_set(&self, delay: Duration) {
        self.inner.write().unwrap().set_delays.push_back(delay);
    }

    /// Current value under `key`, bypassing call recording
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read().unwrap().data.get(key).cloned()
    }

    /// Current value under `key` decoded as UTF-8
    #[must_use]
    pub fn value_str(&self, key: &str) -> Option<String> {
        self.value(key).and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Check if a key exists
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().unwrap().data.contains_key(key)
    }

    /// Every call received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<StorageCall> {
        self.inner.read().unwrap().calls.clone()
    }

    /// Number of `set` calls received so far (including failed ones)
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.inner
            .read()
            .unwrap()
            .calls
            .iter()
            .filter(|c| matches!(c, StorageCall::Set(..)))
            .count()
    }

    /// Forget recorded calls, keeping data and failure switches
    pub fn clear_calls(&self) {
        self.inner.write().unwrap().calls.clear();
    }
}

fn injected(op: &str) -> StorageError {
    StorageError::Backend(format!("injected {op} failure"))
}

impl KeyValueStorage for InMemoryStorage {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>>> {
        async move {
            let mut inner = self.inner.write().unwrap();
            inner.calls.push(StorageCall::Get(key.to_string()));
            if inner.fail_get {
                return Err(injected("get"));
            }
            Ok(inner.data.get(key).cloned())
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        async move {
            let delay = self.inner.write().unwrap().set_delays.pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut inner = self.inner.write().unwrap();
            inner.calls.push(StorageCall::Set(key.to_string(), value.clone()));
            if inner.fail_set {
                return Err(injected("set"));
            }
            inner.data.insert(key.to_string(), value);
            Ok(())
        }
        .boxed()
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut inner = self.inner.write().unwrap();
            inner.calls.push(StorageCall::Remove(key.to_string()));
            if inner.fail_remove {
                return Err(injected("remove"));
            }
            inner.data.remove(key);
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let storage = InMemoryStorage::new();
        storage.set("k", b"1".to_vec()).await.unwrap();
        let _ = storage.get("k").await.unwrap();
        storage.remove("k").await.unwrap();

        assert_eq!(
            storage.calls(),
            vec![
                StorageCall::Set("k".into(), b"1".to_vec()),
                StorageCall::Get("k".into()),
                StorageCall::Remove("k".into()),
            ]
        );
        assert!(!storage.contains_key("k"));
    }

    #[tokio::test]
    async fn injected_failures_leave_data_untouched() {
        let storage = InMemoryStorage::with_value("k", "old");
        storage.fail_sets(true);
        storage.fail_removes(true);

        assert!(storage.set("k", b"new".to_vec()).await.is_err());
        assert!(storage.remove("k").await.is_err());
        assert_eq!(storage.value_str("k").as_deref(), Some("old"));
        assert_eq!(storage.set_count(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let a = InMemoryStorage::new();
        let b = a.clone();
        a.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(b.value("k"), Some(b"v".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_set_lands_after_later_one() {
        let storage = InMemoryStorage::new();
        storage.delay_next_set(Duration::from_millis(50));

        let slow = storage.set("k", b"old".to_vec());
        let fast = async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            storage.set("k", b"new".to_vec()).await
        };
        let (slow, fast) = tokio::join!(slow, fast);
        slow.unwrap();
        fast.unwrap();

        assert_eq!(storage.value_str("k").as_deref(), Some("old"));
        assert_eq!(storage.set_count(), 2);
    }
}

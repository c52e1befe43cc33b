//! A persisted to-do list built on the todokit store.
//!
//! The list lives in a single [`TodoState`] owned by a [`TodoStore`]. The
//! view layer sends [`TodoAction`] commands and reads computed views through
//! `Store::state`. On start the previous session's snapshot is loaded from a
//! [`KeyValueStorage`](todokit_core::storage::KeyValueStorage); after that
//! every change to the items, the filter or the pending input text is
//! written back, debounced.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use todo::{TodoAction, TodoConfig, TodoEnvironment, TodoReducer, TodoState, TodoStore};
//! use todokit_runtime::FileStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TodoConfig::from_env();
//! let storage = Arc::new(FileStorage::new(&config.data_dir));
//! let env = TodoEnvironment::production(storage, config);
//! let store = TodoStore::new(TodoState::new(), TodoReducer::new(), env);
//!
//! todo::hydrate(&store, Duration::from_secs(5)).await?;
//!
//! store.send(TodoAction::AddTodo { title: "Buy milk".to_string() }).await?;
//! let open = store.state(|s| s.active_count()).await;
//! println!("{open} open");
//!
//! // Flushes the pending debounced write
//! store.shutdown_default().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use todokit_runtime::{Store, StoreError};

pub mod config;
pub mod persist;
pub mod reducer;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use config::TodoConfig;
pub use persist::{PersistGate, StorageOp};
pub use reducer::{PERSIST_EFFECT, SUBMIT_COOLDOWN_EFFECT, TodoEnvironment, TodoReducer};
pub use snapshot::{DEFAULT_STORAGE_KEY, HydrationOutcome, Snapshot, SnapshotError};
pub use types::{Filter, TodoAction, TodoId, TodoItem, TodoState, UnknownFilter};

/// Store specialized for the todo list
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// Loads the persisted list and waits until the store is hydrated
///
/// Safe to call more than once and concurrently: a store that is already
/// hydrated returns immediately, and a caller arriving while a load is in
/// flight waits for that load instead of starting another.
///
/// # Errors
///
/// Returns [`StoreError::Timeout`] if the load does not finish within
/// `timeout`, [`StoreError::ShutdownInProgress`] if the store is shutting
/// down, or [`StoreError::ChannelClosed`] if the store went away.
pub async fn hydrate(store: &TodoStore, timeout: Duration) -> Result<(), StoreError> {
    // Subscribe before checking: `Hydrated` is broadcast only after it has
    // been reduced, so a load finishing after the check is still observed.
    let mut actions = store.subscribe_actions();
    if store.state(|s| s.hydrated).await {
        return Ok(());
    }
    store.send(TodoAction::Hydrate).await?;

    tokio::time::timeout(timeout, async {
        loop {
            match actions.recv().await {
                Ok(TodoAction::Hydrated { .. }) => return Ok(()),
                Ok(_) => {},
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Hydration observer lagged");
                    if store.state(|s| s.hydrated).await {
                        return Ok(());
                    }
                },
                Err(RecvError::Closed) => return Err(StoreError::ChannelClosed),
            }
        }
    })
    .await
    .map_err(|_| StoreError::Timeout)?
}

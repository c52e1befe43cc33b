//! Persisted form of the todo list.
//!
//! A snapshot is a single JSON document stored under one key:
//!
//! ```json
//! {"version":1,"savedAt":"2025-01-01T00:00:00Z","todos":[...],"filter":"all","inputText":""}
//! ```
//!
//! Decoding is lenient. A missing `version` means version 1, absent fields
//! take their defaults and an unknown filter name falls back to `all`.
//! Anything that is not a JSON object of this shape, or that claims a newer
//! version, is unreadable.

use crate::types::{Filter, TodoItem, TodoState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use todokit_core::storage::KeyValueStorage;

/// Storage key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "todokit/todos/v1";

/// Snapshot format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors produced while encoding or decoding a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Malformed JSON or a value of the wrong shape
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Written by a newer build
    #[error("unsupported snapshot version {found} (newest known is {SNAPSHOT_VERSION})")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
    },
}

/// Serialized subset of [`TodoState`]
///
/// Without `saved_at` it doubles as the change signature the persistence
/// trigger compares against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Format version
    #[serde(default = "legacy_version")]
    pub version: u32,
    /// Time of the write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Items in insertion order
    #[serde(default)]
    pub todos: Vec<TodoItem>,
    /// View filter
    #[serde(default, deserialize_with = "lenient_filter")]
    pub filter: Filter,
    /// Pending input text
    #[serde(default)]
    pub input_text: String,
}

const fn legacy_version() -> u32 {
    1
}

fn lenient_filter<'de, D>(deserializer: D) -> Result<Filter, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(|name| name.parse().ok())
        .unwrap_or_default())
}

impl Snapshot {
    /// Captures the persisted fields of `state`
    #[must_use]
    pub fn of(state: &TodoState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: None,
            todos: state.todos.clone(),
            filter: state.filter,
            input_text: state.input_text.clone(),
        }
    }

    /// Returns the snapshot with its write time set
    #[must_use]
    pub const fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.saved_at = Some(at);
        self
    }

    /// Whether the persisted fields match, ignoring version and write time
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.todos == other.todos
            && self.filter == other.filter
            && self.input_text == other.input_text
    }

    /// Serializes to JSON bytes
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses JSON bytes
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Malformed`] for bytes that are not a snapshot
    /// document and [`SnapshotError::UnsupportedVersion`] for documents
    /// written by a newer format.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }

    /// Brings restored items back in line with the item rules
    ///
    /// Titles are trimmed, items with a blank title or an empty id are
    /// dropped, and of several items sharing an id only the first is kept.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let mut seen = HashSet::new();
        self.todos.retain_mut(|t| {
            let trimmed = t.title.trim();
            if trimmed.len() != t.title.len() {
                t.title = trimmed.to_string();
            }
            !t.title.is_empty() && !t.id.as_str().is_empty() && seen.insert(t.id.clone())
        });
        self
    }
}

/// Result of the initial load from storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// A snapshot was read and decoded
    Restored(Snapshot),
    /// Nothing is stored under the key
    Missing,
    /// Storage failed or held something that could not be decoded
    Unreadable,
}

impl HydrationOutcome {
    /// Label used in logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Restored(_) => "restored",
            Self::Missing => "missing",
            Self::Unreadable => "unreadable",
        }
    }
}

/// Reads and decodes the snapshot stored under `key`
///
/// Never fails: storage and decoding errors are logged and reported as
/// [`HydrationOutcome::Unreadable`].
pub async fn load(storage: &dyn KeyValueStorage, key: &str) -> HydrationOutcome {
    let bytes = match storage.get(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return HydrationOutcome::Missing,
        Err(error) => {
            tracing::warn!(%error, key, "Failed to read snapshot");
            return HydrationOutcome::Unreadable;
        },
    };

    match Snapshot::decode(&bytes) {
        Ok(snapshot) => HydrationOutcome::Restored(snapshot.normalized()),
        Err(error) => {
            tracing::warn!(%error, key, "Discarding unreadable snapshot");
            HydrationOutcome::Unreadable
        },
    }
}

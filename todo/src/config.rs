//! Configuration for the todo list.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::snapshot::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Todo list configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoConfig {
    /// Key the snapshot is stored under
    pub storage_key: String,
    /// Quiet period before a changed state is written, in milliseconds (0 writes immediately)
    pub persist_debounce_ms: u64,
    /// How long the input stays busy after a submit, in milliseconds (0 disables)
    pub submit_cooldown_ms: u64,
    /// Directory for the file-backed storage
    pub data_dir: PathBuf,
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            persist_debounce_ms: 300,
            submit_cooldown_ms: 200,
            data_dir: PathBuf::from(".todokit"),
            log_level: "info".to_string(),
        }
    }
}

impl TodoConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `TODOKIT_STORAGE_KEY`, `TODOKIT_PERSIST_DEBOUNCE_MS`,
    /// `TODOKIT_SUBMIT_COOLDOWN_MS`, `TODOKIT_DATA_DIR` and `TODOKIT_LOG_LEVEL`.
    /// Unset or unparsable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            storage_key: lookup("TODOKIT_STORAGE_KEY")
                .filter(|key| !key.trim().is_empty())
                .unwrap_or(defaults.storage_key),
            persist_debounce_ms: lookup("TODOKIT_PERSIST_DEBOUNCE_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.persist_debounce_ms),
            submit_cooldown_ms: lookup("TODOKIT_SUBMIT_COOLDOWN_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.submit_cooldown_ms),
            data_dir: lookup("TODOKIT_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            log_level: lookup("TODOKIT_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Set the storage key
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the persistence debounce window
    #[must_use]
    pub fn with_persist_debounce(mut self, window: Duration) -> Self {
        self.persist_debounce_ms = duration_ms(window);
        self
    }

    /// Set the submit cooldown
    #[must_use]
    pub fn with_submit_cooldown(mut self, cooldown: Duration) -> Self {
        self.submit_cooldown_ms = duration_ms(cooldown);
        self
    }

    /// Set the data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Persistence debounce window
    #[must_use]
    pub const fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// Submit cooldown
    #[must_use]
    pub const fn submit_cooldown(&self) -> Duration {
        Duration::from_millis(self.submit_cooldown_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = TodoConfig::from_lookup(lookup(&[]));
        assert_eq!(config, TodoConfig::default());
        assert_eq!(config.storage_key, "todokit/todos/v1");
        assert_eq!(config.persist_debounce(), Duration::from_millis(300));
        assert_eq!(config.submit_cooldown(), Duration::from_millis(200));
    }

    #[test]
    fn overrides_from_variables() {
        let config = TodoConfig::from_lookup(lookup(&[
            ("TODOKIT_STORAGE_KEY", "custom/key"),
            ("TODOKIT_PERSIST_DEBOUNCE_MS", "0"),
            ("TODOKIT_SUBMIT_COOLDOWN_MS", " 50 "),
            ("TODOKIT_DATA_DIR", "/tmp/todos"),
            ("TODOKIT_LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.storage_key, "custom/key");
        assert_eq!(config.persist_debounce(), Duration::ZERO);
        assert_eq!(config.submit_cooldown(), Duration::from_millis(50));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/todos"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn unparsable_values_keep_defaults() {
        let config = TodoConfig::from_lookup(lookup(&[
            ("TODOKIT_STORAGE_KEY", "   "),
            ("TODOKIT_PERSIST_DEBOUNCE_MS", "soon"),
            ("TODOKIT_SUBMIT_COOLDOWN_MS", "-1"),
        ]));
        assert_eq!(config, TodoConfig::default());
    }

    #[test]
    fn builders() {
        let config = TodoConfig::default()
            .with_storage_key("k")
            .with_persist_debounce(Duration::from_secs(1))
            .with_submit_cooldown(Duration::ZERO)
            .with_data_dir("data");

        assert_eq!(config.storage_key, "k");
        assert_eq!(config.persist_debounce_ms, 1000);
        assert_eq!(config.submit_cooldown_ms, 0);
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }
}

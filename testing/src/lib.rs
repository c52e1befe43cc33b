//! # todokit Testing
//!
//! Testing utilities and helpers for the todokit state architecture.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, id generation, storage)
//! - A Given-When-Then builder for reducers
//! - Assertion helpers for effects
//!
//! ## Example
//!
//! ```ignore
//! use todokit_testing::{InMemoryStorage, SequentialIdGenerator, test_clock};
//!
//! #[tokio::test]
//! async fn test_flow() {
//!     let storage = InMemoryStorage::new();
//!     let env = TodoEnvironment::new(
//!         Arc::new(storage.clone()),
//!         Arc::new(test_clock()),
//!         Arc::new(SequentialIdGenerator::new("todo")),
//!         TodoConfig::default(),
//!     );
//!     let store = Store::new(TodoState::new(), TodoReducer::new(), env);
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use todokit_core::environment::{Clock, IdGenerator};

/// In-memory key/value storage
pub mod storage_mocks;

/// Fluent reducer testing
pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todokit_testing::mocks::FixedClock;
    /// use todokit_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Predictable ids: `{prefix}-1`, `{prefix}-2`, ...
    ///
    /// # Example
    ///
    /// ```
    /// use todokit_testing::mocks::SequentialIdGenerator;
    /// use todokit_core::environment::IdGenerator;
    ///
    /// let ids = SequentialIdGenerator::new("todo");
    /// assert_eq!(ids.next_id(), "todo-1");
    /// assert_eq!(ids.next_id(), "todo-2");
    /// ```
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        prefix: String,
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Create a generator whose first id is `{prefix}-1`
        #[must_use]
        pub fn new(prefix: impl Into<String>) -> Self {
            Self::starting_at(prefix, 1)
        }

        /// Create a generator whose first id is `{prefix}-{start}`
        #[must_use]
        pub fn starting_at(prefix: impl Into<String>, start: u64) -> Self {
            Self {
                prefix: prefix.into(),
                next: AtomicU64::new(start),
            }
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            format!("{}-{n}", self.prefix)
        }
    }

    /// Generator that always returns the same id, for collision tests
    #[derive(Debug, Clone)]
    pub struct ConstantIdGenerator(pub String);

    impl IdGenerator for ConstantIdGenerator {
        fn next_id(&self) -> String {
            self.0.clone()
        }
    }
}

// Re-export commonly used items
pub use mocks::{ConstantIdGenerator, FixedClock, SequentialIdGenerator, test_clock};
pub use reducer_test::{ReducerTest, assertions};
pub use storage_mocks::{InMemoryStorage, StorageCall};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIdGenerator::starting_at("x", 41);
        assert_eq!(ids.next_id(), "x-41");
        assert_eq!(ids.next_id(), "x-42");
    }

    #[test]
    fn test_constant_ids() {
        let ids = ConstantIdGenerator("same".to_string());
        assert_eq!(ids.next_id(), ids.next_id());
    }
}

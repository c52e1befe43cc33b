//! Domain types for the todo list.
//!
//! A todo list is an ordered collection of items that can be added,
//! toggled, retitled and removed, viewed through a three-way filter. The
//! state also carries the pending input-box text and the bookkeeping of the
//! hydration/persistence protocol.

use crate::snapshot::{HydrationOutcome, Snapshot};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a todo item
///
/// An opaque string token. Serialized as a plain JSON string so snapshots
/// written with any earlier id scheme keep loading.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Wraps an existing token
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the token
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TodoId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single todo item
///
/// Serializes as exactly `{id, title, done}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Unique identifier
    pub id: TodoId,
    /// Trimmed, non-empty title
    #[serde(default)]
    pub title: String,
    /// Whether the todo is completed
    #[serde(default)]
    pub done: bool,
}

impl TodoItem {
    /// Creates an open item, or `None` if the title is blank
    #[must_use]
    pub fn create(id: TodoId, title: &str) -> Option<Self> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        Some(Self {
            id,
            title: title.to_string(),
            done: false,
        })
    }

    /// Flips the completion flag
    pub const fn toggle(&mut self) {
        self.done = !self.done;
    }

    /// Replaces the title with the trimmed text
    ///
    /// Blank text is rejected the same way it is at creation: the title is
    /// left unchanged and `false` is returned.
    pub fn set_title(&mut self, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        if self.title != title {
            self.title = title.to_string();
        }
        true
    }

    /// Display label: completed items are prefixed with a check mark
    #[must_use]
    pub fn label(&self) -> String {
        if self.done {
            format!("✓ {}", self.title)
        } else {
            self.title.clone()
        }
    }
}

/// Which subset of the list is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Every item
    #[default]
    All,
    /// Items not yet done
    Active,
    /// Completed items
    Done,
}

/// Error returned when parsing an unknown filter name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown filter: {0:?} (expected all, active or done)")]
pub struct UnknownFilter(pub String);

impl Filter {
    /// All filters in display order
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Done];

    /// Wire name of the filter
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Done => "done",
        }
    }

    /// Whether `item` belongs to this filter's subset
    #[must_use]
    pub const fn matches(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Active => !item.done,
            Self::Done => item.done,
        }
    }

    /// Message shown when the filtered view is empty
    #[must_use]
    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::All => "No tasks yet.",
            Self::Active => "No active tasks.",
            Self::Done => "No completed tasks.",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "done" => Ok(Self::Done),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

/// State of the todo list
///
/// One instance per running session, owned by the `Store`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TodoState {
    /// Items in insertion order
    pub todos: Vec<TodoItem>,
    /// Current view filter
    pub filter: Filter,
    /// Pending input-box text, kept verbatim until submitted
    pub input_text: String,
    /// Set for a short cooldown after a submit to swallow double taps
    pub input_busy: bool,
    /// True once the initial load has finished, successfully or not
    pub hydrated: bool,
    /// A load from storage is in flight
    pub hydrating: bool,
    /// The automatic persistence trigger is installed
    pub persistence_armed: bool,
    /// Content of the most recently scheduled write
    pub last_persisted: Option<Snapshot>,
    /// A debounced `FlushSnapshot` is outstanding
    pub flush_pending: bool,
    /// Revision stamped on the newest storage operation issued
    pub persist_revision: u64,
}

impl TodoState {
    /// Creates a new cold, empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.todos.len()
    }

    /// Number of items not yet done
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.done).count()
    }

    /// Number of completed items
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.done).count()
    }

    /// Percentage of completed items, rounded half up; 0 for an empty list
    #[must_use]
    pub fn completion_rate(&self) -> u8 {
        let total = self.total_count();
        if total == 0 {
            return 0;
        }
        let rate = (self.completed_count() * 100 + total / 2) / total;
        u8::try_from(rate).unwrap_or(100)
    }

    /// Items matching the current filter, in insertion order
    #[must_use]
    pub fn filtered_todos(&self) -> Vec<&TodoItem> {
        self.todos.iter().filter(|t| self.filter.matches(t)).collect()
    }

    /// Message to show when the filtered view is empty
    #[must_use]
    pub const fn empty_message(&self) -> &'static str {
        self.filter.empty_message()
    }

    /// Whether the pending input would produce an item
    #[must_use]
    pub fn can_add(&self) -> bool {
        !self.input_text.trim().is_empty()
    }

    /// Whether a submit would be accepted right now
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.can_add() && !self.input_busy
    }

    /// Returns a todo by ID
    #[must_use]
    pub fn get(&self, id: &TodoId) -> Option<&TodoItem> {
        self.todos.iter().find(|t| &t.id == id)
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn exists(&self, id: &TodoId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get_mut(&mut self, id: &TodoId) -> Option<&mut TodoItem> {
        self.todos.iter_mut().find(|t| &t.id == id)
    }

    pub(crate) fn position(&self, id: &TodoId) -> Option<usize> {
        self.todos.iter().position(|t| &t.id == id)
    }

    /// Clears the entity state back to its cold-start defaults
    ///
    /// Protocol flags (`hydrated`, `persistence_armed`) are untouched.
    pub fn reset(&mut self) {
        self.todos.clear();
        self.filter = Filter::All;
        self.input_text.clear();
    }
}

/// Actions for the todo list
///
/// Commands are the intents the view layer sends. Feedback actions are
/// produced by effects and fed back into the reducer by the store.
#[derive(Clone, Debug, PartialEq)]
pub enum TodoAction {
    // ========== Commands ==========
    /// Command: Load the persisted snapshot (once per session)
    Hydrate,

    /// Command: Change the view filter
    SetFilter {
        /// New filter
        filter: Filter,
    },

    /// Command: Replace the pending input text
    SetInputText {
        /// Text as typed, untrimmed
        text: String,
    },

    /// Command: Create an item from the pending input text
    SubmitInput,

    /// Command: Create an item directly
    AddTodo {
        /// Title of the todo
        title: String,
    },

    /// Command: Delete an item
    RemoveTodo {
        /// Todo to delete
        id: TodoId,
    },

    /// Command: Flip an item's completion flag
    ToggleTodo {
        /// Todo to toggle
        id: TodoId,
    },

    /// Command: Rename an item
    SetTitle {
        /// Todo to rename
        id: TodoId,
        /// New title
        title: String,
    },

    /// Command: Delete every completed item
    ClearCompleted,

    /// Command: Factory reset, in memory and in storage
    ClearStorage,

    // ========== Feedback ==========
    /// Feedback: The initial load finished
    Hydrated {
        /// What the load produced
        outcome: HydrationOutcome,
    },

    /// Feedback: The submit cooldown elapsed
    SubmitCooldownElapsed,

    /// Feedback: The debounce window elapsed; write the current state
    FlushSnapshot,
}

impl TodoAction {
    /// Whether this action is produced by an effect rather than the view layer
    #[must_use]
    pub const fn is_feedback(&self) -> bool {
        matches!(
            self,
            Self::Hydrated { .. } | Self::SubmitCooldownElapsed | Self::FlushSnapshot
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code
mod tests {
    use super::*;

    fn item(id: &str, title: &str, done: bool) -> TodoItem {
        TodoItem {
            id: TodoId::new(id),
            title: title.to_string(),
            done,
        }
    }

    #[test]
    fn todo_item_create_trims_and_rejects_blank() {
        let created = TodoItem::create(TodoId::new("1"), "  Buy milk \n").unwrap();
        assert_eq!(created.title, "Buy milk");
        assert!(!created.done);

        assert!(TodoItem::create(TodoId::new("2"), "   ").is_none());
        assert!(TodoItem::create(TodoId::new("3"), "").is_none());
    }

    #[test]
    fn todo_item_toggle_flips() {
        let mut todo = item("1", "Test", false);
        todo.toggle();
        assert!(todo.done);
        todo.toggle();
        assert!(!todo.done);
    }

    #[test]
    fn todo_item_set_title_rejects_blank() {
        let mut todo = item("1", "Old", false);
        assert!(todo.set_title("  New  "));
        assert_eq!(todo.title, "New");

        assert!(!todo.set_title("   "));
        assert_eq!(todo.title, "New");
    }

    #[test]
    fn todo_item_label_marks_done() {
        let mut todo = item("1", "Ship it", false);
        assert_eq!(todo.label(), "Ship it");
        todo.toggle();
        assert_eq!(todo.label(), "✓ Ship it");
    }

    #[test]
    fn todo_item_serializes_as_plain_record() {
        let todo = item("abc", "Write report", true);
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "abc", "title": "Write report", "done": true})
        );
        let back: TodoItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, todo);
    }

    #[test]
    fn filter_parse_and_display() {
        for filter in Filter::ALL {
            assert_eq!(filter.as_str().parse::<Filter>().unwrap(), filter);
            assert_eq!(filter.to_string(), filter.as_str());
        }
        assert_eq!(
            "later".parse::<Filter>(),
            Err(UnknownFilter("later".to_string()))
        );
    }

    #[test]
    fn empty_message_depends_only_on_filter() {
        let mut state = TodoState::new();
        assert_eq!(state.empty_message(), "No tasks yet.");
        state.filter = Filter::Active;
        assert_eq!(state.empty_message(), "No active tasks.");
        state.filter = Filter::Done;
        assert_eq!(state.empty_message(), "No completed tasks.");
    }

    #[test]
    fn counts_and_completion_rate() {
        let mut state = TodoState::new();
        assert_eq!(state.completion_rate(), 0);

        state.todos = vec![
            item("1", "a", true),
            item("2", "b", false),
            item("3", "c", false),
        ];
        assert_eq!(state.total_count(), 3);
        assert_eq!(state.active_count(), 2);
        assert_eq!(state.completed_count(), 1);
        // 33.33 rounds down
        assert_eq!(state.completion_rate(), 33);

        state.todos[1].done = true;
        // 66.67 rounds up
        assert_eq!(state.completion_rate(), 67);
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        let mut state = TodoState::new();
        state.todos = (0..8).map(|i| item(&i.to_string(), "t", i == 0)).collect();
        // 12.5%
        assert_eq!(state.completion_rate(), 13);
    }

    #[test]
    fn filtered_todos_keep_insertion_order() {
        let mut state = TodoState::new();
        state.todos = vec![
            item("1", "a", true),
            item("2", "b", false),
            item("3", "c", true),
        ];

        let ids = |state: &TodoState| -> Vec<String> {
            state
                .filtered_todos()
                .iter()
                .map(|t| t.id.to_string())
                .collect()
        };

        assert_eq!(ids(&state), ["1", "2", "3"]);
        state.filter = Filter::Active;
        assert_eq!(ids(&state), ["2"]);
        state.filter = Filter::Done;
        assert_eq!(ids(&state), ["1", "3"]);
    }

    #[test]
    fn can_add_trims_pending_text() {
        let mut state = TodoState::new();
        assert!(!state.can_add());
        state.input_text = "   ".to_string();
        assert!(!state.can_add());
        state.input_text = " x ".to_string();
        assert!(state.can_add());
        assert!(state.can_submit());
        state.input_busy = true;
        assert!(state.can_add());
        assert!(!state.can_submit());
    }

    #[test]
    fn reset_keeps_protocol_flags() {
        let mut state = TodoState {
            todos: vec![item("1", "a", false)],
            filter: Filter::Done,
            input_text: "draft".to_string(),
            hydrated: true,
            persistence_armed: true,
            ..TodoState::default()
        };
        state.reset();
        assert!(state.todos.is_empty());
        assert_eq!(state.filter, Filter::All);
        assert!(state.input_text.is_empty());
        assert!(state.hydrated);
        assert!(state.persistence_armed);
    }

    #[test]
    fn feedback_actions_are_flagged() {
        assert!(TodoAction::FlushSnapshot.is_feedback());
        assert!(TodoAction::SubmitCooldownElapsed.is_feedback());
        assert!(
            TodoAction::Hydrated {
                outcome: HydrationOutcome::Missing
            }
            .is_feedback()
        );
        assert!(!TodoAction::ClearCompleted.is_feedback());
        assert!(!TodoAction::Hydrate.is_feedback());
    }
}

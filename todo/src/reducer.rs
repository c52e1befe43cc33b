//! Reducer logic for the todo list.
//!
//! Every transition of [`TodoState`] happens here. Storage access is
//! described as effects and executed by the store: loading the snapshot on
//! `Hydrate`, scheduling a debounced write whenever the persisted fields
//! change, and removing the key on `ClearStorage`. Writes and removals go
//! through the environment's [`PersistGate`] stamped with an increasing
//! revision, so an older operation finishing late never overwrites a newer
//! one.

use crate::config::TodoConfig;
use crate::persist::{PersistGate, StorageOp};
use crate::snapshot::{self, HydrationOutcome, Snapshot};
use crate::types::{TodoAction, TodoId, TodoItem, TodoState};
use std::sync::Arc;
use todokit_core::{
    SmallVec,
    effect::{Effect, EffectId},
    environment::{Clock, IdGenerator, SystemClock, UuidGenerator},
    reducer::Reducer,
    smallvec,
    storage::KeyValueStorage,
};

/// Id of the debounced snapshot write
pub const PERSIST_EFFECT: EffectId = EffectId::from_static("todo.persist");

/// Id of the submit cooldown timer
pub const SUBMIT_COOLDOWN_EFFECT: EffectId = EffectId::from_static("todo.submit-cooldown");

/// Attempts at drawing an unused id before giving up on an add
const MAX_ID_ATTEMPTS: usize = 8;

type Effects = SmallVec<[Effect<TodoAction>; 4]>;

/// Environment dependencies for the todo reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Persistence gateway
    pub storage: Arc<dyn KeyValueStorage>,
    /// Clock for snapshot timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of fresh item ids
    pub ids: Arc<dyn IdGenerator>,
    /// Storage key and timings
    pub config: TodoConfig,
    /// Orders writes and removals of the stored snapshot
    pub gate: Arc<PersistGate>,
}

impl TodoEnvironment {
    /// Creates a new `TodoEnvironment`
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        config: TodoConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            ids,
            config,
            gate: Arc::new(PersistGate::new()),
        }
    }

    /// Environment with the system clock and random UUID ids
    #[must_use]
    pub fn production(storage: Arc<dyn KeyValueStorage>, config: TodoConfig) -> Self {
        Self::new(storage, Arc::new(SystemClock), Arc::new(UuidGenerator), config)
    }
}

/// Reducer for the todo list
#[derive(Clone, Debug)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Draws an id not used by any current item
    fn fresh_id(state: &TodoState, env: &TodoEnvironment) -> Option<TodoId> {
        (0..MAX_ID_ATTEMPTS)
            .map(|_| TodoId::new(env.ids.next_id()))
            .find(|id| !state.exists(id))
    }

    /// Appends a new item; returns whether one was added
    fn add(state: &mut TodoState, env: &TodoEnvironment, title: &str) -> bool {
        if title.trim().is_empty() {
            return false;
        }
        let Some(id) = Self::fresh_id(state, env) else {
            tracing::warn!(attempts = MAX_ID_ATTEMPTS, "Could not draw an unused todo id");
            return false;
        };
        match TodoItem::create(id, title) {
            Some(item) => {
                state.todos.push(item);
                true
            },
            None => false,
        }
    }

    fn begin_hydration(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        if state.hydrated || state.hydrating {
            tracing::debug!(
                hydrated = state.hydrated,
                "Hydration already finished or in flight"
            );
            return SmallVec::new();
        }
        state.hydrating = true;

        let storage = Arc::clone(&env.storage);
        let key = env.config.storage_key.clone();
        smallvec![Effect::Future(Box::pin(async move {
            let outcome = snapshot::load(storage.as_ref(), &key).await;
            Some(TodoAction::Hydrated { outcome })
        }))]
    }

    fn finish_hydration(state: &mut TodoState, outcome: HydrationOutcome) {
        if state.hydrated {
            tracing::debug!("Ignoring repeated hydration result");
            return;
        }
        metrics::counter!("todo.hydrate.outcome", "outcome" => outcome.label()).increment(1);

        match outcome {
            HydrationOutcome::Restored(snapshot) => {
                let snapshot = snapshot.normalized();
                tracing::info!(todos = snapshot.todos.len(), "Restored todo list");
                state.todos = snapshot.todos;
                state.filter = snapshot.filter;
                state.input_text = snapshot.input_text;
            },
            HydrationOutcome::Missing => {
                tracing::info!("No stored todo list, starting fresh");
            },
            HydrationOutcome::Unreadable => {
                tracing::warn!("Stored todo list unreadable, starting empty");
                state.reset();
            },
        }

        state.hydrating = false;
        state.hydrated = true;
        if !state.persistence_armed {
            state.persistence_armed = true;
            tracing::debug!("Persistence trigger installed");
        }
        state.last_persisted = Some(Snapshot::of(state));
    }

    /// Schedules a write if the persisted fields changed since the last one
    fn state_changed(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        if !state.persistence_armed {
            return SmallVec::new();
        }
        let current = Snapshot::of(state);
        if state
            .last_persisted
            .as_ref()
            .is_some_and(|last| last.same_content(&current))
        {
            return SmallVec::new();
        }
        state.last_persisted = Some(current);

        let debounce = env.config.persist_debounce();
        if debounce.is_zero() {
            smallvec![Self::write_snapshot(state, env)]
        } else {
            state.flush_pending = true;
            smallvec![Effect::debounce(
                PERSIST_EFFECT,
                debounce,
                TodoAction::FlushSnapshot
            )]
        }
    }

    /// Fire-and-forget write of the current state
    fn write_snapshot(state: &mut TodoState, env: &TodoEnvironment) -> Effect<TodoAction> {
        let bytes = match Snapshot::of(state).stamped(env.clock.now()).encode() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(%error, "Failed to encode snapshot");
                metrics::counter!("todo.persist.failures").increment(1);
                return Effect::None;
            },
        };
        Self::storage_op(state, env, StorageOp::Write(bytes))
    }

    /// Stamps `op` with the next revision and runs it through the gate
    fn storage_op(
        state: &mut TodoState,
        env: &TodoEnvironment,
        op: StorageOp,
    ) -> Effect<TodoAction> {
        state.persist_revision += 1;
        let revision = state.persist_revision;

        let gate = Arc::clone(&env.gate);
        let storage = Arc::clone(&env.storage);
        let key = env.config.storage_key.clone();
        Effect::Future(Box::pin(async move {
            let label = op.label();
            let writing = matches!(op, StorageOp::Write(_));
            let Some(result) = gate.apply(storage.as_ref(), &key, revision, op).await else {
                tracing::debug!(
                    %key,
                    revision,
                    op = label,
                    "Superseded by a newer storage operation"
                );
                return None;
            };
            match result {
                Ok(()) => {
                    tracing::debug!(%key, revision, op = label, "Stored todo list updated");
                    if writing {
                        metrics::counter!("todo.persist.writes").increment(1);
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, %key, op = label, "Failed to update stored todo list");
                    if writing {
                        metrics::counter!("todo.persist.failures").increment(1);
                    }
                },
            }
            None
        }))
    }

    fn flush_snapshot(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        if !state.flush_pending {
            tracing::debug!("No pending snapshot write");
            return SmallVec::new();
        }
        state.flush_pending = false;
        smallvec![Self::write_snapshot(state, env)]
    }

    fn clear_storage(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        state.reset();
        state.last_persisted = Some(Snapshot::of(state));
        state.flush_pending = false;
        tracing::info!("Todo list reset");

        smallvec![
            Effect::Cancel(PERSIST_EFFECT),
            Self::storage_op(state, env, StorageOp::Remove),
        ]
    }
}

impl Default for TodoReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TodoAction::Hydrate => Self::begin_hydration(state, env),
            TodoAction::Hydrated { outcome } => {
                Self::finish_hydration(state, outcome);
                SmallVec::new()
            },

            TodoAction::SetFilter { filter } => {
                state.filter = filter;
                Self::state_changed(state, env)
            },
            TodoAction::SetInputText { text } => {
                state.input_text = text;
                Self::state_changed(state, env)
            },
            TodoAction::SubmitInput => {
                if state.input_busy {
                    tracing::debug!("Submit ignored during cooldown");
                    return SmallVec::new();
                }
                let title = state.input_text.trim().to_string();
                if !Self::add(state, env, &title) {
                    return SmallVec::new();
                }
                state.input_text.clear();

                let mut effects = Self::state_changed(state, env);
                let cooldown = env.config.submit_cooldown();
                if !cooldown.is_zero() {
                    state.input_busy = true;
                    effects.push(Effect::debounce(
                        SUBMIT_COOLDOWN_EFFECT,
                        cooldown,
                        TodoAction::SubmitCooldownElapsed,
                    ));
                }
                effects
            },
            TodoAction::SubmitCooldownElapsed => {
                state.input_busy = false;
                SmallVec::new()
            },
            TodoAction::AddTodo { title } => {
                if Self::add(state, env, &title) {
                    Self::state_changed(state, env)
                } else {
                    SmallVec::new()
                }
            },
            TodoAction::RemoveTodo { id } => match state.position(&id) {
                Some(index) => {
                    state.todos.remove(index);
                    Self::state_changed(state, env)
                },
                None => SmallVec::new(),
            },
            TodoAction::ToggleTodo { id } => {
                if state.get_mut(&id).map(TodoItem::toggle).is_some() {
                    Self::state_changed(state, env)
                } else {
                    SmallVec::new()
                }
            },
            TodoAction::SetTitle { id, title } => {
                if state
                    .get_mut(&id)
                    .is_some_and(|todo| todo.set_title(&title))
                {
                    Self::state_changed(state, env)
                } else {
                    SmallVec::new()
                }
            },
            TodoAction::ClearCompleted => {
                let before = state.todos.len();
                state.todos.retain(|t| !t.done);
                if state.todos.len() == before {
                    SmallVec::new()
                } else {
                    Self::state_changed(state, env)
                }
            },

            TodoAction::ClearStorage => Self::clear_storage(state, env),
            TodoAction::FlushSnapshot => Self::flush_snapshot(state, env),
        }
    }
}

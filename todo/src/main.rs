//! Command-line front end for the todo list.
//!
//! Each invocation hydrates the store from the data directory, applies one
//! command, prints the list and shuts the store down, which flushes the
//! pending write.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use todo::{Filter, TodoAction, TodoConfig, TodoEnvironment, TodoId, TodoReducer, TodoState, TodoStore};
use todokit_runtime::FileStorage;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const HYDRATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "todo", about = "A small persisted to-do list")]
struct Cli {
    /// Directory holding the saved list (overrides `TODOKIT_DATA_DIR`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the list, optionally switching the filter first
    List {
        /// all, active or done
        filter: Option<Filter>,
    },
    /// Add an item
    Add {
        /// Title words
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Save text in the input box without submitting it
    Draft {
        /// Text to keep
        text: Vec<String>,
    },
    /// Turn the saved input text into an item
    Submit,
    /// Mark an item done, or open again
    Toggle {
        /// Id or unique id prefix
        id: String,
    },
    /// Change an item's title
    Rename {
        /// Id or unique id prefix
        id: String,
        /// New title words
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Delete an item
    Rm {
        /// Id or unique id prefix
        id: String,
    },
    /// Delete every completed item
    ClearCompleted,
    /// Forget everything, including the saved list
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = TodoConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let storage = Arc::new(FileStorage::new(&config.data_dir));
    let env = TodoEnvironment::production(storage, config);
    let store = TodoStore::new(TodoState::new(), TodoReducer::new(), env);

    todo::hydrate(&store, HYDRATE_TIMEOUT)
        .await
        .context("loading saved list")?;

    if let Some(action) = action_for(&store, cli.command).await? {
        store.send(action).await?;
    }

    let state = store.state(Clone::clone).await;
    print_list(&state);

    store
        .shutdown_default()
        .await
        .context("saving list")?;
    Ok(())
}

async fn action_for(store: &TodoStore, command: Option<Command>) -> anyhow::Result<Option<TodoAction>> {
    let action = match command {
        None | Some(Command::List { filter: None }) => return Ok(None),
        Some(Command::List {
            filter: Some(filter),
        }) => TodoAction::SetFilter { filter },
        Some(Command::Add { title }) => TodoAction::AddTodo {
            title: title.join(" "),
        },
        Some(Command::Draft { text }) => TodoAction::SetInputText {
            text: text.join(" "),
        },
        Some(Command::Submit) => {
            if !store.state(TodoState::can_submit).await {
                bail!("nothing to submit");
            }
            TodoAction::SubmitInput
        },
        Some(Command::Toggle { id }) => TodoAction::ToggleTodo {
            id: resolve(store, &id).await?,
        },
        Some(Command::Rename { id, title }) => TodoAction::SetTitle {
            id: resolve(store, &id).await?,
            title: title.join(" "),
        },
        Some(Command::Rm { id }) => TodoAction::RemoveTodo {
            id: resolve(store, &id).await?,
        },
        Some(Command::ClearCompleted) => TodoAction::ClearCompleted,
        Some(Command::Reset) => TodoAction::ClearStorage,
    };
    Ok(Some(action))
}

/// Finds the single item whose id starts with `prefix`
async fn resolve(store: &TodoStore, prefix: &str) -> anyhow::Result<TodoId> {
    let matches: Vec<TodoId> = store
        .state(|s| {
            s.todos
                .iter()
                .filter(|t| t.id.as_str().starts_with(prefix))
                .map(|t| t.id.clone())
                .collect()
        })
        .await;

    match matches.as_slice() {
        [id] => Ok(id.clone()),
        [] => bail!("no item with id {prefix:?}"),
        _ => bail!("id prefix {prefix:?} is ambiguous ({} items)", matches.len()),
    }
}

fn print_list(state: &TodoState) {
    println!("[{}]", state.filter);
    let visible = state.filtered_todos();
    if visible.is_empty() {
        println!("  {}", state.empty_message());
    }
    for todo in visible {
        println!("  {:<8} {}", short_id(&todo.id), todo.label());
    }
    if !state.input_text.is_empty() {
        println!("  > {}", state.input_text);
    }
    println!(
        "{} total, {} active, {} done ({}%)",
        state.total_count(),
        state.active_count(),
        state.completed_count(),
        state.completion_rate()
    );
}

fn short_id(id: &TodoId) -> &str {
    id.as_str().get(..8).unwrap_or(id.as_str())
}

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::sync::Arc;
use tasklist::{BlobStore, FileBlobStore, SqliteBlobStore, Task, TaskListStore, WriteMode};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "TaskList CLI - A simple ordered to-do list")]
#[command(version)]
struct Cli {
    /// Directory holding the task data (default: platform data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Storage backend for the task list
    #[arg(short, long, value_enum, default_value_t = Backend::File)]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// tasks.json in the store directory
    File,
    /// tasklist.db SQLite database in the store directory
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all tasks
    List,

    /// Add a task
    Add {
        /// Task text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Mark a task done, or not done again
    Toggle {
        /// Task id or 1-based position
        task: String,
    },

    /// Replace the text of a task
    Edit {
        /// Task id or 1-based position
        task: String,

        /// New text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Delete a task
    Delete {
        /// Task id or 1-based position
        task: String,
    },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let store_path = match cli.store_path {
        Some(path) => path,
        None => default_store_path(),
    };

    let blobs: Arc<dyn BlobStore> = match cli.backend {
        Backend::File => Arc::new(FileBlobStore::open(&store_path)?),
        Backend::Sqlite => Arc::new(SqliteBlobStore::open(store_path.join("tasklist.db"))?),
    };

    let mut store = TaskListStore::open(blobs, WriteMode::Inline);

    match cli.command {
        Commands::List => {}
        Commands::Add { text } => {
            let before = store.len();
            store.add(&text.join(" "));
            if store.len() == before {
                println!("Nothing to add");
            }
        }
        Commands::Toggle { task } => {
            let id = resolve(&store, &task)?;
            store.toggle_complete(&id);
        }
        Commands::Edit { task, text } => {
            let id = resolve(&store, &task)?;
            store.start_edit(&id);
            store.set_input(text.join(" "));
            store.submit();
            if store.mode().is_editing() {
                println!("Text cannot be empty, task unchanged");
                store.cancel_edit();
            }
        }
        Commands::Delete { task } => {
            let id = resolve(&store, &task)?;
            store.delete(&id);
        }
    }

    print_tasks(store.tasks());
    Ok(())
}

fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tasklist"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Map a task id or 1-based position to an id
fn resolve(store: &TaskListStore, arg: &str) -> Result<String> {
    if let Some(task) = store.get(arg) {
        return Ok(task.id.clone());
    }

    let position: usize = arg
        .parse()
        .map_err(|_| eyre!("No task with id {}", arg))?;

    position
        .checked_sub(1)
        .and_then(|index| store.tasks().get(index))
        .map(|task| task.id.clone())
        .ok_or_else(|| eyre!("No task at position {} (have {})", position, store.len()))
}

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("{}", "No tasks yet".dimmed());
        return;
    }

    for (i, task) in tasks.iter().enumerate() {
        let position = format!("{:>3}.", i + 1);
        if task.completed {
            println!("{} {} {}", position, "[x]".green(), task.text.green());
            if let Some(at) = &task.completed_at {
                println!("       {}", format!("Completed at: {}", at).dimmed());
            }
        } else {
            println!("{} [ ] {}", position, task.text);
        }
    }
}

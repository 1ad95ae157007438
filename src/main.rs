use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use taskforge::{EngineConfig, TaskManager};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Query a task snapshot exported by a taskforge host
#[derive(Debug, Parser)]
#[command(name = "taskforge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect, search and plan a taskforge task snapshot")]
struct Args {
    /// Engine configuration file (TOML); defaults are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print every task id in dependency order
    Order { snapshot: PathBuf },
    /// Print pending tasks whose dependencies are complete
    Ready { snapshot: PathBuf },
    /// Print ready tasks in priority order
    Queue { snapshot: PathBuf },
    /// Search tasks by word prefixes
    Search { snapshot: PathBuf, query: String },
    /// Greedily pack ready tasks into a time budget
    Schedule {
        snapshot: PathBuf,
        #[arg(long)]
        hours: f64,
    },
    /// Compute the minimum-time order of all pending tasks
    Optimize { snapshot: PathBuf },
    /// Print the effective configuration
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "taskforge=debug"
    } else {
        "taskforge=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(args.config.as_deref())?;

    let output = match args.command {
        Commands::Order { snapshot } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.get_task_execution_order()?)?
        }
        Commands::Ready { snapshot } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.get_ready_tasks())?
        }
        Commands::Queue { snapshot } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.schedule_by_priority())?
        }
        Commands::Search { snapshot, query } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.search_tasks(&query))?
        }
        Commands::Schedule { snapshot, hours } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.schedule_greedy(hours)?)?
        }
        Commands::Optimize { snapshot } => {
            let manager = load_snapshot(&snapshot, config)?;
            serde_json::to_string_pretty(&manager.optimize_order()?)?
        }
        Commands::ShowConfig => config.to_toml_string()?,
    };

    println!("{}", output);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            EngineConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))
        }
        None => {
            debug!("No configuration file given, using defaults");
            Ok(EngineConfig::default())
        }
    }
}

fn load_snapshot(path: &Path, config: EngineConfig) -> Result<TaskManager> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read snapshot {:?}", path))?;
    let manager = TaskManager::import_from_json(config, &content)
        .with_context(|| format!("Invalid snapshot {:?}", path))?;
    info!("Loaded {} tasks from {:?}", manager.task_count(), path);
    Ok(manager)
}

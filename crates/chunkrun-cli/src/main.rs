//! chunkrun CLI - run tasks in bounded chunks of isolated processes.

mod config;
mod output;
mod resolver;

use std::path::PathBuf;

use chunkrun_engine::{LogProgress, Orchestrator};
use chunkrun_process::{ProcessProvider, DEFAULT_COMPLETION_MARKER, DEFAULT_ERROR_MARKER};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use output::Report;
use resolver::TemplateResolver;

/// chunkrun - extract one payload per task from isolated processes
#[derive(Parser, Debug)]
#[command(name = "chunkrun")]
#[command(about = "Run tasks in bounded chunks of isolated processes", long_about = None)]
pub struct Args {
    /// Task ids to run
    pub tasks: Vec<String>,

    /// JSON file with a list of task ids or {"id", "params"} objects
    #[arg(long, value_name = "FILE")]
    pub tasks_file: Option<PathBuf>,

    /// Maximum number of tasks running at once
    #[arg(short, long, default_value_t = 1)]
    pub chunk_size: usize,

    /// Abort the whole run on the first failed task
    #[arg(long)]
    pub strict: bool,

    /// Log progress after each chunk
    #[arg(long)]
    pub progress: bool,

    /// Seconds a task may run before it times out
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Program started once per task, with the target as its last argument
    #[arg(long)]
    pub program: String,

    /// Argument passed to the program before the target (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub program_args: Vec<String>,

    /// Target template; `{id}` and `{<param>}` are substituted per task
    #[arg(long, default_value = "{id}")]
    pub target_template: String,

    /// Stdout prefix of the completion line
    #[arg(long, default_value = DEFAULT_COMPLETION_MARKER)]
    pub marker: String,

    /// Stderr prefix of an error line
    #[arg(long, default_value = DEFAULT_ERROR_MARKER)]
    pub error_marker: String,

    /// Working directory for task processes
    #[arg(long)]
    pub working_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = Config::from_args(args)?;
    info!(
        tasks = config.tasks.len(),
        chunk_size = config.options.chunk_size,
        program = %config.process.program,
        "Starting chunkrun"
    );

    let resolver = TemplateResolver::new(&config.target_template)?;
    let orchestrator =
        Orchestrator::new(ProcessProvider::new(config.process.clone()), resolver)
            .with_progress(LogProgress);

    let started_at = chrono::Utc::now();
    let result = orchestrator.run(&config.tasks, &config.options).await?;

    Report::new(started_at, result).print()?;
    Ok(())
}

//! CLI argument definitions.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "decision")]
#[command(author, version, about = "Resolve the CI task graph for a repository event", long_about = None)]
pub struct Cli {
    /// Path to file containing serialized GitHub event
    #[arg(long)]
    pub event_path: Option<PathBuf>,

    /// Don't actually create the tasks, just output the tasks that would be created
    #[arg(long)]
    pub dry_run: bool,

    /// Path to file in which to write payload for all scheduled tasks
    #[arg(long)]
    pub tasks_path: Option<PathBuf>,

    /// Task catalog
    #[arg(long, default_value = "tools/ci/tasks/test.yml")]
    pub catalog_path: PathBuf,

    /// Mapping of job names to the paths that select them
    #[arg(long)]
    pub jobs_path: Option<PathBuf>,

    /// Git working copy used to compute changed paths
    #[arg(long, default_value = ".")]
    pub repo_path: PathBuf,

    /// Configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

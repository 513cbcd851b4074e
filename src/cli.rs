use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed learning-progress tracker CLI.
/// Storage defaults to ~/.ptrack/progress.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "ptrack", version, about = "Learning progress tracking CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

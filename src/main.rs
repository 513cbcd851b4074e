//! # ptrack - Learning Progress Tracker CLI
//!
//! A file-backed tracker for personal learning goals: milestones contain
//! tasks, tasks nest subtasks to arbitrary depth, and every node carries
//! planned/spent hours and a completion percentage.
//!
//! The core of the crate is the aggregation engine: a task with subtasks is a
//! *composite* whose progress is the planned-time-weighted average of its
//! subtree and whose time figures are subtree sums. Any edit to a leaf
//! propagates upward so ancestors always stay consistent.
//!
//! ## Quick Start
//!
//! ```bash
//! # Create a milestone and a task under it
//! ptrack add-milestone "Computer Vision Basics"
//! ptrack add "OpenCV fundamentals" --milestone "Computer Vision Basics" --time-planned 15
//!
//! # Nest a subtask and work on it
//! ptrack add "Image read/write" --parent "OpenCV fundamentals" --time-planned 5
//! ptrack status "Image read/write" doing
//! ptrack progress "Image read/write" 50
//!
//! # Inspect
//! ptrack list
//! ptrack tree "Computer Vision Basics"
//! ```
//!
//! Data is stored as a single pretty-printed JSON snapshot in
//! `~/.ptrack/progress.json` (override with `--db`). Saves are atomic
//! (temp file + rename); a missing store simply means an empty forest.

use std::path::PathBuf;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod error;
pub mod fields;
pub mod milestone;
pub mod task;
pub mod tracker;

use cli::Cli;
use cmd::*;
use tracker::Tracker;

fn main() {
    let cli = Cli::parse();

    // Completions need no store at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".ptrack");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create store directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
        dir.join("progress.json")
    });

    let mut tracker = match Tracker::load(&db_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Failed to load store {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::List => cmd_list(&tracker),

        Commands::Tree { milestone } => cmd_tree(&tracker, milestone),

        Commands::View { id } => cmd_view(&tracker, id),

        Commands::AddMilestone { name } => cmd_add_milestone(&mut tracker, &db_path, name),

        Commands::Add { name, milestone, parent, time_planned } =>
            cmd_add(&mut tracker, &db_path, name, milestone, parent, time_planned),

        Commands::Progress { id, value } => cmd_progress(&mut tracker, &db_path, id, value),

        Commands::Status { id, status } => cmd_status(&mut tracker, &db_path, id, status),

        Commands::Update { id, name, next_steps, design_doc, notes, deliverables,
                           time_planned, time_spent } =>
            cmd_update(&mut tracker, &db_path, id, name, next_steps, design_doc,
                       notes, deliverables, time_planned, time_spent),

        Commands::Remove { id } => cmd_remove(&mut tracker, &db_path, id),

        Commands::RemoveMilestone { id } => cmd_remove_milestone(&mut tracker, &db_path, id),
    }
}

//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and handlers: the thin
//! presentation layer over the tracker engine. Handlers resolve identifiers,
//! call into the tracker, print the result, and save the store on success.

use std::path::Path;

use chrono::{TimeZone, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use uuid::Uuid;

use crate::cli::Cli;
use crate::fields::{format_status, Status};
use crate::milestone::Milestone;
use crate::task::Task;
use crate::tracker::Tracker;

#[derive(Subcommand)]
pub enum Commands {
    /// List milestones with overall progress and time totals.
    List,

    /// Print the task tree of a milestone.
    Tree {
        /// Milestone ID or name.
        milestone: String,
    },

    /// View a single task in detail.
    View {
        /// Task ID or name.
        id: String,
    },

    /// Create a new milestone.
    AddMilestone {
        /// Milestone name.
        name: String,
    },

    /// Add a task, either top-level in a milestone or nested under a parent
    /// task.
    Add {
        /// Task name.
        name: String,
        /// Target milestone (ID or name) for a top-level task.
        #[arg(long, conflicts_with = "parent")]
        milestone: Option<String>,
        /// Parent task (ID or name) for a subtask.
        #[arg(long)]
        parent: Option<String>,
        /// Planned hours.
        #[arg(long, default_value_t = 0.0)]
        time_planned: f64,
    },

    /// Set progress (0-100) on a leaf task.
    Progress {
        /// Task ID or name.
        id: String,
        /// Progress percentage; out-of-range values clamp to 0-100.
        #[arg(allow_hyphen_values = true)]
        value: i64,
    },

    /// Change a task's status (todo | doing | done).
    Status {
        /// Task ID or name.
        id: String,
        #[arg(value_enum)]
        status: Status,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or name.
        id: String,
        /// Rename the task.
        #[arg(long)]
        name: Option<String>,
        /// Free-text next steps.
        #[arg(long)]
        next_steps: Option<String>,
        /// Design document path.
        #[arg(long)]
        design_doc: Option<String>,
        /// Notes path.
        #[arg(long)]
        notes: Option<String>,
        /// Deliverables path.
        #[arg(long)]
        deliverables: Option<String>,
        /// Planned hours (leaf tasks only).
        #[arg(long)]
        time_planned: Option<f64>,
        /// Spent hours (leaf tasks only).
        #[arg(long)]
        time_spent: Option<f64>,
    },

    /// Remove a task (and its subtasks) by ID or name.
    Remove {
        /// Task ID or name.
        id: String,
    },

    /// Remove a milestone and all its tasks.
    RemoveMilestone {
        /// Milestone ID or name.
        id: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Resolve a task identifier (UUID or exact name) to a task ID.
/// Name matches must be unique; ambiguity is an error listing the candidates.
pub fn resolve_task(tracker: &Tracker, identifier: &str) -> Result<Uuid, String> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        return if tracker.find_task(id).is_some() {
            Ok(id)
        } else {
            Err(format!("Task with ID {} not found", id))
        };
    }

    let mut matches: Vec<(Uuid, String)> = Vec::new();
    fn collect(task: &Task, name: &str, out: &mut Vec<(Uuid, String)>) {
        if task.name.eq_ignore_ascii_case(name) {
            out.push((task.id, task.name.clone()));
        }
        for sub in &task.subtasks {
            collect(sub, name, out);
        }
    }
    for ms in &tracker.milestones {
        for task in &ms.tasks {
            collect(task, identifier, &mut matches);
        }
    }

    match matches.len() {
        0 => Err(format!("No task found with name '{}'", identifier)),
        1 => Ok(matches[0].0),
        _ => {
            let mut msg = format!("Multiple tasks found with name '{}':\n", identifier);
            for (id, name) in matches {
                msg.push_str(&format!("  {}: {}\n", id, name));
            }
            msg.push_str("Please use the specific ID instead.");
            Err(msg)
        }
    }
}

/// Resolve a milestone identifier (UUID or exact name) to a milestone ID.
pub fn resolve_milestone(tracker: &Tracker, identifier: &str) -> Result<Uuid, String> {
    if let Ok(id) = Uuid::parse_str(identifier) {
        return if tracker.find_milestone(id).is_some() {
            Ok(id)
        } else {
            Err(format!("Milestone with ID {} not found", id))
        };
    }
    let matches: Vec<&Milestone> = tracker
        .milestones
        .iter()
        .filter(|m| m.name.eq_ignore_ascii_case(identifier))
        .collect();
    match matches.len() {
        0 => Err(format!("No milestone found with name '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => Err(format!(
            "Multiple milestones named '{}'; use the ID instead",
            identifier
        )),
    }
}

fn resolve_task_or_exit(tracker: &Tracker, identifier: &str) -> Uuid {
    match resolve_task(tracker, identifier) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn resolve_milestone_or_exit(tracker: &Tracker, identifier: &str) -> Uuid {
    match resolve_milestone(tracker, identifier) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn save_or_exit(tracker: &Tracker, db_path: &Path) {
    if let Err(e) = tracker.save(db_path) {
        eprintln!("Failed to save store: {e}");
        std::process::exit(1);
    }
}

/// List milestones with aggregate figures.
pub fn cmd_list(tracker: &Tracker) {
    if tracker.milestones.is_empty() {
        println!("No milestones. Create one with: ptrack add-milestone <name>");
        return;
    }
    println!(
        "{:<38} {:>9} {:>15}  {}",
        "ID", "Progress", "Spent/Planned", "Name"
    );
    for ms in &tracker.milestones {
        println!(
            "{:<38} {:>8.1}% {:>15}  {}",
            ms.id,
            ms.overall_progress(),
            format!("{:.1}/{:.1}", ms.total_spent_time(), ms.total_planned_time()),
            ms.name
        );
    }
}

/// Print a milestone's tasks as an indented tree.
pub fn cmd_tree(tracker: &Tracker, milestone: String) {
    let ms_id = resolve_milestone_or_exit(tracker, &milestone);
    let ms = tracker.find_milestone(ms_id).expect("resolved above");
    println!(
        "{} - {:.1}% ({:.1}/{:.1}h)",
        ms.name,
        ms.overall_progress(),
        ms.total_spent_time(),
        ms.total_planned_time()
    );
    println!(
        "{:<38} {:<7} {:>9} {:>15}  {}",
        "ID", "Status", "Progress", "Spent/Planned", "Name"
    );
    fn print_subtree(tasks: &[Task], depth: usize) {
        for t in tasks {
            println!(
                "{:<38} {:<7} {:>8.1}% {:>15}  {}{}",
                t.id,
                format_status(t.status),
                t.effective_progress(),
                format!("{:.1}/{:.1}", t.total_spent_time(), t.total_planned_time()),
                "  ".repeat(depth),
                t.name
            );
            print_subtree(&t.subtasks, depth + 1);
        }
    }
    print_subtree(&ms.tasks, 0);
}

/// View detailed information about a specific task.
pub fn cmd_view(tracker: &Tracker, id: String) {
    let task_id = resolve_task_or_exit(tracker, &id);
    let task = tracker.find_task(task_id).expect("resolved above");
    let fmt_ts = |ts: Option<i64>| match ts {
        Some(s) => Utc
            .timestamp_opt(s, 0)
            .single()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".into()),
        None => "-".into(),
    };
    println!("ID:           {}", task.id);
    println!("Name:         {}", task.name);
    println!("Status:       {}", format_status(task.status));
    println!(
        "Progress:     {:.1}%{}",
        task.effective_progress(),
        if task.has_children() { " (derived)" } else { "" }
    );
    println!(
        "Time:         {:.1}/{:.1}h spent/planned",
        task.total_spent_time(),
        task.total_planned_time()
    );
    println!("Started UTC:  {}", fmt_ts(task.start_time));
    println!("Ended UTC:    {}", fmt_ts(task.end_time));
    println!("Subtasks:     {}", task.subtasks.len());
    let dash = |s: &str| if s.is_empty() { "-".into() } else { s.to_string() };
    println!("Design doc:   {}", dash(&task.links.design_doc));
    println!("Notes:        {}", dash(&task.links.notes));
    println!("Deliverables: {}", dash(&task.links.deliverables));
    println!("Next steps:\n{}", dash(&task.next_steps));
}

/// Create a new milestone.
pub fn cmd_add_milestone(tracker: &mut Tracker, db_path: &Path, name: String) {
    let ms = Milestone::new(name);
    let id = ms.id;
    tracker.add_milestone(ms);
    save_or_exit(tracker, db_path);
    println!("Added milestone {}", id);
}

/// Add a task, top-level or nested.
pub fn cmd_add(
    tracker: &mut Tracker,
    db_path: &Path,
    name: String,
    milestone: Option<String>,
    parent: Option<String>,
    time_planned: f64,
) {
    let task = Task::new(name, time_planned);
    let result = match (milestone, parent) {
        (Some(ms), None) => {
            let ms_id = resolve_milestone_or_exit(tracker, &ms);
            tracker.add_top_level_task(ms_id, task)
        }
        (None, Some(p)) => {
            let parent_id = resolve_task_or_exit(tracker, &p);
            tracker.add_subtask(parent_id, task)
        }
        _ => {
            eprintln!("Specify exactly one of --milestone or --parent.");
            std::process::exit(1);
        }
    };
    match result {
        Ok(id) => {
            save_or_exit(tracker, db_path);
            println!("Added task {}", id);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Set progress on a leaf task.
pub fn cmd_progress(tracker: &mut Tracker, db_path: &Path, id: String, value: i64) {
    let task_id = resolve_task_or_exit(tracker, &id);
    if let Err(e) = tracker.set_progress(task_id, value) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    save_or_exit(tracker, db_path);
    let task = tracker.find_task(task_id).expect("resolved above");
    println!("Progress of '{}' set to {}%", task.name, task.progress);
}

/// Transition a task's status.
pub fn cmd_status(tracker: &mut Tracker, db_path: &Path, id: String, status: Status) {
    let task_id = resolve_task_or_exit(tracker, &id);
    if let Err(e) = tracker.set_status(task_id, status) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    save_or_exit(tracker, db_path);
    let task = tracker.find_task(task_id).expect("resolved above");
    println!(
        "'{}' is now {} ({:.1}h spent)",
        task.name,
        format_status(task.status),
        task.time_spent
    );
}

/// Update metadata and leaf time fields on a task.
pub fn cmd_update(
    tracker: &mut Tracker,
    db_path: &Path,
    id: String,
    name: Option<String>,
    next_steps: Option<String>,
    design_doc: Option<String>,
    notes: Option<String>,
    deliverables: Option<String>,
    time_planned: Option<f64>,
    time_spent: Option<f64>,
) {
    let task_id = resolve_task_or_exit(tracker, &id);
    {
        let task = tracker.find_task_mut(task_id).expect("resolved above");
        if let Some(n) = name {
            task.name = n;
        }
        if let Some(s) = next_steps {
            task.next_steps = s;
        }
        if let Some(p) = design_doc {
            task.links.design_doc = p;
        }
        if let Some(p) = notes {
            task.links.notes = p;
        }
        if let Some(p) = deliverables {
            task.links.deliverables = p;
        }
        if let Some(h) = time_planned {
            if let Err(e) = task.set_time_planned(h) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        if let Some(h) = time_spent {
            if let Err(e) = task.set_time_spent(h) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    }
    tracker.propagate_update(task_id);
    save_or_exit(tracker, db_path);
    println!("Updated task {}", task_id);
}

/// Remove a task and its subtree.
pub fn cmd_remove(tracker: &mut Tracker, db_path: &Path, id: String) {
    let task_id = resolve_task_or_exit(tracker, &id);
    if tracker.remove_task_by_id(task_id) {
        save_or_exit(tracker, db_path);
        println!("Removed task {}", task_id);
    } else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    }
}

/// Remove a milestone and all its tasks.
pub fn cmd_remove_milestone(tracker: &mut Tracker, db_path: &Path, id: String) {
    let ms_id = resolve_milestone_or_exit(tracker, &id);
    if tracker.remove_milestone_by_id(ms_id) {
        save_or_exit(tracker, db_path);
        println!("Removed milestone {}", ms_id);
    } else {
        eprintln!("Milestone {} not found.", ms_id);
        std::process::exit(1);
    }
}

/// Emit shell completions on stdout.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Tracker, Uuid) {
        let mut tracker = Tracker::default();
        let ms = Milestone::new("Basics");
        let ms_id = ms.id;
        tracker.add_milestone(ms);
        let top = tracker
            .add_top_level_task(ms_id, Task::new("OpenCV", 15.0))
            .unwrap();
        tracker
            .add_subtask(top, Task::new("Image IO", 5.0))
            .unwrap();
        (tracker, ms_id)
    }

    #[test]
    fn resolve_task_by_id_and_name() {
        let (tracker, _) = fixture();
        let by_name = resolve_task(&tracker, "image io").unwrap();
        let by_id = resolve_task(&tracker, &by_name.to_string()).unwrap();
        assert_eq!(by_name, by_id);
        assert!(resolve_task(&tracker, "missing").is_err());
        assert!(resolve_task(&tracker, &Uuid::new_v4().to_string()).is_err());
    }

    #[test]
    fn resolve_task_rejects_ambiguous_names() {
        let (mut tracker, ms_id) = fixture();
        tracker
            .add_top_level_task(ms_id, Task::new("Image IO", 1.0))
            .unwrap();
        let err = resolve_task(&tracker, "Image IO").unwrap_err();
        assert!(err.contains("Multiple tasks"));
    }

    #[test]
    fn resolve_milestone_by_name() {
        let (tracker, ms_id) = fixture();
        assert_eq!(resolve_milestone(&tracker, "basics").unwrap(), ms_id);
        assert!(resolve_milestone(&tracker, "nope").is_err());
    }
}

//! Tracker repository: forest ownership, lookups, mutation, propagation and
//! JSON persistence.
//!
//! The tracker is the sole root of the forest. Every mutating operation
//! finishes by recomputing derived fields along the affected ancestor chain,
//! so composite tasks always reflect their subtrees. Persistence is a
//! whole-forest snapshot: pretty-printed JSON written atomically via a temp
//! file and rename.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackError;
use crate::fields::Status;
use crate::milestone::Milestone;
use crate::task::Task;

/// Owns all milestones and keeps aggregates consistent across mutations.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tracker {
    pub milestones: Vec<Milestone>,
}

impl Tracker {
    /// Load the forest from a JSON store.
    ///
    /// A missing file is an empty forest, not an error. A malformed file
    /// propagates as a fatal store error. Parent back-references are rebuilt
    /// during the load.
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        if !path.exists() {
            return Ok(Tracker::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let mut tracker: Tracker = serde_json::from_str(&buf)?;
        for ms in &mut tracker.milestones {
            for task in &mut ms.tasks {
                task.assign_parents(None);
            }
        }
        Ok(tracker)
    }

    /// Save the whole forest atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), TrackError> {
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn add_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
    }

    pub fn find_milestone(&self, id: Uuid) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    pub fn find_milestone_mut(&mut self, id: Uuid) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    /// Depth-first task lookup across every milestone, in insertion order.
    pub fn find_task(&self, id: Uuid) -> Option<&Task> {
        self.milestones.iter().find_map(|m| m.find_task(id))
    }

    pub fn find_task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.milestones.iter_mut().find_map(|m| m.find_task_mut(id))
    }

    /// Append a task at the top level of an explicitly named milestone.
    pub fn add_top_level_task(
        &mut self,
        milestone_id: Uuid,
        task: Task,
    ) -> Result<Uuid, TrackError> {
        let id = task.id;
        let ms = self
            .find_milestone_mut(milestone_id)
            .ok_or(TrackError::MilestoneNotFound(milestone_id))?;
        ms.add_task(task);
        Ok(id)
    }

    /// Append a task under an existing parent task, then refresh the parent
    /// chain's derived fields.
    pub fn add_subtask(&mut self, parent_id: Uuid, task: Task) -> Result<Uuid, TrackError> {
        let id = task.id;
        let parent = self
            .find_task_mut(parent_id)
            .ok_or(TrackError::TaskNotFound(parent_id))?;
        parent.add_child(task);
        self.propagate_update(id);
        Ok(id)
    }

    /// Recompute derived fields up the ancestor chain of `task_id`.
    ///
    /// Walks parent back-references to the top-level task. Milestone-level
    /// aggregates are computed on demand and need no refresh.
    pub fn propagate_update(&mut self, task_id: Uuid) {
        let mut current = task_id;
        while let Some(parent_id) = self.find_task(current).and_then(|t| t.parent) {
            if let Some(parent) = self.find_task_mut(parent_id) {
                parent.recompute_derived();
            }
            current = parent_id;
        }
    }

    /// Set progress on a leaf task and propagate upward.
    pub fn set_progress(&mut self, task_id: Uuid, value: i64) -> Result<(), TrackError> {
        let task = self
            .find_task_mut(task_id)
            .ok_or(TrackError::TaskNotFound(task_id))?;
        task.set_progress(value)?;
        self.propagate_update(task_id);
        Ok(())
    }

    /// Apply a status transition and propagate upward (a DONE accrual changes
    /// spent time, which ancestors derive from).
    pub fn set_status(&mut self, task_id: Uuid, status: Status) -> Result<(), TrackError> {
        let task = self
            .find_task_mut(task_id)
            .ok_or(TrackError::TaskNotFound(task_id))?;
        task.transition_status(status);
        self.propagate_update(task_id);
        Ok(())
    }

    /// Remove a task anywhere in the forest.
    ///
    /// The former parent chain is recomputed afterwards so ancestors reflect
    /// the remaining children. Returns whether a task was removed.
    pub fn remove_task_by_id(&mut self, task_id: Uuid) -> bool {
        let parent_id = match self.find_task(task_id) {
            Some(t) => t.parent,
            None => return false,
        };
        let removed = self
            .milestones
            .iter_mut()
            .any(|m| m.remove_task_by_id(task_id));
        if removed {
            if let Some(pid) = parent_id {
                if let Some(parent) = self.find_task_mut(pid) {
                    parent.recompute_derived();
                }
                self.propagate_update(pid);
            }
        }
        removed
    }

    /// Remove a milestone and its whole tree. Nothing sits above a milestone,
    /// so no recomputation follows.
    pub fn remove_milestone_by_id(&mut self, id: Uuid) -> bool {
        let before = self.milestones.len();
        self.milestones.retain(|m| m.id != id);
        self.milestones.len() != before
    }
}

//! Task data structure and the progress/time aggregation rules.
//!
//! This module defines the core `Task` node: a tree of owned subtasks where a
//! node with children is a *composite* whose progress and time figures are
//! derived from its subtree, and a node without children is a *leaf* whose
//! fields are set directly.
//!
//! Ownership is strictly downward: each task owns its `subtasks` vector. The
//! upward edge is a stored parent id (`parent`), used only for lookups through
//! the tracker; it is never serialized and is rebuilt after every load.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TrackError;
use crate::fields::{Links, Status};

/// A single work item with time tracking and nested subtasks.
///
/// Field order matches the persisted JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub time_planned: f64,
    pub time_spent: f64,
    /// Percentage 0-100. Derived (and overwritten) for composites.
    pub progress: u8,
    #[serde(default)]
    pub next_steps: String,
    #[serde(default)]
    pub links: Links,
    #[serde(default)]
    pub subtasks: Vec<Task>,
    #[serde(default)]
    pub status: Status,
    /// Epoch seconds of the last transition into DOING; consumed on DONE.
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    /// Id of the owning task, `None` for top-level tasks. Rebuilt on load.
    #[serde(skip)]
    pub parent: Option<Uuid>,
}

impl Task {
    /// Create a leaf task with a fresh id.
    pub fn new(name: impl Into<String>, time_planned: f64) -> Self {
        Task {
            id: Uuid::new_v4(),
            name: name.into(),
            time_planned: time_planned.max(0.0),
            time_spent: 0.0,
            progress: 0,
            next_steps: String::new(),
            links: Links::default(),
            subtasks: Vec::new(),
            status: Status::Todo,
            start_time: None,
            end_time: None,
            parent: None,
        }
    }

    pub fn has_children(&self) -> bool {
        !self.subtasks.is_empty()
    }

    /// Append a subtask, wiring its parent back-reference to this node.
    ///
    /// Does not recompute derived fields; callers go through the tracker's
    /// propagation after structural edits.
    pub fn add_child(&mut self, mut child: Task) {
        child.parent = Some(self.id);
        self.subtasks.push(child);
    }

    /// Set progress on a leaf, clamped into 0-100.
    ///
    /// Composites reject the call: their progress is derived from children.
    pub fn set_progress(&mut self, value: i64) -> Result<(), TrackError> {
        if self.has_children() {
            return Err(TrackError::InvalidOperation(format!(
                "progress of '{}' is derived from its subtasks",
                self.name
            )));
        }
        self.progress = value.clamp(0, 100) as u8;
        Ok(())
    }

    /// Set planned hours on a leaf, clamped at zero.
    pub fn set_time_planned(&mut self, hours: f64) -> Result<(), TrackError> {
        if self.has_children() {
            return Err(TrackError::InvalidOperation(format!(
                "planned time of '{}' is derived from its subtasks",
                self.name
            )));
        }
        self.time_planned = hours.max(0.0);
        Ok(())
    }

    /// Set spent hours on a leaf, clamped at zero.
    pub fn set_time_spent(&mut self, hours: f64) -> Result<(), TrackError> {
        if self.has_children() {
            return Err(TrackError::InvalidOperation(format!(
                "spent time of '{}' is derived from its subtasks",
                self.name
            )));
        }
        self.time_spent = hours.max(0.0);
        Ok(())
    }

    /// Total planned hours over the subtree rooted here.
    ///
    /// A leaf reports its own field; a composite reports the sum of its
    /// children's totals (its own stored field is derived, never an input).
    pub fn total_planned_time(&self) -> f64 {
        if self.subtasks.is_empty() {
            self.time_planned
        } else {
            self.subtasks.iter().map(Task::total_planned_time).sum()
        }
    }

    /// Total spent hours over the subtree rooted here.
    pub fn total_spent_time(&self) -> f64 {
        if self.subtasks.is_empty() {
            self.time_spent
        } else {
            self.subtasks.iter().map(Task::total_spent_time).sum()
        }
    }

    /// Effective progress percentage of this node.
    ///
    /// Leaves report their stored value. Composites report the average of
    /// each child's effective progress weighted by that child's total planned
    /// time (subtree sum). Zero total weight reads as zero progress.
    pub fn effective_progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return f64::from(self.progress);
        }
        let weight: f64 = self.subtasks.iter().map(Task::total_planned_time).sum();
        if weight == 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .subtasks
            .iter()
            .map(|t| t.effective_progress() * t.total_planned_time())
            .sum();
        weighted / weight
    }

    /// Refresh this node's stored derived fields from its children.
    ///
    /// No-op on leaves; their fields are the inputs, not outputs.
    pub fn recompute_derived(&mut self) {
        if self.subtasks.is_empty() {
            return;
        }
        self.time_planned = self.total_planned_time();
        self.time_spent = self.total_spent_time();
        self.progress = self.effective_progress().round() as u8;
    }

    /// Apply a status transition.
    ///
    /// Re-entering the current status is a no-op. Entering DOING records a
    /// fresh start timestamp. Entering DONE records the end timestamp and, if
    /// a start timestamp exists, accrues the elapsed interval into
    /// `time_spent` in hours; the start timestamp is consumed so an interval
    /// accrues exactly once.
    pub fn transition_status(&mut self, new_status: Status) {
        if self.status == new_status {
            return;
        }
        match new_status {
            Status::Doing => {
                self.start_time = Some(Utc::now().timestamp());
            }
            Status::Done => {
                let end = Utc::now().timestamp();
                self.end_time = Some(end);
                if let Some(start) = self.start_time.take() {
                    self.time_spent += (end - start) as f64 / 3600.0;
                }
            }
            Status::Todo => {}
        }
        self.status = new_status;
    }

    /// Depth-first search of the subtree rooted here, self included.
    pub fn find(&self, id: Uuid) -> Option<&Task> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter().find_map(|t| t.find(id))
    }

    /// Mutable variant of [`Task::find`].
    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter_mut().find_map(|t| t.find_mut(id))
    }

    /// Remove the first descendant with the given id. Returns whether a node
    /// was removed. The node itself is not a candidate.
    pub fn remove_child_by_id(&mut self, id: Uuid) -> bool {
        if let Some(pos) = self.subtasks.iter().position(|t| t.id == id) {
            self.subtasks.remove(pos);
            return true;
        }
        self.subtasks.iter_mut().any(|t| t.remove_child_by_id(id))
    }

    /// Rebuild parent back-references throughout the subtree.
    ///
    /// Called after deserialization; `parent` is the id of the owning task,
    /// `None` at top level.
    pub fn assign_parents(&mut self, parent: Option<Uuid>) {
        self.parent = parent;
        let own_id = self.id;
        for child in &mut self.subtasks {
            child.assign_parents(Some(own_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, planned: f64, progress: u8) -> Task {
        let mut t = Task::new(name, planned);
        t.progress = progress;
        t
    }

    #[test]
    fn weighted_progress_over_children() {
        // (50*10 + 100*30) / (10+30) = 87.5
        let mut parent = Task::new("P", 0.0);
        parent.add_child(leaf("A", 10.0, 50));
        parent.add_child(leaf("B", 30.0, 100));
        assert_eq!(parent.effective_progress(), 87.5);
        assert_eq!(parent.total_planned_time(), 40.0);
    }

    #[test]
    fn zero_weight_reads_as_zero_progress() {
        let mut parent = Task::new("P", 5.0);
        parent.add_child(leaf("A", 0.0, 80));
        parent.add_child(leaf("B", 0.0, 20));
        assert_eq!(parent.effective_progress(), 0.0);
    }

    #[test]
    fn planned_time_sums_recursively_ignoring_composite_fields() {
        let mut grandchild_owner = Task::new("mid", 99.0);
        grandchild_owner.add_child(leaf("deep-a", 2.0, 0));
        grandchild_owner.add_child(leaf("deep-b", 3.0, 0));
        let mut root = Task::new("root", 42.0);
        root.add_child(grandchild_owner);
        root.add_child(leaf("shallow", 4.0, 0));
        // Own stored fields of composites (99, 42) never contribute.
        assert_eq!(root.total_planned_time(), 9.0);
    }

    #[test]
    fn nested_weighting_uses_subtree_totals() {
        // Child C1 is itself composite: leaves (1h, 100%) and (3h, 0%),
        // effective 25%, weight 4h. Sibling C2 is a leaf (4h, 75%).
        let mut c1 = Task::new("C1", 0.0);
        c1.add_child(leaf("a", 1.0, 100));
        c1.add_child(leaf("b", 3.0, 0));
        let mut root = Task::new("root", 0.0);
        root.add_child(c1);
        root.add_child(leaf("C2", 4.0, 75));
        assert_eq!(root.effective_progress(), 50.0);
    }

    #[test]
    fn set_progress_clamps_on_leaf() {
        let mut t = Task::new("leaf", 1.0);
        t.set_progress(-5).unwrap();
        assert_eq!(t.progress, 0);
        t.set_progress(150).unwrap();
        assert_eq!(t.progress, 100);
        t.set_progress(42).unwrap();
        assert_eq!(t.progress, 42);
    }

    #[test]
    fn set_progress_rejected_on_composite() {
        let mut parent = Task::new("P", 0.0);
        parent.add_child(leaf("A", 1.0, 0));
        assert!(matches!(
            parent.set_progress(10),
            Err(TrackError::InvalidOperation(_))
        ));
    }

    #[test]
    fn time_edits_rejected_on_composite() {
        let mut parent = Task::new("P", 0.0);
        parent.add_child(leaf("A", 1.0, 0));
        assert!(parent.set_time_planned(5.0).is_err());
        assert!(parent.set_time_spent(5.0).is_err());
        let mut l = Task::new("L", 1.0);
        l.set_time_spent(-2.0).unwrap();
        assert_eq!(l.time_spent, 0.0);
    }

    #[test]
    fn recompute_derived_overwrites_composite_fields() {
        let mut parent = Task::new("P", 123.0);
        parent.add_child(leaf("A", 10.0, 50));
        parent.add_child(leaf("B", 30.0, 100));
        parent.recompute_derived();
        assert_eq!(parent.time_planned, 40.0);
        assert_eq!(parent.progress, 88); // 87.5 rounded
    }

    #[test]
    fn doing_records_start_and_done_accrues_elapsed() {
        let mut t = Task::new("leaf", 1.0);
        t.transition_status(Status::Doing);
        assert!(t.start_time.is_some());
        // Backdate the start by an hour so the accrual is observable.
        t.start_time = Some(Utc::now().timestamp() - 3600);
        t.transition_status(Status::Done);
        assert!(t.end_time.is_some());
        assert!((t.time_spent - 1.0).abs() < 0.01);
        // Interval consumed: the start timestamp is gone.
        assert!(t.start_time.is_none());
    }

    #[test]
    fn done_without_start_accrues_nothing() {
        let mut t = Task::new("leaf", 1.0);
        t.transition_status(Status::Done);
        assert_eq!(t.time_spent, 0.0);
        assert!(t.end_time.is_some());
    }

    #[test]
    fn reentering_done_via_doing_accrues_again() {
        let mut t = Task::new("leaf", 1.0);
        t.start_time = Some(Utc::now().timestamp() - 3600);
        t.status = Status::Doing;
        t.transition_status(Status::Done);
        let first = t.time_spent;
        t.transition_status(Status::Doing);
        t.start_time = Some(Utc::now().timestamp() - 1800);
        t.transition_status(Status::Done);
        assert!((t.time_spent - first - 0.5).abs() < 0.01);
    }

    #[test]
    fn same_status_transition_is_noop() {
        let mut t = Task::new("leaf", 1.0);
        t.transition_status(Status::Todo);
        assert!(t.start_time.is_none());
        assert!(t.end_time.is_none());
        t.transition_status(Status::Doing);
        let started = t.start_time;
        t.transition_status(Status::Doing);
        assert_eq!(t.start_time, started);
    }

    #[test]
    fn find_reaches_nested_subtasks() {
        let deep = leaf("deep", 1.0, 0);
        let deep_id = deep.id;
        let mut mid = Task::new("mid", 0.0);
        mid.add_child(deep);
        let mut root = Task::new("root", 0.0);
        root.add_child(mid);
        assert_eq!(root.find(deep_id).unwrap().name, "deep");
        assert!(root.find_mut(deep_id).is_some());
    }

    #[test]
    fn remove_child_searches_recursively() {
        let deep = leaf("deep", 1.0, 0);
        let deep_id = deep.id;
        let mut mid = Task::new("mid", 0.0);
        mid.add_child(deep);
        let mut root = Task::new("root", 0.0);
        root.add_child(mid);
        assert!(root.remove_child_by_id(deep_id));
        assert!(root.find(deep_id).is_none());
        assert!(!root.remove_child_by_id(deep_id));
    }

    #[test]
    fn assign_parents_wires_the_whole_subtree() {
        let mut mid = Task::new("mid", 0.0);
        mid.add_child(leaf("deep", 1.0, 0));
        let mut root = Task::new("root", 0.0);
        root.add_child(mid);
        // Simulate a fresh deserialization: wipe and rebuild.
        root.parent = Some(Uuid::new_v4());
        root.assign_parents(None);
        assert!(root.parent.is_none());
        let mid_ref = &root.subtasks[0];
        assert_eq!(mid_ref.parent, Some(root.id));
        assert_eq!(mid_ref.subtasks[0].parent, Some(mid_ref.id));
    }
}

//! Milestone: an ordered collection of top-level tasks.
//!
//! A milestone aggregates progress and time across its task trees with the
//! same weighted rules a composite task applies to its children.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::Task;

/// A named grouping of top-level task trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Milestone {
    pub fn new(name: impl Into<String>) -> Self {
        Milestone {
            id: Uuid::new_v4(),
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a top-level task. Top-level tasks carry no parent reference.
    pub fn add_task(&mut self, mut task: Task) {
        task.parent = None;
        self.tasks.push(task);
    }

    /// Remove the first task with the given id anywhere in this milestone,
    /// top level or nested. Returns whether a node was removed.
    pub fn remove_task_by_id(&mut self, id: Uuid) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            return true;
        }
        self.tasks.iter_mut().any(|t| t.remove_child_by_id(id))
    }

    /// Depth-first lookup across all task trees.
    pub fn find_task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find_map(|t| t.find(id))
    }

    pub fn find_task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find_map(|t| t.find_mut(id))
    }

    /// Planned hours summed over every task tree.
    pub fn total_planned_time(&self) -> f64 {
        self.tasks.iter().map(Task::total_planned_time).sum()
    }

    /// Spent hours summed over every task tree.
    pub fn total_spent_time(&self) -> f64 {
        self.tasks.iter().map(Task::total_spent_time).sum()
    }

    /// Planned-time-weighted average progress over the top-level tasks.
    /// Zero total weight reads as zero.
    pub fn overall_progress(&self) -> f64 {
        let weight = self.total_planned_time();
        if weight == 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .tasks
            .iter()
            .map(|t| t.effective_progress() * t.total_planned_time())
            .sum();
        weighted / weight
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
    fn overall_progress_weights_by_subtree_totals() {
        let mut ms = Milestone::new("M");
        let mut composite = Task::new("P", 0.0);
        composite.add_child(leaf("A", 10.0, 50));
        composite.add_child(leaf("B", 30.0, 100));
        ms.add_task(composite);
        ms.add_task(leaf("C", 40.0, 0));
        // (87.5*40 + 0*40) / 80 = 43.75
        assert_eq!(ms.overall_progress(), 43.75);
        assert_eq!(ms.total_planned_time(), 80.0);
    }

    #[test]
    fn empty_milestone_reads_zero() {
        let ms = Milestone::new("empty");
        assert_eq!(ms.overall_progress(), 0.0);
        assert_eq!(ms.total_planned_time(), 0.0);
        assert_eq!(ms.total_spent_time(), 0.0);
    }

    #[test]
    fn remove_finds_nested_subtasks() {
        let deep = leaf("deep", 1.0, 0);
        let deep_id = deep.id;
        let mut mid = Task::new("mid", 0.0);
        mid.add_child(deep);
        let mut top = Task::new("top", 0.0);
        top.add_child(mid);
        let mut ms = Milestone::new("M");
        ms.add_task(top);
        assert!(ms.remove_task_by_id(deep_id));
        assert!(ms.find_task(deep_id).is_none());
        assert!(!ms.remove_task_by_id(deep_id));
    }

    #[test]
    fn remove_top_level_task_directly() {
        let t = leaf("t", 1.0, 0);
        let id = t.id;
        let mut ms = Milestone::new("M");
        ms.add_task(t);
        assert!(ms.remove_task_by_id(id));
        assert!(ms.tasks.is_empty());
    }
}

//! Enumerations and small field types shared across the data model.
//!
//! This module defines the task status state machine values and the fixed-key
//! link record attached to every task.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task completion status.
///
/// Stored in the JSON document as the uppercase string form
/// (`"TODO"` / `"DOING"` / `"DONE"`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Todo,
    Doing,
    Done,
}

/// Fixed-key document links attached to a task.
///
/// All values are path strings and default to empty; missing keys on load
/// deserialize as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Links {
    #[serde(default)]
    pub design_doc: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub deliverables: String,
}

/// Format a status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "TODO",
        Status::Doing => "DOING",
        Status::Done => "DONE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Status::Todo).unwrap(), "\"TODO\"");
        assert_eq!(serde_json::to_string(&Status::Doing).unwrap(), "\"DOING\"");
        assert_eq!(serde_json::to_string(&Status::Done).unwrap(), "\"DONE\"");
        let s: Status = serde_json::from_str("\"DOING\"").unwrap();
        assert_eq!(s, Status::Doing);
    }

    #[test]
    fn links_default_to_empty_on_partial_document() {
        let links: Links = serde_json::from_str(r#"{"notes": "/n.md"}"#).unwrap();
        assert_eq!(links.design_doc, "");
        assert_eq!(links.notes, "/n.md");
        assert_eq!(links.deliverables, "");
    }
}

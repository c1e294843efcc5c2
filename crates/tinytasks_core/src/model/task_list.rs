//! Task list entity.
//!
//! # Responsibility
//! - Define the top-level grouping record that owns tasks.
//! - Provide the display label fallback for absent or blank titles.
//!
//! # Invariants
//! - `id` is stable for the list lifetime.
//! - `last_changed` moves forward on every title edit.

use crate::ordering::Ordered;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task list.
pub type TaskListId = Uuid;

/// Title assigned to freshly created lists.
pub const DEFAULT_LIST_TITLE: &str = "New list";
/// Label shown when a list has no usable title.
pub const UNTITLED_LIST_LABEL: &str = "Untitled";

/// Ordered, titled container of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// Stable list ID.
    pub id: TaskListId,
    /// User-entered title. `None` when never set by persisted data.
    pub title: Option<String>,
    /// Position among sibling lists.
    pub order: i64,
    /// Unix epoch milliseconds of the last title change.
    pub last_changed: i64,
}

impl TaskList {
    /// Creates a list with the default title at the given position.
    pub fn new(order: i64, last_changed: i64) -> Self {
        Self::with_id(Uuid::new_v4(), order, last_changed)
    }

    /// Creates a list with a caller-provided stable ID.
    pub fn with_id(id: TaskListId, order: i64, last_changed: i64) -> Self {
        Self {
            id,
            title: Some(DEFAULT_LIST_TITLE.to_string()),
            order,
            last_changed,
        }
    }

    /// Returns the label used for navigation and list rows.
    ///
    /// The title is shown as entered. Absent titles, and titles with nothing
    /// but whitespace, fall back to [`UNTITLED_LIST_LABEL`].
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED_LIST_LABEL,
        }
    }

    /// Replaces the title and bumps `last_changed`.
    ///
    /// `last_changed` never moves backwards, even if the clock does.
    pub fn rename(&mut self, title: impl Into<String>, now_ms: i64) {
        self.title = Some(title.into());
        self.last_changed = now_ms.max(self.last_changed);
    }
}

impl Ordered for TaskList {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

//! Task entity.
//!
//! # Responsibility
//! - Define the to-do item record owned by exactly one task list.
//!
//! # Invariants
//! - `list_id` always names an existing list while the task exists.
//! - Text accepts any string, including empty.

use crate::model::task_list::TaskListId;
use crate::ordering::Ordered;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// To-do item inside a task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable task ID.
    pub id: TaskId,
    /// Owning list. Held by id only; the list owns the task.
    pub list_id: TaskListId,
    /// Free text body.
    pub text: String,
    /// Completion flag.
    pub is_done: bool,
    /// Position among sibling tasks of the same list.
    pub order: i64,
}

impl Task {
    /// Creates an empty, not-done task appended at `order`.
    pub fn new(list_id: TaskListId, order: i64) -> Self {
        Self::with_id(Uuid::new_v4(), list_id, order)
    }

    /// Creates an empty task with a caller-provided stable ID.
    pub fn with_id(id: TaskId, list_id: TaskListId, order: i64) -> Self {
        Self {
            id,
            list_id,
            text: String::new(),
            is_done: false,
            order,
        }
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.is_done = !self.is_done;
        self.is_done
    }
}

impl Ordered for Task {
    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::Task;
    use uuid::Uuid;

    #[test]
    fn new_task_is_empty_and_open() {
        let list_id = Uuid::new_v4();
        let task = Task::new(list_id, 2);
        assert_eq!(task.list_id, list_id);
        assert!(task.text.is_empty());
        assert!(!task.is_done);
        assert_eq!(task.order, 2);
    }

    #[test]
    fn toggle_flips_completion() {
        let mut task = Task::new(Uuid::new_v4(), 0);
        assert!(task.toggle());
        assert!(!task.toggle());
    }
}

//! In-process persistence provider.
//!
//! # Responsibility
//! - Hold committed state in memory for previews and tests.
//! - Simulate storage failures on demand.
//!
//! # Invariants
//! - A rejected commit leaves stored state untouched.
//! - Deleting a list also drops its tasks.

use crate::model::task::{Task, TaskId};
use crate::model::task_list::{TaskList, TaskListId};
use crate::repo::provider::{
    ChangeSet, PersistenceError, PersistenceProvider, PersistenceResult, Snapshot,
};
use log::warn;
use std::collections::HashMap;

/// Memory-backed provider with failure injection.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    lists: HashMap<TaskListId, TaskList>,
    tasks: HashMap<TaskId, Task>,
    commits: usize,
    read_only: bool,
    reject_next: Option<String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the provider as if `snapshot` had been committed earlier.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let mut provider = Self::new();
        provider.lists = snapshot
            .lists
            .into_iter()
            .map(|list| (list.id, list))
            .collect();
        provider.tasks = snapshot
            .tasks
            .into_iter()
            .map(|task| (task.id, task))
            .collect();
        provider
    }

    /// Number of successful, non-empty commits.
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Makes the next commit fail with `reason`.
    pub fn reject_next_commit(&mut self, reason: impl Into<String>) {
        self.reject_next = Some(reason.into());
    }

    /// Makes every commit fail until switched off.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn stored_list(&self, id: TaskListId) -> Option<&TaskList> {
        self.lists.get(&id)
    }

    pub fn stored_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn stored_task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl PersistenceProvider for MemoryProvider {
    fn load(&self) -> PersistenceResult<Snapshot> {
        let mut lists: Vec<TaskList> = self.lists.values().cloned().collect();
        lists.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then(b.last_changed.cmp(&a.last_changed))
                .then(a.id.cmp(&b.id))
        });

        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        tasks.sort_by(|a, b| {
            a.list_id
                .cmp(&b.list_id)
                .then(a.order.cmp(&b.order))
                .then(a.id.cmp(&b.id))
        });

        Ok(Snapshot { lists, tasks })
    }

    fn commit(&mut self, changes: &ChangeSet) -> PersistenceResult<()> {
        if let Some(reason) = self.reject_next.take() {
            warn!("event=store_commit module=repo status=error provider=memory error_code=rejected");
            return Err(PersistenceError::Rejected(reason));
        }
        if self.read_only {
            warn!("event=store_commit module=repo status=error provider=memory error_code=read_only");
            return Err(PersistenceError::Rejected("store is read-only".to_string()));
        }
        if changes.is_empty() {
            return Ok(());
        }

        // Mirrors the foreign key on tasks.list_uuid.
        for task in &changes.upserted_tasks {
            let list_survives = changes.upserted_lists.iter().any(|list| list.id == task.list_id)
                || (self.lists.contains_key(&task.list_id)
                    && !changes.deleted_lists.contains(&task.list_id));
            if !list_survives {
                return Err(PersistenceError::Rejected(format!(
                    "task {} references missing list {}",
                    task.id, task.list_id
                )));
            }
        }

        for task_id in &changes.deleted_tasks {
            self.tasks.remove(task_id);
        }
        for list_id in &changes.deleted_lists {
            self.lists.remove(list_id);
            self.tasks.retain(|_, task| task.list_id != *list_id);
        }
        for list in &changes.upserted_lists {
            self.lists.insert(list.id, list.clone());
        }
        for task in &changes.upserted_tasks {
            self.tasks.insert(task.id, task.clone());
        }

        self.commits += 1;
        Ok(())
    }
}

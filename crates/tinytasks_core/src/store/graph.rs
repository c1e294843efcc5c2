//! Entity graph of lists and their tasks.
//!
//! # Responsibility
//! - Own lists by id and each list's ordered task vector.
//! - Apply structural edits and re-stamp sibling orders.
//! - Compute the `ChangeSet` between two graph states.
//!
//! # Invariants
//! - Every task vector is stored in `order` sequence.
//! - `task_owner` has exactly one entry per stored task.
//! - List display order is `order ASC, last_changed DESC, id ASC`.

use crate::model::task::{Task, TaskId};
use crate::model::task_list::{TaskList, TaskListId};
use crate::ordering::{reindex_after_removal, reorder, OrderResult};
use crate::repo::provider::{ChangeSet, PersistenceError, PersistenceResult, Snapshot};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityGraph {
    lists: HashMap<TaskListId, TaskList>,
    tasks_by_list: HashMap<TaskListId, Vec<Task>>,
    task_owner: HashMap<TaskId, TaskListId>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from loaded state without re-stamping.
    ///
    /// # Errors
    /// - `InvalidData` when a task references a missing list or an id repeats.
    pub fn from_snapshot(snapshot: Snapshot) -> PersistenceResult<Self> {
        let mut graph = Self::new();
        for list in snapshot.lists {
            let id = list.id;
            if graph.lists.insert(id, list).is_some() {
                return Err(PersistenceError::InvalidData(format!(
                    "duplicate task list id {id}"
                )));
            }
            graph.tasks_by_list.insert(id, Vec::new());
        }

        for task in snapshot.tasks {
            let Some(tasks) = graph.tasks_by_list.get_mut(&task.list_id) else {
                return Err(PersistenceError::InvalidData(format!(
                    "task {} references missing list {}",
                    task.id, task.list_id
                )));
            };
            if graph.task_owner.insert(task.id, task.list_id).is_some() {
                return Err(PersistenceError::InvalidData(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
            tasks.push(task);
        }

        for tasks in graph.tasks_by_list.values_mut() {
            tasks.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        }
        Ok(graph)
    }

    /// Re-stamps every sibling collection. Returns how many entities changed.
    pub fn normalize(&mut self) -> usize {
        let mut changed = self.restamp_lists();
        for tasks in self.tasks_by_list.values_mut() {
            changed += reindex_after_removal(tasks);
        }
        changed
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn task_count(&self) -> usize {
        self.task_owner.len()
    }

    /// Lists in display order.
    pub fn lists_in_order(&self) -> Vec<&TaskList> {
        let mut lists: Vec<&TaskList> = self.lists.values().collect();
        lists.sort_by(|a, b| display_cmp(a, b));
        lists
    }

    pub fn list(&self, id: TaskListId) -> Option<&TaskList> {
        self.lists.get(&id)
    }

    pub fn list_mut(&mut self, id: TaskListId) -> Option<&mut TaskList> {
        self.lists.get_mut(&id)
    }

    /// Tasks of one list in order, or `None` for an unknown list.
    pub fn tasks(&self, list_id: TaskListId) -> Option<&[Task]> {
        self.tasks_by_list.get(&list_id).map(Vec::as_slice)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        let list_id = self.task_owner.get(&id)?;
        self.tasks_by_list
            .get(list_id)?
            .iter()
            .find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        let list_id = self.task_owner.get(&id)?;
        self.tasks_by_list
            .get_mut(list_id)?
            .iter_mut()
            .find(|task| task.id == id)
    }

    /// Inserts a list with its order left as given.
    pub fn insert_list(&mut self, list: TaskList) {
        self.tasks_by_list.entry(list.id).or_default();
        self.lists.insert(list.id, list);
    }

    /// Appends a task to its owning list.
    ///
    /// Returns `false` without inserting when the list does not exist.
    pub fn push_task(&mut self, task: Task) -> bool {
        let Some(tasks) = self.tasks_by_list.get_mut(&task.list_id) else {
            return false;
        };
        self.task_owner.insert(task.id, task.list_id);
        tasks.push(task);
        true
    }

    /// Removes a list together with the tasks it owns.
    pub fn remove_list(&mut self, id: TaskListId) -> Option<(TaskList, Vec<Task>)> {
        let list = self.lists.remove(&id)?;
        let tasks = self.tasks_by_list.remove(&id).unwrap_or_default();
        for task in &tasks {
            self.task_owner.remove(&task.id);
        }
        Some((list, tasks))
    }

    /// Removes one task from its owning list without re-stamping siblings.
    pub fn remove_task(&mut self, id: TaskId) -> Option<Task> {
        let list_id = self.task_owner.remove(&id)?;
        let tasks = self.tasks_by_list.get_mut(&list_id)?;
        let index = tasks.iter().position(|task| task.id == id)?;
        Some(tasks.remove(index))
    }

    /// Re-stamps list orders to their display positions.
    pub fn restamp_lists(&mut self) -> usize {
        let mut lists: Vec<&mut TaskList> = self.lists.values_mut().collect();
        lists.sort_by(|a, b| display_cmp(a, b));
        reindex_after_removal(&mut lists)
    }

    /// Re-stamps task orders of one list. Unknown lists change nothing.
    pub fn restamp_tasks(&mut self, list_id: TaskListId) -> usize {
        self.tasks_by_list
            .get_mut(&list_id)
            .map_or(0, |tasks| reindex_after_removal(tasks))
    }

    /// Moves lists at display positions `from` to offset `to`.
    pub fn move_lists(&mut self, from: &BTreeSet<usize>, to: usize) -> OrderResult<usize> {
        let mut lists: Vec<&mut TaskList> = self.lists.values_mut().collect();
        lists.sort_by(|a, b| display_cmp(a, b));
        reorder(&mut lists, from, to)
    }

    /// Moves tasks of one list. Unknown lists change nothing.
    pub fn move_tasks(
        &mut self,
        list_id: TaskListId,
        from: &BTreeSet<usize>,
        to: usize,
    ) -> OrderResult<usize> {
        match self.tasks_by_list.get_mut(&list_id) {
            Some(tasks) => reorder(tasks, from, to),
            None => Ok(0),
        }
    }

    fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks_by_list.values().flatten()
    }

    /// Returns the writes that turn `self` into `next`.
    ///
    /// Output is sorted so equal graph pairs always yield equal change sets.
    pub fn diff(&self, next: &EntityGraph) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (id, list) in &next.lists {
            if self.lists.get(id) != Some(list) {
                changes.upserted_lists.push(list.clone());
            }
        }
        for id in self.lists.keys() {
            if !next.lists.contains_key(id) {
                changes.deleted_lists.push(*id);
            }
        }
        for task in next.all_tasks() {
            if self.task(task.id) != Some(task) {
                changes.upserted_tasks.push(task.clone());
            }
        }
        for task in self.all_tasks() {
            if !next.task_owner.contains_key(&task.id) {
                changes.deleted_tasks.push(task.id);
            }
        }

        changes
            .upserted_lists
            .sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        changes.upserted_tasks.sort_by(|a, b| {
            a.list_id
                .cmp(&b.list_id)
                .then(a.order.cmp(&b.order))
                .then(a.id.cmp(&b.id))
        });
        changes.deleted_lists.sort();
        changes.deleted_tasks.sort();
        changes
    }
}

fn display_cmp(a: &TaskList, b: &TaskList) -> Ordering {
    a.order
        .cmp(&b.order)
        .then(b.last_changed.cmp(&a.last_changed))
        .then(a.id.cmp(&b.id))
}

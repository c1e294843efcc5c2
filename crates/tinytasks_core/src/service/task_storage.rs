//! Task storage facade.
//!
//! # Responsibility
//! - Be the single point of mutation for lists and tasks.
//! - Stage each mutation, commit it through the provider, then publish it.
//! - Debounce rapid text/title/checkbox edits per entity and field.
//!
//! # Invariants
//! - The live graph only changes after a successful provider commit.
//! - Sibling orders are contiguous from 0 after every structural mutation,
//!   including deletions.
//! - Observers only see events for committed changes.
//! - A committed immediate update drops the pending debounced edit for the
//!   same field, so an older value never lands after a newer one.

use crate::config::{ConfigError, CoreConfig};
use crate::debounce::Debouncer;
use crate::model::now_epoch_ms;
use crate::model::task::{Task, TaskId};
use crate::model::task_list::{TaskList, TaskListId};
use crate::ordering::{next_order, OrderError};
use crate::repo::provider::{PersistenceError, PersistenceProvider};
use crate::store::graph::EntityGraph;
use crate::store::observer::{ObserverRegistry, StoreEvent, SubscriptionId};
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from storage facade operations.
#[derive(Debug)]
pub enum StorageError {
    TaskListNotFound(TaskListId),
    TaskNotFound(TaskId),
    /// Move selection does not fit the sibling sequence.
    Order(OrderError),
    /// Provider failed to load or commit. The live graph is unchanged.
    Persistence(PersistenceError),
    Config(ConfigError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskListNotFound(id) => write!(f, "task list not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Order(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Order(err) => Some(err),
            Self::Persistence(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::TaskListNotFound(_) | Self::TaskNotFound(_) => None,
        }
    }
}

impl From<OrderError> for StorageError {
    fn from(value: OrderError) -> Self {
        Self::Order(value)
    }
}

impl From<PersistenceError> for StorageError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

impl From<ConfigError> for StorageError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Entity field a debounced edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditTarget {
    TaskText(TaskId),
    TaskDone(TaskId),
    ListTitle(TaskListId),
}

/// Debounced edit waiting for its quiet period to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingEdit {
    TaskText { task_id: TaskId, text: String },
    TaskDone { task_id: TaskId, is_done: bool },
    ListTitle { list_id: TaskListId, title: String },
}

impl PendingEdit {
    pub fn target(&self) -> EditTarget {
        match self {
            Self::TaskText { task_id, .. } => EditTarget::TaskText(*task_id),
            Self::TaskDone { task_id, .. } => EditTarget::TaskDone(*task_id),
            Self::ListTitle { list_id, .. } => EditTarget::ListTitle(*list_id),
        }
    }
}

/// Storage facade over a persistence provider.
pub struct TaskStorage<P: PersistenceProvider> {
    provider: P,
    config: CoreConfig,
    graph: EntityGraph,
    observers: ObserverRegistry,
    edits: Debouncer<EditTarget, PendingEdit>,
}

impl<P: PersistenceProvider> TaskStorage<P> {
    /// Loads persisted state and returns a ready facade.
    ///
    /// Orders left non-contiguous by older data are re-stamped and committed.
    ///
    /// # Errors
    /// - `Config` when `config` is invalid.
    /// - `Persistence` when loading fails, data is inconsistent, or the
    ///   normalization commit fails.
    pub fn open(provider: P, config: CoreConfig) -> StorageResult<Self> {
        config.validate()?;
        let graph = EntityGraph::from_snapshot(provider.load()?)?;
        let edits = Debouncer::new(config.debounce_window());
        let mut storage = Self {
            provider,
            config,
            graph,
            observers: ObserverRegistry::new(),
            edits,
        };

        let mut staged = storage.graph.clone();
        let restamped = staged.normalize();
        if restamped > 0 {
            warn!(
                "event=store_normalize module=service status=start restamped={}",
                restamped
            );
            storage.commit_staged(staged, Vec::new())?;
        }

        info!(
            "event=store_open module=service status=ok lists={} tasks={}",
            storage.graph.list_count(),
            storage.graph.task_count()
        );
        Ok(storage)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Registers a callback invoked after each committed change.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&StoreEvent) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Lists in display order (`order ASC`, newest change first on ties).
    pub fn task_lists(&self) -> Vec<&TaskList> {
        self.graph.lists_in_order()
    }

    pub fn task_list(&self, id: TaskListId) -> Option<&TaskList> {
        self.graph.list(id)
    }

    pub fn task_list_count(&self) -> usize {
        self.graph.list_count()
    }

    /// Tasks of one list in order.
    pub fn tasks(&self, list_id: TaskListId) -> StorageResult<&[Task]> {
        self.graph
            .tasks(list_id)
            .ok_or(StorageError::TaskListNotFound(list_id))
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.graph.task(id)
    }

    /// Creates a list titled "New list" at the end of the list order.
    pub fn add_task_list(&mut self) -> StorageResult<TaskList> {
        let list = TaskList::new(
            next_order(&self.graph.lists_in_order()),
            now_epoch_ms(),
        );
        let mut staged = self.graph.clone();
        staged.insert_list(list.clone());
        self.commit_staged(staged, vec![StoreEvent::TaskListAdded(list.id)])?;

        info!(
            "event=list_add module=service status=ok list_id={} order={}",
            list.id, list.order
        );
        Ok(list)
    }

    /// Appends an empty, not-done task to `list_id`.
    pub fn add_task(&mut self, list_id: TaskListId) -> StorageResult<Task> {
        let tasks = self
            .graph
            .tasks(list_id)
            .ok_or(StorageError::TaskListNotFound(list_id))?;
        let task = Task::new(list_id, next_order(tasks));

        let mut staged = self.graph.clone();
        staged.push_task(task.clone());
        self.commit_staged(
            staged,
            vec![StoreEvent::TaskAdded {
                list_id,
                task_id: task.id,
            }],
        )?;

        info!(
            "event=task_add module=service status=ok list_id={} task_id={} order={}",
            list_id, task.id, task.order
        );
        Ok(task)
    }

    /// Deletes lists with their tasks, then re-stamps the remaining lists.
    ///
    /// Fails without deleting anything if one id is unknown.
    pub fn delete_task_lists(&mut self, list_ids: &[TaskListId]) -> StorageResult<()> {
        if list_ids.is_empty() {
            return Ok(());
        }
        if let Some(missing) = list_ids.iter().find(|id| self.graph.list(**id).is_none()) {
            return Err(StorageError::TaskListNotFound(*missing));
        }

        let mut staged = self.graph.clone();
        let mut removed_lists = Vec::new();
        let mut removed_tasks = HashSet::new();
        for list_id in list_ids {
            if let Some((list, tasks)) = staged.remove_list(*list_id) {
                removed_lists.push(list.id);
                removed_tasks.extend(tasks.into_iter().map(|task| task.id));
            }
        }
        staged.restamp_lists();

        self.commit_staged(
            staged,
            vec![StoreEvent::TaskListsDeleted(removed_lists.clone())],
        )?;
        self.cancel_edits_for(&removed_lists, &removed_tasks);

        info!(
            "event=list_delete module=service status=ok lists={} cascaded_tasks={}",
            removed_lists.len(),
            removed_tasks.len()
        );
        Ok(())
    }

    /// Deletes tasks, then re-stamps each affected list's tasks.
    ///
    /// Fails without deleting anything if one id is unknown.
    pub fn delete_tasks(&mut self, task_ids: &[TaskId]) -> StorageResult<()> {
        if task_ids.is_empty() {
            return Ok(());
        }
        if let Some(missing) = task_ids.iter().find(|id| self.graph.task(**id).is_none()) {
            return Err(StorageError::TaskNotFound(*missing));
        }

        let mut staged = self.graph.clone();
        let mut affected_lists = BTreeSet::new();
        let mut removed_tasks = Vec::new();
        for task_id in task_ids {
            if let Some(task) = staged.remove_task(*task_id) {
                affected_lists.insert(task.list_id);
                removed_tasks.push(task.id);
            }
        }
        for list_id in &affected_lists {
            staged.restamp_tasks(*list_id);
        }

        let list_ids: Vec<TaskListId> = affected_lists.into_iter().collect();
        self.commit_staged(
            staged,
            vec![StoreEvent::TasksDeleted {
                list_ids: list_ids.clone(),
                task_ids: removed_tasks.clone(),
            }],
        )?;
        let removed_set: HashSet<TaskId> = removed_tasks.iter().copied().collect();
        self.cancel_edits_for(&[], &removed_set);

        info!(
            "event=task_delete module=service status=ok tasks={} lists={}",
            removed_tasks.len(),
            list_ids.len()
        );
        Ok(())
    }

    /// Moves lists at display positions `from` before the list at `to`.
    pub fn move_task_lists(&mut self, from: &BTreeSet<usize>, to: usize) -> StorageResult<()> {
        let mut staged = self.graph.clone();
        let restamped = staged.move_lists(from, to)?;
        self.commit_staged(staged, vec![StoreEvent::TaskListsMoved])?;

        debug!(
            "event=list_move module=service status=ok selected={} to={} restamped={}",
            from.len(),
            to,
            restamped
        );
        Ok(())
    }

    /// Moves tasks of `list_id` at positions `from` before the task at `to`.
    pub fn move_tasks(
        &mut self,
        list_id: TaskListId,
        from: &BTreeSet<usize>,
        to: usize,
    ) -> StorageResult<()> {
        if self.graph.list(list_id).is_none() {
            return Err(StorageError::TaskListNotFound(list_id));
        }

        let mut staged = self.graph.clone();
        let restamped = staged.move_tasks(list_id, from, to)?;
        self.commit_staged(staged, vec![StoreEvent::TasksMoved(list_id)])?;

        debug!(
            "event=task_move module=service status=ok list_id={} selected={} to={} restamped={}",
            list_id,
            from.len(),
            to,
            restamped
        );
        Ok(())
    }

    /// Sets the list title and bumps `last_changed`.
    ///
    /// Supersedes a pending debounced title edit for the list.
    pub fn update_title(
        &mut self,
        list_id: TaskListId,
        title: impl Into<String>,
    ) -> StorageResult<()> {
        let mut staged = self.graph.clone();
        staged
            .list_mut(list_id)
            .ok_or(StorageError::TaskListNotFound(list_id))?
            .rename(title, now_epoch_ms());
        self.commit_staged(staged, vec![StoreEvent::TaskListUpdated(list_id)])?;
        self.supersede_edit(EditTarget::ListTitle(list_id));
        Ok(())
    }

    /// Supersedes a pending debounced text edit for the task.
    pub fn update_task_text(
        &mut self,
        task_id: TaskId,
        text: impl Into<String>,
    ) -> StorageResult<()> {
        let mut staged = self.graph.clone();
        staged
            .task_mut(task_id)
            .ok_or(StorageError::TaskNotFound(task_id))?
            .text = text.into();
        self.commit_staged(staged, vec![StoreEvent::TasksUpdated(vec![task_id])])?;
        self.supersede_edit(EditTarget::TaskText(task_id));
        Ok(())
    }

    /// Supersedes a pending debounced checkbox edit for the task.
    pub fn set_done(&mut self, task_id: TaskId, is_done: bool) -> StorageResult<()> {
        let mut staged = self.graph.clone();
        staged
            .task_mut(task_id)
            .ok_or(StorageError::TaskNotFound(task_id))?
            .is_done = is_done;
        self.commit_staged(staged, vec![StoreEvent::TasksUpdated(vec![task_id])])?;
        self.supersede_edit(EditTarget::TaskDone(task_id));
        Ok(())
    }

    /// Flips the completion flag as the user last saw it. Returns the
    /// committed value.
    ///
    /// A pending debounced checkbox edit counts as the current value and is
    /// superseded by the toggle.
    pub fn toggle_done(&mut self, task_id: TaskId) -> StorageResult<bool> {
        let target = EditTarget::TaskDone(task_id);
        let pending_done = match self.edits.pending(&target) {
            Some(PendingEdit::TaskDone { is_done, .. }) => Some(*is_done),
            _ => None,
        };

        let mut staged = self.graph.clone();
        let task = staged
            .task_mut(task_id)
            .ok_or(StorageError::TaskNotFound(task_id))?;
        if let Some(is_done) = pending_done {
            task.is_done = is_done;
        }
        let is_done = task.toggle();
        self.commit_staged(staged, vec![StoreEvent::TasksUpdated(vec![task_id])])?;
        self.supersede_edit(target);
        Ok(is_done)
    }

    /// Schedules a task text change; newer edits to the same task replace it.
    pub fn edit_task_text(
        &mut self,
        task_id: TaskId,
        text: impl Into<String>,
        now: Instant,
    ) -> StorageResult<()> {
        if self.graph.task(task_id).is_none() {
            return Err(StorageError::TaskNotFound(task_id));
        }
        self.schedule_edit(
            PendingEdit::TaskText {
                task_id,
                text: text.into(),
            },
            now,
        );
        Ok(())
    }

    /// Schedules a checkbox change; newer edits to the same task replace it.
    pub fn edit_task_done(
        &mut self,
        task_id: TaskId,
        is_done: bool,
        now: Instant,
    ) -> StorageResult<()> {
        if self.graph.task(task_id).is_none() {
            return Err(StorageError::TaskNotFound(task_id));
        }
        self.schedule_edit(PendingEdit::TaskDone { task_id, is_done }, now);
        Ok(())
    }

    /// Schedules a title change; newer edits to the same list replace it.
    pub fn edit_title(
        &mut self,
        list_id: TaskListId,
        title: impl Into<String>,
        now: Instant,
    ) -> StorageResult<()> {
        if self.graph.list(list_id).is_none() {
            return Err(StorageError::TaskListNotFound(list_id));
        }
        self.schedule_edit(
            PendingEdit::ListTitle {
                list_id,
                title: title.into(),
            },
            now,
        );
        Ok(())
    }

    pub fn pending_edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Earliest instant at which `flush_due` has work to do.
    pub fn next_edit_due(&self) -> Option<Instant> {
        self.edits.next_due()
    }

    /// Commits every edit whose quiet period ended at or before `now`.
    ///
    /// All due edits go out in one commit. Returns how many were applied;
    /// edits for entities deleted meanwhile are dropped. On failure the
    /// edits are requeued as due at `now`.
    pub fn flush_due(&mut self, now: Instant) -> StorageResult<usize> {
        let due = self.edits.take_due(now);
        self.apply_edits(due, now)
    }

    /// Commits every pending edit regardless of its quiet period.
    pub fn commit(&mut self) -> StorageResult<usize> {
        let pending = self.edits.drain();
        self.apply_edits(pending, Instant::now())
    }

    fn schedule_edit(&mut self, edit: PendingEdit, now: Instant) {
        let target = edit.target();
        let replaced = self.edits.schedule(target, edit, now);
        debug!(
            "event=edit_schedule module=service status=ok target={:?} replaced={}",
            target, replaced
        );
    }

    fn apply_edits(
        &mut self,
        edits: Vec<(EditTarget, PendingEdit)>,
        requeue_at: Instant,
    ) -> StorageResult<usize> {
        if edits.is_empty() {
            return Ok(0);
        }

        let now_ms = now_epoch_ms();
        let mut staged = self.graph.clone();
        let mut events = Vec::new();
        let mut updated_tasks = Vec::new();
        let mut applied = 0;

        for (_, edit) in &edits {
            let found = match edit {
                PendingEdit::ListTitle { list_id, title } => match staged.list_mut(*list_id) {
                    Some(list) => {
                        list.rename(title.clone(), now_ms);
                        events.push(StoreEvent::TaskListUpdated(*list_id));
                        true
                    }
                    None => false,
                },
                PendingEdit::TaskText { task_id, text } => match staged.task_mut(*task_id) {
                    Some(task) => {
                        task.text = text.clone();
                        true
                    }
                    None => false,
                },
                PendingEdit::TaskDone { task_id, is_done } => match staged.task_mut(*task_id) {
                    Some(task) => {
                        task.is_done = *is_done;
                        true
                    }
                    None => false,
                },
            };

            if !found {
                debug!(
                    "event=edit_flush module=service status=skipped target={:?} reason=entity_deleted",
                    edit.target()
                );
                continue;
            }
            applied += 1;
            if let EditTarget::TaskText(task_id) | EditTarget::TaskDone(task_id) = edit.target() {
                if !updated_tasks.contains(&task_id) {
                    updated_tasks.push(task_id);
                }
            }
        }
        if !updated_tasks.is_empty() {
            events.push(StoreEvent::TasksUpdated(updated_tasks));
        }

        if let Err(err) = self.commit_staged(staged, events) {
            for (target, edit) in edits {
                self.edits.requeue(target, edit, requeue_at);
            }
            return Err(err);
        }

        debug!(
            "event=edit_flush module=service status=ok applied={}",
            applied
        );
        Ok(applied)
    }

    fn supersede_edit(&mut self, target: EditTarget) {
        if self.edits.cancel(&target).is_some() {
            debug!(
                "event=edit_cancel module=service status=ok target={:?} reason=superseded",
                target
            );
        }
    }

    fn cancel_edits_for(&mut self, list_ids: &[TaskListId], task_ids: &HashSet<TaskId>) {
        let canceled = self.edits.cancel_where(|target| match target {
            EditTarget::ListTitle(list_id) => list_ids.contains(list_id),
            EditTarget::TaskText(task_id) | EditTarget::TaskDone(task_id) => {
                task_ids.contains(task_id)
            }
        });
        if canceled > 0 {
            debug!(
                "event=edit_cancel module=service status=ok canceled={}",
                canceled
            );
        }
    }

    /// Commits the difference between the live graph and `staged`, then
    /// swaps it in and publishes `events`. No-op when nothing changed.
    fn commit_staged(
        &mut self,
        staged: EntityGraph,
        events: Vec<StoreEvent>,
    ) -> StorageResult<()> {
        let changes = self.graph.diff(&staged);
        if changes.is_empty() {
            return Ok(());
        }

        if let Err(err) = self.provider.commit(&changes) {
            warn!(
                "event=store_commit module=service status=error writes={} error={}",
                changes.len(),
                err
            );
            return Err(err.into());
        }

        self.graph = staged;
        for event in &events {
            self.observers.notify(event);
        }
        Ok(())
    }
}

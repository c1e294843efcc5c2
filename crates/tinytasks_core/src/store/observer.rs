//! Change notification for presentation layers.
//!
//! # Responsibility
//! - Keep a registry of subscriber callbacks.
//! - Deliver store events in subscription order.
//!
//! # Invariants
//! - Events are only delivered for changes that were committed.
//! - Subscription ids are never reused within one registry.

use crate::model::task::TaskId;
use crate::model::task_list::TaskListId;
use std::fmt::{Debug, Formatter};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Committed change to the entity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    TaskListAdded(TaskListId),
    TaskListsDeleted(Vec<TaskListId>),
    /// Sibling list order changed by a move.
    TaskListsMoved,
    TaskListUpdated(TaskListId),
    TaskAdded {
        list_id: TaskListId,
        task_id: TaskId,
    },
    TasksDeleted {
        list_ids: Vec<TaskListId>,
        task_ids: Vec<TaskId>,
    },
    TasksMoved(TaskListId),
    TasksUpdated(Vec<TaskId>),
}

type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Ordered set of subscriber callbacks.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes a subscriber. Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(current, _)| *current != id);
        self.observers.len() != before
    }

    pub fn notify(&mut self, event: &StoreEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Debug for ObserverRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("next_id", &self.next_id)
            .field("observers", &self.observers.len())
            .finish()
    }
}

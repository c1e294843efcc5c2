//! Persistence provider contract.
//!
//! # Responsibility
//! - Describe what the storage facade needs from durable storage: loading
//!   the entity graph and committing a batch of changes.
//!
//! # Invariants
//! - `commit` is all-or-nothing for one `ChangeSet`.
//! - Deleting a list deletes its tasks, whether or not the task ids are
//!   also listed in `deleted_tasks`.

use crate::db::DbError;
use crate::model::task::{Task, TaskId};
use crate::model::task_list::{TaskList, TaskListId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Failure to load or durably commit task data.
#[derive(Debug)]
pub enum PersistenceError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Provider refused the write (storage unavailable, read-only, ...).
    Rejected(String),
    /// Persisted data cannot be converted to a valid entity.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Rejected(reason) => write!(f, "commit rejected: {reason}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "task store requires table `{table}`")
            }
        }
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PersistenceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Full persisted state, as returned by [`PersistenceProvider::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Lists in display order.
    pub lists: Vec<TaskList>,
    /// Tasks of all lists, each list's tasks in order.
    pub tasks: Vec<Task>,
}

/// Batch of entity changes committed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub upserted_lists: Vec<TaskList>,
    pub upserted_tasks: Vec<Task>,
    pub deleted_lists: Vec<TaskListId>,
    pub deleted_tasks: Vec<TaskId>,
}

impl ChangeSet {
    /// Returns whether committing this set would change anything.
    pub fn is_empty(&self) -> bool {
        self.upserted_lists.is_empty()
            && self.upserted_tasks.is_empty()
            && self.deleted_lists.is_empty()
            && self.deleted_tasks.is_empty()
    }

    /// Total number of entity writes in this set.
    pub fn len(&self) -> usize {
        self.upserted_lists.len()
            + self.upserted_tasks.len()
            + self.deleted_lists.len()
            + self.deleted_tasks.len()
    }
}

/// Durable storage used by the storage facade.
pub trait PersistenceProvider {
    /// Loads every list and task.
    fn load(&self) -> PersistenceResult<Snapshot>;
    /// Durably applies one batch of changes.
    fn commit(&mut self, changes: &ChangeSet) -> PersistenceResult<()>;
}

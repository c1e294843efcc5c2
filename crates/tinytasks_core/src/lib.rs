//! Core domain logic for TinyTasks.
//! This crate is the single source of truth for list/task invariants.

pub mod config;
pub mod db;
pub mod debounce;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use debounce::Debouncer;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{Task, TaskId};
pub use model::task_list::{TaskList, TaskListId, DEFAULT_LIST_TITLE, UNTITLED_LIST_LABEL};
pub use ordering::{
    is_contiguous, move_offsets, next_order, reindex_after_removal, reorder, OrderError, Ordered,
};
pub use repo::memory_provider::MemoryProvider;
pub use repo::provider::{
    ChangeSet, PersistenceError, PersistenceProvider, PersistenceResult, Snapshot,
};
pub use repo::sqlite_provider::SqliteProvider;
pub use service::task_storage::{
    EditTarget, PendingEdit, StorageError, StorageResult, TaskStorage,
};
pub use store::observer::{StoreEvent, SubscriptionId};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Task list domain model.
//!
//! # Responsibility
//! - Define the canonical entities used by core business logic.
//! - Keep list ↔ task ownership explicit: tasks reference their list by id.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - `order` values are contiguous from 0 within each sibling collection
//!   once a mutating operation completes.

pub mod task;
pub mod task_list;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns current wall-clock time as Unix epoch milliseconds.
///
/// Falls back to `0` when the system clock is before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

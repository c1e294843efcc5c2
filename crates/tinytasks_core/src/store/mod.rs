//! In-memory entity store.
//!
//! # Responsibility
//! - Hold the live list/task graph the facade mutates.
//! - Notify subscribers after committed changes.
//!
//! # Invariants
//! - Each list exclusively owns its ordered task vector.
//! - Tasks hold only the id of their list.

pub mod graph;
pub mod observer;

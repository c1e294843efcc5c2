//! Persistence provider contracts and implementations.
//!
//! # Responsibility
//! - Define the durable-commit boundary the storage facade depends on.
//! - Isolate SQLite query details from facade orchestration.
//!
//! # Invariants
//! - A commit applies a whole `ChangeSet` or nothing.
//! - Providers return semantic errors instead of panicking.

pub mod memory_provider;
pub mod provider;
pub mod sqlite_provider;

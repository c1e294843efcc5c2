//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate entity graph mutations, ordering and provider commits.
//! - Keep presentation layers decoupled from storage details.

pub mod task_storage;

//! Versioned repository domain model.
//!
//! # Responsibility
//! - Define the record handed back by every repository command.
//! - Own the field rules shared by create and mutate paths.
//!
//! # Invariants
//! - Every repository is identified by a storage-assigned `RepositoryId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod repository;

//! Repository persistence contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the data access contract used by repository commands.
//! - Isolate SQLite query details from command/business logic.
//!
//! # Invariants
//! - Writes validate records before persistence.
//! - Store APIs return semantic errors (`NotFound`, `NameTaken`,
//!   `StaleVersion`) in addition to DB transport errors.

pub mod repository_repo;

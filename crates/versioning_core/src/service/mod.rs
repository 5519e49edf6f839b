//! Core use-case services.
//!
//! # Responsibility
//! - Own session lifecycles: begin, run commands, commit or roll back.
//! - Expose repository use-cases to CLI and embedding callers.

pub mod executor;
pub mod repository_service;

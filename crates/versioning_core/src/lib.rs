//! Transactional command core for repository versioning.
//!
//! Repository mutations are packaged as [`RepositoryCommand`]s that run
//! against a caller-owned [`Session`]; the [`CommandExecutor`] owns the
//! transaction boundary and decides commit, rollback, or retry.

pub mod command;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use command::repository_commands::{
    CreateRepository, DeleteRepository, GetRepository, RenameRepository, UpdateRepositoryDetails,
};
pub use command::{
    CommandChain, CommandError, CommandResult, ErrorKind, FnCommand, RepositoryCommand, Session,
    SessionBehavior,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::repository::{
    NewRepository, RepositoryId, RepositoryRecord, RepositoryRef, RepositoryValidationError,
    RepositoryVisibility,
};
pub use repo::repository_repo::{
    RepositoryListQuery, RepositoryStore, SqliteRepositoryStore, StoreError, StoreResult,
};
pub use service::executor::{CommandExecutor, ExecutorConfig};
pub use service::repository_service::RepositoryService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Transactional repository commands.
//!
//! # Responsibility
//! - Define the single-method contract every unit of repository work honors.
//! - Compose heterogeneous commands into ordered chains over one session.
//!
//! # Invariants
//! - A command never begins, commits, or rolls back a transaction; the
//!   caller that owns the [`Session`] decides the outcome.
//! - `apply` yields exactly one complete record or one typed error.
//! - Writes made by a command are visible to later commands on the same
//!   session and durable only after the owner commits.

pub mod chain;
pub mod error;
pub mod repository_commands;
pub mod session;

pub use chain::{CommandChain, FnCommand};
pub use error::{CommandError, CommandResult, ErrorKind};
pub use session::{Session, SessionBehavior};

use crate::model::repository::RepositoryRecord;

/// One unit of repository work run against a caller-owned session.
///
/// Implementors hold only their captured parameters. Retry, backoff, and
/// lock policy belong to whoever executes the command.
pub trait RepositoryCommand {
    /// Runs the command logic inside `session`.
    ///
    /// # Errors
    /// - `NotFound` when a referenced repository is not visible in the session.
    /// - `NameConflict` / `StaleVersion` when the mutation collides with state.
    /// - `Validation` when captured parameters break field rules.
    /// - `Store` when the session or storage itself fails.
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord>;

    /// Short label used in log lines.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

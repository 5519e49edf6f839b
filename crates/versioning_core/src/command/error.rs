//! Domain errors reported by repository commands.
//!
//! # Invariants
//! - Every failure maps to exactly one `ErrorKind`.
//! - Storage-level uniqueness and version mismatches are reported as
//!   conflicts, not as infrastructure failures.

use crate::db::DbError;
use crate::model::repository::{RepositoryId, RepositoryRef, RepositoryValidationError};
use crate::repo::repository_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CommandResult<T> = Result<T, CommandError>;

/// Coarse failure class used by executors to pick retry, rollback, or surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Infrastructure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Infrastructure => "infrastructure",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one repository command.
#[derive(Debug)]
pub enum CommandError {
    /// Referenced repository is absent from the session's visible state.
    NotFound(RepositoryRef),
    /// Target name is held by another active repository in the workspace.
    NameConflict { workspace: String, name: String },
    /// Repository changed since the caller read it.
    StaleVersion {
        id: RepositoryId,
        expected: u64,
        actual: u64,
    },
    /// Captured parameters violate repository field rules.
    Validation(RepositoryValidationError),
    /// A command chain was applied with no commands in it.
    EmptyChain,
    /// Session or storage failure.
    Store(StoreError),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::NameConflict { .. } | Self::StaleVersion { .. } => ErrorKind::Conflict,
            Self::Validation(_) | Self::EmptyChain => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns whether replaying the whole session may succeed.
    ///
    /// Only lock waits that timed out qualify; every other failure would
    /// repeat deterministically against the same state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_busy())
    }
}

impl Display for CommandError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "repository not found: {target}"),
            Self::NameConflict { workspace, name } => {
                write!(f, "repository name already in use: {workspace}/{name}")
            }
            Self::StaleVersion {
                id,
                expected,
                actual,
            } => write!(
                f,
                "stale repository version: id={id} expected={expected} actual={actual}"
            ),
            Self::Validation(err) => write!(f, "invalid repository input: {err}"),
            Self::EmptyChain => write!(f, "command chain has no commands"),
            Self::Store(err) => write!(f, "repository storage failure: {err}"),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for CommandError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(target) => Self::NotFound(target),
            StoreError::NameTaken { workspace, name } => Self::NameConflict { workspace, name },
            StoreError::StaleVersion {
                id,
                expected,
                actual,
            } => Self::StaleVersion {
                id,
                expected,
                actual,
            },
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl From<DbError> for CommandError {
    fn from(value: DbError) -> Self {
        Self::Store(StoreError::Db(value))
    }
}

impl From<RepositoryValidationError> for CommandError {
    fn from(value: RepositoryValidationError) -> Self {
        Self::Validation(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandError, ErrorKind};
    use crate::model::repository::{RepositoryRef, RepositoryValidationError};
    use crate::repo::repository_repo::StoreError;

    #[test]
    fn store_errors_keep_their_domain_meaning() {
        let not_found: CommandError = StoreError::NotFound(RepositoryRef::Id(7)).into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let taken: CommandError = StoreError::NameTaken {
            workspace: "ws".to_string(),
            name: "r1".to_string(),
        }
        .into();
        assert!(matches!(taken, CommandError::NameConflict { .. }));
        assert_eq!(taken.kind(), ErrorKind::Conflict);

        let invalid: CommandError =
            StoreError::Validation(RepositoryValidationError::EmptyName).into();
        assert_eq!(invalid.kind(), ErrorKind::Validation);

        let corrupt: CommandError = StoreError::InvalidData("bad row".to_string()).into();
        assert_eq!(corrupt.kind(), ErrorKind::Infrastructure);
        assert!(!corrupt.is_retryable());
    }

    #[test]
    fn busy_sqlite_failures_are_retryable() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err: CommandError = StoreError::from(busy).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.is_retryable());
    }

    #[test]
    fn display_names_the_kind_of_failure() {
        let err = CommandError::StaleVersion {
            id: 3,
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "stale repository version: id=3 expected=1 actual=2"
        );
        assert_eq!(ErrorKind::Conflict.to_string(), "conflict");
    }
}

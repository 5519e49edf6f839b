//! Repository lifecycle commands.
//!
//! # Responsibility
//! - Package fetch/create/rename/update/delete as transactional commands.
//! - Apply optimistic-concurrency checks when callers pin a version.
//!
//! # Invariants
//! - Commands hold captured parameters only.
//! - A mutation that changes nothing returns the current record without a write.

use super::{CommandError, CommandResult, RepositoryCommand, Session};
use crate::model::repository::{
    normalize_name, validate_description, NewRepository, RepositoryRecord, RepositoryRef,
    RepositoryVisibility,
};
use crate::repo::repository_repo::RepositoryStore;

/// Loads one active repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRepository {
    pub target: RepositoryRef,
}

impl GetRepository {
    pub fn new(target: impl Into<RepositoryRef>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn by_name(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(RepositoryRef::by_name(workspace, name))
    }
}

impl RepositoryCommand for GetRepository {
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        Ok(session.repositories()?.resolve(&self.target)?)
    }

    fn name(&self) -> &'static str {
        "get_repository"
    }
}

/// Creates one repository at version 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepository {
    pub repository: NewRepository,
}

impl CreateRepository {
    pub fn new(repository: NewRepository) -> Self {
        Self { repository }
    }
}

impl RepositoryCommand for CreateRepository {
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        self.repository.validate()?;
        Ok(session.repositories()?.insert(&self.repository)?)
    }

    fn name(&self) -> &'static str {
        "create_repository"
    }
}

/// Renames one repository inside its workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRepository {
    pub target: RepositoryRef,
    pub new_name: String,
    pub expected_version: Option<u64>,
}

impl RenameRepository {
    pub fn new(target: impl Into<RepositoryRef>, new_name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            new_name: new_name.into(),
            expected_version: None,
        }
    }

    /// Fails with `StaleVersion` unless storage is still at `version`.
    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

impl RepositoryCommand for RenameRepository {
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        let new_name = normalize_name(&self.new_name)?;
        let store = session.repositories()?;
        let current = store.resolve(&self.target)?;
        ensure_version(&current, self.expected_version)?;

        if current.name == new_name {
            return Ok(current);
        }

        let next = RepositoryRecord {
            name: new_name,
            ..current.clone()
        };
        Ok(store.update(&next, current.version_number)?)
    }

    fn name(&self) -> &'static str {
        "rename_repository"
    }
}

/// Changes description and/or visibility of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRepositoryDetails {
    pub target: RepositoryRef,
    pub description: Option<String>,
    pub visibility: Option<RepositoryVisibility>,
    pub expected_version: Option<u64>,
}

impl UpdateRepositoryDetails {
    pub fn new(target: impl Into<RepositoryRef>) -> Self {
        Self {
            target: target.into(),
            description: None,
            visibility: None,
            expected_version: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn visibility(mut self, visibility: RepositoryVisibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

impl RepositoryCommand for UpdateRepositoryDetails {
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        if let Some(description) = self.description.as_deref() {
            validate_description(description)?;
        }

        let store = session.repositories()?;
        let current = store.resolve(&self.target)?;
        ensure_version(&current, self.expected_version)?;

        let next = RepositoryRecord {
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            visibility: self.visibility.unwrap_or(current.visibility),
            ..current.clone()
        };
        if next == current {
            return Ok(current);
        }
        Ok(store.update(&next, current.version_number)?)
    }

    fn name(&self) -> &'static str {
        "update_repository_details"
    }
}

/// Soft-deletes one repository and returns its tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRepository {
    pub target: RepositoryRef,
    pub expected_version: Option<u64>,
}

impl DeleteRepository {
    pub fn new(target: impl Into<RepositoryRef>) -> Self {
        Self {
            target: target.into(),
            expected_version: None,
        }
    }

    pub fn expecting_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

impl RepositoryCommand for DeleteRepository {
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        let store = session.repositories()?;
        let current = store.resolve(&self.target)?;
        ensure_version(&current, self.expected_version)?;
        Ok(store.soft_delete(current.id, current.version_number)?)
    }

    fn name(&self) -> &'static str {
        "delete_repository"
    }
}

fn ensure_version(current: &RepositoryRecord, expected: Option<u64>) -> CommandResult<()> {
    match expected {
        Some(expected) if expected != current.version_number => Err(CommandError::StaleVersion {
            id: current.id,
            expected,
            actual: current.version_number,
        }),
        _ => Ok(()),
    }
}

//! Repository use-case service.
//!
//! # Responsibility
//! - Provide stable repository entry points for CLI and embedding callers.
//! - Run each use-case as one command in its own committed session.
//!
//! # Invariants
//! - Service APIs never bypass command validation or executor boundaries.
//! - Errors are returned unchanged from the command layer.

use crate::command::repository_commands::{
    CreateRepository, DeleteRepository, GetRepository, RenameRepository, UpdateRepositoryDetails,
};
use crate::command::{CommandResult, RepositoryCommand};
use crate::model::repository::{
    NewRepository, RepositoryRecord, RepositoryRef, RepositoryVisibility,
};
use crate::repo::repository_repo::{RepositoryListQuery, RepositoryStore};
use crate::service::executor::CommandExecutor;

/// Use-case facade over a [`CommandExecutor`].
pub struct RepositoryService {
    executor: CommandExecutor,
}

impl RepositoryService {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor }
    }

    /// Creates one repository.
    pub fn create(&mut self, repository: NewRepository) -> CommandResult<RepositoryRecord> {
        self.executor.execute(&CreateRepository::new(repository))
    }

    /// Loads one active repository.
    pub fn get(&mut self, target: impl Into<RepositoryRef>) -> CommandResult<RepositoryRecord> {
        self.executor.execute(&GetRepository::new(target))
    }

    /// Renames one repository, optionally pinned to a known version.
    pub fn rename(
        &mut self,
        target: impl Into<RepositoryRef>,
        new_name: impl Into<String>,
        expected_version: Option<u64>,
    ) -> CommandResult<RepositoryRecord> {
        let mut command = RenameRepository::new(target, new_name);
        command.expected_version = expected_version;
        self.executor.execute(&command)
    }

    /// Updates description and/or visibility.
    pub fn update_details(
        &mut self,
        target: impl Into<RepositoryRef>,
        description: Option<String>,
        visibility: Option<RepositoryVisibility>,
        expected_version: Option<u64>,
    ) -> CommandResult<RepositoryRecord> {
        let command = UpdateRepositoryDetails {
            target: target.into(),
            description,
            visibility,
            expected_version,
        };
        self.executor.execute(&command)
    }

    /// Soft-deletes one repository and returns its tombstone.
    pub fn delete(
        &mut self,
        target: impl Into<RepositoryRef>,
        expected_version: Option<u64>,
    ) -> CommandResult<RepositoryRecord> {
        let mut command = DeleteRepository::new(target);
        command.expected_version = expected_version;
        self.executor.execute(&command)
    }

    /// Lists repositories using filter and pagination options.
    pub fn list(&mut self, query: &RepositoryListQuery) -> CommandResult<Vec<RepositoryRecord>> {
        self.executor.run_in_session("list_repositories", |session| {
            Ok(session.repositories()?.list(query)?)
        })
    }

    /// Runs caller-assembled commands as one atomic unit.
    pub fn apply_atomically(
        &mut self,
        commands: &[&dyn RepositoryCommand],
    ) -> CommandResult<Vec<RepositoryRecord>> {
        self.executor.execute_all(commands)
    }

    pub fn executor_mut(&mut self) -> &mut CommandExecutor {
        &mut self.executor
    }
}

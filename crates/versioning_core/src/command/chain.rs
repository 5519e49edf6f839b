//! Command composition helpers.

use super::{CommandError, CommandResult, RepositoryCommand, Session};
use crate::model::repository::RepositoryRecord;
use log::debug;

/// Ordered commands applied against one session as a single command.
///
/// Stops at the first failure. The chain never rolls anything back itself;
/// earlier writes stay pending in the session until its owner decides.
#[derive(Default)]
pub struct CommandChain<'a> {
    commands: Vec<Box<dyn RepositoryCommand + 'a>>,
}

impl<'a> CommandChain<'a> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Appends a command and returns the chain for further building.
    pub fn then(mut self, command: impl RepositoryCommand + 'a) -> Self {
        self.push(command);
        self
    }

    pub fn push(&mut self, command: impl RepositoryCommand + 'a) {
        self.commands.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl RepositoryCommand for CommandChain<'_> {
    /// Returns the record produced by the last command.
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        let mut last = None;
        for (step, command) in self.commands.iter().enumerate() {
            let record = command.apply(session)?;
            debug!(
                "event=chain_step module=command status=ok session={} step={} command={}",
                session.id(),
                step,
                command.name()
            );
            last = Some(record);
        }
        last.ok_or(CommandError::EmptyChain)
    }

    fn name(&self) -> &'static str {
        "command_chain"
    }
}

/// Named command backed by a closure.
pub struct FnCommand<F> {
    name: &'static str,
    body: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&Session<'_>) -> CommandResult<RepositoryRecord>,
{
    pub fn new(name: &'static str, body: F) -> Self {
        Self { name, body }
    }
}

impl<F> RepositoryCommand for FnCommand<F>
where
    F: Fn(&Session<'_>) -> CommandResult<RepositoryRecord>,
{
    fn apply(&self, session: &Session<'_>) -> CommandResult<RepositoryRecord> {
        (self.body)(session)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

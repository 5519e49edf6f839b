//! Session executor for repository commands.
//!
//! # Responsibility
//! - Open one session per execution, run commands, then commit or roll back.
//! - Apply the retry policy for lock-wait failures.
//! - Emit `command_execute` diagnostics with duration and outcome.
//!
//! # Invariants
//! - Success is reported only after commit succeeded.
//! - Any command failure rolls back every write of the session.
//! - A retry replays the whole session from a fresh transaction.

use crate::command::{CommandError, CommandResult, RepositoryCommand, Session, SessionBehavior};
use crate::db::{open_db_in_memory, open_db_with_timeout, DbResult, DEFAULT_BUSY_TIMEOUT};
use crate::model::repository::RepositoryRecord;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Executor-level session policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Lock mode each session begins with.
    pub behavior: SessionBehavior,
    /// How long a session waits for a contended lock.
    pub busy_timeout: Duration,
    /// Total tries per execution, including the first. `0` is treated as `1`.
    pub max_attempts: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            behavior: SessionBehavior::Immediate,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_attempts: 1,
        }
    }
}

/// Runs repository commands inside sessions it owns.
///
/// One executor owns one connection, so sessions from the same executor
/// never overlap. Concurrent work uses one executor per worker.
pub struct CommandExecutor {
    conn: Connection,
    config: ExecutorConfig,
}

impl CommandExecutor {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection, config: ExecutorConfig) -> DbResult<Self> {
        conn.busy_timeout(config.busy_timeout)?;
        Ok(Self { conn, config })
    }

    /// Opens a database file and applies pending migrations.
    pub fn open(path: impl AsRef<Path>, config: ExecutorConfig) -> DbResult<Self> {
        let conn = open_db_with_timeout(path, config.busy_timeout)?;
        Ok(Self { conn, config })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(config: ExecutorConfig) -> DbResult<Self> {
        Self::new(open_db_in_memory()?, config)
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Read access outside any session, mostly for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Begins a session the caller finishes explicitly.
    ///
    /// No retry applies; the caller owns commit/rollback.
    pub fn begin_session(&mut self) -> CommandResult<Session<'_>> {
        Ok(Session::begin(&mut self.conn, self.config.behavior)?)
    }

    /// Runs one command in its own session.
    pub fn execute<C>(&mut self, command: &C) -> CommandResult<RepositoryRecord>
    where
        C: RepositoryCommand + ?Sized,
    {
        self.run_in_session(command.name(), |session| command.apply(session))
    }

    /// Runs `commands` in order inside one session.
    ///
    /// Either every command's record is returned and all writes are
    /// committed, or the first error is returned and nothing is written.
    /// An empty batch fails with [`CommandError::EmptyChain`] without
    /// opening a session, matching an empty `CommandChain`.
    pub fn execute_all(
        &mut self,
        commands: &[&dyn RepositoryCommand],
    ) -> CommandResult<Vec<RepositoryRecord>> {
        if commands.is_empty() {
            return Err(CommandError::EmptyChain);
        }
        self.run_in_session("command_batch", |session| {
            commands
                .iter()
                .map(|command| command.apply(session))
                .collect()
        })
    }

    /// Runs arbitrary work in a session with commit/rollback and retry policy.
    pub fn run_in_session<T>(
        &mut self,
        label: &str,
        work: impl Fn(&Session<'_>) -> CommandResult<T>,
    ) -> CommandResult<T> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let started_at = Instant::now();
            match run_once(&mut self.conn, self.config.behavior, &work) {
                Ok(value) => {
                    info!(
                        "event=command_execute module=executor status=ok command={} attempt={} duration_ms={}",
                        label,
                        attempt,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "event=command_execute module=executor status=retry command={} attempt={} duration_ms={} error_kind={} error={}",
                        label,
                        attempt,
                        started_at.elapsed().as_millis(),
                        err.kind(),
                        err
                    );
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        "event=command_execute module=executor status=error command={} attempt={} duration_ms={} error_kind={} error={}",
                        label,
                        attempt,
                        started_at.elapsed().as_millis(),
                        err.kind(),
                        err
                    );
                    return Err(err);
                }
            }
        }
    }
}

fn run_once<T>(
    conn: &mut Connection,
    behavior: SessionBehavior,
    work: &impl Fn(&Session<'_>) -> CommandResult<T>,
) -> CommandResult<T> {
    let session = Session::begin(conn, behavior)?;
    match work(&session) {
        Ok(value) => {
            session.commit()?;
            Ok(value)
        }
        Err(err) => {
            let session_id = session.id();
            if let Err(rollback_err) = session.rollback() {
                // The command error is the one callers act on.
                error!(
                    "event=session_rollback module=executor status=error session={} error={}",
                    session_id, rollback_err
                );
            }
            Err(err)
        }
    }
}

//! Persistence session handed to repository commands.
//!
//! # Responsibility
//! - Wrap one open SQLite transaction as the unit a command runs against.
//! - Keep commit/rollback with the owner of the session, never the command.
//!
//! # Invariants
//! - Commands only ever see `&Session`; `commit`/`rollback` consume the
//!   session by value, so a command cannot end the transaction.
//! - A session that is dropped without commit rolls back.

use crate::db::DbResult;
use crate::repo::repository_repo::{SqliteRepositoryStore, StoreResult};
use log::debug;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Lock acquisition mode used when a session begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionBehavior {
    /// Locks are taken lazily on first read/write.
    Deferred,
    /// Write lock is taken at begin; concurrent writers wait or fail busy.
    #[default]
    Immediate,
    /// Exclusive lock at begin.
    Exclusive,
}

impl SessionBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Immediate => "immediate",
            Self::Exclusive => "exclusive",
        }
    }

    /// Parses a configuration label.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deferred" => Some(Self::Deferred),
            "immediate" => Some(Self::Immediate),
            "exclusive" => Some(Self::Exclusive),
            _ => None,
        }
    }

    fn to_sqlite(self) -> TransactionBehavior {
        match self {
            Self::Deferred => TransactionBehavior::Deferred,
            Self::Immediate => TransactionBehavior::Immediate,
            Self::Exclusive => TransactionBehavior::Exclusive,
        }
    }
}

/// One open transaction bound to one logical unit of work.
pub struct Session<'conn> {
    tx: Transaction<'conn>,
    id: Uuid,
}

impl<'conn> Session<'conn> {
    /// Begins a transaction on `conn`.
    ///
    /// The mutable borrow keeps any other session off this connection until
    /// this one is committed, rolled back, or dropped.
    pub fn begin(conn: &'conn mut Connection, behavior: SessionBehavior) -> DbResult<Self> {
        let tx = conn.transaction_with_behavior(behavior.to_sqlite())?;
        let id = Uuid::new_v4();
        debug!(
            "event=session_begin module=session status=ok session={id} behavior={}",
            behavior.as_str()
        );
        Ok(Self { tx, id })
    }

    /// Correlation id used in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Raw connection scoped to this transaction.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Repository store bound to this transaction.
    pub fn repositories(&self) -> StoreResult<SqliteRepositoryStore<'_>> {
        SqliteRepositoryStore::try_new(&self.tx)
    }

    /// Makes every write of this session durable.
    pub fn commit(self) -> DbResult<()> {
        let id = self.id;
        self.tx.commit()?;
        debug!("event=session_commit module=session status=ok session={id}");
        Ok(())
    }

    /// Discards every write of this session.
    pub fn rollback(self) -> DbResult<()> {
        let id = self.id;
        self.tx.rollback()?;
        debug!("event=session_rollback module=session status=ok session={id}");
        Ok(())
    }
}

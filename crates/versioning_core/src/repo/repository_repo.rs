//! Repository store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over canonical `repositories` storage.
//! - Enforce optimistic concurrency through `version_number` compare-and-swap.
//!
//! # Invariants
//! - Write paths validate before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Name uniqueness violations surface as `NameTaken`, never as success.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::repository::{
    NewRepository, RepositoryId, RepositoryRecord, RepositoryRef, RepositoryValidationError,
    RepositoryVisibility,
};
use rusqlite::types::Value;
use rusqlite::{ffi, params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REPOSITORY_SELECT_SQL: &str = "SELECT
    id,
    workspace,
    name,
    owner,
    description,
    visibility,
    version_number,
    is_deleted,
    date_created,
    date_updated
FROM repositories";

const REQUIRED_COLUMNS: [&str; 10] = [
    "id",
    "workspace",
    "name",
    "owner",
    "description",
    "visibility",
    "version_number",
    "is_deleted",
    "date_created",
    "date_updated",
];

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from repository persistence operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Record failed field rules before reaching storage.
    Validation(RepositoryValidationError),
    /// No active repository matches the reference.
    NotFound(RepositoryRef),
    /// Another active repository in the workspace already uses the name.
    NameTaken { workspace: String, name: String },
    /// Caller's expected version no longer matches storage.
    StaleVersion {
        id: RepositoryId,
        expected: u64,
        actual: u64,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl StoreError {
    /// Returns whether the failure was a lock wait that timed out.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_busy())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(target) => write!(f, "repository not found: {target}"),
            Self::NameTaken { workspace, name } => {
                write!(f, "repository name already in use: {workspace}/{name}")
            }
            Self::StaleVersion {
                id,
                expected,
                actual,
            } => write!(
                f,
                "repository id={id} is at version {actual}, expected {expected}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted repository data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepositoryValidationError> for StoreError {
    fn from(value: RepositoryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Query options for listing repositories.
#[derive(Debug, Clone, Default)]
pub struct RepositoryListQuery {
    pub workspace: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface used by commands.
pub trait RepositoryStore {
    /// Inserts one repository at version 1 and returns the stored record.
    fn insert(&self, repository: &NewRepository) -> StoreResult<RepositoryRecord>;
    /// Loads one repository by id.
    fn get(&self, id: RepositoryId, include_deleted: bool)
        -> StoreResult<Option<RepositoryRecord>>;
    /// Loads one active repository by workspace-scoped name.
    fn find_by_name(&self, workspace: &str, name: &str) -> StoreResult<Option<RepositoryRecord>>;
    /// Lists repositories using filter and pagination options.
    fn list(&self, query: &RepositoryListQuery) -> StoreResult<Vec<RepositoryRecord>>;
    /// Writes mutable fields of `record` if storage is still at `expected_version`.
    ///
    /// Returns the stored record with `version_number = expected_version + 1`.
    fn update(
        &self,
        record: &RepositoryRecord,
        expected_version: u64,
    ) -> StoreResult<RepositoryRecord>;
    /// Tombstones one active repository if storage is still at `expected_version`.
    fn soft_delete(&self, id: RepositoryId, expected_version: u64)
        -> StoreResult<RepositoryRecord>;

    /// Resolves a reference to one active repository.
    fn resolve(&self, target: &RepositoryRef) -> StoreResult<RepositoryRecord> {
        let found = match target {
            RepositoryRef::Id(id) => self.get(*id, false)?,
            RepositoryRef::Name { workspace, name } => self.find_by_name(workspace, name)?,
        };
        found.ok_or_else(|| StoreError::NotFound(target.clone()))
    }
}

/// SQLite-backed repository store.
///
/// Borrows a connection (usually a session's open transaction); every write
/// stays inside whatever transaction that connection currently has open.
pub struct SqliteRepositoryStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositoryStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_repository_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RepositoryStore for SqliteRepositoryStore<'_> {
    fn insert(&self, repository: &NewRepository) -> StoreResult<RepositoryRecord> {
        repository.validate()?;

        if self
            .find_by_name(&repository.workspace, &repository.name)?
            .is_some()
        {
            return Err(name_taken(&repository.workspace, &repository.name));
        }

        self.conn
            .execute(
                "INSERT INTO repositories (
                    workspace,
                    name,
                    owner,
                    description,
                    visibility,
                    version_number,
                    is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, 1, 0);",
                params![
                    repository.workspace.as_str(),
                    repository.name.as_str(),
                    repository.owner.as_str(),
                    repository.description.as_str(),
                    repository.visibility.as_str(),
                ],
            )
            .map_err(|err| map_unique_violation(err, &repository.workspace, &repository.name))?;

        load_required(self.conn, self.conn.last_insert_rowid(), false)
    }

    fn get(
        &self,
        id: RepositoryId,
        include_deleted: bool,
    ) -> StoreResult<Option<RepositoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REPOSITORY_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_repository_row(row)?));
        }

        Ok(None)
    }

    fn find_by_name(&self, workspace: &str, name: &str) -> StoreResult<Option<RepositoryRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REPOSITORY_SELECT_SQL}
             WHERE workspace = ?1
               AND name = ?2
               AND is_deleted = 0;"
        ))?;

        let mut rows = stmt.query(params![workspace.trim(), name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_repository_row(row)?));
        }

        Ok(None)
    }

    fn list(&self, query: &RepositoryListQuery) -> StoreResult<Vec<RepositoryRecord>> {
        let mut sql = format!("{REPOSITORY_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(workspace) = query.workspace.as_deref() {
            sql.push_str(" AND workspace = ?");
            bind_values.push(Value::Text(workspace.trim().to_string()));
        }

        sql.push_str(" ORDER BY name ASC, id ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_repository_row(row)?);
        }

        Ok(records)
    }

    fn update(
        &self,
        record: &RepositoryRecord,
        expected_version: u64,
    ) -> StoreResult<RepositoryRecord> {
        record.validate()?;

        if let Some(existing) = self.find_by_name(&record.workspace, &record.name)? {
            if existing.id != record.id {
                return Err(name_taken(&record.workspace, &record.name));
            }
        }

        let changed = self
            .conn
            .execute(
                "UPDATE repositories
                 SET
                    name = ?1,
                    owner = ?2,
                    description = ?3,
                    visibility = ?4,
                    version_number = version_number + 1,
                    date_updated = MAX(date_created, strftime('%s', 'now') * 1000)
                 WHERE id = ?5
                   AND version_number = ?6
                   AND is_deleted = 0;",
                params![
                    record.name.as_str(),
                    record.owner.as_str(),
                    record.description.as_str(),
                    record.visibility.as_str(),
                    record.id,
                    version_to_db(expected_version)?,
                ],
            )
            .map_err(|err| map_unique_violation(err, &record.workspace, &record.name))?;

        if changed == 0 {
            return Err(explain_missed_write(self, record.id, expected_version));
        }

        load_required(self.conn, record.id, false)
    }

    fn soft_delete(
        &self,
        id: RepositoryId,
        expected_version: u64,
    ) -> StoreResult<RepositoryRecord> {
        let changed = self.conn.execute(
            "UPDATE repositories
             SET
                is_deleted = 1,
                version_number = version_number + 1,
                date_updated = MAX(date_created, strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND version_number = ?2
               AND is_deleted = 0;",
            params![id, version_to_db(expected_version)?],
        )?;

        if changed == 0 {
            return Err(explain_missed_write(self, id, expected_version));
        }

        load_required(self.conn, id, true)
    }
}

/// Classifies a compare-and-swap write that matched no row.
fn explain_missed_write(
    store: &SqliteRepositoryStore<'_>,
    id: RepositoryId,
    expected_version: u64,
) -> StoreError {
    match store.get(id, false) {
        Ok(Some(current)) => StoreError::StaleVersion {
            id,
            expected: expected_version,
            actual: current.version_number,
        },
        Ok(None) => StoreError::NotFound(RepositoryRef::Id(id)),
        Err(err) => err,
    }
}

fn load_required(
    conn: &Connection,
    id: RepositoryId,
    include_deleted: bool,
) -> StoreResult<RepositoryRecord> {
    let row = conn
        .query_row(
            &format!(
                "{REPOSITORY_SELECT_SQL}
                 WHERE id = ?1
                   AND (?2 = 1 OR is_deleted = 0);"
            ),
            params![id, bool_to_int(include_deleted)],
            |row| Ok(parse_repository_row(row)),
        )
        .optional()?;

    match row {
        Some(parsed) => parsed,
        None => Err(StoreError::NotFound(RepositoryRef::Id(id))),
    }
}

fn parse_repository_row(row: &Row<'_>) -> StoreResult<RepositoryRecord> {
    let visibility_text: String = row.get("visibility")?;
    let visibility = RepositoryVisibility::parse(&visibility_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid visibility `{visibility_text}` in repositories.visibility"
        ))
    })?;

    let version_raw: i64 = row.get("version_number")?;
    let version_number = u64::try_from(version_raw).map_err(|_| {
        StoreError::InvalidData(format!(
            "invalid version_number `{version_raw}` in repositories.version_number"
        ))
    })?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_deleted value `{other}` in repositories.is_deleted"
            )));
        }
    };

    let record = RepositoryRecord {
        id: row.get("id")?,
        workspace: row.get("workspace")?,
        name: row.get("name")?,
        owner: row.get("owner")?,
        description: row.get("description")?,
        visibility,
        version_number,
        is_deleted,
        date_created: row.get("date_created")?,
        date_updated: row.get("date_updated")?,
    };
    record
        .validate()
        .map_err(|err| StoreError::InvalidData(format!("repository id={}: {err}", record.id)))?;
    Ok(record)
}

fn map_unique_violation(err: rusqlite::Error, workspace: &str, name: &str) -> StoreError {
    let is_unique_violation = err
        .sqlite_error()
        .is_some_and(|code| code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE);
    if is_unique_violation {
        return name_taken(workspace, name);
    }
    err.into()
}

fn name_taken(workspace: &str, name: &str) -> StoreError {
    StoreError::NameTaken {
        workspace: workspace.to_string(),
        name: name.to_string(),
    }
}

fn version_to_db(version: u64) -> StoreResult<i64> {
    i64::try_from(version)
        .map_err(|_| StoreError::InvalidData(format!("version_number {version} exceeds i64")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_repository_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "repositories")? {
        return Err(StoreError::MissingRequiredTable("repositories"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "repositories", column)? {
            return Err(StoreError::MissingRequiredColumn {
                table: "repositories",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

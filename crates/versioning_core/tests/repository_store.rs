use rusqlite::Connection;
use versioning_core::db::migrations::latest_version;
use versioning_core::db::open_db_in_memory;
use versioning_core::{
    CommandError, CommandExecutor, CreateRepository, ErrorKind, ExecutorConfig, NewRepository, RepositoryListQuery, RepositoryRef, RepositoryStore, RepositoryValidationError,
    RepositoryVisibility, SqliteRepositoryStore, StoreError,
};

#[test]
fn insert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();

    let created = store
        .insert(
            &NewRepository::new("ws", "census", "alice")
                .with_description("census dataset")
                .with_visibility(RepositoryVisibility::Public),
        )
        .unwrap();

    assert_eq!(created.version_number, 1);
    assert!(created.is_active());
    assert!(created.date_updated >= created.date_created);

    let loaded = store.get(created.id, false).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.description, "census dataset");
    assert_eq!(loaded.visibility, RepositoryVisibility::Public);
}

#[test]
fn insert_rejects_duplicate_active_name_in_same_workspace() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();

    store.insert(&NewRepository::new("ws", "r1", "alice")).unwrap();
    let err = store
        .insert(&NewRepository::new("ws", "r1", "bob"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NameTaken { ref workspace, ref name } if workspace == "ws" && name == "r1"
    ));

    store
        .insert(&NewRepository::new("other", "r1", "bob"))
        .expect("same name in another workspace is allowed");
}

// Inserts a twin row from inside the INSERT statement, after the name
// pre-check has already passed, so only the unique index can catch it.
const TWIN_INSERT_TRIGGER_SQL: &str = "
CREATE TEMP TRIGGER insert_twin_repository
BEFORE INSERT ON main.repositories
BEGIN
    INSERT INTO repositories (workspace, name, owner)
    VALUES (NEW.workspace, NEW.name, 'racer');
END;";

#[test]
fn unique_index_violation_maps_to_name_taken() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();
    conn.execute_batch(TWIN_INSERT_TRIGGER_SQL).unwrap();

    let err = store
        .insert(&NewRepository::new("ws", "r1", "alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NameTaken { ref workspace, ref name } if workspace == "ws" && name == "r1"
    ));
    assert_eq!(CommandError::from(err).kind(), ErrorKind::Conflict);

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM repositories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn executor_surfaces_index_violation_as_name_conflict() {
    let mut executor = CommandExecutor::open_in_memory(ExecutorConfig::default()).unwrap();
    executor
        .connection()
        .execute_batch(TWIN_INSERT_TRIGGER_SQL)
        .unwrap();

    let err = executor
        .execute(&CreateRepository::new(NewRepository::new("ws", "r1", "alice")))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(
        err,
        CommandError::NameConflict { ref workspace, ref name } if workspace == "ws" && name == "r1"
    ));
    assert!(!err.is_retryable());
}

#[test]
fn insert_validates_before_writing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();

    let err = store
        .insert(&NewRepository::new("ws", "a/b", "alice"))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(RepositoryValidationError::InvalidNameCharacter(_))
    ));
    assert!(store
        .list(&RepositoryListQuery {
            include_deleted: true,
            ..RepositoryListQuery::default()
        })
        .unwrap()
        .is_empty());
}

#[test]
fn update_bumps_version_and_rejects_stale_writers() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();
    let created = store.insert(&NewRepository::new("ws", "r1", "alice")).unwrap();

    let mut renamed = created.clone();
    renamed.name = "r1-renamed".to_string();
    let updated = store.update(&renamed, created.version_number).unwrap();
    assert_eq!(updated.version_number, 2);
    assert_eq!(updated.name, "r1-renamed");

    let mut stale = created.clone();
    stale.description = "late write".to_string();
    let err = store.update(&stale, created.version_number).unwrap_err();
    assert!(matches!(
        err,
        StoreError::StaleVersion {
            expected: 1,
            actual: 2,
            ..
        }
    ));
}

#[test]
fn update_missing_repository_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();
    let created = store.insert(&NewRepository::new("ws", "r1", "alice")).unwrap();
    store.soft_delete(created.id, 1).unwrap();

    let err = store.update(&created, 1).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(RepositoryRef::Id(id)) if id == created.id));
}

#[test]
fn soft_delete_hides_repository_and_frees_its_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();
    let created = store.insert(&NewRepository::new("ws", "r1", "alice")).unwrap();

    let tombstone = store.soft_delete(created.id, 1).unwrap();
    assert!(tombstone.is_deleted);
    assert_eq!(tombstone.version_number, 2);

    assert!(store.get(created.id, false).unwrap().is_none());
    assert!(store.get(created.id, true).unwrap().unwrap().is_deleted);
    assert!(store.find_by_name("ws", "r1").unwrap().is_none());

    let recreated = store.insert(&NewRepository::new("ws", "r1", "bob")).unwrap();
    assert_ne!(recreated.id, created.id);
}

#[test]
fn resolve_reports_missing_reference() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();

    let target = RepositoryRef::by_name("ws", "ghost");
    let err = store.resolve(&target).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(found) if found == target));
}

#[test]
fn list_filters_by_workspace_and_paginates_by_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();
    for name in ["charlie", "alpha", "bravo"] {
        store.insert(&NewRepository::new("ws", name, "alice")).unwrap();
    }
    store.insert(&NewRepository::new("other", "zulu", "bob")).unwrap();

    let page = store
        .list(&RepositoryListQuery {
            workspace: Some("ws".to_string()),
            limit: Some(2),
            offset: 1,
            ..RepositoryListQuery::default()
        })
        .unwrap();
    let names: Vec<&str> = page.iter().map(|record| record.name.as_str()).collect();
    assert_eq!(names, ["bravo", "charlie"]);

    let all = store.list(&RepositoryListQuery::default()).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn store_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteRepositoryStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn store_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE repositories (
            id INTEGER PRIMARY KEY,
            workspace TEXT NOT NULL,
            name TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteRepositoryStore::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "repositories",
            column: "owner"
        })
    ));
}

#[test]
fn invalid_persisted_rows_are_not_masked() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO repositories (workspace, name, owner) VALUES ('ws', '   ', 'alice');",
        [],
    )
    .unwrap();
    let store = SqliteRepositoryStore::try_new(&conn).unwrap();

    let err = store.list(&RepositoryListQuery::default()).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

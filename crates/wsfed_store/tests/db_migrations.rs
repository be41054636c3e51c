use rusqlite::Connection;
use wsfed_store::db::migrations::latest_version;
use wsfed_store::db::{open_db, open_db_in_memory, DbError};
use wsfed_store::{ContextError, SqliteConfigurationContext};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "RelyingParties");
    assert_table_exists(&conn, "RelyingPartyClaimMappings");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wsfed.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "RelyingParties");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn realm_column_is_unique_and_length_limited() {
    let conn = open_db_in_memory().unwrap();

    conn.execute("INSERT INTO RelyingParties (Realm) VALUES ('urn:rp:a');", [])
        .unwrap();
    let duplicate = conn
        .execute("INSERT INTO RelyingParties (Realm) VALUES ('urn:rp:a');", [])
        .unwrap_err();
    assert!(DbError::from(duplicate).is_constraint_violation());

    let too_long = "r".repeat(201);
    let err = conn
        .execute("INSERT INTO RelyingParties (Realm) VALUES (?1);", [too_long])
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());

    let err = conn
        .execute("INSERT INTO RelyingParties (Realm) VALUES (NULL);", [])
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());

    let max_length = "r".repeat(200);
    conn.execute("INSERT INTO RelyingParties (Realm) VALUES (?1);", [max_length])
        .unwrap();
}

#[test]
fn claim_mapping_requires_existing_parent() {
    let conn = open_db_in_memory().unwrap();

    let orphan = conn
        .execute(
            "INSERT INTO RelyingPartyClaimMappings (OriginalClaimType, NewClaimType, RelyingPartyId)
             VALUES ('sub', 'nameid', 999);",
            [],
        )
        .unwrap_err();
    assert!(DbError::from(orphan).is_constraint_violation());

    let without_parent = conn
        .execute(
            "INSERT INTO RelyingPartyClaimMappings (OriginalClaimType, NewClaimType)
             VALUES ('sub', 'nameid');",
            [],
        )
        .unwrap_err();
    assert!(DbError::from(without_parent).is_constraint_violation());
}

#[test]
fn claim_types_are_required_and_length_limited() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO RelyingParties (Realm) VALUES ('urn:rp:a');", [])
        .unwrap();
    let parent_id = conn.last_insert_rowid();

    let too_long = "c".repeat(251);
    let err = conn
        .execute(
            "INSERT INTO RelyingPartyClaimMappings (OriginalClaimType, NewClaimType, RelyingPartyId)
             VALUES (?1, 'nameid', ?2);",
            rusqlite::params![too_long, parent_id],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());

    let err = conn
        .execute(
            "INSERT INTO RelyingPartyClaimMappings (OriginalClaimType, NewClaimType, RelyingPartyId)
             VALUES ('sub', NULL, ?1);",
            [parent_id],
        )
        .unwrap_err();
    assert!(DbError::from(err).is_constraint_violation());
}

#[test]
fn context_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteConfigurationContext::from_connection(conn) {
        Err(ContextError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn context_rejects_connection_without_required_tables() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteConfigurationContext::from_connection(conn);
    assert!(matches!(
        result,
        Err(ContextError::MissingRequiredTable("RelyingParties"))
    ));
}

#[test]
fn context_accepts_migrated_connection() {
    let conn = open_db_in_memory().unwrap();
    SqliteConfigurationContext::from_connection(conn).unwrap();
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

use lazylist_core::db::migrations::latest_version;
use lazylist_core::db::{open_db, open_db_in_memory, DbError};
use lazylist_core::{KeyValueStore, SqliteKvStore, SyncLog, SYNC_LOG_STORAGE_KEY};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "kv_store");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lazylist.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "kv_store");
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
fn sync_log_survives_reopening_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("diagnostics.db");

    let log = SyncLog::load(Box::new(SqliteKvStore::open(&path).unwrap()), 50);
    log.record("t1", "add_or_update_item", true, "attempts=1");
    log.record("t1", "delete_item", false, "persist failed after 4 attempt(s)");
    drop(log);

    let store = SqliteKvStore::open(&path).unwrap();
    assert!(store.get(SYNC_LOG_STORAGE_KEY).unwrap().is_some());
    let reloaded = SyncLog::load(Box::new(store), 50);
    let entries = reloaded.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].operation, "delete_item");
    assert!(!entries[1].success);
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

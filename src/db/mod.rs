pub mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{CacheError, Result};

/// Database connection wrapper for the local store
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at `path`, upgrading the schema if needed
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        CacheError::StorageUnavailable(format!("Failed to create database directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      CacheError::StorageUnavailable(format!(
        "Failed to open database at {}: {}",
        path.display(),
        e
      ))
    })?;

    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;

    Ok(db)
  }

  /// Get the default database path
  pub fn default_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("cache.db"))
  }

  /// Bring the schema up to `SCHEMA_VERSION`. Never drops anything.
  fn run_migrations(&self) -> Result<()> {
    let conn = self.conn()?;

    let stored: i64 = conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .map_err(|e| CacheError::StorageUnavailable(format!("Failed to read schema version: {}", e)))?;

    if stored >= schema::SCHEMA_VERSION {
      debug!(version = stored, "Schema up to date");
      return Ok(());
    }

    conn
      .execute_batch(schema::SCHEMA)
      .map_err(|e| CacheError::StorageUnavailable(format!("Failed to run migrations: {}", e)))?;
    conn
      .pragma_update(None, "user_version", schema::SCHEMA_VERSION)
      .map_err(|e| {
        CacheError::StorageUnavailable(format!("Failed to record schema version: {}", e))
      })?;

    info!(
      from = stored,
      to = schema::SCHEMA_VERSION,
      "Upgraded cache schema"
    );
    Ok(())
  }

  /// Lock the connection for a single statement or transaction
  pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| CacheError::StorageUnavailable(format!("Lock poisoned: {}", e)))
  }

  /// Stored schema version
  #[allow(dead_code)]
  pub fn schema_version(&self) -> Result<i64> {
    let conn = self.conn()?;
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
  }
}

/// Per-user data directory for the database, roster and log files.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| CacheError::StorageUnavailable("Could not determine data directory".into()))?;

  Ok(data_dir.join("dexcache"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn table_exists(db: &Database, name: &str) -> bool {
    let conn = db.conn().unwrap();
    conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |row| row.get::<_, i64>(0),
      )
      .unwrap()
      == 1
  }

  #[test]
  fn test_open_creates_all_collections() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("nested").join("cache.db")).unwrap();

    for table in ["pokemon", "species", "type_cache", "favorites"] {
      assert!(table_exists(&db, table), "missing table {}", table);
    }
    assert_eq!(db.schema_version().unwrap(), schema::SCHEMA_VERSION);
  }

  #[test]
  fn test_reopen_is_idempotent_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let db = Database::open(&path).unwrap();
      db.conn()
        .unwrap()
        .execute(
          "INSERT INTO favorites (id, name, data, cached_at) VALUES (1, 'bulbasaur', x'7b7d', 0)",
          [],
        )
        .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let count: i64 = db
      .conn()
      .unwrap()
      .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))
      .unwrap();
    assert_eq!(count, 1);
  }

  #[test]
  fn test_older_version_gets_missing_tables_without_losing_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
      let conn = Connection::open(&path).unwrap();
      conn
        .execute_batch(
          "CREATE TABLE pokemon (id INTEGER PRIMARY KEY, name TEXT NOT NULL, data BLOB NOT NULL, cached_at INTEGER NOT NULL);
           INSERT INTO pokemon VALUES (25, 'pikachu', x'7b7d', 42);",
        )
        .unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert!(table_exists(&db, "favorites"));
    let name: String = db
      .conn()
      .unwrap()
      .query_row("SELECT name FROM pokemon WHERE id = 25", [], |row| row.get(0))
      .unwrap();
    assert_eq!(name, "pikachu");
  }

  #[test]
  fn test_unopenable_path_is_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let err = Database::open(&blocker.join("cache.db")).err().unwrap();
    assert!(matches!(err, CacheError::StorageUnavailable(_)));
  }
}

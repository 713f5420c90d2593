//! Local store: SQLite-backed collections with lazy, shared initialization.

use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::traits::{CachedEntity, Cacheable, Collection};
use crate::db::Database;
use crate::error::{CacheError, Result};

/// Durable record store with named collections.
///
/// The database is opened on first use. Concurrent first callers all await
/// the same in-flight open, so the schema is only ever created once per
/// process. A failed open leaves the cell empty and the next call retries.
pub struct LocalStore {
  path: PathBuf,
  db: OnceCell<Database>,
}

impl LocalStore {
  /// Create a store backed by the database file at `path`. Nothing is
  /// opened until the first operation.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      db: OnceCell::new(),
    }
  }

  /// Open the database, or return the already-open handle.
  pub async fn init(&self) -> Result<&Database> {
    self
      .db
      .get_or_try_init(|| async {
        debug!(path = %self.path.display(), "Opening local store");
        let path = self.path.clone();
        match tokio::task::spawn_blocking(move || Database::open(&path)).await {
          Ok(opened) => opened,
          Err(e) => Err(CacheError::StorageUnavailable(format!(
            "Open task failed: {}",
            e
          ))),
        }
      })
      .await
  }

  /// Point lookup by primary key.
  pub async fn get<T: Cacheable>(
    &self,
    collection: Collection,
    id: u32,
  ) -> Result<Option<CachedEntity<T>>> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let row: Option<(Vec<u8>, i64)> = conn
      .query_row(
        &format!(
          "SELECT data, cached_at FROM {} WHERE id = ?1",
          collection.table()
        ),
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    row.map(|(data, cached_at)| decode(&data, cached_at)).transpose()
  }

  /// Lookup through the unique name index. Names are compared lowercase.
  pub async fn get_by_name<T: Cacheable>(
    &self,
    collection: Collection,
    name: &str,
  ) -> Result<Option<CachedEntity<T>>> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let row: Option<(Vec<u8>, i64)> = conn
      .query_row(
        &format!(
          "SELECT data, cached_at FROM {} WHERE name = ?1",
          collection.table()
        ),
        params![name.to_lowercase()],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    row.map(|(data, cached_at)| decode(&data, cached_at)).transpose()
  }

  /// Upsert. The row is replaced in a single statement, so readers never
  /// see a partial record.
  pub async fn put<T: Cacheable>(
    &self,
    collection: Collection,
    record: &CachedEntity<T>,
  ) -> Result<()> {
    let data = serde_json::to_vec(&record.entity)?;
    let db = self.init().await?;
    let conn = db.conn()?;

    conn.execute(
      &format!(
        "INSERT OR REPLACE INTO {} (id, name, data, cached_at) VALUES (?1, ?2, ?3, ?4)",
        collection.table()
      ),
      params![
        record.entity.cache_id(),
        record.entity.cache_name().to_lowercase(),
        data,
        record.cached_at
      ],
    )?;

    Ok(())
  }

  /// Every record in the collection, in no particular order.
  pub async fn get_all<T: Cacheable>(&self, collection: Collection) -> Result<Vec<CachedEntity<T>>> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let mut stmt = conn.prepare(&format!(
      "SELECT data, cached_at FROM {}",
      collection.table()
    ))?;

    let rows: Vec<(Vec<u8>, i64)> = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
      .collect::<rusqlite::Result<_>>()?;

    Ok(
      rows
        .into_iter()
        .filter_map(|(data, cached_at)| match decode(&data, cached_at) {
          Ok(entity) => Some(entity),
          Err(e) => {
            warn!(collection = collection.table(), "Skipping undecodable record: {}", e);
            None
          }
        })
        .collect(),
    )
  }

  /// One slot per requested id, in request order. Missing or undecodable
  /// rows yield `None` without failing the batch.
  pub async fn get_batch<T: Cacheable>(
    &self,
    collection: Collection,
    ids: &[u32],
  ) -> Result<Vec<Option<CachedEntity<T>>>> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let mut stmt = conn.prepare_cached(&format!(
      "SELECT data, cached_at FROM {} WHERE id = ?1",
      collection.table()
    ))?;

    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
      let row: Option<(Vec<u8>, i64)> = stmt
        .query_row(params![id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;

      out.push(row.and_then(|(data, cached_at)| match decode(&data, cached_at) {
        Ok(entity) => Some(entity),
        Err(e) => {
          warn!(id, collection = collection.table(), "Undecodable record in batch: {}", e);
          None
        }
      }));
    }

    Ok(out)
  }

  pub async fn delete(&self, collection: Collection, id: u32) -> Result<()> {
    let db = self.init().await?;
    let conn = db.conn()?;

    conn.execute(
      &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
      params![id],
    )?;
    Ok(())
  }

  pub async fn count(&self, collection: Collection) -> Result<u64> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let count: i64 = conn.query_row(
      &format!("SELECT COUNT(*) FROM {}", collection.table()),
      [],
      |row| row.get(0),
    )?;
    Ok(count as u64)
  }

  /// Delete every record cached strictly before `older_than` (ms since
  /// epoch). Walks the `cached_at` index. Returns the number removed.
  pub async fn sweep(&self, collection: Collection, older_than: i64) -> Result<u64> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let removed = conn.execute(
      &format!("DELETE FROM {} WHERE cached_at < ?1", collection.table()),
      params![older_than],
    )?;
    Ok(removed as u64)
  }

  #[allow(dead_code)]
  pub async fn clear(&self, collection: Collection) -> Result<()> {
    let db = self.init().await?;
    let conn = db.conn()?;

    conn.execute(&format!("DELETE FROM {}", collection.table()), [])?;
    Ok(())
  }

  /// Empty every cache collection. Favorites are kept.
  pub async fn clear_all(&self) -> Result<()> {
    let db = self.init().await?;
    let mut conn = db.conn()?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM pokemon", [])?;
    tx.execute("DELETE FROM species", [])?;
    tx.execute("DELETE FROM type_cache", [])?;
    tx.commit()?;
    Ok(())
  }

  /// Read a value from the key-value table.
  pub async fn kv_get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedEntity<V>>> {
    let db = self.init().await?;
    let conn = db.conn()?;

    let row: Option<(Vec<u8>, i64)> = conn
      .query_row(
        "SELECT value, cached_at FROM type_cache WHERE key = ?1",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    row
      .map(|(data, cached_at)| decode_value(&data, cached_at))
      .transpose()
  }

  /// Write a value to the key-value table, replacing any previous one.
  pub async fn kv_put<V: Serialize>(&self, key: &str, value: &V, cached_at: i64) -> Result<()> {
    let data = serde_json::to_vec(value)?;
    let db = self.init().await?;
    let conn = db.conn()?;

    conn.execute(
      "INSERT OR REPLACE INTO type_cache (key, value, cached_at) VALUES (?1, ?2, ?3)",
      params![key, data, cached_at],
    )?;
    Ok(())
  }
}

fn decode<T: Cacheable>(data: &[u8], cached_at: i64) -> Result<CachedEntity<T>> {
  decode_value(data, cached_at)
}

fn decode_value<V: DeserializeOwned>(data: &[u8], cached_at: i64) -> Result<CachedEntity<V>> {
  Ok(CachedEntity::new(serde_json::from_slice(data)?, cached_at))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Mon {
    id: u32,
    name: String,
    types: Vec<String>,
  }

  impl Cacheable for Mon {
    fn cache_id(&self) -> u32 {
      self.id
    }

    fn cache_name(&self) -> &str {
      &self.name
    }
  }

  fn mon(id: u32, name: &str) -> Mon {
    Mon {
      id,
      name: name.to_string(),
      types: vec!["fire".to_string()],
    }
  }

  fn temp_store() -> (tempfile::TempDir, LocalStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("cache.db"));
    (dir, store)
  }

  #[tokio::test]
  async fn test_put_then_get_returns_equal_record() {
    let (_dir, store) = temp_store();
    let record = CachedEntity::new(mon(4, "charmander"), 1_700_000_000_123);

    store.put(Collection::Pokemon, &record).await.unwrap();
    let fetched: Option<CachedEntity<Mon>> = store.get(Collection::Pokemon, 4).await.unwrap();

    assert_eq!(fetched, Some(record));
  }

  #[tokio::test]
  async fn test_get_missing_is_none() {
    let (_dir, store) = temp_store();
    let fetched: Option<CachedEntity<Mon>> = store.get(Collection::Pokemon, 99).await.unwrap();
    assert!(fetched.is_none());
  }

  #[tokio::test]
  async fn test_put_overwrites_existing_record() {
    let (_dir, store) = temp_store();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(1, "bulbasaur"), 1))
      .await
      .unwrap();

    let mut updated = mon(1, "bulbasaur");
    updated.types = vec!["grass".into(), "poison".into()];
    store
      .put(Collection::Pokemon, &CachedEntity::new(updated.clone(), 2))
      .await
      .unwrap();

    let fetched: CachedEntity<Mon> = store.get(Collection::Pokemon, 1).await.unwrap().unwrap();
    assert_eq!(fetched.entity, updated);
    assert_eq!(fetched.cached_at, 2);
    assert_eq!(store.count(Collection::Pokemon).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_get_by_name_is_case_insensitive() {
    let (_dir, store) = temp_store();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(25, "pikachu"), 10))
      .await
      .unwrap();

    let fetched: Option<CachedEntity<Mon>> = store
      .get_by_name(Collection::Pokemon, "PikaChu")
      .await
      .unwrap();
    assert_eq!(fetched.map(|c| c.entity.id), Some(25));

    let missing: Option<CachedEntity<Mon>> = store
      .get_by_name(Collection::Pokemon, "raichu")
      .await
      .unwrap();
    assert!(missing.is_none());
  }

  #[tokio::test]
  async fn test_get_batch_preserves_order_and_gaps() {
    let (_dir, store) = temp_store();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(5, "charmeleon"), 1))
      .await
      .unwrap();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(7, "squirtle"), 1))
      .await
      .unwrap();

    let batch: Vec<Option<CachedEntity<Mon>>> = store
      .get_batch(Collection::Pokemon, &[5, 6, 7])
      .await
      .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0].as_ref().map(|c| c.entity.id), Some(5));
    assert!(batch[1].is_none());
    assert_eq!(batch[2].as_ref().map(|c| c.entity.id), Some(7));
  }

  #[tokio::test]
  async fn test_get_all_and_count_track_puts_and_deletes() {
    let (_dir, store) = temp_store();
    for (id, name) in [(1, "bulbasaur"), (2, "ivysaur"), (3, "venusaur")] {
      store
        .put(Collection::Pokemon, &CachedEntity::new(mon(id, name), 1))
        .await
        .unwrap();
    }
    assert_eq!(store.count(Collection::Pokemon).await.unwrap(), 3);

    store.delete(Collection::Pokemon, 2).await.unwrap();

    let mut ids: Vec<u32> = store
      .get_all::<Mon>(Collection::Pokemon)
      .await
      .unwrap()
      .into_iter()
      .map(|c| c.entity.id)
      .collect();
    ids.sort();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(store.count(Collection::Pokemon).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_sweep_removes_only_older_records_and_skips_favorites() {
    let (_dir, store) = temp_store();
    let cutoff = 1_000;

    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(1, "old"), cutoff - 1))
      .await
      .unwrap();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(2, "edge"), cutoff))
      .await
      .unwrap();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(3, "new"), cutoff + 1))
      .await
      .unwrap();
    store
      .put(Collection::Favorites, &CachedEntity::new(mon(1, "old"), 0))
      .await
      .unwrap();

    let removed = store.sweep(Collection::Pokemon, cutoff).await.unwrap();
    assert_eq!(removed, 1);

    let remaining: Vec<Option<CachedEntity<Mon>>> = store
      .get_batch(Collection::Pokemon, &[1, 2, 3])
      .await
      .unwrap();
    assert!(remaining[0].is_none());
    assert!(remaining[1].is_some());
    assert!(remaining[2].is_some());
    assert_eq!(store.count(Collection::Favorites).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_clear_all_keeps_favorites() {
    let (_dir, store) = temp_store();
    store
      .put(Collection::Pokemon, &CachedEntity::new(mon(1, "bulbasaur"), 1))
      .await
      .unwrap();
    store
      .put(Collection::Species, &CachedEntity::new(mon(1, "bulbasaur"), 1))
      .await
      .unwrap();
    store
      .put(Collection::Favorites, &CachedEntity::new(mon(1, "bulbasaur"), 1))
      .await
      .unwrap();
    store.kv_put("matchup:fire", &vec!["water"], 1).await.unwrap();

    store.clear_all().await.unwrap();

    assert_eq!(store.count(Collection::Pokemon).await.unwrap(), 0);
    assert_eq!(store.count(Collection::Species).await.unwrap(), 0);
    assert_eq!(store.count(Collection::Favorites).await.unwrap(), 1);
    let kv: Option<CachedEntity<Vec<String>>> = store.kv_get("matchup:fire").await.unwrap();
    assert!(kv.is_none());
  }

  #[tokio::test]
  async fn test_clear_empties_a_single_collection() {
    let (_dir, store) = temp_store();
    store
      .put(Collection::Favorites, &CachedEntity::new(mon(1, "bulbasaur"), 1))
      .await
      .unwrap();
    store.clear(Collection::Favorites).await.unwrap();
    assert_eq!(store.count(Collection::Favorites).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_kv_round_trip() {
    let (_dir, store) = temp_store();
    store
      .kv_put("profile:fire", &vec!["water".to_string(), "rock".to_string()], 77)
      .await
      .unwrap();

    let value: CachedEntity<Vec<String>> = store.kv_get("profile:fire").await.unwrap().unwrap();
    assert_eq!(value.entity, vec!["water", "rock"]);
    assert_eq!(value.cached_at, 77);
  }

  #[tokio::test]
  async fn test_concurrent_init_converges_on_one_database() {
    let (_dir, store) = temp_store();

    let handles = futures::future::join_all((0..8).map(|_| store.init())).await;
    let first = handles[0].as_ref().unwrap();
    for handle in &handles {
      assert!(std::ptr::eq(*first, *handle.as_ref().unwrap()));
    }
  }

  #[tokio::test]
  async fn test_unopenable_store_reports_storage_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();
    let store = LocalStore::new(blocker.join("cache.db"));

    let err = store.count(Collection::Pokemon).await.err().unwrap();
    assert!(matches!(err, CacheError::StorageUnavailable(_)));
    let err = store.get::<Mon>(Collection::Pokemon, 1).await.err().unwrap();
    assert!(matches!(err, CacheError::StorageUnavailable(_)));
  }
}

//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::storage::LocalStore;
use super::traits::{CacheResult, CachedEntity, Cacheable, Collection};
use crate::error::Result;

/// Default freshness window for cached records.
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
  Utc::now().timestamp_millis()
}

/// How a cached record is located.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
  Id(u32),
  Name(&'a str),
}

impl std::fmt::Display for Lookup<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Lookup::Id(id) => write!(f, "{}", id),
      Lookup::Name(name) => write!(f, "{}", name),
    }
  }
}

/// Outcome counts for a paced prefetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
  pub requested: usize,
  pub already_cached: usize,
  pub fetched: usize,
  pub failed: usize,
}

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the application and the network client,
/// providing transparent caching with offline support. It never returns an
/// error from a fetch: every failure resolves to stale data or `None`.
pub struct CacheLayer {
  store: Arc<LocalStore>,
  /// How long before cached data is considered stale
  ttl: Duration,
}

impl CacheLayer {
  /// Create a new cache layer over the given store.
  pub fn new(store: Arc<LocalStore>) -> Self {
    Self {
      store,
      ttl: Duration::days(DEFAULT_TTL_DAYS),
    }
  }

  /// Set the freshness window.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn store(&self) -> &LocalStore {
    &self.store
  }

  #[allow(dead_code)]
  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// A record is fresh while `now - cached_at < ttl`. A record exactly
  /// `ttl` old is stale.
  pub fn is_fresh(&self, cached_at: i64, now: i64) -> bool {
    now - cached_at < self.ttl.num_milliseconds()
  }

  /// Cached lookup only. Storage failures count as a miss.
  pub async fn lookup<T: Cacheable>(
    &self,
    collection: Collection,
    key: Lookup<'_>,
  ) -> Option<CachedEntity<T>> {
    let found = match key {
      Lookup::Id(id) => self.store.get(collection, id).await,
      Lookup::Name(name) => self.store.get_by_name(collection, name).await,
    };

    match found {
      Ok(cached) => cached,
      Err(e) => {
        warn!(%key, collection = collection.table(), "Cache read failed, treating as miss: {}", e);
        None
      }
    }
  }

  /// Fetch a single record with cache-first strategy.
  ///
  /// 1. Cached lookup (by id or name)
  /// 2. Fresh hit: return it, no network
  /// 3. Remote fetch: write through and return
  /// 4. Remote failed: return the stale copy if one exists (offline mode)
  /// 5. Otherwise: `None`
  pub async fn fetch_one<T, F, Fut>(
    &self,
    collection: Collection,
    key: Lookup<'_>,
    fetcher: F,
  ) -> Option<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cached = self.lookup(collection, key).await;
    self.resolve(collection, key, cached, fetcher).await
  }

  /// Fetch many records by id, preserving input order.
  ///
  /// One batched cache read covers all ids; only absent or stale ids go to
  /// the network, at most `concurrency` at a time. Each success is written
  /// through on its own, so one failing id never costs the others.
  pub async fn fetch_many<T, F, Fut>(
    &self,
    collection: Collection,
    ids: &[u32],
    concurrency: usize,
    fetcher: F,
  ) -> Vec<Option<CacheResult<T>>>
  where
    T: Cacheable,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cached = self.batch_lookup::<T>(collection, ids).await;
    let fetcher = &fetcher;

    stream::iter(ids.iter().copied().zip(cached))
      .map(|(id, cached)| self.resolve(collection, Lookup::Id(id), cached, move || fetcher(id)))
      .buffered(concurrency.max(1))
      .collect()
      .await
  }

  /// Warm the cache for `ids`, `chunk_size` ids at a time.
  ///
  /// Chunks run sequentially with `delay` between them. Within a chunk only
  /// ids absent from the cache are fetched, concurrently. A failed id is
  /// counted and skipped.
  pub async fn prefetch<T, F, Fut>(
    &self,
    collection: Collection,
    ids: &[u32],
    chunk_size: usize,
    delay: std::time::Duration,
    fetcher: F,
  ) -> PrefetchReport
  where
    T: Cacheable,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let mut report = PrefetchReport {
      requested: ids.len(),
      ..Default::default()
    };
    let fetcher = &fetcher;

    for (index, chunk) in ids.chunks(chunk_size.max(1)).enumerate() {
      if index > 0 && !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }

      let cached = self.batch_lookup::<T>(collection, chunk).await;
      let missing: Vec<u32> = chunk
        .iter()
        .zip(&cached)
        .filter(|(_, c)| c.is_none())
        .map(|(id, _)| *id)
        .collect();

      report.already_cached += chunk.len() - missing.len();
      if missing.is_empty() {
        continue;
      }

      let results = futures::future::join_all(
        missing
          .iter()
          .map(|&id| self.fetch_remote(collection, id, move || fetcher(id))),
      )
      .await;

      for ok in results.iter().map(Option::is_some) {
        if ok {
          report.fetched += 1;
        } else {
          report.failed += 1;
        }
      }

      debug!(chunk = index, fetched = missing.len(), "Prefetched chunk");
    }

    info!(
      requested = report.requested,
      cached = report.already_cached,
      fetched = report.fetched,
      failed = report.failed,
      "Prefetch complete"
    );
    report
  }

  /// Delete records in `collection` older than the freshness window.
  pub async fn sweep_stale(&self, collection: Collection) -> Result<u64> {
    let cutoff = now_millis() - self.ttl.num_milliseconds();
    self.store.sweep(collection, cutoff).await
  }

  /// Steps 2-5 of the resolution order, given the cached lookup result.
  async fn resolve<T, F, Fut>(
    &self,
    collection: Collection,
    key: Lookup<'_>,
    cached: Option<CachedEntity<T>>,
    fetcher: F,
  ) -> Option<CacheResult<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    // Fresh hit
    if let Some(hit) = &cached {
      if self.is_fresh(hit.cached_at, now_millis()) {
        return cached.map(CacheResult::from_cache);
      }
    }

    // Remote fetch with write-through
    if let Some(fetched) = self.fetch_remote(collection, key, fetcher).await {
      return Some(CacheResult::from_network(fetched.entity, fetched.cached_at));
    }

    // Stale fallback, then absent
    match cached {
      Some(stale) => {
        info!(%key, collection = collection.table(), "Serving stale cached record");
        Some(CacheResult::offline(stale))
      }
      None => None,
    }
  }

  /// Run `fetcher`, stamp the result and write it through. A failed write
  /// is logged but the fetched record is still returned.
  async fn fetch_remote<T, F, Fut>(
    &self,
    collection: Collection,
    key: impl std::fmt::Display,
    fetcher: F,
  ) -> Option<CachedEntity<T>>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    match fetcher().await {
      Ok(entity) => {
        let record = CachedEntity::new(entity, now_millis());
        if let Err(e) = self.store.put(collection, &record).await {
          warn!(%key, collection = collection.table(), "Failed to write through: {}", e);
        }
        Some(record)
      }
      Err(e) => {
        warn!(%key, collection = collection.table(), "Remote fetch failed: {}", e);
        None
      }
    }
  }

  async fn batch_lookup<T: Cacheable>(
    &self,
    collection: Collection,
    ids: &[u32],
  ) -> Vec<Option<CachedEntity<T>>> {
    match self.store.get_batch(collection, ids).await {
      Ok(cached) => cached,
      Err(e) => {
        warn!(collection = collection.table(), "Batch cache read failed, treating as misses: {}", e);
        ids.iter().map(|_| None).collect()
      }
    }
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      ttl: self.ttl,
    }
  }
}

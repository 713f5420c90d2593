//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};

/// Record tables in the local store, keyed by numeric id.
///
/// The key-value `type_cache` table is not a record collection and has its
/// own operations on the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
  Pokemon,
  Species,
  Favorites,
}

impl Collection {
  pub fn table(self) -> &'static str {
    match self {
      Collection::Pokemon => "pokemon",
      Collection::Species => "species",
      Collection::Favorites => "favorites",
    }
  }
}

/// Trait for records that can be cached by numeric id.
///
/// Implementors provide the id and the lowercase name used by the unique
/// name index. The record itself is stored as JSON.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Stable positive identifier
  fn cache_id(&self) -> u32;

  /// Unique lowercase name
  fn cache_name(&self) -> &str;
}

/// A record together with the time it was written to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntity<T> {
  pub entity: T,
  /// Milliseconds since the Unix epoch
  pub cached_at: i64,
}

impl<T> CachedEntity<T> {
  pub fn new(entity: T, cached_at: i64) -> Self {
    Self { entity, cached_at }
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached
  pub cached_at: i64,
}

impl<T> CacheResult<T> {
  /// Fresh network data, just written through at `cached_at`.
  pub fn from_network(data: T, cached_at: i64) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at,
    }
  }

  /// Cached data inside its freshness window.
  pub fn from_cache(cached: CachedEntity<T>) -> Self {
    Self {
      data: cached.entity,
      source: CacheSource::CacheFresh,
      cached_at: cached.cached_at,
    }
  }

  /// Stale cached data served because the network fetch failed.
  pub fn offline(cached: CachedEntity<T>) -> Self {
    Self {
      data: cached.entity,
      source: CacheSource::Offline,
      cached_at: cached.cached_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Offline mode - network unavailable, serving cached data
  Offline,
}

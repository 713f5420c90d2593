//! Cached PokeAPI client that wraps a remote source with transparent caching.

use chrono::Duration;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{
  now_millis, CacheLayer, CachedEntity, Collection, LocalStore, Lookup, PrefetchReport,
  RosterCache,
};
use crate::config::{Config, PrefetchConfig};
use crate::db::Database;
use crate::error::{CacheError, Result};
use crate::type_chart::{DefensiveProfile, PokemonType};

use super::client::{PokeApiClient, RemoteSource};
use super::types::{CacheStats, Pokemon, PokemonSummary, RosterEntry, Species, SweepReport};

/// Highest national dex number served by the remote.
pub const MAX_POKEMON_ID: u32 = 1025;

/// PokeAPI client with transparent caching support.
///
/// Fetch operations never return an error: a failure is logged and the
/// caller sees stale data or `None`. Favorite and maintenance operations are
/// explicit user actions and report their errors.
pub struct CachedPokeClient<R: RemoteSource = PokeApiClient> {
  remote: Arc<R>,
  cache: CacheLayer,
  roster: RosterCache,
  prefetch: PrefetchConfig,
}

impl CachedPokeClient<PokeApiClient> {
  /// Build the client from configuration. Storage is not touched until the
  /// first operation.
  pub fn new(config: &Config) -> Result<Self> {
    let remote = PokeApiClient::new(&config.api)?;

    let db_path = match &config.cache.db_path {
      Some(path) => path.clone(),
      None => Database::default_path()?,
    };
    let roster_path = match &config.cache.roster_path {
      Some(path) => path.clone(),
      None => crate::db::data_dir()?.join("roster.json"),
    };

    let ttl = Duration::try_days(config.cache.ttl_days)
      .filter(|ttl| *ttl > Duration::zero())
      .ok_or_else(|| {
        CacheError::InvalidConfig(format!("cache.ttl_days out of range: {}", config.cache.ttl_days))
      })?;
    let cache = CacheLayer::new(Arc::new(LocalStore::new(db_path))).with_ttl(ttl);

    Ok(Self::from_parts(
      remote,
      cache,
      RosterCache::new(roster_path),
      config.prefetch.clone(),
    ))
  }
}

impl<R: RemoteSource> CachedPokeClient<R> {
  pub fn from_parts(
    remote: R,
    cache: CacheLayer,
    roster: RosterCache,
    prefetch: PrefetchConfig,
  ) -> Self {
    Self {
      remote: Arc::new(remote),
      cache,
      roster,
      prefetch,
    }
  }

  fn store(&self) -> &LocalStore {
    self.cache.store()
  }

  /// Get a Pokemon by id or name; numeric input is treated as an id.
  pub async fn fetch(&self, id_or_name: &str) -> Option<Pokemon> {
    match id_or_name.trim().parse::<u32>() {
      Ok(id) => self.fetch_by_id(id).await,
      Err(_) => self.fetch_by_name(id_or_name).await,
    }
  }

  /// Get a Pokemon by id with caching.
  pub async fn fetch_by_id(&self, id: u32) -> Option<Pokemon> {
    let remote = &self.remote;
    self
      .cache
      .fetch_one(Collection::Pokemon, Lookup::Id(id), || async move {
        remote.pokemon(&id.to_string()).await
      })
      .await
      .map(|result| {
        debug!(id, source = ?result.source, cached_at = result.cached_at, "Resolved Pokemon");
        result.data
      })
  }

  /// Get a Pokemon by name with caching. Names are matched lowercase.
  pub async fn fetch_by_name(&self, name: &str) -> Option<Pokemon> {
    let name = name.trim().to_lowercase();
    let remote = &self.remote;
    let key = name.as_str();
    self
      .cache
      .fetch_one(Collection::Pokemon, Lookup::Name(key), || async move {
        remote.pokemon(key).await
      })
      .await
      .map(|result| {
        debug!(name = key, source = ?result.source, cached_at = result.cached_at, "Resolved Pokemon");
        result.data
      })
  }

  /// Get many Pokemon by id, in input order. Only absent or stale ids hit
  /// the network.
  pub async fn fetch_batch(&self, ids: &[u32]) -> Vec<Option<Pokemon>> {
    let remote = &self.remote;
    self
      .cache
      .fetch_many(
        Collection::Pokemon,
        ids,
        self.prefetch.chunk_size,
        |id| async move { remote.pokemon(&id.to_string()).await },
      )
      .await
      .into_iter()
      .map(|slot| slot.map(|result| result.data))
      .collect()
  }

  /// Warm the cache for `count` ids starting at `start_id`, in paced chunks.
  /// `count` is capped at the size of the national dex.
  pub async fn prefetch_range(&self, start_id: u32, count: u32) -> PrefetchReport {
    let count = count.min(MAX_POKEMON_ID);
    let ids: Vec<u32> = (start_id..start_id.saturating_add(count)).collect();
    let remote = &self.remote;
    self
      .cache
      .prefetch::<Pokemon, _, _>(
        Collection::Pokemon,
        &ids,
        self.prefetch.chunk_size,
        std::time::Duration::from_millis(self.prefetch.chunk_delay_ms),
        |id| async move { remote.pokemon(&id.to_string()).await },
      )
      .await
  }

  /// Page of summaries for ids `offset+1 ..= offset+limit`. Ids that cannot
  /// be resolved are left out; `limit` is capped at the size of the
  /// national dex.
  pub async fn list_range(&self, offset: u32, limit: u32) -> Vec<PokemonSummary> {
    if limit == 0 {
      return Vec::new();
    }
    let limit = limit.min(MAX_POKEMON_ID);
    let ids: Vec<u32> = (offset.saturating_add(1)..=offset.saturating_add(limit)).collect();
    self
      .fetch_batch(&ids)
      .await
      .iter()
      .flatten()
      .map(PokemonSummary::from)
      .collect()
  }

  /// Case-insensitive substring search over cached names, by ascending id.
  ///
  /// Never touches the network: the cache is a partial view of the remote
  /// catalog and this is only a convenience over it.
  pub async fn search(&self, query: &str) -> Vec<PokemonSummary> {
    let needle = query.trim().to_lowercase();
    let all = match self.store().get_all::<Pokemon>(Collection::Pokemon).await {
      Ok(all) => all,
      Err(e) => {
        warn!(query, "Search unavailable, cache could not be read: {}", e);
        return Vec::new();
      }
    };

    let mut hits: Vec<PokemonSummary> = all
      .iter()
      .filter(|c| c.entity.name.to_lowercase().contains(&needle))
      .map(|c| PokemonSummary::from(&c.entity))
      .collect();
    hits.sort_by_key(|s| s.id);
    hits
  }

  /// Get species metadata by id with caching.
  pub async fn fetch_species(&self, id: u32) -> Option<Species> {
    let remote = &self.remote;
    self
      .cache
      .fetch_one(Collection::Species, Lookup::Id(id), || async move {
        remote.species(id).await
      })
      .await
      .map(|result| result.data)
  }

  /// A random Pokemon from the full national dex.
  pub async fn fetch_random(&self) -> Option<Pokemon> {
    let id = rand::thread_rng().gen_range(1..=MAX_POKEMON_ID);
    debug!(id, "Picked random Pokemon");
    self.fetch_by_id(id).await
  }

  /// Full id/name roster for autocomplete.
  ///
  /// Served from the roster file when present; otherwise fetched once and
  /// written there. Empty on failure.
  pub async fn all_names(&self) -> Vec<RosterEntry> {
    if let Some(names) = self.roster.load::<RosterEntry>() {
      return names;
    }

    match self.remote.listing(0, MAX_POKEMON_ID).await {
      Ok(names) => {
        if let Err(e) = self.roster.save(&names) {
          warn!(path = %self.roster.path().display(), "Failed to save roster: {}", e);
        }
        names
      }
      Err(e) => {
        warn!("Failed to fetch roster: {}", e);
        Vec::new()
      }
    }
  }

  // ===== Favorites =====

  pub async fn add_favorite(&self, pokemon: &Pokemon) -> Result<()> {
    let record = CachedEntity::new(pokemon.clone(), now_millis());
    self.store().put(Collection::Favorites, &record).await
  }

  pub async fn remove_favorite(&self, id: u32) -> Result<()> {
    self.store().delete(Collection::Favorites, id).await
  }

  /// All favorites by ascending id. Empty if storage is unavailable.
  pub async fn favorites(&self) -> Vec<Pokemon> {
    match self.store().get_all::<Pokemon>(Collection::Favorites).await {
      Ok(all) => {
        let mut favorites: Vec<Pokemon> = all.into_iter().map(|c| c.entity).collect();
        favorites.sort_by_key(|p| p.id);
        favorites
      }
      Err(e) => {
        warn!("Failed to read favorites: {}", e);
        Vec::new()
      }
    }
  }

  pub async fn is_favorite(&self, id: u32) -> bool {
    match self.store().get::<Pokemon>(Collection::Favorites, id).await {
      Ok(found) => found.is_some(),
      Err(e) => {
        warn!(id, "Failed to read favorites: {}", e);
        false
      }
    }
  }

  // ===== Maintenance =====

  /// Delete cached Pokemon and species older than the TTL. Favorites are
  /// never swept.
  pub async fn sweep_stale(&self) -> Result<SweepReport> {
    Ok(SweepReport {
      pokemon: self.cache.sweep_stale(Collection::Pokemon).await?,
      species: self.cache.sweep_stale(Collection::Species).await?,
    })
  }

  /// Empty every cache collection, keeping favorites.
  pub async fn clear_all(&self) -> Result<()> {
    self.store().clear_all().await
  }

  pub async fn stats(&self) -> Result<CacheStats> {
    Ok(CacheStats {
      pokemon: self.store().count(Collection::Pokemon).await?,
      species: self.store().count(Collection::Species).await?,
      favorites: self.store().count(Collection::Favorites).await?,
    })
  }

  // ===== Type matchups =====

  /// Weaknesses, resistances and immunities for a defending type
  /// combination, memoized in the key-value table.
  pub async fn defensive_profile(&self, types: &[PokemonType]) -> DefensiveProfile {
    let key = DefensiveProfile::cache_key(types);

    match self.store().kv_get::<DefensiveProfile>(&key).await {
      Ok(Some(cached)) => return cached.entity,
      Ok(None) => {}
      Err(e) => warn!(%key, "Type cache read failed: {}", e),
    }

    let profile = DefensiveProfile::compute(types);
    if let Err(e) = self.store().kv_put(&key, &profile, now_millis()).await {
      warn!(%key, "Type cache write failed: {}", e);
    }
    profile
  }
}

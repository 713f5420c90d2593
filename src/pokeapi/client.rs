use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{CacheError, Result};
use crate::pokeapi::api_types::{ApiListResponse, ApiPokemon, ApiSpecies};
use crate::pokeapi::types::{Pokemon, RosterEntry, Species};

/// Read-only remote source of Pokemon data.
///
/// The cached client only talks to the network through this trait, so tests
/// can swap in a counting mock.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  /// Fetch a single Pokemon by numeric id or name
  async fn pokemon(&self, id_or_name: &str) -> Result<Pokemon>;

  /// Fetch species metadata by id
  async fn species(&self, id: u32) -> Result<Species>;

  /// Fetch one page of the id/name listing
  async fn listing(&self, offset: u32, limit: u32) -> Result<Vec<RosterEntry>>;
}

/// PokeAPI HTTP client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct PokeApiClient {
  client: Client,
  base_url: Url,
}

impl PokeApiClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
      CacheError::InvalidConfig(format!("api.base_url '{}': {}", config.base_url, e))
    })?;
    if base_url.cannot_be_a_base() {
      return Err(CacheError::InvalidConfig(format!(
        "api.base_url '{}' cannot carry a path",
        config.base_url
      )));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("dexcache/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| CacheError::NetworkFailure(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client, base_url })
  }

  /// `base_url` with `segments` appended. Each segment is percent-encoded,
  /// so a `/` or `..` inside one can never climb to another endpoint.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// GET `url` and decode the JSON body. Non-2xx is a network failure; a
  /// body that does not match `T` is malformed.
  async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    debug!(%url, "GET");

    let response = self.client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(CacheError::NetworkFailure(format!(
        "GET {} returned {}",
        url, status
      )));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body)
      .map_err(|e| CacheError::MalformedResponse(format!("GET {}: {}", url, e)))
  }
}

#[async_trait]
impl RemoteSource for PokeApiClient {
  async fn pokemon(&self, id_or_name: &str) -> Result<Pokemon> {
    let key = id_or_name.trim().to_lowercase();
    let api: ApiPokemon = self.get(self.endpoint(&["pokemon", &key])).await?;
    let pokemon = api.into_pokemon();

    // The record is cached under its own id and name, so it has to be the
    // one that was asked for
    let matches = match key.parse::<u32>() {
      Ok(id) => pokemon.id == id,
      Err(_) => pokemon.name == key,
    };
    if !matches {
      return Err(CacheError::MalformedResponse(format!(
        "asked for '{}', got #{} {}",
        key, pokemon.id, pokemon.name
      )));
    }
    Ok(pokemon)
  }

  async fn species(&self, id: u32) -> Result<Species> {
    let api: ApiSpecies = self
      .get(self.endpoint(&["pokemon-species", &id.to_string()]))
      .await?;
    Ok(api.into_species())
  }

  async fn listing(&self, offset: u32, limit: u32) -> Result<Vec<RosterEntry>> {
    let mut url = self.endpoint(&["pokemon"]);
    url
      .query_pairs_mut()
      .append_pair("offset", &offset.to_string())
      .append_pair("limit", &limit.to_string());

    let page: ApiListResponse = self.get(url).await?;
    debug!(total = page.count, "Fetched listing page");
    Ok(page.into_roster())
  }
}

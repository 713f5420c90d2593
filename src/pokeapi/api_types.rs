//! Serde-deserializable types matching PokeAPI responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs. Unknown fields
//! are ignored; optional fields default so a sparse payload still maps.

use serde::Deserialize;
use url::Url;

use super::types::{Pokemon, PokemonStats, RosterEntry, Species};

// ============================================================================
// Common nested field types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiNamedResource {
  pub name: String,
  #[serde(default)]
  pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiResourceRef {
  pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiLanguageRef {
  pub name: String,
}

// ============================================================================
// Pokemon endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTypeSlot {
  pub slot: u32,
  #[serde(rename = "type")]
  pub kind: ApiNamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ApiStat {
  pub base_stat: u32,
  pub stat: ApiNamedResource,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiArtwork {
  pub front_default: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiOtherSprites {
  #[serde(rename = "official-artwork", default)]
  pub official_artwork: Option<ApiArtwork>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiSprites {
  pub front_default: Option<String>,
  #[serde(default)]
  pub other: Option<ApiOtherSprites>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPokemon {
  pub id: u32,
  pub name: String,
  #[serde(default)]
  pub height: u32,
  #[serde(default)]
  pub weight: u32,
  #[serde(default)]
  pub sprites: ApiSprites,
  #[serde(default)]
  pub types: Vec<ApiTypeSlot>,
  #[serde(default)]
  pub stats: Vec<ApiStat>,
  pub species: Option<ApiResourceRef>,
}

impl ApiPokemon {
  /// Map the wire payload onto the cached record.
  ///
  /// Types are re-sorted by slot before flattening. Each stat is picked by
  /// name and defaults to 0 when absent.
  pub fn into_pokemon(self) -> Pokemon {
    let mut types = self.types;
    types.sort_by_key(|t| t.slot);

    let stat = |name: &str| {
      self
        .stats
        .iter()
        .find(|s| s.stat.name == name)
        .map(|s| s.base_stat)
        .unwrap_or(0)
    };

    let stats = PokemonStats {
      hp: stat("hp"),
      attack: stat("attack"),
      defense: stat("defense"),
      special_attack: stat("special-attack"),
      special_defense: stat("special-defense"),
      speed: stat("speed"),
    };

    let artwork = self
      .sprites
      .other
      .and_then(|o| o.official_artwork)
      .and_then(|a| a.front_default);
    let sprite = artwork
      .or(self.sprites.front_default)
      .unwrap_or_default();

    Pokemon {
      id: self.id,
      name: self.name.to_lowercase(),
      types: types.into_iter().map(|t| t.kind.name).collect(),
      sprite,
      height: self.height,
      weight: self.weight,
      stats,
      species_url: self.species.map(|s| s.url).unwrap_or_default(),
    }
  }
}

// ============================================================================
// Species endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiGenus {
  pub genus: String,
  pub language: ApiLanguageRef,
}

#[derive(Debug, Deserialize)]
pub struct ApiFlavorText {
  pub flavor_text: String,
  pub language: ApiLanguageRef,
}

#[derive(Debug, Deserialize)]
pub struct ApiSpecies {
  pub id: u32,
  pub name: String,
  pub evolution_chain: Option<ApiResourceRef>,
  #[serde(default)]
  pub genera: Vec<ApiGenus>,
  #[serde(default)]
  pub flavor_text_entries: Vec<ApiFlavorText>,
}

const LANGUAGE: &str = "en";

impl ApiSpecies {
  pub fn into_species(self) -> Species {
    let genus = self
      .genera
      .into_iter()
      .find(|g| g.language.name == LANGUAGE)
      .map(|g| g.genus);

    // Flavor text contains hard line breaks and form feeds
    let flavor_text = self
      .flavor_text_entries
      .into_iter()
      .find(|f| f.language.name == LANGUAGE)
      .map(|f| f.flavor_text.split_whitespace().collect::<Vec<_>>().join(" "));

    Species {
      id: self.id,
      name: self.name.to_lowercase(),
      genus,
      flavor_text,
      evolution_chain_url: self.evolution_chain.map(|e| e.url),
    }
  }
}

// ============================================================================
// Paginated listing response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub count: u32,
  #[serde(default)]
  pub results: Vec<ApiNamedResource>,
}

impl ApiListResponse {
  /// Roster entries, with ids parsed from each entry's URL. Entries whose
  /// URL carries no numeric id are dropped.
  pub fn into_roster(self) -> Vec<RosterEntry> {
    self
      .results
      .into_iter()
      .filter_map(|r| {
        let id = id_from_url(&r.url)?;
        Some(RosterEntry { id, name: r.name })
      })
      .collect()
  }
}

/// Extract the trailing numeric id from a resource URL such as
/// `https://pokeapi.co/api/v2/pokemon/25/`.
pub fn id_from_url(url: &str) -> Option<u32> {
  let url = Url::parse(url).ok()?;
  url
    .path_segments()?
    .filter(|s| !s.is_empty())
    .last()?
    .parse()
    .ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn charizard_payload() -> serde_json::Value {
    json!({
      "id": 6,
      "name": "charizard",
      "height": 17,
      "weight": 905,
      "base_experience": 267,
      "sprites": {
        "front_default": "https://img/front/6.png",
        "other": { "official-artwork": { "front_default": "https://img/art/6.png" } }
      },
      "types": [
        { "slot": 2, "type": { "name": "flying", "url": "https://pokeapi.co/api/v2/type/3/" } },
        { "slot": 1, "type": { "name": "fire", "url": "https://pokeapi.co/api/v2/type/10/" } }
      ],
      "stats": [
        { "base_stat": 100, "effort": 0, "stat": { "name": "speed" } },
        { "base_stat": 78, "effort": 0, "stat": { "name": "hp" } },
        { "base_stat": 109, "effort": 3, "stat": { "name": "special-attack" } },
        { "base_stat": 84, "effort": 0, "stat": { "name": "attack" } }
      ],
      "species": { "name": "charizard", "url": "https://pokeapi.co/api/v2/pokemon-species/6/" }
    })
  }

  #[test]
  fn test_transform_sorts_types_by_slot() {
    let api: ApiPokemon = serde_json::from_value(charizard_payload()).unwrap();
    let pokemon = api.into_pokemon();
    assert_eq!(pokemon.types, vec!["fire", "flying"]);
  }

  #[test]
  fn test_transform_picks_stats_by_name_and_defaults_missing() {
    let api: ApiPokemon = serde_json::from_value(charizard_payload()).unwrap();
    let stats = api.into_pokemon().stats;
    assert_eq!(stats.hp, 78);
    assert_eq!(stats.attack, 84);
    assert_eq!(stats.special_attack, 109);
    assert_eq!(stats.speed, 100);
    assert_eq!(stats.defense, 0);
    assert_eq!(stats.special_defense, 0);
  }

  #[test]
  fn test_transform_prefers_official_artwork() {
    let api: ApiPokemon = serde_json::from_value(charizard_payload()).unwrap();
    let pokemon = api.into_pokemon();
    assert_eq!(pokemon.sprite, "https://img/art/6.png");
    assert_eq!(
      pokemon.species_url,
      "https://pokeapi.co/api/v2/pokemon-species/6/"
    );
  }

  #[test]
  fn test_sparse_payload_uses_defaults() {
    let api: ApiPokemon =
      serde_json::from_value(json!({ "id": 132, "name": "Ditto" })).unwrap();
    let pokemon = api.into_pokemon();
    assert_eq!(pokemon.name, "ditto");
    assert!(pokemon.types.is_empty());
    assert_eq!(pokemon.sprite, "");
    assert_eq!(pokemon.height, 0);
    assert_eq!(pokemon.stats, PokemonStats::default());
  }

  #[test]
  fn test_missing_id_is_rejected() {
    let parsed = serde_json::from_value::<ApiPokemon>(json!({ "name": "missingno" }));
    assert!(parsed.is_err());
  }

  #[test]
  fn test_species_picks_english_entries() {
    let api: ApiSpecies = serde_json::from_value(json!({
      "id": 25,
      "name": "pikachu",
      "evolution_chain": { "url": "https://pokeapi.co/api/v2/evolution-chain/10/" },
      "genera": [
        { "genus": "ねずみポケモン", "language": { "name": "ja" } },
        { "genus": "Mouse Pokémon", "language": { "name": "en" } }
      ],
      "flavor_text_entries": [
        { "flavor_text": "When several of\nthese POKéMON\u{c}gather", "language": { "name": "en" }, "version": { "name": "red" } }
      ]
    }))
    .unwrap();

    let species = api.into_species();
    assert_eq!(species.genus.as_deref(), Some("Mouse Pokémon"));
    assert_eq!(
      species.flavor_text.as_deref(),
      Some("When several of these POKéMON gather")
    );
    assert_eq!(
      species.evolution_chain_url.as_deref(),
      Some("https://pokeapi.co/api/v2/evolution-chain/10/")
    );
  }

  #[test]
  fn test_roster_ids_come_from_urls() {
    let list: ApiListResponse = serde_json::from_value(json!({
      "count": 1302,
      "next": null,
      "results": [
        { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" },
        { "name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/" },
        { "name": "broken", "url": "not a url" }
      ]
    }))
    .unwrap();

    assert_eq!(
      list.into_roster(),
      vec![
        RosterEntry { id: 1, name: "bulbasaur".into() },
        RosterEntry { id: 2, name: "ivysaur".into() },
      ]
    );
  }

  #[test]
  fn test_id_from_url_without_trailing_slash() {
    assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/151"), Some(151));
    assert_eq!(id_from_url("https://pokeapi.co/api/v2/pokemon/"), None);
  }
}

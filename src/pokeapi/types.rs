use serde::{Deserialize, Serialize};

/// Base stats extracted from the remote stat list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonStats {
  pub hp: u32,
  pub attack: u32,
  pub defense: u32,
  pub special_attack: u32,
  pub special_defense: u32,
  pub speed: u32,
}

impl PokemonStats {
  pub fn total(&self) -> u32 {
    self.hp + self.attack + self.defense + self.special_attack + self.special_defense + self.speed
  }
}

/// Full cached Pokemon record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pokemon {
  pub id: u32,
  pub name: String,
  /// Type names ordered by slot; the first is the primary type
  pub types: Vec<String>,
  pub sprite: String,
  /// Decimetres
  pub height: u32,
  /// Hectograms
  pub weight: u32,
  pub stats: PokemonStats,
  pub species_url: String,
}

/// Species metadata (changes less often than the Pokemon record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
  pub id: u32,
  pub name: String,
  pub genus: Option<String>,
  pub flavor_text: Option<String>,
  pub evolution_chain_url: Option<String>,
}

/// Row for list and search views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonSummary {
  pub id: u32,
  pub name: String,
  pub sprite: String,
  pub types: Vec<String>,
}

impl From<&Pokemon> for PokemonSummary {
  fn from(p: &Pokemon) -> Self {
    Self {
      id: p.id,
      name: p.name.clone(),
      sprite: p.sprite.clone(),
      types: p.types.clone(),
    }
  }
}

/// One entry of the full id/name roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
  pub id: u32,
  pub name: String,
}

/// Record counts per collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
  pub pokemon: u64,
  pub species: u64,
  pub favorites: u64,
}

/// Records removed by a maintenance sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub pokemon: u64,
  pub species: u64,
}

//! Static type-effectiveness chart.
//!
//! Each row lists only the non-neutral multipliers for an attacking type;
//! any pair not listed is 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PokemonType {
  Normal,
  Fire,
  Water,
  Electric,
  Grass,
  Ice,
  Fighting,
  Poison,
  Ground,
  Flying,
  Psychic,
  Bug,
  Rock,
  Ghost,
  Dragon,
  Dark,
  Steel,
  Fairy,
}

use PokemonType::*;

impl PokemonType {
  pub const ALL: [PokemonType; 18] = [
    Normal, Fire, Water, Electric, Grass, Ice, Fighting, Poison, Ground, Flying, Psychic, Bug,
    Rock, Ghost, Dragon, Dark, Steel, Fairy,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Normal => "normal",
      Fire => "fire",
      Water => "water",
      Electric => "electric",
      Grass => "grass",
      Ice => "ice",
      Fighting => "fighting",
      Poison => "poison",
      Ground => "ground",
      Flying => "flying",
      Psychic => "psychic",
      Bug => "bug",
      Rock => "rock",
      Ghost => "ghost",
      Dragon => "dragon",
      Dark => "dark",
      Steel => "steel",
      Fairy => "fairy",
    }
  }
}

impl fmt::Display for PokemonType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl fmt::Display for UnknownType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "unknown type '{}'", self.0)
  }
}

impl std::error::Error for UnknownType {}

impl FromStr for PokemonType {
  type Err = UnknownType;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_lowercase();
    PokemonType::ALL
      .into_iter()
      .find(|t| t.as_str() == lower)
      .ok_or_else(|| UnknownType(s.to_string()))
  }
}

/// Non-neutral multipliers when `attack` hits each defending type.
fn row(attack: PokemonType) -> &'static [(PokemonType, f64)] {
  match attack {
    Normal => &[(Rock, 0.5), (Ghost, 0.0), (Steel, 0.5)],
    Fire => &[
      (Fire, 0.5),
      (Water, 0.5),
      (Grass, 2.0),
      (Ice, 2.0),
      (Bug, 2.0),
      (Rock, 0.5),
      (Dragon, 0.5),
      (Steel, 2.0),
    ],
    Water => &[
      (Fire, 2.0),
      (Water, 0.5),
      (Grass, 0.5),
      (Ground, 2.0),
      (Rock, 2.0),
      (Dragon, 0.5),
    ],
    Electric => &[
      (Water, 2.0),
      (Electric, 0.5),
      (Grass, 0.5),
      (Ground, 0.0),
      (Flying, 2.0),
      (Dragon, 0.5),
    ],
    Grass => &[
      (Fire, 0.5),
      (Water, 2.0),
      (Grass, 0.5),
      (Poison, 0.5),
      (Ground, 2.0),
      (Flying, 0.5),
      (Bug, 0.5),
      (Rock, 2.0),
      (Dragon, 0.5),
      (Steel, 0.5),
    ],
    Ice => &[
      (Fire, 0.5),
      (Water, 0.5),
      (Grass, 2.0),
      (Ice, 0.5),
      (Ground, 2.0),
      (Flying, 2.0),
      (Dragon, 2.0),
      (Steel, 0.5),
    ],
    Fighting => &[
      (Normal, 2.0),
      (Ice, 2.0),
      (Poison, 0.5),
      (Flying, 0.5),
      (Psychic, 0.5),
      (Bug, 0.5),
      (Rock, 2.0),
      (Ghost, 0.0),
      (Dark, 2.0),
      (Steel, 2.0),
      (Fairy, 0.5),
    ],
    Poison => &[
      (Grass, 2.0),
      (Poison, 0.5),
      (Ground, 0.5),
      (Rock, 0.5),
      (Ghost, 0.5),
      (Steel, 0.0),
      (Fairy, 2.0),
    ],
    Ground => &[
      (Fire, 2.0),
      (Electric, 2.0),
      (Grass, 0.5),
      (Poison, 2.0),
      (Flying, 0.0),
      (Bug, 0.5),
      (Rock, 2.0),
      (Steel, 2.0),
    ],
    Flying => &[
      (Electric, 0.5),
      (Grass, 2.0),
      (Fighting, 2.0),
      (Bug, 2.0),
      (Rock, 0.5),
      (Steel, 0.5),
    ],
    Psychic => &[
      (Fighting, 2.0),
      (Poison, 2.0),
      (Psychic, 0.5),
      (Dark, 0.0),
      (Steel, 0.5),
    ],
    Bug => &[
      (Fire, 0.5),
      (Grass, 2.0),
      (Fighting, 0.5),
      (Poison, 0.5),
      (Flying, 0.5),
      (Psychic, 2.0),
      (Ghost, 0.5),
      (Dark, 2.0),
      (Steel, 0.5),
      (Fairy, 0.5),
    ],
    Rock => &[
      (Fire, 2.0),
      (Ice, 2.0),
      (Fighting, 0.5),
      (Ground, 0.5),
      (Flying, 2.0),
      (Bug, 2.0),
      (Steel, 0.5),
    ],
    Ghost => &[(Normal, 0.0), (Psychic, 2.0), (Ghost, 2.0), (Dark, 0.5)],
    Dragon => &[(Dragon, 2.0), (Steel, 0.5), (Fairy, 0.0)],
    Dark => &[
      (Fighting, 0.5),
      (Psychic, 2.0),
      (Ghost, 2.0),
      (Dark, 0.5),
      (Fairy, 0.5),
    ],
    Steel => &[
      (Fire, 0.5),
      (Water, 0.5),
      (Electric, 0.5),
      (Ice, 2.0),
      (Rock, 2.0),
      (Steel, 0.5),
      (Fairy, 2.0),
    ],
    Fairy => &[
      (Fire, 0.5),
      (Fighting, 2.0),
      (Poison, 0.5),
      (Dragon, 2.0),
      (Dark, 2.0),
      (Steel, 0.5),
    ],
  }
}

/// Multiplier for a single attacking/defending pair, 1 when unlisted.
pub fn multiplier(attack: PokemonType, defend: PokemonType) -> f64 {
  row(attack)
    .iter()
    .find(|(t, _)| *t == defend)
    .map(|(_, m)| *m)
    .unwrap_or(1.0)
}

/// Product of the pairwise multipliers against every defending type.
pub fn effectiveness(attack: PokemonType, defending: &[PokemonType]) -> f64 {
  defending
    .iter()
    .fold(1.0, |acc, &defend| acc * multiplier(attack, defend))
}

/// Like [`effectiveness`] over raw type names. Any name outside the chart
/// contributes a neutral 1.
pub fn effectiveness_by_name<S: AsRef<str>>(attack: &str, defending: &[S]) -> f64 {
  let Ok(attack) = attack.parse::<PokemonType>() else {
    return 1.0;
  };
  defending
    .iter()
    .filter_map(|d| d.as_ref().parse::<PokemonType>().ok())
    .fold(1.0, |acc, defend| acc * multiplier(attack, defend))
}

/// Attack types that deal more than neutral damage to `defending`.
pub fn super_effective_against(defending: &[PokemonType]) -> Vec<PokemonType> {
  attackers_where(defending, |m| m > 1.0)
}

/// Attack types that are resisted but still deal damage.
pub fn not_very_effective_against(defending: &[PokemonType]) -> Vec<PokemonType> {
  attackers_where(defending, |m| m < 1.0 && m > 0.0)
}

/// Attack types `defending` is immune to.
pub fn no_effect_against(defending: &[PokemonType]) -> Vec<PokemonType> {
  attackers_where(defending, |m| m == 0.0)
}

fn attackers_where(defending: &[PokemonType], keep: impl Fn(f64) -> bool) -> Vec<PokemonType> {
  PokemonType::ALL
    .into_iter()
    .filter(|&attack| keep(effectiveness(attack, defending)))
    .collect()
}

/// Defending types hit super effectively by at least one of `attacking`.
pub fn offensive_super_effective(attacking: &[PokemonType]) -> Vec<PokemonType> {
  coverage_where(attacking, |m| m > 1.0)
}

/// Defending types that resist at least one of `attacking`.
pub fn offensive_not_very_effective(attacking: &[PokemonType]) -> Vec<PokemonType> {
  coverage_where(attacking, |m| m < 1.0 && m > 0.0)
}

/// Defending types immune to at least one of `attacking`.
pub fn offensive_no_effect(attacking: &[PokemonType]) -> Vec<PokemonType> {
  coverage_where(attacking, |m| m == 0.0)
}

fn coverage_where(attacking: &[PokemonType], keep: impl Fn(f64) -> bool) -> Vec<PokemonType> {
  let mut hit = BTreeSet::new();
  for &attack in attacking {
    for defend in PokemonType::ALL {
      if keep(multiplier(attack, defend)) {
        hit.insert(defend);
      }
    }
  }
  hit.into_iter().collect()
}

pub fn effectiveness_label(multiplier: f64) -> &'static str {
  match multiplier {
    m if m == 0.0 => "No Effect",
    m if m == 0.25 => "Double Resist",
    m if m == 0.5 => "Not Very Effective",
    m if m == 2.0 => "Super Effective",
    m if m == 4.0 => "Double Weakness",
    _ => "Normal",
  }
}

/// Weaknesses, resistances and immunities of a defending type combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefensiveProfile {
  pub types: Vec<PokemonType>,
  pub weaknesses: Vec<PokemonType>,
  pub resistances: Vec<PokemonType>,
  pub immunities: Vec<PokemonType>,
}

impl DefensiveProfile {
  pub fn compute(types: &[PokemonType]) -> Self {
    Self {
      types: types.to_vec(),
      weaknesses: super_effective_against(types),
      resistances: not_very_effective_against(types),
      immunities: no_effect_against(types),
    }
  }

  /// Stable key for memoizing a profile, independent of type order.
  pub fn cache_key(types: &[PokemonType]) -> String {
    let sorted: BTreeSet<_> = types.iter().map(|t| t.as_str()).collect();
    format!(
      "profile:{}",
      sorted.into_iter().collect::<Vec<_>>().join("+")
    )
  }
}

//! Subcommands, their execution, and plain-text output.

use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::fmt::Write as _;

use crate::config::Config;
use crate::pokeapi::{
  CachedPokeClient, Pokemon, PokemonSummary, RemoteSource, RosterEntry, Species,
};
use crate::type_chart::{self, DefensiveProfile, PokemonType};

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show one Pokemon by id or name
  #[command(alias = "g")]
  Get { target: String },

  /// Show species details by id
  Species { id: u32 },

  /// List Pokemon by id range
  #[command(alias = "ls")]
  List {
    #[arg(long, default_value_t = 0)]
    offset: u32,
    #[arg(long, default_value_t = 20)]
    limit: u32,
  },

  /// Search cached Pokemon by name (never hits the network)
  #[command(alias = "s")]
  Search { query: String },

  /// Warm the cache for a range of ids
  Prefetch {
    #[arg(long, default_value_t = 1)]
    start: u32,
    /// Defaults to prefetch.count from config
    #[arg(long)]
    count: Option<u32>,
  },

  /// Suggest names from the full roster
  Names {
    prefix: Option<String>,
    #[arg(long, default_value_t = 10)]
    limit: usize,
  },

  /// Show a random Pokemon
  Random,

  /// Manage favorites
  #[command(alias = "f", subcommand)]
  Fav(FavCommand),

  /// Show cache record counts
  Stats,

  /// Delete cached records older than the TTL
  Sweep,

  /// Empty the cache, keeping favorites
  Clear,

  /// Weaknesses, resistances and immunities of a type combination
  Matchup {
    #[arg(required = true, num_args = 1..=2)]
    types: Vec<String>,
  },

  /// Damage multiplier of an attack type against defending types
  Effect {
    attack: String,
    #[arg(required = true)]
    defending: Vec<String>,
  },

  /// Which defending types a set of attack types covers
  Coverage {
    #[arg(required = true)]
    types: Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum FavCommand {
  /// Mark a Pokemon (id or name) as favorite
  Add { target: String },
  /// Unmark a favorite by id
  #[command(alias = "rm")]
  Remove { id: u32 },
  /// List favorites
  #[command(alias = "ls")]
  List,
}

/// Execute a subcommand and print its output to stdout.
pub async fn run<R: RemoteSource>(
  command: Command,
  client: &CachedPokeClient<R>,
  config: &Config,
) -> Result<()> {
  match command {
    Command::Get { target } => {
      let pokemon = client
        .fetch(&target)
        .await
        .ok_or_else(|| eyre!("{} not found (offline and not cached?)", target))?;
      let favorite = client.is_favorite(pokemon.id).await;
      print!("{}", format_pokemon(&pokemon, favorite));
    }

    Command::Species { id } => {
      let species = client
        .fetch_species(id)
        .await
        .ok_or_else(|| eyre!("species {} not found", id))?;
      print!("{}", format_species(&species));
    }

    Command::List { offset, limit } => {
      print_summaries(&client.list_range(offset, limit).await);
    }

    Command::Search { query } => {
      let hits = client.search(&query).await;
      if hits.is_empty() {
        println!("No cached Pokemon match '{}'", query);
      }
      print_summaries(&hits);
    }

    Command::Prefetch { start, count } => {
      let count = count.unwrap_or(config.prefetch.count);
      let report = client.prefetch_range(start, count).await;
      println!(
        "requested {}  cached {}  fetched {}  failed {}",
        report.requested, report.already_cached, report.fetched, report.failed
      );
    }

    Command::Names { prefix, limit } => {
      let roster = client.all_names().await;
      if roster.is_empty() {
        return Err(eyre!("Roster unavailable"));
      }
      let input = prefix.unwrap_or_default();
      for entry in name_suggestions(&roster, &input).into_iter().take(limit) {
        println!("{:>4}  {}", entry.id, entry.name);
      }
    }

    Command::Random => {
      let pokemon = client
        .fetch_random()
        .await
        .ok_or_else(|| eyre!("Could not fetch a random Pokemon"))?;
      let favorite = client.is_favorite(pokemon.id).await;
      print!("{}", format_pokemon(&pokemon, favorite));
    }

    Command::Fav(fav) => run_fav(fav, client).await?,

    Command::Stats => {
      let stats = client.stats().await?;
      println!("pokemon   {}", stats.pokemon);
      println!("species   {}", stats.species);
      println!("favorites {}", stats.favorites);
      println!("ttl       {} days", config.cache.ttl_days);
    }

    Command::Sweep => {
      let report = client.sweep_stale().await?;
      println!(
        "Removed {} pokemon and {} species records",
        report.pokemon, report.species
      );
    }

    Command::Clear => {
      client.clear_all().await?;
      println!("Cache cleared (favorites kept)");
    }

    Command::Matchup { types } => {
      let types = parse_types(&types)?;
      print!("{}", format_profile(&client.defensive_profile(&types).await));
    }

    Command::Effect { attack, defending } => {
      let m = type_chart::effectiveness_by_name(&attack, &defending);
      println!("{}x {}", m, type_chart::effectiveness_label(m));
    }

    Command::Coverage { types } => {
      let types = parse_types(&types)?;
      println!(
        "super effective: {}",
        join(&type_chart::offensive_super_effective(&types))
      );
      println!(
        "resisted:        {}",
        join(&type_chart::offensive_not_very_effective(&types))
      );
      println!(
        "no effect:       {}",
        join(&type_chart::offensive_no_effect(&types))
      );
    }
  }

  Ok(())
}

async fn run_fav<R: RemoteSource>(fav: FavCommand, client: &CachedPokeClient<R>) -> Result<()> {
  match fav {
    FavCommand::Add { target } => {
      let pokemon = client
        .fetch(&target)
        .await
        .ok_or_else(|| eyre!("{} not found", target))?;
      client.add_favorite(&pokemon).await?;
      println!("Added #{} {}", pokemon.id, pokemon.name);
    }
    FavCommand::Remove { id } => {
      client.remove_favorite(id).await?;
      println!("Removed #{}", id);
    }
    FavCommand::List => {
      let favorites = client.favorites().await;
      let rows: Vec<PokemonSummary> = favorites.iter().map(PokemonSummary::from).collect();
      print_summaries(&rows);
    }
  }
  Ok(())
}

fn parse_types(names: &[String]) -> Result<Vec<PokemonType>> {
  names
    .iter()
    .map(|n| n.parse::<PokemonType>().map_err(|e| eyre!(e)))
    .collect()
}

fn join(types: &[PokemonType]) -> String {
  if types.is_empty() {
    return "-".to_string();
  }
  types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
}

fn print_summaries(rows: &[PokemonSummary]) {
  for row in rows {
    println!("{}", format_summary(row));
  }
}

pub fn format_summary(row: &PokemonSummary) -> String {
  format!("#{:<4} {:<14} {}", row.id, row.name, row.types.join("/"))
}

pub fn format_pokemon(p: &Pokemon, favorite: bool) -> String {
  let mut out = String::new();
  let star = if favorite { " *" } else { "" };
  let _ = writeln!(out, "#{} {}{}", p.id, p.name, star);
  let _ = writeln!(out, "types   {}", p.types.join("/"));
  let _ = writeln!(
    out,
    "size    {:.1} m, {:.1} kg",
    f64::from(p.height) / 10.0,
    f64::from(p.weight) / 10.0
  );
  let s = &p.stats;
  let _ = writeln!(
    out,
    "stats   hp {} atk {} def {} spa {} spd {} spe {} (total {})",
    s.hp,
    s.attack,
    s.defense,
    s.special_attack,
    s.special_defense,
    s.speed,
    s.total()
  );
  if !p.sprite.is_empty() {
    let _ = writeln!(out, "sprite  {}", p.sprite);
  }
  out
}

pub fn format_species(s: &Species) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "#{} {}", s.id, s.name);
  if let Some(genus) = &s.genus {
    let _ = writeln!(out, "genus   {}", genus);
  }
  if let Some(text) = &s.flavor_text {
    let _ = writeln!(out, "{}", text);
  }
  out
}

pub fn format_profile(profile: &DefensiveProfile) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "defending {}", join(&profile.types));
  let _ = writeln!(out, "weak to   {}", join(&profile.weaknesses));
  let _ = writeln!(out, "resists   {}", join(&profile.resistances));
  let _ = writeln!(out, "immune to {}", join(&profile.immunities));
  out
}

/// Rank roster entries against `input`: exact name, then prefix, then
/// substring. Ties keep roster (id) order. Empty input returns everything.
pub fn name_suggestions<'a>(roster: &'a [RosterEntry], input: &str) -> Vec<&'a RosterEntry> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return roster.iter().collect();
  }

  let mut matches: Vec<(&RosterEntry, u32)> = roster
    .iter()
    .filter_map(|entry| {
      let priority = if entry.name == input_lower {
        0
      } else if entry.name.starts_with(&input_lower) {
        1
      } else if entry.name.contains(&input_lower) {
        2
      } else {
        return None;
      };
      Some((entry, priority))
    })
    .collect();

  // Stable sort keeps id order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(entry, _)| entry).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pokeapi::types::PokemonStats;

  fn roster() -> Vec<RosterEntry> {
    ["pikachu", "raichu", "pichu", "mew", "mewtwo"]
      .iter()
      .zip([25, 26, 172, 151, 150])
      .map(|(name, id)| RosterEntry {
        id,
        name: name.to_string(),
      })
      .collect()
  }

  fn names<'a>(entries: &[&'a RosterEntry]) -> Vec<&'a str> {
    entries.iter().map(|e| e.name.as_str()).collect()
  }

  #[test]
  fn test_empty_input_returns_all() {
    let roster = roster();
    assert_eq!(name_suggestions(&roster, "").len(), roster.len());
  }

  #[test]
  fn test_exact_match_first() {
    let roster = roster();
    let suggestions = name_suggestions(&roster, "Mew");
    assert_eq!(names(&suggestions), vec!["mew", "mewtwo"]);
  }

  #[test]
  fn test_prefix_before_substring() {
    let roster = roster();
    let suggestions = name_suggestions(&roster, "pi");
    assert_eq!(names(&suggestions), vec!["pikachu", "pichu"]);

    let suggestions = name_suggestions(&roster, "chu");
    assert_eq!(names(&suggestions), vec!["pikachu", "raichu", "pichu"]);
  }

  #[test]
  fn test_no_match() {
    assert!(name_suggestions(&roster(), "zzz").is_empty());
  }

  #[test]
  fn test_parse_types() {
    let types = parse_types(&["Fire".to_string(), "flying".to_string()]).unwrap();
    assert_eq!(types, vec![PokemonType::Fire, PokemonType::Flying]);
    assert!(parse_types(&["shadow".to_string()]).is_err());
  }

  #[test]
  fn test_format_pokemon() {
    let p = Pokemon {
      id: 25,
      name: "pikachu".into(),
      types: vec!["electric".into()],
      sprite: String::new(),
      height: 4,
      weight: 60,
      stats: PokemonStats {
        hp: 35,
        attack: 55,
        defense: 40,
        special_attack: 50,
        special_defense: 50,
        speed: 90,
      },
      species_url: String::new(),
    };
    let out = format_pokemon(&p, true);
    assert!(out.starts_with("#25 pikachu *\n"));
    assert!(out.contains("size    0.4 m, 6.0 kg"));
    assert!(out.contains("(total 320)"));
    assert!(!out.contains("sprite"));
  }

  #[test]
  fn test_format_profile_empty_lists() {
    let profile = DefensiveProfile::compute(&[PokemonType::Normal]);
    let out = format_profile(&profile);
    assert!(out.contains("weak to   fighting"));
    assert!(out.contains("resists   -"));
    assert!(out.contains("immune to ghost"));
  }
}

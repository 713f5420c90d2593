use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::DEFAULT_TTL_DAYS;

/// Upper bound for `cache.ttl_days` (a century).
const MAX_TTL_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub prefetch: PrefetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Remote API root, without trailing slash
  pub base_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://pokeapi.co/api/v2".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Records older than this are stale
  pub ttl_days: i64,
  /// SQLite file (defaults to <data_dir>/dexcache/cache.db)
  pub db_path: Option<PathBuf>,
  /// Roster file (defaults to <data_dir>/dexcache/roster.json)
  pub roster_path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_days: DEFAULT_TTL_DAYS,
      db_path: None,
      roster_path: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
  /// Ids per chunk; also the concurrency bound for batch fetches
  pub chunk_size: usize,
  /// Pause between chunks
  pub chunk_delay_ms: u64,
  /// How many ids `prefetch` warms when no count is given
  pub count: u32,
}

impl Default for PrefetchConfig {
  fn default() -> Self {
    Self {
      chunk_size: 20,
      chunk_delay_ms: 100,
      count: 151,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./dexcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/dexcache/config.yaml
  ///
  /// With no file found, every setting takes its default.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };
    config.validate()?;
    Ok(config)
  }

  /// Reject settings that would make every record stale or overflow the
  /// TTL arithmetic.
  fn validate(&self) -> Result<()> {
    let ttl = self.cache.ttl_days;
    if !(1..=MAX_TTL_DAYS).contains(&ttl) {
      return Err(eyre!(
        "cache.ttl_days must be between 1 and {}, got {}",
        MAX_TTL_DAYS,
        ttl
      ));
    }
    if self.prefetch.chunk_size == 0 {
      return Err(eyre!("prefetch.chunk_size must be at least 1"));
    }
    Ok(())
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("dexcache.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("dexcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a YAML null, not a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }
}

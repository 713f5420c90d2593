//! Flat JSON file cache for the full id/name roster.
//!
//! Lives outside the local store and has no TTL: it is read when present and
//! overwritten only when the roster is fetched again.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;

pub struct RosterCache {
  path: PathBuf,
}

impl RosterCache {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the roster. A missing or unparseable file is a miss.
  pub fn load<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
    let contents = match std::fs::read_to_string(&self.path) {
      Ok(contents) => contents,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        warn!(path = %self.path.display(), "Failed to read roster cache: {}", e);
        return None;
      }
    };

    match serde_json::from_str(&contents) {
      Ok(entries) => Some(entries),
      Err(e) => {
        warn!(path = %self.path.display(), "Ignoring corrupt roster cache: {}", e);
        None
      }
    }
  }

  pub fn save<T: Serialize>(&self, entries: &[T]) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string(entries)?;
    std::fs::write(&self.path, contents)?;
    debug!(path = %self.path.display(), count = entries.len(), "Saved roster cache");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let roster = RosterCache::new(dir.path().join("roster.json"));
    assert!(roster.load::<String>().is_none());
  }

  #[test]
  fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let roster = RosterCache::new(dir.path().join("sub").join("roster.json"));
    roster
      .save(&["bulbasaur".to_string(), "ivysaur".to_string()])
      .unwrap();

    assert_eq!(
      roster.load::<String>(),
      Some(vec!["bulbasaur".to_string(), "ivysaur".to_string()])
    );
  }

  #[test]
  fn test_corrupt_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.json");
    std::fs::write(&path, "{not json").unwrap();
    assert!(RosterCache::new(path).load::<String>().is_none());
  }
}

//! Caching implementations for PokeAPI types.

use crate::cache::Cacheable;

use super::types::{Pokemon, Species};

impl Cacheable for Pokemon {
  fn cache_id(&self) -> u32 {
    self.id
  }

  fn cache_name(&self) -> &str {
    &self.name
  }
}

impl Cacheable for Species {
  fn cache_id(&self) -> u32 {
    self.id
  }

  fn cache_name(&self) -> &str {
    &self.name
  }
}

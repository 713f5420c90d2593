//! Generic caching layer for data persistence and offline support.
//!
//! This module provides a PokeAPI-agnostic caching mechanism that:
//! - Stores records by numeric id with a unique name index
//! - Treats records older than the TTL as stale, evaluated at read time
//! - Falls back to stale records when the network is unavailable
//! - Batches and paces bulk fetches

mod layer;
mod roster;
mod storage;
mod traits;

pub use layer::{now_millis, CacheLayer, Lookup, PrefetchReport, DEFAULT_TTL_DAYS};
pub use roster::RosterCache;
pub use storage::LocalStore;
pub use traits::{CachedEntity, Cacheable, Collection};

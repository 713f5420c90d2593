//! PokeAPI transport, wire payloads, domain records and the cached client.

pub mod api_types;
mod cache;
pub mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::CachedPokeClient;
pub use client::RemoteSource;
pub use types::{Pokemon, PokemonSummary, RosterEntry, Species};

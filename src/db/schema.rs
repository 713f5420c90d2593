//! On-disk schema for the local store.

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Additive schema. Every statement must stay `IF NOT EXISTS` so that an
/// upgrade from any older version only creates what is missing.
pub const SCHEMA: &str = r#"
-- Primary entity records
CREATE TABLE IF NOT EXISTS pokemon (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_pokemon_name ON pokemon(name);
CREATE INDEX IF NOT EXISTS idx_pokemon_cached_at ON pokemon(cached_at);

-- Species metadata, same id space as pokemon
CREATE TABLE IF NOT EXISTS species (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_species_cached_at ON species(cached_at);

-- Small auxiliary lookups (type matchups)
CREATE TABLE IF NOT EXISTS type_cache (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    cached_at INTEGER NOT NULL
);

-- User favorites, exempt from sweeps and clear-all
CREATE TABLE IF NOT EXISTS favorites (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at INTEGER NOT NULL
);
"#;

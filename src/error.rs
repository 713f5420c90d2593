//! Error taxonomy for the cache and remote layers.
//!
//! None of these escape the cached client: every public fetch operation
//! recovers locally and reports failure as an absent result.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
  /// The local database could not be opened. Reads degrade to misses.
  #[error("Local storage unavailable: {0}")]
  StorageUnavailable(String),

  #[error("Storage error: {0}")]
  Storage(#[from] rusqlite::Error),

  #[error("Failed to (de)serialize cached record: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Transport error or non-2xx response.
  #[error("Network failure: {0}")]
  NetworkFailure(String),

  /// Payload arrived but is missing required fields.
  #[error("Malformed response: {0}")]
  MalformedResponse(String),

  /// A setting is outside the range the cache can work with.
  #[error("Invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CacheError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      CacheError::MalformedResponse(err.to_string())
    } else {
      CacheError::NetworkFailure(err.to_string())
    }
  }
}

pub type Result<T> = std::result::Result<T, CacheError>;

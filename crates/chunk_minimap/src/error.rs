//! Error types.
//!
//! Nothing in the streaming core is fatal: store failures degrade to an
//! absent chunk and configuration errors are caught before a session is
//! built.

use std::{fmt, io};

/// Failure reading a chunk from the store.
///
/// The request is treated as absent for this load; the chunk is only
/// re-attempted if a later window update requests it again.
#[derive(Debug)]
pub enum StoreError {
  /// Standard I/O error.
  Io(io::Error),
  /// The chunk exists but could not be decoded.
  Corrupt(String),
}

impl fmt::Display for StoreError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {e}"),
      Self::Corrupt(msg) => write!(f, "corrupt chunk: {msg}"),
    }
  }
}

impl std::error::Error for StoreError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Corrupt(_) => None,
    }
  }
}

impl From<io::Error> for StoreError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

/// Error loading or validating a [`StreamingConfig`](crate::StreamingConfig).
#[derive(Debug)]
pub enum ConfigError {
  Io(io::Error),
  Parse(toml::de::Error),
  /// The values parse but violate a streaming invariant.
  Invalid(String),
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "I/O error: {e}"),
      Self::Parse(e) => write!(f, "parse error: {e}"),
      Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io(e) => Some(e),
      Self::Parse(e) => Some(e),
      Self::Invalid(_) => None,
    }
  }
}

impl From<io::Error> for ConfigError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl From<toml::de::Error> for ConfigError {
  fn from(err: toml::de::Error) -> Self {
    Self::Parse(err)
  }
}

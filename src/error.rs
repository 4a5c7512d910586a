use std::fmt;

/// Errors that can occur when building a cache.
///
/// Fetch failures are not represented here: a failed fetch is recorded on
/// the entry itself and surfaced to subscribers, never raised as a crate
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The janitor tick interval was set to zero. The sweeper needs a
  /// non-zero cadence; use `Retention::Forever` to opt out of eviction
  /// instead.
  ZeroTickInterval,
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroTickInterval => write!(f, "janitor tick interval cannot be zero"),
    }
  }
}

impl std::error::Error for BuildError {}

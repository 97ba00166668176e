//! Error types for `retail-core`.

use thiserror::Error;

/// The kind of entity a key belongs to; used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Chain,
  Location,
  Category,
  TimePeriod,
  Store,
  SalesRecord,
}

#[derive(Debug, Error)]
pub enum Error {
  /// A record references a dimension key that was never loaded.
  #[error("referential integrity violation: {entity} {key:?} does not exist")]
  ReferentialIntegrity { entity: Entity, key: String },

  #[error("duplicate {entity} key: {key:?}")]
  DuplicateKey { entity: Entity, key: String },

  #[error("invalid {entity} {key:?}: {reason}")]
  InvalidRecord {
    entity: Entity,
    key:    String,
    reason: String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

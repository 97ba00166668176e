//! Error type for `retail-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] retail_core::Error),

  /// A rule set is empty or malformed; raised before any row is labelled.
  #[error("invalid rule set {name:?}: {reason}")]
  InvalidRuleSet { name: String, reason: String },

  #[error("unknown rule set: {0:?}")]
  UnknownRuleSet(String),

  #[error("rule book parse error: {0}")]
  RuleBookParse(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

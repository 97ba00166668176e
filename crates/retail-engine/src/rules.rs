//! Named collections of rule sets loaded from TOML.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::{
  Error, Result,
  classify::{Rule, RuleSet},
};

const BUILTIN: &str = include_str!("../rules/default.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSetConfig {
  default: String,
  #[serde(default)]
  rules:   Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleBook {
  sets: BTreeMap<String, RuleSet>,
}

impl RuleBook {
  /// Parse and validate every rule set in `source`.
  pub fn from_toml(source: &str) -> Result<Self> {
    let raw: BTreeMap<String, RuleSetConfig> = toml::from_str(source)?;
    let sets = raw
      .into_iter()
      .map(|(name, cfg)| {
        let set = RuleSet::new(name.clone(), cfg.rules, cfg.default)?;
        Ok((name, set))
      })
      .collect::<Result<BTreeMap<_, _>>>()?;
    debug!(count = sets.len(), "parsed rule book");
    Ok(Self { sets })
  }

  /// The rule sets shipped with the engine.
  pub fn builtin() -> Result<Self> { Self::from_toml(BUILTIN) }

  /// Replace or add every rule set from `other`.
  pub fn merge(mut self, other: RuleBook) -> Self {
    self.sets.extend(other.sets);
    self
  }

  pub fn insert(&mut self, set: RuleSet) {
    self.sets.insert(set.name().to_owned(), set);
  }

  pub fn get(&self, name: &str) -> Result<&RuleSet> {
    self
      .sets
      .get(name)
      .ok_or_else(|| Error::UnknownRuleSet(name.to_owned()))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.sets.keys().map(String::as_str)
  }
}

//! Ordered threshold rules mapping a summary row to a label.
//!
//! A [`RuleSet`] is evaluated top to bottom and the first matching rule wins.
//! Comparisons read numeric columns only; a comparison against a missing or
//! textual value never matches, so rows with undefined metrics fall through
//! to the default label.

use std::fmt;

use retail_core::value::Row;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Comparison {
  #[serde(alias = ">")]
  Gt,
  #[serde(alias = ">=")]
  Ge,
  #[serde(alias = "<")]
  Lt,
  #[serde(alias = "<=")]
  Le,
  #[serde(alias = "==")]
  Eq,
  #[serde(alias = "!=")]
  Ne,
}

impl Comparison {
  fn holds(self, left: Decimal, right: Decimal) -> bool {
    match self {
      Self::Gt => left > right,
      Self::Ge => left >= right,
      Self::Lt => left < right,
      Self::Le => left <= right,
      Self::Eq => left == right,
      Self::Ne => left != right,
    }
  }
}

/// A boolean condition over a row's columns.
///
/// In configuration a predicate is one of `{ column, op, value }`,
/// `{ all = [...] }`, `{ any = [...] }` or `{ not = ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
  Compare { column: String, op: Comparison, value: Decimal },
  All { all: Vec<Predicate> },
  Any { any: Vec<Predicate> },
  Not { not: Box<Predicate> },
}

impl Predicate {
  pub fn compare(column: &str, op: Comparison, value: Decimal) -> Self {
    Self::Compare { column: column.to_owned(), op, value }
  }

  pub fn gt(column: &str, value: Decimal) -> Self {
    Self::compare(column, Comparison::Gt, value)
  }

  pub fn lt(column: &str, value: Decimal) -> Self {
    Self::compare(column, Comparison::Lt, value)
  }

  pub fn all(preds: impl IntoIterator<Item = Predicate>) -> Self {
    Self::All { all: preds.into_iter().collect() }
  }

  pub fn any(preds: impl IntoIterator<Item = Predicate>) -> Self {
    Self::Any { any: preds.into_iter().collect() }
  }

  pub fn negate(pred: Predicate) -> Self { Self::Not { not: Box::new(pred) } }

  pub fn matches(&self, row: &Row) -> bool {
    match self {
      Self::Compare { column, op, value } => row
        .decimal(column)
        .is_some_and(|v| op.holds(v, *value)),
      Self::All { all } => all.iter().all(|p| p.matches(row)),
      Self::Any { any } => any.iter().any(|p| p.matches(row)),
      Self::Not { not } => !not.matches(row),
    }
  }

  fn check(&self) -> std::result::Result<(), String> {
    match self {
      Self::Compare { column, .. } if column.trim().is_empty() => {
        Err("comparison with a blank column".into())
      }
      Self::Compare { .. } => Ok(()),
      Self::All { all: preds } | Self::Any { any: preds } => {
        if preds.is_empty() {
          return Err("empty all/any combination".into());
        }
        preds.iter().try_for_each(Predicate::check)
      }
      Self::Not { not } => not.check(),
    }
  }
}

impl fmt::Display for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Compare { column, op, value } => write!(f, "{column} {op} {value}"),
      Self::All { all } => write_joined(f, all, "and"),
      Self::Any { any } => write_joined(f, any, "or"),
      Self::Not { not } => write!(f, "not {not}"),
    }
  }
}

fn write_joined(f: &mut fmt::Formatter<'_>, preds: &[Predicate], sep: &str) -> fmt::Result {
  write!(f, "(")?;
  for (i, p) in preds.iter().enumerate() {
    if i > 0 {
      write!(f, " {sep} ")?;
    }
    write!(f, "{p}")?;
  }
  write!(f, ")")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
  pub when:  Predicate,
  pub label: String,
}

impl Rule {
  pub fn new(when: Predicate, label: impl Into<String>) -> Self {
    Self { when, label: label.into() }
  }
}

/// A validated, ordered list of rules plus the fallback label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
  name:    String,
  rules:   Vec<Rule>,
  default: String,
}

impl RuleSet {
  /// Fails with [`Error::InvalidRuleSet`] when the rule list is empty, a
  /// label is blank, or a predicate is malformed.
  pub fn new(
    name: impl Into<String>,
    rules: Vec<Rule>,
    default: impl Into<String>,
  ) -> Result<Self> {
    let name = name.into();
    let default = default.into();
    let invalid = |reason: String| Error::InvalidRuleSet {
      name:   name.clone(),
      reason,
    };

    if rules.is_empty() {
      return Err(invalid("no rules".into()));
    }
    if default.trim().is_empty() {
      return Err(invalid("blank default label".into()));
    }
    for (i, rule) in rules.iter().enumerate() {
      if rule.label.trim().is_empty() {
        return Err(invalid(format!("rule {i} has a blank label")));
      }
      rule
        .when
        .check()
        .map_err(|reason| invalid(format!("rule {i}: {reason}")))?;
    }

    Ok(Self { name, rules, default })
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn rules(&self) -> &[Rule] { &self.rules }

  pub fn default_label(&self) -> &str { &self.default }

  pub fn is_default(&self, label: &str) -> bool { self.default == label }
}

/// The label of the first rule whose predicate matches `row`.
pub fn classify<'r>(row: &Row, rule_set: &'r RuleSet) -> &'r str {
  rule_set
    .rules
    .iter()
    .find(|r| r.when.matches(row))
    .map_or(rule_set.default.as_str(), |r| r.label.as_str())
}

/// Classify every row and write the label into `output`.
pub fn label_rows(rows: &mut [Row], rule_set: &RuleSet, output: &str) {
  for row in rows.iter_mut() {
    let label = classify(row, rule_set).to_owned();
    row.set(output, label);
  }
}

//! Result values and rows.
//!
//! Every view produced by the engine is a sequence of [`Row`]s: ordered
//! `(column, Value)` pairs. [`Value::Missing`] is a first-class member of the
//! value domain; undefined ratios (zero denominators, first periods of a
//! series) are represented with it instead of a numeric stand-in.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{
  Deserialize, Serialize, Serializer,
  ser::SerializeMap,
};

// ─── Value ───────────────────────────────────────────────────────────────────

/// A single cell of a result row.
///
/// The derived ordering (`Missing` < `Count` < `Decimal` < `Text`) is only
/// used for hashing and grouping; numeric comparisons go through
/// [`Value::compare`], which treats counts and decimals as one domain.
#[derive(
  Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
#[serde(untagged)]
pub enum Value {
  /// No value: undefined ratio, empty aggregate, or absent column.
  #[default]
  Missing,
  Count(u64),
  Decimal(Decimal),
  Text(String),
}

static MISSING: Value = Value::Missing;

impl Value {
  pub fn is_missing(&self) -> bool { matches!(self, Self::Missing) }

  /// Numeric view of the value. Counts widen losslessly to `Decimal`.
  pub fn as_decimal(&self) -> Option<Decimal> {
    match self {
      Self::Count(n) => Some(Decimal::from(*n)),
      Self::Decimal(d) => Some(*d),
      Self::Missing | Self::Text(_) => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Ordering used for sorting and ranking: numbers compare numerically
  /// regardless of representation, text lexically, and `Missing` sorts
  /// before everything else.
  pub fn compare(&self, other: &Self) -> Ordering {
    match (self.as_decimal(), other.as_decimal()) {
      (Some(a), Some(b)) => a.cmp(&b),
      _ => self.cmp(other),
    }
  }
}

impl From<Decimal> for Value {
  fn from(d: Decimal) -> Self { Self::Decimal(d) }
}

impl From<Option<Decimal>> for Value {
  fn from(d: Option<Decimal>) -> Self { d.map_or(Self::Missing, Self::Decimal) }
}

impl From<u64> for Value {
  fn from(n: u64) -> Self { Self::Count(n) }
}

impl From<u32> for Value {
  fn from(n: u32) -> Self { Self::Count(u64::from(n)) }
}

impl From<String> for Value {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self { Self::Count(u64::from(b)) }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One summary row: named columns in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
  columns: Vec<(String, Value)>,
}

impl Row {
  pub fn new() -> Self { Self::default() }

  pub fn with_capacity(n: usize) -> Self {
    Self { columns: Vec::with_capacity(n) }
  }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self
      .columns
      .iter()
      .find(|(name, _)| name == column)
      .map(|(_, v)| v)
  }

  /// Like [`Row::get`], but an absent column reads as [`Value::Missing`].
  pub fn value(&self, column: &str) -> &Value {
    self.get(column).unwrap_or(&MISSING)
  }

  pub fn decimal(&self, column: &str) -> Option<Decimal> {
    self.value(column).as_decimal()
  }

  /// Replace the column if present, otherwise append it.
  pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
    let column = column.into();
    let value = value.into();
    match self.columns.iter_mut().find(|(name, _)| *name == column) {
      Some((_, slot)) => *slot = value,
      None => self.columns.push((column, value)),
    }
  }

  pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.columns.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize { self.columns.len() }

  pub fn is_empty(&self) -> bool { self.columns.is_empty() }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut row = Row::new();
    for (k, v) in iter {
      row.set(k, v);
    }
    row
  }
}

impl Serialize for Row {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.columns.len()))?;
    for (k, v) in &self.columns {
      map.serialize_entry(k, v)?;
    }
    map.end()
  }
}

// ─── Sorting ─────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  #[default]
  Asc,
  Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
  pub column:    String,
  #[serde(default)]
  pub direction: Direction,
}

impl SortKey {
  pub fn asc(column: impl Into<String>) -> Self {
    Self { column: column.into(), direction: Direction::Asc }
  }

  pub fn desc(column: impl Into<String>) -> Self {
    Self { column: column.into(), direction: Direction::Desc }
  }
}

/// Compare two values under `direction`, placing `Missing` last either way.
pub fn compare_directed(a: &Value, b: &Value, direction: Direction) -> Ordering {
  match (a.is_missing(), b.is_missing()) {
    (true, true) => Ordering::Equal,
    (true, false) => Ordering::Greater,
    (false, true) => Ordering::Less,
    (false, false) => match direction {
      Direction::Asc => a.compare(b),
      Direction::Desc => b.compare(a),
    },
  }
}

/// Lexicographic comparison of two rows over `keys`.
pub fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
  keys
    .iter()
    .map(|k| compare_directed(a.value(&k.column), b.value(&k.column), k.direction))
    .find(|o| o.is_ne())
    .unwrap_or(Ordering::Equal)
}

/// Stable multi-key sort. Rows equal on every key keep their input order.
pub fn sort_rows(rows: &mut [Row], keys: &[SortKey]) {
  rows.sort_by(|a, b| compare_rows(a, b, keys));
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  #[test]
  fn missing_serialises_as_null() {
    let row: Row = [("a", Value::Missing), ("b", Value::Count(3))]
      .into_iter()
      .collect();
    let json = serde_json::to_string(&row).unwrap();
    assert_eq!(json, r#"{"a":null,"b":3}"#);
  }

  #[test]
  fn row_keeps_column_order_and_replaces_in_place() {
    let mut row = Row::new();
    row.set("z", 1u64);
    row.set("a", 2u64);
    row.set("z", 5u64);
    let names: Vec<_> = row.columns().map(|(k, _)| k).collect();
    assert_eq!(names, ["z", "a"]);
    assert_eq!(row.value("z"), &Value::Count(5));
    assert!(row.value("nope").is_missing());
  }

  #[test]
  fn count_and_decimal_compare_numerically() {
    assert_eq!(Value::Count(2).compare(&Value::Decimal(dec!(1.5))), Ordering::Greater);
    assert_eq!(Value::Decimal(dec!(10.0)).compare(&Value::Decimal(dec!(10))), Ordering::Equal);
  }

  #[test]
  fn sort_puts_missing_last_in_both_directions() {
    let mut rows: Vec<Row> = [Value::Missing, dec!(1).into(), dec!(3).into()]
      .into_iter()
      .map(|v| [("m", v)].into_iter().collect())
      .collect();

    sort_rows(&mut rows, &[SortKey::desc("m")]);
    assert_eq!(rows[0].decimal("m"), Some(dec!(3)));
    assert!(rows[2].value("m").is_missing());

    sort_rows(&mut rows, &[SortKey::asc("m")]);
    assert_eq!(rows[0].decimal("m"), Some(dec!(1)));
    assert!(rows[2].value("m").is_missing());
  }
}

//! The rollup engine: group facts by a key and reduce each group to a row.
//!
//! Grouping is a single sequential pass that fixes first-seen group order.
//! Reduction of the groups is independent per group, so in
//! [`ExecutionMode::Parallel`] it runs on the rayon pool; the collected rows
//! come back in the same order either way.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use retail_core::{
  field::{Field, Record},
  value::{Row, Value},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReducerKind {
  Sum,
  /// Unweighted arithmetic mean over the group's facts.
  Average,
  CountDistinct,
  Min,
  Max,
}

/// One output column of a rollup: `column = kind(field)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reducer {
  pub column: String,
  pub kind:   ReducerKind,
  pub field:  Field,
}

impl Reducer {
  pub fn new(column: impl Into<String>, kind: ReducerKind, field: Field) -> Self {
    Self { column: column.into(), kind, field }
  }

  pub fn sum(column: impl Into<String>, field: Field) -> Self {
    Self::new(column, ReducerKind::Sum, field)
  }

  pub fn average(column: impl Into<String>, field: Field) -> Self {
    Self::new(column, ReducerKind::Average, field)
  }

  pub fn count_distinct(column: impl Into<String>, field: Field) -> Self {
    Self::new(column, ReducerKind::CountDistinct, field)
  }

  pub fn min(column: impl Into<String>, field: Field) -> Self {
    Self::new(column, ReducerKind::Min, field)
  }

  pub fn max(column: impl Into<String>, field: Field) -> Self {
    Self::new(column, ReducerKind::Max, field)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  #[default]
  Sequential,
  Parallel,
}

// ─── Group keys ──────────────────────────────────────────────────────────────

/// A composite grouping key: named components in output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<(&'static str, Value)>);

impl GroupKey {
  pub fn new() -> Self { Self::default() }

  pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
    self.0.push((column, value.into()));
    self
  }

  pub fn parts(&self) -> &[(&'static str, Value)] { &self.0 }
}

impl FromIterator<(&'static str, Value)> for GroupKey {
  fn from_iter<I: IntoIterator<Item = (&'static str, Value)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Key function grouping by the given fields, each becoming a key column
/// named after the field. An empty slice yields a single all-facts group.
pub fn group_by<R: Record>(fields: &[Field]) -> impl Fn(&R) -> GroupKey + Sync + '_ {
  move |record| {
    fields
      .iter()
      .map(|f| (f.column(), record.value(*f)))
      .collect()
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Roll `facts` up into one row per distinct key.
///
/// Each row holds the key columns followed by one column per reducer.
/// Rows come out in first-seen key order for both execution modes.
pub fn aggregate<R, K>(
  facts: &[R],
  key_fn: K,
  reducers: &[Reducer],
  mode: ExecutionMode,
) -> Vec<Row>
where
  R: Record,
  K: Fn(&R) -> GroupKey + Sync,
{
  let keys: Vec<GroupKey> = match mode {
    ExecutionMode::Sequential => facts.iter().map(&key_fn).collect(),
    ExecutionMode::Parallel => facts.par_iter().map(&key_fn).collect(),
  };
  let groups = partition(facts, keys);

  debug!(
    facts = facts.len(),
    groups = groups.len(),
    reducers = reducers.len(),
    ?mode,
    "rollup"
  );

  match mode {
    ExecutionMode::Sequential => groups
      .into_iter()
      .map(|(key, members)| reduce_group(key, &members, reducers))
      .collect(),
    ExecutionMode::Parallel => groups
      .into_par_iter()
      .map(|(key, members)| reduce_group(key, &members, reducers))
      .collect(),
  }
}

/// The row a reducer list yields over no facts: distinct counts are zero
/// and every other column is missing.
pub fn empty_row(reducers: &[Reducer]) -> Row {
  let mut row = Row::with_capacity(reducers.len());
  for reducer in reducers {
    row.set(reducer.column.as_str(), Accumulator::new(reducer.kind).finish());
  }
  row
}

fn partition<R>(facts: &[R], keys: Vec<GroupKey>) -> Vec<(GroupKey, Vec<&R>)> {
  let mut index: HashMap<GroupKey, usize> = HashMap::new();
  let mut groups: Vec<(GroupKey, Vec<&R>)> = Vec::new();
  for (fact, key) in facts.iter().zip(keys) {
    match index.get(&key) {
      Some(&i) => groups[i].1.push(fact),
      None => {
        index.insert(key.clone(), groups.len());
        groups.push((key, vec![fact]));
      }
    }
  }
  groups
}

fn reduce_group<R: Record>(key: GroupKey, members: &[&R], reducers: &[Reducer]) -> Row {
  let mut row = Row::with_capacity(key.0.len() + reducers.len());
  for (column, value) in key.0 {
    row.set(column, value);
  }
  for reducer in reducers {
    let mut acc = Accumulator::new(reducer.kind);
    for fact in members {
      acc.push(fact.value(reducer.field));
    }
    row.set(reducer.column.as_str(), acc.finish());
  }
  row
}

// ─── Accumulators ────────────────────────────────────────────────────────────

enum Accumulator {
  Sum(Option<Value>),
  /// `total` is `None` once the running sum has overflowed.
  Average { total: Option<Decimal>, n: u64 },
  CountDistinct(HashSet<Value>),
  Min(Option<Value>),
  Max(Option<Value>),
}

impl Accumulator {
  fn new(kind: ReducerKind) -> Self {
    match kind {
      ReducerKind::Sum => Self::Sum(None),
      ReducerKind::Average => Self::Average { total: Some(Decimal::ZERO), n: 0 },
      ReducerKind::CountDistinct => Self::CountDistinct(HashSet::new()),
      ReducerKind::Min => Self::Min(None),
      ReducerKind::Max => Self::Max(None),
    }
  }

  /// Missing values are skipped by every reducer.
  fn push(&mut self, value: Value) {
    if value.is_missing() {
      return;
    }
    match self {
      Self::Sum(acc) => *acc = Some(add(acc.take(), value)),
      Self::Average { total, n } => {
        if let Some(d) = value.as_decimal() {
          *total = total.and_then(|t| t.checked_add(d));
          *n += 1;
        }
      }
      Self::CountDistinct(seen) => {
        seen.insert(value);
      }
      Self::Min(acc) => {
        if acc.as_ref().is_none_or(|cur| value.compare(cur).is_lt()) {
          *acc = Some(value);
        }
      }
      Self::Max(acc) => {
        if acc.as_ref().is_none_or(|cur| value.compare(cur).is_gt()) {
          *acc = Some(value);
        }
      }
    }
  }

  fn finish(self) -> Value {
    match self {
      Self::Sum(acc) | Self::Min(acc) | Self::Max(acc) => {
        acc.unwrap_or(Value::Missing)
      }
      Self::Average { total, n } => {
        if n == 0 {
          Value::Missing
        } else {
          total.and_then(|t| t.checked_div(Decimal::from(n))).into()
        }
      }
      Self::CountDistinct(seen) => Value::Count(seen.len() as u64),
    }
  }
}

/// Exact addition. Counts stay integral until they would overflow `u64`.
///
/// A sum that leaves the [`Decimal`] range becomes [`Value::Missing`] and
/// stays missing for the rest of the group.
fn add(acc: Option<Value>, value: Value) -> Value {
  match (acc, value) {
    (None, v) => v,
    (Some(Value::Missing), _) => Value::Missing,
    (Some(Value::Count(a)), Value::Count(b)) => match a.checked_add(b) {
      Some(n) => Value::Count(n),
      None => Decimal::from(a).checked_add(Decimal::from(b)).into(),
    },
    (Some(a), b) => match (a.as_decimal(), b.as_decimal()) {
      (Some(x), Some(y)) => x.checked_add(y).into(),
      _ => a,
    },
  }
}

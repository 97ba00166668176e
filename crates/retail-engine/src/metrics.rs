//! Derived metrics over summary rows.
//!
//! Each transform reads existing columns and writes exactly one output
//! column; none of them reorder rows. Undefined results (zero denominators,
//! the first period of a series, missing inputs) are written as
//! [`Value::Missing`], never as a numeric stand-in.

use std::collections::HashMap;

use retail_core::value::{
  Direction, Row, SortKey, Value, compare_directed, compare_rows,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Configuration ───────────────────────────────────────────────────────────

/// How equal sort values are ranked. Only competition ranking is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TiePolicy {
  /// Ties share a rank; the next distinct value skips ahead ("1, 1, 3").
  #[default]
  Competition,
}

/// What an undefined growth or share is written as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullPolicy {
  /// [`Value::Missing`].
  #[default]
  NoValue,
}

/// Period-over-period change in percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Growth {
  pub value:       String,
  /// Temporal key, most significant first (e.g. `["year", "month"]`).
  pub order_by:    Vec<String>,
  /// Columns identifying independent series; empty means one series.
  #[serde(default)]
  pub series_by:   Vec<String>,
  #[serde(default)]
  pub null_policy: NullPolicy,
  pub output:      String,
}

/// Competition ranking ("1, 1, 3") of `by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rank {
  pub by:           String,
  #[serde(default = "descending")]
  pub direction:    Direction,
  #[serde(default)]
  pub partition_by: Vec<String>,
  #[serde(default)]
  pub tie_policy:   TiePolicy,
  pub output:       String,
}

/// `value / Σ value × 100` within each partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Share {
  pub value:        String,
  #[serde(default)]
  pub partition_by: Vec<String>,
  #[serde(default)]
  pub null_policy:  NullPolicy,
  pub output:       String,
}

/// `numerator / denominator × scale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ratio {
  pub numerator:   String,
  pub denominator: String,
  #[serde(default = "unit")]
  pub scale:       Decimal,
  pub output:      String,
}

/// `left × right × scale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Product {
  pub left:   String,
  pub right:  String,
  #[serde(default = "unit")]
  pub scale:  Decimal,
  pub output: String,
}

fn descending() -> Direction { Direction::Desc }

fn unit() -> Decimal { Decimal::ONE }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Derivation {
  Growth(Growth),
  Rank(Rank),
  Share(Share),
  Ratio(Ratio),
  Product(Product),
}

impl Derivation {
  pub fn growth(value: &str, order_by: &[&str], output: &str) -> Self {
    Self::Growth(Growth {
      value:       value.into(),
      order_by:    order_by.iter().map(|s| (*s).to_owned()).collect(),
      series_by:   Vec::new(),
      null_policy: NullPolicy::NoValue,
      output:      output.into(),
    })
  }

  pub fn rank(by: &str, direction: Direction, output: &str) -> Self {
    Self::Rank(Rank {
      by: by.into(),
      direction,
      partition_by: Vec::new(),
      tie_policy: TiePolicy::Competition,
      output: output.into(),
    })
  }

  pub fn share(value: &str, partition_by: &[&str], output: &str) -> Self {
    Self::Share(Share {
      value:        value.into(),
      partition_by: partition_by.iter().map(|s| (*s).to_owned()).collect(),
      null_policy:  NullPolicy::NoValue,
      output:       output.into(),
    })
  }

  pub fn ratio(numerator: &str, denominator: &str, scale: Decimal, output: &str) -> Self {
    Self::Ratio(Ratio {
      numerator: numerator.into(),
      denominator: denominator.into(),
      scale,
      output: output.into(),
    })
  }

  pub fn product(left: &str, right: &str, scale: Decimal, output: &str) -> Self {
    Self::Product(Product {
      left: left.into(),
      right: right.into(),
      scale,
      output: output.into(),
    })
  }

  pub fn apply(&self, rows: &mut [Row]) {
    match self {
      Self::Growth(g) => growth(rows, g),
      Self::Rank(r) => rank(rows, r),
      Self::Share(s) => share(rows, s),
      Self::Ratio(r) => ratio(rows, r),
      Self::Product(p) => product(rows, p),
    }
  }
}

/// Apply `derivations` in order; later ones may read earlier outputs.
pub fn derive(rows: &mut [Row], derivations: &[Derivation]) {
  for d in derivations {
    d.apply(rows);
  }
}

// ─── Growth ──────────────────────────────────────────────────────────────────

/// Lag comparison within each series.
///
/// The previous row is the nearest preceding *present* row in `order_by`
/// order. Absent periods are not filled in, so growth across a gap spans the
/// whole gap.
pub fn growth(rows: &mut [Row], config: &Growth) {
  let keys: Vec<SortKey> = config.order_by.iter().map(SortKey::asc).collect();
  let mut order: Vec<usize> = (0..rows.len()).collect();
  order.sort_by(|&a, &b| compare_rows(&rows[a], &rows[b], &keys));

  let mut previous: HashMap<Vec<Value>, Value> = HashMap::new();
  for i in order {
    let series = partition_key(&rows[i], &config.series_by);
    let current = rows[i].value(&config.value).clone();
    let change = previous
      .get(&series)
      .map_or(Value::Missing, |prev| percent_change(prev, &current));
    previous.insert(series, current);
    rows[i].set(config.output.as_str(), change);
  }
}

fn percent_change(previous: &Value, current: &Value) -> Value {
  match (previous.as_decimal(), current.as_decimal()) {
    (Some(prev), Some(cur)) if !prev.is_zero() => cur
      .checked_sub(prev)
      .and_then(|d| d.checked_div(prev))
      .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
      .into(),
    _ => Value::Missing,
  }
}

// ─── Rank ────────────────────────────────────────────────────────────────────

/// Standard competition ranking within each partition.
///
/// Ties share a rank and the next distinct value skips ahead by the tie
/// size. Rows whose `by` value is missing are left unranked.
pub fn rank(rows: &mut [Row], config: &Rank) {
  let mut partitions: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
  for (i, row) in rows.iter().enumerate() {
    if row.value(&config.by).is_missing() {
      continue;
    }
    partitions
      .entry(partition_key(row, &config.partition_by))
      .or_default()
      .push(i);
  }

  let mut ranks: Vec<Value> = vec![Value::Missing; rows.len()];
  for members in partitions.values_mut() {
    members.sort_by(|&a, &b| {
      compare_directed(rows[a].value(&config.by), rows[b].value(&config.by), config.direction)
    });
    let mut current = 0u64;
    for (pos, &i) in members.iter().enumerate() {
      let tied = pos > 0
        && rows[members[pos - 1]]
          .value(&config.by)
          .compare(rows[i].value(&config.by))
          .is_eq();
      if !tied {
        current = pos as u64 + 1;
      }
      ranks[i] = Value::Count(current);
    }
  }

  for (row, r) in rows.iter_mut().zip(ranks) {
    row.set(config.output.as_str(), r);
  }
}

// ─── Share ───────────────────────────────────────────────────────────────────

/// Percentage of the partition total. A zero total leaves the whole
/// partition without a share.
pub fn share(rows: &mut [Row], config: &Share) {
  // `None` marks a partition whose total overflowed.
  let mut totals: HashMap<Vec<Value>, Option<Decimal>> = HashMap::new();
  for row in rows.iter() {
    if let Some(v) = row.decimal(&config.value) {
      let total = totals
        .entry(partition_key(row, &config.partition_by))
        .or_insert(Some(Decimal::ZERO));
      *total = total.and_then(|t| t.checked_add(v));
    }
  }

  for row in rows.iter_mut() {
    let total = totals
      .get(&partition_key(row, &config.partition_by))
      .copied()
      .flatten();
    let value = match (row.decimal(&config.value), total) {
      (Some(v), Some(t)) => scaled_ratio(v, t, Decimal::ONE_HUNDRED),
      _ => Value::Missing,
    };
    row.set(config.output.as_str(), value);
  }
}

// ─── Ratio / Product ─────────────────────────────────────────────────────────

pub fn ratio(rows: &mut [Row], config: &Ratio) {
  for row in rows.iter_mut() {
    let value = match (row.decimal(&config.numerator), row.decimal(&config.denominator)) {
      (Some(n), Some(d)) => scaled_ratio(n, d, config.scale),
      _ => Value::Missing,
    };
    row.set(config.output.as_str(), value);
  }
}

pub fn product(rows: &mut [Row], config: &Product) {
  for row in rows.iter_mut() {
    let value = match (row.decimal(&config.left), row.decimal(&config.right)) {
      (Some(l), Some(r)) => l
        .checked_mul(r)
        .and_then(|p| p.checked_mul(config.scale))
        .into(),
      _ => Value::Missing,
    };
    row.set(config.output.as_str(), value);
  }
}

fn scaled_ratio(numerator: Decimal, denominator: Decimal, scale: Decimal) -> Value {
  if denominator.is_zero() {
    return Value::Missing;
  }
  numerator
    .checked_div(denominator)
    .and_then(|r| r.checked_mul(scale))
    .into()
}

fn partition_key(row: &Row, columns: &[String]) -> Vec<Value> {
  columns.iter().map(|c| row.value(c).clone()).collect()
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  fn rows(column: &str, values: &[Option<Decimal>]) -> Vec<Row> {
    values
      .iter()
      .map(|v| [(column, Value::from(*v))].into_iter().collect())
      .collect()
  }

  fn col(rows: &[Row], column: &str) -> Vec<Value> {
    rows.iter().map(|r| r.value(column).clone()).collect()
  }

  fn period(year: u64, month: u64, sales: Decimal) -> Row {
    [
      ("year", Value::Count(year)),
      ("month", Value::Count(month)),
      ("sales", Value::Decimal(sales)),
    ]
    .into_iter()
    .collect()
  }

  // ── Growth ──────────────────────────────────────────────────────────────

  #[test]
  fn growth_of_two_periods() {
    let mut r = vec![period(2023, 1, dec!(100)), period(2023, 2, dec!(150))];
    growth(&mut r, &growth_config());
    assert!(r[0].value("growth").is_missing());
    assert_eq!(r[1].decimal("growth"), Some(dec!(50)));
  }

  fn growth_config() -> Growth {
    Growth {
      value:       "sales".into(),
      order_by:    vec!["year".into(), "month".into()],
      series_by:   vec![],
      null_policy: NullPolicy::NoValue,
      output:      "growth".into(),
    }
  }

  #[test]
  fn growth_from_zero_is_missing() {
    let mut r = vec![
      period(2023, 1, dec!(0)),
      period(2023, 2, dec!(150)),
      period(2023, 3, dec!(75)),
    ];
    growth(&mut r, &growth_config());
    assert!(r[1].value("growth").is_missing());
    assert_eq!(r[2].decimal("growth"), Some(dec!(-50)));
  }

  #[test]
  fn growth_follows_temporal_order_not_row_order() {
    let mut r = vec![
      period(2024, 1, dec!(300)),
      period(2023, 11, dec!(100)),
      period(2023, 12, dec!(200)),
    ];
    growth(&mut r, &growth_config());
    // Row order is untouched.
    assert_eq!(r[0].decimal("sales"), Some(dec!(300)));
    assert_eq!(r[0].decimal("growth"), Some(dec!(50)));
    assert!(r[1].value("growth").is_missing());
    assert_eq!(r[2].decimal("growth"), Some(dec!(100)));
  }

  #[test]
  fn growth_bridges_gaps() {
    // March is absent; April compares against February.
    let mut r = vec![period(2023, 2, dec!(100)), period(2023, 4, dec!(120))];
    growth(&mut r, &growth_config());
    assert_eq!(r[1].decimal("growth"), Some(dec!(20)));
  }

  #[test]
  fn growth_series_are_independent() {
    let mut r: Vec<Row> = [("A", 1, dec!(10)), ("B", 1, dec!(50)), ("A", 2, dec!(20)), ("B", 2, dec!(25))]
      .into_iter()
      .map(|(chain, month, sales)| {
        [
          ("chain", Value::from(chain)),
          ("month", Value::Count(month)),
          ("sales", Value::Decimal(sales)),
        ]
        .into_iter()
        .collect()
      })
      .collect();
    let config = Growth {
      value:       "sales".into(),
      order_by:    vec!["month".into()],
      series_by:   vec!["chain".into()],
      null_policy: NullPolicy::NoValue,
      output:      "growth".into(),
    };
    growth(&mut r, &config);
    assert_eq!(
      col(&r, "growth"),
      [Value::Missing, Value::Missing, dec!(100).into(), dec!(-50).into()]
    );
  }

  // ── Rank ────────────────────────────────────────────────────────────────

  #[test]
  fn competition_ranking_with_ties() {
    let mut r = rows("margin", &[Some(dec!(10)), Some(dec!(10)), Some(dec!(8)), Some(dec!(5))]);
    rank(&mut r, &Rank {
      by:           "margin".into(),
      direction:    Direction::Desc,
      partition_by: vec![],
      tie_policy:   TiePolicy::Competition,
      output:       "rank".into(),
    });
    assert_eq!(col(&r, "rank"), [1u64, 1, 3, 4].map(Value::Count));
  }

  #[test]
  fn ranking_is_stable_under_permutation() {
    let values = [dec!(3), dec!(7), dec!(7), dec!(1), dec!(3.0), dec!(9)];
    let config = Rank {
      by:           "v".into(),
      direction:    Direction::Desc,
      partition_by: vec![],
      tie_policy:   TiePolicy::Competition,
      output:       "rank".into(),
    };

    let mut forward = rows("v", &values.map(Some));
    rank(&mut forward, &config);
    let mut reversed = forward.clone();
    reversed.reverse();
    rank(&mut reversed, &config);
    reversed.reverse();
    assert_eq!(forward, reversed);

    for a in &forward {
      for b in &forward {
        let (va, vb) = (a.decimal("v").unwrap(), b.decimal("v").unwrap());
        let (ra, rb) = (a.decimal("rank").unwrap(), b.decimal("rank").unwrap());
        if va == vb {
          assert_eq!(ra, rb);
        } else if va > vb {
          assert!(ra < rb);
        }
      }
    }
  }

  #[test]
  fn ascending_rank_and_missing_values() {
    let mut r = rows("v", &[Some(dec!(2)), None, Some(dec!(1))]);
    rank(&mut r, &Rank {
      by:           "v".into(),
      direction:    Direction::Asc,
      partition_by: vec![],
      tie_policy:   TiePolicy::Competition,
      output:       "rank".into(),
    });
    assert_eq!(col(&r, "rank"), [Value::Count(2), Value::Missing, Value::Count(1)]);
  }

  #[test]
  fn independent_rankings_do_not_interfere() {
    let mut r: Vec<Row> = [(dec!(100), dec!(5)), (dec!(300), dec!(2)), (dec!(200), dec!(9))]
      .into_iter()
      .map(|(sales, margin)| [("sales", sales), ("margin", margin)].into_iter().collect())
      .collect();
    derive(&mut r, &[
      Derivation::rank("sales", Direction::Desc, "sales_rank"),
      Derivation::rank("margin", Direction::Desc, "margin_rank"),
    ]);
    assert_eq!(col(&r, "sales_rank"), [3u64, 1, 2].map(Value::Count));
    assert_eq!(col(&r, "margin_rank"), [2u64, 3, 1].map(Value::Count));
  }

  // ── Share ───────────────────────────────────────────────────────────────

  #[test]
  fn overflowing_partition_total_leaves_shares_missing() {
    let mut r: Vec<Row> = [("A", Decimal::MAX), ("A", Decimal::MAX), ("B", dec!(5))]
      .into_iter()
      .map(|(seg, sales)| {
        [("segment", Value::from(seg)), ("sales", Value::Decimal(sales))]
          .into_iter()
          .collect()
      })
      .collect();
    derive(&mut r, &[Derivation::share("sales", &["segment"], "share")]);
    assert!(r[0].value("share").is_missing());
    assert!(r[1].value("share").is_missing());
    assert_eq!(r[2].decimal("share"), Some(dec!(100)));
  }

  #[test]
  fn growth_across_the_decimal_range_is_missing() {
    let mut r = vec![period(2023, 1, Decimal::MIN), period(2023, 2, Decimal::MAX)];
    growth(&mut r, &growth_config());
    assert!(r[1].value("growth").is_missing());
  }

  #[test]
  fn shares_sum_to_one_hundred() {
    let mut r = rows("sales", &[Some(dec!(1)), Some(dec!(1)), Some(dec!(1))]);
    share(&mut r, &Share {
      value:        "sales".into(),
      partition_by: vec![],
      null_policy:  NullPolicy::NoValue,
      output:       "share".into(),
    });
    let total: Decimal = r.iter().filter_map(|row| row.decimal("share")).sum();
    assert!((total - dec!(100)).abs() < dec!(0.000001));
  }

  #[test]
  fn share_within_partition() {
    let mut r: Vec<Row> = [("Premium", dec!(30)), ("Value", dec!(50)), ("Premium", dec!(10))]
      .into_iter()
      .map(|(seg, sales)| {
        [("segment", Value::from(seg)), ("sales", Value::Decimal(sales))]
          .into_iter()
          .collect()
      })
      .collect();
    derive(&mut r, &[
      Derivation::share("sales", &["segment"], "segment_share"),
      Derivation::share("sales", &[], "market_share"),
    ]);
    assert_eq!(col(&r, "segment_share"), [dec!(75), dec!(100), dec!(25)].map(Value::from));
    let market = r[1].decimal("market_share").unwrap();
    assert!((market - dec!(55.5556)).abs() < dec!(0.0001));
  }

  #[test]
  fn share_of_zero_total_is_missing() {
    let mut r = rows("sales", &[Some(dec!(0)), Some(dec!(0)), None]);
    share(&mut r, &Share {
      value:        "sales".into(),
      partition_by: vec![],
      null_policy:  NullPolicy::NoValue,
      output:       "share".into(),
    });
    assert!(r.iter().all(|row| row.value("share").is_missing()));
  }

  // ── Ratio / Product ─────────────────────────────────────────────────────

  #[test]
  fn ratio_with_zero_denominator_is_missing() {
    let mut r: Vec<Row> = [(dec!(500), 0u64), (dec!(500), 4)]
      .into_iter()
      .map(|(sales, sqft)| {
        [("sales", Value::Decimal(sales)), ("sqft", Value::Count(sqft))]
          .into_iter()
          .collect()
      })
      .collect();
    ratio(&mut r, &Ratio {
      numerator:   "sales".into(),
      denominator: "sqft".into(),
      scale:       Decimal::ONE,
      output:      "per_sqft".into(),
    });
    assert!(r[0].value("per_sqft").is_missing());
    assert_eq!(r[1].decimal("per_sqft"), Some(dec!(125)));
  }

  #[test]
  fn product_scales() {
    let mut r: Vec<Row> = vec![
      [("margin", Value::Decimal(dec!(8))), ("customers", Value::Count(250_000))]
        .into_iter()
        .collect(),
    ];
    derive(&mut r, &[Derivation::product("margin", "customers", dec!(0.00001), "roi")]);
    assert_eq!(r[0].decimal("roi"), Some(dec!(20)));
  }

  #[test]
  fn derivations_deserialise_from_config() {
    let d: Vec<Derivation> = serde_json::from_str(
      r#"[
        {"kind":"growth","value":"sales","order_by":["year","month"],"output":"g"},
        {"kind":"rank","by":"sales","output":"r"},
        {"kind":"ratio","numerator":"a","denominator":"b","output":"c"}
      ]"#,
    )
    .unwrap();
    assert_eq!(d[0], Derivation::growth("sales", &["year", "month"], "g"));
    assert_eq!(d[1], Derivation::rank("sales", Direction::Desc, "r"));
    assert_eq!(d[2], Derivation::ratio("a", "b", Decimal::ONE, "c"));
  }

  #[test]
  fn policies_accept_only_their_supported_values() {
    let d: Vec<Derivation> = serde_json::from_str(
      r#"[
        {"kind":"rank","by":"sales","tie_policy":"COMPETITION","output":"r"},
        {"kind":"share","value":"sales","null_policy":"NO_VALUE","output":"s"}
      ]"#,
    )
    .unwrap();
    assert_eq!(d[0], Derivation::rank("sales", Direction::Desc, "r"));
    assert_eq!(d[1], Derivation::share("sales", &[], "s"));

    let dense = r#"{"kind":"rank","by":"sales","tie_policy":"DENSE","output":"r"}"#;
    assert!(serde_json::from_str::<Derivation>(dense).is_err());
    let typo = r#"{"kind":"rank","by":"sales","tie":"COMPETITION","output":"r"}"#;
    assert!(serde_json::from_str::<Derivation>(typo).is_err());
    let zero_fill = r#"{"kind":"growth","value":"v","order_by":[],"null_policy":"ZERO","output":"g"}"#;
    assert!(serde_json::from_str::<Derivation>(zero_fill).is_err());
  }
}

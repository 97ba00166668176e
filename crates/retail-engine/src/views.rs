//! Named result sets.
//!
//! Every [`View`] is a fixed composition of a grouping key, a reducer list,
//! derived metrics, and labelling rule sets. Rule sets are resolved before
//! any fact is touched so a missing rule set fails the run up front.

use retail_core::{
  dataset::{Dataset, JoinedFact},
  dimension::CityTier,
  field::{Field, Record},
  value::{Direction, Row, SortKey, Value, sort_rows},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{
  Result,
  classify::{RuleSet, classify, label_rows},
  metrics::{Derivation, derive},
  rollup::{ExecutionMode, Reducer, aggregate, empty_row, group_by},
  rules::RuleBook,
  stats::{pearson, student_t_test, to_decimal, to_f64},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::EnumIter,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum View {
  MonthlyPerformance,
  ChainPerformance,
  RegionalPerformance,
  TierPerformance,
  CategoryPerformance,
  StorePerformance,
  TopBottomPerformers,
  Alerts,
  SeasonalPattern,
  Overview,
  Correlations,
  TierComparison,
}

impl View {
  pub fn all() -> impl Iterator<Item = View> { View::iter() }

  pub fn name(self) -> &'static str { self.into() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
  /// Size of each half of [`View::TopBottomPerformers`].
  pub limit: usize,
  pub mode:  ExecutionMode,
}

impl Default for ViewOptions {
  fn default() -> Self { Self { limit: 5, mode: ExecutionMode::Sequential } }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult {
  pub view: View,
  pub rows: Vec<Row>,
}

/// One rollup + derive + label + sort pipeline.
struct Plan {
  group_by: &'static [Field],
  reducers: Vec<Reducer>,
  derive:   Vec<Derivation>,
  /// `(rule set, output column)` pairs.
  labels:   &'static [(&'static str, &'static str)],
  sort:     Vec<SortKey>,
}

const PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Fact measures compared pairwise by [`View::Correlations`].
const CORRELATED: [Field; 6] = [
  Field::SalesAmount,
  Field::GrossMarginPct,
  Field::CustomerCount,
  Field::AvgBasketValue,
  Field::InventoryTurnoverRatio,
  Field::SatisfactionScore,
];

/// The city tiers whose per-fact sales [`View::TierComparison`] tests.
const COMPARED_TIERS: (CityTier, CityTier) = (CityTier::Metro, CityTier::Tier1);

// Margin × customers / 100 000.
const ROI_SCALE: Decimal = Decimal::from_parts(1, 0, 0, false, 5);

pub struct ViewEngine<'a> {
  dataset: &'a Dataset,
  rules:   &'a RuleBook,
  options: ViewOptions,
}

impl<'a> ViewEngine<'a> {
  pub fn new(dataset: &'a Dataset, rules: &'a RuleBook, options: ViewOptions) -> Self {
    Self { dataset, rules, options }
  }

  pub fn options(&self) -> ViewOptions { self.options }

  pub fn run(&self, view: View) -> Result<ViewResult> {
    let facts = self.dataset.joined();
    let rows = match view {
      View::MonthlyPerformance => self.execute(&facts, monthly_plan())?,
      View::ChainPerformance => self.execute(&facts, chain_plan())?,
      View::RegionalPerformance => self.execute(&facts, regional_plan())?,
      View::TierPerformance => self.execute(&facts, tier_plan())?,
      View::CategoryPerformance => self.execute(&facts, category_plan())?,
      View::StorePerformance => self.execute(&facts, store_plan())?,
      View::TopBottomPerformers => self.top_bottom(&facts)?,
      View::Alerts => self.alerts(&facts)?,
      View::SeasonalPattern => self.execute(&facts, seasonal_plan())?,
      View::Overview => self.overview(&facts)?,
      View::Correlations => self.correlations(&facts)?,
      View::TierComparison => self.tier_comparison(&facts)?,
    };
    debug!(%view, rows = rows.len(), "assembled view");
    Ok(ViewResult { view, rows })
  }

  fn execute(&self, facts: &[JoinedFact<'_>], plan: Plan) -> Result<Vec<Row>> {
    let labels = plan
      .labels
      .iter()
      .map(|(set, column)| Ok((self.rules.get(set)?, *column)))
      .collect::<Result<Vec<(&RuleSet, &str)>>>()?;

    let mut rows = aggregate(facts, group_by(plan.group_by), &plan.reducers, self.options.mode);
    // A grand total exists even over no facts.
    if rows.is_empty() && plan.group_by.is_empty() {
      rows.push(empty_row(&plan.reducers));
    }
    derive(&mut rows, &plan.derive);
    for (set, column) in labels {
      label_rows(&mut rows, set, column);
    }
    sort_rows(&mut rows, &plan.sort);
    Ok(rows)
  }

  /// Top-N and bottom-N stores by profit margin, built independently and
  /// concatenated. A store can land in both halves when there are fewer
  /// than `2 × limit` stores.
  fn top_bottom(&self, facts: &[JoinedFact<'_>]) -> Result<Vec<Row>> {
    let stores: Vec<Row> = self
      .execute(facts, store_plan())?
      .into_iter()
      .filter(|r| !r.value("profit_margin").is_missing())
      .collect();

    let pick = |direction: Direction, bucket: &str| {
      let mut half = stores.clone();
      sort_rows(&mut half, &[
        SortKey { column: "profit_margin".into(), direction },
        SortKey::asc("store_id"),
      ]);
      half.truncate(self.options.limit);
      for row in &mut half {
        row.set("bucket", bucket);
      }
      half
    };

    let mut rows = pick(Direction::Desc, "top");
    rows.extend(pick(Direction::Asc, "bottom"));
    Ok(rows)
  }

  /// Store rows whose alert level is anything but the rule set's default.
  /// The filter runs on the aggregated rows.
  fn alerts(&self, facts: &[JoinedFact<'_>]) -> Result<Vec<Row>> {
    let alert = self.rules.get("alert_level")?;
    let mut rows = self.execute(facts, store_plan())?;
    rows.retain(|row| !alert.is_default(classify(row, alert)));
    label_rows(&mut rows, alert, "alert_level");
    sort_rows(&mut rows, &[SortKey::asc("profit_margin"), SortKey::asc("store_id")]);
    Ok(rows)
  }

  fn overview(&self, facts: &[JoinedFact<'_>]) -> Result<Vec<Row>> {
    let mut rows = self.execute(facts, overview_plan())?;
    let mut row = rows.pop().unwrap_or_default();
    row.set("record_count", facts.len() as u64);
    for (column, field) in [
      ("best_chain", Field::ChainName),
      ("best_category", Field::CategoryName),
      ("best_region", Field::Region),
    ] {
      row.set(column, self.best_by_margin(facts, field));
    }
    Ok(vec![row])
  }

  /// Pearson correlation of every pair of [`CORRELATED`] measures, one row
  /// per pair in catalogue order. Each pair uses the facts where both
  /// measures are present.
  fn correlations(&self, facts: &[JoinedFact<'_>]) -> Result<Vec<Row>> {
    let strength = self.rules.get("correlation_strength")?;
    let measures: Vec<[Option<f64>; 6]> = facts
      .iter()
      .map(|fact| CORRELATED.map(|field| to_f64(&fact.value(field))))
      .collect();

    let mut rows = Vec::new();
    for (i, a) in CORRELATED.iter().enumerate() {
      for (j, b) in CORRELATED.iter().enumerate().skip(i + 1) {
        let pairs: Vec<(f64, f64)> = measures
          .iter()
          .filter_map(|m| Some((m[i]?, m[j]?)))
          .collect();
        let mut row = Row::with_capacity(5);
        row.set("field_a", a.column());
        row.set("field_b", b.column());
        row.set("observations", pairs.len() as u64);
        row.set(
          "correlation",
          pearson(&pairs).map_or(Value::Missing, |r| to_decimal(r, 4)),
        );
        rows.push(row);
      }
    }
    label_rows(&mut rows, strength, "strength");
    Ok(rows)
  }

  /// Student's t-test of per-fact sales between the two [`COMPARED_TIERS`].
  fn tier_comparison(&self, facts: &[JoinedFact<'_>]) -> Result<Vec<Row>> {
    let significance = self.rules.get("significance")?;
    let (tier_a, tier_b) = (COMPARED_TIERS.0.to_string(), COMPARED_TIERS.1.to_string());
    let sales_in = |tier: &str| -> Vec<f64> {
      facts
        .iter()
        .filter(|f| f.value(Field::Tier).as_text() == Some(tier))
        .filter_map(|f| to_f64(&f.value(Field::SalesAmount)))
        .collect()
    };
    let (a, b) = (sales_in(&tier_a), sales_in(&tier_b));
    let mean = |xs: &[f64]| {
      if xs.is_empty() {
        Value::Missing
      } else {
        to_decimal(xs.iter().sum::<f64>() / xs.len() as f64, 2)
      }
    };

    let mut row = Row::with_capacity(10);
    row.set("tier_a", tier_a.as_str());
    row.set("tier_b", tier_b.as_str());
    row.set("count_a", a.len() as u64);
    row.set("count_b", b.len() as u64);
    row.set("mean_sales_a", mean(&a));
    row.set("mean_sales_b", mean(&b));
    let test = student_t_test(&a, &b);
    row.set("t_statistic", test.map_or(Value::Missing, |t| to_decimal(t.t, 4)));
    row.set(
      "degrees_of_freedom",
      test.map_or(Value::Missing, |t| Value::Count(t.df as u64)),
    );
    row.set("p_value", test.map_or(Value::Missing, |t| to_decimal(t.p_value, 6)));

    let mut rows = vec![row];
    label_rows(&mut rows, significance, "significance");
    Ok(rows)
  }

  /// The `field` value whose facts have the highest average net margin.
  /// Ties go to the first seen.
  fn best_by_margin(&self, facts: &[JoinedFact<'_>], field: Field) -> Value {
    let key = [field];
    let mut rows = aggregate(
      facts,
      group_by(&key),
      &[Reducer::average("avg_margin", Field::NetMarginPct)],
      self.options.mode,
    );
    sort_rows(&mut rows, &[SortKey::desc("avg_margin")]);
    rows
      .first()
      .filter(|r| !r.value("avg_margin").is_missing())
      .map_or(Value::Missing, |r| r.value(field.column()).clone())
  }
}

// ─── Plans ───────────────────────────────────────────────────────────────────

fn monthly_plan() -> Plan {
  Plan {
    group_by: &[Field::Year, Field::Month, Field::YearMonth],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::sum("total_customers", Field::CustomerCount),
    ],
    derive:   vec![
      Derivation::ratio("total_profit", "total_sales", PERCENT, "profit_margin"),
      Derivation::growth("total_sales", &["year", "month"], "sales_growth"),
      Derivation::growth("total_customers", &["year", "month"], "customer_growth"),
    ],
    labels:   &[("growth_trend", "trend")],
    sort:     vec![SortKey::asc("year"), SortKey::asc("month")],
  }
}

fn chain_plan() -> Plan {
  Plan {
    group_by: &[Field::ChainName, Field::ChainType, Field::Segment],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::average("avg_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::average("avg_margin", Field::NetMarginPct),
      Reducer::average("avg_satisfaction", Field::SatisfactionScore),
      Reducer::sum("total_customers", Field::CustomerCount),
      Reducer::count_distinct("store_count", Field::StoreId),
    ],
    derive:   vec![
      Derivation::product("avg_margin", "total_customers", ROI_SCALE, "roi_score"),
      Derivation::share("total_sales", &[], "market_share"),
      Derivation::share("total_sales", &["segment"], "segment_share"),
      Derivation::rank("total_sales", Direction::Desc, "sales_rank"),
      Derivation::rank("avg_margin", Direction::Desc, "margin_rank"),
    ],
    labels:   &[("performance_status", "performance_status")],
    sort:     vec![SortKey::desc("avg_margin"), SortKey::asc("chain_name")],
  }
}

fn regional_plan() -> Plan {
  Plan {
    group_by: &[Field::Region],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::count_distinct("store_count", Field::StoreId),
      Reducer::sum("total_customers", Field::CustomerCount),
    ],
    derive:   vec![
      Derivation::ratio("total_sales", "store_count", Decimal::ONE, "sales_per_store"),
      Derivation::ratio("total_profit", "total_sales", PERCENT, "profit_margin"),
      Derivation::share("total_sales", &[], "market_share"),
      Derivation::rank("total_sales", Direction::Desc, "sales_rank"),
    ],
    labels:   &[("expansion_recommendation", "recommendation")],
    sort:     vec![SortKey::desc("total_sales"), SortKey::asc("region")],
  }
}

fn tier_plan() -> Plan {
  Plan {
    group_by: &[Field::Tier],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::average("avg_margin", Field::NetMarginPct),
      Reducer::average("avg_basket", Field::AvgBasketValue),
      Reducer::average("avg_satisfaction", Field::SatisfactionScore),
    ],
    derive:   vec![Derivation::rank("total_sales", Direction::Desc, "sales_rank")],
    labels:   &[],
    sort:     vec![SortKey::asc("sales_rank"), SortKey::asc("tier")],
  }
}

fn category_plan() -> Plan {
  Plan {
    group_by: &[Field::CategoryName],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::average("avg_gross_margin", Field::GrossMarginPct),
      Reducer::average("avg_net_margin", Field::NetMarginPct),
      Reducer::sum("total_customers", Field::CustomerCount),
      Reducer::average("avg_turnover", Field::InventoryTurnoverRatio),
    ],
    derive:   vec![
      Derivation::share("total_sales", &[], "sales_share"),
      Derivation::share("total_profit", &[], "profit_contribution"),
      Derivation::rank("total_sales", Direction::Desc, "sales_rank"),
    ],
    labels:   &[
      ("category_status", "status"),
      ("turnover_rating", "turnover_rating"),
    ],
    sort:     vec![SortKey::desc("total_sales"), SortKey::asc("category_name")],
  }
}

fn store_plan() -> Plan {
  Plan {
    group_by: &[Field::StoreId, Field::ChainName, Field::Tier],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::sum("total_customers", Field::CustomerCount),
      Reducer::sum("total_items", Field::TotalItemsSold),
      Reducer::average("avg_margin", Field::NetMarginPct),
      Reducer::average("avg_turnover", Field::InventoryTurnoverRatio),
      Reducer::average("avg_satisfaction", Field::SatisfactionScore),
      Reducer::max("size_sqft", Field::SizeSqft),
      Reducer::max("employee_count", Field::EmployeeCount),
    ],
    derive:   vec![
      Derivation::ratio("total_sales", "total_customers", Decimal::ONE, "sales_per_customer"),
      Derivation::ratio("total_sales", "size_sqft", Decimal::ONE, "sales_per_sqft"),
      Derivation::ratio("total_sales", "employee_count", Decimal::ONE, "sales_per_employee"),
      Derivation::ratio("total_profit", "total_sales", PERCENT, "profit_margin"),
      Derivation::rank("profit_margin", Direction::Desc, "margin_rank"),
    ],
    labels:   &[
      ("efficiency_rating", "efficiency_rating"),
      ("performance_status", "performance_status"),
    ],
    sort:     vec![SortKey::asc("margin_rank"), SortKey::asc("store_id")],
  }
}

fn seasonal_plan() -> Plan {
  Plan {
    group_by: &[Field::Month],
    reducers: vec![
      Reducer::average("avg_sales", Field::SalesAmount),
      Reducer::sum("total_sales", Field::SalesAmount),
    ],
    derive:   vec![Derivation::rank("avg_sales", Direction::Desc, "seasonal_rank")],
    labels:   &[],
    sort:     vec![SortKey::asc("month")],
  }
}

fn overview_plan() -> Plan {
  Plan {
    group_by: &[],
    reducers: vec![
      Reducer::sum("total_sales", Field::SalesAmount),
      Reducer::sum("total_profit", Field::NetProfit),
      Reducer::average("avg_margin", Field::NetMarginPct),
      Reducer::count_distinct("store_count", Field::StoreId),
      Reducer::count_distinct("category_count", Field::CategoryName),
      Reducer::count_distinct("period_count", Field::YearMonth),
      Reducer::min("first_date", Field::Date),
      Reducer::max("last_date", Field::Date),
    ],
    derive:   vec![Derivation::ratio(
      "total_profit",
      "total_sales",
      PERCENT,
      "profit_margin",
    )],
    labels:   &[],
    sort:     vec![],
  }
}

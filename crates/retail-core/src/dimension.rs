//! Dimension entities: the descriptive side of the star schema.
//!
//! Dimensions are created at load time and never mutated afterwards. Every
//! enum carries a canonical text form (used in result rows and CSV input)
//! through both `serde` and `strum`.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ─── Chain ───────────────────────────────────────────────────────────────────

/// Retail format of a chain.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum ChainType {
  Hypermarket,
  Supermarket,
  #[serde(rename = "Department Store", alias = "DepartmentStore")]
  #[strum(to_string = "Department Store")]
  DepartmentStore,
}

/// Price positioning of a chain.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Segment {
  Value,
  #[serde(rename = "Mid-Range", alias = "MidRange")]
  #[strum(to_string = "Mid-Range")]
  MidRange,
  Premium,
}

/// A retail chain. Names are unique across the data set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
  pub chain_id:   u32,
  pub name:       String,
  pub chain_type: ChainType,
  pub segment:    Segment,
}

// ─── Location ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Region {
  North,
  South,
  East,
  West,
  Central,
}

/// City classification by market size.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum CityTier {
  Metro,
  #[serde(rename = "Tier_1", alias = "Tier1", alias = "Tier 1")]
  #[strum(to_string = "Tier_1")]
  Tier1,
  #[serde(rename = "Tier_2", alias = "Tier2", alias = "Tier 2")]
  #[strum(to_string = "Tier_2")]
  Tier2,
  #[serde(rename = "Tier_3", alias = "Tier3", alias = "Tier 3")]
  #[strum(to_string = "Tier_3")]
  Tier3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
  pub location_id: u32,
  pub city:        String,
  pub state:       String,
  pub region:      Region,
  pub tier:        CityTier,
}

// ─── Category ────────────────────────────────────────────────────────────────

/// A product category. `typical_margin_pct` is reference data only; the
/// engine never aggregates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id:        u32,
  pub name:               String,
  #[serde(default)]
  pub subcategory:        Option<String>,
  #[serde(default)]
  pub typical_margin_pct: Option<Decimal>,
}

// ─── TimePeriod ──────────────────────────────────────────────────────────────

/// One calendar date. Everything except the holiday flag is derived from
/// the date on demand, so the derived attributes cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
  pub date:       NaiveDate,
  #[serde(default)]
  pub is_holiday: bool,
}

impl TimePeriod {
  pub fn new(date: NaiveDate, is_holiday: bool) -> Self {
    Self { date, is_holiday }
  }

  pub fn year(&self) -> i32 { self.date.year() }

  pub fn month(&self) -> u32 { self.date.month() }

  /// Calendar quarter, 1 through 4.
  pub fn quarter(&self) -> u32 { (self.date.month() - 1) / 3 + 1 }

  pub fn day_of_week(&self) -> Weekday { self.date.weekday() }

  pub fn is_weekend(&self) -> bool {
    matches!(self.day_of_week(), Weekday::Sat | Weekday::Sun)
  }

  /// `YYYY-MM`, zero padded.
  pub fn year_month(&self) -> String {
    format!("{:04}-{:02}", self.year(), self.month())
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A physical store. Per-sqft and per-employee ratios are undefined when the
/// corresponding attribute is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
  pub store_id:       String,
  pub chain_id:       u32,
  pub location_id:    u32,
  pub size_sqft:      u32,
  pub employee_count: u32,
  #[serde(default = "default_active")]
  pub is_active:      bool,
}

fn default_active() -> bool { true }

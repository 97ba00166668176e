//! The attribute catalogue of a joined sales fact.
//!
//! [`Field`] names everything a grouping key or reducer may refer to. The
//! names are stable `snake_case` identifiers so they can appear in reducer
//! and view configuration.

use serde::{Deserialize, Serialize};

use crate::{dataset::JoinedFact, value::Value};

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
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Field {
  // ── Time ────────────────────────────────────────────────────────────────
  Date,
  Year,
  Quarter,
  Month,
  YearMonth,
  DayOfWeek,
  IsWeekend,
  IsHoliday,

  // ── Chain ───────────────────────────────────────────────────────────────
  ChainName,
  ChainType,
  Segment,

  // ── Location ────────────────────────────────────────────────────────────
  City,
  State,
  Region,
  Tier,

  // ── Category ────────────────────────────────────────────────────────────
  CategoryName,
  Subcategory,

  // ── Store ───────────────────────────────────────────────────────────────
  StoreId,
  SizeSqft,
  EmployeeCount,
  IsActive,

  // ── Measures ────────────────────────────────────────────────────────────
  SalesAmount,
  CostOfGoods,
  GrossProfit,
  NetProfit,
  OperatingCost,
  RentCost,
  StaffCost,
  UtilitiesCost,
  MarketingCost,
  OtherCost,
  GrossMarginPct,
  NetMarginPct,
  CustomerCount,
  TotalItemsSold,
  AvgBasketValue,
  InventoryTurnoverRatio,
  SatisfactionScore,
}

impl Field {
  /// The column name this field takes in a result row.
  pub fn column(self) -> &'static str { self.into() }
}

/// Anything the rollup engine can read fields from.
pub trait Record: Sync {
  fn value(&self, field: Field) -> Value;
}

impl Record for JoinedFact<'_> {
  fn value(&self, field: Field) -> Value {
    let r = self.record;
    match field {
      Field::Date => Value::Text(self.period.date.to_string()),
      Field::Year => u64::try_from(self.period.year()).map_or(Value::Missing, Value::Count),
      Field::Quarter => self.period.quarter().into(),
      Field::Month => self.period.month().into(),
      Field::YearMonth => Value::Text(self.period.year_month()),
      Field::DayOfWeek => Value::Text(self.period.day_of_week().to_string()),
      Field::IsWeekend => self.period.is_weekend().into(),
      Field::IsHoliday => self.period.is_holiday.into(),

      Field::ChainName => self.chain.name.as_str().into(),
      Field::ChainType => Value::Text(self.chain.chain_type.to_string()),
      Field::Segment => Value::Text(self.chain.segment.to_string()),

      Field::City => self.location.city.as_str().into(),
      Field::State => self.location.state.as_str().into(),
      Field::Region => Value::Text(self.location.region.to_string()),
      Field::Tier => Value::Text(self.location.tier.to_string()),

      Field::CategoryName => self.category.name.as_str().into(),
      Field::Subcategory => self
        .category
        .subcategory
        .as_deref()
        .map_or(Value::Missing, Value::from),

      Field::StoreId => self.store.store_id.as_str().into(),
      Field::SizeSqft => self.store.size_sqft.into(),
      Field::EmployeeCount => self.store.employee_count.into(),
      Field::IsActive => self.store.is_active.into(),

      Field::SalesAmount => r.sales_amount.into(),
      Field::CostOfGoods => r.cost_of_goods.into(),
      Field::GrossProfit => r.gross_profit.into(),
      Field::NetProfit => r.net_profit.into(),
      Field::OperatingCost => r.total_operating_cost().into(),
      Field::RentCost => r.operating_costs.rent.into(),
      Field::StaffCost => r.operating_costs.staff.into(),
      Field::UtilitiesCost => r.operating_costs.utilities.into(),
      Field::MarketingCost => r.operating_costs.marketing.into(),
      Field::OtherCost => r.operating_costs.other.into(),
      Field::GrossMarginPct => r.gross_margin_pct().into(),
      Field::NetMarginPct => r.net_margin_pct().into(),
      Field::CustomerCount => r.customer_count.into(),
      Field::TotalItemsSold => r.total_items_sold.into(),
      Field::AvgBasketValue => r.avg_basket_value.into(),
      Field::InventoryTurnoverRatio => r.inventory_turnover_ratio.into(),
      Field::SatisfactionScore => r.satisfaction_score.into(),
    }
  }
}

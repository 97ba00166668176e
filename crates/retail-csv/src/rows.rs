//! Flat CSV row shapes that need more than a plain derive.
//!
//! Monetary columns go through `rust_decimal::serde::str` so values are
//! parsed from their text form and never pass through `f64`.

use chrono::NaiveDate;
use retail_core::{
  dimension::Category,
  sales::{NewSalesRecord, OperatingCosts},
};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRow {
  category_id:        u32,
  name:               String,
  #[serde(default)]
  subcategory:        Option<String>,
  #[serde(default, with = "rust_decimal::serde::str_option")]
  typical_margin_pct: Option<Decimal>,
}

impl From<CategoryRow> for Category {
  fn from(row: CategoryRow) -> Self {
    Category {
      category_id:        row.category_id,
      name:               row.name,
      subcategory:        row.subcategory.filter(|s| !s.trim().is_empty()),
      typical_margin_pct: row.typical_margin_pct,
    }
  }
}

/// One line of `sales.csv`. Operating costs are spread over five columns
/// named like the matching result fields.
#[derive(Debug, Deserialize)]
pub(crate) struct SalesRow {
  store_id:                 String,
  category_id:              u32,
  date:                     NaiveDate,
  #[serde(with = "rust_decimal::serde::str")]
  sales_amount:             Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  cost_of_goods:            Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  rent_cost:                Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  staff_cost:               Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  utilities_cost:           Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  marketing_cost:           Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  other_cost:               Decimal,
  customer_count:           u32,
  total_items_sold:         u32,
  #[serde(with = "rust_decimal::serde::str")]
  avg_basket_value:         Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  inventory_turnover_ratio: Decimal,
  #[serde(with = "rust_decimal::serde::str")]
  satisfaction_score:       Decimal,
}

impl From<SalesRow> for NewSalesRecord {
  fn from(row: SalesRow) -> Self {
    NewSalesRecord {
      store_id:                 row.store_id,
      category_id:              row.category_id,
      date:                     row.date,
      sales_amount:             row.sales_amount,
      cost_of_goods:            row.cost_of_goods,
      operating_costs:          OperatingCosts {
        rent:      row.rent_cost,
        staff:     row.staff_cost,
        utilities: row.utilities_cost,
        marketing: row.marketing_cost,
        other:     row.other_cost,
      },
      customer_count:           row.customer_count,
      total_items_sold:         row.total_items_sold,
      avg_basket_value:         row.avg_basket_value,
      inventory_turnover_ratio: row.inventory_turnover_ratio,
      satisfaction_score:       row.satisfaction_score,
    }
  }
}

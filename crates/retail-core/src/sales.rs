//! The sales fact.
//!
//! One `SalesRecord` per store, category and date. Profit figures are fixed
//! when the record is built from a [`NewSalesRecord`] and never recomputed
//! downstream.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Entity, Error, Result};

// ─── Operating costs ─────────────────────────────────────────────────────────

/// The five operating-cost components charged against a sale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingCosts {
  pub rent:      Decimal,
  pub staff:     Decimal,
  pub utilities: Decimal,
  pub marketing: Decimal,
  pub other:     Decimal,
}

impl OperatingCosts {
  /// `None` when the components overflow a [`Decimal`].
  pub fn total(&self) -> Option<Decimal> {
    [self.staff, self.utilities, self.marketing, self.other]
      .into_iter()
      .try_fold(self.rent, Decimal::checked_add)
  }
}

// ─── NewSalesRecord ──────────────────────────────────────────────────────────

/// Ingestion input for [`SalesRecord::from_new`]. Profit columns are not
/// accepted from callers; they are derived exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSalesRecord {
  pub store_id:                 String,
  pub category_id:              u32,
  pub date:                     NaiveDate,
  pub sales_amount:             Decimal,
  pub cost_of_goods:            Decimal,
  #[serde(flatten)]
  pub operating_costs:          OperatingCosts,
  pub customer_count:           u32,
  pub total_items_sold:         u32,
  pub avg_basket_value:         Decimal,
  pub inventory_turnover_ratio: Decimal,
  pub satisfaction_score:       Decimal,
}

// ─── SalesRecord ─────────────────────────────────────────────────────────────

/// An immutable sales fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesRecord {
  pub store_id:                 String,
  pub category_id:              u32,
  pub date:                     NaiveDate,
  pub sales_amount:             Decimal,
  pub cost_of_goods:            Decimal,
  /// `sales_amount − cost_of_goods`.
  pub gross_profit:             Decimal,
  /// `gross_profit − operating_costs.total()`.
  pub net_profit:               Decimal,
  pub operating_costs:          OperatingCosts,
  pub customer_count:           u32,
  pub total_items_sold:         u32,
  pub avg_basket_value:         Decimal,
  pub inventory_turnover_ratio: Decimal,
  /// 0.0 to 5.0; range checked by [`crate::dataset::Dataset::new`].
  pub satisfaction_score:       Decimal,
}

impl SalesRecord {
  /// Derive the profit columns. Fails when they are not representable.
  pub fn from_new(input: NewSalesRecord) -> Result<Self> {
    let gross_profit = input.sales_amount.checked_sub(input.cost_of_goods);
    let net_profit = gross_profit
      .zip(input.operating_costs.total())
      .and_then(|(gross, costs)| gross.checked_sub(costs));
    let (Some(gross_profit), Some(net_profit)) = (gross_profit, net_profit) else {
      return Err(Error::InvalidRecord {
        entity: Entity::SalesRecord,
        key:    format!("{}/{}/{}", input.store_id, input.category_id, input.date),
        reason: "profit figures overflow".into(),
      });
    };
    Ok(Self {
      store_id: input.store_id,
      category_id: input.category_id,
      date: input.date,
      sales_amount: input.sales_amount,
      cost_of_goods: input.cost_of_goods,
      gross_profit,
      net_profit,
      operating_costs: input.operating_costs,
      customer_count: input.customer_count,
      total_items_sold: input.total_items_sold,
      avg_basket_value: input.avg_basket_value,
      inventory_turnover_ratio: input.inventory_turnover_ratio,
      satisfaction_score: input.satisfaction_score,
    })
  }

  pub fn total_operating_cost(&self) -> Option<Decimal> { self.operating_costs.total() }

  /// Gross profit as a percentage of sales; `None` when there were no sales.
  pub fn gross_margin_pct(&self) -> Option<Decimal> {
    percent_of_sales(self.gross_profit, self.sales_amount)
  }

  /// Net profit as a percentage of sales; `None` when there were no sales.
  pub fn net_margin_pct(&self) -> Option<Decimal> {
    percent_of_sales(self.net_profit, self.sales_amount)
  }
}

fn percent_of_sales(amount: Decimal, sales: Decimal) -> Option<Decimal> {
  if sales.is_zero() {
    return None;
  }
  amount
    .checked_div(sales)
    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  fn input(sales: Decimal, cogs: Decimal) -> NewSalesRecord {
    NewSalesRecord {
      store_id:                 "S001".into(),
      category_id:              1,
      date:                     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
      sales_amount:             sales,
      cost_of_goods:            cogs,
      operating_costs:          OperatingCosts {
        rent:      dec!(10),
        staff:     dec!(20),
        utilities: dec!(5),
        marketing: dec!(3),
        other:     dec!(2),
      },
      customer_count:           10,
      total_items_sold:         25,
      avg_basket_value:         dec!(100),
      inventory_turnover_ratio: dec!(6.5),
      satisfaction_score:       dec!(4.2),
    }
  }

  #[test]
  fn profits_are_fixed_at_construction() {
    let r = SalesRecord::from_new(input(dec!(1000), dec!(700))).unwrap();
    assert_eq!(r.gross_profit, dec!(300));
    assert_eq!(r.total_operating_cost(), Some(dec!(40)));
    assert_eq!(r.net_profit, dec!(260));
    assert_eq!(r.net_margin_pct(), Some(dec!(26)));
    assert_eq!(r.gross_margin_pct(), Some(dec!(30)));
  }

  #[test]
  fn margins_undefined_without_sales() {
    let r = SalesRecord::from_new(input(Decimal::ZERO, Decimal::ZERO)).unwrap();
    assert_eq!(r.net_margin_pct(), None);
    assert_eq!(r.gross_margin_pct(), None);
    assert_eq!(r.net_profit, dec!(-40));
  }

  #[test]
  fn unrepresentable_profit_is_rejected() {
    let err = SalesRecord::from_new(input(Decimal::MIN, dec!(1))).unwrap_err();
    assert!(matches!(err, Error::InvalidRecord { entity: Entity::SalesRecord, .. }));
    assert!(err.to_string().contains("S001/1/2023-01-01"));
  }
}

//! Small in-memory data sets for engine tests.

use std::collections::HashSet;

use chrono::NaiveDate;
use retail_core::{
  dataset::{Dataset, Dimensions},
  dimension::{
    Category, Chain, ChainType, CityTier, Location, Region, Segment, Store,
    TimePeriod,
  },
  sales::{NewSalesRecord, OperatingCosts, SalesRecord},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const GROCERY: u32 = 100;
pub const FASHION: u32 = 200;

/// Three chains, three cities and two categories. Stores, periods and
/// facts are added per test.
pub struct Fixture {
  dims:  Dimensions,
  dates: HashSet<NaiveDate>,
  sales: Vec<SalesRecord>,
}

pub fn month(year: i32, month: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

/// A fact with `sales` revenue, `cogs` cost of goods and no operating
/// costs, so the net margin is `(sales - cogs) / sales`.
pub fn fact(store: &str, category: u32, date: NaiveDate, sales: Decimal, cogs: Decimal) -> NewSalesRecord {
  NewSalesRecord {
    store_id: store.into(),
    category_id: category,
    date,
    sales_amount: sales,
    cost_of_goods: cogs,
    operating_costs: OperatingCosts::default(),
    customer_count: 10,
    total_items_sold: 25,
    avg_basket_value: dec!(50),
    inventory_turnover_ratio: dec!(6),
    satisfaction_score: dec!(4.2),
  }
}

impl Fixture {
  pub fn new() -> Self {
    let chain = |chain_id, name: &str, chain_type, segment| Chain {
      chain_id,
      name: name.into(),
      chain_type,
      segment,
    };
    let location = |location_id, city: &str, state: &str, region, tier| Location {
      location_id,
      city: city.into(),
      state: state.into(),
      region,
      tier,
    };
    let category = |category_id, name: &str| Category {
      category_id,
      name: name.into(),
      subcategory: None,
      typical_margin_pct: None,
    };

    Self {
      dims:  Dimensions {
        chains:     vec![
          chain(1, "Reliance Retail", ChainType::Hypermarket, Segment::MidRange),
          chain(2, "DMart", ChainType::Supermarket, Segment::Value),
          chain(3, "Shoppers Stop", ChainType::DepartmentStore, Segment::Premium),
        ],
        locations:  vec![
          location(10, "Mumbai", "Maharashtra", Region::West, CityTier::Metro),
          location(20, "Lucknow", "Uttar Pradesh", Region::North, CityTier::Tier2),
          location(30, "Chennai", "Tamil Nadu", Region::South, CityTier::Tier1),
        ],
        categories: vec![category(GROCERY, "Grocery"), category(FASHION, "Fashion")],
        periods:    vec![],
        stores:     vec![],
      },
      dates: HashSet::new(),
      sales: vec![],
    }
  }

  pub fn store(mut self, store_id: &str, chain_id: u32, location_id: u32, size_sqft: u32) -> Self {
    self.dims.stores.push(Store {
      store_id: store_id.into(),
      chain_id,
      location_id,
      size_sqft,
      employee_count: 20,
      is_active: true,
    });
    self
  }

  /// Add a fact, registering its date as a period on first use.
  pub fn record(mut self, record: NewSalesRecord) -> Self {
    if self.dates.insert(record.date) {
      self.dims.periods.push(TimePeriod::new(record.date, false));
    }
    self.sales.push(SalesRecord::from_new(record).unwrap());
    self
  }

  /// Shorthand for a grocery fact in 2023.
  pub fn sale(self, store: &str, m: u32, sales: Decimal, cogs: Decimal) -> Self {
    self.record(fact(store, GROCERY, month(2023, m), sales, cogs))
  }

  pub fn build(self) -> Dataset { Dataset::new(self.dims, self.sales).unwrap() }
}

//! CSV loader for retail data sets.
//!
//! A data directory holds one file per table, each with a header row of
//! `snake_case` column names:
//!
//! | file             | rows                           |
//! |------------------|--------------------------------|
//! | `chains.csv`     | [`Chain`]                      |
//! | `locations.csv`  | [`Location`]                   |
//! | `categories.csv` | [`Category`]                   |
//! | `periods.csv`    | [`TimePeriod`]                 |
//! | `stores.csv`     | [`Store`]                      |
//! | `sales.csv`      | sales facts, one per line      |
//!
//! The loader only parses; every integrity check happens in
//! [`Dataset::new`].

pub mod error;
mod rows;

use std::path::Path;

pub use error::{Error, Result};
use retail_core::{
  dataset::{Dataset, Dimensions},
  dimension::{Category, Chain, Location, Store, TimePeriod},
  sales::{NewSalesRecord, SalesRecord},
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::rows::{CategoryRow, SalesRow};

/// Load and validate the data set stored under `dir`.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Dataset> {
  let dir = dir.as_ref();

  let dims = Dimensions {
    chains:     read_table::<Chain>(&dir.join("chains.csv"))?,
    locations:  read_table::<Location>(&dir.join("locations.csv"))?,
    categories: read_table::<CategoryRow>(&dir.join("categories.csv"))?
      .into_iter()
      .map(Category::from)
      .collect(),
    periods:    read_table::<TimePeriod>(&dir.join("periods.csv"))?,
    stores:     read_table::<Store>(&dir.join("stores.csv"))?,
  };
  let sales: Vec<SalesRecord> = read_table::<SalesRow>(&dir.join("sales.csv"))?
    .into_iter()
    .map(|row| SalesRecord::from_new(NewSalesRecord::from(row)))
    .collect::<retail_core::Result<_>>()?;

  let dataset = Dataset::new(dims, sales)?;
  info!(
    dir = %dir.display(),
    stores = dataset.stores().len(),
    facts = dataset.sales().len(),
    "loaded data set"
  );
  Ok(dataset)
}

/// Deserialize every row of one headed CSV file.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
  let read_err = |source| Error::Read { file: path.to_path_buf(), source };

  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .trim(csv::Trim::All)
    .from_path(path)
    .map_err(read_err)?;
  let rows = reader
    .deserialize()
    .collect::<Result<Vec<T>, csv::Error>>()
    .map_err(read_err)?;

  debug!(file = %path.display(), rows = rows.len(), "read table");
  Ok(rows)
}

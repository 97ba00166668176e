//! Core types for the retail analytics engine.
//!
//! The dimensional model (chains, locations, categories, time periods,
//! stores), the sales fact, and the row/value vocabulary shared by the
//! aggregation layers. This crate performs no computation beyond load-time
//! validation; all grouping and metric derivation lives in `retail-engine`.

pub mod dataset;
pub mod dimension;
pub mod error;
pub mod field;
pub mod sales;
pub mod value;

pub use error::{Entity, Error, Result};

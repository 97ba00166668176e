//! Aggregation and metric derivation over retail sales facts.
//!
//! Data flows one way: facts are rolled up per group ([`rollup`]), derived
//! columns are attached to the summary rows ([`metrics`]), rows are labelled
//! against threshold rule sets ([`classify`], [`rules`]), and [`views`]
//! composes the three into the named result sets. [`stats`] backs the two
//! fact-level statistical views.
//!
//! Everything here is synchronous and pure. Inputs are borrowed immutable
//! snapshots; the only state produced is the returned rows.

pub mod classify;
pub mod error;
pub mod metrics;
pub mod rollup;
pub mod rules;
pub mod stats;
pub mod views;

pub use error::{Error, Result};

#[cfg(test)]
mod fixture;

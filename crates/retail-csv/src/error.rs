//! Error types for the CSV loader.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read {}: {source}", file.display())]
  Read {
    file:   PathBuf,
    #[source]
    source: csv::Error,
  },

  #[error(transparent)]
  Core(#[from] retail_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

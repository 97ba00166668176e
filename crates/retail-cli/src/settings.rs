//! Runtime settings: `retail.toml` overlaid with `RETAIL_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use retail_engine::{
  rollup::ExecutionMode,
  rules::RuleBook,
  views::ViewOptions,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Directory holding the six input CSV files.
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  /// Optional rule book merged over the built-in rule sets.
  #[serde(default)]
  pub rules:    Option<PathBuf>,
  /// Reduce groups on the rayon pool.
  #[serde(default)]
  pub parallel: bool,
  #[serde(default = "default_limit")]
  pub limit:    usize,
  #[serde(default = "default_host")]
  pub host:     String,
  #[serde(default = "default_port")]
  pub port:     u16,
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }

fn default_limit() -> usize { ViewOptions::default().limit }

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

impl Settings {
  /// Read `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("RETAIL"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn view_options(&self) -> ViewOptions {
    ViewOptions {
      limit: self.limit,
      mode:  if self.parallel {
        ExecutionMode::Parallel
      } else {
        ExecutionMode::Sequential
      },
    }
  }

  /// The built-in rule book, with the user's rule sets merged on top.
  pub fn rule_book(&self) -> anyhow::Result<RuleBook> {
    let builtin = RuleBook::builtin().context("built-in rule book is invalid")?;
    let Some(path) = &self.rules else {
      return Ok(builtin);
    };
    let source = std::fs::read_to_string(path)
      .with_context(|| format!("reading rule book {}", path.display()))?;
    let user = RuleBook::from_toml(&source)
      .with_context(|| format!("parsing rule book {}", path.display()))?;
    Ok(builtin.merge(user))
  }
}

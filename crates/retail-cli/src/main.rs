//! `retail`: command-line front end for the analytics engine.
//!
//! # Usage
//!
//! ```text
//! retail views
//! retail run chain_performance
//! retail --config prod.toml run top_bottom_performers --limit 10
//! retail serve
//! ```
//!
//! Settings come from `retail.toml` (or `--config`) and `RETAIL_*`
//! environment variables, e.g. `RETAIL_DATA_DIR=/srv/retail`.

mod settings;

use std::{
  io::Write as _,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::{Parser, Subcommand};
use retail_api::AnalyticsState;
use retail_engine::views::View;
use settings::Settings;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "retail", version, about = "Retail chain performance analytics")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "retail.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List the available views.
  Views,
  /// Compute one view and print it as JSON.
  Run {
    /// View name, e.g. `store_performance`.
    view:  View,
    /// Size of each half of `top_bottom_performers`.
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Serve the views over HTTP.
  Serve,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Views => {
      for view in View::all() {
        println!("{view}");
      }
      Ok(())
    }
    Command::Run { view, limit } => {
      if limit == Some(0) {
        anyhow::bail!("--limit must be at least 1");
      }
      let (_, state) = load(&cli.config)?;
      let result = state.run(view, limit)?;
      let mut out = std::io::stdout().lock();
      serde_json::to_writer_pretty(&mut out, &result).context("failed to write JSON")?;
      writeln!(out)?;
      Ok(())
    }
    Command::Serve => {
      let (settings, state) = load(&cli.config)?;
      serve(state, &settings).await
    }
  }
}

/// Read settings, then load the data set and rule book they point at.
fn load(config: &Path) -> anyhow::Result<(Settings, Arc<AnalyticsState>)> {
  let settings = Settings::load(config)?;
  let rules = settings.rule_book()?;
  let dataset = retail_csv::load_dir(&settings.data_dir)
    .with_context(|| format!("failed to load data from {}", settings.data_dir.display()))?;
  let state = Arc::new(AnalyticsState::new(dataset, rules, settings.view_options()));
  Ok((settings, state))
}

async fn serve(state: Arc<AnalyticsState>, settings: &Settings) -> anyhow::Result<()> {
  let app = Router::new()
    .nest("/api", retail_api::api_router(state))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", settings.host, settings.port);

  info!("Listening on http://{address}/api/views");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::TempDir;

  use super::*;

  #[test]
  fn views_parses_without_touching_config() {
    let cli = Cli::try_parse_from(["retail", "--config", "/nonexistent/retail.toml", "views"]).unwrap();
    assert!(matches!(cli.command, Command::Views));
  }

  #[test]
  fn run_parses_view_and_limit() {
    let cli = Cli::try_parse_from(["retail", "run", "top_bottom_performers", "--limit", "3"]).unwrap();
    assert!(matches!(
      cli.command,
      Command::Run { view: View::TopBottomPerformers, limit: Some(3) }
    ));
    assert!(Cli::try_parse_from(["retail", "run", "nope"]).is_err());
  }

  #[test]
  fn load_reads_the_sample_data_set() {
    let dir = TempDir::new().unwrap();
    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/sample");
    let cfg = dir.path().join("retail.toml");
    fs::write(&cfg, format!("data_dir = {:?}\nlimit = 2\n", data.display().to_string())).unwrap();

    let (settings, state) = load(&cfg).unwrap();
    assert_eq!(settings.limit, 2);
    let overview = serde_json::to_value(state.run(View::Overview, None).unwrap()).unwrap();
    assert_eq!(overview["rows"][0]["record_count"], 45);
  }
}

//! JSON API over the named analytics views.
//!
//! Exposes an axum [`Router`] backed by one loaded [`Dataset`]. Views are
//! recomputed per request on the blocking pool. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", retail_api::api_router(state.clone()))
//! ```

pub mod error;
pub mod views;

use std::sync::Arc;

use axum::{Router, routing::get};
use retail_core::dataset::Dataset;
use retail_engine::{
  rules::RuleBook,
  views::{View, ViewEngine, ViewOptions, ViewResult},
};

pub use error::ApiError;

/// Everything a request needs to assemble a view.
pub struct AnalyticsState {
  pub dataset: Dataset,
  pub rules:   RuleBook,
  pub options: ViewOptions,
}

impl AnalyticsState {
  pub fn new(dataset: Dataset, rules: RuleBook, options: ViewOptions) -> Self {
    Self { dataset, rules, options }
  }

  /// Run `view`, overriding the configured top-N limit when given.
  pub fn run(&self, view: View, limit: Option<usize>) -> retail_engine::Result<ViewResult> {
    let options = ViewOptions {
      limit: limit.unwrap_or(self.options.limit),
      ..self.options
    };
    ViewEngine::new(&self.dataset, &self.rules, options).run(view)
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router(state: Arc<AnalyticsState>) -> Router<()> {
  Router::new()
    .route("/views", get(views::list))
    .route("/views/{name}", get(views::run))
    .with_state(state)
}

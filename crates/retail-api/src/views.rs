//! Handlers for `/views` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/views` | Names of every view |
//! | `GET`  | `/views/{name}` | Optional `?limit=N` (top/bottom size); 404 for unknown names |

use std::{str::FromStr, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use retail_engine::views::{View, ViewResult};
use serde::Deserialize;
use tracing::debug;

use crate::{AnalyticsState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /views`
pub async fn list() -> Json<Vec<&'static str>> {
  Json(View::all().map(View::name).collect())
}

// ─── Run ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunParams {
  pub limit: Option<usize>,
}

/// `GET /views/{name}[?limit=<n>]`
pub async fn run(
  State(state): State<Arc<AnalyticsState>>,
  Path(name): Path<String>,
  params: Result<Query<RunParams>, QueryRejection>,
) -> Result<Json<ViewResult>, ApiError> {
  let view = View::from_str(&name)
    .map_err(|_| ApiError::NotFound(format!("unknown view {name:?}")))?;
  let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
  if params.limit == Some(0) {
    return Err(ApiError::BadRequest("limit must be at least 1".into()));
  }

  debug!(%view, limit = ?params.limit, "running view");
  let result = tokio::task::spawn_blocking(move || state.run(view, params.limit))
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;
  Ok(Json(result))
}

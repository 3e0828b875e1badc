//! Handlers for `/irrigation` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/irrigation/status` | Creates the default state on first use |
//! | `POST` | `/irrigation/control` | Body: any of `mode`, `is_irrigating`, `auto_mode` |
//! | `GET`  | `/irrigation/history` | `?limit=` (default 10), newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use rootguard_core::{
  control::{ControlState, ControlUpdate},
  controller::Controller,
  session::IrrigationSession,
  store::IrrigationStore,
};
use serde::Deserialize;

use crate::error::ApiError;

/// `GET /irrigation/status`
pub async fn status<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
) -> Result<Json<ControlState>, ApiError> {
  Ok(Json(controller.get_status().await?))
}

/// `POST /irrigation/control`: body: `{"mode":"manual","is_irrigating":true}`
pub async fn control<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Json(update): Json<ControlUpdate>,
) -> Result<Json<ControlState>, ApiError> {
  Ok(Json(controller.apply_control(update).await?))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default = "default_limit")]
  pub limit: usize,
}

fn default_limit() -> usize { 10 }

/// `GET /irrigation/history[?limit=<n>]`
pub async fn history<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<IrrigationSession>>, ApiError> {
  Ok(Json(controller.list_sessions(params.limit).await?))
}

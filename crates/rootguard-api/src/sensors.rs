//! Handlers for sensor and health endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sensors/latest` | 404 until the first reading arrives |
//! | `GET`  | `/sensors/history` | `?limit=` (default 100), newest first |
//! | `GET`  | `/health-score` | 404 until the first reading arrives |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use rootguard_core::{
  controller::Controller, health::HealthAssessment, reading::SensorReading,
  store::IrrigationStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  #[serde(default = "default_limit")]
  pub limit: usize,
}

fn default_limit() -> usize { 100 }

/// `GET /sensors/latest`
pub async fn latest<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
) -> Result<Json<SensorReading>, ApiError> {
  controller
    .latest_reading()
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("no sensor data yet".to_owned()))
}

/// `GET /sensors/history[?limit=<n>]`
pub async fn history<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
  Ok(Json(controller.reading_history(params.limit).await?))
}

/// `GET /health-score`
pub async fn health_score<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
) -> Result<Json<HealthAssessment>, ApiError> {
  controller
    .health()
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("health score not yet computed".to_owned()))
}

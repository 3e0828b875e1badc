//! Handlers for `/alerts` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rootguard_core::{alert::Alert, controller::Controller, store::IrrigationStore};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default = "default_limit")]
  pub limit:       usize,
  #[serde(default = "default_active_only")]
  pub active_only: bool,
}

fn default_limit() -> usize { 10 }

fn default_active_only() -> bool { true }

/// `GET /alerts[?limit=<n>&active_only=<bool>]`
pub async fn list<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
  Ok(Json(controller.list_alerts(params.active_only, params.limit).await?))
}

/// `DELETE /alerts/{id}`: marks the alert dismissed; it is never removed.
pub async fn dismiss<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
  if controller.dismiss_alert(id).await? {
    Ok(Json(json!({ "message": "alert dismissed" })))
  } else {
    Err(ApiError::NotFound(format!("alert {id}")))
  }
}

//! Handlers for `/analytics` endpoints. Every route takes `?days=` (default 7).

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use rootguard_core::{
  analytics::{Analytics, CostSavings, Efficiency, WaterUsage},
  controller::Controller,
  store::IrrigationStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
  #[serde(default = "default_days")]
  pub days: u32,
}

fn default_days() -> u32 { 7 }

/// `GET /analytics/water-usage`
pub async fn water_usage<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<PeriodParams>,
) -> Result<Json<WaterUsage>, ApiError> {
  Ok(Json(controller.analytics(params.days).await?.water_usage))
}

/// `GET /analytics/cost-savings`
pub async fn cost_savings<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<PeriodParams>,
) -> Result<Json<CostSavings>, ApiError> {
  Ok(Json(controller.analytics(params.days).await?.cost_savings))
}

/// `GET /analytics/efficiency`
pub async fn efficiency<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<PeriodParams>,
) -> Result<Json<Efficiency>, ApiError> {
  Ok(Json(controller.analytics(params.days).await?.efficiency))
}

/// `GET /analytics/comprehensive`
pub async fn comprehensive<S: IrrigationStore>(
  State(controller): State<Arc<Controller<S>>>,
  Query(params): Query<PeriodParams>,
) -> Result<Json<Analytics>, ApiError> {
  Ok(Json(controller.analytics(params.days).await?))
}

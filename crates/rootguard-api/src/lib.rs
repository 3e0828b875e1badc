//! JSON REST API for RootGuard.
//!
//! Exposes an axum [`Router`] backed by a [`Controller`] over any
//! [`IrrigationStore`]. TLS, CORS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rootguard_api::api_router(controller.clone()))
//! ```

pub mod alerts;
pub mod analytics;
pub mod error;
pub mod irrigation;
pub mod sensors;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use rootguard_core::{controller::Controller, store::IrrigationStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `controller`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(controller: Arc<Controller<S>>) -> Router<()>
where
  S: IrrigationStore + 'static,
{
  Router::new()
    // Sensors
    .route("/sensors/latest", get(sensors::latest::<S>))
    .route("/sensors/history", get(sensors::history::<S>))
    .route("/health-score", get(sensors::health_score::<S>))
    // Irrigation
    .route("/irrigation/status", get(irrigation::status::<S>))
    .route("/irrigation/control", post(irrigation::control::<S>))
    .route("/irrigation/history", get(irrigation::history::<S>))
    // Alerts
    .route("/alerts", get(alerts::list::<S>))
    .route("/alerts/{id}", delete(alerts::dismiss::<S>))
    // Analytics
    .route("/analytics/water-usage", get(analytics::water_usage::<S>))
    .route("/analytics/cost-savings", get(analytics::cost_savings::<S>))
    .route("/analytics/efficiency", get(analytics::efficiency::<S>))
    .route("/analytics/comprehensive", get(analytics::comprehensive::<S>))
    .with_state(controller)
}

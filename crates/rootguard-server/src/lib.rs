//! RootGuard server: configuration, HTTP surface and the periodic driver.
//!
//! The binary in `main.rs` wires these together; tests use [`router`]
//! directly with an in-memory store.

pub mod control_loop;
pub mod simulator;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, http::HeaderValue, routing::get};
use chrono::Utc;
use rootguard_core::{controller::Controller, store::IrrigationStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROOTGUARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  #[serde(default = "default_tick_interval")]
  pub tick_interval_secs: u64,
  /// Drive the controller from the built-in simulator.
  #[serde(default = "default_simulate")]
  pub simulate:           bool,
  /// Allowed browser origins. Empty allows any.
  #[serde(default)]
  pub cors_origins:       Vec<String>,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("rootguard.db") }

fn default_tick_interval() -> u64 { 5 }

fn default_simulate() -> bool { true }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               default_host(),
      port:               default_port(),
      store_path:         default_store_path(),
      tick_interval_secs: default_tick_interval(),
      simulate:           default_simulate(),
      cors_origins:       Vec::new(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: `/health` plus the REST API under
/// `/api`, with request tracing and CORS.
pub fn router<S>(controller: Arc<Controller<S>>, config: &ServerConfig) -> Router
where
  S: IrrigationStore + 'static,
{
  Router::new()
    .route("/health", get(liveness))
    .nest("/api", rootguard_api::api_router(controller))
    .layer(cors_layer(&config.cors_origins))
    .layer(TraceLayer::new_for_http())
}

/// `GET /health`
async fn liveness() -> Json<Value> {
  Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
  if origins.is_empty() {
    return CorsLayer::permissive();
  }

  let allowed: Vec<HeaderValue> = origins
    .iter()
    .filter_map(|o| match HeaderValue::from_str(o) {
      Ok(v) => Some(v),
      Err(_) => {
        tracing::warn!(origin = %o, "ignoring invalid CORS origin");
        None
      }
    })
    .collect();

  CorsLayer::new()
    .allow_origin(AllowOrigin::list(allowed))
    .allow_methods(tower_http::cors::Any)
    .allow_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use rootguard_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn app(config: &ServerConfig) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    router(Arc::new(Controller::new(store)), config)
  }

  #[test]
  fn config_defaults_apply_to_empty_source() {
    let cfg: ServerConfig = config::Config::builder()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.tick_interval_secs, 5);
    assert!(cfg.simulate);
    assert!(cfg.cors_origins.is_empty());
  }

  #[test]
  fn config_reads_toml_overrides() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9001\nsimulate = false\ncors_origins = [\"http://localhost:3000\"]",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9001);
    assert!(!cfg.simulate);
    assert_eq!(cfg.cors_origins, vec!["http://localhost:3000".to_owned()]);
    assert_eq!(cfg.store_path, PathBuf::from("rootguard.db"));
  }

  #[tokio::test]
  async fn health_endpoint_reports_healthy() {
    let resp = app(&ServerConfig::default())
      .await
      .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let resp = app(&ServerConfig::default())
      .await
      .oneshot(Request::builder().uri("/api/irrigation/status").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn configured_origin_is_echoed() {
    let cfg = ServerConfig {
      cors_origins: vec!["http://localhost:3000".into()],
      ..ServerConfig::default()
    };
    let resp = app(&cfg)
      .await
      .oneshot(
        Request::builder()
          .uri("/health")
          .header(header::ORIGIN, "http://localhost:3000")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(
      resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
      "http://localhost:3000"
    );
  }
}

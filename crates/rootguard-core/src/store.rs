//! The `IrrigationStore` trait.
//!
//! Implemented by storage backends (e.g. `rootguard-store-sqlite`). Every
//! state change the controller makes in one tick or one manual update is
//! handed over as a single [`UnitOfWork`] and applied all-or-nothing by
//! [`IrrigationStore::commit`]. Read-modify-write sequences around it are
//! serialised by [`crate::controller::Controller`].

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  alert::Alert,
  control::ControlState,
  health::HealthAssessment,
  reading::SensorReading,
  session::{IrrigationSession, SessionChange},
};

/// Writes produced by one controller operation.
///
/// Applied in field order inside one transaction. If any part fails,
/// nothing is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
  pub reading:  Option<SensorReading>,
  /// Replaces the health slot.
  pub health:   Option<HealthAssessment>,
  pub sessions: Vec<SessionChange>,
  pub alerts:   Vec<Alert>,
  /// Replaces the control-state slot.
  pub control:  Option<ControlState>,
}

/// Abstraction over a RootGuard storage backend.
///
/// All methods return `Send` futures so the trait can be used from a
/// multi-threaded runtime (the periodic driver and axum handlers run on
/// different tasks).
pub trait IrrigationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Apply `work` atomically.
  ///
  /// Must fail, storing nothing, if a [`SessionChange::Open`] would leave
  /// two sessions open or a [`SessionChange::Close`] names a session that
  /// is not open.
  fn commit(
    &self,
    work: UnitOfWork,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Mark an alert dismissed. Returns `false` if no such alert exists.
  fn dismiss_alert(
    &self,
    alert_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Readings ──────────────────────────────────────────────────────────

  fn latest_reading(
    &self,
  ) -> impl Future<Output = Result<Option<SensorReading>, Self::Error>> + Send + '_;

  /// Most recent readings first.
  fn reading_history(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SensorReading>, Self::Error>> + Send + '_;

  fn readings_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<SensorReading>, Self::Error>> + Send + '_;

  // ── Single slots ──────────────────────────────────────────────────────

  fn get_health(
    &self,
  ) -> impl Future<Output = Result<Option<HealthAssessment>, Self::Error>> + Send + '_;

  fn load_control(
    &self,
  ) -> impl Future<Output = Result<Option<ControlState>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// The session with no `ended_at`, if any.
  fn open_session(
    &self,
  ) -> impl Future<Output = Result<Option<IrrigationSession>, Self::Error>> + Send + '_;

  /// Most recently started first.
  fn list_sessions(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<IrrigationSession>, Self::Error>> + Send + '_;

  fn sessions_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<IrrigationSession>, Self::Error>> + Send + '_;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Non-dismissed alerts created strictly after `since`.
  fn recent_active_alerts(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;

  /// Newest first. With `active_only`, dismissed alerts are skipped.
  fn list_alerts(
    &self,
    active_only: bool,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;

  fn alerts_since(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;
}

//! Session Tracker: one record per pump activation.
//!
//! At most one session is open (has no `ended_at`) at any time. Both the
//! engine and the manual control path open and close sessions through
//! [`SessionTracker`] so that rule has a single gatekeeper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, control::Mode, store::IrrigationStore};

/// Assumed average pump output, litres per minute. Volumes are estimated
/// from duration alone, not integrated from measured flow.
pub const AVERAGE_FLOW_LITERS_PER_MINUTE: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationSession {
  pub session_id:              Uuid,
  /// Mode in force when the pump started.
  pub mode:                    Mode,
  pub started_at:              DateTime<Utc>,
  pub ended_at:                Option<DateTime<Utc>>,
  pub duration_minutes:        Option<i64>,
  pub estimated_volume_liters: Option<f64>,
  pub trigger_reason:          String,
  pub sensor_reading_id:       Option<Uuid>,
}

impl IrrigationSession {
  pub fn is_open(&self) -> bool { self.ended_at.is_none() }
}

/// Duration and volume figures stamped on a session when it closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosingFigures {
  pub ended_at:                DateTime<Utc>,
  pub duration_minutes:        i64,
  pub estimated_volume_liters: f64,
}

impl ClosingFigures {
  /// Round the elapsed time to whole minutes, never below zero.
  pub fn compute(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
    let elapsed_ms = (ended_at - started_at).num_milliseconds().max(0);
    let duration_minutes = (elapsed_ms as f64 / 60_000.0).round() as i64;
    Self {
      ended_at,
      duration_minutes,
      estimated_volume_liters: duration_minutes as f64 * AVERAGE_FLOW_LITERS_PER_MINUTE,
    }
  }
}

/// A session opened or closed by one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
  Open(IrrigationSession),
  /// `session` already carries the closing figures.
  Close {
    session: IrrigationSession,
    figures: ClosingFigures,
  },
}

impl SessionChange {
  pub fn session(&self) -> &IrrigationSession {
    match self {
      Self::Open(session) | Self::Close { session, .. } => session,
    }
  }

  /// Log the change once it has been stored.
  pub fn log(&self) {
    match self {
      Self::Open(s) => tracing::info!(
        session_id = %s.session_id,
        mode = %s.mode,
        reason = %s.trigger_reason,
        "irrigation session opened"
      ),
      Self::Close { session, figures } => tracing::info!(
        session_id = %session.session_id,
        duration_minutes = figures.duration_minutes,
        volume_liters = figures.estimated_volume_liters,
        "irrigation session closed"
      ),
    }
  }
}

/// Decides session openings and closings against a store.
///
/// The tracker only reads; the [`SessionChange`] it returns is written by
/// the caller as part of its unit of work. Callers must hold the
/// controller's writer lock so the check stays valid until that commit.
pub struct SessionTracker<'a, S> {
  store: &'a S,
}

impl<'a, S: IrrigationStore> SessionTracker<'a, S> {
  pub fn new(store: &'a S) -> Self { Self { store } }

  /// Plan a new session. Fails with [`Error::InvariantViolation`] if one is
  /// already open.
  pub async fn on_start(
    &self,
    mode: Mode,
    reason: &str,
    reading_id: Option<Uuid>,
    now: DateTime<Utc>,
  ) -> Result<SessionChange> {
    if let Some(open) = self.store.open_session().await.map_err(Error::store)? {
      return Err(Error::InvariantViolation(format!(
        "session {} is still open",
        open.session_id
      )));
    }

    Ok(SessionChange::Open(IrrigationSession {
      session_id:              Uuid::new_v4(),
      mode,
      started_at:              now,
      ended_at:                None,
      duration_minutes:        None,
      estimated_volume_liters: None,
      trigger_reason:          reason.to_owned(),
      sensor_reading_id:       reading_id,
    }))
  }

  /// Plan closing the session `session_id`. Fails with [`Error::NotFound`]
  /// if it is not the open session.
  pub async fn on_stop(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<SessionChange> {
    let open = self
      .store
      .open_session()
      .await
      .map_err(Error::store)?
      .filter(|s| s.session_id == session_id)
      .ok_or_else(|| Error::NotFound(format!("no open session {session_id}")))?;
    Ok(close(open, now))
  }

  /// Plan closing whichever session is open. Fails with [`Error::NotFound`]
  /// if none is.
  pub async fn stop_current(&self, now: DateTime<Utc>) -> Result<SessionChange> {
    let open = self
      .store
      .open_session()
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound("no open irrigation session".to_owned()))?;
    Ok(close(open, now))
  }
}

fn close(mut session: IrrigationSession, now: DateTime<Utc>) -> SessionChange {
  let figures = ClosingFigures::compute(session.started_at, now);
  session.ended_at = Some(figures.ended_at);
  session.duration_minutes = Some(figures.duration_minutes);
  session.estimated_volume_liters = Some(figures.estimated_volume_liters);
  SessionChange::Close { session, figures }
}

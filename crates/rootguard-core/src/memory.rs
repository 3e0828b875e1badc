//! In-memory [`IrrigationStore`] used by the unit tests in this crate.
//!
//! Commits can be made to fail on demand to exercise the controller's
//! all-or-nothing handling.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  alert::Alert,
  control::ControlState,
  health::HealthAssessment,
  reading::SensorReading,
  session::{IrrigationSession, SessionChange},
  store::{IrrigationStore, UnitOfWork},
};

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
  #[error("injected commit failure")]
  Injected,
  #[error("session rejected: {0}")]
  Session(String),
}

#[derive(Default, Clone)]
struct Inner {
  readings:        Vec<SensorReading>,
  health:          Option<HealthAssessment>,
  control:         Option<ControlState>,
  sessions:        Vec<IrrigationSession>,
  alerts:          Vec<Alert>,
  failing_commits: usize,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
    let mut guard = self.inner.lock().expect("memory store poisoned");
    f(&mut guard)
  }

  /// Make the next `n` commits fail without storing anything.
  pub fn fail_next_commits(&self, n: usize) { self.with(|i| i.failing_commits = n) }

  pub fn all_sessions(&self) -> Vec<IrrigationSession> { self.with(|i| i.sessions.clone()) }

  pub fn all_alerts(&self) -> Vec<Alert> { self.with(|i| i.alerts.clone()) }
}

fn newest_first<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
  items.iter().rev().take(limit).cloned().collect()
}

fn apply(i: &mut Inner, work: UnitOfWork) -> Result<(), MemoryError> {
  i.readings.extend(work.reading);
  if work.health.is_some() {
    i.health = work.health;
  }
  for change in work.sessions {
    match change {
      SessionChange::Open(session) => {
        if i.sessions.iter().any(IrrigationSession::is_open) {
          return Err(MemoryError::Session("a session is already open".into()));
        }
        i.sessions.push(session);
      }
      SessionChange::Close { session, .. } => {
        let slot = i
          .sessions
          .iter_mut()
          .find(|s| s.session_id == session.session_id && s.is_open())
          .ok_or_else(|| MemoryError::Session(format!("{} is not open", session.session_id)))?;
        *slot = session;
      }
    }
  }
  i.alerts.extend(work.alerts);
  if work.control.is_some() {
    i.control = work.control;
  }
  Ok(())
}

impl IrrigationStore for MemoryStore {
  type Error = MemoryError;

  async fn commit(&self, work: UnitOfWork) -> Result<(), MemoryError> {
    self.with(|i| {
      if i.failing_commits > 0 {
        i.failing_commits -= 1;
        return Err(MemoryError::Injected);
      }
      // Stage on a copy so a rejected change leaves nothing behind.
      let mut staged = i.clone();
      apply(&mut staged, work)?;
      *i = staged;
      Ok(())
    })
  }

  async fn dismiss_alert(&self, alert_id: Uuid, at: DateTime<Utc>) -> Result<bool, MemoryError> {
    Ok(self.with(|i| match i.alerts.iter_mut().find(|a| a.alert_id == alert_id) {
      Some(a) => {
        if !a.is_dismissed {
          a.is_dismissed = true;
          a.dismissed_at = Some(at);
        }
        true
      }
      None => false,
    }))
  }

  async fn latest_reading(&self) -> Result<Option<SensorReading>, MemoryError> {
    Ok(self.with(|i| i.readings.last().cloned()))
  }

  async fn reading_history(&self, limit: usize) -> Result<Vec<SensorReading>, MemoryError> {
    Ok(self.with(|i| newest_first(&i.readings, limit)))
  }

  async fn readings_since(&self, since: DateTime<Utc>) -> Result<Vec<SensorReading>, MemoryError> {
    Ok(self.with(|i| i.readings.iter().filter(|r| r.timestamp >= since).cloned().collect()))
  }

  async fn get_health(&self) -> Result<Option<HealthAssessment>, MemoryError> {
    Ok(self.with(|i| i.health.clone()))
  }

  async fn load_control(&self) -> Result<Option<ControlState>, MemoryError> {
    Ok(self.with(|i| i.control.clone()))
  }

  async fn open_session(&self) -> Result<Option<IrrigationSession>, MemoryError> {
    Ok(self.with(|i| i.sessions.iter().find(|s| s.is_open()).cloned()))
  }

  async fn list_sessions(&self, limit: usize) -> Result<Vec<IrrigationSession>, MemoryError> {
    Ok(self.with(|i| newest_first(&i.sessions, limit)))
  }

  async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<IrrigationSession>, MemoryError> {
    Ok(self.with(|i| i.sessions.iter().filter(|s| s.started_at >= since).cloned().collect()))
  }

  async fn recent_active_alerts(&self, since: DateTime<Utc>) -> Result<Vec<Alert>, MemoryError> {
    Ok(self.with(|i| {
      i.alerts
        .iter()
        .filter(|a| !a.is_dismissed && a.created_at > since)
        .cloned()
        .collect()
    }))
  }

  async fn list_alerts(&self, active_only: bool, limit: usize) -> Result<Vec<Alert>, MemoryError> {
    Ok(self.with(|i| {
      i.alerts
        .iter()
        .rev()
        .filter(|a| !active_only || !a.is_dismissed)
        .take(limit)
        .cloned()
        .collect()
    }))
  }

  async fn alerts_since(&self, since: DateTime<Utc>) -> Result<Vec<Alert>, MemoryError> {
    Ok(self.with(|i| i.alerts.iter().filter(|a| a.created_at >= since).cloned().collect()))
  }
}

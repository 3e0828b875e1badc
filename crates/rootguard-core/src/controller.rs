//! [`Controller`]: the single-writer façade over an [`IrrigationStore`].
//!
//! Two callers mutate the control state: the periodic driver (one
//! [`Controller::ingest_reading`] per tick) and operators via
//! [`Controller::apply_control`]. Both take the same async mutex for their
//! whole read-modify-write, so the control-state slot is never lost-updated
//! and the single-open-session rule holds across any interleaving.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::{Alert, AlertKey, AlertMessage, AlertType, NewAlert},
  analytics::{self, Analytics},
  control::{ControlState, ControlUpdate, Mode},
  dedup,
  engine::{self, Effect},
  health::{self, HealthAssessment},
  reading::{NewReading, SensorReading},
  session::{IrrigationSession, SessionChange, SessionTracker},
  store::{IrrigationStore, UnitOfWork},
};

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "now". Swapped out in tests to move time forward.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

// ─── Controller ──────────────────────────────────────────────────────────────

pub struct Controller<S> {
  store:  S,
  clock:  Arc<dyn Clock>,
  writer: Mutex<()>,
}

impl<S: IrrigationStore> Controller<S> {
  pub fn new(store: S) -> Self { Self::with_clock(store, Arc::new(SystemClock)) }

  pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
    Self { store, clock, writer: Mutex::new(()) }
  }

  pub fn store(&self) -> &S { &self.store }

  // ── Writers ─────────────────────────────────────────────────────────────

  /// Run one tick: score the reading, let the engine decide, plan its
  /// effects and the deduplicated threshold alerts, then commit everything
  /// as one unit of work. Returns the new health assessment.
  ///
  /// If the engine's effects cannot be planned (e.g. a session is already
  /// open), the reading, its assessment and the threshold alerts are still
  /// stored, the control state is left alone, and the engine's error is
  /// returned.
  pub async fn ingest_reading(&self, input: NewReading) -> Result<HealthAssessment> {
    input.validate()?;

    let _guard = self.writer.lock().await;
    let now = self.clock.now();

    let reading = input.into_reading(Uuid::new_v4());
    let assessment = health::assess(&reading, now);
    let mut work = UnitOfWork {
      reading: Some(reading.clone()),
      health: Some(assessment.clone()),
      ..Default::default()
    };

    let stored = self.store.load_control().await.map_err(Error::store)?;
    let state = stored.clone().unwrap_or_else(|| ControlState::initial(now));
    if stored.is_none() {
      work.control = Some(state.clone());
    }

    let decision = engine::evaluate(&reading, &state, now);
    let mut engine_state = None;
    let mut engine_error = None;
    if decision.changed() {
      match self.plan_effects(&reading, decision.effects, now).await {
        Ok((sessions, alerts)) => {
          work.sessions = sessions;
          work.alerts = alerts;
          work.control = Some(decision.state.clone());
          engine_state = Some(decision.state);
        }
        Err(e) => {
          tracing::warn!(error = %e, reading_id = %reading.reading_id, "engine decision dropped");
          engine_error = Some(e);
        }
      }
    }

    self.plan_threshold_alerts(&reading, now, &mut work.alerts).await?;

    self.commit(work).await?;
    tracing::debug!(
      reading_id = %reading.reading_id,
      score = assessment.score,
      status = assessment.status.as_str(),
      "health updated"
    );
    if let Some(state) = engine_state {
      tracing::info!(
        mode = %state.mode,
        is_irrigating = state.is_irrigating,
        "control state changed by engine"
      );
    }

    match engine_error {
      Some(e) => Err(e),
      None => Ok(assessment),
    }
  }

  /// Apply a manual update. Session bookkeeping goes through the same
  /// tracker as the engine, and the new state, the session change and the
  /// info alerts are committed together; on error nothing is saved.
  pub async fn apply_control(&self, update: ControlUpdate) -> Result<ControlState> {
    let _guard = self.writer.lock().await;
    let now = self.clock.now();

    let current = self
      .store
      .load_control()
      .await
      .map_err(Error::store)?
      .unwrap_or_else(|| ControlState::initial(now));
    let next = update.apply_to(&current, now);
    let tracker = SessionTracker::new(&self.store);

    let change = if !current.is_irrigating && next.is_irrigating {
      let reason = manual_trigger_reason(next.mode);
      Some(tracker.on_start(next.mode, &reason, None, now).await?)
    } else if current.is_irrigating && !next.is_irrigating {
      Some(tracker.stop_current(now).await?)
    } else {
      None
    };
    let session_id = change.as_ref().map(|c| c.session().session_id);

    let mut alerts = Vec::new();
    if update.mode.is_some() {
      let message = AlertMessage::new(AlertKey::AlertModeChanged)
        .with("mode", next.mode.as_str().to_uppercase());
      alerts.push(NewAlert::new(AlertType::Info, message).for_session(session_id).into_alert(now));
    }
    if update.is_irrigating.is_some() {
      let status = if next.is_irrigating { "started" } else { "stopped" };
      let message = AlertMessage::new(AlertKey::AlertIrrigationStatus)
        .with("status", status)
        .with("mode", next.mode.as_str());
      alerts.push(NewAlert::new(AlertType::Info, message).for_session(session_id).into_alert(now));
    }

    self
      .commit(UnitOfWork {
        sessions: change.into_iter().collect(),
        alerts,
        control: Some(next.clone()),
        ..Default::default()
      })
      .await?;
    tracing::info!(
      mode = %next.mode,
      is_irrigating = next.is_irrigating,
      auto_mode = next.auto_mode,
      "control state changed manually"
    );

    Ok(next)
  }

  /// Mark an alert dismissed. Returns `false` if the alert does not exist.
  pub async fn dismiss_alert(&self, alert_id: Uuid) -> Result<bool> {
    let dismissed = self
      .store
      .dismiss_alert(alert_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    if dismissed {
      tracing::info!(%alert_id, "alert dismissed");
    }
    Ok(dismissed)
  }

  // ── Readers ─────────────────────────────────────────────────────────────

  /// The current control state. The first call persists the first-use
  /// default, so repeated calls return identical values.
  pub async fn get_status(&self) -> Result<ControlState> {
    let _guard = self.writer.lock().await;
    if let Some(state) = self.store.load_control().await.map_err(Error::store)? {
      return Ok(state);
    }
    let state = ControlState::initial(self.clock.now());
    self
      .commit(UnitOfWork { control: Some(state.clone()), ..Default::default() })
      .await?;
    tracing::info!("initialised default control state");
    Ok(state)
  }

  pub async fn list_alerts(&self, active_only: bool, limit: usize) -> Result<Vec<Alert>> {
    self.store.list_alerts(active_only, limit).await.map_err(Error::store)
  }

  pub async fn list_sessions(&self, limit: usize) -> Result<Vec<IrrigationSession>> {
    self.store.list_sessions(limit).await.map_err(Error::store)
  }

  pub async fn latest_reading(&self) -> Result<Option<SensorReading>> {
    self.store.latest_reading().await.map_err(Error::store)
  }

  pub async fn reading_history(&self, limit: usize) -> Result<Vec<SensorReading>> {
    self.store.reading_history(limit).await.map_err(Error::store)
  }

  pub async fn health(&self) -> Result<Option<HealthAssessment>> {
    self.store.get_health().await.map_err(Error::store)
  }

  /// Usage, savings, efficiency and alert figures over the last `days`.
  pub async fn analytics(&self, days: u32) -> Result<Analytics> {
    if days == 0 {
      return Err(Error::Validation("days must be at least 1".to_owned()));
    }
    let since = self.clock.now() - Duration::days(i64::from(days));

    let sessions = self.store.sessions_since(since).await.map_err(Error::store)?;
    let readings = self.store.readings_since(since).await.map_err(Error::store)?;
    let alerts = self.store.alerts_since(since).await.map_err(Error::store)?;

    Ok(analytics::comprehensive(days, &sessions, &readings, &alerts))
  }

  // ── Internals ───────────────────────────────────────────────────────────

  /// Turn engine effects into session changes and stamped alerts without
  /// writing anything. Caller must hold the writer lock.
  async fn plan_effects(
    &self,
    reading: &SensorReading,
    effects: Vec<Effect>,
    now: DateTime<Utc>,
  ) -> Result<(Vec<SessionChange>, Vec<Alert>)> {
    let tracker = SessionTracker::new(&self.store);
    let mut sessions = Vec::new();
    let mut alerts = Vec::new();

    for effect in effects {
      let alert = match effect {
        Effect::StartSession { mode, reason, alert } => {
          let change = tracker
            .on_start(mode, reason.as_str(), Some(reading.reading_id), now)
            .await?;
          let alert = alert.for_session(Some(change.session().session_id));
          sessions.push(change);
          alert
        }
        Effect::StopSession { alert } => {
          let change = tracker.stop_current(now).await?;
          let alert = alert.for_session(Some(change.session().session_id));
          sessions.push(change);
          alert
        }
        Effect::Alert(alert) => alert,
      };
      alerts.push(alert.into_alert(now));
    }
    Ok((sessions, alerts))
  }

  /// Append the threshold alerts that survive deduplication to `planned`.
  async fn plan_threshold_alerts(
    &self,
    reading: &SensorReading,
    now: DateTime<Utc>,
    planned: &mut Vec<Alert>,
  ) -> Result<()> {
    let candidates = dedup::threshold_candidates(reading);
    if candidates.is_empty() {
      return Ok(());
    }

    let mut history = self
      .store
      .recent_active_alerts(now - dedup::dedup_window())
      .await
      .map_err(Error::store)?;
    history.extend(planned.iter().cloned());

    for candidate in candidates {
      let text = candidate.message.canonical()?;
      if !dedup::should_emit(&text, now, &history)? {
        tracing::debug!(message = %text, "duplicate alert suppressed");
        continue;
      }
      let alert = candidate.into_alert(now);
      history.push(alert.clone());
      planned.push(alert);
    }
    Ok(())
  }

  /// Store `work` in one go, then log what it changed.
  async fn commit(&self, work: UnitOfWork) -> Result<()> {
    self.store.commit(work.clone()).await.map_err(Error::store)?;

    for change in &work.sessions {
      change.log();
    }
    for alert in &work.alerts {
      if alert.message.key == AlertKey::AlertSurvivalModeSwitch {
        tracing::warn!(alert_id = %alert.alert_id, "escalated to survival mode");
      }
      tracing::info!(
        alert_id = %alert.alert_id,
        alert_type = alert.alert_type.as_str(),
        key = ?alert.message.key,
        "alert raised"
      );
    }
    Ok(())
  }
}

/// Session trigger for a manual start.
fn manual_trigger_reason(mode: Mode) -> String {
  match mode {
    Mode::Manual => "reason_manual_start".to_owned(),
    other => format!("reason_manual_start_{other}"),
  }
}

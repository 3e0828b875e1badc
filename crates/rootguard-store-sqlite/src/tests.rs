//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, Duration, Utc};
use rootguard_core::{
  alert::{Alert, AlertKey, AlertMessage, AlertType, NewAlert},
  control::{ControlState, Mode},
  health,
  reading::{NewReading, SensorReading, Vibration},
  session::{ClosingFigures, IrrigationSession, SessionChange},
  store::{IrrigationStore, UnitOfWork},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn reading(soil: f64, at: DateTime<Utc>) -> SensorReading {
  NewReading {
    water_level:      65.0,
    flow_rate:        11.5,
    turbidity:        88.0,
    soil_moisture:    soil,
    vibration_status: Vibration::Low,
    timestamp:        at,
  }
  .into_reading(Uuid::new_v4())
}

fn open_session(started_at: DateTime<Utc>) -> IrrigationSession {
  IrrigationSession {
    session_id: Uuid::new_v4(),
    mode: Mode::Normal,
    started_at,
    ended_at: None,
    duration_minutes: None,
    estimated_volume_liters: None,
    trigger_reason: "reason_low_moisture".into(),
    sensor_reading_id: None,
  }
}

fn close(mut session: IrrigationSession, at: DateTime<Utc>) -> SessionChange {
  let figures = ClosingFigures::compute(session.started_at, at);
  session.ended_at = Some(figures.ended_at);
  session.duration_minutes = Some(figures.duration_minutes);
  session.estimated_volume_liters = Some(figures.estimated_volume_liters);
  SessionChange::Close { session, figures }
}

fn alert(alert_type: AlertType, key: AlertKey, at: DateTime<Utc>) -> Alert {
  NewAlert::new(alert_type, AlertMessage::new(key)).into_alert(at)
}

async fn put_reading(s: &SqliteStore, r: &SensorReading) {
  s.commit(UnitOfWork { reading: Some(r.clone()), ..Default::default() })
    .await
    .unwrap();
}

async fn put_sessions(s: &SqliteStore, changes: Vec<SessionChange>) -> crate::Result<()> {
  s.commit(UnitOfWork { sessions: changes, ..Default::default() }).await
}

async fn put_alerts(s: &SqliteStore, alerts: Vec<Alert>) {
  s.commit(UnitOfWork { alerts, ..Default::default() }).await.unwrap();
}

// ─── Readings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn readings_round_trip_newest_first() {
  let s = store().await;
  let t0 = Utc::now();

  let first = reading(30.0, t0);
  let second = reading(31.0, t0 + Duration::seconds(5));
  put_reading(&s, &first).await;
  put_reading(&s, &second).await;

  let latest = s.latest_reading().await.unwrap().unwrap();
  assert_eq!(latest, second);

  let history = s.reading_history(10).await.unwrap();
  assert_eq!(history, vec![second.clone(), first.clone()]);

  let limited = s.reading_history(1).await.unwrap();
  assert_eq!(limited.len(), 1);

  let since = s.readings_since(t0 + Duration::seconds(1)).await.unwrap();
  assert_eq!(since, vec![second]);
}

#[tokio::test]
async fn empty_store_has_no_latest_reading() {
  let s = store().await;
  assert!(s.latest_reading().await.unwrap().is_none());
  assert!(s.get_health().await.unwrap().is_none());
  assert!(s.load_control().await.unwrap().is_none());
}

// ─── Single slots ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_slot_is_replaced_not_appended() {
  let s = store().await;
  let r1 = reading(30.0, Utc::now());
  let r2 = reading(40.0, Utc::now());

  s.commit(UnitOfWork {
    reading: Some(r1.clone()),
    health: Some(health::assess(&r1, Utc::now())),
    ..Default::default()
  })
  .await
  .unwrap();
  let second = health::assess(&r2, Utc::now());
  s.commit(UnitOfWork {
    reading: Some(r2),
    health: Some(second.clone()),
    ..Default::default()
  })
  .await
  .unwrap();

  assert_eq!(s.get_health().await.unwrap(), Some(second));
}

#[tokio::test]
async fn control_state_upserts() {
  let s = store().await;
  let mut state = ControlState::initial(Utc::now());
  s.commit(UnitOfWork { control: Some(state.clone()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(s.load_control().await.unwrap(), Some(state.clone()));

  state.mode = Mode::Survival;
  state.is_irrigating = true;
  s.commit(UnitOfWork { control: Some(state.clone()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(s.load_control().await.unwrap(), Some(state));
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_open_and_close() {
  let s = store().await;
  let start = Utc::now();
  let session = open_session(start);
  put_sessions(&s, vec![SessionChange::Open(session.clone())]).await.unwrap();
  assert_eq!(s.open_session().await.unwrap(), Some(session.clone()));

  let closing = close(session.clone(), start + Duration::minutes(7));
  put_sessions(&s, vec![closing.clone()]).await.unwrap();
  let closed = &s.list_sessions(1).await.unwrap()[0];
  assert_eq!(closed, closing.session());
  assert_eq!(closed.duration_minutes, Some(7));
  assert_eq!(closed.estimated_volume_liters, Some(105.0));
  assert!(s.open_session().await.unwrap().is_none());

  // Closing twice finds nothing open.
  let err = put_sessions(&s, vec![closing]).await.unwrap_err();
  assert!(matches!(err, Error::SessionNotOpen(_)));
}

#[tokio::test]
async fn second_open_session_is_rejected() {
  let s = store().await;
  put_sessions(&s, vec![SessionChange::Open(open_session(Utc::now()))])
    .await
    .unwrap();

  let err = put_sessions(&s, vec![SessionChange::Open(open_session(Utc::now()))])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::OpenSessionExists));
}

#[tokio::test]
async fn list_sessions_newest_first() {
  let s = store().await;
  let t0 = Utc::now() - Duration::hours(2);

  let old = open_session(t0);
  put_sessions(&s, vec![
    SessionChange::Open(old.clone()),
    close(old.clone(), t0 + Duration::minutes(3)),
  ])
  .await
  .unwrap();
  let new = open_session(t0 + Duration::hours(1));
  put_sessions(&s, vec![SessionChange::Open(new.clone())]).await.unwrap();

  let listed = s.list_sessions(10).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].session_id, new.session_id);
  assert_eq!(listed[1].session_id, old.session_id);

  let recent = s.sessions_since(t0 + Duration::minutes(30)).await.unwrap();
  assert_eq!(recent.len(), 1);
}

// ─── Units of work ───────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_session_rolls_back_the_whole_unit() {
  let s = store().await;
  let now = Utc::now();
  let before = ControlState::initial(now);
  s.commit(UnitOfWork {
    sessions: vec![SessionChange::Open(open_session(now))],
    control: Some(before.clone()),
    ..Default::default()
  })
  .await
  .unwrap();

  let r = reading(20.0, now);
  let err = s
    .commit(UnitOfWork {
      reading:  Some(r.clone()),
      health:   Some(health::assess(&r, now)),
      sessions: vec![SessionChange::Open(open_session(now))],
      alerts:   vec![alert(AlertType::Info, AlertKey::AlertAutoIrrigationStarted, now)],
      control:  Some(ControlState { is_irrigating: true, ..before.clone() }),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::OpenSessionExists));

  assert!(s.latest_reading().await.unwrap().is_none());
  assert!(s.get_health().await.unwrap().is_none());
  assert!(s.list_alerts(false, 10).await.unwrap().is_empty());
  assert_eq!(s.list_sessions(10).await.unwrap().len(), 1);
  assert_eq!(s.load_control().await.unwrap(), Some(before));
}

#[tokio::test]
async fn closing_an_unknown_session_stores_nothing() {
  let s = store().await;
  let now = Utc::now();

  let err = s
    .commit(UnitOfWork {
      sessions: vec![close(open_session(now), now)],
      alerts: vec![alert(AlertType::Info, AlertKey::AlertAutoIrrigationStopped, now)],
      control: Some(ControlState::initial(now)),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SessionNotOpen(_)));
  assert!(s.list_alerts(false, 10).await.unwrap().is_empty());
  assert!(s.load_control().await.unwrap().is_none());
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn alert_message_survives_storage_byte_for_byte() {
  let s = store().await;
  let message = AlertMessage::new(AlertKey::AlertLowWater).with("level", 28.4);
  let alert = NewAlert::new(AlertType::Warning, message.clone()).into_alert(Utc::now());
  put_alerts(&s, vec![alert.clone()]).await;

  let listed = s.list_alerts(true, 10).await.unwrap();
  assert_eq!(listed, vec![alert]);
  assert_eq!(listed[0].message.canonical().unwrap(), message.canonical().unwrap());
}

#[tokio::test]
async fn dismissal_hides_alert_and_keeps_first_timestamp() {
  let s = store().await;
  let now = Utc::now();
  let alert = alert(AlertType::Critical, AlertKey::AlertHighVibration, now);
  put_alerts(&s, vec![alert.clone()]).await;

  assert!(s.dismiss_alert(alert.alert_id, now).await.unwrap());
  assert!(s.dismiss_alert(alert.alert_id, now + Duration::minutes(1)).await.unwrap());
  assert!(!s.dismiss_alert(Uuid::new_v4(), now).await.unwrap());

  assert!(s.list_alerts(true, 10).await.unwrap().is_empty());
  let all = s.list_alerts(false, 10).await.unwrap();
  assert_eq!(all.len(), 1);
  assert!(all[0].is_dismissed);
  assert_eq!(all[0].dismissed_at, Some(now));
}

#[tokio::test]
async fn recent_active_alerts_uses_strict_cutoff() {
  let s = store().await;
  let now = Utc::now();
  let cutoff = now - Duration::minutes(10);

  let at_cutoff = alert(AlertType::Info, AlertKey::AlertLowMoisture, cutoff);
  let inside = alert(AlertType::Info, AlertKey::AlertLowMoisture, cutoff + Duration::seconds(1));
  put_alerts(&s, vec![at_cutoff, inside.clone()]).await;

  let recent = s.recent_active_alerts(cutoff).await.unwrap();
  assert_eq!(recent, vec![inside]);
  assert_eq!(s.alerts_since(cutoff).await.unwrap().len(), 2);
}

#[tokio::test]
async fn alerts_with_equal_timestamps_list_in_reverse_insertion_order() {
  let s = store().await;
  let now = Utc::now();
  let first = alert(AlertType::Info, AlertKey::AlertModeChanged, now);
  let second = alert(AlertType::Info, AlertKey::AlertIrrigationStatus, now);
  put_alerts(&s, vec![first.clone(), second.clone()]).await;

  let listed = s.list_alerts(false, 10).await.unwrap();
  assert_eq!(listed, vec![second, first]);
}

//! [`SqliteStore`]: the SQLite implementation of [`IrrigationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rootguard_core::{
  alert::Alert,
  control::ControlState,
  health::HealthAssessment,
  reading::SensorReading,
  session::IrrigationSession,
  store::{IrrigationStore, UnitOfWork},
};

use crate::{
  Error, Result,
  encode::{
    ALERT_COLUMNS, AlertParams, CloseParams, ControlParams, HealthParams, RawAlert, RawControl,
    RawHealth, RawReading, RawSession, READING_COLUMNS, ReadingParams, SESSION_COLUMNS,
    SessionParams, SessionWrite, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

fn sql_limit(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

// ─── Row writers ─────────────────────────────────────────────────────────────
//
// Run inside the transaction opened by `commit`.

/// Why a unit of work was rolled back without a database error.
enum Rejected {
  OpenSessionExists,
  NotOpen(String),
}

fn write_reading(conn: &rusqlite::Connection, r: &ReadingParams) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO sensor_readings (
       reading_id, water_level, flow_rate, turbidity, soil_moisture,
       vibration_status, timestamp
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      r.reading_id,
      r.water_level,
      r.flow_rate,
      r.turbidity,
      r.soil_moisture,
      r.vibration_status,
      r.timestamp,
    ],
  )?;
  Ok(())
}

fn write_health(conn: &rusqlite::Connection, h: &HealthParams) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO health (id, score, status, message, reading_id, updated_at)
     VALUES (1, ?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (id) DO UPDATE SET
       score      = excluded.score,
       status     = excluded.status,
       message    = excluded.message,
       reading_id = excluded.reading_id,
       updated_at = excluded.updated_at",
    rusqlite::params![h.score, h.status, h.message, h.reading_id, h.updated_at],
  )?;
  Ok(())
}

fn write_control(conn: &rusqlite::Connection, c: &ControlParams) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO control_state (id, mode, is_irrigating, auto_mode, last_updated)
     VALUES (1, ?1, ?2, ?3, ?4)
     ON CONFLICT (id) DO UPDATE SET
       mode          = excluded.mode,
       is_irrigating = excluded.is_irrigating,
       auto_mode     = excluded.auto_mode,
       last_updated  = excluded.last_updated",
    rusqlite::params![c.mode, c.is_irrigating, c.auto_mode, c.last_updated],
  )?;
  Ok(())
}

/// Returns `false` if the open-session index refused the row.
fn insert_session_row(conn: &rusqlite::Connection, p: &SessionParams) -> rusqlite::Result<bool> {
  let result = conn.execute(
    "INSERT INTO irrigation_sessions (
       session_id, mode, started_at, ended_at, duration_minutes,
       estimated_volume_liters, trigger_reason, sensor_reading_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      p.session_id,
      p.mode,
      p.started_at,
      p.ended_at,
      p.duration_minutes,
      p.estimated_volume_liters,
      p.trigger_reason,
      p.sensor_reading_id,
    ],
  );
  match result {
    Ok(_) => Ok(true),
    Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
      Ok(false)
    }
    Err(e) => Err(e),
  }
}

/// Returns the number of sessions closed: 0 if `p` names no open session.
fn close_session_row(conn: &rusqlite::Connection, p: &CloseParams) -> rusqlite::Result<usize> {
  conn.execute(
    "UPDATE irrigation_sessions
     SET ended_at = ?2, duration_minutes = ?3, estimated_volume_liters = ?4
     WHERE session_id = ?1 AND ended_at IS NULL",
    rusqlite::params![p.session_id, p.ended_at, p.duration_minutes, p.estimated_volume_liters],
  )
}

fn write_alert(conn: &rusqlite::Connection, a: &AlertParams) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO alerts (
       alert_id, alert_type, message, created_at, is_dismissed,
       dismissed_at, sensor_reading_id, irrigation_session_id
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      a.alert_id,
      a.alert_type,
      a.message,
      a.created_at,
      a.is_dismissed,
      a.dismissed_at,
      a.sensor_reading_id,
      a.irrigation_session_id,
    ],
  )?;
  Ok(())
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A RootGuard store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_readings(&self, sql: String, arg: Option<String>, limit: i64) -> Result<Vec<SensorReading>> {
    let raws: Vec<RawReading> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
          Some(a) => stmt.query_map(rusqlite::params![a, limit], RawReading::from_row)?,
          None => stmt.query_map(rusqlite::params![limit], RawReading::from_row)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;
    raws.into_iter().map(RawReading::into_reading).collect()
  }

  async fn query_sessions(&self, sql: String, arg: Option<String>, limit: i64) -> Result<Vec<IrrigationSession>> {
    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
          Some(a) => stmt.query_map(rusqlite::params![a, limit], RawSession::from_row)?,
          None => stmt.query_map(rusqlite::params![limit], RawSession::from_row)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;
    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn query_alerts(&self, sql: String, arg: Option<String>, limit: i64) -> Result<Vec<Alert>> {
    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match arg {
          Some(a) => stmt.query_map(rusqlite::params![a, limit], RawAlert::from_row)?,
          None => stmt.query_map(rusqlite::params![limit], RawAlert::from_row)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
      })
      .await?;
    raws.into_iter().map(RawAlert::into_alert).collect()
  }
}

// ─── IrrigationStore impl ────────────────────────────────────────────────────

impl IrrigationStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn commit(&self, work: UnitOfWork) -> Result<()> {
    let reading = work.reading.as_ref().map(ReadingParams::from);
    let health = work.health.as_ref().map(HealthParams::from);
    let sessions: Vec<SessionWrite> = work.sessions.iter().map(SessionWrite::from).collect();
    let alerts = work.alerts.iter().map(AlertParams::try_from).collect::<Result<Vec<_>>>()?;
    let control = work.control.as_ref().map(ControlParams::from);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(r) = &reading {
          write_reading(&tx, r)?;
        }
        if let Some(h) = &health {
          write_health(&tx, h)?;
        }
        for session in &sessions {
          let rejected = match session {
            SessionWrite::Open(p) => {
              (!insert_session_row(&tx, p)?).then_some(Rejected::OpenSessionExists)
            }
            SessionWrite::Close(p) => {
              (close_session_row(&tx, p)? == 0).then(|| Rejected::NotOpen(p.session_id.clone()))
            }
          };
          // Dropping the transaction rolls it back.
          if let Some(rejected) = rejected {
            return Ok(Err(rejected));
          }
        }
        for a in &alerts {
          write_alert(&tx, a)?;
        }
        if let Some(c) = &control {
          write_control(&tx, c)?;
        }

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    match outcome {
      Ok(()) => Ok(()),
      Err(Rejected::OpenSessionExists) => {
        tracing::warn!("rejected second open session; unit of work rolled back");
        Err(Error::OpenSessionExists)
      }
      Err(Rejected::NotOpen(id)) => {
        tracing::warn!(session_id = %id, "session to close is not open; unit of work rolled back");
        Err(Error::SessionNotOpen(id))
      }
    }
  }

  async fn dismiss_alert(&self, alert_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(alert_id);
    let at_str = encode_dt(at);

    let found = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE alerts SET is_dismissed = 1, dismissed_at = ?2
           WHERE alert_id = ?1 AND is_dismissed = 0",
          rusqlite::params![id_str, at_str],
        )?;
        let exists = conn
          .query_row(
            "SELECT 1 FROM alerts WHERE alert_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;
    Ok(found)
  }

  // ── Readings ──────────────────────────────────────────────────────────────

  async fn latest_reading(&self) -> Result<Option<SensorReading>> {
    Ok(self.reading_history(1).await?.into_iter().next())
  }

  async fn reading_history(&self, limit: usize) -> Result<Vec<SensorReading>> {
    let sql = format!(
      "SELECT {READING_COLUMNS} FROM sensor_readings
       ORDER BY timestamp DESC, rowid DESC LIMIT ?1"
    );
    self.query_readings(sql, None, sql_limit(limit)).await
  }

  async fn readings_since(&self, since: DateTime<Utc>) -> Result<Vec<SensorReading>> {
    let sql = format!(
      "SELECT {READING_COLUMNS} FROM sensor_readings
       WHERE timestamp >= ?1 ORDER BY timestamp, rowid LIMIT ?2"
    );
    self.query_readings(sql, Some(encode_dt(since)), -1).await
  }

  // ── Single slots ──────────────────────────────────────────────────────────

  async fn get_health(&self) -> Result<Option<HealthAssessment>> {
    let raw: Option<RawHealth> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT score, status, message, reading_id, updated_at FROM health WHERE id = 1",
            [],
            |row| {
              Ok(RawHealth {
                score:      row.get(0)?,
                status:     row.get(1)?,
                message:    row.get(2)?,
                reading_id: row.get(3)?,
                updated_at: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawHealth::into_health).transpose()
  }

  async fn load_control(&self) -> Result<Option<ControlState>> {
    let raw: Option<RawControl> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            "SELECT mode, is_irrigating, auto_mode, last_updated FROM control_state WHERE id = 1",
            [],
            |row| {
              Ok(RawControl {
                mode:          row.get(0)?,
                is_irrigating: row.get(1)?,
                auto_mode:     row.get(2)?,
                last_updated:  row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawControl::into_state).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn open_session(&self) -> Result<Option<IrrigationSession>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM irrigation_sessions
       WHERE ended_at IS NULL LIMIT ?1"
    );
    Ok(self.query_sessions(sql, None, 1).await?.into_iter().next())
  }

  async fn list_sessions(&self, limit: usize) -> Result<Vec<IrrigationSession>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM irrigation_sessions
       ORDER BY started_at DESC, rowid DESC LIMIT ?1"
    );
    self.query_sessions(sql, None, sql_limit(limit)).await
  }

  async fn sessions_since(&self, since: DateTime<Utc>) -> Result<Vec<IrrigationSession>> {
    let sql = format!(
      "SELECT {SESSION_COLUMNS} FROM irrigation_sessions
       WHERE started_at >= ?1 ORDER BY started_at, rowid LIMIT ?2"
    );
    self.query_sessions(sql, Some(encode_dt(since)), -1).await
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn recent_active_alerts(&self, since: DateTime<Utc>) -> Result<Vec<Alert>> {
    let sql = format!(
      "SELECT {ALERT_COLUMNS} FROM alerts
       WHERE is_dismissed = 0 AND created_at > ?1
       ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    );
    self.query_alerts(sql, Some(encode_dt(since)), -1).await
  }

  async fn list_alerts(&self, active_only: bool, limit: usize) -> Result<Vec<Alert>> {
    let filter = if active_only { "WHERE is_dismissed = 0" } else { "" };
    let sql = format!(
      "SELECT {ALERT_COLUMNS} FROM alerts {filter}
       ORDER BY created_at DESC, rowid DESC LIMIT ?1"
    );
    self.query_alerts(sql, None, sql_limit(limit)).await
  }

  async fn alerts_since(&self, since: DateTime<Utc>) -> Result<Vec<Alert>> {
    let sql = format!(
      "SELECT {ALERT_COLUMNS} FROM alerts
       WHERE created_at >= ?1 ORDER BY created_at, rowid LIMIT ?2"
    );
    self.query_alerts(sql, Some(encode_dt(since)), -1).await
  }
}

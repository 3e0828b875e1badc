//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 UTC with nanoseconds, so they sort
//! lexically and round-trip exactly. UUIDs are hyphenated lowercase strings.
//! Alert messages are stored as their canonical JSON text.

use chrono::{DateTime, SecondsFormat, Utc};
use rootguard_core::{
  alert::{Alert, AlertMessage, AlertType},
  control::{ControlState, Mode},
  health::{HealthAssessment, HealthStatus},
  reading::{SensorReading, Vibration},
  session::{IrrigationSession, SessionChange},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Enum columns ────────────────────────────────────────────────────────────

/// Map a rejected enum value read from `column` to [`Error::Decode`].
fn decode_enum<T>(column: &str, parsed: rootguard_core::Result<T>) -> Result<T> {
  parsed.map_err(|e| Error::Decode(format!("{column}: {e}")))
}

// ─── Parameter rows ──────────────────────────────────────────────────────────
//
// Owned column values, built before entering the connection thread.

pub struct ReadingParams {
  pub reading_id:       String,
  pub water_level:      f64,
  pub flow_rate:        f64,
  pub turbidity:        f64,
  pub soil_moisture:    f64,
  pub vibration_status: &'static str,
  pub timestamp:        String,
}

impl From<&SensorReading> for ReadingParams {
  fn from(r: &SensorReading) -> Self {
    Self {
      reading_id:       encode_uuid(r.reading_id),
      water_level:      r.water_level,
      flow_rate:        r.flow_rate,
      turbidity:        r.turbidity,
      soil_moisture:    r.soil_moisture,
      vibration_status: r.vibration_status.as_str(),
      timestamp:        encode_dt(r.timestamp),
    }
  }
}

pub struct HealthParams {
  pub score:      i64,
  pub status:     &'static str,
  pub message:    String,
  pub reading_id: String,
  pub updated_at: String,
}

impl From<&HealthAssessment> for HealthParams {
  fn from(h: &HealthAssessment) -> Self {
    Self {
      score:      i64::from(h.score),
      status:     h.status.as_str(),
      message:    h.message.clone(),
      reading_id: encode_uuid(h.reading_id),
      updated_at: encode_dt(h.updated_at),
    }
  }
}

pub struct ControlParams {
  pub mode:          &'static str,
  pub is_irrigating: bool,
  pub auto_mode:     bool,
  pub last_updated:  String,
}

impl From<&ControlState> for ControlParams {
  fn from(c: &ControlState) -> Self {
    Self {
      mode:          c.mode.as_str(),
      is_irrigating: c.is_irrigating,
      auto_mode:     c.auto_mode,
      last_updated:  encode_dt(c.last_updated),
    }
  }
}

pub struct SessionParams {
  pub session_id:              String,
  pub mode:                    &'static str,
  pub started_at:              String,
  pub ended_at:                Option<String>,
  pub duration_minutes:        Option<i64>,
  pub estimated_volume_liters: Option<f64>,
  pub trigger_reason:          String,
  pub sensor_reading_id:       Option<String>,
}

pub struct CloseParams {
  pub session_id:              String,
  pub ended_at:                String,
  pub duration_minutes:        i64,
  pub estimated_volume_liters: f64,
}

/// One session row change of a unit of work.
pub enum SessionWrite {
  Open(SessionParams),
  Close(CloseParams),
}

impl From<&SessionChange> for SessionWrite {
  fn from(change: &SessionChange) -> Self {
    match change {
      SessionChange::Open(s) => Self::Open(SessionParams {
        session_id:              encode_uuid(s.session_id),
        mode:                    s.mode.as_str(),
        started_at:              encode_dt(s.started_at),
        ended_at:                s.ended_at.map(encode_dt),
        duration_minutes:        s.duration_minutes,
        estimated_volume_liters: s.estimated_volume_liters,
        trigger_reason:          s.trigger_reason.clone(),
        sensor_reading_id:       s.sensor_reading_id.map(encode_uuid),
      }),
      SessionChange::Close { session, figures } => Self::Close(CloseParams {
        session_id:              encode_uuid(session.session_id),
        ended_at:                encode_dt(figures.ended_at),
        duration_minutes:        figures.duration_minutes,
        estimated_volume_liters: figures.estimated_volume_liters,
      }),
    }
  }
}

pub struct AlertParams {
  pub alert_id:              String,
  pub alert_type:            &'static str,
  /// Canonical JSON text.
  pub message:               String,
  pub created_at:            String,
  pub is_dismissed:          bool,
  pub dismissed_at:          Option<String>,
  pub sensor_reading_id:     Option<String>,
  pub irrigation_session_id: Option<String>,
}

impl TryFrom<&Alert> for AlertParams {
  type Error = Error;

  fn try_from(a: &Alert) -> Result<Self> {
    Ok(Self {
      alert_id:              encode_uuid(a.alert_id),
      alert_type:            a.alert_type.as_str(),
      message:               a.message.canonical()?,
      created_at:            encode_dt(a.created_at),
      is_dismissed:          a.is_dismissed,
      dismissed_at:          a.dismissed_at.map(encode_dt),
      sensor_reading_id:     a.sensor_reading_id.map(encode_uuid),
      irrigation_session_id: a.irrigation_session_id.map(encode_uuid),
    })
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `sensor_readings` row.
pub struct RawReading {
  pub reading_id:       String,
  pub water_level:      f64,
  pub flow_rate:        f64,
  pub turbidity:        f64,
  pub soil_moisture:    f64,
  pub vibration_status: String,
  pub timestamp:        String,
}

pub const READING_COLUMNS: &str =
  "reading_id, water_level, flow_rate, turbidity, soil_moisture, vibration_status, timestamp";

impl RawReading {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reading_id:       row.get(0)?,
      water_level:      row.get(1)?,
      flow_rate:        row.get(2)?,
      turbidity:        row.get(3)?,
      soil_moisture:    row.get(4)?,
      vibration_status: row.get(5)?,
      timestamp:        row.get(6)?,
    })
  }

  pub fn into_reading(self) -> Result<SensorReading> {
    Ok(SensorReading {
      reading_id:       decode_uuid(&self.reading_id)?,
      water_level:      self.water_level,
      flow_rate:        self.flow_rate,
      turbidity:        self.turbidity,
      soil_moisture:    self.soil_moisture,
      vibration_status: decode_enum("vibration_status", Vibration::parse(&self.vibration_status))?,
      timestamp:        decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw values read from the `health` slot.
pub struct RawHealth {
  pub score:      i64,
  pub status:     String,
  pub message:    String,
  pub reading_id: String,
  pub updated_at: String,
}

impl RawHealth {
  pub fn into_health(self) -> Result<HealthAssessment> {
    let score = u8::try_from(self.score)
      .map_err(|_| Error::Decode(format!("score: {} is out of range", self.score)))?;
    Ok(HealthAssessment {
      score,
      status: decode_enum("status", HealthStatus::parse(&self.status))?,
      message: self.message,
      reading_id: decode_uuid(&self.reading_id)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read from the `control_state` slot.
pub struct RawControl {
  pub mode:          String,
  pub is_irrigating: bool,
  pub auto_mode:     bool,
  pub last_updated:  String,
}

impl RawControl {
  pub fn into_state(self) -> Result<ControlState> {
    Ok(ControlState {
      mode:          decode_enum("mode", self.mode.parse::<Mode>())?,
      is_irrigating: self.is_irrigating,
      auto_mode:     self.auto_mode,
      last_updated:  decode_dt(&self.last_updated)?,
    })
  }
}

/// Raw values read from an `irrigation_sessions` row.
pub struct RawSession {
  pub session_id:              String,
  pub mode:                    String,
  pub started_at:              String,
  pub ended_at:                Option<String>,
  pub duration_minutes:        Option<i64>,
  pub estimated_volume_liters: Option<f64>,
  pub trigger_reason:          String,
  pub sensor_reading_id:       Option<String>,
}

pub const SESSION_COLUMNS: &str = "session_id, mode, started_at, ended_at, duration_minutes, \
                                   estimated_volume_liters, trigger_reason, sensor_reading_id";

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:              row.get(0)?,
      mode:                    row.get(1)?,
      started_at:              row.get(2)?,
      ended_at:                row.get(3)?,
      duration_minutes:        row.get(4)?,
      estimated_volume_liters: row.get(5)?,
      trigger_reason:          row.get(6)?,
      sensor_reading_id:       row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<IrrigationSession> {
    Ok(IrrigationSession {
      session_id:              decode_uuid(&self.session_id)?,
      mode:                    decode_enum("mode", self.mode.parse::<Mode>())?,
      started_at:              decode_dt(&self.started_at)?,
      ended_at:                decode_opt_dt(self.ended_at)?,
      duration_minutes:        self.duration_minutes,
      estimated_volume_liters: self.estimated_volume_liters,
      trigger_reason:          self.trigger_reason,
      sensor_reading_id:       decode_opt_uuid(self.sensor_reading_id)?,
    })
  }
}

/// Raw values read from an `alerts` row.
pub struct RawAlert {
  pub alert_id:              String,
  pub alert_type:            String,
  pub message:               String,
  pub created_at:            String,
  pub is_dismissed:          bool,
  pub dismissed_at:          Option<String>,
  pub sensor_reading_id:     Option<String>,
  pub irrigation_session_id: Option<String>,
}

pub const ALERT_COLUMNS: &str = "alert_id, alert_type, message, created_at, is_dismissed, \
                                 dismissed_at, sensor_reading_id, irrigation_session_id";

impl RawAlert {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:              row.get(0)?,
      alert_type:            row.get(1)?,
      message:               row.get(2)?,
      created_at:            row.get(3)?,
      is_dismissed:          row.get(4)?,
      dismissed_at:          row.get(5)?,
      sensor_reading_id:     row.get(6)?,
      irrigation_session_id: row.get(7)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      alert_id:              decode_uuid(&self.alert_id)?,
      alert_type:            decode_enum("alert_type", AlertType::parse(&self.alert_type))?,
      message:               AlertMessage::from_canonical(&self.message)?,
      created_at:            decode_dt(&self.created_at)?,
      is_dismissed:          self.is_dismissed,
      dismissed_at:          decode_opt_dt(self.dismissed_at)?,
      sensor_reading_id:     decode_opt_uuid(self.sensor_reading_id)?,
      irrigation_session_id: decode_opt_uuid(self.irrigation_session_id)?,
    })
  }
}

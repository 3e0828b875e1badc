//! Alerts and their structured, localisable messages.
//!
//! A message is a key plus named parameters. The client looks the key up in
//! its translation tables; the server never renders prose. Parameters live in
//! a [`BTreeMap`] so the serialised form is canonical and two equivalent
//! messages always compare equal as text.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Severity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
  Critical,
  Warning,
  Info,
}

impl AlertType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Critical => "critical",
      Self::Warning => "warning",
      Self::Info => "info",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "critical" => Ok(Self::Critical),
      "warning" => Ok(Self::Warning),
      "info" => Ok(Self::Info),
      other => Err(Error::Validation(format!("unknown alert type: {other:?}"))),
    }
  }
}

// ─── Message keys ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKey {
  AlertCriticalWater,
  AlertLowWater,
  AlertPoorWater,
  AlertHighVibration,
  AlertLowMoisture,
  AlertAutoIrrigationStarted,
  AlertAutoIrrigationStopped,
  AlertSurvivalIrrigationStopped,
  AlertSafetyIrrigationStopped,
  AlertSurvivalModeSwitch,
  AlertModeChanged,
  AlertIrrigationStatus,
}

/// Why the engine started or stopped the pump. Also used verbatim as the
/// session trigger reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonKey {
  ReasonLowMoisture,
  ReasonCriticalMoistureSurvival,
  ReasonMoistureSufficient,
  ReasonTargetReached,
  ReasonLowWater,
  ReasonHighVibration,
}

impl ReasonKey {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ReasonLowMoisture => "reason_low_moisture",
      Self::ReasonCriticalMoistureSurvival => "reason_critical_moisture_survival",
      Self::ReasonMoistureSufficient => "reason_moisture_sufficient",
      Self::ReasonTargetReached => "reason_target_reached",
      Self::ReasonLowWater => "reason_low_water",
      Self::ReasonHighVibration => "reason_high_vibration",
    }
  }
}

// ─── Parameters ──────────────────────────────────────────────────────────────

/// A message parameter: a number, a string, or a nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
  Number(f64),
  Text(String),
  Map(BTreeMap<String, ParamValue>),
}

impl From<f64> for ParamValue {
  fn from(v: f64) -> Self { Self::Number(v) }
}

impl From<&str> for ParamValue {
  fn from(v: &str) -> Self { Self::Text(v.to_owned()) }
}

impl From<String> for ParamValue {
  fn from(v: String) -> Self { Self::Text(v) }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
  fn from(v: BTreeMap<String, ParamValue>) -> Self { Self::Map(v) }
}

// ─── Message ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
  pub key:    AlertKey,
  #[serde(default)]
  pub params: BTreeMap<String, ParamValue>,
}

impl AlertMessage {
  pub fn new(key: AlertKey) -> Self { Self { key, params: BTreeMap::new() } }

  /// Builder-style parameter insertion.
  pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
    self.params.insert(name.to_owned(), value.into());
    self
  }

  /// Attach a `reason_key` and a nested `reason_params` map.
  pub fn with_reason(self, reason: ReasonKey, moisture: f64) -> Self {
    let mut reason_params = BTreeMap::new();
    reason_params.insert("moisture".to_owned(), ParamValue::Number(moisture));
    self
      .with("reason_key", reason.as_str())
      .with("reason_params", reason_params)
  }

  /// The canonical text form used for storage and for deduplication.
  pub fn canonical(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_canonical(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored alert. Never deleted; only marked dismissed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:              Uuid,
  pub alert_type:            AlertType,
  pub message:               AlertMessage,
  pub created_at:            DateTime<Utc>,
  pub is_dismissed:          bool,
  pub dismissed_at:          Option<DateTime<Utc>>,
  pub sensor_reading_id:     Option<Uuid>,
  pub irrigation_session_id: Option<Uuid>,
}

/// An alert the engine wants to raise, before it is stamped and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
  pub alert_type:            AlertType,
  pub message:               AlertMessage,
  pub sensor_reading_id:     Option<Uuid>,
  pub irrigation_session_id: Option<Uuid>,
}

impl NewAlert {
  pub fn new(alert_type: AlertType, message: AlertMessage) -> Self {
    Self {
      alert_type,
      message,
      sensor_reading_id: None,
      irrigation_session_id: None,
    }
  }

  pub fn for_reading(mut self, reading_id: Uuid) -> Self {
    self.sensor_reading_id = Some(reading_id);
    self
  }

  pub fn for_session(mut self, session_id: Option<Uuid>) -> Self {
    self.irrigation_session_id = session_id;
    self
  }

  pub fn into_alert(self, created_at: DateTime<Utc>) -> Alert {
    Alert {
      alert_id: Uuid::new_v4(),
      alert_type: self.alert_type,
      message: self.message,
      created_at,
      is_dismissed: false,
      dismissed_at: None,
      sensor_reading_id: self.sensor_reading_id,
      irrigation_session_id: self.irrigation_session_id,
    }
  }
}

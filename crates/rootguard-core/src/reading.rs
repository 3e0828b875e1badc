//! Sensor readings: one immutable fact per tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Pump vibration as reported by the borewell sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibration {
  Low,
  High,
}

impl Vibration {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::High => "high",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "low" => Ok(Self::Low),
      "high" => Ok(Self::High),
      other => Err(Error::Validation(format!("unknown vibration status: {other:?}"))),
    }
  }

  pub fn is_high(self) -> bool { matches!(self, Self::High) }
}

/// A persisted reading. Never mutated after it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
  pub reading_id:       Uuid,
  /// Borewell water level, percent.
  pub water_level:      f64,
  /// Pump flow rate, litres per minute.
  pub flow_rate:        f64,
  /// Water clarity, percent (higher is clearer).
  pub turbidity:        f64,
  /// Soil moisture, percent.
  pub soil_moisture:    f64,
  pub vibration_status: Vibration,
  pub timestamp:        DateTime<Utc>,
}

/// Input to [`crate::controller::Controller::ingest_reading`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
  pub water_level:      f64,
  pub flow_rate:        f64,
  pub turbidity:        f64,
  pub soil_moisture:    f64,
  pub vibration_status: Vibration,
  pub timestamp:        DateTime<Utc>,
}

impl NewReading {
  /// Reject out-of-range values. Percentages must lie in `[0, 100]` and the
  /// flow rate must be finite and non-negative.
  pub fn validate(&self) -> Result<()> {
    check_percent("water_level", self.water_level)?;
    check_percent("turbidity", self.turbidity)?;
    check_percent("soil_moisture", self.soil_moisture)?;
    if !self.flow_rate.is_finite() || self.flow_rate < 0.0 {
      return Err(Error::Validation(format!(
        "flow_rate must be a non-negative number, got {}",
        self.flow_rate
      )));
    }
    Ok(())
  }

  pub fn into_reading(self, reading_id: Uuid) -> SensorReading {
    SensorReading {
      reading_id,
      water_level:      self.water_level,
      flow_rate:        self.flow_rate,
      turbidity:        self.turbidity,
      soil_moisture:    self.soil_moisture,
      vibration_status: self.vibration_status,
      timestamp:        self.timestamp,
    }
  }
}

fn check_percent(field: &str, value: f64) -> Result<()> {
  if value.is_finite() && (0.0..=100.0).contains(&value) {
    Ok(())
  } else {
    Err(Error::Validation(format!("{field} must be within 0..=100, got {value}")))
  }
}

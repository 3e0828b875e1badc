//! Health Scorer: a composite 0–100 score derived from a single reading.
//!
//! Four components are weighted equally: water level, turbidity, pump
//! vibration (100 when low, 30 when high) and flow rate relative to a
//! nominal 15 L/min, capped at 100.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  reading::{SensorReading, Vibration},
};

const WEIGHT: f64 = 0.25;
const NOMINAL_FLOW_RATE: f64 = 15.0;

pub const NORMAL_THRESHOLD: f64 = 80.0;
pub const WARNING_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Normal,
  Warning,
  Critical,
}

impl HealthStatus {
  /// Classify an unrounded score. Lower bounds are inclusive.
  pub fn classify(score: f64) -> Self {
    if score >= NORMAL_THRESHOLD {
      Self::Normal
    } else if score >= WARNING_THRESHOLD {
      Self::Warning
    } else {
      Self::Critical
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Self::Normal => "System operating normally",
      Self::Warning => "Maintenance recommended soon",
      Self::Critical => "Critical - Immediate attention required",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Normal => "normal",
      Self::Warning => "warning",
      Self::Critical => "critical",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "normal" => Ok(Self::Normal),
      "warning" => Ok(Self::Warning),
      "critical" => Ok(Self::Critical),
      other => Err(Error::Validation(format!("unknown health status: {other:?}"))),
    }
  }
}

/// The latest health verdict. Superseded on every tick, never appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
  pub score:      u8,
  pub status:     HealthStatus,
  pub message:    String,
  pub reading_id: Uuid,
  pub updated_at: DateTime<Utc>,
}

/// The unrounded weighted score for a reading.
pub fn raw_score(reading: &SensorReading) -> f64 {
  let vibration = match reading.vibration_status {
    Vibration::Low => 100.0,
    Vibration::High => 30.0,
  };
  let flow = (reading.flow_rate / NOMINAL_FLOW_RATE * 100.0).min(100.0);

  WEIGHT * reading.water_level
    + WEIGHT * reading.turbidity
    + WEIGHT * vibration
    + WEIGHT * flow
}

/// Score a reading. Status is classified on the unrounded score; the stored
/// score is rounded to the nearest integer.
pub fn assess(reading: &SensorReading, now: DateTime<Utc>) -> HealthAssessment {
  let raw = raw_score(reading);
  let status = HealthStatus::classify(raw);

  HealthAssessment {
    score: raw.round().clamp(0.0, 100.0) as u8,
    status,
    message: status.message().to_owned(),
    reading_id: reading.reading_id,
    updated_at: now,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn reading(water: f64, turbidity: f64, vibration: Vibration, flow: f64) -> SensorReading {
    SensorReading {
      reading_id:       Uuid::new_v4(),
      water_level:      water,
      flow_rate:        flow,
      turbidity,
      soil_moisture:    50.0,
      vibration_status: vibration,
      timestamp:        Utc::now(),
    }
  }

  #[test]
  fn perfect_reading_scores_hundred() {
    let a = assess(&reading(100.0, 100.0, Vibration::Low, 15.0), Utc::now());
    assert_eq!(a.score, 100);
    assert_eq!(a.status, HealthStatus::Normal);
    assert_eq!(a.message, "System operating normally");
  }

  #[test]
  fn flow_component_is_capped() {
    let capped = raw_score(&reading(50.0, 50.0, Vibration::Low, 20.0));
    let nominal = raw_score(&reading(50.0, 50.0, Vibration::Low, 15.0));
    assert_eq!(capped, nominal);
  }

  #[test]
  fn worst_reading_stays_in_range() {
    let a = assess(&reading(0.0, 0.0, Vibration::High, 0.0), Utc::now());
    assert_eq!(a.score, 8);
    assert_eq!(a.status, HealthStatus::Critical);
  }

  #[test]
  fn classification_boundaries() {
    assert_eq!(HealthStatus::classify(80.0), HealthStatus::Normal);
    assert_eq!(HealthStatus::classify(79.999), HealthStatus::Warning);
    assert_eq!(HealthStatus::classify(50.0), HealthStatus::Warning);
    assert_eq!(HealthStatus::classify(49.999), HealthStatus::Critical);
  }

  #[test]
  fn status_uses_unrounded_score() {
    // 0.25 * (18.4 + 100 + 100 + 100) = 79.6, which rounds up to 80.
    let r = reading(18.4, 100.0, Vibration::Low, 15.0);
    let a = assess(&r, Utc::now());
    assert_eq!(a.score, 80);
    assert_eq!(a.status, HealthStatus::Warning);
  }

  #[test]
  fn high_vibration_costs_seventeen_and_a_half_points() {
    let low = raw_score(&reading(60.0, 60.0, Vibration::Low, 15.0));
    let high = raw_score(&reading(60.0, 60.0, Vibration::High, 15.0));
    assert!((low - high - 17.5).abs() < 1e-9);
  }
}

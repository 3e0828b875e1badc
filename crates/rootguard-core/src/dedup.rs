//! Alert Deduplicator and the sensor-threshold alert candidates it filters.

use chrono::{DateTime, Duration, Utc};

use crate::{
  Result,
  alert::{Alert, AlertKey, AlertMessage, AlertType, NewAlert},
  reading::SensorReading,
};

/// Identical, undismissed alerts inside this window are suppressed.
pub fn dedup_window() -> Duration { Duration::minutes(10) }

/// Decide whether `candidate` should be stored.
///
/// Returns `false` if `history` holds an undismissed alert whose canonical
/// message text is byte-identical to `candidate` and which was created
/// strictly within the last [`dedup_window`] before `now`.
pub fn should_emit(candidate: &str, now: DateTime<Utc>, history: &[Alert]) -> Result<bool> {
  let cutoff = now - dedup_window();
  for alert in history {
    if alert.is_dismissed || alert.created_at <= cutoff {
      continue;
    }
    if alert.message.canonical()? == candidate {
      return Ok(false);
    }
  }
  Ok(true)
}

/// Alerts implied by a single reading. Each check is independent, so any
/// subset may fire on the same tick.
pub fn threshold_candidates(reading: &SensorReading) -> Vec<NewAlert> {
  let mut out = Vec::new();
  let mut push = |alert_type: AlertType, message: AlertMessage| {
    out.push(NewAlert::new(alert_type, message).for_reading(reading.reading_id));
  };

  if reading.water_level < 20.0 {
    push(
      AlertType::Critical,
      AlertMessage::new(AlertKey::AlertCriticalWater).with("level", reading.water_level),
    );
  } else if reading.water_level < 35.0 {
    push(
      AlertType::Warning,
      AlertMessage::new(AlertKey::AlertLowWater).with("level", reading.water_level),
    );
  }

  if reading.turbidity < 50.0 {
    push(
      AlertType::Warning,
      AlertMessage::new(AlertKey::AlertPoorWater).with("turbidity", reading.turbidity),
    );
  }

  if reading.vibration_status.is_high() {
    push(AlertType::Critical, AlertMessage::new(AlertKey::AlertHighVibration));
  }

  if reading.soil_moisture < 25.0 {
    push(
      AlertType::Info,
      AlertMessage::new(AlertKey::AlertLowMoisture).with("moisture", reading.soil_moisture),
    );
  }

  out
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;
  use crate::reading::Vibration;

  fn reading(water: f64, turbidity: f64, soil: f64, vibration: Vibration) -> SensorReading {
    SensorReading {
      reading_id:       Uuid::new_v4(),
      water_level:      water,
      flow_rate:        12.0,
      turbidity,
      soil_moisture:    soil,
      vibration_status: vibration,
      timestamp:        Utc::now(),
    }
  }

  fn stored(message: AlertMessage, created_at: DateTime<Utc>) -> Alert {
    NewAlert::new(AlertType::Warning, message).into_alert(created_at)
  }

  #[test]
  fn healthy_reading_raises_nothing() {
    assert!(threshold_candidates(&reading(70.0, 90.0, 45.0, Vibration::Low)).is_empty());
  }

  #[test]
  fn every_threshold_can_fire_together() {
    let alerts = threshold_candidates(&reading(10.0, 40.0, 20.0, Vibration::High));
    let keys: Vec<_> = alerts.iter().map(|a| a.message.key).collect();
    assert_eq!(
      keys,
      vec![
        AlertKey::AlertCriticalWater,
        AlertKey::AlertPoorWater,
        AlertKey::AlertHighVibration,
        AlertKey::AlertLowMoisture,
      ]
    );
    assert_eq!(alerts[0].alert_type, AlertType::Critical);
    assert_eq!(alerts[3].alert_type, AlertType::Info);
  }

  #[test]
  fn water_bands_are_exclusive() {
    let at_twenty = threshold_candidates(&reading(20.0, 90.0, 45.0, Vibration::Low));
    assert_eq!(at_twenty.len(), 1);
    assert_eq!(at_twenty[0].message.key, AlertKey::AlertLowWater);

    let at_thirty_five = threshold_candidates(&reading(35.0, 90.0, 45.0, Vibration::Low));
    assert!(at_thirty_five.is_empty());
  }

  #[test]
  fn identical_message_inside_window_is_suppressed() {
    let now = Utc::now();
    let msg = AlertMessage::new(AlertKey::AlertLowWater).with("level", 28.0);
    let text = msg.canonical().unwrap();
    let history = vec![stored(msg, now - Duration::minutes(9))];

    assert!(!should_emit(&text, now, &history).unwrap());
  }

  #[test]
  fn window_edge_and_dismissal_allow_repeat() {
    let now = Utc::now();
    let msg = AlertMessage::new(AlertKey::AlertLowWater).with("level", 28.0);
    let text = msg.canonical().unwrap();

    let expired = vec![stored(msg.clone(), now - Duration::minutes(10))];
    assert!(should_emit(&text, now, &expired).unwrap());

    let mut dismissed = stored(msg, now - Duration::minutes(1));
    dismissed.is_dismissed = true;
    dismissed.dismissed_at = Some(now);
    assert!(should_emit(&text, now, &[dismissed]).unwrap());
  }

  #[test]
  fn different_parameters_are_not_duplicates() {
    let now = Utc::now();
    let old = AlertMessage::new(AlertKey::AlertLowWater).with("level", 28.0);
    let new = AlertMessage::new(AlertKey::AlertLowWater).with("level", 27.9);
    let history = vec![stored(old, now)];
    assert!(should_emit(&new.canonical().unwrap(), now, &history).unwrap());
  }
}

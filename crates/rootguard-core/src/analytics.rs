//! Period analytics: water usage, cost savings, efficiency and alert counts.
//!
//! Everything here is a pure function over records already filtered to the
//! period by the caller.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  alert::{Alert, AlertType},
  reading::SensorReading,
  session::IrrigationSession,
};

/// Share of water a manual regime would have wasted.
pub const EFFICIENCY_IMPROVEMENT: f64 = 0.40;
pub const COST_PER_LITER: f64 = 0.05;
pub const LABOUR_SAVED_PER_DAY: f64 = 50.0;
pub const SYSTEM_COST: f64 = 20_000.0;

pub const OPTIMAL_MOISTURE_MIN: f64 = 40.0;
pub const OPTIMAL_MOISTURE_MAX: f64 = 70.0;

fn round_to(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

// ─── Water usage ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
  pub water_liters:     f64,
  pub sessions:         u32,
  pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterUsage {
  pub total_water_liters: f64,
  pub total_sessions:     u32,
  pub avg_per_session:    f64,
  pub daily_breakdown:    BTreeMap<NaiveDate, DailyUsage>,
  pub period_days:        u32,
}

/// Open sessions count towards the session total but contribute no volume.
pub fn water_usage(days: u32, sessions: &[IrrigationSession]) -> WaterUsage {
  let mut daily: BTreeMap<NaiveDate, DailyUsage> = BTreeMap::new();
  let mut total = 0.0;

  for session in sessions {
    let volume = session.estimated_volume_liters.unwrap_or(0.0);
    total += volume;

    let day = daily.entry(session.started_at.date_naive()).or_default();
    day.water_liters += volume;
    day.sessions += 1;
    day.duration_minutes += session.duration_minutes.unwrap_or(0);
  }

  let count = sessions.len() as u32;
  let avg = if count > 0 { total / f64::from(count) } else { 0.0 };

  WaterUsage {
    total_water_liters: round_to(total, 1),
    total_sessions:     count,
    avg_per_session:    round_to(avg, 1),
    daily_breakdown:    daily,
    period_days:        days,
  }
}

// ─── Cost savings ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSavings {
  pub water_saved_liters:    f64,
  pub water_cost_saved:      f64,
  pub labour_cost_saved:     f64,
  pub total_savings:         f64,
  pub efficiency_percent:    u32,
  pub daily_savings:         f64,
  pub payback_period_days:   f64,
  pub payback_period_months: f64,
  pub period_days:           u32,
}

/// Savings relative to a manual regime that would have used
/// `total / (1 - EFFICIENCY_IMPROVEMENT)` liters. `days` must be non-zero.
pub fn cost_savings(days: u32, usage: &WaterUsage) -> CostSavings {
  let used = usage.total_water_liters;
  let water_saved = used / (1.0 - EFFICIENCY_IMPROVEMENT) - used;
  let water_cost_saved = water_saved * COST_PER_LITER;
  let labour_cost_saved = f64::from(days) * LABOUR_SAVED_PER_DAY;
  let total = water_cost_saved + labour_cost_saved;

  let daily = total / f64::from(days.max(1));
  let payback_days = if daily > 0.0 { SYSTEM_COST / daily } else { 0.0 };

  CostSavings {
    water_saved_liters:    round_to(water_saved, 1),
    water_cost_saved:      round_to(water_cost_saved, 2),
    labour_cost_saved:     round_to(labour_cost_saved, 2),
    total_savings:         round_to(total, 2),
    efficiency_percent:    (EFFICIENCY_IMPROVEMENT * 100.0).round() as u32,
    daily_savings:         round_to(daily, 2),
    payback_period_days:   payback_days.round(),
    payback_period_months: round_to(payback_days / 30.0, 1),
    period_days:           days,
  }
}

// ─── Efficiency ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Efficiency {
  pub avg_soil_moisture:        f64,
  pub optimal_moisture_percent: f64,
  pub avg_water_level:          f64,
  pub avg_flow_rate:            f64,
  pub total_readings:           u32,
}

pub fn efficiency(readings: &[SensorReading]) -> Efficiency {
  if readings.is_empty() {
    return Efficiency::default();
  }

  let n = readings.len() as f64;
  let mean = |f: fn(&SensorReading) -> f64| readings.iter().map(f).sum::<f64>() / n;
  let optimal = readings
    .iter()
    .filter(|r| (OPTIMAL_MOISTURE_MIN..=OPTIMAL_MOISTURE_MAX).contains(&r.soil_moisture))
    .count() as f64;

  Efficiency {
    avg_soil_moisture:        round_to(mean(|r| r.soil_moisture), 1),
    optimal_moisture_percent: round_to(optimal / n * 100.0, 1),
    avg_water_level:          round_to(mean(|r| r.water_level), 1),
    avg_flow_rate:            round_to(mean(|r| r.flow_rate), 1),
    total_readings:           readings.len() as u32,
  }
}

// ─── Alert summary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
  pub total_alerts: u32,
  pub critical:     u32,
  pub warning:      u32,
  pub info:         u32,
  pub dismissed:    u32,
  pub active:       u32,
}

pub fn alert_summary(alerts: &[Alert]) -> AlertSummary {
  let mut summary = AlertSummary::default();
  for alert in alerts {
    summary.total_alerts += 1;
    match alert.alert_type {
      AlertType::Critical => summary.critical += 1,
      AlertType::Warning => summary.warning += 1,
      AlertType::Info => summary.info += 1,
    }
    if alert.is_dismissed {
      summary.dismissed += 1;
    }
  }
  summary.active = summary.total_alerts - summary.dismissed;
  summary
}

// ─── Comprehensive ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
  pub water_usage:  WaterUsage,
  pub cost_savings: CostSavings,
  pub efficiency:   Efficiency,
  pub alerts:       AlertSummary,
  pub period_days:  u32,
}

pub fn comprehensive(
  days: u32,
  sessions: &[IrrigationSession],
  readings: &[SensorReading],
  alerts: &[Alert],
) -> Analytics {
  let water_usage = water_usage(days, sessions);
  let cost_savings = cost_savings(days, &water_usage);
  Analytics {
    cost_savings,
    water_usage,
    efficiency: efficiency(readings),
    alerts: alert_summary(alerts),
    period_days: days,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    alert::{AlertKey, AlertMessage, NewAlert},
    control::Mode,
    reading::Vibration,
    session::ClosingFigures,
  };

  fn closed_session(start: chrono::DateTime<Utc>, minutes: i64) -> IrrigationSession {
    let figures = ClosingFigures::compute(start, start + Duration::minutes(minutes));
    IrrigationSession {
      session_id:              Uuid::new_v4(),
      mode:                    Mode::Normal,
      started_at:              start,
      ended_at:                Some(figures.ended_at),
      duration_minutes:        Some(figures.duration_minutes),
      estimated_volume_liters: Some(figures.estimated_volume_liters),
      trigger_reason:          "reason_low_moisture".into(),
      sensor_reading_id:       None,
    }
  }

  fn reading(soil: f64, water: f64, flow: f64) -> SensorReading {
    SensorReading {
      reading_id:       Uuid::new_v4(),
      water_level:      water,
      flow_rate:        flow,
      turbidity:        90.0,
      soil_moisture:    soil,
      vibration_status: Vibration::Low,
      timestamp:        Utc::now(),
    }
  }

  #[test]
  fn water_usage_groups_by_start_day() {
    let day1 = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let day2 = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();
    let mut open = closed_session(day2, 0);
    open.ended_at = None;
    open.duration_minutes = None;
    open.estimated_volume_liters = None;

    let sessions = vec![closed_session(day1, 10), closed_session(day1, 4), open];
    let usage = water_usage(7, &sessions);

    assert_eq!(usage.total_water_liters, 210.0);
    assert_eq!(usage.total_sessions, 3);
    assert_eq!(usage.avg_per_session, 70.0);

    let d1 = &usage.daily_breakdown[&day1.date_naive()];
    assert_eq!(d1.sessions, 2);
    assert_eq!(d1.duration_minutes, 14);
    assert_eq!(d1.water_liters, 210.0);
    assert_eq!(usage.daily_breakdown[&day2.date_naive()].sessions, 1);
  }

  #[test]
  fn empty_period_has_zero_usage_and_labour_only_savings() {
    let usage = water_usage(7, &[]);
    assert_eq!(usage.avg_per_session, 0.0);

    let savings = cost_savings(7, &usage);
    assert_eq!(savings.water_saved_liters, 0.0);
    assert_eq!(savings.labour_cost_saved, 350.0);
    assert_eq!(savings.daily_savings, 50.0);
    assert_eq!(savings.payback_period_days, 400.0);
    assert_eq!(savings.payback_period_months, 13.3);
    assert_eq!(savings.efficiency_percent, 40);
  }

  #[test]
  fn water_savings_assume_forty_percent_efficiency() {
    let start = Utc::now() - Duration::hours(1);
    // 40 minutes at 15 L/min = 600 L; manual would have used 1000 L.
    let usage = water_usage(1, &[closed_session(start, 40)]);
    let savings = cost_savings(1, &usage);
    assert_eq!(savings.water_saved_liters, 400.0);
    assert_eq!(savings.water_cost_saved, 20.0);
    assert_eq!(savings.total_savings, 70.0);
  }

  #[test]
  fn efficiency_counts_optimal_band_inclusively() {
    let readings = vec![
      reading(40.0, 60.0, 10.0),
      reading(70.0, 70.0, 12.0),
      reading(30.0, 80.0, 14.0),
      reading(71.0, 90.0, 16.0),
    ];
    let eff = efficiency(&readings);
    assert_eq!(eff.optimal_moisture_percent, 50.0);
    assert_eq!(eff.avg_soil_moisture, 52.8);
    assert_eq!(eff.avg_water_level, 75.0);
    assert_eq!(eff.avg_flow_rate, 13.0);
    assert_eq!(eff.total_readings, 4);

    assert_eq!(efficiency(&[]), Efficiency::default());
  }

  #[test]
  fn alert_summary_counts_types_and_dismissals() {
    let now = Utc::now();
    let mk = |t| NewAlert::new(t, AlertMessage::new(AlertKey::AlertLowWater)).into_alert(now);
    let mut dismissed = mk(AlertType::Info);
    dismissed.is_dismissed = true;

    let summary =
      alert_summary(&[mk(AlertType::Critical), mk(AlertType::Warning), mk(AlertType::Warning), dismissed]);
    assert_eq!(
      summary,
      AlertSummary { total_alerts: 4, critical: 1, warning: 2, info: 1, dismissed: 1, active: 3 }
    );
  }
}

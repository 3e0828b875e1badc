//! Synthetic sensor feed for the control loop.
//!
//! The first reading is drawn uniformly from a healthy band; every later one
//! is a bounded random walk from the previous, rounded to one decimal.

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rootguard_core::reading::{NewReading, SensorReading, Vibration};

const HIGH_VIBRATION_PROBABILITY: f64 = 0.05;

/// Per-step walk bounds: (max step, lower clamp, upper clamp).
const WATER_WALK: (f64, f64, f64) = (2.0, 0.0, 100.0);
const FLOW_WALK: (f64, f64, f64) = (1.0, 0.0, 20.0);
const TURBIDITY_WALK: (f64, f64, f64) = (1.5, 0.0, 100.0);
const SOIL_WALK: (f64, f64, f64) = (3.0, 0.0, 100.0);

fn round1(v: f64) -> f64 { (v * 10.0).round() / 10.0 }

pub struct Simulator {
  rng:      StdRng,
  previous: Option<NewReading>,
}

impl Simulator {
  pub fn new() -> Self { Self { rng: StdRng::from_entropy(), previous: None } }

  /// Deterministic feed, for tests.
  pub fn seeded(seed: u64) -> Self { Self { rng: StdRng::seed_from_u64(seed), previous: None } }

  /// Continue the walk from a reading already in the store.
  pub fn resume_from(mut self, reading: &SensorReading) -> Self {
    self.previous = Some(NewReading {
      water_level:      reading.water_level,
      flow_rate:        reading.flow_rate,
      turbidity:        reading.turbidity,
      soil_moisture:    reading.soil_moisture,
      vibration_status: reading.vibration_status,
      timestamp:        reading.timestamp,
    });
    self
  }

  pub fn next_reading(&mut self) -> NewReading {
    let vibration_status = if self.rng.gen_bool(HIGH_VIBRATION_PROBABILITY) {
      Vibration::High
    } else {
      Vibration::Low
    };

    let reading = match &self.previous {
      None => NewReading {
        water_level: round1(self.rng.gen_range(60.0..=80.0)),
        flow_rate: round1(self.rng.gen_range(8.0..=15.0)),
        turbidity: round1(self.rng.gen_range(75.0..=95.0)),
        soil_moisture: round1(self.rng.gen_range(35.0..=55.0)),
        vibration_status,
        timestamp: Utc::now(),
      },
      Some(prev) => {
        let (water, flow, turbidity, soil) =
          (prev.water_level, prev.flow_rate, prev.turbidity, prev.soil_moisture);
        NewReading {
          water_level: self.walk(water, WATER_WALK),
          flow_rate: self.walk(flow, FLOW_WALK),
          turbidity: self.walk(turbidity, TURBIDITY_WALK),
          soil_moisture: self.walk(soil, SOIL_WALK),
          vibration_status,
          timestamp: Utc::now(),
        }
      }
    };

    self.previous = Some(reading.clone());
    reading
  }

  fn walk(&mut self, from: f64, (step, lo, hi): (f64, f64, f64)) -> f64 {
    round1((from + self.rng.gen_range(-step..=step)).clamp(lo, hi))
  }
}

impl Default for Simulator {
  fn default() -> Self { Self::new() }
}

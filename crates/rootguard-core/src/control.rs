//! The control-state singleton: operating mode and pump status.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Operating mode of the irrigation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// Irrigate to keep the soil comfortably moist.
  #[default]
  Normal,
  /// Conserve borewell water; irrigate only when the soil is critically dry.
  Survival,
  /// The engine never touches the pump; only operators do.
  Manual,
  /// Pump forced off.
  Off,
}

impl Mode {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Normal => "normal",
      Self::Survival => "survival",
      Self::Manual => "manual",
      Self::Off => "off",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Mode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "normal" => Ok(Self::Normal),
      "survival" => Ok(Self::Survival),
      "manual" => Ok(Self::Manual),
      "off" => Ok(Self::Off),
      other => Err(Error::Validation(format!("unknown mode: {other:?}"))),
    }
  }
}

/// The one current control state. Lives in a single store slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
  pub mode:          Mode,
  pub is_irrigating: bool,
  pub auto_mode:     bool,
  pub last_updated:  DateTime<Utc>,
}

impl ControlState {
  /// First-use default: normal mode, pump idle, automation enabled.
  pub fn initial(now: DateTime<Utc>) -> Self {
    Self {
      mode:          Mode::Normal,
      is_irrigating: false,
      auto_mode:     true,
      last_updated:  now,
    }
  }
}

/// A partial manual update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlUpdate {
  pub mode:          Option<Mode>,
  pub is_irrigating: Option<bool>,
  pub auto_mode:     Option<bool>,
}

impl ControlUpdate {
  /// Apply the update to `state`, returning the resulting state.
  ///
  /// Switching to [`Mode::Off`] stops the pump, and a request to irrigate is
  /// ignored while the resulting mode is `Off`.
  pub fn apply_to(&self, state: &ControlState, now: DateTime<Utc>) -> ControlState {
    let mut next = state.clone();

    if let Some(mode) = self.mode {
      next.mode = mode;
      if mode == Mode::Off {
        next.is_irrigating = false;
      }
    }

    if let Some(irrigate) = self.is_irrigating {
      next.is_irrigating = irrigate && next.mode != Mode::Off;
    }

    if let Some(auto) = self.auto_mode {
      next.auto_mode = auto;
    }

    next.last_updated = now;
    next
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mode_round_trips_through_str() {
    for m in [Mode::Normal, Mode::Survival, Mode::Manual, Mode::Off] {
      assert_eq!(m.as_str().parse::<Mode>().unwrap(), m);
    }
    assert!(matches!("turbo".parse::<Mode>(), Err(Error::Validation(_))));
  }

  #[test]
  fn off_stops_pump_and_blocks_start() {
    let now = Utc::now();
    let running = ControlState { is_irrigating: true, ..ControlState::initial(now) };

    let update = ControlUpdate {
      mode: Some(Mode::Off),
      is_irrigating: Some(true),
      ..Default::default()
    };
    let next = update.apply_to(&running, now);
    assert_eq!(next.mode, Mode::Off);
    assert!(!next.is_irrigating);
  }

  #[test]
  fn empty_update_only_touches_timestamp() {
    let before = ControlState::initial(Utc::now());
    let later = before.last_updated + chrono::Duration::seconds(3);
    let next = ControlUpdate::default().apply_to(&before, later);
    assert_eq!(next.mode, before.mode);
    assert_eq!(next.is_irrigating, before.is_irrigating);
    assert_eq!(next.auto_mode, before.auto_mode);
    assert_eq!(next.last_updated, later);
  }

  #[test]
  fn unknown_mode_in_json_is_rejected() {
    let parsed: Result<ControlUpdate, _> = serde_json::from_str(r#"{"mode":"turbo"}"#);
    assert!(parsed.is_err());
  }
}

//! Auto-irrigation decision engine.
//!
//! [`evaluate`] is a pure function of one reading and the current control
//! state. It returns the next state together with the side effects the
//! controller must carry out (session bookkeeping and alerts). It never
//! touches storage.
//!
//! Per tick, in order:
//!
//! 1. Nothing happens unless `auto_mode` is on and the mode is not `off`.
//! 2. Start check: `normal` wants water when soil < 40 and well > 30;
//!    `survival` when soil < 20 and well > 50. `manual` never auto-starts.
//! 3. Safety: well < 25 or high pump vibration veto a start and stop a
//!    running pump.
//! 4. Stop check (pump running, mode not `manual`): `normal` stops when
//!    soil > 60, `survival` when soil > 35.
//! 5. Escalation: `normal` with well < 30 switches to `survival`. This is
//!    evaluated against the mode at the start of the tick, independently of
//!    steps 2–4, and is never reversed automatically.
//!
//! All comparisons are strict.

use chrono::{DateTime, Utc};

use crate::{
  alert::{AlertKey, AlertMessage, AlertType, NewAlert, ReasonKey},
  control::{ControlState, Mode},
  reading::SensorReading,
};

const NORMAL_START_MOISTURE: f64 = 40.0;
const NORMAL_START_WATER: f64 = 30.0;
const SURVIVAL_START_MOISTURE: f64 = 20.0;
const SURVIVAL_START_WATER: f64 = 50.0;

const SAFETY_MIN_WATER: f64 = 25.0;

const NORMAL_STOP_MOISTURE: f64 = 60.0;
const SURVIVAL_STOP_MOISTURE: f64 = 35.0;

const ESCALATION_WATER: f64 = 30.0;

/// Something the controller must do as a consequence of a decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
  /// Open a session and raise `alert` linked to it.
  StartSession {
    mode:   Mode,
    reason: ReasonKey,
    alert:  NewAlert,
  },
  /// Close the open session and raise `alert` linked to it.
  StopSession { alert: NewAlert },
  /// Raise an alert unrelated to a session.
  Alert(NewAlert),
}

/// The engine's verdict for one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
  pub state:   ControlState,
  pub effects: Vec<Effect>,
}

impl Decision {
  pub fn changed(&self) -> bool { !self.effects.is_empty() }
}

/// Why the safety rules forbid running the pump, if they do.
fn safety_veto(reading: &SensorReading) -> Option<ReasonKey> {
  if reading.water_level < SAFETY_MIN_WATER {
    Some(ReasonKey::ReasonLowWater)
  } else if reading.vibration_status.is_high() {
    Some(ReasonKey::ReasonHighVibration)
  } else {
    None
  }
}

/// The start reason if `mode` wants the pump on for this reading.
fn start_reason(mode: Mode, reading: &SensorReading) -> Option<ReasonKey> {
  match mode {
    Mode::Normal
      if reading.soil_moisture < NORMAL_START_MOISTURE
        && reading.water_level > NORMAL_START_WATER =>
    {
      Some(ReasonKey::ReasonLowMoisture)
    }
    Mode::Survival
      if reading.soil_moisture < SURVIVAL_START_MOISTURE
        && reading.water_level > SURVIVAL_START_WATER =>
    {
      Some(ReasonKey::ReasonCriticalMoistureSurvival)
    }
    _ => None,
  }
}

/// The stop message if `mode` considers the soil wet enough.
fn stop_message(mode: Mode, reading: &SensorReading) -> Option<AlertMessage> {
  match mode {
    Mode::Normal if reading.soil_moisture > NORMAL_STOP_MOISTURE => Some(
      AlertMessage::new(AlertKey::AlertAutoIrrigationStopped)
        .with_reason(ReasonKey::ReasonMoistureSufficient, reading.soil_moisture),
    ),
    Mode::Survival if reading.soil_moisture > SURVIVAL_STOP_MOISTURE => Some(
      AlertMessage::new(AlertKey::AlertSurvivalIrrigationStopped)
        .with_reason(ReasonKey::ReasonTargetReached, reading.soil_moisture),
    ),
    _ => None,
  }
}

fn safety_stop_message(reason: ReasonKey, reading: &SensorReading) -> AlertMessage {
  let msg = AlertMessage::new(AlertKey::AlertSafetyIrrigationStopped).with("reason_key", reason.as_str());
  match reason {
    ReasonKey::ReasonLowWater => msg.with("level", reading.water_level),
    _ => msg,
  }
}

/// Decide what to do with `reading` given `state`.
pub fn evaluate(reading: &SensorReading, state: &ControlState, now: DateTime<Utc>) -> Decision {
  let mut next = state.clone();
  let mut effects = Vec::new();

  if !state.auto_mode || state.mode == Mode::Off {
    return Decision { state: next, effects };
  }

  let veto = safety_veto(reading);
  let start = start_reason(state.mode, reading).filter(|_| veto.is_none());

  if !state.is_irrigating {
    if let Some(reason) = start {
      next.is_irrigating = true;
      let message = AlertMessage::new(AlertKey::AlertAutoIrrigationStarted)
        .with_reason(reason, reading.soil_moisture);
      effects.push(Effect::StartSession {
        mode: state.mode,
        reason,
        alert: NewAlert::new(AlertType::Info, message).for_reading(reading.reading_id),
      });
    }
  } else if state.mode != Mode::Manual && start.is_none() {
    let stop = match veto {
      Some(reason) => Some((AlertType::Warning, safety_stop_message(reason, reading))),
      None => stop_message(state.mode, reading).map(|m| (AlertType::Info, m)),
    };
    if let Some((alert_type, message)) = stop {
      next.is_irrigating = false;
      effects.push(Effect::StopSession {
        alert: NewAlert::new(alert_type, message).for_reading(reading.reading_id),
      });
    }
  }

  if state.mode == Mode::Normal && reading.water_level < ESCALATION_WATER {
    next.mode = Mode::Survival;
    effects.push(Effect::Alert(
      NewAlert::new(
        AlertType::Critical,
        AlertMessage::new(AlertKey::AlertSurvivalModeSwitch),
      )
      .for_reading(reading.reading_id),
    ));
  }

  if !effects.is_empty() {
    next.last_updated = now;
  }

  Decision { state: next, effects }
}

//! The periodic driver: one simulated reading into the controller per tick.

use std::{sync::Arc, time::Duration};

use rootguard_core::{controller::Controller, store::IrrigationStore};
use tokio::{sync::watch, task::JoinHandle, time::interval};

use crate::simulator::Simulator;

/// Start the loop on its own task.
///
/// The first tick fires immediately. Once `shutdown` flips to `true` no new
/// tick is taken; a tick already in progress is allowed to finish.
pub fn spawn<S>(
  controller: Arc<Controller<S>>,
  simulator: Simulator,
  period: Duration,
  mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
  S: IrrigationStore + 'static,
{
  tokio::spawn(async move {
    let mut simulator = simulator;
    let mut ticker = interval(period);
    tracing::info!(period_secs = period.as_secs_f64(), "control loop started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {}
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            break;
          }
          continue;
        }
      }

      let reading = simulator.next_reading();
      match controller.ingest_reading(reading).await {
        Ok(health) => tracing::debug!(
          score = health.score,
          status = health.status.as_str(),
          "tick complete"
        ),
        Err(e) => tracing::error!(error = %e, "tick failed"),
      }
    }

    tracing::info!("control loop stopped");
  })
}

/// Seed a simulator from the last stored reading so restarts do not jump.
pub async fn resume_simulator<S: IrrigationStore>(controller: &Controller<S>) -> Simulator {
  match controller.latest_reading().await {
    Ok(Some(reading)) => Simulator::new().resume_from(&reading),
    Ok(None) => Simulator::new(),
    Err(e) => {
      tracing::warn!(error = %e, "could not load last reading; starting fresh");
      Simulator::new()
    }
  }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing orchestration events to the logger
//! (ESP-IDF console on the device, `tracing-subscriber` on the host).

use core::time::Duration;

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as a single line.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, at: Duration, event: &AppEvent) {
        let t = at.as_secs_f32();
        match event {
            AppEvent::Started(state) => {
                info!("[{t:9.3}] START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("[{t:9.3}] STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::TriggerDetected { count } => {
                info!("[{t:9.3}] TRIG  | motion #{}", count);
            }
            AppEvent::SensorFault(e) => {
                warn!("[{t:9.3}] FAULT | sensor: {}", e);
            }
            AppEvent::AmbientStarted => {
                info!("[{t:9.3}] AMB   | started");
            }
            AppEvent::AmbientStopped(r) => {
                info!("[{t:9.3}] AMB   | stopped, faults={}", r.faults);
            }
            AppEvent::RoutineFinished(r) => {
                info!(
                    "[{t:9.3}] FX    | {} {} faults={}",
                    r.name,
                    if r.cancelled { "cancelled" } else { "done" },
                    r.faults
                );
            }
            AppEvent::AlertFinished { faults, safe_faults } => {
                info!("[{t:9.3}] ALERT | joined, faults={} safe_faults={}", faults, safe_faults);
            }
            AppEvent::ShutdownRequested => {
                info!("[{t:9.3}] STOP  | shutdown requested");
            }
            AppEvent::ShutdownComplete(s) => {
                info!(
                    "[{t:9.3}] STOP  | safe; triggers={} alerts={} sensor_faults={} driver_faults={}",
                    s.triggers, s.alerts_completed, s.sensor_faults, s.driver_faults
                );
            }
        }
    }
}

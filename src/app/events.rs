//! Outbound orchestration events.
//!
//! The [`Orchestrator`](super::orchestrator::Orchestrator) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder).

use crate::effects::RoutineReport;
use crate::error::SensorError;
use crate::fsm::StateId;

use super::orchestrator::RunSummary;

/// Structured events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The control loop has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// The trigger gate fired; `count` is the running trigger total.
    TriggerDetected { count: u32 },

    /// A sensor read failed and was treated as "no motion".
    SensorFault(SensorError),

    /// The ambient routine was (re)started.
    AmbientStarted,

    /// The ambient routine exited after cancellation.
    AmbientStopped(RoutineReport),

    /// One alert routine reached its end (natural or cancelled).
    RoutineFinished(RoutineReport),

    /// Every alert routine joined and the rig was forced safe.
    AlertFinished {
        /// Driver faults across all alert routines.
        faults: u16,
        /// Failed commands during the force-safe sweep.
        safe_faults: u16,
    },

    /// Shutdown was requested; running routines are being cancelled.
    ShutdownRequested,

    /// The rig is safe and the loop has exited.
    ShutdownComplete(RunSummary),
}

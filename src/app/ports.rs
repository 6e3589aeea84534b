//! Port traits: the hexagonal boundary between orchestration and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Orchestrator / effect routines
//! ```
//!
//! Driven adapters (PIR, DFPlayer, H-bridge, LEDC lamps, clocks, event sinks)
//! implement these traits.  The [`Orchestrator`](super::orchestrator::Orchestrator)
//! consumes them via generics, so the core never touches a register and the
//! test suite can swap in a mock rig plus a virtual clock.
//!
//! Every actuator call is fire-and-forget: it returns once the command has
//! been handed to the peripheral, and any completion (a track finishing, a
//! motor spinning down) is *assumed* by the caller's own timed waits.

use core::future::Future;
use core::time::Duration;

use crate::error::{DriverError, SensorError};

/// Result of a single actuator command.
pub type CommandResult = Result<(), DriverError>;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → core)
// ───────────────────────────────────────────────────────────────

/// Motion sensor.  No debouncing contract: the trigger gate handles that.
pub trait SensorPort {
    /// Non-blocking read of the current motion signal.
    fn motion_detected(&mut self) -> Result<bool, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapters: core → hardware)
// ───────────────────────────────────────────────────────────────

/// Folder/track addressed audio module.
pub trait AudioPort {
    /// Set output volume (0–30 on a DFPlayer).
    fn set_volume(&mut self, level: u8) -> CommandResult;

    /// Start playing `track` from `folder`.  Returns immediately.
    fn play(&mut self, folder: u8, track: u8) -> CommandResult;

    /// Stop whatever is playing.
    fn stop(&mut self) -> CommandResult;
}

/// Single DC motor behind an H-bridge.
pub trait MotorPort {
    /// Select forward direction.  Does not change duty.
    fn set_forward(&mut self) -> CommandResult;

    /// Set PWM duty (0–100).
    fn set_duty(&mut self, duty: u8) -> CommandResult;

    /// Zero duty and release both bridge inputs.
    fn stop(&mut self) -> CommandResult;
}

/// Dimmable light outputs addressed by channel.
pub trait LightPort {
    /// Set the duty of `channel` (0–100).
    fn set_intensity(&mut self, channel: u8, level: u8) -> CommandResult;

    /// Number of addressable channels.
    fn channel_count(&self) -> u8;
}

/// Everything an effect routine can drive.  Blanket-implemented.
pub trait PropHardware: SensorPort + AudioPort + MotorPort + LightPort {}

impl<T: SensorPort + AudioPort + MotorPort + LightPort> PropHardware for T {}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus an async wait.
///
/// Production uses the timer reactor; tests use a
/// [`VirtualClock`](crate::adapters::time::VirtualClock) whose time only moves
/// when every task is parked on a sleep.
pub trait Clock {
    /// Time since the clock was created.
    fn now(&self) -> Duration;

    /// Complete after `duration` has elapsed.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging)
// ───────────────────────────────────────────────────────────────

/// The orchestrator emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port, stamped with the clock time they happened at.
pub trait EventSink {
    fn emit(&mut self, at: Duration, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from loading a [`PropConfig`](crate::config::PropConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Named preset does not exist.
    UnknownPreset,
    /// Document failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownPreset => write!(f, "unknown preset"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UnknownPreset => Self::Config("unknown preset"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}

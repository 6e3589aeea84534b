//! Hardware adapter: bridges real peripherals to the port traits.
//!
//! Owns the PIR sensor, the DFPlayer, the motor bridge and the lamp bank,
//! exposing them through [`SensorPort`], [`AudioPort`], [`MotorPort`] and
//! [`LightPort`].  This is the only module that touches actual hardware.
//! On non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs.

use crate::app::ports::{AudioPort, Clock, CommandResult, LightPort, MotorPort, SensorPort};
use crate::drivers::dfplayer::DfPlayer;
use crate::drivers::lamp::LampBank;
use crate::drivers::motor::MotorDriver;
use crate::drivers::pir::PirSensor;
use crate::drivers::serial::SerialPort;
use crate::error::SensorError;

use super::time::MonotonicClock;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<P: SerialPort> {
    pir: PirSensor,
    audio: DfPlayer<P>,
    motor: MotorDriver,
    lamps: LampBank,
    /// Power-on reference for the PIR warm-up window.
    uptime: MonotonicClock,
}

impl<P: SerialPort> HardwareAdapter<P> {
    pub fn new(pir: PirSensor, audio: DfPlayer<P>, motor: MotorDriver, lamps: LampBank) -> Self {
        Self {
            pir,
            audio,
            motor,
            lamps,
            uptime: MonotonicClock::new(),
        }
    }

    pub fn motor(&self) -> &MotorDriver {
        &self.motor
    }

    pub fn lamps(&self) -> &LampBank {
        &self.lamps
    }

    pub fn audio(&self) -> &DfPlayer<P> {
        &self.audio
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<P: SerialPort> SensorPort for HardwareAdapter<P> {
    fn motion_detected(&mut self) -> Result<bool, SensorError> {
        self.pir.read(self.uptime.now())
    }
}

// ── Actuator port implementations ─────────────────────────────

impl<P: SerialPort> AudioPort for HardwareAdapter<P> {
    fn set_volume(&mut self, level: u8) -> CommandResult {
        self.audio.set_volume(level)
    }

    fn play(&mut self, folder: u8, track: u8) -> CommandResult {
        self.audio.play(folder, track)
    }

    fn stop(&mut self) -> CommandResult {
        self.audio.stop()
    }
}

impl<P: SerialPort> MotorPort for HardwareAdapter<P> {
    fn set_forward(&mut self) -> CommandResult {
        self.motor.forward()
    }

    fn set_duty(&mut self, duty: u8) -> CommandResult {
        self.motor.set_duty(duty)
    }

    fn stop(&mut self) -> CommandResult {
        self.motor.stop()
    }
}

impl<P: SerialPort> LightPort for HardwareAdapter<P> {
    fn set_intensity(&mut self, channel: u8, level: u8) -> CommandResult {
        self.lamps.set(channel, level)
    }

    fn channel_count(&self) -> u8 {
        self.lamps.count()
    }
}

//! Mock prop rig for integration tests.
//!
//! Records every actuator call with the virtual time it was issued at, so
//! tests can assert on the full command history and its timing without
//! touching real GPIO/PWM/UART.  The motion sensor follows a script of
//! time windows read off the same virtual clock.

#![allow(dead_code)]

use std::time::Duration;

use propctl::adapters::time::VirtualClock;
use propctl::app::events::AppEvent;
use propctl::app::ports::{AudioPort, Clock, CommandResult, EventSink, LightPort, MotorPort, SensorPort};
use propctl::config::{
    AlertConfig, AmbientConfig, FadeConfig, FlashConfig, LightingConfig, MotorConfig, PropConfig,
    TimingConfig, TrackList,
};
use propctl::error::{DriverError, SensorError};
use propctl::fsm::StateId;

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
    Volume(u8),
    Play { folder: u8, track: u8 },
    AudioStop,
    Forward,
    Duty(u8),
    MotorStop,
    Light { channel: u8, level: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub at: Duration,
    pub cmd: Cmd,
}

// ── MockRig ───────────────────────────────────────────────────

pub struct MockRig {
    clock: VirtualClock,
    /// Half-open `[start, end)` windows during which motion reads true.
    motion: Vec<(Duration, Option<Duration>)>,
    /// Sensor reads fail before this time.
    sensor_fails_until: Duration,
    broken_channel: Option<u8>,
    channels: u8,
    pub calls: Vec<Call>,
}

impl MockRig {
    pub fn new(clock: &VirtualClock) -> Self {
        Self {
            clock: clock.clone(),
            motion: Vec::new(),
            sensor_fails_until: Duration::ZERO,
            broken_channel: None,
            channels: 4,
            calls: Vec::new(),
        }
    }

    pub fn motion_between(mut self, start: Duration, end: Duration) -> Self {
        self.motion.push((start, Some(end)));
        self
    }

    pub fn motion_from(mut self, start: Duration) -> Self {
        self.motion.push((start, None));
        self
    }

    pub fn sensor_fails_until(mut self, until: Duration) -> Self {
        self.sensor_fails_until = until;
        self
    }

    pub fn break_channel(mut self, channel: u8) -> Self {
        self.broken_channel = Some(channel);
        self
    }

    fn record(&mut self, cmd: Cmd) {
        let at = self.clock.now();
        self.calls.push(Call { at, cmd });
    }

    // ── Queries ───────────────────────────────────────────────

    /// Plays from `folder`, with their timestamps.
    pub fn plays_in(&self, folder: u8) -> Vec<(Duration, u8)> {
        self.calls
            .iter()
            .filter_map(|c| match c.cmd {
                Cmd::Play { folder: f, track } if f == folder => Some((c.at, track)),
                _ => None,
            })
            .collect()
    }

    pub fn calls_at(&self, at: Duration) -> Vec<Cmd> {
        self.calls.iter().filter(|c| c.at == at).map(|c| c.cmd).collect()
    }

    /// Motor duty after the last motor command.
    pub fn motor_duty(&self) -> u8 {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c.cmd {
                Cmd::Duty(d) => Some(d),
                Cmd::MotorStop => Some(0),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Last level written to `channel`.
    pub fn light_level(&self, channel: u8) -> u8 {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c.cmd {
                Cmd::Light { channel: ch, level } if ch == channel => Some(level),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn is_safe(&self) -> bool {
        self.motor_duty() == 0 && (0..self.channels).all(|ch| self.light_level(ch) == 0)
    }
}

impl SensorPort for MockRig {
    fn motion_detected(&mut self) -> Result<bool, SensorError> {
        let now = self.clock.now();
        if now < self.sensor_fails_until {
            return Err(SensorError::GpioReadFailed);
        }
        Ok(self
            .motion
            .iter()
            .any(|&(start, end)| now >= start && end.is_none_or(|e| now < e)))
    }
}

impl AudioPort for MockRig {
    fn set_volume(&mut self, level: u8) -> CommandResult {
        self.record(Cmd::Volume(level));
        Ok(())
    }

    fn play(&mut self, folder: u8, track: u8) -> CommandResult {
        self.record(Cmd::Play { folder, track });
        Ok(())
    }

    fn stop(&mut self) -> CommandResult {
        self.record(Cmd::AudioStop);
        Ok(())
    }
}

impl MotorPort for MockRig {
    fn set_forward(&mut self) -> CommandResult {
        self.record(Cmd::Forward);
        Ok(())
    }

    fn set_duty(&mut self, duty: u8) -> CommandResult {
        self.record(Cmd::Duty(duty));
        Ok(())
    }

    fn stop(&mut self) -> CommandResult {
        self.record(Cmd::MotorStop);
        Ok(())
    }
}

impl LightPort for MockRig {
    fn set_intensity(&mut self, channel: u8, level: u8) -> CommandResult {
        if self.broken_channel == Some(channel) {
            return Err(DriverError::PwmWriteFailed);
        }
        self.record(Cmd::Light { channel, level });
        Ok(())
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<(Duration, AppEvent)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(time, from, to)` for every transition.
    pub fn transitions(&self) -> Vec<(Duration, StateId, StateId)> {
        self.events
            .iter()
            .filter_map(|(at, e)| match e {
                AppEvent::StateChanged { from, to } => Some((*at, *from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn trigger_times(&self) -> Vec<Duration> {
        self.events
            .iter()
            .filter_map(|(at, e)| matches!(e, AppEvent::TriggerDetected { .. }).then_some(*at))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|(_, e)| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, at: Duration, event: &AppEvent) {
        self.events.push((at, event.clone()));
    }
}

// ── Test config ───────────────────────────────────────────────

fn tracks(list: &[u8]) -> TrackList {
    TrackList::from_slice(list).unwrap()
}

/// Deterministic timings: ambient waits exactly 1 s between tracks, the
/// alert audio runs 13 s, the motor 7 s, the lights 3 s and 2 s.
pub fn test_config() -> PropConfig {
    PropConfig {
        timing: TimingConfig {
            poll_interval_ms: 100,
            debounce_polls: 2,
            cooldown_secs: 5,
            rearm_on_release: false,
        },
        ambient: AmbientConfig {
            folder: 1,
            tracks: tracks(&[1, 2, 3]),
            volume: 20,
            min_wait_ms: 1_000,
            max_wait_ms: 1_000,
            cycle_pause_ms: 500,
        },
        alert: AlertConfig {
            folder: 2,
            volume: 25,
            announce_track: 1,
            announce_wait_ms: 3_000,
            cycle_tracks: tracks(&[2, 3, 4]),
            playback_wait_ms: 10_000,
            stop_at_end: false,
        },
        motor: MotorConfig {
            enabled: true,
            start_delay_ms: 3_000,
            duty_percent: 50,
            on_ms: 3_000,
            off_ms: 1_000,
            cycles: 1,
        },
        lighting: LightingConfig {
            fade: Some(FadeConfig {
                channel: 0,
                duration_ms: 3_000,
                steps: 3,
                max_percent: 90,
            }),
            sputter: None,
            flash: Some(FlashConfig {
                channel: 1,
                duration_ms: 2_000,
                count: 2,
                max_percent: 100,
            }),
        },
    }
}

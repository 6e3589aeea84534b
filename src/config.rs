//! Prop configuration parameters
//!
//! All tunable parameters for the prop: poll rate, cooldown, track lists,
//! effect durations.  Loaded once at start-up (preset or JSON file) and
//! validated before the orchestrator is built; nothing changes at run time.

use core::time::Duration;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Maximum number of tracks in any track list.
pub const MAX_TRACKS: usize = 32;

/// Maximum number of light channels the lighting driver exposes.
pub const MAX_LIGHT_CHANNELS: u8 = 4;

/// DFPlayer volume ceiling.
pub const MAX_VOLUME: u8 = 30;

/// Highest numbered SD card folder the DFPlayer addresses.
pub const MAX_FOLDER: u8 = 99;

/// Fixed-capacity track list.
pub type TrackList = Vec<u8, MAX_TRACKS>;

/// Full prop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PropConfig {
    pub timing: TimingConfig,
    pub ambient: AmbientConfig,
    pub alert: AlertConfig,
    pub motor: MotorConfig,
    pub lighting: LightingConfig,
}

/// Sensor polling and re-trigger gating
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Idle-state sensor poll interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Consecutive positive reads required before a trigger
    pub debounce_polls: u8,
    /// Refractory period after an alert (seconds)
    pub cooldown_secs: u16,
    /// Require the sensor to read clear after cooldown before re-arming
    pub rearm_on_release: bool,
}

/// Background ambient audio loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub folder: u8,
    /// Empty list disables the ambient loop
    pub tracks: TrackList,
    pub volume: u8,
    /// Randomised wait after each track (milliseconds, inclusive range)
    pub min_wait_ms: u32,
    pub max_wait_ms: u32,
    /// Fixed pause after the whole list (milliseconds)
    pub cycle_pause_ms: u32,
}

/// Alert audio sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub folder: u8,
    pub volume: u8,
    /// Track played immediately on trigger
    pub announce_track: u8,
    pub announce_wait_ms: u32,
    /// Cyclic sequence, one track per trigger; empty skips the second step
    pub cycle_tracks: TrackList,
    pub playback_wait_ms: u32,
    /// Stop the audio module once the sequence ends
    pub stop_at_end: bool,
}

/// Motor spin pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub enabled: bool,
    pub start_delay_ms: u32,
    /// PWM duty cycle (0-100%)
    pub duty_percent: u8,
    pub on_ms: u32,
    pub off_ms: u32,
    pub cycles: u8,
}

/// Lighting patterns; each `None` pattern is not scheduled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub fade: Option<FadeConfig>,
    pub sputter: Option<SputterConfig>,
    pub flash: Option<FlashConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FadeConfig {
    pub channel: u8,
    pub duration_ms: u32,
    pub steps: u16,
    /// Final intensity (0-100%)
    pub max_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SputterConfig {
    pub channel: u8,
    pub duration_ms: u32,
    pub min_interval_ms: u32,
    pub max_interval_ms: u32,
    pub max_percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashConfig {
    pub channel: u8,
    pub duration_ms: u32,
    /// Number of on/off periods
    pub count: u16,
    pub max_percent: u8,
}

// ---------------------------------------------------------------------------
// Defaults (Houndeye prop)
// ---------------------------------------------------------------------------

impl Default for PropConfig {
    fn default() -> Self {
        Self::houndeye()
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100, // 10 Hz
            debounce_polls: 2,
            cooldown_secs: 5,
            rearm_on_release: false,
        }
    }
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            folder: 1,
            tracks: track_list(&[1, 2, 3, 4, 5, 6, 7, 8, 9]),
            volume: 20,
            min_wait_ms: 2_000,
            max_wait_ms: 5_000,
            cycle_pause_ms: 1_000,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            folder: 2,
            volume: 20,
            announce_track: 1,
            announce_wait_ms: 3_000,
            cycle_tracks: track_list(&[2, 3, 4]),
            playback_wait_ms: 10_000,
            stop_at_end: false,
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay_ms: 3_000,
            duty_percent: 50,
            on_ms: 3_000,
            off_ms: 1_000,
            cycles: 1,
        }
    }
}

fn track_list(tracks: &[u8]) -> TrackList {
    let mut list = TrackList::new();
    for &t in tracks.iter().take(MAX_TRACKS) {
        // Capacity checked by `take`.
        let _ = list.push(t);
    }
    list
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Named configurations for the props this firmware ships on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Houndeye,
    Ghost,
    JitterGhost,
}

impl Preset {
    pub fn config(self) -> PropConfig {
        match self {
            Self::Houndeye => PropConfig::houndeye(),
            Self::Ghost => PropConfig::ghost(),
            Self::JitterGhost => PropConfig::jitter_ghost(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "houndeye" => Some(Self::Houndeye),
            "ghost" => Some(Self::Ghost),
            "jitter-ghost" => Some(Self::JitterGhost),
            _ => None,
        }
    }

    /// Resolve `name` and validate the preset's config.
    pub fn load(name: &str) -> crate::error::Result<PropConfig> {
        let preset = Self::from_name(name).ok_or(ConfigError::UnknownPreset)?;
        let config = preset.config();
        config.validate()?;
        Ok(config)
    }
}

impl PropConfig {
    /// Ambient growl loop, cycling alert barks, short motor lunge.
    pub fn houndeye() -> Self {
        Self {
            timing: TimingConfig::default(),
            ambient: AmbientConfig::default(),
            alert: AlertConfig::default(),
            motor: MotorConfig::default(),
            lighting: LightingConfig {
                fade: Some(FadeConfig {
                    channel: 0,
                    duration_ms: 3_000,
                    steps: 60,
                    max_percent: 100,
                }),
                sputter: None,
                flash: None,
            },
        }
    }

    /// Silent and dark until triggered; one song with a shaking motor.
    pub fn ghost() -> Self {
        Self {
            timing: TimingConfig {
                cooldown_secs: 15,
                ..TimingConfig::default()
            },
            ambient: AmbientConfig {
                tracks: TrackList::new(),
                ..AmbientConfig::default()
            },
            alert: AlertConfig {
                folder: 1,
                volume: 10,
                announce_track: 1,
                announce_wait_ms: 11_000,
                cycle_tracks: TrackList::new(),
                playback_wait_ms: 0,
                stop_at_end: false,
            },
            motor: MotorConfig {
                enabled: true,
                start_delay_ms: 0,
                duty_percent: 50,
                on_ms: 1_000,
                off_ms: 1_000,
                cycles: 5,
            },
            lighting: LightingConfig::default(),
        }
    }

    /// Song, motor and strobing LED, all cut off after ten seconds.
    pub fn jitter_ghost() -> Self {
        Self {
            timing: TimingConfig {
                cooldown_secs: 15,
                ..TimingConfig::default()
            },
            ambient: AmbientConfig {
                tracks: TrackList::new(),
                ..AmbientConfig::default()
            },
            alert: AlertConfig {
                folder: 1,
                volume: 20,
                announce_track: 1,
                announce_wait_ms: 10_000,
                cycle_tracks: TrackList::new(),
                playback_wait_ms: 0,
                stop_at_end: true,
            },
            motor: MotorConfig {
                enabled: true,
                start_delay_ms: 0,
                duty_percent: 50,
                on_ms: 10_000,
                off_ms: 0,
                cycles: 1,
            },
            lighting: LightingConfig {
                fade: None,
                sputter: None,
                flash: Some(FlashConfig {
                    channel: 0,
                    duration_ms: 10_000,
                    count: 10,
                    max_percent: 100,
                }),
            },
        }
    }

    /// Parse a JSON document; missing fields fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.poll_interval_ms == 0 || t.poll_interval_ms > 1_000 {
            return Err(ConfigError::ValidationFailed("poll_interval_ms must be 1..=1000"));
        }
        if t.debounce_polls == 0 {
            return Err(ConfigError::ValidationFailed("debounce_polls must be >= 1"));
        }
        if t.cooldown_secs == 0 || t.cooldown_secs > 600 {
            return Err(ConfigError::ValidationFailed("cooldown_secs must be 1..=600"));
        }

        let a = &self.ambient;
        let al = &self.alert;
        check_folder(a.folder)?;
        check_folder(al.folder)?;
        if al.announce_track == 0 {
            return Err(ConfigError::ValidationFailed("alert announce_track must be >= 1"));
        }
        if a.tracks.contains(&0) || al.cycle_tracks.contains(&0) {
            return Err(ConfigError::ValidationFailed("track numbers must be >= 1"));
        }
        if a.volume > MAX_VOLUME || al.volume > MAX_VOLUME {
            return Err(ConfigError::ValidationFailed("volume must be 0..=30"));
        }
        if a.min_wait_ms > a.max_wait_ms {
            return Err(ConfigError::ValidationFailed("ambient min_wait_ms > max_wait_ms"));
        }
        if !a.tracks.is_empty() && a.max_wait_ms == 0 && a.cycle_pause_ms == 0 {
            return Err(ConfigError::ValidationFailed("ambient loop needs a non-zero wait"));
        }

        let m = &self.motor;
        if m.duty_percent > 100 {
            return Err(ConfigError::ValidationFailed("motor duty_percent must be 0..=100"));
        }

        let l = &self.lighting;
        if let Some(fade) = &l.fade {
            check_channel(fade.channel)?;
            check_percent(fade.max_percent)?;
            if fade.steps == 0 {
                return Err(ConfigError::ValidationFailed("fade steps must be >= 1"));
            }
        }
        if let Some(sputter) = &l.sputter {
            check_channel(sputter.channel)?;
            check_percent(sputter.max_percent)?;
            if sputter.min_interval_ms == 0 || sputter.min_interval_ms > sputter.max_interval_ms {
                return Err(ConfigError::ValidationFailed(
                    "sputter intervals must satisfy 0 < min <= max",
                ));
            }
        }
        if let Some(flash) = &l.flash {
            check_channel(flash.channel)?;
            check_percent(flash.max_percent)?;
            if flash.count == 0 {
                return Err(ConfigError::ValidationFailed("flash count must be >= 1"));
            }
        }
        Ok(())
    }
}

fn check_folder(folder: u8) -> Result<(), ConfigError> {
    if folder == 0 || folder > MAX_FOLDER {
        return Err(ConfigError::ValidationFailed("folder must be 1..=99"));
    }
    Ok(())
}

fn check_channel(channel: u8) -> Result<(), ConfigError> {
    if channel >= MAX_LIGHT_CHANNELS {
        return Err(ConfigError::ValidationFailed("light channel out of range"));
    }
    Ok(())
}

fn check_percent(percent: u8) -> Result<(), ConfigError> {
    if percent > 100 {
        return Err(ConfigError::ValidationFailed("light max_percent must be 0..=100"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Duration accessors
// ---------------------------------------------------------------------------

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs as u64)
    }
}

pub(crate) fn ms(value: u32) -> Duration {
    Duration::from_millis(value as u64)
}

//! Dimmable lamp bank.
//!
//! Up to four LEDC PWM channels (CH1-4), one per LED string.  Levels are
//! 0–100 % and mapped onto the 8-bit duty range.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the LEDC channels via hw_init.
//! On host/test: tracks levels in-memory only.

use crate::config::MAX_LIGHT_CHANNELS;
use crate::drivers::hw_init;
use crate::error::DriverError;

pub struct LampBank {
    levels: [u8; MAX_LIGHT_CHANNELS as usize],
    count: u8,
}

impl LampBank {
    /// `count` is clamped to the number of wired channels.
    pub fn new(count: u8) -> Self {
        Self {
            levels: [0; MAX_LIGHT_CHANNELS as usize],
            count: count.min(MAX_LIGHT_CHANNELS),
        }
    }

    pub fn set(&mut self, channel: u8, level: u8) -> Result<(), DriverError> {
        if channel >= self.count {
            return Err(DriverError::InvalidChannel(channel));
        }
        if level > 100 {
            return Err(DriverError::OutOfRange);
        }
        hw_init::ledc_set(
            hw_init::LEDC_CH_LIGHT_BASE + u32::from(channel),
            hw_init::percent_to_duty(level),
        )?;
        self.levels[channel as usize] = level;
        Ok(())
    }

    pub fn level(&self, channel: u8) -> Option<u8> {
        (channel < self.count).then(|| self.levels[channel as usize])
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn all_dark(&self) -> bool {
        self.levels[..self.count as usize].iter().all(|&l| l == 0)
    }
}

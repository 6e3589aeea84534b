//! HC-SR501 passive infrared motion sensor.
//!
//! The module drives its output HIGH for the hold time after each motion
//! event.  It needs about a minute after power-up before its output means
//! anything; reads during that window report [`SensorError::WarmingUp`].
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the GPIO level via hw_init helpers.
//! On host/test: reads a simulated level set with [`sim_set_motion`].

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;
#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(not(target_os = "espidf"))]
static SIM_MOTION: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_motion(present: bool) {
    SIM_MOTION.store(present, Ordering::Relaxed);
}

pub struct PirSensor {
    warmup: Duration,
    last: bool,
}

impl PirSensor {
    pub fn new(warmup: Duration) -> Self {
        Self { warmup, last: false }
    }

    /// `uptime` is time since the sensor was powered.
    pub fn read(&mut self, uptime: Duration) -> Result<bool, SensorError> {
        if uptime < self.warmup {
            return Err(SensorError::WarmingUp);
        }
        self.last = Self::level();
        Ok(self.last)
    }

    /// Last successfully read level.
    pub fn last(&self) -> bool {
        self.last
    }

    #[cfg(target_os = "espidf")]
    fn level() -> bool {
        hw_init::gpio_read(pins::PIR_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn level() -> bool {
        SIM_MOTION.load(Ordering::Relaxed)
    }
}

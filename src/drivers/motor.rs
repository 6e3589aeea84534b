//! DC motor driver (L298N / DRV8871 H-bridge).
//!
//! Direction via the two bridge inputs, speed via LEDC PWM (ch0).
//!
//! | IN1 | IN2 | PWM  | Result  |
//! |-----|-----|------|---------|
//! | 1   | 0   | duty | forward |
//! | 0   | 0   | 0    | coast   |
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM and GPIO via hw_init helpers.
//! On host/test: the helpers are no-ops and only the state is tracked.

use log::debug;

use crate::drivers::hw_init;
use crate::error::DriverError;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    /// Direction set, duty not yet applied.
    Armed,
    Running { duty: u8 },
}

pub struct MotorDriver {
    state: MotorState,
}

impl Default for MotorDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorDriver {
    pub fn new() -> Self {
        Self {
            state: MotorState::Stopped,
        }
    }

    /// IN1 high, IN2 low.  Duty is unchanged.
    pub fn forward(&mut self) -> Result<(), DriverError> {
        hw_init::gpio_write(pins::MOTOR_IN2_GPIO, false)?;
        hw_init::gpio_write(pins::MOTOR_IN1_GPIO, true)?;
        if self.state == MotorState::Stopped {
            self.state = MotorState::Armed;
        }
        Ok(())
    }

    /// Duty 0–100 %.  Zero is equivalent to [`stop`](Self::stop).
    pub fn set_duty(&mut self, duty: u8) -> Result<(), DriverError> {
        if duty > 100 {
            return Err(DriverError::OutOfRange);
        }
        if duty == 0 {
            return self.stop();
        }
        hw_init::ledc_set(hw_init::LEDC_CH_MOTOR, hw_init::percent_to_duty(duty))?;
        self.state = MotorState::Running { duty };
        debug!("motor: duty {}%", duty);
        Ok(())
    }

    /// Zero duty, release both bridge inputs.  Every step is attempted; the
    /// first error is returned.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let pwm = hw_init::ledc_set(hw_init::LEDC_CH_MOTOR, 0);
        let in1 = hw_init::gpio_write(pins::MOTOR_IN1_GPIO, false);
        let in2 = hw_init::gpio_write(pins::MOTOR_IN2_GPIO, false);
        self.state = MotorState::Stopped;
        pwm.and(in1).and(in2)
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn current_duty(&self) -> u8 {
        match self.state {
            MotorState::Running { duty } => duty,
            _ => 0,
        }
    }
}

//! Effect routines.
//!
//! Each routine is an `async fn` that issues a deterministic sequence of
//! actuator commands separated by timed waits.  Waits go through
//! [`CancelToken::sleep`](crate::cancel::CancelToken::sleep), which is the
//! only place a routine can be interrupted.  Routines share the rig through
//! a `RefCell` and only hold the borrow for the synchronous stretch between
//! two waits.
//!
//! A failed command is logged and counted in the routine's
//! [`RoutineReport`]; the routine carries on toward its own terminal state.

pub mod alert;
pub mod ambient;
pub mod lighting;
pub mod motor;

use core::cell::RefCell;
use core::time::Duration;

use log::warn;
use rand::Rng;

use crate::app::ports::{CommandResult, LightPort, MotorPort};

/// Borrowed view of everything a routine needs.
pub struct Rig<'a, H, C, R> {
    pub hw: &'a RefCell<H>,
    pub clock: &'a C,
    pub rng: &'a RefCell<R>,
}

impl<H, C, R> Clone for Rig<'_, H, C, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, C, R> Copy for Rig<'_, H, C, R> {}

impl<H, C, R: Rng> Rig<'_, H, C, R> {
    /// Uniform sample from `[min_ms, max_ms]`.
    pub fn random_wait(&self, min_ms: u32, max_ms: u32) -> Duration {
        if min_ms >= max_ms {
            return Duration::from_millis(min_ms as u64);
        }
        let ms = self.rng.borrow_mut().gen_range(min_ms..=max_ms);
        Duration::from_millis(ms as u64)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How a routine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineReport {
    pub name: &'static str,
    /// Ended at a cancellation point rather than naturally.
    pub cancelled: bool,
    /// Actuator commands that returned an error.
    pub faults: u16,
}

impl RoutineReport {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cancelled: false,
            faults: 0,
        }
    }

    /// Count and log a failed command; successes pass through silently.
    pub fn check(&mut self, what: &str, result: CommandResult) {
        if let Err(e) = result {
            warn!("{}: {} failed: {}", self.name, what, e);
            self.faults = self.faults.saturating_add(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Drop guards
// ---------------------------------------------------------------------------

/// Stops the motor when the motor routine ends, however it ends.
///
/// [`finish`](Self::finish) is the normal path and reports the result.  If the
/// routine's future is dropped instead, `Drop` issues the stop.
pub struct MotorStopGuard<'a, H: MotorPort> {
    hw: &'a RefCell<H>,
    armed: bool,
}

impl<'a, H: MotorPort> MotorStopGuard<'a, H> {
    pub fn new(hw: &'a RefCell<H>) -> Self {
        Self { hw, armed: true }
    }

    pub fn finish(mut self, report: &mut RoutineReport) {
        self.armed = false;
        report.check("final stop", self.hw.borrow_mut().stop());
    }
}

impl<H: MotorPort> Drop for MotorStopGuard<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.hw.try_borrow_mut() {
            Ok(mut hw) => {
                if let Err(e) = hw.stop() {
                    warn!("motor guard: stop failed: {}", e);
                }
            }
            Err(_) => warn!("motor guard: rig busy, stop skipped"),
        }
    }
}

/// Forces one light channel to zero when a lighting routine ends.
pub struct LightOffGuard<'a, H: LightPort> {
    hw: &'a RefCell<H>,
    channel: u8,
    armed: bool,
}

impl<'a, H: LightPort> LightOffGuard<'a, H> {
    pub fn new(hw: &'a RefCell<H>, channel: u8) -> Self {
        Self {
            hw,
            channel,
            armed: true,
        }
    }

    pub fn finish(mut self, report: &mut RoutineReport) {
        self.armed = false;
        report.check("light off", self.hw.borrow_mut().set_intensity(self.channel, 0));
    }
}

impl<H: LightPort> Drop for LightOffGuard<'_, H> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.hw.try_borrow_mut() {
            Ok(mut hw) => {
                if let Err(e) = hw.set_intensity(self.channel, 0) {
                    warn!("light guard: ch{} off failed: {}", self.channel, e);
                }
            }
            Err(_) => warn!("light guard: rig busy, ch{} left as is", self.channel),
        }
    }
}

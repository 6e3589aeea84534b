//! Stop switch: requests an orderly shutdown.
//!
//! Active-low momentary switch with pull-up.  The GPIO fires on the falling
//! edge and the ISR only latches an atomic; [`watch`] polls the latch from
//! the executor and cancels the shutdown token.  Cancelling from the ISR
//! itself would take the waker registry's lock in interrupt context.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;

use log::info;

use crate::app::ports::Clock;
use crate::cancel::CancelToken;

/// Latched by the ISR, cleared by [`take_pressed`].
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Called from the GPIO ISR.
pub fn stop_switch_isr_handler() {
    STOP_REQUESTED.store(true, Ordering::Release);
}

/// Simulate a press (host builds, tests).
#[cfg(not(target_os = "espidf"))]
pub fn sim_press() {
    stop_switch_isr_handler();
}

/// Consume a pending press.
pub fn take_pressed() -> bool {
    STOP_REQUESTED.swap(false, Ordering::AcqRel)
}

/// Poll the latch every `poll` and cancel `shutdown` on the first press.
/// Returns when `shutdown` is cancelled by anyone.
pub async fn watch<C: Clock>(clock: &C, shutdown: &CancelToken, poll: Duration) {
    loop {
        if take_pressed() {
            info!("Stop switch pressed, shutting down");
            shutdown.cancel();
            return;
        }
        if shutdown.sleep(clock, poll).await.is_err() {
            return;
        }
    }
}

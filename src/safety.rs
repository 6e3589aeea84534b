//! Safe-state enforcement.
//!
//! The safe state is: motor stopped, every light channel at zero.  It is
//! forced by the orchestrator after every alert (regardless of what each
//! routine's own cleanup did) and once more on shutdown.
//!
//! Every command is attempted even if an earlier one failed; a partial
//! sweep still turns off whatever it can.

use log::{error, info};

use crate::app::ports::{AudioPort, LightPort, MotorPort};

/// Stop the motor and zero all light channels.  Returns the number of
/// commands that failed.
pub fn force_safe<H: MotorPort + LightPort>(hw: &mut H) -> u16 {
    let mut failed = 0u16;

    if let Err(e) = hw.stop() {
        error!("SAFE | motor stop failed: {e}");
        failed += 1;
    }
    for ch in 0..hw.channel_count() {
        if let Err(e) = hw.set_intensity(ch, 0) {
            error!("SAFE | light ch{ch} off failed: {e}");
            failed += 1;
        }
    }

    if failed == 0 {
        info!("SAFE | motor stopped, lights off");
    }
    failed
}

/// [`force_safe`] plus silencing the audio module, for process exit.
pub fn shutdown_all<H: MotorPort + LightPort + AudioPort>(hw: &mut H) -> u16 {
    let mut failed = force_safe(hw);
    if let Err(e) = AudioPort::stop(hw) {
        error!("SAFE | audio stop failed: {e}");
        failed += 1;
    }
    failed
}

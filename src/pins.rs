//! GPIO / peripheral pin assignments for the prop controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Motion sensor (HC-SR501 PIR)
// ---------------------------------------------------------------------------

/// Digital input: HIGH while motion is detected.
pub const PIR_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Motor driver (L298N / DRV8871 H-bridge)
// ---------------------------------------------------------------------------

/// Bridge input 1: HIGH with IN2 LOW = forward.
pub const MOTOR_IN1_GPIO: i32 = 14;
/// Bridge input 2.
pub const MOTOR_IN2_GPIO: i32 = 13;
/// LEDC PWM output for motor speed.
pub const MOTOR_PWM_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Lighting (LED strings behind logic-level MOSFETs)
// ---------------------------------------------------------------------------

/// One LEDC channel per entry; index = light channel number.
pub const LIGHT_GPIOS: [i32; 4] = [15, 4, 5, 6];

// ---------------------------------------------------------------------------
// DFPlayer Mini (UART, 9600 8N1)
// ---------------------------------------------------------------------------

pub const DFPLAYER_UART_PORT: i32 = 1;
pub const DFPLAYER_TX_GPIO: i32 = 17;
pub const DFPLAYER_RX_GPIO: i32 = 18;
pub const DFPLAYER_BAUD: i32 = 9_600;

// ---------------------------------------------------------------------------
// Stop switch (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Momentary switch that requests an orderly shutdown.
pub const STOP_SWITCH_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// Motor PWM frequency (1 kHz, as the bridge datasheet recommends).
pub const MOTOR_PWM_FREQ_HZ: u32 = 1_000;
/// Lighting PWM frequency (5 kHz, flicker-free on camera).
pub const LIGHT_PWM_FREQ_HZ: u32 = 5_000;

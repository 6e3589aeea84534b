//! One-shot hardware peripheral initialization and raw register helpers.
//!
//! Configures GPIO directions, LEDC timers/channels and the DFPlayer UART
//! using raw ESP-IDF sys calls.  Called once from `main()` before the
//! executor starts.  On the host every helper is a no-op stub so the
//! drivers above compile and run unchanged in the simulator.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::DriverError;
#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    LedcInitFailed(i32),
    UartInitFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcInitFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::UartInitFailed(rc) => write!(f, "UART init failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("peripheral configuration failed")
    }
}

/// LEDC channel driving the motor PWM.
pub const LEDC_CH_MOTOR: u32 = 0;
/// First LEDC channel used for lighting; light `n` is `LEDC_CH_LIGHT_BASE + n`.
pub const LEDC_CH_LIGHT_BASE: u32 = 1;

#[cfg(target_os = "espidf")]
fn check(ret: i32, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as i32 { Ok(()) } else { Err(err(ret)) }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the executor starts; single-threaded.
    unsafe {
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_ledc()?;
        init_uart()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // PIR output is push-pull; no pull needed.
    let pir = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PIR_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    check(unsafe { gpio_config(&pir) }, HwInitError::GpioConfigFailed)?;

    let stop = gpio_config_t {
        pin_bit_mask: 1u64 << pins::STOP_SWITCH_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    check(unsafe { gpio_config(&stop) }, HwInitError::GpioConfigFailed)?;

    info!("hw_init: GPIO inputs configured (PIR, stop switch)");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for pin in [pins::MOTOR_IN1_GPIO, pins::MOTOR_IN2_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
        // Both bridge inputs low = coast.
        unsafe { gpio_set_level(pin, 0) };
    }
    info!("hw_init: GPIO outputs configured (motor IN1/IN2 low)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    false
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), DriverError> {
    // SAFETY: pin was configured as an output in init_gpio_outputs().
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(DriverError::GpioWriteFailed) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), DriverError> {
    Ok(())
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() -> Result<(), HwInitError> {
    // Timer 0: motor (1 kHz, 8-bit)
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::MOTOR_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check(unsafe { ledc_timer_config(&timer0) }, HwInitError::LedcInitFailed)?;

    // Timer 1: lighting (5 kHz, 8-bit)
    let timer1 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_1,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::LIGHT_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    check(unsafe { ledc_timer_config(&timer1) }, HwInitError::LedcInitFailed)?;

    let motor = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel: LEDC_CH_MOTOR,
        timer_sel: ledc_timer_t_LEDC_TIMER_0,
        gpio_num: pins::MOTOR_PWM_GPIO,
        duty: 0,
        hpoint: 0,
        ..Default::default()
    };
    check(unsafe { ledc_channel_config(&motor) }, HwInitError::LedcInitFailed)?;

    for (i, &gpio) in pins::LIGHT_GPIOS.iter().enumerate() {
        let light = ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: LEDC_CH_LIGHT_BASE + i as u32,
            timer_sel: ledc_timer_t_LEDC_TIMER_1,
            gpio_num: gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        };
        check(unsafe { ledc_channel_config(&light) }, HwInitError::LedcInitFailed)?;
    }

    info!("hw_init: LEDC configured (motor=CH0, lights=CH1-4)");
    Ok(())
}

/// Write an 8-bit duty to an LEDC channel.
#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) -> Result<(), DriverError> {
    // SAFETY: channels were configured in init_ledc(); only the executor
    // thread writes duty registers.
    let ret = unsafe {
        let r = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, u32::from(duty));
        if r == ESP_OK as i32 {
            ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel)
        } else {
            r
        }
    };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(DriverError::PwmWriteFailed) }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) -> Result<(), DriverError> {
    Ok(())
}

/// Convert a 0–100 % duty to the 8-bit LEDC range.
pub fn percent_to_duty(percent: u8) -> u8 {
    (u16::from(percent.min(100)) * 255 / 100) as u8
}

// ── UART (DFPlayer) ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_uart() -> Result<(), HwInitError> {
    let cfg = uart_config_t {
        baud_rate: pins::DFPLAYER_BAUD,
        data_bits: uart_word_length_t_UART_DATA_8_BITS,
        parity: uart_parity_t_UART_PARITY_DISABLE,
        stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
        flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
        ..Default::default()
    };
    let port = pins::DFPLAYER_UART_PORT;
    check(
        unsafe { uart_driver_install(port, 256, 0, 0, core::ptr::null_mut(), 0) },
        HwInitError::UartInitFailed,
    )?;
    check(unsafe { uart_param_config(port, &cfg) }, HwInitError::UartInitFailed)?;
    check(
        unsafe { uart_set_pin(port, pins::DFPLAYER_TX_GPIO, pins::DFPLAYER_RX_GPIO, -1, -1) },
        HwInitError::UartInitFailed,
    )?;
    info!("hw_init: UART{} configured for DFPlayer ({} baud)", port, pins::DFPLAYER_BAUD);
    Ok(())
}

/// Blocking write; returns the number of bytes queued.
#[cfg(target_os = "espidf")]
pub fn uart_write(port: i32, data: &[u8]) -> Result<usize, DriverError> {
    // SAFETY: driver installed in init_uart(); `data` outlives the call.
    let n = unsafe { uart_write_bytes(port, data.as_ptr().cast(), data.len()) };
    if n < 0 { Err(DriverError::SerialWriteFailed) } else { Ok(n as usize) }
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_write(_port: i32, data: &[u8]) -> Result<usize, DriverError> {
    Ok(data.len())
}

/// Non-blocking read of whatever is buffered.
#[cfg(target_os = "espidf")]
pub fn uart_read(port: i32, buf: &mut [u8]) -> usize {
    // SAFETY: driver installed in init_uart(); zero ticks = no wait.
    let n = unsafe { uart_read_bytes(port, buf.as_mut_ptr().cast(), buf.len() as u32, 0) };
    n.max(0) as usize
}

#[cfg(not(target_os = "espidf"))]
pub fn uart_read(_port: i32, _buf: &mut [u8]) -> usize {
    0
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn stop_switch_isr(_arg: *mut core::ffi::c_void) {
    crate::drivers::stop_switch::stop_switch_isr_handler();
}

/// Install the GPIO ISR service and hook the stop switch.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    // The handler only stores to an atomic.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_isr_handler_add(pins::STOP_SWITCH_GPIO, Some(stop_switch_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::STOP_SWITCH_GPIO);
    }
    info!("hw_init: ISR service installed (stop switch)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}

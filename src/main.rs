//! propctl firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  HardwareAdapter            LogEventSink     MonotonicClock  │
//! │  (PIR · DFPlayer · motor ·  (EventSink)      (Clock)         │
//! │   lamps)                                                     │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ───────────────────     │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  Orchestrator: FSM · TriggerGate · effect routines     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  edge-executor LocalExecutor: orchestrator ∥ stop switch     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the device the prop runs until the stop switch is pressed.  On the
//! host the same loop runs against simulated GPIO, driven from stdin.
#![deny(unused_must_use)]

use core::time::Duration;

use anyhow::Result;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use propctl::adapters::hardware::HardwareAdapter;
use propctl::adapters::log_sink::LogEventSink;
use propctl::adapters::time::MonotonicClock;
use propctl::app::orchestrator::{Orchestrator, RunSummary};
use propctl::cancel::CancelToken;
use propctl::config::PropConfig;
use propctl::drivers::dfplayer::DfPlayer;
use propctl::drivers::lamp::LampBank;
use propctl::drivers::motor::MotorDriver;
use propctl::drivers::pir::PirSensor;
use propctl::drivers::serial::UartPort;
use propctl::drivers::stop_switch;
use propctl::pins;

/// Stop switch latch poll period.
const STOP_POLL: Duration = Duration::from_millis(50);

/// HC-SR501 settle time after power-up.
#[cfg(target_os = "espidf")]
const PIR_WARMUP: Duration = Duration::from_secs(30);
#[cfg(not(target_os = "espidf"))]
const PIR_WARMUP: Duration = Duration::ZERO;

fn build_hardware() -> HardwareAdapter<UartPort> {
    let mut audio = DfPlayer::new(UartPort::new(pins::DFPLAYER_UART_PORT));
    if let Err(e) = audio.reset() {
        warn!("DFPlayer reset failed: {}", e);
    }
    HardwareAdapter::new(
        PirSensor::new(PIR_WARMUP),
        audio,
        MotorDriver::new(),
        LampBank::new(pins::LIGHT_GPIOS.len() as u8),
    )
}

/// Drive the orchestrator and the stop switch watcher until `shutdown`
/// fires.  The rig is safe when this returns.
fn run_prop(config: PropConfig, seed: u64, shutdown: &CancelToken) -> RunSummary {
    let mut orchestrator = Orchestrator::new(
        build_hardware(),
        MonotonicClock::new(),
        SmallRng::seed_from_u64(seed),
        LogEventSink::new(),
        config,
    );
    let stop_clock = MonotonicClock::new();

    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor
        .spawn(stop_switch::watch(&stop_clock, shutdown, STOP_POLL))
        .detach();
    let prop = executor.spawn(orchestrator.run(shutdown));

    info!("Prop armed (seed {:#x})", seed);
    futures_lite::future::block_on(executor.run(prop))
}

// ── Device ────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use log::error;
    use propctl::config::Preset;
    use propctl::drivers::hw_init;
    use propctl::safety;

    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("propctl v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}", e);
        let failed = safety::force_safe(&mut build_hardware());
        error!("Halting ({} actuators could not be confirmed safe)", failed);
        return Err(e.into());
    }
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {} (stop switch disabled)", e);
    }

    let preset = option_env!("PROPCTL_PRESET").unwrap_or("houndeye");
    let config = Preset::load(preset)?;
    info!("Preset: {}", preset);

    let seed = u64::from(unsafe { esp_idf_svc::sys::esp_random() });
    let shutdown = CancelToken::new();
    let summary = run_prop(config, seed, &shutdown);
    info!("Stopped: {:?}", summary);
    Ok(())
}

// ── Host simulator ────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::future::Future;
    use std::io::BufRead;
    use std::path::PathBuf;
    use std::thread::{self, JoinHandle};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use anyhow::{Context, Result};
    use clap::Parser;
    use log::{info, warn};

    use propctl::cancel::CancelToken;
    use propctl::config::{PropConfig, Preset};
    use propctl::drivers::{pir, stop_switch};

    /// Host simulator for the prop controller.
    ///
    /// Console commands (one per line): `m` motion, `c` clear,
    /// `w <secs>` pause the script, `q` press the stop switch.  Ctrl-C
    /// and end of input also shut the prop down.
    #[derive(Parser, Debug)]
    #[command(name = "propctl", version, about)]
    pub struct Args {
        /// Built-in prop preset (houndeye, ghost, jitter-ghost).
        #[arg(long, default_value = "houndeye")]
        pub preset: String,

        /// JSON config file; overrides --preset.
        #[arg(long)]
        pub config: Option<PathBuf>,

        /// Seed for the effect timing generator.
        #[arg(long)]
        pub seed: Option<u64>,
    }

    impl Args {
        pub fn load_config(&self) -> Result<PropConfig> {
            if let Some(path) = &self.config {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let config = PropConfig::from_json(&json)
                    .with_context(|| format!("loading {}", path.display()))?;
                return Ok(config);
            }
            let config = Preset::load(&self.preset)
                .with_context(|| format!("preset '{}'", self.preset))?;
            Ok(config)
        }

        pub fn seed(&self) -> u64 {
            self.seed.unwrap_or_else(|| {
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_or(0, |d| d.as_nanos() as u64)
            })
        }
    }

    /// Read console commands until `q` or end of input.  End of input
    /// cancels `shutdown` so piped scripts terminate.
    pub fn spawn_console(shutdown: CancelToken) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("console".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    let mut words = line.split_whitespace();
                    match (words.next(), words.next()) {
                        (Some("m"), None) => {
                            info!("sim: motion");
                            pir::sim_set_motion(true);
                        }
                        (Some("c"), None) => {
                            info!("sim: clear");
                            pir::sim_set_motion(false);
                        }
                        (Some("w"), Some(secs)) => match secs.parse::<f32>() {
                            Ok(s) if s >= 0.0 => thread::sleep(Duration::from_secs_f32(s)),
                            _ => warn!("bad wait '{}'", secs),
                        },
                        (Some("q"), None) => {
                            stop_switch::sim_press();
                            return;
                        }
                        (None, _) => {}
                        _ => warn!("unknown command '{}' (m, c, w <secs>, q)", line.trim()),
                    }
                }
                info!("sim: end of input");
                shutdown.cancel();
            })?;
        Ok(handle)
    }

    /// Cancel `shutdown` on Ctrl-C.
    pub fn spawn_interrupt_handler(shutdown: CancelToken) -> Result<JoinHandle<()>> {
        cancel_on("sigint", shutdown, tokio::signal::ctrl_c)
    }

    /// Wait for `signal` on a dedicated thread with its own runtime, then
    /// cancel `shutdown`.  A signal that cannot be installed is logged and
    /// leaves `shutdown` alone.
    fn cancel_on<F, Fut>(name: &str, shutdown: CancelToken, signal: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::io::Result<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building signal runtime")?;
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || match runtime.block_on(signal()) {
                Ok(()) => {
                    info!("sim: interrupt");
                    shutdown.cancel();
                }
                Err(e) => warn!("sim: interrupt handler unavailable: {}", e),
            })?;
        Ok(handle)
    }

}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use clap::Parser;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = sim::Args::parse();
    let config = args.load_config()?;
    let seed = args.seed();
    info!("propctl v{} (host simulator)", env!("CARGO_PKG_VERSION"));

    let shutdown = CancelToken::new();
    let _console = sim::spawn_console(shutdown.clone())?;
    let _interrupt = sim::spawn_interrupt_handler(shutdown.clone())?;
    let summary = run_prop(config, seed, &shutdown);
    info!("Stopped: {:?}", summary);
    Ok(())
}

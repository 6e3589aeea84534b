//! The prop's control loop.
//!
//! ```text
//!            ┌──────────── cooldown elapsed ────────────┐
//!            ▼                                          │
//!   ┌──────────────┐  gate fires   ┌───────────┐  join  ┌──────────┐
//!   │ Idle         │──────────────▶│ Triggered │───────▶│ Cooldown │
//!   │ ambient ∥ poll│              │ motor ∥ audio ∥ lights          │
//!   └──────────────┘               └───────────┘        └──────────┘
//! ```
//!
//! * **Idle** runs the ambient routine and a sensor watcher side by side.
//!   When the trigger gate fires, the watcher cancels the ambient token and
//!   the state only ends once the ambient routine has actually returned, so
//!   no ambient command can land after the alert starts.
//! * **Triggered** stops the motor, then runs every alert routine and waits
//!   for all of them.  An early finisher never cancels a sibling.  The rig
//!   is then forced safe whatever the routines did.
//! * **Cooldown** waits out the refractory period; triggers are not even
//!   sampled.
//!
//! A shutdown token cancels whichever routines are running at their next
//! wait; the loop then forces the rig safe, silences audio and returns.

use core::cell::RefCell;

use futures_lite::future::zip;
use log::{info, warn};
use rand::Rng;

use crate::cancel::{CancelToken, Cancelled};
use crate::config::{PropConfig, TimingConfig};
use crate::effects::alert::AlertCycle;
use crate::effects::{Rig, RoutineReport, alert, ambient, lighting, motor};
use crate::fsm::{Fsm, StateId};
use crate::safety;

use super::events::AppEvent;
use super::ports::{Clock, EventSink, MotorPort, PropHardware, SensorPort};
use super::trigger::TriggerGate;

/// Totals reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub triggers: u32,
    pub alerts_completed: u32,
    pub sensor_faults: u32,
    pub driver_faults: u32,
}

pub struct Orchestrator<H, C, R, S> {
    hw: RefCell<H>,
    clock: C,
    rng: RefCell<R>,
    sink: S,
    config: PropConfig,
    cycle: AlertCycle,
    gate: TriggerGate,
    fsm: Fsm,
    summary: RunSummary,
}

impl<H, C, R, S> Orchestrator<H, C, R, S>
where
    H: PropHardware,
    C: Clock,
    R: Rng,
    S: EventSink,
{
    /// `config` is expected to have passed [`PropConfig::validate`].
    pub fn new(hw: H, clock: C, rng: R, sink: S, config: PropConfig) -> Self {
        let cycle = AlertCycle::new(config.alert.cycle_tracks.clone());
        let gate = TriggerGate::new(config.timing.debounce_polls, config.timing.rearm_on_release);
        let fsm = Fsm::new(StateId::Idle, clock.now());
        Self {
            hw: RefCell::new(hw),
            clock,
            rng: RefCell::new(rng),
            sink,
            config,
            cycle,
            gate,
            fsm,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn alert_cycle(&self) -> &AlertCycle {
        &self.cycle
    }

    /// Tear down and hand back the hardware and sink.
    pub fn into_parts(self) -> (H, S) {
        (self.hw.into_inner(), self.sink)
    }

    /// Run until `shutdown` is cancelled.  The rig is safe on return.
    pub async fn run(&mut self, shutdown: &CancelToken) -> RunSummary {
        info!("Orchestrator starting: {}", self.fsm.state_name());
        self.emit(AppEvent::Started(self.fsm.current_state()));

        loop {
            let step = match self.fsm.current_state() {
                StateId::Idle => self.idle(shutdown).await,
                StateId::Triggered => self.triggered(shutdown).await,
                StateId::Cooldown => self.cooldown(shutdown).await,
            };
            match step {
                Ok(next) => self.enter(next),
                Err(Cancelled) => break,
            }
        }

        self.emit(AppEvent::ShutdownRequested);
        let failed = safety::shutdown_all(&mut *self.hw.borrow_mut());
        self.summary.driver_faults += u32::from(failed);
        info!(
            "Orchestrator stopped: {} triggers, {} alerts",
            self.summary.triggers, self.summary.alerts_completed
        );
        self.emit(AppEvent::ShutdownComplete(self.summary));
        self.summary
    }

    // -----------------------------------------------------------------------
    // States
    // -----------------------------------------------------------------------

    async fn idle(&mut self, shutdown: &CancelToken) -> Result<StateId, Cancelled> {
        self.emit(AppEvent::AmbientStarted);

        let ambient_token = shutdown.child();
        let Self {
            hw,
            clock,
            rng,
            sink,
            config,
            gate,
            summary,
            ..
        } = self;
        let rig = Rig {
            hw: &*hw,
            clock: &*clock,
            rng: &*rng,
        };

        let (report, watched) = zip(
            ambient::run(rig, &config.ambient, &ambient_token),
            watch(&*hw, &*clock, sink, gate, summary, &config.timing, &ambient_token, shutdown),
        )
        .await;

        self.summary.driver_faults += u32::from(report.faults);
        self.emit(AppEvent::AmbientStopped(report));
        watched?;

        self.summary.triggers += 1;
        self.emit(AppEvent::TriggerDetected {
            count: self.summary.triggers,
        });
        Ok(StateId::Triggered)
    }

    async fn triggered(&mut self, shutdown: &CancelToken) -> Result<StateId, Cancelled> {
        let mut reports: heapless::Vec<RoutineReport, 5> = heapless::Vec::new();
        {
            let mut pre = RoutineReport::new("pre-alert");
            pre.check("motor stop", MotorPort::stop(&mut *self.hw.borrow_mut()));
            self.summary.driver_faults += u32::from(pre.faults);
        }

        let Self {
            hw,
            clock,
            rng,
            config,
            cycle,
            ..
        } = self;
        let rig = Rig {
            hw: &*hw,
            clock: &*clock,
            rng: &*rng,
        };

        let (motor, (audio, lights)) = zip(
            motor::run(rig, &config.motor, shutdown),
            zip(
                alert::run(rig, &config.alert, cycle, shutdown),
                lighting::run(rig, &config.lighting, shutdown),
            ),
        )
        .await;

        // Capacity 5 holds motor + audio + the three lighting patterns.
        let _ = reports.push(motor);
        let _ = reports.push(audio);
        reports.extend(lights);

        let mut faults = 0u16;
        for report in &reports {
            faults = faults.saturating_add(report.faults);
            self.emit(AppEvent::RoutineFinished(*report));
        }
        let safe_faults = safety::force_safe(&mut *self.hw.borrow_mut());
        self.summary.driver_faults += u32::from(faults) + u32::from(safe_faults);
        self.emit(AppEvent::AlertFinished { faults, safe_faults });

        shutdown.check()?;
        self.summary.alerts_completed += 1;
        Ok(StateId::Cooldown)
    }

    async fn cooldown(&mut self, shutdown: &CancelToken) -> Result<StateId, Cancelled> {
        let period = self.config.timing.cooldown();
        info!("Cooldown for {:?}", period);
        shutdown.sleep(&self.clock, period).await?;
        self.gate.rearm();
        Ok(StateId::Idle)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn enter(&mut self, next: StateId) {
        let now = self.clock.now();
        match self.fsm.transition(next, now) {
            Ok(from) => self.emit(AppEvent::StateChanged { from, to: next }),
            // Unreachable with the fixed state handlers above.
            Err(e) => warn!("{e}"),
        }
    }

    fn emit(&mut self, event: AppEvent) {
        self.sink.emit(self.clock.now(), &event);
    }
}

/// Idle-state sensor watcher.  Polls at the configured interval and, when
/// the gate fires, cancels `ambient` and returns.  `Err` on shutdown.
#[allow(clippy::too_many_arguments)]
async fn watch<H, C, S>(
    hw: &RefCell<H>,
    clock: &C,
    sink: &mut S,
    gate: &mut TriggerGate,
    summary: &mut RunSummary,
    timing: &TimingConfig,
    ambient: &CancelToken,
    shutdown: &CancelToken,
) -> Result<(), Cancelled>
where
    H: SensorPort,
    C: Clock,
    S: EventSink,
{
    let poll = timing.poll_interval();
    // Only a change of fault is reported; every failed read is counted.
    let mut last_fault = None;
    loop {
        shutdown.check()?;
        let read = hw.borrow_mut().motion_detected();
        let motion = match read {
            Ok(m) => {
                last_fault = None;
                m
            }
            Err(e) => {
                summary.sensor_faults += 1;
                if last_fault != Some(e) {
                    warn!("sensor read failed: {e}");
                    sink.emit(clock.now(), &AppEvent::SensorFault(e));
                    last_fault = Some(e);
                }
                false
            }
        };

        if gate.feed(motion) {
            info!("Motion confirmed at {:?}", clock.now());
            ambient.cancel();
            return Ok(());
        }
        shutdown.sleep(clock, poll).await?;
    }
}

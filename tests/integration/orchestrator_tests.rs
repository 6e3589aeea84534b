//! End-to-end runs of the orchestrator against the mock rig.
//!
//! Everything runs on a virtual clock, so a minute of prop time takes a
//! few milliseconds and every timestamp below is exact.

use std::time::Duration;

use futures_lite::future::zip;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use propctl::adapters::time::VirtualClock;
use propctl::app::events::AppEvent;
use propctl::app::orchestrator::{Orchestrator, RunSummary};
use propctl::app::ports::Clock;
use propctl::cancel::CancelToken;
use propctl::config::{Preset, PropConfig, SputterConfig};
use propctl::fsm::StateId;

use crate::mock_hw::{Cmd, MockRig, RecordingSink, ms, test_config};

/// Run until `stop_at`, then cancel and hand back the rig and events.
fn run_until(
    clock: &VirtualClock,
    hw: MockRig,
    config: PropConfig,
    stop_at: Duration,
) -> (MockRig, RecordingSink, RunSummary) {
    let mut prop = Orchestrator::new(
        hw,
        clock.clone(),
        SmallRng::seed_from_u64(7),
        RecordingSink::new(),
        config,
    );
    let shutdown = CancelToken::new();
    let (summary, ()) = clock.block_on(zip(prop.run(&shutdown), async {
        clock.sleep(stop_at).await;
        shutdown.cancel();
    }));
    let (hw, sink) = prop.into_parts();
    (hw, sink, summary)
}

/// One motion burst that trips the default two-poll gate at 1.2 s.
fn single_trigger(clock: &VirtualClock) -> MockRig {
    MockRig::new(clock).motion_between(ms(1_050), ms(1_550))
}

// ── Full cycle ────────────────────────────────────────────────

#[test]
fn idle_trigger_cooldown_and_back() {
    let clock = VirtualClock::new();
    let (hw, sink, summary) = run_until(&clock, single_trigger(&clock), test_config(), ms(20_000));

    assert_eq!(
        sink.transitions(),
        vec![
            (ms(1_200), StateId::Idle, StateId::Triggered),
            (ms(14_200), StateId::Triggered, StateId::Cooldown),
            (ms(19_200), StateId::Cooldown, StateId::Idle),
        ]
    );
    assert_eq!(sink.trigger_times(), vec![ms(1_200)]);
    assert_eq!(summary.triggers, 1);
    assert_eq!(summary.alerts_completed, 1);
    assert_eq!(summary.driver_faults, 0);

    // Ambient before the trigger and again after cooldown, never between.
    assert_eq!(hw.plays_in(1), vec![(ms(0), 1), (ms(1_000), 2), (ms(19_200), 1)]);
}

#[test]
fn ambient_stops_on_the_trigger_poll() {
    let clock = VirtualClock::new();
    let mut config = test_config();
    config.ambient.min_wait_ms = 5_000;
    config.ambient.max_wait_ms = 5_000;
    let (hw, sink, _) = run_until(&clock, single_trigger(&clock), config, ms(2_000));

    let stopped: Vec<_> = sink
        .events
        .iter()
        .filter_map(|(at, e)| match e {
            AppEvent::AmbientStopped(r) => Some((*at, r.cancelled)),
            _ => None,
        })
        .collect();
    assert_eq!(stopped, vec![(ms(1_200), true)]);
    assert_eq!(hw.plays_in(1), vec![(ms(0), 1)]);
}

#[test]
fn every_alert_routine_starts_on_entry() {
    let clock = VirtualClock::new();
    let (hw, _, _) = run_until(&clock, single_trigger(&clock), test_config(), ms(20_000));

    assert_eq!(
        hw.calls_at(ms(1_200)),
        vec![
            Cmd::MotorStop,
            Cmd::Volume(25),
            Cmd::Play { folder: 2, track: 1 },
            Cmd::Light { channel: 0, level: 0 },
            Cmd::Light { channel: 1, level: 100 },
        ]
    );
    // Motor waits out its start delay while the announcement plays.
    assert!(hw.calls_at(ms(4_200)).contains(&Cmd::Duty(50)));
    assert!(hw.calls_at(ms(4_200)).contains(&Cmd::Play { folder: 2, track: 2 }));
    assert!(hw.calls_at(ms(4_200)).contains(&Cmd::Light { channel: 0, level: 90 }));
}

// ── Join semantics ────────────────────────────────────────────

#[test]
fn early_finishers_do_not_cancel_siblings() {
    let clock = VirtualClock::new();
    let (_, sink, _) = run_until(&clock, single_trigger(&clock), test_config(), ms(16_000));

    let finished: Vec<_> = sink
        .events
        .iter()
        .filter_map(|(at, e)| match e {
            AppEvent::RoutineFinished(r) => Some((*at, r.name, r.cancelled)),
            _ => None,
        })
        .collect();
    // Reported together once the slowest (alert audio, 13 s) is done.
    assert_eq!(
        finished,
        vec![
            (ms(14_200), "motor", false),
            (ms(14_200), "alert", false),
            (ms(14_200), "fade", false),
            (ms(14_200), "flash", false),
        ]
    );
}

#[test]
fn slow_motor_holds_the_alert_open() {
    let clock = VirtualClock::new();
    let mut config = test_config();
    config.motor.cycles = 3; // 3 s delay + 3 × 4 s
    let (hw, sink, _) = run_until(&clock, single_trigger(&clock), config, ms(18_000));

    assert_eq!(
        sink.transitions()[1],
        (ms(16_200), StateId::Triggered, StateId::Cooldown)
    );
    // The guard's stop lands exactly when the last off-period ends.
    assert!(hw.calls_at(ms(16_200)).contains(&Cmd::MotorStop));
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn rig_is_forced_safe_after_alert() {
    let clock = VirtualClock::new();
    let (hw, sink, _) = run_until(&clock, single_trigger(&clock), test_config(), ms(15_000));

    let finished_at = sink
        .events
        .iter()
        .find_map(|(at, e)| matches!(e, AppEvent::AlertFinished { .. }).then_some(*at))
        .unwrap();
    assert_eq!(finished_at, ms(14_200));
    let sweep = hw.calls_at(finished_at);
    assert_eq!(
        sweep,
        vec![
            Cmd::MotorStop,
            Cmd::Light { channel: 0, level: 0 },
            Cmd::Light { channel: 1, level: 0 },
            Cmd::Light { channel: 2, level: 0 },
            Cmd::Light { channel: 3, level: 0 },
        ]
    );
    assert!(hw.is_safe());
}

#[test]
fn shutdown_mid_alert_cancels_and_leaves_rig_safe() {
    let clock = VirtualClock::new();
    let (hw, sink, summary) = run_until(&clock, single_trigger(&clock), test_config(), ms(5_000));

    assert_eq!(clock.now(), ms(5_000));
    assert_eq!(summary.triggers, 1);
    assert_eq!(summary.alerts_completed, 0);
    assert_eq!(sink.transitions(), vec![(ms(1_200), StateId::Idle, StateId::Triggered)]);

    let cancelled: Vec<_> = sink
        .events
        .iter()
        .filter_map(|(_, e)| match e {
            AppEvent::RoutineFinished(r) => Some((r.name, r.cancelled)),
            _ => None,
        })
        .collect();
    assert_eq!(
        cancelled,
        vec![("motor", true), ("alert", true), ("fade", false), ("flash", false)]
    );

    assert!(hw.calls.iter().all(|c| c.at <= ms(5_000)));
    assert_eq!(hw.calls.last().map(|c| c.cmd), Some(Cmd::AudioStop));
    assert!(hw.is_safe());
    assert!(matches!(sink.events.last(), Some((_, AppEvent::ShutdownComplete(_)))));
}

#[test]
fn shutdown_while_idle() {
    let clock = VirtualClock::new();
    let (hw, sink, summary) = run_until(&clock, MockRig::new(&clock), test_config(), ms(2_500));

    assert_eq!(summary, RunSummary::default());
    assert!(sink.transitions().is_empty());
    assert_eq!(hw.plays_in(1).len(), 3);
    assert_eq!(hw.calls.last().map(|c| (c.at, c.cmd)), Some((ms(2_500), Cmd::AudioStop)));
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ShutdownRequested)),
        1
    );
}

// ── Trigger gating ────────────────────────────────────────────

#[test]
fn held_motion_waits_for_cooldown() {
    let clock = VirtualClock::new();
    let hw = MockRig::new(&clock).motion_from(ms(1_050));
    let (_, sink, summary) = run_until(&clock, hw, test_config(), ms(20_000));

    // Two fresh polls after cooldown ends at 19.2 s.
    assert_eq!(sink.trigger_times(), vec![ms(1_200), ms(19_300)]);
    assert_eq!(summary.triggers, 2);
    assert_eq!(summary.alerts_completed, 1);
}

#[test]
fn release_to_rearm_needs_a_clear_sample() {
    let clock = VirtualClock::new();
    let mut config = test_config();
    config.timing.rearm_on_release = true;
    let hw = MockRig::new(&clock)
        .motion_between(ms(1_050), ms(25_050))
        .motion_from(ms(26_050));
    let (hw, sink, _) = run_until(&clock, hw, config, ms(27_000));

    assert_eq!(sink.trigger_times(), vec![ms(1_200), ms(26_200)]);
    // Ambient resumed while the gate was waiting for release.
    assert!(hw.plays_in(1).iter().any(|&(at, _)| at == ms(19_200)));
}

#[test]
fn sensor_faults_read_as_no_motion() {
    let clock = VirtualClock::new();
    let hw = single_trigger(&clock).sensor_fails_until(ms(550));
    let (_, sink, summary) = run_until(&clock, hw, test_config(), ms(2_000));

    // Polls at 0.0 ..= 0.5 s fail; only the first is reported.
    assert_eq!(summary.sensor_faults, 6);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::SensorFault(_))), 1);
    assert_eq!(sink.trigger_times(), vec![ms(1_200)]);
}

// ── Alert cycle ───────────────────────────────────────────────

#[test]
fn alert_tracks_cycle_across_triggers() {
    let clock = VirtualClock::new();
    // Trigger, 13 s alert, 5 s cooldown: one burst every 19 s.
    let hw = (0..4u64).fold(MockRig::new(&clock), |hw, k| {
        let start = 1_050 + k * 19_000;
        hw.motion_between(ms(start), ms(start + 500))
    });
    let (hw, sink, summary) = run_until(&clock, hw, test_config(), ms(72_000));

    assert_eq!(
        sink.trigger_times(),
        vec![ms(1_200), ms(20_200), ms(39_200), ms(58_200)]
    );
    assert_eq!(summary.alerts_completed, 4);
    let cycle: Vec<u8> = hw
        .plays_in(2)
        .into_iter()
        .map(|(_, track)| track)
        .filter(|&t| t != 1)
        .collect();
    assert_eq!(cycle, vec![2, 3, 4, 2]);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn driver_fault_does_not_abort_siblings() {
    let clock = VirtualClock::new();
    let hw = single_trigger(&clock).break_channel(1);
    let (hw, sink, summary) = run_until(&clock, hw, test_config(), ms(15_000));

    // Flash: 4 writes + its guard; the safe sweep hits ch1 again.
    assert!(sink.events.iter().any(|(at, e)| *at == ms(14_200)
        && *e == AppEvent::AlertFinished { faults: 5, safe_faults: 1 }));
    // Shutdown sweep fails on ch1 once more.
    assert_eq!(summary.driver_faults, 7);

    assert!(hw.calls_at(ms(4_200)).contains(&Cmd::Light { channel: 0, level: 90 }));
    assert!(hw.calls_at(ms(4_200)).contains(&Cmd::Play { folder: 2, track: 2 }));
    assert_eq!(sink.transitions()[1].2, StateId::Cooldown);
}

// ── Presets ───────────────────────────────────────────────────

#[test]
fn ghost_preset_is_silent_until_triggered() {
    let clock = VirtualClock::new();
    let config = Preset::Ghost.config();
    let (hw, sink, _) = run_until(&clock, single_trigger(&clock), config, ms(13_000));

    assert!(hw.plays_in(1).iter().all(|&(at, _)| at >= ms(1_200)));
    assert_eq!(hw.plays_in(1), vec![(ms(1_200), 1)]);
    // Announcement (11 s) outlasts the motor (10 s); no lights at all.
    assert!(hw.calls.iter().all(|c| !matches!(c.cmd, Cmd::Light { level, .. } if level > 0)));
    assert_eq!(
        sink.transitions(),
        vec![
            (ms(1_200), StateId::Idle, StateId::Triggered),
            (ms(12_200), StateId::Triggered, StateId::Cooldown),
        ]
    );
    assert!(hw.is_safe());
}

#[test]
fn jitter_ghost_cuts_the_song_when_the_alert_ends() {
    let clock = VirtualClock::new();
    let config = Preset::JitterGhost.config();
    let (hw, sink, _) = run_until(&clock, single_trigger(&clock), config, ms(12_000));

    assert_eq!(hw.plays_in(1), vec![(ms(1_200), 1)]);
    assert!(hw.calls_at(ms(11_200)).contains(&Cmd::AudioStop));
    assert_eq!(sink.transitions()[1], (ms(11_200), StateId::Triggered, StateId::Cooldown));
    // The song keeps playing on the default presets until shutdown.
    let clock = VirtualClock::new();
    let (hw, _, _) = run_until(&clock, single_trigger(&clock), Preset::Ghost.config(), ms(12_500));
    assert!(!hw.calls_at(ms(12_200)).contains(&Cmd::AudioStop));
}

// ── Lighting ──────────────────────────────────────────────────

#[test]
fn sputter_flickers_inside_its_window_and_ends_dark() {
    let clock = VirtualClock::new();
    let mut config = test_config();
    config.lighting.sputter = Some(SputterConfig {
        channel: 2,
        duration_ms: 2_000,
        min_interval_ms: 100,
        max_interval_ms: 300,
        max_percent: 70,
    });
    let (hw, _, summary) = run_until(&clock, single_trigger(&clock), config, ms(15_000));

    let writes: Vec<(Duration, u8)> = hw
        .calls
        .iter()
        .filter_map(|c| match c.cmd {
            Cmd::Light { channel: 2, level } => Some((c.at, level)),
            _ => None,
        })
        .collect();
    let window = |at: Duration| at >= ms(1_200) && at < ms(3_200);

    // Intervals never exceed 300 ms, so 2 s holds at least seven states.
    assert!(writes.iter().filter(|&&(at, _)| window(at)).count() >= 7);
    assert!(writes.iter().all(|&(_, level)| level == 0 || level == 70));
    assert!(writes.iter().filter(|&&(_, level)| level > 0).all(|&(at, _)| window(at)));
    assert_eq!(writes.last().map(|&(_, level)| level), Some(0));
    assert_eq!(hw.light_level(2), 0);
    assert_eq!(summary.driver_faults, 0);
}

// ── Accessors ─────────────────────────────────────────────────

#[test]
fn stopped_orchestrator_reports_where_it_was() {
    let clock = VirtualClock::new();
    let mut prop = Orchestrator::new(
        single_trigger(&clock),
        clock.clone(),
        SmallRng::seed_from_u64(7),
        RecordingSink::new(),
        test_config(),
    );
    let shutdown = CancelToken::new();
    let (summary, ()) = clock.block_on(zip(prop.run(&shutdown), async {
        clock.sleep(ms(16_000)).await;
        shutdown.cancel();
    }));

    // Cooldown runs 14.2 s to 19.2 s.
    assert_eq!(prop.state(), StateId::Cooldown);
    assert_eq!(prop.summary().alerts_completed, summary.alerts_completed);
    assert_eq!(prop.summary().triggers, 1);
    assert_eq!(prop.alert_cycle().position(), 1);
}

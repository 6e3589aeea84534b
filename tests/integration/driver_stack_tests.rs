//! The orchestrator on top of the real driver stack.
//!
//! `HardwareAdapter` with its DFPlayer on a wire tap, the host GPIO/LEDC
//! stubs underneath, and the simulated PIR and stop switch.  Time is still
//! virtual.

use std::collections::VecDeque;

use futures_lite::future::zip;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use propctl::adapters::hardware::HardwareAdapter;
use propctl::adapters::time::VirtualClock;
use propctl::app::orchestrator::Orchestrator;
use propctl::app::ports::{AudioPort, Clock};
use propctl::cancel::CancelToken;
use propctl::drivers::dfplayer::{Command, DfPlayer, FRAME_LEN, encode};
use propctl::drivers::lamp::LampBank;
use propctl::drivers::motor::{MotorDriver, MotorState};
use propctl::drivers::pir::{self, PirSensor};
use propctl::drivers::serial::SerialPort;
use propctl::drivers::stop_switch;
use propctl::fsm::StateId;

use crate::mock_hw::{RecordingSink, ms, test_config};

/// Serial port that keeps every written byte and replays queued input.
#[derive(Default)]
struct WireTap {
    written: Vec<u8>,
    incoming: VecDeque<u8>,
}

impl SerialPort for WireTap {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.written.extend_from_slice(data);
        Ok(data.len())
    }
}

fn adapter(port: WireTap) -> HardwareAdapter<WireTap> {
    HardwareAdapter::new(
        PirSensor::new(std::time::Duration::ZERO),
        DfPlayer::new(port),
        MotorDriver::new(),
        LampBank::new(4),
    )
}

#[test]
fn stop_switch_shuts_down_real_driver_stack() {
    let clock = VirtualClock::new();
    let mut prop = Orchestrator::new(
        adapter(WireTap::default()),
        clock.clone(),
        SmallRng::seed_from_u64(1),
        RecordingSink::new(),
        test_config(),
    );
    let shutdown = CancelToken::new();

    pir::sim_set_motion(true);
    let (summary, ((), ())) = clock.block_on(zip(
        prop.run(&shutdown),
        zip(stop_switch::watch(&clock, &shutdown, ms(50)), async {
            clock.sleep(ms(3_000)).await;
            stop_switch::sim_press();
        }),
    ));
    pir::sim_set_motion(false);

    assert!(clock.now() <= ms(3_050));
    assert_eq!(summary.triggers, 1);
    assert_eq!(summary.alerts_completed, 0);

    let (hw, sink) = prop.into_parts();
    assert_eq!(sink.transitions(), vec![(ms(100), StateId::Idle, StateId::Triggered)]);
    assert_eq!(hw.motor().state(), MotorState::Stopped);
    assert!(hw.lamps().all_dark());

    // Ambient track, alert announcement, then the shutdown stop.
    let frames: Vec<&[u8]> = hw.audio().port().written.chunks(FRAME_LEN).collect();
    let expected = [
        encode(Command::Volume(20), false),
        encode(Command::PlayFolderTrack { folder: 1, track: 1 }, false),
        encode(Command::Volume(25), false),
        encode(Command::PlayFolderTrack { folder: 2, track: 1 }, false),
        encode(Command::Stop, false),
    ];
    assert_eq!(frames.len(), expected.len());
    for (got, want) in frames.iter().zip(expected.iter()) {
        assert_eq!(*got, &want[..]);
    }
}

#[test]
fn module_error_replies_are_drained_before_next_command() {
    let mut port = WireTap::default();
    // "track not found" from the module.
    port.incoming
        .extend([0x7E, 0xFF, 0x06, 0x40, 0x00, 0x00, 0x06, 0xFE, 0xB5, 0xEF]);
    let mut hw = adapter(port);

    hw.play(2, 9).unwrap();

    assert_eq!(hw.audio().module_errors(), 1);
    assert_eq!(hw.audio().last_error(), Some(6));
    assert_eq!(hw.audio().port().written.len(), FRAME_LEN);
}

//! DFPlayer Mini MP3 module driver.
//!
//! Wire format (9600 8N1, every frame exactly 10 bytes):
//! ```text
//! ┌──────┬─────────┬─────┬─────┬──────────┬───────────┬──────────┬──────┐
//! │ 0x7E │ ver 0xFF│ 0x06│ cmd │ feedback │ param (BE)│ csum (BE)│ 0xEF │
//! └──────┴─────────┴─────┴─────┴──────────┴───────────┴──────────┴──────┘
//! ```
//! `csum` is the two's complement of the sum of `ver..=param`.
//!
//! The module answers on the same link (track finished, errors, acks).
//! [`ReplyDecoder`] pulls those frames out of an arbitrary byte stream:
//! it resynchronises on garbage and drops frames with a bad checksum.

use log::{debug, warn};

use crate::config::MAX_VOLUME;
use crate::drivers::serial::SerialPort;
use crate::error::DriverError;

pub const FRAME_LEN: usize = 10;
const START: u8 = 0x7E;
const VERSION: u8 = 0xFF;
const LENGTH: u8 = 0x06;
const END: u8 = 0xEF;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Play by global file index (root order on the card).
    PlayIndex(u16),
    /// Play `NNN.mp3` from folder `NN`.
    PlayFolderTrack { folder: u8, track: u8 },
    /// 0–30.
    Volume(u8),
    Stop,
    Reset,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Self::PlayIndex(_) => 0x03,
            Self::Volume(_) => 0x06,
            Self::Reset => 0x0C,
            Self::PlayFolderTrack { .. } => 0x0F,
            Self::Stop => 0x16,
        }
    }

    pub fn param(self) -> u16 {
        match self {
            Self::PlayIndex(i) => i,
            Self::PlayFolderTrack { folder, track } => u16::from_be_bytes([folder, track]),
            Self::Volume(v) => u16::from(v),
            Self::Stop | Self::Reset => 0,
        }
    }
}

/// Two's complement of the byte sum.
pub fn checksum(bytes: &[u8]) -> u16 {
    let sum = bytes.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
    0u16.wrapping_sub(sum)
}

/// Encode one command frame.
pub fn encode(cmd: Command, feedback: bool) -> [u8; FRAME_LEN] {
    let [ph, pl] = cmd.param().to_be_bytes();
    let mut frame = [START, VERSION, LENGTH, cmd.code(), u8::from(feedback), ph, pl, 0, 0, END];
    let [ch, cl] = checksum(&frame[1..7]).to_be_bytes();
    frame[7] = ch;
    frame[8] = cl;
    frame
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    CardInserted,
    CardRemoved,
    /// Track finished playing from the SD card.
    TrackFinished(u16),
    /// Power-on ready; param is the storage device mask.
    Ready(u16),
    /// Module error (1 = busy, 2 = sleeping, 3 = serial error, 4 = bad
    /// checksum, 5 = track out of scope, 6 = track not found, ...).
    Error(u16),
    Ack,
    /// Any query answer this driver does not interpret.
    Other { cmd: u8, param: u16 },
}

impl Reply {
    fn from_parts(cmd: u8, param: u16) -> Self {
        match cmd {
            0x3A => Self::CardInserted,
            0x3B => Self::CardRemoved,
            0x3D => Self::TrackFinished(param),
            0x3F => Self::Ready(param),
            0x40 => Self::Error(param),
            0x41 => Self::Ack,
            _ => Self::Other { cmd, param },
        }
    }
}

/// Streaming reply decoder.  Feed bytes one at a time or in chunks.
pub struct ReplyDecoder {
    buf: [u8; FRAME_LEN],
    len: usize,
    bad_frames: u32,
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyDecoder {
    pub fn new() -> Self {
        Self {
            buf: [0; FRAME_LEN],
            len: 0,
            bad_frames: 0,
        }
    }

    /// Push one byte.  Returns a reply when it completes a valid frame.
    pub fn push(&mut self, byte: u8) -> Option<Reply> {
        if self.len == 0 && byte != START {
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;

        // Header bytes are fixed; a mismatch means we locked onto noise.
        if !self.header_ok() {
            self.resync();
            return None;
        }
        if self.len < FRAME_LEN {
            return None;
        }

        let f = self.buf;
        let expected = checksum(&f[1..7]);
        if f[9] != END || u16::from_be_bytes([f[7], f[8]]) != expected {
            self.bad_frames = self.bad_frames.saturating_add(1);
            self.resync();
            return None;
        }
        self.len = 0;
        Some(Reply::from_parts(f[3], u16::from_be_bytes([f[5], f[6]])))
    }

    /// Push a chunk, calling `on_reply` for every complete frame.
    pub fn feed(&mut self, data: &[u8], mut on_reply: impl FnMut(Reply)) {
        for &b in data {
            if let Some(reply) = self.push(b) {
                on_reply(reply);
            }
        }
    }

    /// Frames dropped for a bad checksum or end marker.
    pub fn bad_frames(&self) -> u32 {
        self.bad_frames
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }

    fn header_ok(&self) -> bool {
        (self.len < 2 || self.buf[1] == VERSION) && (self.len < 3 || self.buf[2] == LENGTH)
    }

    /// Drop the leading start byte of a broken candidate and re-anchor on
    /// the next start byte already buffered.
    fn resync(&mut self) {
        while self.len > 0 {
            let Some(at) = self.buf[1..self.len].iter().position(|&b| b == START) else {
                self.len = 0;
                return;
            };
            let at = at + 1;
            self.buf.copy_within(at..self.len, 0);
            self.len -= at;
            if self.header_ok() {
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// DFPlayer on a serial port.  Commands are fire-and-forget; replies are
/// drained and logged before each new command.
pub struct DfPlayer<P: SerialPort> {
    port: P,
    decoder: ReplyDecoder,
    module_errors: u32,
    last_error: Option<u16>,
}

impl<P: SerialPort> DfPlayer<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            decoder: ReplyDecoder::new(),
            module_errors: 0,
            last_error: None,
        }
    }

    pub fn play(&mut self, folder: u8, track: u8) -> Result<(), DriverError> {
        if folder == 0 || folder > 99 || track == 0 {
            return Err(DriverError::OutOfRange);
        }
        self.send(Command::PlayFolderTrack { folder, track })
    }

    pub fn set_volume(&mut self, level: u8) -> Result<(), DriverError> {
        if level > MAX_VOLUME {
            return Err(DriverError::OutOfRange);
        }
        self.send(Command::Volume(level))
    }

    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.send(Command::Stop)
    }

    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.send(Command::Reset)
    }

    /// Drain and log pending replies.  Returns how many were read.
    pub fn poll_replies(&mut self) -> usize {
        let mut buf = [0u8; 32];
        let mut seen = 0;
        loop {
            let n = match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("dfplayer: read failed: {:?}", e);
                    break;
                }
            };
            let Self {
                decoder,
                module_errors,
                last_error,
                ..
            } = self;
            decoder.feed(&buf[..n], |reply| {
                seen += 1;
                match reply {
                    Reply::Error(code) => {
                        warn!("dfplayer: module error {}", code);
                        *module_errors += 1;
                        *last_error = Some(code);
                    }
                    other => debug!("dfplayer: {:?}", other),
                }
            });
        }
        seen
    }

    pub fn module_errors(&self) -> u32 {
        self.module_errors
    }

    pub fn last_error(&self) -> Option<u16> {
        self.last_error
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    fn send(&mut self, cmd: Command) -> Result<(), DriverError> {
        self.poll_replies();
        let frame = encode(cmd, false);
        match self.port.write(&frame) {
            Ok(FRAME_LEN) => {
                debug!("dfplayer: {:?}", cmd);
                Ok(())
            }
            Ok(n) => {
                warn!("dfplayer: short write {}/{} for {:?}", n, FRAME_LEN, cmd);
                Err(DriverError::SerialWriteFailed)
            }
            Err(e) => {
                warn!("dfplayer: write failed for {:?}: {:?}", cmd, e);
                Err(DriverError::SerialWriteFailed)
            }
        }
    }
}

//! Alert audio: a fixed announcement, then the next track of a cycle.

use log::debug;

use crate::app::ports::{AudioPort, Clock};
use crate::cancel::{CancelToken, Cancelled};
use crate::config::{AlertConfig, TrackList, ms};

use super::{Rig, RoutineReport};

/// Cyclic position in the alert track sequence.
///
/// Lives in the orchestrator for the whole run and is lent to the alert
/// routine, which is its only writer.
#[derive(Debug, Clone)]
pub struct AlertCycle {
    tracks: TrackList,
    index: usize,
}

impl AlertCycle {
    pub fn new(tracks: TrackList) -> Self {
        Self { tracks, index: 0 }
    }

    /// Current track, then step one position (wrapping).  `None` when the
    /// sequence is empty.
    pub fn advance(&mut self) -> Option<u8> {
        let track = *self.tracks.get(self.index)?;
        self.index = (self.index + 1) % self.tracks.len();
        Some(track)
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// One alert: announcement, wait, next cycle track, wait, and optionally
/// a closing audio stop.
///
/// The cycle advances exactly once per call, up front, so an alert cut
/// short by shutdown still consumes its slot.
pub async fn run<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &AlertConfig,
    cycle: &mut AlertCycle,
    token: &CancelToken,
) -> RoutineReport
where
    H: AudioPort,
    C: Clock,
{
    let mut report = RoutineReport::new("alert");
    let next = cycle.advance();
    let outcome = sequence(rig, cfg, next, token, &mut report).await;
    report.cancelled = outcome.is_err();
    report
}

async fn sequence<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &AlertConfig,
    next: Option<u8>,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<(), Cancelled>
where
    H: AudioPort,
    C: Clock,
{
    token.check()?;
    {
        let mut hw = rig.hw.borrow_mut();
        report.check("set_volume", hw.set_volume(cfg.volume));
        report.check("play", hw.play(cfg.folder, cfg.announce_track));
    }
    debug!("alert: announce {:02}/{:03}", cfg.folder, cfg.announce_track);
    token.sleep(rig.clock, ms(cfg.announce_wait_ms)).await?;

    if let Some(track) = next {
        report.check("play", rig.hw.borrow_mut().play(cfg.folder, track));
        debug!("alert: cycle {:02}/{:03}", cfg.folder, track);
        token.sleep(rig.clock, ms(cfg.playback_wait_ms)).await?;
    }
    if cfg.stop_at_end {
        report.check("stop", rig.hw.borrow_mut().stop());
        debug!("alert: audio stopped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_of(tracks: &[u8]) -> AlertCycle {
        AlertCycle::new(TrackList::from_slice(tracks).unwrap())
    }

    #[test]
    fn wraps_after_last_track() {
        let mut c = cycle_of(&[2, 3, 4]);
        let picked: Vec<u8> = (0..4).filter_map(|_| c.advance()).collect();
        assert_eq!(picked, vec![2, 3, 4, 2]);
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn single_track_repeats() {
        let mut c = cycle_of(&[7]);
        assert_eq!(c.advance(), Some(7));
        assert_eq!(c.advance(), Some(7));
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn empty_cycle_yields_nothing() {
        let mut c = cycle_of(&[]);
        assert!(c.is_empty());
        assert_eq!(c.advance(), None);
    }
}

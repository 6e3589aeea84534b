//! Idle-state background audio loop.

use core::convert::Infallible;

use log::debug;
use rand::Rng;

use crate::app::ports::{AudioPort, Clock};
use crate::cancel::{CancelToken, Cancelled};
use crate::config::{AmbientConfig, ms};

use super::{Rig, RoutineReport};

/// Loop over the ambient track list until `token` is cancelled.
///
/// The token is checked before every track, so once it fires no further
/// play command is issued.  An empty list just parks on the token.
pub async fn run<H, C, R>(rig: Rig<'_, H, C, R>, cfg: &AmbientConfig, token: &CancelToken) -> RoutineReport
where
    H: AudioPort,
    C: Clock,
    R: Rng,
{
    let mut report = RoutineReport::new("ambient");
    if cfg.tracks.is_empty() {
        token.cancelled().await;
    } else {
        let Err(Cancelled) = play_forever(rig, cfg, token, &mut report).await;
    }
    report.cancelled = true;
    report
}

async fn play_forever<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &AmbientConfig,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<Infallible, Cancelled>
where
    H: AudioPort,
    C: Clock,
    R: Rng,
{
    loop {
        for &track in &cfg.tracks {
            token.check()?;
            {
                let mut hw = rig.hw.borrow_mut();
                report.check("set_volume", hw.set_volume(cfg.volume));
                report.check("play", hw.play(cfg.folder, track));
            }
            let wait = rig.random_wait(cfg.min_wait_ms, cfg.max_wait_ms);
            debug!("ambient: {:02}/{:03}, next in {:?}", cfg.folder, track, wait);
            token.sleep(rig.clock, wait).await?;
        }
        token.sleep(rig.clock, ms(cfg.cycle_pause_ms)).await?;
    }
}

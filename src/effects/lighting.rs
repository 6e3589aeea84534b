//! Lighting patterns: fade-in, sputter, flash.
//!
//! Each pattern drives one channel and leaves it at zero when it ends.
//! Patterns configured on the same channel run together and simply
//! overwrite each other (last write wins).

use core::time::Duration;

use futures_lite::future::zip;
use heapless::Vec;
use log::debug;
use rand::Rng;

use crate::app::ports::{Clock, LightPort};
use crate::cancel::{CancelToken, Cancelled};
use crate::config::{FadeConfig, FlashConfig, LightingConfig, SputterConfig, ms};

use super::{LightOffGuard, Rig, RoutineReport};

/// Run every configured pattern concurrently and join them.
pub async fn run<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &LightingConfig,
    token: &CancelToken,
) -> Vec<RoutineReport, 3>
where
    H: LightPort,
    C: Clock,
    R: Rng,
{
    let fade_task = async {
        match &cfg.fade {
            Some(f) => Some(fade(rig, f, token).await),
            None => None,
        }
    };
    let sputter_task = async {
        match &cfg.sputter {
            Some(s) => Some(sputter(rig, s, token).await),
            None => None,
        }
    };
    let flash_task = async {
        match &cfg.flash {
            Some(f) => Some(flash(rig, f, token).await),
            None => None,
        }
    };

    let (fade, (sputter, flash)) = zip(fade_task, zip(sputter_task, flash_task)).await;
    [fade, sputter, flash].into_iter().flatten().collect()
}

/// Linear ramp from 0 to `max_percent` in `steps` increments over
/// `duration_ms`, then off.
pub async fn fade<H, C, R>(rig: Rig<'_, H, C, R>, cfg: &FadeConfig, token: &CancelToken) -> RoutineReport
where
    H: LightPort,
    C: Clock,
{
    let mut report = RoutineReport::new("fade");
    let guard = LightOffGuard::new(rig.hw, cfg.channel);
    let outcome = ramp(rig, cfg, token, &mut report).await;
    report.cancelled = outcome.is_err();
    guard.finish(&mut report);
    report
}

/// Intensity of fade step `i` of `steps`.
pub fn fade_level(i: u16, steps: u16, max_percent: u8) -> u8 {
    if steps == 0 {
        return max_percent;
    }
    (u32::from(max_percent) * u32::from(i.min(steps)) / u32::from(steps)) as u8
}

async fn ramp<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &FadeConfig,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<(), Cancelled>
where
    H: LightPort,
    C: Clock,
{
    let steps = cfg.steps.max(1);
    let step = ms(cfg.duration_ms) / u32::from(steps);
    debug!("fade: ch{} to {}% in {} steps", cfg.channel, cfg.max_percent, steps);

    for i in 0..=steps {
        token.check()?;
        let level = fade_level(i, steps, cfg.max_percent);
        report.check("set_intensity", rig.hw.borrow_mut().set_intensity(cfg.channel, level));
        if i < steps {
            token.sleep(rig.clock, step).await?;
        }
    }
    Ok(())
}

/// Random on/off flicker at random intervals for `duration_ms`, then off.
pub async fn sputter<H, C, R>(rig: Rig<'_, H, C, R>, cfg: &SputterConfig, token: &CancelToken) -> RoutineReport
where
    H: LightPort,
    C: Clock,
    R: Rng,
{
    let mut report = RoutineReport::new("sputter");
    let guard = LightOffGuard::new(rig.hw, cfg.channel);
    let outcome = flicker(rig, cfg, token, &mut report).await;
    report.cancelled = outcome.is_err();
    guard.finish(&mut report);
    report
}

async fn flicker<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &SputterConfig,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<(), Cancelled>
where
    H: LightPort,
    C: Clock,
    R: Rng,
{
    let end = rig.clock.now() + ms(cfg.duration_ms);
    loop {
        let now = rig.clock.now();
        if now >= end {
            return Ok(());
        }
        token.check()?;
        let on = rig.rng.borrow_mut().gen_bool(0.5);
        let level = if on { cfg.max_percent } else { 0 };
        report.check("set_intensity", rig.hw.borrow_mut().set_intensity(cfg.channel, level));

        let wait = rig.random_wait(cfg.min_interval_ms, cfg.max_interval_ms);
        token.sleep(rig.clock, wait.min(end - now)).await?;
    }
}

/// `count` symmetric on/off periods spread over `duration_ms`, then off.
pub async fn flash<H, C, R>(rig: Rig<'_, H, C, R>, cfg: &FlashConfig, token: &CancelToken) -> RoutineReport
where
    H: LightPort,
    C: Clock,
{
    let mut report = RoutineReport::new("flash");
    let guard = LightOffGuard::new(rig.hw, cfg.channel);
    let outcome = strobe(rig, cfg, token, &mut report).await;
    report.cancelled = outcome.is_err();
    guard.finish(&mut report);
    report
}

async fn strobe<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &FlashConfig,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<(), Cancelled>
where
    H: LightPort,
    C: Clock,
{
    let count = cfg.count.max(1);
    let half: Duration = ms(cfg.duration_ms) / (2 * u32::from(count));

    for _ in 0..count {
        token.check()?;
        report.check("set_intensity", rig.hw.borrow_mut().set_intensity(cfg.channel, cfg.max_percent));
        token.sleep(rig.clock, half).await?;
        report.check("set_intensity", rig.hw.borrow_mut().set_intensity(cfg.channel, 0));
        token.sleep(rig.clock, half).await?;
    }
    Ok(())
}

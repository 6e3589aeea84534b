//! Motor spin pattern.

use log::debug;

use crate::app::ports::{Clock, MotorPort};
use crate::cancel::{CancelToken, Cancelled};
use crate::config::{MotorConfig, ms};

use super::{MotorStopGuard, Rig, RoutineReport};

/// Optional start delay, then `cycles` × (forward at duty, wait, stop,
/// wait).  A stop is always the last command, cancelled or not.
pub async fn run<H, C, R>(rig: Rig<'_, H, C, R>, cfg: &MotorConfig, token: &CancelToken) -> RoutineReport
where
    H: MotorPort,
    C: Clock,
{
    let mut report = RoutineReport::new("motor");
    if !cfg.enabled || cfg.cycles == 0 {
        return report;
    }

    let guard = MotorStopGuard::new(rig.hw);
    let outcome = spin(rig, cfg, token, &mut report).await;
    report.cancelled = outcome.is_err();
    guard.finish(&mut report);
    report
}

async fn spin<H, C, R>(
    rig: Rig<'_, H, C, R>,
    cfg: &MotorConfig,
    token: &CancelToken,
    report: &mut RoutineReport,
) -> Result<(), Cancelled>
where
    H: MotorPort,
    C: Clock,
{
    token.sleep(rig.clock, ms(cfg.start_delay_ms)).await?;

    for cycle in 1..=cfg.cycles {
        {
            let mut hw = rig.hw.borrow_mut();
            report.check("set_forward", hw.set_forward());
            report.check("set_duty", hw.set_duty(cfg.duty_percent));
        }
        debug!("motor: cycle {}/{} at {}%", cycle, cfg.cycles, cfg.duty_percent);
        token.sleep(rig.clock, ms(cfg.on_ms)).await?;

        report.check("stop", rig.hw.borrow_mut().stop());
        token.sleep(rig.clock, ms(cfg.off_ms)).await?;
    }
    Ok(())
}

//! Supervisor task, sole feeder of the IWDG

use defmt::*;
use embassy_time::{Duration, Ticker};

use clepsydra_core::supervisor::{Supervisor, SupervisorStatus};
use clepsydra_hal_stm32f4::Iwdg;

use super::now_ms;

#[embassy_executor::task]
pub async fn supervisor_task(mut supervisor: Supervisor<'static, Iwdg<'static>>, period_ms: u32) -> ! {
    info!(
        "Supervisor started, stale after {} ms",
        supervisor.threshold_ms()
    );
    if !supervisor.watchdog().is_armed() {
        warn!("Watchdog not armed, stale tasks will only be logged");
    }

    let mut ticker = Ticker::every(Duration::from_millis(period_ms as u64));
    let mut starving = false;
    loop {
        match supervisor.step(now_ms()) {
            SupervisorStatus::Healthy => {
                if starving {
                    info!("All subsystems alive again");
                    starving = false;
                }
            }
            SupervisorStatus::Stale { subsystem, age_ms } => {
                warn!(
                    "{=str} silent for {} ms, starving watchdog",
                    subsystem.name(),
                    age_ms
                );
                starving = true;
            }
        }
        ticker.next().await;
    }
}

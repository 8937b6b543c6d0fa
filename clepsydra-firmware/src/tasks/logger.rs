//! Sample logger task

use defmt::*;
use embassy_time::{with_timeout, Duration};

use clepsydra_core::logger::{SampleLogger, StepOutcome};
use clepsydra_core::supervisor::{LivenessTable, Subsystem};

use super::{now_ms, Registers};
use crate::channels::LOG_EVENTS;
use crate::storage::RttStorage;

/// Drains the sample queue; the sample period bounds each wait
#[embassy_executor::task]
pub async fn logger_task(
    registers: &'static Registers,
    mut logger: SampleLogger<RttStorage>,
    sample_period_ms: u32,
    liveness: &'static LivenessTable,
) -> ! {
    info!("Logger task started");

    let period = Duration::from_millis(sample_period_ms as u64);
    let mut open_date = None;
    loop {
        liveness.kick(Subsystem::Logger, now_ms());

        let event = with_timeout(period, LOG_EVENTS.receive()).await.ok();
        match logger.step(registers, event, now_ms()) {
            Ok(StepOutcome::Recorded) => trace!("Sample recorded"),
            Ok(_) => {}
            Err(e) if logger.is_available() => warn!("Log storage error: {:?}", e),
            Err(e) => warn!("Log storage unavailable ({:?}), logging disabled", e),
        }

        if logger.open_date() != open_date {
            open_date = logger.open_date();
            if let Some(date) = open_date {
                info!("Logging to file for {:?}", date);
            }
        }
    }
}

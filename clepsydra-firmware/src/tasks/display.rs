//! Display render task
//!
//! Waits for clock changes from the Modbus task, renders them off-screen and
//! publishes the finished frame to the scan.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::with_timeout;

use clepsydra_core::config::PanelConfig;
use clepsydra_core::supervisor::{LivenessTable, Subsystem};
use clepsydra_display::{ClockRenderer, SharedBitmap};

use super::{now_ms, Registers, KEEPALIVE};
use crate::channels::DISPLAY_TIME;

#[embassy_executor::task]
pub async fn display_task(
    registers: &'static Registers,
    frame: &'static SharedBitmap<CriticalSectionRawMutex>,
    panel: PanelConfig,
    liveness: &'static LivenessTable,
) -> ! {
    info!("Display task started");

    let mut renderer = ClockRenderer::new(panel);

    // The time latch starts dirty, so the boot frame shows 000 00
    if let Some(time) = registers.consume_changed_time() {
        renderer.update(time, frame);
    }

    loop {
        liveness.kick(Subsystem::Display, now_ms());

        if let Ok(time) = with_timeout(KEEPALIVE, DISPLAY_TIME.wait()).await {
            debug!("Rendering {}:{}", time.minutes, time.seconds);
            renderer.update(time, frame);
        }
    }
}

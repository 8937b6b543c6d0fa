//! HUB12 row scan task
//!
//! Runs on the high-priority interrupt executor so rendering, networking
//! and logging never stretch a row and cause visible flicker.

use defmt::*;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Ticker};

use clepsydra_display::ScanEngine;
use clepsydra_hal_stm32f4::PanelPin;

pub type PanelScan = ScanEngine<'static, CriticalSectionRawMutex, PanelPin<'static>>;

#[embassy_executor::task]
pub async fn scan_task(mut engine: PanelScan, scan_hz: u32) -> ! {
    info!("Scan task started at {} Hz", scan_hz);

    let mut ticker = Ticker::every(Duration::from_hz(scan_hz as u64));
    loop {
        ticker.next().await;
        engine.step();
    }
}

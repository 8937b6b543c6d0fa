//! Network stack runner

use embassy_net::Runner;
use embassy_stm32::eth::{Ethernet, GenericPhy};
use embassy_stm32::peripherals::ETH;

pub type EthDevice = Ethernet<'static, ETH, GenericPhy>;

/// Drives embassy-net; must run for any socket to make progress
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, EthDevice>) -> ! {
    runner.run().await
}

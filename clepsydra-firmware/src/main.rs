//! Clepsydra - Modbus Clock Panel Firmware
//!
//! Main firmware binary for STM32F407 boards with an RMII Ethernet PHY and a
//! chain of HUB12 LED panels. A Modbus/TCP master writes the clock into the
//! register table; the panels show it, samples are logged, and a supervisor
//! resets the board through the IWDG if any task stops making progress.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_net::{Ipv4Address, Ipv4Cidr, StackResources, StaticConfigV4};
use embassy_stm32::eth::{Ethernet, GenericPhy, PacketQueue};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::peripherals::RNG;
use embassy_stm32::rng::Rng;
use embassy_stm32::time::Hertz;
use embassy_stm32::{bind_interrupts, eth, rng, Config};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use clepsydra_core::config::{parse_config, DeviceConfig, NetworkConfig};
use clepsydra_core::logger::SampleLogger;
use clepsydra_core::supervisor::{LivenessTable, Supervisor, Watchdog};
use clepsydra_display::{HubPins, ScanEngine, SharedBitmap};
use clepsydra_hal_stm32f4::{Iwdg, PanelPin};

use crate::storage::RttStorage;
use crate::tasks::{net::EthDevice, Registers};

mod channels;
mod storage;
mod tasks;

/// Embedded device configuration
/// Edit device.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../device.toml");

/// embassy-net socket slots: the Modbus listener plus DHCP and spare
const SOCKET_COUNT: usize = 3;

bind_interrupts!(struct Irqs {
    ETH => eth::InterruptHandler;
    HASH_RNG => rng::InterruptHandler<RNG>;
});

// High-priority executor for the row scan
static EXECUTOR_SCAN: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART5() {
    EXECUTOR_SCAN.on_interrupt()
}

// Shared state, constructed once and handed to tasks as &'static
static REGISTERS: StaticCell<Registers> = StaticCell::new();
static FRAME: StaticCell<SharedBitmap<CriticalSectionRawMutex>> = StaticCell::new();
static LIVENESS: StaticCell<LivenessTable> = StaticCell::new();

// Network buffers
static PACKETS: StaticCell<PacketQueue<4, 4>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Clepsydra firmware starting...");

    let p = embassy_stm32::init(clock_config());
    info!("Peripherals initialized");

    let config = load_config();
    let panel = config.panel;

    // HUB12 connector on port D; panel blanked before anything else runs
    let pins = HubPins {
        a: PanelPin::new(p.PD0),
        b: PanelPin::new(p.PD1),
        c: (panel.scan_lines.address_lines() > 2).then(|| PanelPin::new(p.PD2)),
        r1: PanelPin::new(p.PD3),
        r2: PanelPin::new(p.PD4),
        clk: PanelPin::new(p.PD5),
        lat: PanelPin::new(p.PD6),
        oe: PanelPin::with_level(p.PD7, panel.oe_active_low),
    };

    let registers: &'static Registers = REGISTERS.init(Registers::new());
    let frame = FRAME.init(SharedBitmap::new(panel.total_width()));
    let liveness: &'static LivenessTable = LIVENESS.init(LivenessTable::new());
    info!("Shared state initialized");

    // Arm the watchdog before any task can wedge
    let mut watchdog = Watchdog::new(Iwdg::new(p.IWDG));
    match watchdog.init(config.watchdog.timeout_ms) {
        Ok(()) => info!("Watchdog armed: {} ms", config.watchdog.timeout_ms),
        Err(e) => error!("Watchdog not armed: {:?}", e),
    }
    let supervisor = Supervisor::new(liveness, watchdog, config.watchdog.timeout_ms);

    // Row scan preempts every thread-mode task
    match ScanEngine::new(pins, frame, &panel) {
        Ok(engine) => {
            interrupt::UART5.set_priority(Priority::P6);
            let scan_spawner = EXECUTOR_SCAN.start(interrupt::UART5);
            scan_spawner
                .spawn(tasks::scan_task(engine, panel.scan_hz))
                .unwrap();
        }
        Err(e) => error!("Panel scan disabled: {:?}", e),
    }

    // Ethernet
    let mut rng = Rng::new(p.RNG, Irqs);
    let mut seed = [0u8; 8];
    if rng.async_fill_bytes(&mut seed).await.is_err() {
        warn!("RNG failed, seeding network stack from the device id");
        seed.copy_from_slice(&embassy_stm32::uid::uid()[..8]);
    }

    let device: EthDevice = Ethernet::new(
        PACKETS.init(PacketQueue::<4, 4>::new()),
        p.ETH,
        Irqs,
        p.PA1,
        p.PA2,
        p.PC1,
        p.PA7,
        p.PC4,
        p.PC5,
        p.PB12,
        p.PB13,
        p.PB11,
        GenericPhy::new_auto(),
        mac_address(),
    );

    let (stack, runner) = embassy_net::new(
        device,
        net_config(&config.network),
        RESOURCES.init(StackResources::new()),
        u64::from_le_bytes(seed),
    );
    info!("Ethernet initialized");

    // Spawn tasks
    spawner.spawn(tasks::net_task(runner)).unwrap();
    spawner
        .spawn(tasks::modbus_task(stack, config.network.port, registers, liveness))
        .unwrap();
    spawner
        .spawn(tasks::display_task(registers, frame, panel, liveness))
        .unwrap();
    spawner
        .spawn(tasks::logger_task(
            registers,
            SampleLogger::new(RttStorage::new(), &config.log),
            config.log.sample_period_ms,
            liveness,
        ))
        .unwrap();
    spawner
        .spawn(tasks::supervisor_task(
            supervisor,
            config.watchdog.supervisor_period_ms,
        ))
        .unwrap();

    info!("All tasks spawned, firmware running");
}

/// 168 MHz from an 8 MHz crystal, 48 MHz for the RNG
fn clock_config() -> Config {
    use embassy_stm32::rcc::*;

    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll_src = PllSource::HSE;
    config.rcc.pll = Some(Pll {
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL168,
        divp: Some(PllPDiv::DIV2),
        divq: Some(PllQDiv::DIV7),
        divr: None,
    });
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV4;
    config.rcc.apb2_pre = APBPrescaler::DIV2;
    config.rcc.sys = Sysclk::PLL1_P;
    config
}

/// Parse the embedded device.toml, falling back to defaults
fn load_config() -> DeviceConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            // build.rs validates device.toml, so this means the two disagree
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default configuration");
            DeviceConfig::default()
        }
    }
}

/// Locally administered MAC derived from the 96-bit device id
fn mac_address() -> [u8; 6] {
    let uid = embassy_stm32::uid::uid();
    [0x02, 0x00, uid[0], uid[4], uid[8], uid[11]]
}

fn net_config(network: &NetworkConfig) -> embassy_net::Config {
    let Some(cidr) = network.address else {
        info!("Using DHCP");
        return embassy_net::Config::dhcpv4(Default::default());
    };

    let [a, b, c, d] = cidr.address;
    info!("Static address {}.{}.{}.{}/{}", a, b, c, d, cidr.prefix_len);
    embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(Ipv4Address::new(a, b, c, d), cidr.prefix_len),
        gateway: network
            .gateway
            .map(|[a, b, c, d]| Ipv4Address::new(a, b, c, d)),
        dns_servers: Default::default(),
    })
}

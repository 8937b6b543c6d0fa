//! Configuration type definitions

use heapless::String;

use crate::supervisor::{liveness_threshold, TASK_KEEPALIVE_MS};

/// Maximum length of the log directory name
pub const MAX_DIR_LEN: usize = 16;

/// Widest supported chain, one `u64` row word
pub const MAX_DISPLAY_WIDTH: usize = 64;

/// Panel height in pixels (HUB12 P10)
pub const PANEL_HEIGHT: usize = 16;

/// Fastest row scan; leaves the scan ticker 50 µs per row
pub const MAX_SCAN_HZ: u32 = 20_000;

/// Configuration errors found by [`DeviceConfig::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Panel width or chain is zero, or the chain is wider than 64 columns
    InvalidGeometry,
    /// Scan rate of zero or above [`MAX_SCAN_HZ`]
    InvalidScanRate,
    /// Watchdog timeout too short for the task loops, or supervisor period
    /// not below the liveness threshold
    InvalidWatchdog,
    /// Logger would stay silent past the liveness threshold
    InvalidSamplePeriod,
}

/// IPv4 address with prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ipv4Cidr {
    pub address: [u8; 4],
    pub prefix_len: u8,
}

/// Network settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkConfig {
    /// Modbus/TCP listen port
    pub port: u16,
    /// Static address; `None` selects DHCP
    pub address: Option<Ipv4Cidr>,
    /// Default gateway for a static address
    pub gateway: Option<[u8; 4]>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: 502,
            address: None,
            gateway: None,
        }
    }
}

/// Number of multiplexed scan rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanLines {
    /// 1/4 scan, address lines A and B
    #[default]
    Four,
    /// 1/8 scan, address lines A, B and C
    Eight,
}

impl ScanLines {
    /// Rows cycled through by the scan
    pub const fn rows(self) -> usize {
        match self {
            ScanLines::Four => 4,
            ScanLines::Eight => 8,
        }
    }

    /// Address lines driven per row
    pub const fn address_lines(self) -> usize {
        match self {
            ScanLines::Four => 2,
            ScanLines::Eight => 3,
        }
    }
}

/// Order in which a row word is shifted out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Column 0 first
    #[default]
    MsbFirst,
    /// Last column first
    LsbFirst,
}

/// LED panel chain geometry and signalling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    /// Columns per panel
    pub width: u8,
    /// Panels in the chain
    pub chain: u8,
    /// Show the same image on every panel
    pub mirror: bool,
    /// Reverse panel order in the chain
    pub swap: bool,
    pub scan_lines: ScanLines,
    pub bit_order: BitOrder,
    /// Output enable blanks the panel when high
    pub oe_active_low: bool,
    /// Row scan frequency
    pub scan_hz: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 32,
            chain: 2,
            mirror: false,
            swap: false,
            scan_lines: ScanLines::Four,
            bit_order: BitOrder::MsbFirst,
            oe_active_low: true,
            scan_hz: 4000,
        }
    }
}

impl PanelConfig {
    /// Total columns across the chain
    pub fn total_width(&self) -> usize {
        self.width as usize * self.chain as usize
    }

    /// Columns the clock layout is drawn into before panel options apply
    pub fn render_width(&self) -> usize {
        if self.mirror {
            self.width as usize
        } else {
            self.total_width()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.total_width();
        if self.width == 0 || self.chain == 0 || total > MAX_DISPLAY_WIDTH {
            return Err(ConfigError::InvalidGeometry);
        }
        if self.scan_hz == 0 || self.scan_hz > MAX_SCAN_HZ {
            return Err(ConfigError::InvalidScanRate);
        }
        Ok(())
    }
}

/// Watchdog and supervisor timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogConfig {
    pub timeout_ms: u32,
    pub supervisor_period_ms: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 6000,
            supervisor_period_ms: 250,
        }
    }
}

/// Sample logger settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogConfig {
    /// Directory holding the daily CSV files
    pub dir: String<MAX_DIR_LEN>,
    /// Longest wait for an event before the logger loop runs anyway
    pub sample_period_ms: u32,
    /// Interval between file syncs
    pub sync_period_ms: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        let mut dir = String::new();
        let _ = dir.push_str("logs");
        Self {
            dir,
            sample_period_ms: 1000,
            sync_period_ms: 2000,
        }
    }
}

/// Complete device configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub network: NetworkConfig,
    pub panel: PanelConfig,
    pub watchdog: WatchdogConfig,
    pub log: LogConfig,
}

impl DeviceConfig {
    /// Check cross-field constraints the parser cannot see line by line
    ///
    /// Every task loop must stamp its liveness slot more often than the
    /// supervisor's stale threshold, or the watchdog resets the board even
    /// though nothing is wedged.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.panel.validate()?;

        let wd = &self.watchdog;
        let threshold = liveness_threshold(wd.timeout_ms);
        if wd.supervisor_period_ms == 0
            || wd.supervisor_period_ms >= threshold
            || TASK_KEEPALIVE_MS >= threshold
        {
            return Err(ConfigError::InvalidWatchdog);
        }

        let log = &self.log;
        if log.sample_period_ms == 0 || log.sample_period_ms >= threshold {
            return Err(ConfigError::InvalidSamplePeriod);
        }
        Ok(())
    }
}

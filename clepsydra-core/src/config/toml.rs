//! Simple TOML parser for device configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `device.toml`. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...)
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys

use super::types::{BitOrder, ConfigError, DeviceConfig, Ipv4Cidr, ScanLines};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is neither a header nor `key = value`
    InvalidLine,
    /// Key not known in its section
    UnknownKey,
    /// Invalid value type or out of range
    InvalidValue,
    /// String longer than its fixed capacity
    TooLong,
    /// Values parsed but the result is inconsistent
    Invalid(ConfigError),
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Network,
    Panel,
    Watchdog,
    Log,
}

/// Parse TOML configuration into a DeviceConfig
///
/// Keys that are absent keep their defaults. The result is validated before
/// it is returned.
pub fn parse_config(input: &str) -> Result<DeviceConfig, ParseError> {
    let mut config = DeviceConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            let header = strip_comment(line);
            if !header.ends_with(']') {
                return Err(ParseError::InvalidSection);
            }
            section = parse_section_header(header[1..header.len() - 1].trim())?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(&mut config, section, key, value)?;
    }

    config.validate().map_err(ParseError::Invalid)?;
    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header {
        "network" => Ok(Section::Network),
        "panel" => Ok(Section::Panel),
        "watchdog" => Ok(Section::Watchdog),
        "log" => Ok(Section::Log),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Cut a trailing `# comment`, ignoring `#` inside quoted strings
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (pos, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return line[..pos].trim(),
            _ => {}
        }
    }
    line
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = strip_comment(line[eq_pos + 1..].trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> Result<&str, ParseError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ParseError::InvalidValue)
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a dotted quad such as `192.168.1.20`
fn parse_ipv4(value: &str) -> Result<[u8; 4], ParseError> {
    let mut octets = [0u8; 4];
    let mut parts = value.split('.');
    for octet in octets.iter_mut() {
        *octet = parse_int(parts.next().ok_or(ParseError::InvalidValue)?)?;
    }
    if parts.next().is_some() {
        return Err(ParseError::InvalidValue);
    }
    Ok(octets)
}

/// Parse `a.b.c.d/prefix`
fn parse_cidr(value: &str) -> Result<Ipv4Cidr, ParseError> {
    let (address, prefix) = value.split_once('/').ok_or(ParseError::InvalidValue)?;
    let prefix_len: u8 = parse_int(prefix)?;
    if prefix_len > 32 {
        return Err(ParseError::InvalidValue);
    }
    Ok(Ipv4Cidr {
        address: parse_ipv4(address)?,
        prefix_len,
    })
}

fn parse_scan_lines(value: &str) -> Result<ScanLines, ParseError> {
    match parse_int::<u8>(value)? {
        4 => Ok(ScanLines::Four),
        8 => Ok(ScanLines::Eight),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    config: &mut DeviceConfig,
    section: Section,
    key: &str,
    value: &str,
) -> Result<(), ParseError> {
    match section {
        Section::Root => return Err(ParseError::UnknownKey),
        Section::Network => {
            let net = &mut config.network;
            match key {
                "port" => net.port = parse_int(value)?,
                "address" => net.address = Some(parse_cidr(parse_string(value)?)?),
                "gateway" => net.gateway = Some(parse_ipv4(parse_string(value)?)?),
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Panel => {
            let panel = &mut config.panel;
            match key {
                "width" => panel.width = parse_int(value)?,
                "chain" => panel.chain = parse_int(value)?,
                "mirror" => panel.mirror = parse_bool(value)?,
                "swap" => panel.swap = parse_bool(value)?,
                "scan_lines" => panel.scan_lines = parse_scan_lines(value)?,
                "msb_first" => {
                    panel.bit_order = if parse_bool(value)? {
                        BitOrder::MsbFirst
                    } else {
                        BitOrder::LsbFirst
                    }
                }
                "oe_active_low" => panel.oe_active_low = parse_bool(value)?,
                "scan_hz" => panel.scan_hz = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Watchdog => {
            let wd = &mut config.watchdog;
            match key {
                "timeout_ms" => wd.timeout_ms = parse_int(value)?,
                "supervisor_period_ms" => wd.supervisor_period_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Log => {
            let log = &mut config.log;
            match key {
                "dir" => {
                    log.dir.clear();
                    log.dir
                        .push_str(parse_string(value)?)
                        .map_err(|_| ParseError::TooLong)?;
                }
                "sample_period_ms" => log.sample_period_ms = parse_int(value)?,
                "sync_period_ms" => log.sync_period_ms = parse_int(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
        }
    }
    Ok(())
}

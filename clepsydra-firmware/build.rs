//! Build script for clepsydra-firmware
//!
//! - Passes the cortex-m-rt and defmt linker scripts (memory.x comes from
//!   embassy-stm32's `memory-x` feature)
//! - Validates device.toml at compile time

use std::fs;
use std::path::Path;

/// Widest chain the 64-bit row words can hold
const MAX_DISPLAY_WIDTH: i64 = 64;

/// Longest IWDG timeout on the 32 kHz LSI with the /256 prescaler
const MAX_WATCHDOG_MS: i64 = 32_000;

/// Fastest row scan the scan ticker can pace
const MAX_SCAN_HZ: i64 = 20_000;

/// Longest any firmware task waits before stamping its liveness slot
const TASK_KEEPALIVE_MS: i64 = 250;

fn main() {
    setup_linker();
    validate_config();
}

fn setup_linker() {
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a device.toml configuration file.           ║\n\
            ║  Please create one in the clepsydra-firmware directory.          ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in device.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_network(&config, &mut errors);
    validate_panel(&config, &mut errors);
    validate_watchdog(&config, &mut errors);
    validate_log(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in device.toml                     ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The boot parser accepts these sections and keys only
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    const KNOWN: &[(&str, &[&str])] = &[
        ("network", &["port", "address", "gateway"]),
        (
            "panel",
            &[
                "width",
                "chain",
                "mirror",
                "swap",
                "scan_lines",
                "msb_first",
                "oe_active_low",
                "scan_hz",
            ],
        ),
        ("watchdog", &["timeout_ms", "supervisor_period_ms"]),
        ("log", &["dir", "sample_period_ms", "sync_period_ms"]),
    ];

    let Some(root) = config.as_table() else {
        return;
    };

    for (name, section) in root {
        let Some((_, keys)) = KNOWN.iter().find(|(known, _)| known == name) else {
            errors.push(format!("unknown section [{}]", name));
            continue;
        };
        let Some(table) = section.as_table() else {
            errors.push(format!("[{}] must be a table", name));
            continue;
        };
        for key in table.keys() {
            if !keys.contains(&key.as_str()) {
                errors.push(format!("[{}] unknown key '{}'", name, key));
            }
        }
    }
}

fn get_int(config: &toml::Value, section: &str, key: &str) -> Option<i64> {
    config.get(section)?.get(key)?.as_integer()
}

fn check_range(
    config: &toml::Value,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    let Some(value) = config.get(section).and_then(|s| s.get(key)) else {
        return;
    };
    match value.as_integer() {
        Some(n) if range.contains(&n) => {}
        _ => errors.push(format!(
            "[{}] {} must be an integer in {}..={}",
            section,
            key,
            range.start(),
            range.end()
        )),
    }
}

fn check_bool(config: &toml::Value, section: &str, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = config.get(section).and_then(|s| s.get(key)) {
        if !value.is_bool() {
            errors.push(format!("[{}] {} must be true or false", section, key));
        }
    }
}

fn is_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok())
}

fn validate_network(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "network", "port", 1..=65535, errors);

    if let Some(address) = config.get("network").and_then(|n| n.get("address")) {
        let valid = address
            .as_str()
            .and_then(|s| s.split_once('/'))
            .map(|(ip, prefix)| {
                is_ipv4(ip) && prefix.parse::<u8>().map(|p| p <= 32).unwrap_or(false)
            })
            .unwrap_or(false);
        if !valid {
            errors.push("[network] address must look like \"a.b.c.d/prefix\"".to_string());
        }
    }

    if let Some(gateway) = config.get("network").and_then(|n| n.get("gateway")) {
        if !gateway.as_str().map(is_ipv4).unwrap_or(false) {
            errors.push("[network] gateway must look like \"a.b.c.d\"".to_string());
        }
    }
}

fn validate_panel(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "panel", "width", 1..=MAX_DISPLAY_WIDTH, errors);
    check_range(config, "panel", "chain", 1..=MAX_DISPLAY_WIDTH, errors);
    check_range(config, "panel", "scan_hz", 1..=MAX_SCAN_HZ, errors);
    for key in ["mirror", "swap", "msb_first", "oe_active_low"] {
        check_bool(config, "panel", key, errors);
    }

    if let Some(lines) = get_int(config, "panel", "scan_lines") {
        if lines != 4 && lines != 8 {
            errors.push("[panel] scan_lines must be 4 or 8".to_string());
        }
    }

    let width = get_int(config, "panel", "width").unwrap_or(32);
    let chain = get_int(config, "panel", "chain").unwrap_or(2);
    if width * chain > MAX_DISPLAY_WIDTH {
        errors.push(format!(
            "[panel] width * chain is {}, at most {} columns fit",
            width * chain,
            MAX_DISPLAY_WIDTH
        ));
    }
}

fn validate_watchdog(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "watchdog", "timeout_ms", 1..=MAX_WATCHDOG_MS, errors);
    check_range(config, "watchdog", "supervisor_period_ms", 1..=MAX_WATCHDOG_MS, errors);

    let threshold = liveness_threshold(config);
    let period = get_int(config, "watchdog", "supervisor_period_ms").unwrap_or(250);
    if period >= threshold {
        errors.push(format!(
            "[watchdog] supervisor_period_ms must be below the liveness threshold ({} ms)",
            threshold
        ));
    }
    if TASK_KEEPALIVE_MS >= threshold {
        errors.push(format!(
            "[watchdog] timeout_ms leaves a {} ms liveness threshold, tasks stamp every {} ms",
            threshold, TASK_KEEPALIVE_MS
        ));
    }
}

fn validate_log(config: &toml::Value, errors: &mut Vec<String>) {
    check_range(config, "log", "sample_period_ms", 1..=u32::MAX as i64, errors);
    check_range(config, "log", "sync_period_ms", 1..=u32::MAX as i64, errors);

    let threshold = liveness_threshold(config);
    let sample = get_int(config, "log", "sample_period_ms").unwrap_or(1000);
    if sample >= threshold {
        errors.push(format!(
            "[log] sample_period_ms must be below the liveness threshold ({} ms)",
            threshold
        ));
    }

    if let Some(dir) = config.get("log").and_then(|l| l.get("dir")) {
        match dir.as_str() {
            Some(s) if !s.is_empty() && s.len() <= 16 => {}
            _ => errors.push("[log] dir must be a string of 1 to 16 characters".to_string()),
        }
    }
}

/// Age at which the supervisor calls a task stale
fn liveness_threshold(config: &toml::Value) -> i64 {
    let timeout = get_int(config, "watchdog", "timeout_ms").unwrap_or(6000);
    if timeout > 2000 {
        timeout - 1000
    } else {
        timeout / 2
    }
}

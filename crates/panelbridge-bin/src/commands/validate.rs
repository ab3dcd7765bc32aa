// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::time::Duration;

use panelbridge_config::{BridgeConfig, load_config};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = cli
        .config
        .as_ref()
        .ok_or_else(|| BinError::usage("No configuration file given (use -c <FILE>)"))?;

    let config = load_config(config_path).map_err(|e| {
        BinError::from(e).with_context("Configuration validation failed")
    })?;

    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Port:            {}", config.serial.describe());
            println!("  Send spacing:    {:?}", config.link.send_spacing);
            println!("  Stall threshold: {}", config.link.stall_threshold);
            println!("  Reconnect delay: {:?}", config.link.reconnect_delay);
            println!(
                "  Queue bound:     {}",
                config
                    .link
                    .max_pending
                    .map_or_else(|| "unbounded".to_string(), |n| n.to_string())
            );
            println!("  Event marker:    {:?}", config.resolver.event_marker);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(&config)
                        .unwrap_or_else(|_| "(serialization error)".to_string())
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": config.summary(),
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            let rendered = serde_json::to_string_pretty(&output)
                .map_err(|e| BinError::runtime(format!("Failed to render output: {e}")))?;
            println!("{rendered}");
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::usage(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

/// Settings that are valid but probably not intended.
fn collect_warnings(config: &BridgeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.link.send_spacing.is_zero() {
        warnings.push("send_spacing is 0; the panel may drop back-to-back requests".to_string());
    }
    if config.link.reconnect_delay < Duration::from_secs(1) {
        warnings.push(format!(
            "reconnect_delay of {:?} retries the port very aggressively",
            config.link.reconnect_delay
        ));
    }
    if config.link.max_pending.is_none() {
        warnings.push("request queue is unbounded (set link.max_pending to bound it)".to_string());
    }
    if !config.serial.exclusive {
        warnings.push("exclusive port access is disabled".to_string());
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelbridge_serial::SerialSettings;

    #[test]
    fn test_warnings() {
        let mut config = BridgeConfig {
            serial: SerialSettings::new("/dev/ttyUSB0"),
            ..Default::default()
        };
        assert_eq!(collect_warnings(&config).len(), 1);

        config.link.max_pending = Some(16);
        assert!(collect_warnings(&config).is_empty());

        config.link.send_spacing = Duration::ZERO;
        config.link.reconnect_delay = Duration::from_millis(100);
        assert_eq!(collect_warnings(&config).len(), 2);
    }
}

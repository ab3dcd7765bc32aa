// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `ports` command.

use anyhow::Context;
use tokio_serial::{SerialPortInfo, SerialPortType};

use crate::cli::{Cli, OutputFormat, PortsArgs};
use crate::error::{BinError, BinResult};

/// Executes the `ports` command to list serial ports.
pub fn ports(_cli: &Cli, args: PortsArgs) -> BinResult<()> {
    let ports = tokio_serial::available_ports().context("Failed to enumerate serial ports")?;

    match args.format {
        OutputFormat::Text => {
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in &ports {
                println!("{:<24} {}", port.port_name, describe_type(&port.port_type));
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = ports.iter().map(port_json).collect();
            let rendered = serde_json::to_string_pretty(&entries)
                .map_err(|e| BinError::runtime(format!("Failed to render output: {e}")))?;
            println!("{rendered}");
        }
    }

    Ok(())
}

fn describe_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut text = format!("usb {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                text.push(' ');
                text.push_str(product);
            }
            if let Some(manufacturer) = &usb.manufacturer {
                text.push_str(&format!(" ({manufacturer})"));
            }
            text
        }
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

fn port_json(port: &SerialPortInfo) -> serde_json::Value {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => serde_json::json!({
            "name": port.port_name,
            "type": "usb",
            "vid": usb.vid,
            "pid": usb.pid,
            "serial_number": usb.serial_number,
            "manufacturer": usb.manufacturer,
            "product": usb.product,
        }),
        other => serde_json::json!({
            "name": port.port_name,
            "type": describe_type(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_non_usb_ports() {
        assert_eq!(describe_type(&SerialPortType::PciPort), "pci");
        assert_eq!(describe_type(&SerialPortType::Unknown), "unknown");
    }

    #[test]
    fn test_port_json_names_the_port() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::PciPort,
        };
        let value = port_json(&info);
        assert_eq!(value["name"], "/dev/ttyS0");
        assert_eq!(value["type"], "pci");
    }
}

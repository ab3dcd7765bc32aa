// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `panelbridge version`

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints crate versions and the build platform.
pub fn version(_cli: &Cli) -> BinResult<()> {
    let crates = [
        ("panelbridge-bin", crate::VERSION),
        ("panelbridge-core", panelbridge_core::VERSION),
        ("panelbridge-serial", panelbridge_serial::VERSION),
        ("panelbridge-config", panelbridge_config::VERSION),
    ];

    println!("panelbridge {}", crate::VERSION);
    println!();
    for (name, version) in crates {
        println!("  {name:<20}{version}");
    }
    println!();
    println!(
        "  built for {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    );
    println!("  PolyForm Noncommercial License 1.0.0, (c) 2025 Sylvex");
    Ok(())
}

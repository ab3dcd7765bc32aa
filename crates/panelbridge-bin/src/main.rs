// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! panelbridge - serial bridge to a line-oriented security panel controller.

use clap::Parser;

use panelbridge_bin::error::{report_error, report_error_and_exit};
use panelbridge_bin::{Cli, LogSettings, commands, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = LogSettings::from_cli(&cli);
    if let Err(error) = init_logging(&settings.level, settings.format) {
        report_error(&error);
    }

    if let Err(error) = commands::execute(cli).await {
        report_error_and_exit(error);
    }
}

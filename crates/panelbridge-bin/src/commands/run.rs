// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    info!("Starting panel bridge...");

    let mut builder = RuntimeBuilder::new()
        .port(args.port)
        .baud_rate(args.baud_rate)
        .forward_stdin(args.stdin)
        .status_interval(args.status_interval);
    if let Some(path) = &cli.config {
        builder = builder.config_path(path);
    }

    builder.build()?.run().await
}

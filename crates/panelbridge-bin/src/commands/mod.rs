// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! One module per subcommand. Only `run` is async; the others finish before
//! any port is opened.

mod ports;
mod run;
mod validate;
mod version;

pub use ports::ports;
pub use run::run;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Runs the subcommand selected on the command line.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        Commands::Ports(args) => ports::ports(&cli, args),
    }
}

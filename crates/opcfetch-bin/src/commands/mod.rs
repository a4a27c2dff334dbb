// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.

mod run;
mod validate;
mod version;

pub use run::run;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::config::FetchConfig;
use crate::error::{BinError, BinResult};

/// Executes the command selected on the command line.
///
/// `config` is the loaded configuration file; `version` does not need one.
pub async fn execute(cli: &Cli, config: Option<FetchConfig>) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Version => version::version(cli),
        Commands::Run(args) => run::run(cli, args, require(config)?).await,
        Commands::Validate(args) => validate::validate(cli, args, &require(config)?),
    }
}

fn require(config: Option<FetchConfig>) -> BinResult<FetchConfig> {
    config.ok_or_else(|| BinError::config("no configuration loaded"))
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! opcfetch binary entry point.

use opcfetch_bin::cli::{Cli, Commands};
use opcfetch_bin::config::load_config;
use opcfetch_bin::error::report_error_and_exit;
use opcfetch_bin::{commands, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let config = match cli.effective_command() {
        Commands::Version => None,
        _ => match load_config(&cli.config) {
            Ok(config) => Some(config),
            Err(e) => {
                init_logging(cli.effective_log_level(None), cli.effective_log_format(None));
                report_error_and_exit(e)
            }
        },
    };

    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    init_logging(
        cli.effective_log_level(logging.level.as_deref()),
        cli.effective_log_format(logging.format),
    );

    if let Err(e) = commands::execute(&cli, config).await {
        report_error_and_exit(e);
    }
}

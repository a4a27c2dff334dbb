// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints version and build information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("opcfetch - OPC UA node tree fetcher");
    println!();
    println!("Version Information:");
    println!("  opcfetch-bin:   {}", env!("CARGO_PKG_VERSION"));
    println!("  opcfetch-core:  {}", opcfetch_core::VERSION);
    println!("  opcfetch-opcua: {}", opcfetch_opcua::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:         {}", std::env::consts::ARCH);
    println!("  OS:             {}", std::env::consts::OS);
    println!();
    println!("Features:");
    println!(
        "  Real transport: {}",
        if cfg!(feature = "real-transport") { "enabled" } else { "disabled" }
    );
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use opcfetch_core::IdentifierConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::config::FetchConfig;
use crate::error::{BinError, BinResult};

/// Prints a summary of `config` and its warnings.
pub fn validate(cli: &Cli, args: ValidateArgs, config: &FetchConfig) -> BinResult<()> {
    let warnings = config.validate()?;
    let identifier = IdentifierConfig::from_properties(&config.properties)?;
    let output = config
        .output
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", cli.config.display());
            println!();
            println!("Summary:");
            println!("  Endpoint:   {}", config.opcua.endpoint);
            println!(
                "  Security:   {} / {}",
                config.opcua.security_mode, config.opcua.security_policy
            );
            println!("  Root node:  {identifier}");
            println!(
                "  Max depth:  {}",
                match identifier.max_depth() {
                    0 => "unlimited".to_string(),
                    n => n.to_string(),
                }
            );
            println!(
                "  Interval:   {}",
                humantime::format_duration(config.schedule.interval)
            );
            println!("  Output:     {output}");

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {warning}");
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(config)
                        .map_err(|e| BinError::runtime(e.to_string()))?
                );
            }
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "valid": true,
                "config_path": cli.config.display().to_string(),
                "summary": {
                    "endpoint": config.opcua.endpoint,
                    "security_mode": config.opcua.security_mode.to_string(),
                    "security_policy": config.opcua.security_policy.to_string(),
                    "node_id": identifier.raw_value(),
                    "node_id_type": identifier.kind().as_str(),
                    "namespace_index": identifier.namespace_index(),
                    "max_depth": identifier.max_depth(),
                    "interval": humantime::format_duration(config.schedule.interval).to_string(),
                    "output": output,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(config) } else { None },
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).map_err(|e| BinError::runtime(e.to_string()))?
            );
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcfetch-bin
//!
//! Command-line host for the fetch processor:
//!
//! - CLI argument parsing with clap
//! - Configuration file loading (YAML, TOML, JSON)
//! - Logging initialization
//! - JSON-lines record output
//! - Scheduled triggering with graceful shutdown
//!
//! ## Architecture
//!
//! ```text
//!            main.rs
//!               │
//!        ┌──────▼──────┐
//!        │   cli.rs    │
//!        └──────┬──────┘
//!               │
//!   ┌───────────┼───────────┐
//!   ▼           ▼           ▼
//! config     commands    logging
//!               │
//!        ┌──────▼──────┐
//!        │  runtime    │──▶ sink (JSON lines)
//!        └──────┬──────┘
//!               │
//!        ┌──────▼──────┐
//!        │  shutdown   │
//!        └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Trigger on the configured schedule (default command)
//! opcfetch -c plant.yaml
//!
//! # One trigger, records to stdout
//! opcfetch -c plant.yaml run --once
//!
//! # Validate configuration
//! opcfetch -c plant.yaml validate --show-config
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;
pub mod sink;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use config::{ConfigLoader, FetchConfig};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{FetchRuntime, RunSummary};
pub use shutdown::ShutdownCoordinator;
pub use sink::JsonLinesSink;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

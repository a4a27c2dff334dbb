// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use crate::cli::{Cli, RunArgs};
use crate::config::FetchConfig;
use crate::error::BinResult;

/// Connects to the configured server and triggers until shutdown.
#[cfg(feature = "real-transport")]
pub async fn run(_cli: &Cli, args: RunArgs, config: FetchConfig) -> BinResult<()> {
    use std::sync::Arc;

    use opcfetch_core::FetchProcessor;
    use opcfetch_opcua::{Connection, FileSecureContextProvider, RealOpcUaTransport, RetryConfig};
    use tracing::info;

    use crate::runtime::FetchRuntime;
    use crate::shutdown::ShutdownCoordinator;
    use crate::sink::JsonLinesSink;

    info!(endpoint = %config.opcua.endpoint, "Starting opcfetch");

    let connection = Connection::new(RealOpcUaTransport::new(config.opcua.clone()))
        .with_retry(RetryConfig::from_config(&config.opcua))
        .with_request_timeout(Some(config.opcua.request_timeout));
    let mut processor = FetchProcessor::new(connection);
    if !config.tls.is_empty() {
        // Credentials reach the transport through each schedule.
        processor = processor
            .with_secure_context_provider(Arc::new(FileSecureContextProvider::new(config.tls.clone())));
    }
    processor.on_schedule(&config.properties).await?;

    let sink = Arc::new(JsonLinesSink::open(&config.output).await?);
    let shutdown = ShutdownCoordinator::new();
    shutdown.listen_for_signals();

    let mut runtime = FetchRuntime::new(Arc::new(processor), sink, config.schedule)
        .once(args.once)
        .with_shutdown(shutdown);
    if let Some(interval) = args.interval {
        runtime = runtime.with_interval(interval);
    }

    let summary = runtime.run().await;
    info!(triggers = summary.triggers, completed = summary.completed, "opcfetch stopped");
    Ok(())
}

/// Without the OPC UA stack there is nothing to connect to.
#[cfg(not(feature = "real-transport"))]
pub async fn run(_cli: &Cli, _args: RunArgs, config: FetchConfig) -> BinResult<()> {
    Err(crate::error::BinError::init(format!(
        "cannot connect to {}: built without the `real-transport` feature",
        config.opcua.endpoint
    )))
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown.
//!
//! The run loop waits on [`ShutdownCoordinator::wait`] between triggers. OS
//! signals (SIGTERM, SIGINT, Ctrl-C) initiate shutdown through
//! [`ShutdownCoordinator::listen_for_signals`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Shared shutdown flag with wake-up.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    initiated: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Creates a coordinator that has not been triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initiates shutdown. Later calls are no-ops.
    pub fn initiate_shutdown(&self) {
        if self
            .inner
            .initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_shutdown_initiated() {
                return;
            }
            notified.await;
        }
    }

    /// Spawns a task that initiates shutdown on the first OS signal.
    pub fn listen_for_signals(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            coordinator.initiate_shutdown();
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Failed to register SIGTERM handler, only Ctrl-C stops the loop");
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM"),
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received SIGINT"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                sigterm.recv().await;
                info!("Received SIGTERM");
            }
        },
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_returns_after_initiate() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait().await })
        };

        tokio::task::yield_now().await;
        coordinator.initiate_shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(coordinator.is_shutdown_initiated());
    }

    #[tokio::test]
    async fn test_wait_after_initiate_is_immediate() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        tokio::time::timeout(Duration::from_millis(100), coordinator.wait())
            .await
            .unwrap();
    }
}

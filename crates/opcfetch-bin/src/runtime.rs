// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Trigger loop.
//!
//! ```text
//!  ┌──────────┐  completed / skipped   ┌────────────────┐
//!  │ trigger  │ ─────────────────────▶ │ sleep interval │ ──┐
//!  └──────────┘                        └────────────────┘   │
//!       │ backoff                      ┌────────────────┐   │
//!       └────────────────────────────▶ │ sleep yield    │ ──┤
//!                                      └────────────────┘   │
//!       ▲                                                   │
//!       └───────────────────── until shutdown ──────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use opcfetch_core::{FetchProcessor, HostScheduler, RecordSink, TriggerOutcome};
use opcfetch_opcua::OpcUaTransport;

use crate::config::ScheduleSettings;
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// YieldFlag
// =============================================================================

/// [`HostScheduler`] that remembers a yield until the loop consumes it.
#[derive(Debug, Default)]
pub struct YieldFlag {
    requested: AtomicBool,
}

impl YieldFlag {
    /// Returns and clears the pending yield.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

impl HostScheduler for YieldFlag {
    fn yield_processor(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}

// =============================================================================
// RunSummary
// =============================================================================

/// Trigger outcomes over the lifetime of a [`FetchRuntime`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Triggers issued.
    pub triggers: u64,
    /// Triggers that produced records.
    pub completed: u64,
    /// Triggers that backed off.
    pub backoffs: u64,
    /// Triggers skipped because another was running.
    pub skipped: u64,
    /// Variables found across all completed triggers.
    pub variables: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &TriggerOutcome) {
        self.triggers += 1;
        match outcome {
            TriggerOutcome::Completed(counters) => {
                self.completed += 1;
                self.variables += counters.variables_found;
            }
            TriggerOutcome::Backoff(_) => self.backoffs += 1,
            TriggerOutcome::Skipped => self.skipped += 1,
        }
    }
}

// =============================================================================
// FetchRuntime
// =============================================================================

/// Drives a configured [`FetchProcessor`] on a fixed schedule.
pub struct FetchRuntime<T: OpcUaTransport, S: RecordSink> {
    processor: Arc<FetchProcessor<T>>,
    sink: Arc<S>,
    schedule: ScheduleSettings,
    scheduler: YieldFlag,
    shutdown: ShutdownCoordinator,
    once: bool,
}

impl<T: OpcUaTransport, S: RecordSink> FetchRuntime<T, S> {
    /// Creates a runtime.
    pub fn new(processor: Arc<FetchProcessor<T>>, sink: Arc<S>, schedule: ScheduleSettings) -> Self {
        Self {
            processor,
            sink,
            schedule,
            scheduler: YieldFlag::default(),
            shutdown: ShutdownCoordinator::new(),
            once: false,
        }
    }

    /// Stops after the first trigger.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Uses `shutdown` to stop the loop.
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Overrides the trigger interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.schedule.interval = interval;
        self
    }

    /// Delay before the next trigger.
    fn next_delay(&self) -> Duration {
        if self.scheduler.take() {
            self.schedule.yield_duration
        } else {
            self.schedule.interval
        }
    }

    /// Triggers until shutdown, then closes the session.
    pub async fn run(self) -> RunSummary {
        info!(
            interval = %humantime::format_duration(self.schedule.interval),
            yield_duration = %humantime::format_duration(self.schedule.yield_duration),
            once = self.once,
            "Starting trigger loop"
        );

        let mut summary = RunSummary::default();
        while !self.shutdown.is_shutdown_initiated() {
            let outcome = self
                .processor
                .on_trigger(self.sink.as_ref(), &self.scheduler)
                .await;
            summary.record(&outcome);
            debug!(?outcome, "Trigger finished");

            if self.once {
                break;
            }

            let delay = self.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.wait() => break,
            }
        }

        self.processor.shutdown().await;
        info!(
            triggers = summary.triggers,
            completed = summary.completed,
            backoffs = summary.backoffs,
            variables = summary.variables,
            "Trigger loop stopped"
        );
        summary
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::JsonLinesSink;
    use opcfetch_opcua::{Connection, RetryConfig};
    use opcfetch_tests::prelude::*;

    async fn processor(transport: &MockTransport) -> Arc<FetchProcessor<MockTransport>> {
        let processor = FetchProcessor::new(
            Connection::new(transport.clone()).with_retry(RetryConfig::no_retry()),
        );
        processor
            .on_schedule(&PropertyFixtures::int(58, 2))
            .await
            .unwrap();
        Arc::new(processor)
    }

    #[test]
    fn test_yield_flag_is_consumed() {
        let flag = YieldFlag::default();
        assert!(!flag.take());
        flag.yield_processor();
        assert!(flag.take());
        assert!(!flag.take());
    }

    #[tokio::test]
    async fn test_run_once() {
        let transport = AddressSpaceFixtures::plant();
        let sink = Arc::new(JsonLinesSink::new(Vec::new(), true));

        let summary = FetchRuntime::new(processor(&transport).await, Arc::clone(&sink), ScheduleSettings::default())
            .once(true)
            .run()
            .await;

        assert_eq!(summary.triggers, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.variables, 5);
        assert_eq!(sink.written(), 5);
        assert!(!OpcUaTransport::is_connected(&transport));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_uses_yield_duration() {
        let transport = AddressSpaceFixtures::objects_only();
        let sink = Arc::new(JsonLinesSink::new(Vec::new(), true));
        let shutdown = ShutdownCoordinator::new();
        let schedule = ScheduleSettings {
            interval: Duration::from_secs(1),
            yield_duration: Duration::from_secs(60),
        };

        let runtime = FetchRuntime::new(processor(&transport).await, sink, schedule)
            .with_shutdown(shutdown.clone());
        let handle = tokio::spawn(runtime.run());

        // One backoff, then the loop sleeps for the yield duration rather
        // than the interval.
        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown.initiate_shutdown();
        let summary = handle.await.unwrap();

        assert_eq!(summary.triggers, 1);
        assert_eq!(summary.backoffs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_loop_until_shutdown() {
        let transport = AddressSpaceFixtures::plant();
        let sink = Arc::new(JsonLinesSink::new(Vec::new(), true));
        let shutdown = ShutdownCoordinator::new();
        let schedule = ScheduleSettings {
            interval: Duration::from_secs(10),
            yield_duration: Duration::from_secs(60),
        };

        let runtime = FetchRuntime::new(processor(&transport).await, Arc::clone(&sink), schedule)
            .with_shutdown(shutdown.clone());
        let handle = tokio::spawn(runtime.run());

        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown.initiate_shutdown();
        let summary = handle.await.unwrap();

        assert_eq!(summary.triggers, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(sink.written(), 15);
    }
}

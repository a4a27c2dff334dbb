// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Trigger controller.
//!
//! # State machine
//!
//! ```text
//!                 on_schedule ok
//!  Unconfigured ────────────────▶ Configured ──on_trigger──▶ Running
//!       ▲                             ▲                         │
//!       │ on_schedule err             │ on_schedule ok          ├──▶ Idle
//!       └─────────────────────────────┴─────────────────────────┴──▶ Backoff
//! ```
//!
//! At most one trigger runs at a time. A trigger that finds another one in
//! progress returns [`TriggerOutcome::Skipped`] without touching anything.

use std::fmt;
use std::sync::Arc;

use opcfetch_opcua::{
    Connection, OpcUaTransport, SecureContextProvider, SecureTransportContext,
};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, FetchResult};
use crate::extraction::{ExtractionVisitor, RunCounters};
use crate::host::{HostScheduler, RecordSink};
use crate::identifier::IdentifierConfig;
use crate::path_cache::{PathResolutionCache, ResolvedStartSet};
use crate::properties::FetchProperties;

// =============================================================================
// ProcessorState
// =============================================================================

/// Lifecycle state of a [`FetchProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorState {
    /// No valid configuration; triggers back off.
    #[default]
    Unconfigured,
    /// Configured, no trigger has completed since.
    Configured,
    /// A trigger is in progress.
    Running,
    /// The last trigger completed normally.
    Idle,
    /// The last trigger backed off.
    Backoff,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "Unconfigured"),
            Self::Configured => write!(f, "Configured"),
            Self::Running => write!(f, "Running"),
            Self::Idle => write!(f, "Idle"),
            Self::Backoff => write!(f, "Backoff"),
        }
    }
}

// =============================================================================
// TriggerOutcome
// =============================================================================

/// Why a trigger backed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffReason {
    /// The processor has no valid configuration.
    NotConfigured,
    /// No session could be established.
    Connectivity,
    /// The browse path could not be translated.
    Translation,
    /// The walk visited no nodes at all.
    NoNodesFound,
    /// The walk visited nodes but none were variables.
    NoVariablesFound,
}

impl fmt::Display for BackoffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "not configured"),
            Self::Connectivity => write!(f, "connectivity"),
            Self::Translation => write!(f, "translation"),
            Self::NoNodesFound => write!(f, "no nodes found"),
            Self::NoVariablesFound => write!(f, "no variables found"),
        }
    }
}

/// Result of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TriggerOutcome {
    /// Another trigger was in progress; nothing was done.
    Skipped,
    /// The walk produced at least one variable.
    Completed(RunCounters),
    /// The host was asked to yield.
    Backoff(BackoffReason),
}

impl TriggerOutcome {
    /// Returns `true` if the host was asked to yield.
    pub fn is_backoff(&self) -> bool {
        matches!(self, Self::Backoff(_))
    }
}

// =============================================================================
// FetchProcessor
// =============================================================================

/// State guarded by the single-flight lock.
#[derive(Debug, Default)]
struct RunState {
    cache: PathResolutionCache,
    counters: RunCounters,
}

/// Configuration produced by the last successful schedule.
#[derive(Debug, Clone)]
struct Schedule {
    identifier: Arc<IdentifierConfig>,
    secure_context: Option<SecureTransportContext>,
}

/// The fetch processor.
///
/// The host calls [`on_schedule`](Self::on_schedule) whenever properties
/// change and [`on_trigger`](Self::on_trigger) on its own cadence.
pub struct FetchProcessor<T: OpcUaTransport> {
    connection: Connection<T>,
    secure_provider: Option<Arc<dyn SecureContextProvider>>,
    state: RwLock<ProcessorState>,
    schedule: RwLock<Option<Schedule>>,
    last_counters: RwLock<RunCounters>,
    run: Mutex<RunState>,
}

impl<T: OpcUaTransport> FetchProcessor<T> {
    /// Creates an unconfigured processor over `connection`.
    pub fn new(connection: Connection<T>) -> Self {
        Self {
            connection,
            secure_provider: None,
            state: RwLock::new(ProcessorState::Unconfigured),
            schedule: RwLock::new(None),
            last_counters: RwLock::new(RunCounters::default()),
            run: Mutex::new(RunState::default()),
        }
    }

    /// Obtains a secure transport context on every schedule and hands it to
    /// the transport.
    pub fn with_secure_context_provider(mut self, provider: Arc<dyn SecureContextProvider>) -> Self {
        self.secure_provider = Some(provider);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessorState {
        *self.state.read()
    }

    /// Identifier of the current configuration.
    pub fn identifier(&self) -> Option<Arc<IdentifierConfig>> {
        self.schedule.read().as_ref().map(|s| Arc::clone(&s.identifier))
    }

    /// Secure context obtained at the last schedule.
    pub fn secure_context(&self) -> Option<SecureTransportContext> {
        self.schedule.read().as_ref().and_then(|s| s.secure_context.clone())
    }

    /// Counters of the last trigger that reached the walk.
    pub fn last_counters(&self) -> RunCounters {
        *self.last_counters.read()
    }

    fn set_state(&self, state: ProcessorState) {
        *self.state.write() = state;
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Applies new properties.
    ///
    /// The path cache is cleared first, whatever the outcome. On failure the
    /// processor becomes [`ProcessorState::Unconfigured`] and every trigger
    /// backs off until a later schedule succeeds.
    ///
    /// Waits for a trigger in progress to finish, then holds the run lock
    /// until the new configuration is in place. Triggers arriving meanwhile
    /// are skipped.
    pub async fn on_schedule(&self, props: &FetchProperties) -> FetchResult<()> {
        let mut run = self.run.lock().await;
        run.cache.invalidate();

        match self.build_schedule(props).await {
            Ok(schedule) => {
                if self.secure_provider.is_some() {
                    self.connection
                        .apply_secure_context(schedule.secure_context.clone())
                        .await;
                }
                info!(identifier = %schedule.identifier, max_depth = schedule.identifier.max_depth(), "Processor configured");
                *self.schedule.write() = Some(schedule);
                self.set_state(ProcessorState::Configured);
                Ok(())
            }
            Err(e) => {
                e.log("schedule");
                *self.schedule.write() = None;
                self.set_state(ProcessorState::Unconfigured);
                Err(e)
            }
        }
    }

    async fn build_schedule(&self, props: &FetchProperties) -> FetchResult<Schedule> {
        let secure_context = match &self.secure_provider {
            Some(provider) => Some(provider.secure_context().await.map_err(|e| {
                FetchError::configuration("Secure context", e.to_string())
            })?),
            None => None,
        };
        let identifier = Arc::new(IdentifierConfig::from_properties(props)?);
        Ok(Schedule {
            identifier,
            secure_context,
        })
    }

    // =========================================================================
    // Triggering
    // =========================================================================

    /// Runs one fetch.
    ///
    /// Every [`TriggerOutcome::Backoff`] has called
    /// [`HostScheduler::yield_processor`] exactly once.
    pub async fn on_trigger<S, H>(&self, sink: &S, scheduler: &H) -> TriggerOutcome
    where
        S: RecordSink + ?Sized,
        H: HostScheduler + ?Sized,
    {
        if self.identifier().is_none() {
            return self.not_configured(scheduler);
        }

        let Ok(mut run) = self.run.try_lock() else {
            warn!("Processor was triggered before the previous listing finished, configuration should be revised");
            return TriggerOutcome::Skipped;
        };

        // A schedule may have completed between the check and the lock.
        let Some(identifier) = self.identifier() else {
            return self.not_configured(scheduler);
        };

        self.set_state(ProcessorState::Running);
        let outcome = self.run_locked(&mut run, &identifier, sink).await;
        if let TriggerOutcome::Backoff(reason) = outcome {
            debug!(reason = %reason, "Yielding");
            scheduler.yield_processor();
        }
        self.set_state(match outcome {
            TriggerOutcome::Backoff(_) => ProcessorState::Backoff,
            _ => ProcessorState::Idle,
        });
        outcome
    }

    fn not_configured<H: HostScheduler + ?Sized>(&self, scheduler: &H) -> TriggerOutcome {
        error!("This processor was not configured properly, yielding. Check previous errors in the logs");
        scheduler.yield_processor();
        TriggerOutcome::Backoff(BackoffReason::NotConfigured)
    }

    async fn run_locked<S>(
        &self,
        run: &mut RunState,
        identifier: &IdentifierConfig,
        sink: &S,
    ) -> TriggerOutcome
    where
        S: RecordSink + ?Sized,
    {
        if !self.connection.reconnect().await {
            let endpoint = self.connection.transport().lock().await.endpoint().to_string();
            FetchError::connectivity(endpoint).log("trigger");
            return TriggerOutcome::Backoff(BackoffReason::Connectivity);
        }

        run.counters = RunCounters::default();

        let start_set = match identifier.start_node() {
            Some(node_id) => ResolvedStartSet::single(node_id),
            None => match run.cache.resolve(&self.connection, identifier.raw_value()).await {
                Ok(set) => set,
                Err(e) => {
                    warn!(error = %e, "No records will be generated");
                    return TriggerOutcome::Backoff(BackoffReason::Translation);
                }
            },
        };

        let mut visitor = ExtractionVisitor::new(&self.connection, sink, &mut run.counters);
        for root in &start_set.node_ids {
            if let Err(e) = self
                .connection
                .traverse(root, &mut visitor, &start_set.origin_path, identifier.max_depth())
                .await
            {
                e.log(&format!("traversal of {root}"));
                if e.is_connection_loss() {
                    break;
                }
            }
        }
        let emitted = visitor.emitted();
        let counters = run.counters;
        *self.last_counters.write() = counters;

        debug!(
            nodes = counters.nodes_found,
            variables = counters.variables_found,
            success = emitted.success,
            failure = emitted.failure,
            dropped = emitted.dropped,
            "Trigger finished"
        );

        if counters.nodes_found == 0 {
            warn!("Connected to OPC server, but no nodes were found. Configuration might be incorrect! Yielding...");
            TriggerOutcome::Backoff(BackoffReason::NoNodesFound)
        } else if counters.variables_found == 0 {
            warn!("Found no variables when traversing the specified node. No records are generated. Yielding...");
            TriggerOutcome::Backoff(BackoffReason::NoVariablesFound)
        } else {
            TriggerOutcome::Completed(counters)
        }
    }

    /// Closes the session.
    pub async fn shutdown(&self) {
        if let Err(e) = self.connection.disconnect().await {
            e.log("shutdown");
        }
    }
}

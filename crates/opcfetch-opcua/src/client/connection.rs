// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Long-lived connection handle used by the fetch processor.
//!
//! [`Connection`] wraps a shared [`OpcUaTransport`] and exposes the four
//! operations the processor needs: reconnect, browse path translation,
//! subtree traversal and node data retrieval. Reconnection follows a
//! [`RetryConfig`]; every other operation is a single attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::browse::{join_path, BrowsePath, NodeTraverser, ReferenceVisitor, TraversalStats};
use crate::client::node_data::{attribute_names, NodeAttributes, NodeData};
use crate::client::transport::{OpcUaTransport, ReferenceDescription, TranslateResult};
use crate::error::{with_deadline, ConnectionError, OpcUaError, OpcUaResult, TimeoutError};
use crate::security::SecureTransportContext;
use crate::types::{NodeId, OpcUaConfig};

// =============================================================================
// Retry Configuration
// =============================================================================

/// Delay growth between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Same delay every attempt.
    Fixed,
    /// `base * (attempt + 1)`.
    Linear,
    /// `base * 2^attempt`.
    #[default]
    Exponential,
}

impl RetryStrategy {
    fn delay(&self, base: Duration, attempt: u32) -> Duration {
        match self {
            Self::Fixed => base,
            Self::Linear => base.saturating_mul(attempt.saturating_add(1)),
            Self::Exponential => base.saturating_mul(2u32.saturating_pow(attempt.min(16))),
        }
    }
}

/// Reconnect retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    #[serde(with = "crate::types::humantime_serde")]
    pub base_delay: Duration,

    /// Upper bound for any single delay.
    #[serde(with = "crate::types::humantime_serde")]
    pub max_delay: Duration,

    /// Delay growth.
    pub strategy: RetryStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            strategy: RetryStrategy::Exponential,
        }
    }
}

impl RetryConfig {
    /// Creates a policy with `max_retries` and default delays.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Derives the policy from connection settings.
    pub fn from_config(config: &OpcUaConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_delay,
            ..Default::default()
        }
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the strategy.
    pub fn with_strategy(mut self, strategy: RetryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.strategy
            .delay(self.base_delay, attempt)
            .min(self.max_delay)
    }
}

// =============================================================================
// ConnectionStats
// =============================================================================

/// Lifetime counters of a [`Connection`].
#[derive(Debug, Default)]
pub struct ConnectionStats {
    connects: AtomicU64,
    connect_failures: AtomicU64,
    translations: AtomicU64,
    traversals: AtomicU64,
    node_reads: AtomicU64,
    node_read_failures: AtomicU64,
}

impl ConnectionStats {
    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy.
    pub fn snapshot(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            translations: self.translations.load(Ordering::Relaxed),
            traversals: self.traversals.load(Ordering::Relaxed),
            node_reads: self.node_reads.load(Ordering::Relaxed),
            node_read_failures: self.node_read_failures.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`ConnectionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatsSnapshot {
    /// Successful (re)connects.
    pub connects: u64,
    /// Reconnect calls that gave up.
    pub connect_failures: u64,
    /// Browse path translations issued.
    pub translations: u64,
    /// Traversals started.
    pub traversals: u64,
    /// Node data reads issued.
    pub node_reads: u64,
    /// Node data reads that failed.
    pub node_read_failures: u64,
}

// =============================================================================
// Connection
// =============================================================================

/// Shared session handle.
///
/// Cloning is cheap; clones share the transport and the statistics.
pub struct Connection<T: OpcUaTransport> {
    transport: Arc<Mutex<T>>,
    traverser: NodeTraverser<T>,
    retry: RetryConfig,
    request_timeout: Option<Duration>,
    stats: Arc<ConnectionStats>,
}

impl<T: OpcUaTransport> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            traverser: self.traverser.clone(),
            retry: self.retry.clone(),
            request_timeout: self.request_timeout,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T: OpcUaTransport> Connection<T> {
    /// Wraps `transport` with the default retry policy.
    pub fn new(transport: T) -> Self {
        Self::with_shared(Arc::new(Mutex::new(transport)), RetryConfig::default())
    }

    /// Wraps an already shared transport.
    pub fn with_shared(transport: Arc<Mutex<T>>, retry: RetryConfig) -> Self {
        Self {
            traverser: NodeTraverser::new(Arc::clone(&transport)),
            transport,
            retry,
            request_timeout: None,
            stats: Arc::new(ConnectionStats::default()),
        }
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Bounds every connect, translate, browse and read call. `None`, the
    /// default, waits as long as the transport does.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self.traverser = self.traverser.with_request_timeout(timeout);
        self
    }

    /// Returns the shared transport.
    pub fn transport(&self) -> &Arc<Mutex<T>> {
        &self.transport
    }

    /// Returns the connection statistics.
    pub fn stats(&self) -> ConnectionStatsSnapshot {
        self.stats.snapshot()
    }

    /// Ensures the session is usable.
    ///
    /// Returns `true` immediately when already connected. Otherwise attempts
    /// to reconnect according to the retry policy and returns whether a
    /// session is available afterwards. Failures are logged, never returned.
    pub async fn reconnect(&self) -> bool {
        let mut transport = self.transport.lock().await;
        if transport.is_connected() {
            return true;
        }

        let endpoint = transport.endpoint().to_string();
        let mut attempt = 0u32;
        loop {
            let attempt_result =
                with_deadline(self.request_timeout, TimeoutError::connect, transport.reconnect()).await;
            match attempt_result {
                Ok(()) => {
                    ConnectionStats::incr(&self.stats.connects);
                    info!(endpoint = %endpoint, attempts = attempt + 1, "Connected to OPC UA server");
                    return true;
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        endpoint = %endpoint,
                        attempt = attempt + 1,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying OPC UA connect"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    ConnectionStats::incr(&self.stats.connect_failures);
                    e.log("reconnect");
                    if e.is_retryable() {
                        OpcUaError::connection(ConnectionError::reconnect_exhausted(
                            &endpoint,
                            attempt + 1,
                        ))
                        .log("reconnect");
                    }
                    return false;
                }
            }
        }
    }

    /// Closes the session.
    pub async fn disconnect(&self) -> OpcUaResult<()> {
        let mut transport = self.transport.lock().await;
        transport.disconnect().await
    }

    /// Hands new credentials to the transport.
    ///
    /// When they changed, an open session is closed so the next
    /// [`reconnect`](Self::reconnect) uses them.
    pub async fn apply_secure_context(&self, context: Option<SecureTransportContext>) {
        let mut transport = self.transport.lock().await;
        if transport.set_secure_context(context) && transport.is_connected() {
            info!(endpoint = %transport.endpoint(), "Credentials changed, closing session");
            if let Err(e) = transport.disconnect().await {
                e.log("credential change");
            }
        }
    }

    /// Translates a slash-delimited browse path into node ids.
    ///
    /// A server-side rejection comes back as a non-Good
    /// [`TranslateResult::status`]; `Err` means the path was malformed or the
    /// transport failed.
    pub async fn translate_path_to_ids(&self, path: &str) -> OpcUaResult<TranslateResult> {
        let browse_path = BrowsePath::parse(path)?;
        ConnectionStats::incr(&self.stats.translations);

        let transport = self.transport.lock().await;
        let result = with_deadline(
            self.request_timeout,
            TimeoutError::translate,
            transport.translate_browse_path(&browse_path),
        )
        .await?;
        debug!(
            path = %browse_path,
            status = %result.status,
            targets = result.targets.len(),
            "Translated browse path"
        );
        Ok(result)
    }

    /// Walks the subtree below `root`. See [`NodeTraverser::traverse`].
    pub async fn traverse<V>(
        &self,
        root: &NodeId,
        visitor: &mut V,
        origin_path: &str,
        max_depth: u64,
    ) -> OpcUaResult<TraversalStats>
    where
        V: ReferenceVisitor + ?Sized,
    {
        ConnectionStats::incr(&self.stats.traversals);
        self.traverser
            .traverse(root, visitor, origin_path, max_depth)
            .await
    }

    /// Reads the value of a variable node and assembles its attributes.
    ///
    /// `path` is the accumulated path the traversal handed out for
    /// `reference`. A read that completes with a non-Good status yields node
    /// data without a value.
    pub async fn get_node_data(
        &self,
        reference: &ReferenceDescription,
        path: &str,
    ) -> OpcUaResult<NodeData> {
        ConnectionStats::incr(&self.stats.node_reads);
        let read = {
            let transport = self.transport.lock().await;
            with_deadline(
                self.request_timeout,
                TimeoutError::read,
                transport.read_value(&reference.node_id),
            )
            .await
        };
        let read = match read {
            Ok(read) => read,
            Err(e) => {
                ConnectionStats::incr(&self.stats.node_read_failures);
                return Err(e);
            }
        };

        let mut attributes = NodeAttributes::new();
        attributes.insert(attribute_names::NODE_ID, reference.node_id.identifier.value_text());
        attributes.insert(attribute_names::NODE_ID_TYPE, reference.node_id.identifier.kind_name());
        attributes.insert(attribute_names::BROWSE_NAME, reference.browse_name.name.as_str());
        attributes.insert(
            attribute_names::FULL_PATH,
            join_path(path, &reference.browse_name.name),
        );

        if !read.is_good() {
            trace!(node_id = %reference.node_id, status = %read.status, "Value not readable");
            return Ok(NodeData {
                attributes,
                value: None,
                data_type: None,
            });
        }

        if let Some(ts) = read.source_timestamp {
            attributes.insert(attribute_names::SOURCE_TIMESTAMP, ts.to_rfc3339());
        }

        let value = read.value.filter(|v| !v.is_null());
        let data_type = value.as_ref().map(|v| v.data_type());
        if let Some(data_type) = data_type {
            attributes.insert(attribute_names::TYPE_NAME, data_type.name());
            if let Some(size) = data_type.byte_size() {
                attributes.insert(attribute_names::DATA_SIZE, size.to_string());
            }
        }

        Ok(NodeData {
            attributes,
            value,
            data_type,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delays() {
        let retry = RetryConfig::new(5)
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(500));
        assert_eq!(retry.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(retry.delay_for_attempt(3), Duration::from_millis(500));

        let linear = retry.clone().with_strategy(RetryStrategy::Linear);
        assert_eq!(linear.delay_for_attempt(2), Duration::from_millis(300));

        let fixed = retry.with_strategy(RetryStrategy::Fixed);
        assert_eq!(fixed.delay_for_attempt(4), Duration::from_millis(100));
    }

    #[test]
    fn test_retry_from_config() {
        let config = OpcUaConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .max_retries(7)
            .retry_delay(Duration::from_secs(2))
            .build()
            .unwrap();
        let retry = RetryConfig::from_config(&config);
        assert_eq!(retry.max_retries, 7);
        assert_eq!(retry.base_delay, Duration::from_secs(2));
        assert_eq!(RetryConfig::no_retry().max_retries, 0);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = ConnectionStats::default();
        ConnectionStats::incr(&stats.node_reads);
        ConnectionStats::incr(&stats.node_reads);
        ConnectionStats::incr(&stats.connects);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.node_reads, 2);
        assert_eq!(snapshot.connects, 1);
        assert_eq!(snapshot.translations, 0);
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Test doubles for the transport and the host interfaces.
//!
//! ## Design Principles
//!
//! - Clones share state, so a test keeps a handle after moving one into a
//!   `Connection`
//! - Every collaborator call is counted
//! - Failures are injected per node

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use opcfetch_core::{
    EmissionStage, FetchError, FetchResult, HostScheduler, OutputRecord, RecordSink, Relationship,
};
use opcfetch_opcua::{
    BrowseError, BrowsePath, ConnectionError, NodeClass, NodeId, OpcUaError, OpcUaResult,
    OpcUaTransport, OpcUaValue, OperationError, QualifiedName, ReadResult, ReferenceDescription,
    SecureContextProvider, SecureTransportContext, StatusCode, TranslateResult, TransportState,
};

// =============================================================================
// MockTransport
// =============================================================================

/// Per-service call counters of a [`MockTransport`].
#[derive(Debug, Default)]
pub struct CallCounters {
    /// `connect` / `reconnect` calls.
    pub connects: AtomicU64,
    /// `translate_browse_path` calls.
    pub translations: AtomicU64,
    /// `browse` calls.
    pub browses: AtomicU64,
    /// `read_value` calls.
    pub reads: AtomicU64,
}

impl CallCounters {
    /// Sum of all service calls.
    pub fn total(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
            + self.translations.load(Ordering::SeqCst)
            + self.browses.load(Ordering::SeqCst)
            + self.reads.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct MockNode {
    reference: ReferenceDescription,
    value: Option<OpcUaValue>,
    status: StatusCode,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

#[derive(Debug, Default)]
struct MockState {
    nodes: Mutex<HashMap<NodeId, MockNode>>,
    translations: Mutex<HashMap<String, TranslateResult>>,
    browse_failures: Mutex<HashSet<NodeId>>,
    read_failures: Mutex<HashSet<NodeId>>,
    session_loss_on_browse: Mutex<HashSet<NodeId>>,
    connected: AtomicBool,
    connect_failures: AtomicU32,
    browse_gate: Mutex<Option<Arc<Gate>>>,
    secure_context: Mutex<Option<SecureTransportContext>>,
    calls: CallCounters,
}

/// In-memory address space implementing [`OpcUaTransport`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    endpoint: String,
    state: Arc<MockState>,
    source_timestamp: DateTime<Utc>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a connected transport with an empty address space.
    pub fn new() -> Self {
        let transport = Self {
            endpoint: "opc.tcp://mock:4840".to_string(),
            state: Arc::new(MockState::default()),
            source_timestamp: fixed_timestamp(),
        };
        transport.state.connected.store(true, Ordering::SeqCst);
        transport
    }

    /// Creates a transport that starts disconnected.
    pub fn disconnected() -> Self {
        let transport = Self::new();
        transport.set_connected(false);
        transport
    }

    // =========================================================================
    // Address Space
    // =========================================================================

    fn insert(&self, parent: Option<&NodeId>, reference: ReferenceDescription, value: Option<OpcUaValue>) {
        let node_id = reference.node_id.clone();
        let mut nodes = self.state.nodes.lock();
        nodes.entry(node_id.clone()).or_insert(MockNode {
            reference,
            value,
            status: StatusCode::GOOD,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            if let Some(parent) = nodes.get_mut(parent) {
                parent.children.push(node_id);
            }
        }
    }

    /// Registers a browsable node with no parent.
    pub fn add_root(&self, node_id: NodeId, name: &str) -> &Self {
        self.insert(None, ReferenceDescription::new(node_id, name, NodeClass::Object), None);
        self
    }

    /// Adds an object node below `parent`.
    pub fn add_object(&self, parent: &NodeId, node_id: NodeId, name: &str) -> &Self {
        self.insert(
            Some(parent),
            ReferenceDescription::new(node_id, QualifiedName::new(2, name), NodeClass::Object),
            None,
        );
        self
    }

    /// Adds a variable node below `parent`.
    pub fn add_variable(&self, parent: &NodeId, node_id: NodeId, name: &str, value: OpcUaValue) -> &Self {
        self.insert(
            Some(parent),
            ReferenceDescription::new(node_id, QualifiedName::new(2, name), NodeClass::Variable),
            Some(value),
        );
        self
    }

    /// Adds a node of any class below `parent`.
    pub fn add_node(&self, parent: &NodeId, node_id: NodeId, name: &str, class: NodeClass) -> &Self {
        self.insert(
            Some(parent),
            ReferenceDescription::new(node_id, QualifiedName::new(2, name), class),
            None,
        );
        self
    }

    /// Adds an existing node as another child of `parent`.
    pub fn link(&self, parent: &NodeId, child: &NodeId) -> &Self {
        if let Some(parent) = self.state.nodes.lock().get_mut(parent) {
            parent.children.push(child.clone());
        }
        self
    }

    /// Makes reads of `node_id` complete with `status`.
    pub fn set_read_status(&self, node_id: &NodeId, status: StatusCode) -> &Self {
        if let Some(node) = self.state.nodes.lock().get_mut(node_id) {
            node.status = status;
        }
        self
    }

    /// Sets the answer for a browse path.
    pub fn set_translation(&self, path: &str, result: TranslateResult) -> &Self {
        let key = BrowsePath::parse(path).map(|p| p.to_string()).unwrap_or_default();
        self.state.translations.lock().insert(key, result);
        self
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    /// Makes browses of `node_id` fail.
    pub fn fail_browse(&self, node_id: &NodeId) -> &Self {
        self.state.browse_failures.lock().insert(node_id.clone());
        self
    }

    /// Makes browses of `node_id` report a lost session.
    pub fn lose_session_on_browse(&self, node_id: &NodeId) -> &Self {
        self.state.session_loss_on_browse.lock().insert(node_id.clone());
        self
    }

    /// Makes reads of `node_id` fail.
    pub fn fail_read(&self, node_id: &NodeId) -> &Self {
        self.state.read_failures.lock().insert(node_id.clone());
        self
    }

    /// Makes the next `count` connects fail.
    pub fn fail_connects(&self, count: u32) -> &Self {
        self.state.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Forces the connection state.
    pub fn set_connected(&self, connected: bool) {
        self.state.connected.store(connected, Ordering::SeqCst);
    }

    /// Blocks every browse until [`release_browses`](Self::release_browses).
    pub fn pause_browses(&self) {
        *self.state.browse_gate.lock() = Some(Arc::new(Gate::default()));
    }

    /// Waits until a browse is blocked on the gate.
    pub async fn browse_entered(&self) {
        let gate = self.state.browse_gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notified().await;
        }
    }

    /// Lets blocked and future browses through.
    pub fn release_browses(&self) {
        if let Some(gate) = self.state.browse_gate.lock().take() {
            gate.release.notify_waiters();
            gate.release.notify_one();
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Credentials last handed to the transport.
    pub fn secure_context(&self) -> Option<SecureTransportContext> {
        self.state.secure_context.lock().clone()
    }

    /// Call counters.
    pub fn calls(&self) -> &CallCounters {
        &self.state.calls
    }

    /// Number of translate calls.
    pub fn translation_calls(&self) -> u64 {
        self.state.calls.translations.load(Ordering::SeqCst)
    }

    /// Number of browse calls.
    pub fn browse_calls(&self) -> u64 {
        self.state.calls.browses.load(Ordering::SeqCst)
    }

    /// Number of read calls.
    pub fn read_calls(&self) -> u64 {
        self.state.calls.reads.load(Ordering::SeqCst)
    }

    /// Number of connect calls.
    pub fn connect_calls(&self) -> u64 {
        self.state.calls.connects.load(Ordering::SeqCst)
    }

    /// Sum of all collaborator calls.
    pub fn total_calls(&self) -> u64 {
        self.state.calls.total()
    }
}

#[async_trait]
impl OpcUaTransport for MockTransport {
    async fn connect(&mut self) -> OpcUaResult<()> {
        self.state.calls.connects.fetch_add(1, Ordering::SeqCst);
        let remaining = self.state.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.connect_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(OpcUaError::connection(ConnectionError::refused(&self.endpoint)));
        }
        self.set_connected(true);
        Ok(())
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        self.set_connected(false);
        Ok(())
    }

    async fn reconnect(&mut self) -> OpcUaResult<()> {
        self.connect().await
    }

    fn set_secure_context(&mut self, context: Option<SecureTransportContext>) -> bool {
        let mut current = self.state.secure_context.lock();
        if *current == context {
            return false;
        }
        *current = context;
        true
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    fn state(&self) -> TransportState {
        if self.is_connected() {
            TransportState::Connected
        } else {
            TransportState::Disconnected
        }
    }

    async fn translate_browse_path(&self, path: &BrowsePath) -> OpcUaResult<TranslateResult> {
        self.state.calls.translations.fetch_add(1, Ordering::SeqCst);
        let result = self
            .state
            .translations
            .lock()
            .get(&path.to_string())
            .cloned()
            .unwrap_or_else(|| TranslateResult::bad(StatusCode::BAD_NO_MATCH));
        Ok(result)
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<ReferenceDescription>> {
        self.state.calls.browses.fetch_add(1, Ordering::SeqCst);

        let gate = self.state.browse_gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.state.session_loss_on_browse.lock().contains(node_id) {
            self.set_connected(false);
            return Err(OpcUaError::connection(ConnectionError::closed(Some(
                "BadConnectionClosed".to_string(),
            ))));
        }
        if self.state.browse_failures.lock().contains(node_id) {
            return Err(OpcUaError::browse(BrowseError::browse_failed_with_status(
                node_id.to_string(),
                0x8034_0000,
            )));
        }

        let nodes = self.state.nodes.lock();
        let node = nodes.get(node_id).ok_or_else(|| {
            OpcUaError::browse(BrowseError::node_not_found(node_id.to_string()))
        })?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| nodes.get(child).map(|n| n.reference.clone()))
            .collect())
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<ReadResult> {
        self.state.calls.reads.fetch_add(1, Ordering::SeqCst);

        if self.state.read_failures.lock().contains(node_id) {
            return Err(OpcUaError::operation(OperationError::read_failed(
                node_id.to_string(),
                "injected read failure",
            )));
        }

        let nodes = self.state.nodes.lock();
        let node = nodes.get(node_id).ok_or_else(|| {
            OpcUaError::browse(BrowseError::node_not_found(node_id.to_string()))
        })?;
        if !node.status.is_good() {
            return Ok(ReadResult::failure(node_id.clone(), node.status));
        }
        Ok(
            ReadResult::success(node_id.clone(), node.value.clone().unwrap_or_default())
                .with_source_timestamp(self.source_timestamp),
        )
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// =============================================================================
// RecordingSink
// =============================================================================

/// [`RecordSink`] that keeps every transferred record.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<(OutputRecord, Relationship)>>,
    created: AtomicU64,
    fail_create: AtomicBool,
    fail_writes: AtomicBool,
    fail_write_names: Mutex<HashSet<String>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `create` fail.
    pub fn fail_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Makes every content write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes content writes fail for records with this browse name.
    pub fn fail_write_for(&self, browse_name: &str) {
        self.fail_write_names.lock().insert(browse_name.to_string());
    }

    /// All transferred records with their routes, in order.
    pub fn records(&self) -> Vec<(OutputRecord, Relationship)> {
        self.records.lock().clone()
    }

    /// Records routed to `relationship`.
    pub fn routed(&self, relationship: Relationship) -> Vec<OutputRecord> {
        self.records
            .lock()
            .iter()
            .filter(|(_, r)| *r == relationship)
            .map(|(record, _)| record.clone())
            .collect()
    }

    /// Records routed to Success.
    pub fn success(&self) -> Vec<OutputRecord> {
        self.routed(Relationship::Success)
    }

    /// Records routed to Failure.
    pub fn failure(&self) -> Vec<OutputRecord> {
        self.routed(Relationship::Failure)
    }

    /// Number of transferred records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns `true` if nothing was transferred.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of `create` calls, successful or not.
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Drops all recorded records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn create(&self) -> FetchResult<OutputRecord> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(FetchError::emission(EmissionStage::Create, "injected allocation failure"));
        }
        Ok(OutputRecord::new())
    }

    async fn write_content(&self, record: &mut OutputRecord, content: String) -> FetchResult<()> {
        let name = record.attribute("Browsename").unwrap_or_default().to_string();
        if self.fail_writes.load(Ordering::SeqCst) || self.fail_write_names.lock().contains(&name) {
            return Err(FetchError::emission(EmissionStage::Write, "injected write failure"));
        }
        record.content = Some(content);
        Ok(())
    }

    async fn transfer(&self, record: OutputRecord, relationship: Relationship) -> FetchResult<()> {
        self.records.lock().push((record, relationship));
        Ok(())
    }
}

// =============================================================================
// CountingScheduler
// =============================================================================

/// [`HostScheduler`] that counts yields.
#[derive(Debug, Default)]
pub struct CountingScheduler {
    yields: AtomicU64,
}

impl CountingScheduler {
    /// Creates a scheduler with no yields recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of yields so far.
    pub fn yields(&self) -> u64 {
        self.yields.load(Ordering::SeqCst)
    }
}

impl HostScheduler for CountingScheduler {
    fn yield_processor(&self) {
        self.yields.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// HeldSecureProvider
// =============================================================================

/// [`SecureContextProvider`] that can be held open to stall a schedule.
#[derive(Debug, Default)]
pub struct HeldSecureProvider {
    held: AtomicBool,
    gate: Gate,
    calls: AtomicU64,
}

impl HeldSecureProvider {
    /// Creates a provider that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes later calls block until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Waits until a call is blocked.
    pub async fn entered(&self) {
        self.gate.entered.notified().await;
    }

    /// Lets the blocked call and later calls through.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.gate.release.notify_waiters();
        self.gate.release.notify_one();
    }

    /// Number of `secure_context` calls.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecureContextProvider for HeldSecureProvider {
    async fn secure_context(&self) -> OpcUaResult<SecureTransportContext> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.held.load(Ordering::SeqCst) {
            self.gate.entered.notify_one();
            self.gate.release.notified().await;
        }
        Ok(SecureTransportContext::default())
    }
}

/// Timestamp every mock read reports as its source timestamp.
pub fn fixed_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_564_800, 0).unwrap_or_default()
}

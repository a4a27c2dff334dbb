// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Turns visited variable nodes into output records.

use async_trait::async_trait;
use opcfetch_opcua::{
    attribute_names, join_path, Connection, NodeData, OpcUaTransport, ReferenceDescription,
    ReferenceVisitor,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{EmissionStage, FetchError};
use crate::host::RecordSink;
use crate::properties::Relationship;

// =============================================================================
// RunCounters
// =============================================================================

/// Per-trigger counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// References visited, of any node class.
    pub nodes_found: u64,
    /// Variable nodes whose data was extracted.
    pub variables_found: u64,
}

/// Records routed during one trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmissionStats {
    /// Records routed to Success.
    pub success: u64,
    /// Records routed to Failure.
    pub failure: u64,
    /// Records the sink could not create or transfer.
    pub dropped: u64,
}

// =============================================================================
// ExtractionVisitor
// =============================================================================

/// [`ReferenceVisitor`] that extracts every variable node into a record.
///
/// Per-node failures are logged and contained; the visitor always asks the
/// traversal to continue.
pub struct ExtractionVisitor<'a, T: OpcUaTransport, S: RecordSink + ?Sized> {
    connection: &'a Connection<T>,
    sink: &'a S,
    counters: &'a mut RunCounters,
    emitted: EmissionStats,
}

impl<'a, T: OpcUaTransport, S: RecordSink + ?Sized> ExtractionVisitor<'a, T, S> {
    /// Creates a visitor that counts into `counters`.
    pub fn new(connection: &'a Connection<T>, sink: &'a S, counters: &'a mut RunCounters) -> Self {
        Self {
            connection,
            sink,
            counters,
            emitted: EmissionStats::default(),
        }
    }

    /// Records routed so far.
    pub fn emitted(&self) -> EmissionStats {
        self.emitted
    }

    async fn emit(&mut self, data: NodeData, content: Option<String>) {
        let mut record = match self.sink.create().await {
            Ok(record) => record,
            Err(e) => {
                self.emitted.dropped += 1;
                e.log("record create");
                return;
            }
        };

        for (key, value) in data.attributes.iter() {
            record.set_attribute(key, value);
        }

        let relationship = match content.filter(|c| !c.is_empty()) {
            None => Relationship::Success,
            Some(content) => match self.sink.write_content(&mut record, content).await {
                Ok(()) => Relationship::Success,
                Err(e) => {
                    let name = record.attribute(attribute_names::BROWSE_NAME).unwrap_or_default();
                    FetchError::emission(EmissionStage::Write, format!("{name}: {e}"))
                        .log("record write");
                    Relationship::Failure
                }
            },
        };

        let id = record.id;
        match self.sink.transfer(record, relationship).await {
            Ok(()) => {
                trace!(record = %id, route = %relationship, "Record transferred");
                match relationship {
                    Relationship::Success => self.emitted.success += 1,
                    Relationship::Failure => self.emitted.failure += 1,
                }
            }
            Err(e) => {
                self.emitted.dropped += 1;
                e.log("record transfer");
            }
        }
    }
}

#[async_trait]
impl<'a, T, S> ReferenceVisitor for ExtractionVisitor<'a, T, S>
where
    T: OpcUaTransport,
    S: RecordSink + ?Sized,
{
    async fn on_reference(&mut self, reference: &ReferenceDescription, path: &str) -> bool {
        self.counters.nodes_found += 1;
        if !reference.is_variable() {
            return true;
        }

        let full_path = join_path(path, &reference.browse_name.name);
        let extracted = match self.connection.get_node_data(reference, path).await {
            Ok(data) => data.content().map(|content| (data, content)).map_err(Into::into),
            Err(e) => Err(e),
        };
        let (data, content) = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                FetchError::extraction(&full_path, e).log("node data");
                return true;
            }
        };

        self.counters.variables_found += 1;
        debug!(path = %full_path, node_id = %reference.node_id, "Variable found");
        self.emit(data, content).await;
        true
    }
}

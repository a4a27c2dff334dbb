// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Interfaces the host provides to the processor.
//!
//! - [`RecordSink`]: allocates, fills and routes [`OutputRecord`]s
//! - [`HostScheduler`]: receives the yield hint after an unproductive trigger

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opcfetch_opcua::NodeAttributes;
use serde::Serialize;
use uuid::Uuid;

use crate::error::FetchResult;
use crate::properties::Relationship;

// =============================================================================
// OutputRecord
// =============================================================================

/// One emitted record: the attributes of a variable node plus its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    /// Record id.
    pub id: Uuid,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Node attributes.
    pub attributes: NodeAttributes,

    /// Stringified value, if any was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl OutputRecord {
    /// Creates an empty record with a fresh id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            attributes: NodeAttributes::new(),
            content: None,
        }
    }

    /// Sets one attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key, value);
    }

    /// Returns one attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }
}

impl Default for OutputRecord {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RecordSink
// =============================================================================

/// Destination for emitted records.
///
/// A record passes through `create`, then optionally `write_content`, then
/// exactly one `transfer`. Ownership moves to the sink on transfer.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Allocates a new record.
    async fn create(&self) -> FetchResult<OutputRecord>;

    /// Writes `content` into `record`.
    async fn write_content(&self, record: &mut OutputRecord, content: String) -> FetchResult<()>;

    /// Routes `record` to `relationship`.
    async fn transfer(&self, record: OutputRecord, relationship: Relationship) -> FetchResult<()>;
}

// =============================================================================
// HostScheduler
// =============================================================================

/// Scheduling hooks of the host.
pub trait HostScheduler: Send + Sync {
    /// Asks the host to delay the next trigger.
    fn yield_processor(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ids_are_unique() {
        let a = OutputRecord::new();
        let b = OutputRecord::default();
        assert_ne!(a.id, b.id);
        assert!(a.content.is_none());
    }

    #[test]
    fn test_record_attributes() {
        let mut record = OutputRecord::new();
        record.set_attribute("Browsename", "Temp");
        assert_eq!(record.attribute("Browsename"), Some("Temp"));
        assert!(record.attribute("NodeID").is_none());
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse paths and depth-bounded subtree traversal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  ReferenceVisitor (trait)                       │
//! │        (called once per discovered reference, decides          │
//! │               whether the walk descends into it)                │
//! └─────────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     NodeTraverser                               │
//! │      (iterative depth-first walk over OpcUaTransport::browse)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Traversal rules
//!
//! - References are visited in pre-order, siblings in server order.
//! - Children of the root are at depth 1. With `max_depth = N > 0`, nodes at
//!   depth `N` are visited but not browsed; `0` means unbounded.
//! - The path handed to the visitor is the origin path followed by
//!   `/<browse name>` for every ancestor between the root and the reference.
//! - A node already on the current ancestor chain is visited but never
//!   browsed again. Nodes reachable along several paths are visited once per
//!   path.
//! - A failing browse below the root is logged and that branch is skipped.
//!   Failures of the root browse, and any loss of the session, end the walk.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::client::{OpcUaTransport, ReferenceDescription};
use crate::error::{with_deadline, BrowseError, OpcUaError, OpcUaResult, TimeoutError};
use crate::types::{NodeId, NodeIdentifier};

// =============================================================================
// QualifiedName
// =============================================================================

/// OPC UA qualified name (namespace index + name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,

    /// The name string.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }

    /// Creates a qualified name in namespace 0.
    pub fn standard(name: impl Into<String>) -> Self {
        Self::new(0, name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

/// Parses `<ns>:<name>`; anything without a numeric prefix is namespace 0.
impl From<&str> for QualifiedName {
    fn from(s: &str) -> Self {
        if let Some((ns, name)) = s.split_once(':') {
            if let Ok(ns_idx) = ns.parse::<u16>() {
                return Self::new(ns_idx, name);
            }
        }
        Self::standard(s)
    }
}

// =============================================================================
// BrowsePath
// =============================================================================

/// A slash-delimited browse path, e.g. `/Root/Objects/Sensor1`.
///
/// A leading `Root`, `Objects`, `Types` or `Views` segment picks the
/// matching standard folder as the starting node; otherwise the walk starts
/// at the Objects folder. Every hop follows hierarchical references
/// (including subtypes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowsePath {
    /// Starting node.
    pub start_node: NodeId,

    /// Browse names to follow from the starting node.
    pub segments: Vec<QualifiedName>,
}

impl BrowsePath {
    /// Creates a browse path with an explicit start node.
    pub fn new(start_node: NodeId, segments: Vec<QualifiedName>) -> Self {
        Self {
            start_node,
            segments,
        }
    }

    /// Parses a browse path.
    ///
    /// # Errors
    ///
    /// Returns [`BrowseError::InvalidPath`] when the path has no segments.
    pub fn parse(path: &str) -> OpcUaResult<Self> {
        let parts: Vec<&str> = path
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let Some(first) = parts.first() else {
            return Err(OpcUaError::browse(BrowseError::invalid_path(
                path,
                "path has no browse names",
            )));
        };

        let (start_node, skip) = match first.to_lowercase().as_str() {
            "root" => (NodeId::ROOT_FOLDER, 1),
            "objects" => (NodeId::OBJECTS_FOLDER, 1),
            "types" => (NodeId::TYPES_FOLDER, 1),
            "views" => (NodeId::VIEWS_FOLDER, 1),
            _ => (NodeId::OBJECTS_FOLDER, 0),
        };

        let segments = parts
            .iter()
            .skip(skip)
            .map(|name| QualifiedName::from(*name))
            .collect();

        Ok(Self {
            start_node,
            segments,
        })
    }

    /// Returns `true` if the path designates the start node itself.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of hops.
    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for BrowsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = match &self.start_node.identifier {
            NodeIdentifier::Numeric(84) if self.start_node.namespace_index == 0 => "Root".into(),
            NodeIdentifier::Numeric(85) if self.start_node.namespace_index == 0 => "Objects".into(),
            NodeIdentifier::Numeric(86) if self.start_node.namespace_index == 0 => "Types".into(),
            NodeIdentifier::Numeric(87) if self.start_node.namespace_index == 0 => "Views".into(),
            _ => self.start_node.to_string(),
        };
        write!(f, "{start}")?;
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

// =============================================================================
// ReferenceVisitor
// =============================================================================

/// Callback invoked for every reference a traversal discovers.
#[async_trait]
pub trait ReferenceVisitor: Send {
    /// Handles one reference.
    ///
    /// `path` is the accumulated path of the reference's parent. Returning
    /// `false` prunes the subtree below `reference`; siblings are still
    /// visited.
    async fn on_reference(&mut self, reference: &ReferenceDescription, path: &str) -> bool;
}

// =============================================================================
// TraversalStats
// =============================================================================

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    /// References handed to the visitor.
    pub references_visited: u64,

    /// Browse calls issued, including the root.
    pub browse_calls: u64,

    /// Browse calls below the root that failed and were skipped.
    pub browse_failures: u64,

    /// Descents refused because the node was already an ancestor.
    pub cycles_skipped: u64,

    /// Deepest level visited.
    pub max_depth_reached: usize,
}

impl TraversalStats {
    /// Adds the counters of another traversal.
    pub fn merge(&mut self, other: &TraversalStats) {
        self.references_visited += other.references_visited;
        self.browse_calls += other.browse_calls;
        self.browse_failures += other.browse_failures;
        self.cycles_skipped += other.cycles_skipped;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
    }
}

/// Joins a parent path and a browse name.
pub fn join_path(base: &str, name: &str) -> String {
    format!("{base}/{name}")
}

// =============================================================================
// NodeTraverser
// =============================================================================

/// Pending siblings at one level of the walk.
struct Frame {
    /// References not yet visited, in server order.
    remaining: VecDeque<ReferenceDescription>,
    /// Path of the node these references hang under.
    path: String,
    /// Depth of the references in `remaining`.
    depth: usize,
}

/// Depth-first subtree walker over a shared transport.
///
/// The transport lock is held only for the duration of each browse call, so
/// visitors are free to issue their own reads on the same transport.
pub struct NodeTraverser<T: OpcUaTransport> {
    transport: Arc<Mutex<T>>,
    request_timeout: Option<Duration>,
}

impl<T: OpcUaTransport> Clone for NodeTraverser<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            request_timeout: self.request_timeout,
        }
    }
}

impl<T: OpcUaTransport> NodeTraverser<T> {
    /// Creates a traverser over `transport`.
    pub fn new(transport: Arc<Mutex<T>>) -> Self {
        Self {
            transport,
            request_timeout: None,
        }
    }

    /// Bounds every browse call. A browse that overruns counts as a failed
    /// browse of that node.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<ReferenceDescription>> {
        let transport = self.transport.lock().await;
        with_deadline(self.request_timeout, TimeoutError::browse, transport.browse(node_id)).await
    }

    /// Walks the subtree below `root`, calling `visitor` for each reference.
    ///
    /// See the module documentation for the ordering, depth and failure
    /// rules.
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
        let mut stats = TraversalStats::default();

        stats.browse_calls += 1;
        let children = self.browse(root).await.map_err(|e| {
            e.log(&format!("browse of traversal root {root}"));
            e
        })?;

        debug!(
            root = %root,
            origin = origin_path,
            max_depth,
            children = children.len(),
            "Starting traversal"
        );

        let mut ancestors: Vec<NodeId> = vec![root.clone()];
        let mut stack: Vec<Frame> = vec![Frame {
            remaining: children.into(),
            path: origin_path.to_string(),
            depth: 1,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(reference) = frame.remaining.pop_front() else {
                stack.pop();
                ancestors.pop();
                continue;
            };
            let depth = frame.depth;
            let path = frame.path.clone();

            stats.references_visited += 1;
            stats.max_depth_reached = stats.max_depth_reached.max(depth);

            if !visitor.on_reference(&reference, &path).await {
                trace!(node_id = %reference.node_id, "Visitor pruned branch");
                continue;
            }

            if max_depth != 0 && depth as u64 >= max_depth {
                continue;
            }

            if ancestors.contains(&reference.node_id) {
                stats.cycles_skipped += 1;
                trace!(node_id = %reference.node_id, path = %path, "Reference loops back to an ancestor");
                continue;
            }

            stats.browse_calls += 1;
            match self.browse(&reference.node_id).await {
                Ok(grandchildren) if grandchildren.is_empty() => {}
                Ok(grandchildren) => {
                    let child_path = join_path(&path, &reference.browse_name.name);
                    ancestors.push(reference.node_id.clone());
                    stack.push(Frame {
                        remaining: grandchildren.into(),
                        path: child_path,
                        depth: depth + 1,
                    });
                }
                Err(e) if e.is_connection_loss() => {
                    e.log(&format!("browse of {}", reference.node_id));
                    return Err(e);
                }
                Err(e) => {
                    stats.browse_failures += 1;
                    warn!(
                        node_id = %reference.node_id,
                        path = %join_path(&path, &reference.browse_name.name),
                        error = %e,
                        "Browse failed, skipping branch"
                    );
                }
            }
        }

        debug!(
            root = %root,
            visited = stats.references_visited,
            browse_calls = stats.browse_calls,
            failures = stats.browse_failures,
            "Traversal finished"
        );

        Ok(stats)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_parsing() {
        let name = QualifiedName::from("2:Pump");
        assert_eq!(name.namespace_index, 2);
        assert_eq!(name.name, "Pump");
        assert_eq!(name.to_string(), "2:Pump");

        let name = QualifiedName::from("Server");
        assert_eq!(name.namespace_index, 0);

        // Non-numeric prefix stays part of the name
        let name = QualifiedName::from("a:b");
        assert_eq!(name.namespace_index, 0);
        assert_eq!(name.name, "a:b");
    }

    #[test]
    fn test_browse_path_root_prefix() {
        let path = BrowsePath::parse("/Root/Objects/Sensor1").unwrap();
        assert_eq!(path.start_node, NodeId::ROOT_FOLDER);
        assert_eq!(
            path.segments,
            vec![QualifiedName::standard("Objects"), QualifiedName::standard("Sensor1")]
        );
        assert_eq!(path.to_string(), "Root/Objects/Sensor1");
    }

    #[test]
    fn test_browse_path_default_start() {
        let path = BrowsePath::parse("Plant/2:Line1//Temp").unwrap();
        assert_eq!(path.start_node, NodeId::OBJECTS_FOLDER);
        assert_eq!(path.len(), 3);
        assert_eq!(path.segments[1], QualifiedName::new(2, "Line1"));

        let path = BrowsePath::parse("objects").unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_browse_path_empty_is_invalid() {
        assert!(BrowsePath::parse("").is_err());
        assert!(BrowsePath::parse("///").is_err());
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "Temp"), "/Temp");
        assert_eq!(join_path("/Root/Objects", "Temp"), "/Root/Objects/Temp");
    }

    #[test]
    fn test_stats_merge() {
        let mut total = TraversalStats::default();
        total.merge(&TraversalStats {
            references_visited: 3,
            browse_calls: 2,
            browse_failures: 1,
            cycles_skipped: 0,
            max_depth_reached: 2,
        });
        total.merge(&TraversalStats {
            references_visited: 1,
            browse_calls: 1,
            browse_failures: 0,
            cycles_skipped: 1,
            max_depth_reached: 1,
        });
        assert_eq!(total.references_visited, 4);
        assert_eq!(total.browse_calls, 3);
        assert_eq!(total.cycles_skipped, 1);
        assert_eq!(total.max_depth_reached, 2);
    }
}

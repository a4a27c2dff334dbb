// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Browse path resolution with memoization.
//!
//! Translating a browse path costs a server round trip, and the answer only
//! changes when the processor is reconfigured. [`PathResolutionCache`]
//! therefore keeps the first Good, non-empty translation until
//! [`invalidate`](PathResolutionCache::invalidate) is called.

use opcfetch_opcua::{Connection, NodeId, OpcUaTransport};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::{FetchError, FetchResult};

// =============================================================================
// ResolvedStartSet
// =============================================================================

/// Traversal roots together with the path they were derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStartSet {
    /// Roots in server order.
    pub node_ids: Vec<NodeId>,

    /// Path used as the traversal origin. Empty for direct identifiers.
    pub origin_path: String,
}

impl ResolvedStartSet {
    /// A single root addressed directly by id.
    pub fn single(node_id: NodeId) -> Self {
        Self {
            node_ids: vec![node_id],
            origin_path: String::new(),
        }
    }

    /// Roots resolved from `origin_path`.
    pub fn from_path(node_ids: Vec<NodeId>, origin_path: impl Into<String>) -> Self {
        Self {
            node_ids,
            origin_path: origin_path.into(),
        }
    }

    /// Returns `true` if there is nothing to traverse.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Number of roots.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }
}

// =============================================================================
// PathResolutionCache
// =============================================================================

/// Memoized browse path translation.
#[derive(Debug, Default)]
pub struct PathResolutionCache {
    entry: Option<ResolvedStartSet>,
}

impl PathResolutionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached start set, if any.
    pub fn cached(&self) -> Option<&ResolvedStartSet> {
        self.entry.as_ref()
    }

    /// Returns `true` if a translation is cached.
    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }

    /// Drops the cached translation.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("Path resolution cache invalidated");
        }
    }

    /// Resolves `path`, asking the server only when nothing is cached for it.
    ///
    /// An entry derived from another path counts as a miss and is replaced.
    ///
    /// A Good translation with targets is cached. A Good translation without
    /// targets is returned but not cached, so the next call asks again.
    ///
    /// # Errors
    ///
    /// [`FetchError::Translation`] for a non-Good status or a transport
    /// failure. The cache stays empty.
    pub async fn resolve<T: OpcUaTransport>(
        &mut self,
        connection: &Connection<T>,
        path: &str,
    ) -> FetchResult<ResolvedStartSet> {
        match &self.entry {
            Some(entry) if entry.origin_path == path => {
                trace!(path, roots = entry.len(), "Using cached path translation");
                return Ok(entry.clone());
            }
            Some(entry) => {
                debug!(path, cached = %entry.origin_path, "Cached translation belongs to another path");
                self.entry = None;
            }
            None => {}
        }

        let result = connection
            .translate_path_to_ids(path)
            .await
            .map_err(|e| FetchError::translation_failed(path, e))?;

        if !result.status.is_good() {
            return Err(FetchError::translation_status(path, result.status));
        }

        let resolved = ResolvedStartSet::from_path(result.targets, path);
        if resolved.is_empty() {
            warn!(path, "Browse path translated to no nodes");
        } else {
            debug!(path, roots = resolved.len(), "Cached path translation");
            self.entry = Some(resolved.clone());
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_set_single() {
        let set = ResolvedStartSet::single(NodeId::numeric(2, 58));
        assert_eq!(set.len(), 1);
        assert!(set.origin_path.is_empty());
    }

    #[test]
    fn test_invalidate_empty_cache() {
        let mut cache = PathResolutionCache::new();
        assert!(!cache.is_cached());
        cache.invalidate();
        assert!(cache.cached().is_none());
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcfetch-core
//!
//! The fetch processor: given a root node identifier, walk the server's
//! node tree and emit one record per variable node found.
//!
//! - **Identifier**: `Node ID` / `Node ID type` / `Namespace index` /
//!   `Max depth` validation
//! - **PathCache**: memoized browse path translation
//! - **Extraction**: variable node to record, Success/Failure routing
//! - **Controller**: configuration gate, single-flight triggers, backoff
//! - **Host**: record sink and scheduler interfaces the host implements
//!
//! ## Example
//!
//! ```rust,ignore
//! use opcfetch_core::{FetchProcessor, FetchProperties, properties};
//! use opcfetch_opcua::Connection;
//!
//! let processor = FetchProcessor::new(Connection::new(transport));
//! processor
//!     .on_schedule(
//!         &FetchProperties::default()
//!             .with(properties::NODE_ID, "58")
//!             .with(properties::NODE_ID_TYPE, "Int")
//!             .with(properties::NAMESPACE_INDEX, "2"),
//!     )
//!     .await?;
//!
//! let outcome = processor.on_trigger(&sink, &scheduler).await;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod controller;
pub mod error;
pub mod extraction;
pub mod host;
pub mod identifier;
pub mod path_cache;
pub mod properties;

pub use controller::{BackoffReason, FetchProcessor, ProcessorState, TriggerOutcome};
pub use error::{EmissionStage, FetchError, FetchResult};
pub use extraction::{EmissionStats, ExtractionVisitor, RunCounters};
pub use host::{HostScheduler, OutputRecord, RecordSink};
pub use identifier::{IdentifierConfig, NodeIdKind};
pub use path_cache::{PathResolutionCache, ResolvedStartSet};
pub use properties::{FetchProperties, PropertyDescriptor, Relationship};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA access layer for opcfetch.
//!
//! This crate owns everything that talks to an OPC UA server: the node and
//! value model, the transport abstraction, depth-bounded subtree traversal,
//! node data retrieval and the secure transport context. The fetch processor
//! in `opcfetch-core` only sees [`Connection`].
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Connection    - Session and endpoint issues
//! ├── Security      - Authentication and credential errors
//! ├── Browse        - Browse and path translation failures
//! ├── Operation     - Read failures and bad status codes
//! ├── Conversion    - Values without a content form
//! ├── Configuration - Invalid settings
//! └── Timeout       - Expired connect/browse/read deadlines
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use opcfetch_opcua::{Connection, NodeId, OpcUaConfig, RealOpcUaTransport};
//!
//! let config = OpcUaConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .build()?;
//!
//! let connection = Connection::new(RealOpcUaTransport::new(config));
//! if connection.reconnect().await {
//!     let ids = connection.translate_path_to_ids("/Objects/Plant").await?;
//!     println!("{:?}", ids.targets);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod browse;
pub mod client;
pub mod error;
pub mod security;
pub mod types;

pub use error::{
    BrowseError, ConfigurationError, ConnectionError, ConversionError, ErrorCode, ErrorSeverity,
    OpcUaError, OpcUaResult, OperationError, SecurityError, TimeoutError,
};

pub use types::{
    NodeClass, NodeId, NodeIdentifier, OpcUaConfig, OpcUaConfigBuilder, OpcUaDataType,
    SecurityMode, SecurityPolicy, StatusCode, UserIdentity,
};

pub use client::{
    attribute_names, Connection, ConnectionStatsSnapshot, NodeAttributes, NodeData,
    OpcUaTransport, OpcUaValue, ReadResult, ReferenceDescription, RetryConfig, RetryStrategy,
    TranslateResult, TransportState,
};

#[cfg(feature = "real-transport")]
pub use client::RealOpcUaTransport;

pub use browse::{
    join_path, BrowsePath, NodeTraverser, QualifiedName, ReferenceVisitor, TraversalStats,
};

pub use security::{
    FileSecureContextProvider, SecureContextProvider, SecureTransportContext, TlsSettings,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

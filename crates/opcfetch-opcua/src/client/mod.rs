// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client side of the fetch pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Connection                               │
//! │   (reconnect with retry, path translation, traversal,           │
//! │                    node data retrieval)                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    OpcUaTransport                               │
//! │        (abstract transport: opcua crate or test double)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod connection;
mod node_data;
mod transport;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use connection::{
    Connection, ConnectionStats, ConnectionStatsSnapshot, RetryConfig, RetryStrategy,
};
pub use node_data::{attribute_names, NodeAttributes, NodeData};
pub use transport::{
    OpcUaTransport, OpcUaValue, ReadResult, ReferenceDescription, TranslateResult, TransportState,
};

#[cfg(feature = "real-transport")]
pub use real_transport::RealOpcUaTransport;

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! The [`OpcUaTransport`] trait is the seam between the fetch pipeline and the
//! wire protocol. Everything above it (traversal, node data retrieval, path
//! resolution) is written against the trait so it can run against the real
//! `opcua` stack or an in-memory address space in tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::browse::{BrowsePath, QualifiedName};
use crate::error::{ConversionError, OpcUaResult};
use crate::security::SecureTransportContext;
use crate::types::{NodeClass, NodeId, OpcUaDataType, StatusCode};

// =============================================================================
// TransportState
// =============================================================================

/// Session state as seen by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    /// No session.
    #[default]
    Disconnected,

    /// Session activation in progress.
    Connecting,

    /// Session active.
    Connected,

    /// Last connect attempt failed.
    Failed,
}

impl TransportState {
    /// Whether a session is active.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

// =============================================================================
// ReferenceDescription
// =============================================================================

/// One reference returned by a browse call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDescription {
    /// Target node of the reference.
    pub node_id: NodeId,

    /// Browse name of the target node.
    pub browse_name: QualifiedName,

    /// Display name of the target node.
    pub display_name: String,

    /// Node class of the target node.
    pub node_class: NodeClass,

    /// Reference type (HasComponent, Organizes, ...).
    pub reference_type: Option<NodeId>,

    /// Type definition of the target node.
    pub type_definition: Option<NodeId>,
}

impl ReferenceDescription {
    /// Creates a reference whose display name equals its browse name.
    pub fn new(node_id: NodeId, browse_name: impl Into<QualifiedName>, node_class: NodeClass) -> Self {
        let browse_name = browse_name.into();
        Self {
            node_id,
            display_name: browse_name.name.clone(),
            browse_name,
            node_class,
            reference_type: None,
            type_definition: None,
        }
    }

    /// Returns `true` if the target is a variable node.
    #[inline]
    pub fn is_variable(&self) -> bool {
        self.node_class.has_value()
    }
}

// =============================================================================
// TranslateResult
// =============================================================================

/// Outcome of translating a browse path to node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateResult {
    /// Status of the translation.
    pub status: StatusCode,

    /// Matching nodes, in server order.
    pub targets: Vec<NodeId>,
}

impl TranslateResult {
    /// A Good result with the given targets.
    pub fn good(targets: Vec<NodeId>) -> Self {
        Self {
            status: StatusCode::GOOD,
            targets,
        }
    }

    /// A failed result with no targets.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            targets: Vec::new(),
        }
    }
}

// =============================================================================
// ReadResult
// =============================================================================

/// Result of reading the Value attribute of a node.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Node whose Value attribute was read.
    pub node_id: NodeId,

    /// Decoded value, present only on Good.
    pub value: Option<OpcUaValue>,

    /// Read status.
    pub status: StatusCode,

    /// When the server produced the value.
    pub server_timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// When the device produced the value.
    pub source_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

impl ReadResult {
    /// A Good read carrying `value`.
    pub fn success(node_id: NodeId, value: OpcUaValue) -> Self {
        Self {
            node_id,
            value: Some(value),
            status: StatusCode::GOOD,
            server_timestamp: Some(chrono::Utc::now()),
            source_timestamp: None,
        }
    }

    /// A read that returned no value.
    pub fn failure(node_id: NodeId, status: StatusCode) -> Self {
        Self {
            node_id,
            value: None,
            status,
            server_timestamp: Some(chrono::Utc::now()),
            source_timestamp: None,
        }
    }

    /// Sets the source timestamp.
    pub fn with_source_timestamp(mut self, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        self.source_timestamp = Some(timestamp);
        self
    }

    /// Whether the read status is Good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// OpcUaValue
// =============================================================================

/// A value read from a variable node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpcUaValue {
    /// Boolean value.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String value.
    String(String),
    /// Localized text (locale, text).
    LocalizedText(String, String),
    /// Date/time value.
    DateTime(chrono::DateTime<chrono::Utc>),
    /// GUID value.
    Guid(uuid::Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Array of values.
    Array(Vec<OpcUaValue>),
    /// Null value.
    #[default]
    Null,
}

impl OpcUaValue {
    /// Wire data type of this value.
    pub fn data_type(&self) -> OpcUaDataType {
        match self {
            Self::Boolean(_) => OpcUaDataType::Boolean,
            Self::SByte(_) => OpcUaDataType::SByte,
            Self::Byte(_) => OpcUaDataType::Byte,
            Self::Int16(_) => OpcUaDataType::Int16,
            Self::UInt16(_) => OpcUaDataType::UInt16,
            Self::Int32(_) => OpcUaDataType::Int32,
            Self::UInt32(_) => OpcUaDataType::UInt32,
            Self::Int64(_) => OpcUaDataType::Int64,
            Self::UInt64(_) => OpcUaDataType::UInt64,
            Self::Float(_) => OpcUaDataType::Float,
            Self::Double(_) => OpcUaDataType::Double,
            Self::String(_) => OpcUaDataType::String,
            Self::LocalizedText(..) => OpcUaDataType::LocalizedText,
            Self::DateTime(_) => OpcUaDataType::DateTime,
            Self::Guid(_) => OpcUaDataType::Guid,
            Self::ByteString(_) => OpcUaDataType::ByteString,
            Self::Array(_) => OpcUaDataType::Array,
            Self::Null => OpcUaDataType::Variant,
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value as output content.
    ///
    /// Scalars render in their natural text form, date-times as RFC 3339 and
    /// byte strings as base64. Arrays have no single textual form and are
    /// rejected, as is null.
    pub fn to_content_string(&self) -> Result<String, ConversionError> {
        let text = match self {
            Self::Boolean(v) => v.to_string(),
            Self::SByte(v) => v.to_string(),
            Self::Byte(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::UInt16(v) => v.to_string(),
            Self::Int32(v) => v.to_string(),
            Self::UInt32(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::UInt64(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::LocalizedText(_, text) => text.clone(),
            Self::DateTime(v) => v.to_rfc3339(),
            Self::Guid(v) => v.to_string(),
            Self::ByteString(v) => BASE64.encode(v),
            Self::Array(_) | Self::Null => {
                return Err(ConversionError::unsupported_type(self.data_type().name()))
            }
        };
        Ok(text)
    }
}

impl fmt::Display for OpcUaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Null => f.write_str("null"),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            other => match other.to_content_string() {
                Ok(text) => f.write_str(&text),
                Err(_) => f.write_str("?"),
            },
        }
    }
}

// =============================================================================
// OpcUaTransport Trait
// =============================================================================

/// Low-level OPC UA operations used by the fetch pipeline.
///
/// Implementations must be `Send + Sync`; callers share one transport behind
/// an `Arc<tokio::sync::Mutex<_>>`.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Establishes a session with the server.
    async fn connect(&mut self) -> OpcUaResult<()>;

    /// Closes the session.
    async fn disconnect(&mut self) -> OpcUaResult<()>;

    /// Returns `true` if a session is currently usable.
    fn is_connected(&self) -> bool;

    /// Returns the current transport state.
    fn state(&self) -> TransportState;

    /// Replaces the credentials used by the next session.
    ///
    /// Returns `true` if they differ from the current ones. Transports
    /// without client credentials ignore the call.
    fn set_secure_context(&mut self, context: Option<SecureTransportContext>) -> bool {
        let _ = context;
        false
    }

    /// Drops any half-open session and connects again.
    async fn reconnect(&mut self) -> OpcUaResult<()> {
        self.disconnect().await.ok();
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.connect().await
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Translates a browse path into the node ids it designates.
    ///
    /// A service-level rejection is reported through
    /// [`TranslateResult::status`]; `Err` is reserved for transport failures.
    async fn translate_browse_path(&self, path: &BrowsePath) -> OpcUaResult<TranslateResult>;

    /// Returns the forward hierarchical references of `node_id`, in server order.
    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<ReferenceDescription>>;

    /// Reads the Value attribute of `node_id` with timestamps.
    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<ReadResult>;

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Returns the server endpoint URL.
    fn endpoint(&self) -> &str;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_string_scalars() {
        assert_eq!(OpcUaValue::Boolean(true).to_content_string().unwrap(), "true");
        assert_eq!(OpcUaValue::Int32(-42).to_content_string().unwrap(), "-42");
        assert_eq!(OpcUaValue::UInt64(7).to_content_string().unwrap(), "7");
        assert_eq!(OpcUaValue::Double(21.5).to_content_string().unwrap(), "21.5");
        assert_eq!(
            OpcUaValue::String("running".into()).to_content_string().unwrap(),
            "running"
        );
        assert_eq!(
            OpcUaValue::LocalizedText("en".into(), "Pump".into())
                .to_content_string()
                .unwrap(),
            "Pump"
        );
        assert_eq!(
            OpcUaValue::ByteString(vec![1, 2, 3, 4]).to_content_string().unwrap(),
            "AQIDBA=="
        );
    }

    #[test]
    fn test_content_string_datetime() {
        let ts = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(
            OpcUaValue::DateTime(ts).to_content_string().unwrap(),
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_content_string_rejects_arrays() {
        let err = OpcUaValue::Array(vec![OpcUaValue::Int32(1)])
            .to_content_string()
            .unwrap_err();
        assert!(err.to_string().contains("Array"));
        assert!(OpcUaValue::Null.to_content_string().is_err());
    }

    #[test]
    fn test_value_data_type() {
        assert_eq!(OpcUaValue::Float(1.0).data_type(), OpcUaDataType::Float);
        assert_eq!(OpcUaValue::Null.data_type(), OpcUaDataType::Variant);
        assert!(OpcUaValue::default().is_null());
    }

    #[test]
    fn test_read_result() {
        let good = ReadResult::success(NodeId::numeric(2, 1), OpcUaValue::Double(1.0));
        assert!(good.is_good());
        assert!(good.source_timestamp.is_none());

        let bad = ReadResult::failure(NodeId::numeric(2, 1), StatusCode(0x803B_0000));
        assert!(!bad.is_good());
        assert!(bad.value.is_none());
    }

    #[test]
    fn test_reference_description() {
        let reference = ReferenceDescription::new(NodeId::numeric(2, 5), "2:Temp", NodeClass::Variable);
        assert!(reference.is_variable());
        assert_eq!(reference.browse_name.namespace_index, 2);
        assert_eq!(reference.display_name, "Temp");
        assert!(reference.reference_type.is_none());
    }

    #[test]
    fn test_translate_result() {
        let good = TranslateResult::good(vec![NodeId::numeric(2, 1)]);
        assert!(good.status.is_good());
        let bad = TranslateResult::bad(StatusCode::BAD_NO_MATCH);
        assert!(bad.targets.is_empty());
        assert!(bad.status.is_bad());
    }
}

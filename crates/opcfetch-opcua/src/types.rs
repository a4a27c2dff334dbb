// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node model and connection settings.
//!
//! - **NodeId**: the four OPC UA identifier kinds with parsing
//! - **NodeClass**: node class bit values, used to pick variable nodes
//! - **StatusCode**: raw service status with Good/Bad classification
//! - **OpcUaDataType**: built-in scalar types, their names and sizes
//! - **OpcUaConfig**: endpoint, security and timeout settings with builder
//!
//! # Examples
//!
//! ```
//! use opcfetch_opcua::types::{NodeId, OpcUaConfig};
//!
//! let node: NodeId = "ns=2;i=58".parse().unwrap();
//! assert_eq!(node, NodeId::numeric(2, 58));
//!
//! let config = OpcUaConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .build()
//!     .unwrap();
//! assert!(!config.uses_security());
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, OpcUaError, OperationError};

// =============================================================================
// NodeId
// =============================================================================

/// Namespace index plus identifier.
///
/// Text form is `ns=<index>;{i|s|g|b}=<value>`, with `ns=` left out for
/// namespace 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index. 0 is the OPC UA base namespace.
    pub namespace_index: u16,
    /// Identifier within the namespace.
    pub identifier: NodeIdentifier,
}

const fn ns0(value: u32) -> NodeId {
    NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(value),
    }
}

impl NodeId {
    /// `Root` folder.
    pub const ROOT_FOLDER: NodeId = ns0(84);
    /// `Objects` folder, the usual browse path start.
    pub const OBJECTS_FOLDER: NodeId = ns0(85);
    /// `Types` folder.
    pub const TYPES_FOLDER: NodeId = ns0(86);
    /// `Views` folder.
    pub const VIEWS_FOLDER: NodeId = ns0(87);

    fn with(namespace_index: u16, identifier: NodeIdentifier) -> Self {
        Self {
            namespace_index,
            identifier,
        }
    }

    /// `ns=<namespace_index>;i=<value>`
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self::with(namespace_index, NodeIdentifier::Numeric(value))
    }

    /// `ns=<namespace_index>;s=<value>`
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self::with(namespace_index, NodeIdentifier::String(value.into()))
    }

    /// `ns=<namespace_index>;g=<value>`
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self::with(namespace_index, NodeIdentifier::Guid(value))
    }

    /// `ns=<namespace_index>;b=<base64 value>`
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self::with(namespace_index, NodeIdentifier::Opaque(value))
    }

    /// `i=0` in namespace 0, which OPC UA reserves as "no node".
    pub fn is_null(&self) -> bool {
        *self == ns0(0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "ns={};", self.namespace_index)?;
        }
        write!(f, "{}", self.identifier)
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let fail = |reason: String| {
            OpcUaError::configuration(ConfigurationError::invalid_node_id(text, reason))
        };

        let (namespace_index, rest) = match text.strip_prefix("ns=") {
            None => (0, text),
            Some(tail) => {
                let Some((ns, rest)) = tail.split_once(';') else {
                    return Err(fail("no identifier follows the namespace".into()));
                };
                let ns = ns
                    .parse::<u16>()
                    .map_err(|_| fail(format!("namespace index '{ns}' is not a u16")))?;
                (ns, rest)
            }
        };

        let Some((kind, value)) = rest.split_once('=') else {
            return Err(fail("expected i=, s=, g= or b=".into()));
        };
        let identifier = match kind {
            "i" => value
                .parse()
                .map(NodeIdentifier::Numeric)
                .map_err(|_| fail(format!("'{value}' is not a u32")))?,
            "s" => NodeIdentifier::String(value.to_string()),
            "g" => Uuid::parse_str(value)
                .map(NodeIdentifier::Guid)
                .map_err(|e| fail(format!("bad GUID: {e}")))?,
            "b" => BASE64
                .decode(value)
                .map(NodeIdentifier::Opaque)
                .map_err(|e| fail(format!("bad base64: {e}")))?,
            other => return Err(fail(format!("unknown identifier kind '{other}'"))),
        };

        Ok(Self::with(namespace_index, identifier))
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// Identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// `i=`
    Numeric(u32),
    /// `s=`
    String(String),
    /// `g=`
    Guid(Uuid),
    /// `b=`, a byte string.
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Kind as reported in the `NodeIDType` attribute.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::String(_) => "string",
            Self::Guid(_) => "guid",
            Self::Opaque(_) => "bytestring",
        }
    }

    /// Value as reported in the `NodeID` attribute.
    pub fn value_text(&self) -> String {
        match self {
            Self::Numeric(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Guid(v) => v.to_string(),
            Self::Opaque(v) => BASE64.encode(v),
        }
    }

    const fn prefix(&self) -> char {
        match self {
            Self::Numeric(_) => 'i',
            Self::String(_) => 's',
            Self::Guid(_) => 'g',
            Self::Opaque(_) => 'b',
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.prefix(), self.value_text())
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// Node class of a browse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum NodeClass {
    Object,
    Variable,
    Method,
    ObjectType,
    VariableType,
    ReferenceType,
    DataType,
    View,
}

impl NodeClass {
    const ALL: [NodeClass; 8] = [
        Self::Object,
        Self::Variable,
        Self::Method,
        Self::ObjectType,
        Self::VariableType,
        Self::ReferenceType,
        Self::DataType,
        Self::View,
    ];

    /// Maps the wire mask (1, 2, 4 … 128) to a class.
    pub fn from_value(value: u32) -> Option<Self> {
        if !value.is_power_of_two() {
            return None;
        }
        Self::ALL.get(value.trailing_zeros() as usize).copied()
    }

    /// Only variables carry a value worth reading.
    #[inline]
    pub const fn has_value(&self) -> bool {
        matches!(self, Self::Variable)
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// Raw status of a service call or attribute read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: StatusCode = StatusCode(0);
    /// A browse path matched no node.
    pub const BAD_NO_MATCH: StatusCode = StatusCode(0x806F_0000);
    /// The node does not exist on the server.
    pub const BAD_NODE_ID_UNKNOWN: StatusCode = StatusCode(0x8034_0000);
    /// The channel dropped mid-call.
    pub const BAD_COMMUNICATION_ERROR: StatusCode = StatusCode(0x8005_0000);

    const SEVERITY_MASK: u32 = 0xC000_0000;

    /// Severity bits are `00`.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & Self::SEVERITY_MASK == 0
    }

    /// Severity bits are `1x`. Uncertain codes are neither good nor bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Symbolic name, e.g. `BadNoMatch`.
    pub fn name(&self) -> &'static str {
        OperationError::status_code_name(self.0)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

// =============================================================================
// OpcUaDataType
// =============================================================================

/// Built-in type of a read value, reported as `Typename`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum OpcUaDataType {
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    DateTime,
    Guid,
    ByteString,
    LocalizedText,
    Array,
    /// Anything the stack reports that has no dedicated variant.
    Variant,
}

impl OpcUaDataType {
    /// Encoded size for fixed-width types, reported as `Datasize`.
    pub const fn byte_size(&self) -> Option<usize> {
        Some(match self {
            Self::Boolean | Self::SByte | Self::Byte => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float => 4,
            Self::Int64 | Self::UInt64 | Self::Double | Self::DateTime => 8,
            Self::Guid => 16,
            Self::String | Self::ByteString | Self::LocalizedText | Self::Array | Self::Variant => {
                return None
            }
        })
    }

    /// OPC UA type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::LocalizedText => "LocalizedText",
            Self::Array => "Array",
            Self::Variant => "Variant",
        }
    }
}

impl fmt::Display for OpcUaDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower-cases and strips `-`/`_` so `sign_and_encrypt` matches `SignAndEncrypt`.
fn fold_name(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

// =============================================================================
// SecurityMode
// =============================================================================

/// Message security mode of the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// Plain messages.
    #[default]
    None,
    /// Signed messages.
    Sign,
    /// Signed and encrypted messages.
    SignAndEncrypt,
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Sign => "Sign",
            Self::SignAndEncrypt => "SignAndEncrypt",
        })
    }
}

impl FromStr for SecurityMode {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_name(s).as_str() {
            "none" => Ok(Self::None),
            "sign" => Ok(Self::Sign),
            "signandencrypt" | "signencrypt" => Ok(Self::SignAndEncrypt),
            _ => Err(OpcUaError::configuration(
                ConfigurationError::invalid_security_mode(s),
            )),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// Security policy of the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
    Aes128Sha256RsaOaep,
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    const NAMES: [(SecurityPolicy, &'static str); 6] = [
        (Self::None, "None"),
        (Self::Basic128Rsa15, "Basic128Rsa15"),
        (Self::Basic256, "Basic256"),
        (Self::Basic256Sha256, "Basic256Sha256"),
        (Self::Aes128Sha256RsaOaep, "Aes128Sha256RsaOaep"),
        (Self::Aes256Sha256RsaPss, "Aes256Sha256RsaPss"),
    ];
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::NAMES
            .iter()
            .find(|(policy, _)| policy == self)
            .map_or("None", |(_, name)| *name);
        f.write_str(name)
    }
}

impl FromStr for SecurityPolicy {
    type Err = OpcUaError;

    /// Accepts the short name or the full policy URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = fold_name(s.rsplit('#').next().unwrap_or(s));
        Self::NAMES
            .iter()
            .find(|(_, name)| fold_name(name) == wanted)
            .map(|(policy, _)| *policy)
            .ok_or_else(|| {
                OpcUaError::configuration(ConfigurationError::invalid_security_policy(s))
            })
    }
}

// =============================================================================
// UserIdentity
// =============================================================================

/// Identity the session is activated with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum UserIdentity {
    /// No user identity.
    #[default]
    Anonymous,
    /// Username and password.
    UserName {
        /// Login name.
        username: String,
        /// Password, sent encrypted when the channel is secure.
        password: String,
    },
    /// X.509 user certificate.
    Certificate {
        /// PEM or DER certificate file.
        certificate_path: String,
        /// Matching private key file.
        private_key_path: String,
    },
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::UserName { username, .. } => write!(f, "user {username}"),
            Self::Certificate {
                certificate_path, ..
            } => write!(f, "certificate {certificate_path}"),
        }
    }
}

// =============================================================================
// OpcUaConfig
// =============================================================================

/// Connection settings for one OPC UA server.
///
/// ```
/// use std::time::Duration;
/// use opcfetch_opcua::types::{OpcUaConfig, SecurityMode, SecurityPolicy};
///
/// let config = OpcUaConfig::builder()
///     .endpoint("opc.tcp://plc-01:4840")
///     .security_mode(SecurityMode::SignAndEncrypt)
///     .security_policy(SecurityPolicy::Basic256Sha256)
///     .username("operator", "secret")
///     .trust_all_certificates(true)
///     .request_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert!(config.uses_security());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpcUaConfig {
    /// `opc.tcp://host:port[/path]`
    pub endpoint: String,

    /// Message security mode; must be `none` exactly when the policy is.
    pub security_mode: SecurityMode,

    /// Security policy.
    pub security_policy: SecurityPolicy,

    /// Session identity.
    pub identity: UserIdentity,

    /// Application name presented to the server. Also the source of the
    /// application URI.
    pub application_name: String,

    #[serde(with = "humantime_serde")]
    /// Session lifetime requested from the server.
    pub session_timeout: Duration,

    /// Deadline for browse, translate and read calls.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Reconnect attempts per trigger, after the first.
    pub max_retries: u32,

    /// Base delay between reconnect attempts.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,

    /// Client certificate store. The stack's default is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pki_dir: Option<String>,

    /// Accept any server certificate. Test servers only.
    pub trust_all_certificates: bool,
}

impl Default for OpcUaConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            security_mode: SecurityMode::None,
            security_policy: SecurityPolicy::None,
            identity: UserIdentity::Anonymous,
            application_name: "opcfetch".to_string(),
            session_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            pki_dir: None,
            trust_all_certificates: false,
        }
    }
}

impl OpcUaConfig {
    /// Starts a builder with default settings.
    pub fn builder() -> OpcUaConfigBuilder {
        OpcUaConfigBuilder::default()
    }

    /// Default settings for `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Checks the endpoint scheme, the mode/policy pairing and the timeouts.
    pub fn validate(&self) -> Result<(), OpcUaError> {
        let invalid = |e: ConfigurationError| Err(OpcUaError::configuration(e));

        if self.endpoint.is_empty() {
            return invalid(ConfigurationError::missing_field("endpoint"));
        }
        if !self.endpoint.starts_with("opc.tcp://") {
            return invalid(ConfigurationError::invalid_endpoint(
                &self.endpoint,
                "only the opc.tcp:// scheme is supported",
            ));
        }
        if (self.security_mode == SecurityMode::None) != (self.security_policy == SecurityPolicy::None) {
            return invalid(ConfigurationError::invalid_security(format!(
                "security mode {} cannot be combined with policy {}",
                self.security_mode, self.security_policy
            )));
        }
        for (timeout, name) in [
            (self.session_timeout, "session_timeout"),
            (self.request_timeout, "request_timeout"),
        ] {
            if timeout.is_zero() {
                return invalid(ConfigurationError::invalid_timeout(
                    timeout,
                    format!("{name} must be non-zero"),
                ));
            }
        }
        Ok(())
    }

    /// `urn:opcfetch:<application name without spaces>`
    pub fn application_uri(&self) -> String {
        format!("urn:opcfetch:{}", self.application_name.replace(' ', ""))
    }

    /// `true` unless the channel is plain.
    #[inline]
    pub fn uses_security(&self) -> bool {
        self.security_mode != SecurityMode::None
    }
}

// =============================================================================
// OpcUaConfigBuilder
// =============================================================================

/// Builder for [`OpcUaConfig`]. [`build`](Self::build) validates.
#[derive(Debug, Default)]
pub struct OpcUaConfigBuilder {
    config: OpcUaConfig,
}

impl OpcUaConfigBuilder {
    /// Server endpoint. Required.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Message security mode.
    pub fn security_mode(mut self, mode: SecurityMode) -> Self {
        self.config.security_mode = mode;
        self
    }

    /// Security policy.
    pub fn security_policy(mut self, policy: SecurityPolicy) -> Self {
        self.config.security_policy = policy;
        self
    }

    /// Activates the session as `username`.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.identity = UserIdentity::UserName {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Deadline for browse, translate and read calls.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Reconnect attempts per trigger.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Base delay between reconnects.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    /// Client certificate store.
    pub fn pki_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.pki_dir = Some(dir.into());
        self
    }

    /// Accept any server certificate.
    pub fn trust_all_certificates(mut self, trust: bool) -> Self {
        self.config.trust_all_certificates = trust;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<OpcUaConfig, OpcUaError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

/// Serde adapter for [`Duration`] fields written as `5s`, `250ms`, `1m`.
pub mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Writes `duration` in humantime form.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    /// Parses a humantime duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_numeric() {
        let node: NodeId = "ns=2;i=58".parse().unwrap();
        assert_eq!(node, NodeId::numeric(2, 58));
        assert_eq!(node.to_string(), "ns=2;i=58");
    }

    #[test]
    fn test_node_id_parse_string_and_ns0() {
        let node: NodeId = "ns=3;s=Line1.Temp".parse().unwrap();
        assert_eq!(node, NodeId::string(3, "Line1.Temp"));

        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node, NodeId::OBJECTS_FOLDER);
        assert_eq!(node.to_string(), "i=85");
    }

    #[test]
    fn test_node_id_parse_opaque_roundtrip_text() {
        let node: NodeId = "ns=1;b=AQIDBA==".parse().unwrap();
        assert_eq!(node, NodeId::opaque(1, vec![1, 2, 3, 4]));
        assert_eq!(node.to_string(), "ns=1;b=AQIDBA==");
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=2;i=abc".parse::<NodeId>().is_err());
        assert!("ns=2;q=1".parse::<NodeId>().is_err());
        assert!("ns=2;g=not-a-guid".parse::<NodeId>().is_err());
        assert!("Temperature".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_identifier_kind_and_value() {
        assert_eq!(NodeIdentifier::Numeric(7).kind_name(), "numeric");
        assert_eq!(NodeIdentifier::String("a".into()).kind_name(), "string");
        assert_eq!(NodeIdentifier::Opaque(vec![1, 2, 3, 4]).kind_name(), "bytestring");
        assert_eq!(NodeIdentifier::Opaque(vec![1, 2, 3, 4]).value_text(), "AQIDBA==");

        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let node = NodeId::guid(1, uuid);
        assert_eq!(node.identifier.kind_name(), "guid");
        assert_eq!(node.identifier.value_text(), "550e8400-e29b-41d4-a716-446655440000");
        assert!(NodeId::numeric(0, 0).is_null());
        assert!(!NodeId::numeric(1, 0).is_null());
    }

    #[test]
    fn test_node_class() {
        assert!(NodeClass::Variable.has_value());
        assert!(!NodeClass::Object.has_value());
        assert_eq!(NodeClass::from_value(1), Some(NodeClass::Object));
        assert_eq!(NodeClass::from_value(2), Some(NodeClass::Variable));
        assert_eq!(NodeClass::from_value(128), Some(NodeClass::View));
        assert_eq!(NodeClass::from_value(3), None);
        assert_eq!(NodeClass::from_value(0), None);
        assert_eq!(NodeClass::from_value(256), None);
    }

    #[test]
    fn test_status_code() {
        assert!(StatusCode::GOOD.is_good());
        assert!(!StatusCode::GOOD.is_bad());
        assert!(StatusCode::BAD_NO_MATCH.is_bad());
        assert!(!StatusCode::BAD_NO_MATCH.is_good());
        // Uncertain
        assert!(!StatusCode(0x4000_0000).is_good());
        assert!(!StatusCode(0x4000_0000).is_bad());
        assert_eq!(StatusCode::BAD_NO_MATCH.name(), "BadNoMatch");
        assert_eq!(StatusCode::BAD_NO_MATCH.to_string(), "BadNoMatch (0x806F0000)");
    }

    #[test]
    fn test_data_type_sizes() {
        assert_eq!(OpcUaDataType::Boolean.byte_size(), Some(1));
        assert_eq!(OpcUaDataType::Double.byte_size(), Some(8));
        assert_eq!(OpcUaDataType::String.byte_size(), None);
        assert_eq!(OpcUaDataType::UInt16.to_string(), "UInt16");
    }

    #[test]
    fn test_security_parsing() {
        assert_eq!("sign_and_encrypt".parse::<SecurityMode>().unwrap(), SecurityMode::SignAndEncrypt);
        assert_eq!(
            "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256"
                .parse::<SecurityPolicy>()
                .unwrap(),
            SecurityPolicy::Basic256Sha256
        );
        assert_eq!(
            "aes128_sha256_rsa_oaep".parse::<SecurityPolicy>().unwrap(),
            SecurityPolicy::Aes128Sha256RsaOaep
        );
        assert_eq!(SecurityPolicy::Basic256.to_string(), "Basic256");
        assert!("bogus".parse::<SecurityPolicy>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = OpcUaConfig::builder()
            .endpoint("opc.tcp://localhost:4840")
            .username("admin", "pw")
            .max_retries(5)
            .build()
            .unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.identity.to_string(), "user admin");
        assert_eq!(config.application_uri(), "urn:opcfetch:opcfetch");
    }

    #[test]
    fn test_config_validation() {
        assert!(OpcUaConfig::new("opc.tcp://h:4840").validate().is_ok());
        assert!(OpcUaConfig::builder().build().is_err());
        assert!(OpcUaConfig::builder().endpoint("http://h:4840").build().is_err());
        assert!(OpcUaConfig::builder()
            .endpoint("opc.tcp://h:4840")
            .security_mode(SecurityMode::Sign)
            .build()
            .is_err());
        assert!(OpcUaConfig::builder()
            .endpoint("opc.tcp://h:4840")
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_config_deserialize_durations() {
        let json = r#"{"endpoint":"opc.tcp://h:4840","request_timeout":"2s","retry_delay":"250ms"}"#;
        let config: OpcUaConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }
}

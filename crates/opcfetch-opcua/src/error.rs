// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors of the OPC UA connection layer.
//!
//! Every failure [`Connection`](crate::Connection) reports is an
//! [`OpcUaError`]. The grouping answers three questions for the caller: is
//! it worth another attempt, is the session gone, and how loud should the log
//! line be.
//!
//! ```text
//! OpcUaError
//! ├── Connection    - no session, refused, dropped
//! ├── Security      - certificate and key material
//! ├── Browse        - browse and path translation
//! ├── Operation     - attribute reads, bad status
//! ├── Conversion    - values without a text form
//! ├── Configuration - invalid settings
//! └── Timeout       - request deadline exceeded
//! ```
//!
//! # Examples
//!
//! ```
//! use opcfetch_opcua::error::{OpcUaError, ConnectionError};
//!
//! let error = OpcUaError::connection(ConnectionError::refused("opc.tcp://localhost:4840"));
//! assert!(error.is_retryable());
//! assert!(error.is_connection_loss());
//! assert_eq!(error.error_code().to_string(), "UA-0101");
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

// =============================================================================
// OpcUaError
// =============================================================================

/// Any failure of the OPC UA connection layer.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Session level failure.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Certificate or key problem.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// Browse or translation failure.
    #[error(transparent)]
    Browse(#[from] BrowseError),

    /// Attribute read failure.
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Value without a text form.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Invalid settings.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A request overran its deadline.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Wraps a connection error.
    pub fn connection(error: ConnectionError) -> Self {
        error.into()
    }

    /// Wraps a security error.
    pub fn security(error: SecurityError) -> Self {
        error.into()
    }

    /// Wraps a browse error.
    pub fn browse(error: BrowseError) -> Self {
        error.into()
    }

    /// Wraps a read error.
    pub fn operation(error: OperationError) -> Self {
        error.into()
    }

    /// Wraps a conversion error.
    pub fn conversion(error: ConversionError) -> Self {
        error.into()
    }

    /// Wraps a configuration error.
    pub fn configuration(error: ConfigurationError) -> Self {
        error.into()
    }

    /// Wraps a timeout.
    pub fn timeout(error: TimeoutError) -> Self {
        error.into()
    }

    /// No session is open.
    pub fn not_connected() -> Self {
        ConnectionError::NotConnected.into()
    }

    /// Browsing `node_id` failed for a reason other than a status code.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        BrowseError::browse_failed(node_id, message).into()
    }

    /// Reading `node_id` failed for a reason other than a status code.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        OperationError::read_failed(node_id, message).into()
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Whether the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(e) => e.is_retryable(),
            Self::Browse(e) => e.is_retryable(),
            Self::Operation(e) => e.is_retryable(),
            Self::Timeout(_) => true,
            Self::Security(_) | Self::Conversion(_) | Self::Configuration(_) => false,
        }
    }

    /// The session itself is gone.
    ///
    /// A traversal stops at the first such error instead of skipping the
    /// branch; every later browse would fail the same way.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(TimeoutError::Connect { .. })
        )
    }

    /// Severity the error is logged with.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(ConnectionError::NotConnected | ConnectionError::Closed { .. }) => {
                ErrorSeverity::Warning
            }
            Self::Connection(_) | Self::Security(_) => ErrorSeverity::Error,
            Self::Browse(BrowseError::InvalidPath { .. }) => ErrorSeverity::Error,
            Self::Browse(_) | Self::Operation(_) | Self::Conversion(_) | Self::Timeout(_) => {
                ErrorSeverity::Warning
            }
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Short category name, used as a log field.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Security(_) => "security",
            Self::Browse(_) => "browse",
            Self::Operation(_) => "operation",
            Self::Conversion(_) => "conversion",
            Self::Configuration(_) => "configuration",
            Self::Timeout(_) => "timeout",
        }
    }

    /// `UA-XXYY` code: category byte, then the variant within it.
    pub fn error_code(&self) -> ErrorCode {
        let (category, index) = match self {
            Self::Connection(e) => (1, e.index()),
            Self::Security(e) => (3, e.index()),
            Self::Browse(e) => (4, e.index()),
            Self::Operation(e) => (5, e.index()),
            Self::Conversion(_) => (7, 1),
            Self::Configuration(e) => (8, e.index()),
            Self::Timeout(e) => (9, e.index()),
        };
        ErrorCode::new(category, index)
    }

    /// `tracing` level for [`severity`](Self::severity).
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Emits the error at its severity with code, category and `context`.
    pub fn log(&self, context: &str) {
        let code = self.error_code();
        let category = self.category();
        let retryable = self.is_retryable();

        match self.tracing_level() {
            Level::ERROR => {
                tracing::error!(error_code = %code, category, context, retryable, "{self}")
            }
            Level::WARN => {
                tracing::warn!(error_code = %code, category, context, retryable, "{self}")
            }
            _ => tracing::debug!(error_code = %code, category, context, retryable, "{self}"),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Session and endpoint errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The server could not be reached.
    #[error("connection to '{endpoint}' refused")]
    Refused {
        /// Target endpoint.
        endpoint: String,
    },

    /// Endpoint discovery or session activation failed.
    #[error("no session with '{endpoint}': {message}")]
    SessionFailed {
        /// Target endpoint.
        endpoint: String,
        /// What went wrong.
        message: String,
    },

    /// Every reconnect attempt of one call failed.
    #[error("gave up on '{endpoint}' after {attempts} attempt(s)")]
    ReconnectExhausted {
        /// Target endpoint.
        endpoint: String,
        /// Attempts made.
        attempts: u32,
    },

    /// An open session dropped.
    #[error("session closed{}", reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed {
        /// What the server or the stack reported, if anything.
        reason: Option<String>,
    },

    /// No session has been opened.
    #[error("not connected to an OPC UA server")]
    NotConnected,
}

impl ConnectionError {
    /// Unreachable `endpoint`.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
        }
    }

    /// Session setup with `endpoint` failed.
    pub fn session_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SessionFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// `attempts` reconnects to `endpoint` all failed.
    pub fn reconnect_exhausted(endpoint: impl Into<String>, attempts: u32) -> Self {
        Self::ReconnectExhausted {
            endpoint: endpoint.into(),
            attempts,
        }
    }

    /// Session dropped, optionally with a reason.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Everything but an exhausted reconnect may clear up by itself.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ReconnectExhausted { .. })
    }

    fn index(&self) -> u8 {
        match self {
            Self::Refused { .. } => 1,
            Self::SessionFailed { .. } => 2,
            Self::ReconnectExhausted { .. } => 3,
            Self::Closed { .. } => 4,
            Self::NotConnected => 5,
        }
    }
}

// =============================================================================
// SecurityError
// =============================================================================

/// Client certificate and private key problems.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Unusable certificate.
    #[error("certificate: {0}")]
    Certificate(String),

    /// Includes a wrong passphrase.
    #[error("private key: {0}")]
    PrivateKey(String),
}

impl SecurityError {
    /// Unusable certificate.
    pub fn certificate(message: impl Into<String>) -> Self {
        Self::Certificate(message.into())
    }

    /// Unusable private key.
    pub fn private_key(message: impl Into<String>) -> Self {
        Self::PrivateKey(message.into())
    }

    fn index(&self) -> u8 {
        match self {
            Self::Certificate(_) => 2,
            Self::PrivateKey(_) => 3,
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// Browse and browse-path translation errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// The browse service failed for one node.
    #[error("browse of '{node_id}' failed: {message}")]
    BrowseFailed {
        /// Node concerned.
        node_id: String,
        /// What went wrong.
        message: String,
        /// Server status, when the failure came with one.
        status_code: Option<u32>,
    },

    /// The server does not know the node.
    #[error("node '{node_id}' not found")]
    NodeNotFound {
        /// Node concerned.
        node_id: String,
    },

    /// Browse path text that does not parse.
    #[error("browse path '{path}' is invalid: {reason}")]
    InvalidPath {
        /// Path as given.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The translate service call itself was rejected.
    #[error("translating '{path}' failed: {}", OperationError::status_code_name(*status_code))]
    TranslationFailed {
        /// Path as given.
        path: String,
        /// Raw status code.
        status_code: u32,
    },
}

impl BrowseError {
    /// Browse failure without status.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Browse failure named after `status_code`.
    pub fn browse_failed_with_status(node_id: impl Into<String>, status_code: u32) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: OperationError::status_code_name(status_code).to_string(),
            status_code: Some(status_code),
        }
    }

    /// Unknown `node_id`.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Unparseable browse path.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Rejected translate call.
    pub fn translation_failed(path: impl Into<String>, status_code: u32) -> Self {
        Self::TranslationFailed {
            path: path.into(),
            status_code,
        }
    }

    /// Service failures may pass; a missing node or a bad path will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BrowseFailed { .. } | Self::TranslationFailed { .. })
    }

    fn index(&self) -> u8 {
        match self {
            Self::BrowseFailed { .. } => 1,
            Self::NodeNotFound { .. } => 2,
            Self::InvalidPath { .. } => 3,
            Self::TranslationFailed { .. } => 4,
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Attribute read errors.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The read call failed.
    #[error("read of '{node_id}' failed: {message}")]
    ReadFailed {
        /// Node concerned.
        node_id: String,
        /// What went wrong.
        message: String,
        /// Server status, when the failure came with one.
        status_code: Option<u32>,
    },

    /// The call completed but the service status was bad.
    #[error("'{node_id}' answered {} (0x{status_code:08X})", OperationError::status_code_name(*status_code))]
    BadStatus {
        /// Node concerned.
        node_id: String,
        /// Raw status code.
        status_code: u32,
    },
}

/// Status codes whose read failures are transient.
const TRANSIENT_CODES: [u32; 4] = [
    0x8004_0000, // BadResourceUnavailable
    0x8005_0000, // BadCommunicationError
    0x800A_0000, // BadTimeout
    0x8010_0000, // BadTooManyOperations
];

/// Symbolic names, keyed on severity and sub-code bits.
const STATUS_NAMES: &[(u32, &str)] = &[
    (0x0000_0000, "Good"),
    (0x4000_0000, "Uncertain"),
    (0x8000_0000, "Bad"),
    (0x8001_0000, "BadUnexpectedError"),
    (0x8002_0000, "BadInternalError"),
    (0x8003_0000, "BadOutOfMemory"),
    (0x8004_0000, "BadResourceUnavailable"),
    (0x8005_0000, "BadCommunicationError"),
    (0x8006_0000, "BadEncodingError"),
    (0x8007_0000, "BadDecodingError"),
    (0x800A_0000, "BadTimeout"),
    (0x800B_0000, "BadServiceUnsupported"),
    (0x800C_0000, "BadShutdown"),
    (0x800D_0000, "BadServerNotConnected"),
    (0x800E_0000, "BadServerHalted"),
    (0x800F_0000, "BadNothingToDo"),
    (0x8010_0000, "BadTooManyOperations"),
    (0x801F_0000, "BadUserAccessDenied"),
    (0x8025_0000, "BadSessionIdInvalid"),
    (0x8026_0000, "BadSessionClosed"),
    (0x8027_0000, "BadSessionNotActivated"),
    (0x8033_0000, "BadNodeIdInvalid"),
    (0x8034_0000, "BadNodeIdUnknown"),
    (0x8035_0000, "BadAttributeIdInvalid"),
    (0x803B_0000, "BadNotReadable"),
    (0x804E_0000, "BadContinuationPointInvalid"),
    (0x804F_0000, "BadNoContinuationPoints"),
    (0x8050_0000, "BadReferenceTypeIdInvalid"),
    (0x8051_0000, "BadBrowseDirectionInvalid"),
    (0x8052_0000, "BadNodeNotInView"),
    (0x805F_0000, "BadBrowseNameInvalid"),
    (0x806F_0000, "BadNoMatch"),
    (0x808A_0000, "BadNotConnected"),
    (0x80AB_0000, "BadTooManyMatches"),
    (0x80AE_0000, "BadConnectionClosed"),
];

impl OperationError {
    /// Read failure without status.
    pub fn read_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            node_id: node_id.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Read completed with a bad `status_code`.
    pub fn bad_status(node_id: impl Into<String>, status_code: u32) -> Self {
        Self::BadStatus {
            node_id: node_id.into(),
            status_code,
        }
    }

    /// Symbolic name of `code`; the info bits are ignored.
    pub fn status_code_name(code: u32) -> &'static str {
        let key = code & 0xFFFF_0000;
        STATUS_NAMES
            .iter()
            .find(|(bits, _)| *bits == key)
            .map_or("Unknown", |(_, name)| name)
    }

    /// A read without status may pass next time; with one, only transient
    /// server conditions do.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ReadFailed { status_code, .. } => status_code
                .map_or(true, |code| TRANSIENT_CODES.contains(&(code & 0xFFFF_0000))),
            Self::BadStatus { .. } => false,
        }
    }

    fn index(&self) -> u8 {
        match self {
            Self::ReadFailed { .. } => 1,
            Self::BadStatus { .. } => 2,
        }
    }
}

// =============================================================================
// ConversionError
// =============================================================================

/// A value that has no text form.
#[derive(Debug, Error)]
#[error("{type_name} values cannot be rendered as text")]
pub struct ConversionError {
    /// OPC UA type name of the value.
    pub type_name: String,
}

impl ConversionError {
    /// Value of `type_name` has no text form.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Invalid connection or security settings.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ConfigurationError {
    /// Endpoint URL rejected.
    #[error("endpoint '{url}' is invalid: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Node id text rejected.
    #[error("node id '{node_id}' is invalid: {reason}")]
    InvalidNodeId { node_id: String, reason: String },

    /// Mode and policy do not fit together.
    #[error("invalid security settings: {message}")]
    InvalidSecurity { message: String },

    /// Zero or otherwise unusable timeout.
    #[error("timeout {duration:?} is invalid: {reason}")]
    InvalidTimeout { duration: Duration, reason: String },

    /// A required setting is absent.
    #[error("'{field}' is required")]
    MissingField { field: String },

    /// A configured certificate, key or CA file does not exist.
    #[error("{kind} file '{path}' not found")]
    FileNotFound {
        /// `certificate`, `private key`, `CA certificate`.
        kind: String,
        /// Path as given.
        path: String,
    },

    /// Unknown mode name.
    #[error("unknown security mode '{0}'")]
    InvalidSecurityMode(String),

    /// Unknown policy name.
    #[error("unknown security policy '{0}'")]
    InvalidSecurityPolicy(String),
}

impl ConfigurationError {
    /// See [`Self::InvalidEndpoint`].
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// See [`Self::InvalidNodeId`].
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// See [`Self::InvalidSecurity`].
    pub fn invalid_security(message: impl Into<String>) -> Self {
        Self::InvalidSecurity {
            message: message.into(),
        }
    }

    /// See [`Self::InvalidTimeout`].
    pub fn invalid_timeout(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            duration,
            reason: reason.into(),
        }
    }

    /// See [`Self::MissingField`].
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// See [`Self::FileNotFound`].
    pub fn file_not_found(kind: impl Into<String>, path: impl Into<String>) -> Self {
        Self::FileNotFound {
            kind: kind.into(),
            path: path.into(),
        }
    }

    /// See [`Self::InvalidSecurityMode`].
    pub fn invalid_security_mode(mode: impl Into<String>) -> Self {
        Self::InvalidSecurityMode(mode.into())
    }

    /// See [`Self::InvalidSecurityPolicy`].
    pub fn invalid_security_policy(policy: impl Into<String>) -> Self {
        Self::InvalidSecurityPolicy(policy.into())
    }

    fn index(&self) -> u8 {
        match self {
            Self::InvalidEndpoint { .. } => 1,
            Self::InvalidNodeId { .. } => 2,
            Self::InvalidSecurity { .. } => 3,
            Self::InvalidTimeout { .. } => 4,
            Self::MissingField { .. } => 5,
            Self::FileNotFound { .. } => 6,
            Self::InvalidSecurityMode(_) => 7,
            Self::InvalidSecurityPolicy(_) => 8,
        }
    }
}

// =============================================================================
// TimeoutError
// =============================================================================

/// A call ran past the request timeout.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum TimeoutError {
    /// Connect overran.
    #[error("connect did not finish within {limit:?}")]
    Connect { limit: Duration },

    /// Browse overran.
    #[error("browse did not finish within {limit:?}")]
    Browse { limit: Duration },

    /// Read overran.
    #[error("read did not finish within {limit:?}")]
    Read { limit: Duration },

    /// Translation overran.
    #[error("path translation did not finish within {limit:?}")]
    Translate { limit: Duration },
}

impl TimeoutError {
    /// Connect overran `limit`.
    pub fn connect(limit: Duration) -> Self {
        Self::Connect { limit }
    }

    /// Browse overran `limit`.
    pub fn browse(limit: Duration) -> Self {
        Self::Browse { limit }
    }

    /// Read overran `limit`.
    pub fn read(limit: Duration) -> Self {
        Self::Read { limit }
    }

    /// Translation overran `limit`.
    pub fn translate(limit: Duration) -> Self {
        Self::Translate { limit }
    }

    fn index(&self) -> u8 {
        match self {
            Self::Connect { .. } => 1,
            Self::Browse { .. } => 2,
            Self::Read { .. } => 3,
            Self::Translate { .. } => 4,
        }
    }
}

/// Runs `call`, failing with `timeout(limit)` when it overruns `limit`.
///
/// `None` waits indefinitely.
pub(crate) async fn with_deadline<R, F>(
    limit: Option<Duration>,
    timeout: fn(Duration) -> TimeoutError,
    call: F,
) -> OpcUaResult<R>
where
    F: Future<Output = OpcUaResult<R>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(timeout(limit).into())),
        None => call.await,
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// How loud an error is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Expected outcome.
    Info,
    /// The run continues.
    Warning,
    /// The operation failed.
    Error,
    /// Nothing runs until the configuration is fixed.
    Critical,
}

impl ErrorSeverity {
    /// Matching `tracing` level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured code rendered as `UA-XXYY`.
///
/// Categories: 1 connection, 3 security, 4 browse, 5 operation,
/// 7 conversion, 8 configuration, 9 timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category byte.
    pub category: u8,
    /// Variant within the category, starting at 1.
    pub code: u8,
}

impl ErrorCode {
    /// Code `category`/`code`.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

/// Result alias for the connection layer.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_end_traversal() {
        assert!(OpcUaError::not_connected().is_connection_loss());
        assert!(OpcUaError::timeout(TimeoutError::connect(Duration::from_secs(1))).is_connection_loss());
        assert!(!OpcUaError::browse_failed("ns=2;i=1", "BadNodeIdUnknown").is_connection_loss());
        assert!(!OpcUaError::timeout(TimeoutError::read(Duration::from_secs(1))).is_connection_loss());
    }

    #[test]
    fn test_retryable() {
        assert!(OpcUaError::connection(ConnectionError::refused("opc.tcp://h:4840")).is_retryable());
        assert!(!OpcUaError::connection(ConnectionError::reconnect_exhausted("opc.tcp://h:4840", 3))
            .is_retryable());
        assert!(!OpcUaError::conversion(ConversionError::unsupported_type("Array")).is_retryable());
        assert!(!OpcUaError::configuration(ConfigurationError::missing_field("endpoint"))
            .is_retryable());
        assert!(OpcUaError::timeout(TimeoutError::browse(Duration::from_secs(1))).is_retryable());
    }

    #[test]
    fn test_read_retryable_by_status() {
        assert!(OperationError::read_failed("ns=2;i=5", "io").is_retryable());
        let transient = OperationError::ReadFailed {
            node_id: "ns=2;i=5".into(),
            message: "BadTimeout".into(),
            status_code: Some(0x800A_0000),
        };
        assert!(transient.is_retryable());
        let permanent = OperationError::ReadFailed {
            node_id: "ns=2;i=5".into(),
            message: "BadNotReadable".into(),
            status_code: Some(0x803B_0000),
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_status_code_names() {
        assert_eq!(OperationError::status_code_name(0), "Good");
        assert_eq!(OperationError::status_code_name(0x806F_0000), "BadNoMatch");
        assert_eq!(OperationError::status_code_name(0x8034_0000), "BadNodeIdUnknown");
        // info bits
        assert_eq!(OperationError::status_code_name(0x8034_0400), "BadNodeIdUnknown");
        assert_eq!(OperationError::status_code_name(0x8FFF_0000), "Unknown");
    }

    #[test]
    fn test_translation_failed_message() {
        let text = BrowseError::translation_failed("Objects/Sensor1", 0x806F_0000).to_string();
        assert!(text.contains("Objects/Sensor1"));
        assert!(text.contains("BadNoMatch"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::new(4, 4).to_string(), "UA-0404");
        assert_eq!(OpcUaError::not_connected().error_code().to_string(), "UA-0105");
        assert_eq!(
            OpcUaError::timeout(TimeoutError::translate(Duration::from_secs(1)))
                .error_code()
                .to_string(),
            "UA-0904"
        );
        assert_eq!(
            OpcUaError::security(SecurityError::private_key("bad passphrase"))
                .error_code()
                .to_string(),
            "UA-0303"
        );
    }

    #[test]
    fn test_severity_and_category() {
        let error = OpcUaError::configuration(ConfigurationError::missing_field("endpoint"));
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert_eq!(error.tracing_level(), Level::ERROR);
        assert_eq!(error.category(), "configuration");

        let error = OpcUaError::not_connected();
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.category(), "connection");

        let error = OpcUaError::browse(BrowseError::invalid_path("//", "empty segment"));
        assert_eq!(error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_closed_message() {
        assert_eq!(
            ConnectionError::closed(Some("server shutdown".into())).to_string(),
            "session closed: server shutdown"
        );
        assert_eq!(ConnectionError::closed(None).to_string(), "session closed");
    }

    #[tokio::test]
    async fn test_with_deadline() {
        let ok = with_deadline(Some(Duration::from_secs(1)), TimeoutError::read, async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let slow = with_deadline(Some(Duration::from_millis(10)), TimeoutError::read, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(slow, Err(OpcUaError::Timeout(TimeoutError::Read { .. }))));

        let unbounded = with_deadline(None, TimeoutError::read, async { Ok("done") }).await;
        assert_eq!(unbounded.unwrap(), "done");
    }
}

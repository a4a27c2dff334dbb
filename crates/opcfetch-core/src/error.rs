// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error type of the fetch processor.
//!
//! ```text
//! FetchError
//! ├── Configuration - invalid or missing properties; no trigger runs until fixed
//! ├── Connectivity  - no session; the trigger backs off
//! ├── Translation   - browse path lookup failed; the trigger backs off
//! ├── Extraction    - one node could not be read or stringified; skipped
//! └── Emission      - record creation or content write failed
//! ```
//!
//! Only the first three ever end a trigger. Extraction and emission errors
//! are contained to the node they happened on.
//!
//! # Examples
//!
//! ```
//! use opcfetch_core::error::FetchError;
//!
//! let error = FetchError::configuration("Namespace index", "required unless Node ID type is Path");
//! assert!(error.causes_backoff());
//! assert_eq!(error.category(), "configuration");
//! ```

use std::fmt;

use opcfetch_opcua::{ErrorSeverity, OpcUaError, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn, Level};

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

// =============================================================================
// EmissionStage
// =============================================================================

/// Where in the record lifecycle an emission failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmissionStage {
    /// The sink could not allocate a record.
    Create,
    /// The content could not be written into the record.
    Write,
    /// The record could not be handed to its route.
    Transfer,
}

impl fmt::Display for EmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Write => f.write_str("write"),
            Self::Transfer => f.write_str("transfer"),
        }
    }
}

// =============================================================================
// FetchError
// =============================================================================

/// Fetch processor errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A property is missing or invalid.
    #[error("Invalid property '{property}': {message}")]
    Configuration {
        /// Property name.
        property: String,
        /// What is wrong with it.
        message: String,
    },

    /// No usable session.
    #[error("Unable to connect to '{endpoint}'")]
    Connectivity {
        /// Server endpoint.
        endpoint: String,
    },

    /// A browse path could not be resolved.
    #[error("Failed to translate '{path}' to node ids: {reason}")]
    Translation {
        /// The browse path.
        path: String,
        /// Human-readable reason.
        reason: String,
        /// Service status, when the server answered.
        status: Option<StatusCode>,
        /// Transport failure, when it did not.
        #[source]
        source: Option<OpcUaError>,
    },

    /// Node data could not be retrieved or rendered.
    #[error("Failed to extract data of node '{path}': {source}")]
    Extraction {
        /// Full path of the node.
        path: String,
        /// Underlying failure.
        #[source]
        source: OpcUaError,
    },

    /// A record could not be created, written or transferred.
    #[error("Record {stage} failed: {message}")]
    Emission {
        /// Failing stage.
        stage: EmissionStage,
        /// Error message.
        message: String,
    },
}

impl FetchError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a configuration error.
    pub fn configuration(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Creates a connectivity error.
    pub fn connectivity(endpoint: impl Into<String>) -> Self {
        Self::Connectivity {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a translation error for a non-Good service status.
    pub fn translation_status(path: impl Into<String>, status: StatusCode) -> Self {
        Self::Translation {
            path: path.into(),
            reason: status.to_string(),
            status: Some(status),
            source: None,
        }
    }

    /// Creates a translation error for a transport failure.
    pub fn translation_failed(path: impl Into<String>, source: OpcUaError) -> Self {
        Self::Translation {
            path: path.into(),
            reason: source.to_string(),
            status: None,
            source: Some(source),
        }
    }

    /// Creates an extraction error.
    pub fn extraction(path: impl Into<String>, source: impl Into<OpcUaError>) -> Self {
        Self::Extraction {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Creates an emission error.
    pub fn emission(stage: EmissionStage, message: impl Into<String>) -> Self {
        Self::Emission {
            stage,
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns `true` if this error ends the trigger with a yield.
    pub fn causes_backoff(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Connectivity { .. } | Self::Translation { .. }
        )
    }

    /// Returns `true` if a later trigger may succeed without reconfiguration.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration { .. } => false,
            Self::Connectivity { .. } | Self::Translation { .. } => true,
            Self::Extraction { source, .. } => source.is_retryable(),
            Self::Emission { .. } => true,
        }
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Configuration { .. } => ErrorSeverity::Critical,
            Self::Connectivity { .. } => ErrorSeverity::Error,
            Self::Translation { .. } => ErrorSeverity::Error,
            Self::Extraction { .. } => ErrorSeverity::Warning,
            Self::Emission {
                stage: EmissionStage::Write,
                ..
            } => ErrorSeverity::Info,
            Self::Emission { .. } => ErrorSeverity::Error,
        }
    }

    /// Returns the category name for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Connectivity { .. } => "connectivity",
            Self::Translation { .. } => "translation",
            Self::Extraction { .. } => "extraction",
            Self::Emission { .. } => "emission",
        }
    }

    /// Logs the error at the level derived from its severity.
    pub fn log(&self, context: &str) {
        let category = self.category();
        match self.severity().to_tracing_level() {
            Level::ERROR => error!(category, context, error = %self, "Fetch error"),
            Level::WARN => warn!(category, context, error = %self, "Fetch error"),
            Level::INFO => info!(category, context, error = %self, "Fetch error"),
            Level::DEBUG => debug!(category, context, error = %self, "Fetch error"),
            _ => trace!(category, context, error = %self, "Fetch error"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use opcfetch_opcua::{ConversionError, OperationError};

    #[test]
    fn test_backoff_classification() {
        assert!(FetchError::configuration("Node ID", "required").causes_backoff());
        assert!(FetchError::connectivity("opc.tcp://plc:4840").causes_backoff());
        assert!(FetchError::translation_status("/Root/Objects/X", StatusCode::BAD_NO_MATCH)
            .causes_backoff());

        let extraction = FetchError::extraction(
            "/Objects/Temp",
            OpcUaError::operation(OperationError::read_failed("ns=2;i=5", "timeout")),
        );
        assert!(!extraction.causes_backoff());
        assert!(!FetchError::emission(EmissionStage::Write, "disk full").causes_backoff());
    }

    #[test]
    fn test_translation_status_message() {
        let error = FetchError::translation_status("/Root/Objects/Sensor1", StatusCode::BAD_NO_MATCH);
        let message = error.to_string();
        assert!(message.contains("/Root/Objects/Sensor1"));
        assert!(message.contains("BadNoMatch"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_extraction_from_conversion() {
        let error = FetchError::extraction(
            "/Objects/Arr",
            OpcUaError::conversion(ConversionError::unsupported_type("Array")),
        );
        assert_eq!(error.category(), "extraction");
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_configuration_not_retryable() {
        let error = FetchError::configuration("Node ID type", "'Float' is not a valid node ID type");
        assert!(!error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(error.to_string().contains("Node ID type"));
    }
}

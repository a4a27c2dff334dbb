// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the opcfetch binary.

use thiserror::Error;

use opcfetch_core::FetchError;
use opcfetch_opcua::OpcUaError;

/// Result type alias for opcfetch-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the opcfetch binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Startup failed.
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// The run loop failed.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Processor error.
    #[error("Processor error: {0}")]
    Fetch(#[from] FetchError),

    /// OPC UA error.
    #[error("OPC UA error: {0}")]
    OpcUa(#[from] OpcUaError),

    /// Error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Creates a runtime error.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Fetch(FetchError::Configuration { .. }) => 1,
            Self::Initialization(_) => 2,
            Self::Runtime(_) => 3,
            Self::Io(_) => 4,
            Self::Fetch(_) => 5,
            Self::OpcUa(_) => 6,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{err:#}"))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints `error` and its cause chain to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {cause}");
        source = cause.source();
    }
}

/// Reports an error and exits with its exit code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BinError::config("missing endpoint");
        assert_eq!(err.to_string(), "Configuration error: missing endpoint");
    }

    #[test]
    fn test_error_with_context() {
        let err = BinError::io("disk full").with_context("opening output");
        assert_eq!(err.to_string(), "opening output: I/O error: disk full");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("x").exit_code(), 1);
        assert_eq!(BinError::init("x").exit_code(), 2);
        assert_eq!(BinError::runtime("x").exit_code(), 3);
        assert_eq!(BinError::io("x").exit_code(), 4);
        assert_eq!(
            BinError::from(FetchError::configuration("Node ID", "required")).exit_code(),
            1
        );
        assert_eq!(BinError::from(FetchError::connectivity("opc.tcp://x:4840")).exit_code(), 5);
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: BinError = anyhow::anyhow!("boom").context("loop").into();
        assert!(matches!(err, BinError::Runtime(ref msg) if msg == "loop: boom"));
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration file loading.
//!
//! # Loading Pipeline
//!
//! 1. Read the file; the format follows the extension (YAML, TOML, JSON)
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders
//! 3. Parse into [`FetchConfig`]
//! 4. Apply `OPCFETCH_*` environment overrides
//! 5. Validate
//!
//! # Example
//!
//! ```yaml
//! opcua:
//!   endpoint: "opc.tcp://${PLC_HOST:localhost}:4840"
//!   security_mode: none
//! properties:
//!   Node ID: "/Root/Objects/Plant"
//!   Node ID type: Path
//!   Max depth: 3
//! schedule:
//!   interval: 10s
//!   yield_duration: 30s
//! output:
//!   path: records.jsonl
//! ```
//!
//! # Environment Overrides
//!
//! ```text
//! OPCFETCH_ENDPOINT=opc.tcp://plc:4840
//! OPCFETCH_NODE_ID=58
//! OPCFETCH_NODE_ID_TYPE=Int
//! OPCFETCH_NAMESPACE_INDEX=2
//! OPCFETCH_MAX_DEPTH=0
//! OPCFETCH_INTERVAL=10s
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use opcfetch_core::properties::{MAX_DEPTH, NAMESPACE_INDEX, NODE_ID, NODE_ID_TYPE};
use opcfetch_core::{FetchProperties, IdentifierConfig};
use opcfetch_opcua::types::humantime_serde;
use opcfetch_opcua::{OpcUaConfig, TlsSettings};

use crate::cli::LogFormat;
use crate::error::{BinError, BinResult};

// =============================================================================
// FetchConfig
// =============================================================================

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Server connection.
    pub opcua: OpcUaConfig,

    /// Processor properties.
    #[serde(default)]
    pub properties: FetchProperties,

    /// Client credentials.
    #[serde(default)]
    pub tls: TlsSettings,

    /// Trigger cadence.
    #[serde(default)]
    pub schedule: ScheduleSettings,

    /// Record output.
    #[serde(default)]
    pub output: OutputSettings,

    /// Logging defaults; CLI flags win.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FetchConfig {
    /// Validates the configuration and returns non-fatal warnings.
    pub fn validate(&self) -> BinResult<Vec<String>> {
        self.opcua
            .validate()
            .map_err(|e| BinError::from(e).with_context("opcua"))?;
        IdentifierConfig::from_properties(&self.properties)
            .map_err(|e| BinError::from(e).with_context("properties"))?;

        if self.schedule.interval.is_zero() {
            return Err(BinError::config("schedule.interval must be greater than 0"));
        }

        let mut warnings = Vec::new();
        if self.opcua.trust_all_certificates {
            warnings.push("Server certificates are trusted without verification".to_string());
        }
        if self.opcua.uses_security() && self.tls.certificate.is_none() {
            warnings.push(
                "Message security is enabled but no client certificate is configured".to_string(),
            );
        }
        if self.tls.passphrase.is_some() && self.tls.private_key.is_none() {
            warnings.push("A passphrase is configured without a private key".to_string());
        }
        if !self.output.include_failure {
            warnings.push("Records routed to failure are discarded".to_string());
        }
        if self.schedule.yield_duration < self.schedule.interval {
            warnings.push(format!(
                "schedule.yield_duration ({}) is shorter than schedule.interval ({})",
                humantime::format_duration(self.schedule.yield_duration),
                humantime::format_duration(self.schedule.interval)
            ));
        }
        Ok(warnings)
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Trigger cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Delay between triggers.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Delay after a trigger that asked the host to yield.
    #[serde(with = "humantime_serde")]
    pub yield_duration: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            yield_duration: Duration::from_secs(30),
        }
    }
}

/// Where records go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// JSON-lines file to append to; stdout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Also write records routed to failure.
    pub include_failure: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: None,
            include_failure: true,
        }
    }
}

/// Logging defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level directive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Output format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML.
    Yaml,
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file extension.
    pub fn from_path(path: &Path) -> BinResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(BinError::config(format!("unsupported config format: {other}"))),
            None => Err(BinError::config(format!(
                "cannot determine config format of {}",
                path.display()
            ))),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`FetchConfig`] files.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Loader with the `OPCFETCH` prefix and placeholder resolution on.
    pub fn new() -> Self {
        Self {
            env_prefix: "OPCFETCH".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment override prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholders and environment overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads and validates `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> BinResult<FetchConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        if !path.exists() {
            return Err(BinError::config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path)
            .map_err(|e| BinError::io(e.to_string()).with_context(path.display().to_string()))?;

        self.load_from_str(&content, format)
            .map_err(|e| e.with_context(path.display().to_string()))
    }

    /// Loads and validates configuration text.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> BinResult<FetchConfig> {
        let content = if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config: FetchConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| BinError::config(e.to_string()))?,
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| BinError::config(e.to_string()))?,
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| BinError::config(e.to_string()))?,
        };

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        for warning in config.validate()? {
            warn!("{warning}");
        }
        debug!(endpoint = %config.opcua.endpoint, "Configuration loaded");
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut FetchConfig) -> BinResult<()> {
        let var = |suffix: &str| env::var(format!("{}_{}", self.env_prefix, suffix)).ok();

        if let Some(endpoint) = var("ENDPOINT") {
            config.opcua.endpoint = endpoint;
        }
        for (suffix, property) in [
            ("NODE_ID", NODE_ID),
            ("NODE_ID_TYPE", NODE_ID_TYPE),
            ("NAMESPACE_INDEX", NAMESPACE_INDEX),
            ("MAX_DEPTH", MAX_DEPTH),
        ] {
            if let Some(value) = var(suffix) {
                debug!(property, "Property overridden from environment");
                config.properties.set(property, value);
            }
        }
        if let Some(value) = var("INTERVAL") {
            config.schedule.interval = humantime::parse_duration(&value).map_err(|e| {
                BinError::config(format!("{}_INTERVAL: {e}", self.env_prefix))
            })?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
///
/// An unset variable without a default is left as written.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let placeholder = &after[..end];
        let (name, default) = match placeholder.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (placeholder, None),
        };
        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!(variable = name, "Environment variable not set");
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    result
}

/// Loads `path` with the default loader.
pub fn load_config(path: impl AsRef<Path>) -> BinResult<FetchConfig> {
    ConfigLoader::new().load(path)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const YAML: &str = r#"
opcua:
  endpoint: "opc.tcp://localhost:4840"
properties:
  Node ID: "58"
  Node ID type: Int
  Namespace index: 2
schedule:
  interval: 2s
  yield_duration: 1m
output:
  path: out.jsonl
  include_failure: false
logging:
  level: debug
  format: json
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_load_yaml() {
        let file = write_temp(".yaml", YAML);
        let config = ConfigLoader::new().with_env_vars(false).load(file.path()).unwrap();

        assert_eq!(config.opcua.endpoint, "opc.tcp://localhost:4840");
        assert_eq!(config.properties.get(NODE_ID), Some("58"));
        assert_eq!(config.properties.get(NAMESPACE_INDEX), Some("2"));
        assert_eq!(config.schedule.interval, Duration::from_secs(2));
        assert_eq!(config.schedule.yield_duration, Duration::from_secs(60));
        assert_eq!(config.output.path, Some(PathBuf::from("out.jsonl")));
        assert!(!config.output.include_failure);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format, Some(LogFormat::Json));
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let toml = r#"
[opcua]
endpoint = "opc.tcp://plc:4840"

[properties]
node_id = "/Root/Objects/Plant"
node_id_type = "Path"
"#;
        let file = write_temp(".toml", toml);
        let config = ConfigLoader::new().with_env_vars(false).load(file.path()).unwrap();

        assert_eq!(config.schedule, ScheduleSettings::default());
        assert_eq!(config.output, OutputSettings::default());
        assert!(config.tls.is_empty());
    }

    #[test]
    fn test_load_json() {
        let json = r#"{
            "opcua": { "endpoint": "opc.tcp://plc:4840" },
            "properties": { "Node ID": "Boiler", "Node ID type": "String", "Namespace index": 3 },
            "tls": { "passphrase": "s3cret" }
        }"#;
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(json, ConfigFormat::Json)
            .unwrap();

        assert_eq!(config.properties.get(NODE_ID_TYPE), Some("String"));
        assert_eq!(config.tls.passphrase.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_properties_rejected() {
        let yaml = r#"
opcua:
  endpoint: "opc.tcp://localhost:4840"
properties:
  Node ID: tempSensor
  Node ID type: String
"#;
        let err = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(yaml, ConfigFormat::Yaml)
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().starts_with("properties"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let yaml = r#"
opcua:
  endpoint: "http://localhost:4840"
properties:
  Node ID: "58"
  Node ID type: Int
  Namespace index: 2
"#;
        assert!(ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(yaml, ConfigFormat::Yaml)
            .is_err());
    }

    #[test]
    fn test_file_not_found() {
        let err = ConfigLoader::new().load("/nonexistent/opcfetch.yaml").unwrap_err();
        assert!(matches!(err, BinError::Configuration(_)));
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let resolved = resolve_env_placeholders("host: ${OPCFETCH_TEST_UNSET_HOST:plc01}:4840");
        assert_eq!(resolved, "host: plc01:4840");
    }

    #[test]
    fn test_env_placeholder_from_environment() {
        env::set_var("OPCFETCH_TEST_PLACEHOLDER_PORT", "4841");
        let resolved = resolve_env_placeholders("port: ${OPCFETCH_TEST_PLACEHOLDER_PORT}");
        assert_eq!(resolved, "port: 4841");
    }

    #[test]
    fn test_env_placeholder_unset_kept() {
        let resolved = resolve_env_placeholders("a: ${OPCFETCH_TEST_NEVER_SET} b: ${unterminated");
        assert_eq!(resolved, "a: ${OPCFETCH_TEST_NEVER_SET} b: ${unterminated");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("OPCFETCHOVR_ENDPOINT", "opc.tcp://override:4840");
        env::set_var("OPCFETCHOVR_NODE_ID", "77");
        env::set_var("OPCFETCHOVR_MAX_DEPTH", "4");

        let config = ConfigLoader::new()
            .with_env_prefix("OPCFETCHOVR")
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(config.opcua.endpoint, "opc.tcp://override:4840");
        assert_eq!(config.properties.get(NODE_ID), Some("77"));
        assert_eq!(config.properties.get(MAX_DEPTH), Some("4"));
    }

    #[test]
    fn test_validate_warnings() {
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.contains("failure are discarded")));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(YAML, ConfigFormat::Yaml)
            .unwrap();
        config.schedule.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}

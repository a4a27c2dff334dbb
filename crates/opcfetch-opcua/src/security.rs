// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Secure transport context.
//!
//! [`TlsSettings`] names the credential files; a [`SecureContextProvider`]
//! turns them into a [`SecureTransportContext`] with every path checked and
//! the passphrase loaded. Parsing the credentials is left to the transport.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{ConfigurationError, OpcUaError, OpcUaResult, SecurityError};

// =============================================================================
// TlsSettings
// =============================================================================

/// Credential file locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    /// Client certificate file.
    pub certificate: Option<PathBuf>,

    /// Private key file for `certificate`.
    pub private_key: Option<PathBuf>,

    /// CA certificate used to verify the server.
    pub ca_certificate: Option<PathBuf>,

    /// Key passphrase, or the path of a file containing it.
    pub passphrase: Option<String>,

    /// Directory searched when a configured path does not exist as given.
    pub default_dir: Option<PathBuf>,
}

impl TlsSettings {
    /// Returns `true` if nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.certificate.is_none()
            && self.private_key.is_none()
            && self.ca_certificate.is_none()
            && self.passphrase.is_none()
    }
}

// =============================================================================
// SecureTransportContext
// =============================================================================

/// Resolved credentials, ready to hand to a transport.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecureTransportContext {
    /// Client certificate.
    pub certificate: Option<PathBuf>,

    /// Private key.
    pub private_key: Option<PathBuf>,

    /// CA certificate.
    pub ca_certificate: Option<PathBuf>,

    /// Key passphrase.
    pub passphrase: Option<String>,

    /// File the passphrase was read from, if any.
    pub passphrase_file: Option<PathBuf>,
}

impl SecureTransportContext {
    /// Returns `true` if a client identity is available.
    pub fn has_client_identity(&self) -> bool {
        self.certificate.is_some() && self.private_key.is_some()
    }
}

impl std::fmt::Debug for SecureTransportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTransportContext")
            .field("certificate", &self.certificate)
            .field("private_key", &self.private_key)
            .field("ca_certificate", &self.ca_certificate)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .field("passphrase_file", &self.passphrase_file)
            .finish()
    }
}

// =============================================================================
// SecureContextProvider
// =============================================================================

/// Source of a [`SecureTransportContext`].
#[async_trait]
pub trait SecureContextProvider: Send + Sync {
    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Fails when a configured credential file cannot be found.
    async fn secure_context(&self) -> OpcUaResult<SecureTransportContext>;
}

/// Provider backed by files on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSecureContextProvider {
    settings: TlsSettings,
}

impl FileSecureContextProvider {
    /// Creates a provider for `settings`.
    pub fn new(settings: TlsSettings) -> Self {
        Self { settings }
    }

    /// Finds `path` as given, then under the default directory.
    async fn locate(&self, path: &Path) -> Option<PathBuf> {
        if is_file(path).await {
            return Some(path.to_path_buf());
        }
        let dir = self.settings.default_dir.as_ref()?;
        let candidate = dir.join(path);
        if is_file(&candidate).await {
            debug!(path = %candidate.display(), "Resolved credential under default directory");
            Some(candidate)
        } else {
            None
        }
    }

    async fn require(&self, kind: &str, path: &Path) -> OpcUaResult<PathBuf> {
        match self.locate(path).await {
            Some(found) => Ok(found),
            None => {
                warn!(kind, path = %path.display(), "Credential file not found");
                Err(OpcUaError::configuration(ConfigurationError::file_not_found(
                    kind,
                    path.display().to_string(),
                )))
            }
        }
    }

    async fn load_passphrase(&self, value: &str) -> OpcUaResult<(String, Option<PathBuf>)> {
        match self.locate(Path::new(value)).await {
            Some(file) => {
                let contents = tokio::fs::read_to_string(&file).await.map_err(|e| {
                    OpcUaError::security(SecurityError::private_key(format!(
                        "cannot read passphrase file {}: {e}",
                        file.display()
                    )))
                })?;
                let passphrase = contents.trim_end_matches(['\r', '\n']).to_string();
                Ok((passphrase, Some(file)))
            }
            // Not a file: the value is the passphrase itself.
            None => Ok((value.to_string(), None)),
        }
    }
}

#[async_trait]
impl SecureContextProvider for FileSecureContextProvider {
    async fn secure_context(&self) -> OpcUaResult<SecureTransportContext> {
        let settings = &self.settings;
        let mut context = SecureTransportContext::default();

        match (&settings.certificate, &settings.private_key) {
            (Some(cert), Some(key)) => {
                context.certificate = Some(self.require("certificate", cert).await?);
                context.private_key = Some(self.require("private key", key).await?);
            }
            (None, None) => trace!("No client certificate configured"),
            _ => {
                return Err(OpcUaError::security(SecurityError::certificate(
                    "client certificate and private key must be configured together",
                )))
            }
        }

        match &settings.passphrase {
            Some(value) => {
                let (passphrase, file) = self.load_passphrase(value).await?;
                context.passphrase = Some(passphrase);
                context.passphrase_file = file;
            }
            None => trace!("No passphrase configured"),
        }

        if let Some(ca) = &settings.ca_certificate {
            context.ca_certificate = Some(self.require("CA certificate", ca).await?);
        }

        debug!(
            client_identity = context.has_client_identity(),
            ca = context.ca_certificate.is_some(),
            "Secure transport context ready"
        );
        Ok(context)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_empty_settings() {
        let provider = FileSecureContextProvider::new(TlsSettings::default());
        let context = provider.secure_context().await.unwrap();
        assert!(!context.has_client_identity());
        assert!(context.passphrase.is_none());
        assert!(TlsSettings::default().is_empty());
    }

    #[tokio::test]
    async fn test_resolves_against_default_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "client.pem", "cert");
        write(dir.path(), "client.key", "key");
        let ca = write(dir.path(), "ca.pem", "ca");

        let provider = FileSecureContextProvider::new(TlsSettings {
            certificate: Some("client.pem".into()),
            private_key: Some("client.key".into()),
            ca_certificate: Some(ca.clone()),
            passphrase: None,
            default_dir: Some(dir.path().to_path_buf()),
        });
        let context = provider.secure_context().await.unwrap();
        assert_eq!(context.certificate, Some(dir.path().join("client.pem")));
        assert_eq!(context.private_key, Some(dir.path().join("client.key")));
        assert_eq!(context.ca_certificate, Some(ca));
        assert!(context.has_client_identity());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSecureContextProvider::new(TlsSettings {
            ca_certificate: Some("nope.pem".into()),
            default_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let err = provider.secure_context().await.unwrap_err();
        assert!(err.to_string().contains("nope.pem"));
    }

    #[tokio::test]
    async fn test_half_identity_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cert = write(dir.path(), "client.pem", "cert");
        let provider = FileSecureContextProvider::new(TlsSettings {
            certificate: Some(cert),
            ..Default::default()
        });
        assert!(provider.secure_context().await.is_err());
    }

    #[tokio::test]
    async fn test_passphrase_from_file_or_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "pass.txt", "s3cret\n");

        let provider = FileSecureContextProvider::new(TlsSettings {
            passphrase: Some(file.display().to_string()),
            ..Default::default()
        });
        let context = provider.secure_context().await.unwrap();
        assert_eq!(context.passphrase.as_deref(), Some("s3cret"));
        assert_eq!(context.passphrase_file, Some(file));

        let provider = FileSecureContextProvider::new(TlsSettings {
            passphrase: Some("plain words".into()),
            default_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let context = provider.secure_context().await.unwrap();
        assert_eq!(context.passphrase.as_deref(), Some("plain words"));
        assert!(context.passphrase_file.is_none());
        assert!(!format!("{context:?}").contains("plain words"));
    }
}

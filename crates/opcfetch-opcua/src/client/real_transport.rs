// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Transport backed by the `opcua` crate.
//!
//! Only compiled with the `real-transport` feature. The `opcua` session API
//! is synchronous; calls are made inline and hold the session lock only for
//! the duration of one service request.
//!
//! # Example
//!
//! ```rust,ignore
//! use opcfetch_opcua::client::RealOpcUaTransport;
//! use opcfetch_opcua::types::OpcUaConfig;
//!
//! let config = OpcUaConfig::builder()
//!     .endpoint("opc.tcp://localhost:4840")
//!     .build()?;
//!
//! let mut transport = RealOpcUaTransport::new(config);
//! transport.connect().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use opcua::client::prelude::*;
use opcua::sync::RwLock as OpcUaRwLock;

use crate::browse::{BrowsePath, QualifiedName};
use crate::client::transport::{
    OpcUaTransport, OpcUaValue, ReadResult, ReferenceDescription, TranslateResult, TransportState,
};
use crate::error::{BrowseError, ConnectionError, OpcUaError, OpcUaResult, OperationError};
use crate::security::SecureTransportContext;
use crate::types::{
    NodeClass, NodeId, NodeIdentifier, OpcUaConfig, SecurityMode, SecurityPolicy, StatusCode,
    UserIdentity,
};

/// Status codes that mean the session is gone.
const SESSION_LOSS_CODES: [u32; 5] = [
    0x8005_0000, // BadCommunicationError
    0x80AE_0000, // BadConnectionClosed
    0x8026_0000, // BadSessionClosed
    0x8025_0000, // BadSessionIdInvalid
    0x808A_0000, // BadNotConnected
];

// =============================================================================
// RealOpcUaTransport
// =============================================================================

/// [`OpcUaTransport`] over a live `opcua` client session.
pub struct RealOpcUaTransport {
    config: OpcUaConfig,
    secure_context: Option<SecureTransportContext>,
    state: RwLock<TransportState>,
    session: Option<Arc<OpcUaRwLock<Session>>>,
}

impl RealOpcUaTransport {
    /// Creates a disconnected transport.
    pub fn new(config: OpcUaConfig) -> Self {
        Self {
            config,
            secure_context: None,
            state: RwLock::new(TransportState::Disconnected),
            session: None,
        }
    }

    fn set_state(&self, state: TransportState) {
        *self.state.write() = state;
    }

    fn build_client(&self) -> OpcUaResult<Client> {
        let mut builder = ClientBuilder::new()
            .application_name(&self.config.application_name)
            .application_uri(&self.config.application_uri())
            .session_retry_limit(0)
            .session_timeout(self.config.session_timeout.as_millis() as u32);

        if let Some(ref pki_dir) = self.config.pki_dir {
            builder = builder.pki_dir(pki_dir);
        }
        if self.config.trust_all_certificates {
            builder = builder.trust_server_certs(true);
        }
        let identity = self
            .secure_context
            .as_ref()
            .and_then(|c| c.certificate.as_ref().zip(c.private_key.as_ref()));
        if let Some((cert, key)) = identity {
            builder = builder.certificate_path(cert).private_key_path(key);
        } else if self.config.uses_security() {
            builder = builder.create_sample_keypair(true);
        }

        builder.client().ok_or_else(|| {
            OpcUaError::connection(ConnectionError::session_failed(
                &self.config.endpoint,
                "invalid client configuration",
            ))
        })
    }

    fn security_policy(&self) -> opcua::crypto::SecurityPolicy {
        use opcua::crypto::SecurityPolicy as Ua;
        match self.config.security_policy {
            SecurityPolicy::None => Ua::None,
            SecurityPolicy::Basic128Rsa15 => Ua::Basic128Rsa15,
            SecurityPolicy::Basic256 => Ua::Basic256,
            SecurityPolicy::Basic256Sha256 => Ua::Basic256Sha256,
            SecurityPolicy::Aes128Sha256RsaOaep => Ua::Aes128Sha256RsaOaep,
            SecurityPolicy::Aes256Sha256RsaPss => Ua::Aes256Sha256RsaPss,
        }
    }

    fn message_security_mode(&self) -> MessageSecurityMode {
        match self.config.security_mode {
            SecurityMode::None => MessageSecurityMode::None,
            SecurityMode::Sign => MessageSecurityMode::Sign,
            SecurityMode::SignAndEncrypt => MessageSecurityMode::SignAndEncrypt,
        }
    }

    fn identity_token(&self) -> IdentityToken {
        match &self.config.identity {
            UserIdentity::Anonymous => IdentityToken::Anonymous,
            UserIdentity::UserName { username, password } => {
                IdentityToken::UserName(username.clone(), password.clone())
            }
            UserIdentity::Certificate {
                certificate_path,
                private_key_path,
            } => IdentityToken::X509(certificate_path.into(), private_key_path.into()),
        }
    }

    fn session(&self) -> OpcUaResult<Arc<OpcUaRwLock<Session>>> {
        self.session.clone().ok_or_else(OpcUaError::not_connected)
    }

    /// Maps a failed service call, marking the transport failed on session loss.
    fn service_error(&self, status: opcua::types::StatusCode, node_id: &str, what: &str) -> OpcUaError {
        let bits = status.bits();
        if SESSION_LOSS_CODES.contains(&(bits & 0xFFFF_0000)) {
            self.set_state(TransportState::Failed);
            return OpcUaError::connection(ConnectionError::closed(Some(format!(
                "{what} of {node_id}: {status}"
            ))));
        }
        match what {
            "read" => OpcUaError::operation(OperationError::bad_status(node_id, bits)),
            _ => OpcUaError::browse(BrowseError::browse_failed_with_status(node_id, bits)),
        }
    }

    // =========================================================================
    // Type Conversion
    // =========================================================================

    fn to_ua_node_id(node_id: &NodeId) -> opcua::types::NodeId {
        let ns = node_id.namespace_index;
        match &node_id.identifier {
            NodeIdentifier::Numeric(v) => opcua::types::NodeId::new(ns, *v),
            NodeIdentifier::String(v) => opcua::types::NodeId::new(ns, v.clone()),
            NodeIdentifier::Guid(v) => {
                opcua::types::NodeId::new(ns, opcua::types::Guid::from(*v))
            }
            NodeIdentifier::Opaque(v) => {
                opcua::types::NodeId::new(ns, opcua::types::ByteString::from(v.as_slice()))
            }
        }
    }

    fn from_ua_node_id(node_id: &opcua::types::NodeId) -> NodeId {
        let ns = node_id.namespace;
        match &node_id.identifier {
            opcua::types::Identifier::Numeric(v) => NodeId::numeric(ns, *v),
            opcua::types::Identifier::String(v) => NodeId::string(ns, v.as_ref()),
            opcua::types::Identifier::Guid(v) => {
                NodeId::guid(ns, uuid::Uuid::from_bytes(*v.as_bytes()))
            }
            opcua::types::Identifier::ByteString(v) => {
                NodeId::opaque(ns, v.value.clone().unwrap_or_default())
            }
        }
    }

    fn from_ua_reference(reference: &opcua::types::ReferenceDescription) -> ReferenceDescription {
        // Unspecified or unknown classes are treated as objects: browsable, no value.
        let node_class =
            NodeClass::from_value(reference.node_class as u32).unwrap_or(NodeClass::Object);
        let browse_name = QualifiedName::new(
            reference.browse_name.namespace_index,
            reference.browse_name.name.as_ref(),
        );
        let type_definition = &reference.type_definition.node_id;

        ReferenceDescription {
            node_id: Self::from_ua_node_id(&reference.node_id.node_id),
            display_name: reference.display_name.text.as_ref().to_string(),
            browse_name,
            node_class,
            reference_type: Some(Self::from_ua_node_id(&reference.reference_type_id)),
            type_definition: (!type_definition.is_null())
                .then(|| Self::from_ua_node_id(type_definition)),
        }
    }

    fn from_ua_datetime(dt: &opcua::types::DateTime) -> chrono::DateTime<chrono::Utc> {
        dt.as_chrono()
    }

    fn from_ua_variant(variant: &Variant) -> OpcUaValue {
        match variant {
            Variant::Empty => OpcUaValue::Null,
            Variant::Boolean(v) => OpcUaValue::Boolean(*v),
            Variant::SByte(v) => OpcUaValue::SByte(*v),
            Variant::Byte(v) => OpcUaValue::Byte(*v),
            Variant::Int16(v) => OpcUaValue::Int16(*v),
            Variant::UInt16(v) => OpcUaValue::UInt16(*v),
            Variant::Int32(v) => OpcUaValue::Int32(*v),
            Variant::UInt32(v) => OpcUaValue::UInt32(*v),
            Variant::Int64(v) => OpcUaValue::Int64(*v),
            Variant::UInt64(v) => OpcUaValue::UInt64(*v),
            Variant::Float(v) => OpcUaValue::Float(*v),
            Variant::Double(v) => OpcUaValue::Double(*v),
            Variant::String(v) => OpcUaValue::String(v.as_ref().to_string()),
            Variant::LocalizedText(v) => {
                OpcUaValue::LocalizedText(v.locale.as_ref().to_string(), v.text.as_ref().to_string())
            }
            Variant::DateTime(v) => OpcUaValue::DateTime(Self::from_ua_datetime(v)),
            Variant::Guid(v) => OpcUaValue::Guid(uuid::Uuid::from_bytes(*v.as_bytes())),
            Variant::ByteString(v) => OpcUaValue::ByteString(v.value.clone().unwrap_or_default()),
            Variant::Array(arr) => {
                OpcUaValue::Array(arr.values.iter().map(Self::from_ua_variant).collect())
            }
            // Structured values have no content form; an empty array is rejected
            // at stringification like any other array.
            other => {
                trace!(variant = ?other.type_id(), "Unsupported variant type");
                OpcUaValue::Array(Vec::new())
            }
        }
    }

    fn to_ua_browse_path(path: &BrowsePath) -> opcua::types::BrowsePath {
        let elements = path
            .segments
            .iter()
            .map(|segment| RelativePathElement {
                reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
                is_inverse: false,
                include_subtypes: true,
                target_name: opcua::types::QualifiedName::new(
                    segment.namespace_index,
                    segment.name.as_str(),
                ),
            })
            .collect();

        opcua::types::BrowsePath {
            starting_node: Self::to_ua_node_id(&path.start_node),
            relative_path: RelativePath {
                elements: Some(elements),
            },
        }
    }
}

// =============================================================================
// OpcUaTransport Implementation
// =============================================================================

#[async_trait]
impl OpcUaTransport for RealOpcUaTransport {
    fn set_secure_context(&mut self, context: Option<SecureTransportContext>) -> bool {
        if self.secure_context == context {
            return false;
        }
        debug!(has_identity = context.as_ref().is_some_and(|c| c.has_client_identity()), "Secure context updated");
        self.secure_context = context;
        true
    }

    async fn connect(&mut self) -> OpcUaResult<()> {
        self.set_state(TransportState::Connecting);
        info!(endpoint = %self.config.endpoint, "Connecting to OPC UA server");

        let result = (|| {
            let mut client = self.build_client()?;
            let endpoints = client
                .get_server_endpoints_from_url(self.config.endpoint.as_str())
                .map_err(|status| {
                    OpcUaError::connection(ConnectionError::session_failed(
                        &self.config.endpoint,
                        format!("endpoint discovery failed: {status}"),
                    ))
                })?;

            let policy = self.security_policy();
            let mode = self.message_security_mode();
            let endpoint = endpoints
                .iter()
                .find(|e| e.security_policy_uri.as_ref() == policy.to_uri() && e.security_mode == mode)
                .cloned()
                .ok_or_else(|| {
                    OpcUaError::connection(ConnectionError::session_failed(
                        &self.config.endpoint,
                        format!("no endpoint offers {policy:?}/{mode:?}"),
                    ))
                })?;

            debug!(
                security_policy = %endpoint.security_policy_uri,
                security_mode = ?endpoint.security_mode,
                "Found matching endpoint"
            );

            client
                .connect_to_endpoint(endpoint, self.identity_token())
                .map_err(|status| {
                    OpcUaError::connection(ConnectionError::session_failed(
                        &self.config.endpoint,
                        status.to_string(),
                    ))
                })
        })();

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.set_state(TransportState::Connected);
                Ok(())
            }
            Err(e) => {
                self.set_state(TransportState::Failed);
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) -> OpcUaResult<()> {
        if let Some(session) = self.session.take() {
            session.read().disconnect();
            info!(endpoint = %self.config.endpoint, "Disconnected from OPC UA server");
        }
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some() && self.state.read().is_connected()
    }

    fn state(&self) -> TransportState {
        *self.state.read()
    }

    async fn translate_browse_path(&self, path: &BrowsePath) -> OpcUaResult<TranslateResult> {
        let session = self.session()?;
        let request = Self::to_ua_browse_path(path);
        let path_text = path.to_string();

        trace!(path = %path_text, "Translating browse path");

        let results = session
            .read()
            .translate_browse_paths_to_node_ids(&[request])
            .map_err(|status| self.service_error(status, &path_text, "translate"))?;

        let Some(result) = results.into_iter().next() else {
            return Ok(TranslateResult::bad(StatusCode::BAD_NO_MATCH));
        };

        let status = StatusCode(result.status_code.bits());
        if !status.is_good() {
            return Ok(TranslateResult::bad(status));
        }

        let targets = result
            .targets
            .unwrap_or_default()
            .iter()
            .map(|t| Self::from_ua_node_id(&t.target_id.node_id))
            .collect();
        Ok(TranslateResult::good(targets))
    }

    async fn browse(&self, node_id: &NodeId) -> OpcUaResult<Vec<ReferenceDescription>> {
        let session = self.session()?;
        let node_text = node_id.to_string();

        let description = BrowseDescription {
            node_id: Self::to_ua_node_id(node_id),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: BrowseDescriptionResultMask::all().bits(),
        };

        let session = session.read();
        let mut result = session
            .browse(&[description])
            .map_err(|status| self.service_error(status, &node_text, "browse"))?
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| OpcUaError::browse_failed(&node_text, "no browse result returned"))?;

        let mut references = Vec::new();
        loop {
            if !result.status_code.is_good() {
                return Err(self.service_error(result.status_code, &node_text, "browse"));
            }
            references.extend(
                result
                    .references
                    .unwrap_or_default()
                    .iter()
                    .filter(|r| r.is_forward)
                    .map(Self::from_ua_reference),
            );

            if result.continuation_point.is_null_or_empty() {
                break;
            }
            trace!(node_id = %node_text, so_far = references.len(), "Following browse continuation point");
            result = session
                .browse_next(false, &[result.continuation_point])
                .map_err(|status| self.service_error(status, &node_text, "browse"))?
                .and_then(|results| results.into_iter().next())
                .ok_or_else(|| OpcUaError::browse_failed(&node_text, "no browse_next result returned"))?;
        }

        trace!(node_id = %node_text, count = references.len(), "Browsed node");
        Ok(references)
    }

    async fn read_value(&self, node_id: &NodeId) -> OpcUaResult<ReadResult> {
        let session = self.session()?;
        let node_text = node_id.to_string();

        let read_value_id = ReadValueId {
            node_id: Self::to_ua_node_id(node_id),
            attribute_id: AttributeId::Value as u32,
            index_range: UAString::null(),
            data_encoding: opcua::types::QualifiedName::null(),
        };

        let values = session
            .read()
            .read(&[read_value_id], TimestampsToReturn::Both, 0.0)
            .map_err(|status| self.service_error(status, &node_text, "read"))?;

        let Some(data_value) = values.into_iter().next() else {
            warn!(node_id = %node_text, "Server returned no value");
            return Ok(ReadResult::failure(node_id.clone(), StatusCode(0x8000_0000)));
        };

        let status = StatusCode(data_value.status.map(|s| s.bits()).unwrap_or(0));
        let value = data_value.value.as_ref().map(Self::from_ua_variant);

        Ok(ReadResult {
            node_id: node_id.clone(),
            value,
            status,
            server_timestamp: data_value.server_timestamp.as_ref().map(Self::from_ua_datetime),
            source_timestamp: data_value.source_timestamp.as_ref().map(Self::from_ua_datetime),
        })
    }

    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

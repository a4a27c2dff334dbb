// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Root node identifier and its validation.

use std::fmt;
use std::str::FromStr;

use opcfetch_opcua::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, FetchResult};
use crate::properties::{self, FetchProperties};

// =============================================================================
// NodeIdKind
// =============================================================================

/// How the `Node ID` property is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeIdKind {
    /// A slash-delimited browse path.
    Path,
    /// A numeric identifier.
    Int,
    /// A string identifier.
    String,
}

impl NodeIdKind {
    /// Property value of this kind.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "Path",
            Self::Int => "Int",
            Self::String => "String",
        }
    }
}

impl fmt::Display for NodeIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeIdKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Path" => Ok(Self::Path),
            "Int" => Ok(Self::Int),
            "String" => Ok(Self::String),
            other => Err(FetchError::configuration(
                properties::NODE_ID_TYPE,
                format!("'{other}' is not a valid node ID type"),
            )),
        }
    }
}

// =============================================================================
// IdentifierConfig
// =============================================================================

/// Validated root node configuration.
///
/// For `Int` and `String` kinds the namespace index is always present, and
/// for `Int` the raw value is a valid `u32`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierConfig {
    raw_value: String,
    kind: NodeIdKind,
    namespace_index: Option<u16>,
    max_depth: u64,
}

impl IdentifierConfig {
    /// Validates raw properties.
    ///
    /// # Errors
    ///
    /// [`FetchError::Configuration`] naming the first offending property.
    pub fn from_properties(props: &FetchProperties) -> FetchResult<Self> {
        let raw_value = props
            .node_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FetchError::configuration(properties::NODE_ID, "value is required"))?
            .to_string();

        let kind: NodeIdKind = props
            .node_id_type
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| FetchError::configuration(properties::NODE_ID_TYPE, "value is required"))?
            .parse()?;

        if kind == NodeIdKind::Int && raw_value.parse::<u32>().is_err() {
            return Err(FetchError::configuration(
                properties::NODE_ID,
                format!("'{raw_value}' cannot be used as an int type node ID"),
            ));
        }

        let namespace_index = match kind {
            NodeIdKind::Path => None,
            NodeIdKind::Int | NodeIdKind::String => {
                let raw = props
                    .namespace_index
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        FetchError::configuration(
                            properties::NAMESPACE_INDEX,
                            format!("required when {} is {kind}", properties::NODE_ID_TYPE),
                        )
                    })?;
                Some(raw.parse::<u16>().map_err(|_| {
                    FetchError::configuration(
                        properties::NAMESPACE_INDEX,
                        format!("'{raw}' is not a valid namespace index"),
                    )
                })?)
            }
        };

        let max_depth = match props.max_depth.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                FetchError::configuration(
                    properties::MAX_DEPTH,
                    format!("'{raw}' is not a non-negative integer"),
                )
            })?,
        };

        Ok(Self {
            raw_value,
            kind,
            namespace_index,
            max_depth,
        })
    }

    /// The `Node ID` value as configured.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Interpretation of the raw value.
    pub fn kind(&self) -> NodeIdKind {
        self.kind
    }

    /// Namespace index; `None` in path mode.
    pub fn namespace_index(&self) -> Option<u16> {
        self.namespace_index
    }

    /// Maximum traversal depth; `0` is unlimited.
    pub fn max_depth(&self) -> u64 {
        self.max_depth
    }

    /// Returns `true` in path mode.
    pub fn is_path(&self) -> bool {
        self.kind == NodeIdKind::Path
    }

    /// The root node for `Int` and `String` kinds; `None` in path mode.
    pub fn start_node(&self) -> Option<NodeId> {
        let ns = self.namespace_index?;
        match self.kind {
            NodeIdKind::Path => None,
            NodeIdKind::Int => self.raw_value.parse().ok().map(|id| NodeId::numeric(ns, id)),
            NodeIdKind::String => Some(NodeId::string(ns, self.raw_value.as_str())),
        }
    }
}

impl fmt::Display for IdentifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace_index {
            Some(ns) => write!(f, "{} {} (ns={ns})", self.kind, self.raw_value),
            None => write!(f, "{} {}", self.kind, self.raw_value),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{MAX_DEPTH, NAMESPACE_INDEX, NODE_ID, NODE_ID_TYPE};

    fn props(node_id: &str, kind: &str) -> FetchProperties {
        FetchProperties::default()
            .with(NODE_ID, node_id)
            .with(NODE_ID_TYPE, kind)
    }

    fn rejected_property(result: FetchResult<IdentifierConfig>) -> String {
        match result {
            Err(FetchError::Configuration { property, .. }) => property,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_int_with_namespace() {
        let config =
            IdentifierConfig::from_properties(&props("58", "Int").with(NAMESPACE_INDEX, "2"))
                .unwrap();
        assert_eq!(config.kind(), NodeIdKind::Int);
        assert_eq!(config.namespace_index(), Some(2));
        assert_eq!(config.max_depth(), 0);
        assert_eq!(config.start_node(), Some(NodeId::numeric(2, 58)));
    }

    #[test]
    fn test_string_with_namespace() {
        let config = IdentifierConfig::from_properties(
            &props("tempSensor", "String")
                .with(NAMESPACE_INDEX, "3")
                .with(MAX_DEPTH, "4"),
        )
        .unwrap();
        assert_eq!(config.start_node(), Some(NodeId::string(3, "tempSensor")));
        assert_eq!(config.max_depth(), 4);
    }

    #[test]
    fn test_path_ignores_namespace() {
        let config = IdentifierConfig::from_properties(
            &props("/Root/Objects/Sensor1", "Path").with(NAMESPACE_INDEX, "not a number"),
        )
        .unwrap();
        assert!(config.is_path());
        assert_eq!(config.namespace_index(), None);
        assert_eq!(config.start_node(), None);
        assert_eq!(config.raw_value(), "/Root/Objects/Sensor1");
    }

    #[test]
    fn test_missing_namespace_rejected() {
        let result = IdentifierConfig::from_properties(&props("tempSensor", "String"));
        assert_eq!(rejected_property(result), NAMESPACE_INDEX);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = IdentifierConfig::from_properties(&props("58", "Float"));
        assert_eq!(rejected_property(result), NODE_ID_TYPE);

        let result = IdentifierConfig::from_properties(&props("58", "int"));
        assert_eq!(rejected_property(result), NODE_ID_TYPE);
    }

    #[test]
    fn test_non_numeric_int_rejected() {
        let result =
            IdentifierConfig::from_properties(&props("abc", "Int").with(NAMESPACE_INDEX, "2"));
        assert_eq!(rejected_property(result), NODE_ID);

        let result =
            IdentifierConfig::from_properties(&props("-1", "Int").with(NAMESPACE_INDEX, "2"));
        assert_eq!(rejected_property(result), NODE_ID);
    }

    #[test]
    fn test_empty_node_id_rejected() {
        let result = IdentifierConfig::from_properties(&props("  ", "Path"));
        assert_eq!(rejected_property(result), NODE_ID);

        let result = IdentifierConfig::from_properties(
            &FetchProperties::default().with(NODE_ID_TYPE, "Path"),
        );
        assert_eq!(rejected_property(result), NODE_ID);
    }

    #[test]
    fn test_bad_numbers_rejected() {
        let result = IdentifierConfig::from_properties(
            &props("58", "Int").with(NAMESPACE_INDEX, "70000"),
        );
        assert_eq!(rejected_property(result), NAMESPACE_INDEX);

        let result = IdentifierConfig::from_properties(
            &props("/Objects", "Path").with(MAX_DEPTH, "-2"),
        );
        assert_eq!(rejected_property(result), MAX_DEPTH);
    }

    #[test]
    fn test_display() {
        let config =
            IdentifierConfig::from_properties(&props("58", "Int").with(NAMESPACE_INDEX, "2"))
                .unwrap();
        assert_eq!(config.to_string(), "Int 58 (ns=2)");
    }
}

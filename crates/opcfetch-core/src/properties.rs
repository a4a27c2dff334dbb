// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Property surface exposed to the host.
//!
//! Properties arrive as raw strings, exactly as a host property framework
//! would hand them over. Validation into a typed
//! [`IdentifierConfig`](crate::identifier::IdentifierConfig) happens at
//! schedule time.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Property Names
// =============================================================================

/// Node ID property.
pub const NODE_ID: &str = "Node ID";
/// Node ID type property.
pub const NODE_ID_TYPE: &str = "Node ID type";
/// Namespace index property.
pub const NAMESPACE_INDEX: &str = "Namespace index";
/// Max depth property.
pub const MAX_DEPTH: &str = "Max depth";

// =============================================================================
// PropertyDescriptor
// =============================================================================

/// Static description of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: &'static str,
    /// Description shown to users.
    pub description: &'static str,
    /// Whether the property must be set.
    pub required: bool,
    /// Value used when unset.
    pub default_value: Option<&'static str>,
    /// Allowed values; empty means free-form.
    pub allowable_values: &'static [&'static str],
}

/// All properties, in display order.
pub const DESCRIPTORS: &[PropertyDescriptor] = &[
    PropertyDescriptor {
        name: NODE_ID,
        description: "Specifies the ID of the root node to traverse",
        required: true,
        default_value: None,
        allowable_values: &[],
    },
    PropertyDescriptor {
        name: NODE_ID_TYPE,
        description: "Specifies the type of the provided node ID",
        required: true,
        default_value: None,
        allowable_values: &["Path", "Int", "String"],
    },
    PropertyDescriptor {
        name: NAMESPACE_INDEX,
        description: "The index of the namespace. Required unless node ID type is Path.",
        required: false,
        default_value: None,
        allowable_values: &[],
    },
    PropertyDescriptor {
        name: MAX_DEPTH,
        description: "Specifies the max depth of browsing. 0 means unlimited.",
        required: false,
        default_value: Some("0"),
        allowable_values: &[],
    },
];

// =============================================================================
// Relationship
// =============================================================================

/// Output route of an emitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Node data was retrieved and written.
    Success,
    /// Node data was retrieved but its content could not be written.
    Failure,
}

impl Relationship {
    /// Route name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    /// Route description.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Success => "Successfully retrieved OPC-UA nodes",
            Self::Failure => "Retrieved OPC-UA nodes where value cannot be extracted",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// FetchProperties
// =============================================================================

/// Raw processor properties.
///
/// Numbers are accepted either as strings or as numeric literals so the
/// struct can be embedded in YAML or TOML configuration directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchProperties {
    /// Root node: a browse path, a number or a string identifier.
    #[serde(alias = "Node ID", deserialize_with = "raw_value")]
    pub node_id: Option<String>,

    /// `Path`, `Int` or `String`.
    #[serde(alias = "Node ID type", deserialize_with = "raw_value")]
    pub node_id_type: Option<String>,

    /// Namespace of the node id.
    #[serde(alias = "Namespace index", deserialize_with = "raw_value")]
    pub namespace_index: Option<String>,

    /// Maximum browse depth; `0` is unlimited.
    #[serde(alias = "Max depth", deserialize_with = "raw_value")]
    pub max_depth: Option<String>,
}

impl FetchProperties {
    /// Returns the descriptors of every supported property.
    pub fn descriptors() -> &'static [PropertyDescriptor] {
        DESCRIPTORS
    }

    /// Returns the raw value of the named property.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            NODE_ID => self.node_id.as_deref(),
            NODE_ID_TYPE => self.node_id_type.as_deref(),
            NAMESPACE_INDEX => self.namespace_index.as_deref(),
            MAX_DEPTH => self.max_depth.as_deref(),
            _ => None,
        }
    }

    /// Sets the named property. Returns `false` for unknown names.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let slot = match name {
            NODE_ID => &mut self.node_id,
            NODE_ID_TYPE => &mut self.node_id_type,
            NAMESPACE_INDEX => &mut self.namespace_index,
            MAX_DEPTH => &mut self.max_depth,
            _ => return false,
        };
        *slot = Some(value.into());
        true
    }

    /// Builder-style [`set`](Self::set) for known property names.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }
}

/// Accepts a string, integer or boolean and keeps its text.
fn raw_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Bool(bool),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
        Raw::Bool(b) => b.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_by_name() {
        let mut props = FetchProperties::default();
        assert!(props.set(NODE_ID, "58"));
        assert!(props.set(NODE_ID_TYPE, "Int"));
        assert!(!props.set("Unknown", "x"));
        assert_eq!(props.get(NODE_ID), Some("58"));
        assert_eq!(props.get(NODE_ID_TYPE), Some("Int"));
        assert_eq!(props.get(MAX_DEPTH), None);
    }

    #[test]
    fn test_deserialize_numbers_as_text() {
        let props: FetchProperties = serde_json::from_str(
            r#"{"node_id": 58, "node_id_type": "Int", "namespace_index": 2, "max_depth": "3"}"#,
        )
        .unwrap();
        assert_eq!(props.node_id.as_deref(), Some("58"));
        assert_eq!(props.namespace_index.as_deref(), Some("2"));
        assert_eq!(props.max_depth.as_deref(), Some("3"));
    }

    #[test]
    fn test_deserialize_display_names() {
        let props: FetchProperties =
            serde_json::from_str(r#"{"Node ID": "/Root/Objects", "Node ID type": "Path"}"#).unwrap();
        assert_eq!(props.node_id.as_deref(), Some("/Root/Objects"));
        assert!(props.namespace_index.is_none());
    }

    #[test]
    fn test_descriptors() {
        let names: Vec<_> = FetchProperties::descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec![NODE_ID, NODE_ID_TYPE, NAMESPACE_INDEX, MAX_DEPTH]);
        let kind = &DESCRIPTORS[1];
        assert!(kind.required);
        assert_eq!(kind.allowable_values, &["Path", "Int", "String"]);
        assert_eq!(Relationship::Failure.to_string(), "failure");
    }
}

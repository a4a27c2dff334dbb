// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Data retrieved for a single variable node.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::client::transport::OpcUaValue;
use crate::error::ConversionError;
use crate::types::OpcUaDataType;

/// Attribute names attached to every extracted node.
pub mod attribute_names {
    /// Bare identifier value.
    pub const NODE_ID: &str = "NodeID";
    /// Identifier kind: numeric, string, guid or bytestring.
    pub const NODE_ID_TYPE: &str = "NodeID type";
    /// Browse name of the node.
    pub const BROWSE_NAME: &str = "Browsename";
    /// Accumulated path plus browse name.
    pub const FULL_PATH: &str = "Full path";
    /// Source timestamp of the value (RFC 3339).
    pub const SOURCE_TIMESTAMP: &str = "Sourcetimestamp";
    /// Data type name of the value.
    pub const TYPE_NAME: &str = "Typename";
    /// Size in bytes of fixed-width values.
    pub const DATA_SIZE: &str = "Datasize";
}

// =============================================================================
// NodeAttributes
// =============================================================================

/// Insertion-ordered string attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAttributes {
    entries: Vec<(String, String)>,
}

impl NodeAttributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, keeping its original position if it already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for NodeAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

// =============================================================================
// NodeData
// =============================================================================

/// Attributes and value of one variable node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Descriptive attributes (see [`attribute_names`]).
    pub attributes: NodeAttributes,

    /// The value, if the node carried one.
    pub value: Option<OpcUaValue>,

    /// Data type of `value`.
    pub data_type: Option<OpcUaDataType>,
}

impl NodeData {
    /// Renders the value as record content.
    ///
    /// `Ok(None)` means the node has no value and the record carries no
    /// content.
    pub fn content(&self) -> Result<Option<String>, ConversionError> {
        match &self.value {
            None | Some(OpcUaValue::Null) => Ok(None),
            Some(value) => value.to_content_string().map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut attributes = NodeAttributes::new();
        attributes.insert("NodeID", "58");
        attributes.insert("Browsename", "Temp");
        attributes.insert("NodeID", "59");

        let keys: Vec<_> = attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["NodeID", "Browsename"]);
        assert_eq!(attributes.get("NodeID"), Some("59"));
        assert_eq!(attributes.len(), 2);
        assert!(attributes.get("Missing").is_none());
    }

    #[test]
    fn test_content() {
        let data = NodeData {
            attributes: NodeAttributes::new(),
            value: Some(OpcUaValue::Int16(12)),
            data_type: Some(OpcUaDataType::Int16),
        };
        assert_eq!(data.content().unwrap().as_deref(), Some("12"));

        let empty = NodeData {
            attributes: NodeAttributes::new(),
            value: None,
            data_type: None,
        };
        assert_eq!(empty.content().unwrap(), None);

        let array = NodeData {
            attributes: NodeAttributes::new(),
            value: Some(OpcUaValue::Array(vec![])),
            data_type: Some(OpcUaDataType::Array),
        };
        assert!(array.content().is_err());
    }
}

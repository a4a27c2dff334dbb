// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Address spaces and property sets shared by the integration tests.

use opcfetch_core::properties::{MAX_DEPTH, NAMESPACE_INDEX, NODE_ID, NODE_ID_TYPE};
use opcfetch_core::FetchProperties;
use opcfetch_opcua::{NodeClass, NodeId, OpcUaValue, TranslateResult};

use super::mocks::MockTransport;

// =============================================================================
// Property Fixtures
// =============================================================================

/// Fixture providing processor properties.
pub struct PropertyFixtures;

impl PropertyFixtures {
    /// Numeric identifier.
    pub fn int(node_id: u32, namespace: u16) -> FetchProperties {
        FetchProperties::default()
            .with(NODE_ID, node_id.to_string())
            .with(NODE_ID_TYPE, "Int")
            .with(NAMESPACE_INDEX, namespace.to_string())
    }

    /// String identifier.
    pub fn string(node_id: &str, namespace: u16) -> FetchProperties {
        FetchProperties::default()
            .with(NODE_ID, node_id)
            .with(NODE_ID_TYPE, "String")
            .with(NAMESPACE_INDEX, namespace.to_string())
    }

    /// String identifier without the namespace index.
    pub fn string_without_namespace(node_id: &str) -> FetchProperties {
        FetchProperties::default()
            .with(NODE_ID, node_id)
            .with(NODE_ID_TYPE, "String")
    }

    /// Browse path.
    pub fn path(path: &str) -> FetchProperties {
        FetchProperties::default()
            .with(NODE_ID, path)
            .with(NODE_ID_TYPE, "Path")
    }

    /// Adds a max depth to `props`.
    pub fn with_depth(props: FetchProperties, depth: u64) -> FetchProperties {
        props.with(MAX_DEPTH, depth.to_string())
    }
}

// =============================================================================
// Address Space Fixtures
// =============================================================================

/// Fixture providing mock address spaces.
pub struct AddressSpaceFixtures;

impl AddressSpaceFixtures {
    /// Root of the plant tree, `ns=2;i=58`.
    pub fn plant_root() -> NodeId {
        NodeId::numeric(2, 58)
    }

    /// A small plant.
    ///
    /// ```text
    /// Plant (ns=2;i=58)
    /// ├── Line1 (object, i=100)
    /// │   ├── Temperature (Double 21.5, i=101)
    /// │   ├── Speed (Int32 1200, i=102)
    /// │   └── Motor (object, i=110)
    /// │       └── Current (Float 3.25, i=111)
    /// ├── Pressure (Double 1.5, i=200)
    /// └── Status (String "running", s=Status)
    /// ```
    pub fn plant() -> MockTransport {
        let transport = MockTransport::new();
        let root = Self::plant_root();
        let line = NodeId::numeric(2, 100);
        let motor = NodeId::numeric(2, 110);

        transport
            .add_root(root.clone(), "Plant")
            .add_object(&root, line.clone(), "Line1")
            .add_variable(&line, NodeId::numeric(2, 101), "Temperature", OpcUaValue::Double(21.5))
            .add_variable(&line, NodeId::numeric(2, 102), "Speed", OpcUaValue::Int32(1200))
            .add_object(&line, motor.clone(), "Motor")
            .add_variable(&motor, NodeId::numeric(2, 111), "Current", OpcUaValue::Float(3.25))
            .add_variable(&root, NodeId::numeric(2, 200), "Pressure", OpcUaValue::Double(1.5))
            .add_variable(
                &root,
                NodeId::string(2, "Status"),
                "Status",
                OpcUaValue::String("running".into()),
            );
        transport
    }

    /// Number of references below [`plant_root`](Self::plant_root).
    pub const PLANT_NODES: u64 = 7;

    /// Number of variables below [`plant_root`](Self::plant_root).
    pub const PLANT_VARIABLES: u64 = 5;

    /// The plant, also reachable as `/Root/Objects/Plant`.
    pub fn plant_with_path() -> MockTransport {
        let transport = Self::plant();
        transport.set_translation(
            "/Root/Objects/Plant",
            TranslateResult::good(vec![Self::plant_root()]),
        );
        transport
    }

    /// Root of the flat tree, `ns=2;s=Flat`.
    pub fn flat_root() -> NodeId {
        NodeId::string(2, "Flat")
    }

    /// Ten references directly below the root, three of them variables
    /// (`i=1`, `i=5`, `i=9`).
    pub fn flat_ten() -> MockTransport {
        let transport = MockTransport::new();
        let root = Self::flat_root();
        transport.add_root(root.clone(), "Flat");
        for i in 0..10u32 {
            let node_id = NodeId::numeric(2, i);
            let name = format!("Node{i}");
            if matches!(i, 1 | 5 | 9) {
                transport.add_variable(&root, node_id, &name, OpcUaValue::UInt32(i * 10));
            } else if i % 2 == 0 {
                transport.add_object(&root, node_id, &name);
            } else {
                transport.add_node(&root, node_id, &name, NodeClass::Method);
            }
        }
        transport
    }

    /// An object tree without variables.
    pub fn objects_only() -> MockTransport {
        let transport = MockTransport::new();
        let root = NodeId::numeric(2, 1);
        transport
            .add_root(root.clone(), "Folder")
            .add_object(&root, NodeId::numeric(2, 2), "A")
            .add_object(&NodeId::numeric(2, 2), NodeId::numeric(2, 3), "B");
        transport
    }
}

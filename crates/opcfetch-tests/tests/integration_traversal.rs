// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Traversal Integration Tests
//!
//! Integration tests for the connection handle against the mock address
//! space:
//!
//! - `test_traverse_*`: ordering, depth, cycles and failure handling
//! - `test_node_data_*`: attribute assembly for variable nodes
//! - `test_reconnect_*`: retry behavior

use std::time::Duration;

use async_trait::async_trait;

use opcfetch_opcua::{
    attribute_names, Connection, NodeClass, NodeId, OpcUaError, OpcUaValue, ReferenceDescription,
    ReferenceVisitor, RetryConfig, RetryStrategy, StatusCode, TimeoutError,
};
use opcfetch_tests::prelude::*;

// =============================================================================
// Helpers
// =============================================================================

/// Visitor that records `(browse name, path)` pairs.
#[derive(Default)]
struct Collect {
    seen: Vec<(String, String)>,
    prune: Option<&'static str>,
}

impl Collect {
    fn names(&self) -> Vec<&str> {
        self.seen.iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[async_trait]
impl ReferenceVisitor for Collect {
    async fn on_reference(&mut self, reference: &ReferenceDescription, path: &str) -> bool {
        self.seen
            .push((reference.browse_name.name.clone(), path.to_string()));
        self.prune != Some(reference.browse_name.name.as_str())
    }
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries)
        .with_base_delay(Duration::from_millis(1))
        .with_strategy(RetryStrategy::Fixed)
}

// =============================================================================
// Traversal Tests
// =============================================================================

#[tokio::test]
async fn test_traverse_preorder_with_paths() {
    init_test_logging();
    let transport = AddressSpaceFixtures::plant();
    let connection = Connection::new(transport.clone());
    let mut visitor = Collect::default();

    let stats = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await
        .unwrap();

    let expected = vec![
        ("Line1", ""),
        ("Temperature", "/Line1"),
        ("Speed", "/Line1"),
        ("Motor", "/Line1"),
        ("Current", "/Line1/Motor"),
        ("Pressure", ""),
        ("Status", ""),
    ];
    let seen: Vec<(&str, &str)> = visitor
        .seen
        .iter()
        .map(|(n, p)| (n.as_str(), p.as_str()))
        .collect();
    assert_eq!(seen, expected);
    assert_eq!(stats.references_visited, AddressSpaceFixtures::PLANT_NODES);
    assert_eq!(stats.max_depth_reached, 3);
    assert_eq!(stats.browse_failures, 0);
    assert_eq!(stats.browse_calls, transport.browse_calls());
}

#[tokio::test]
async fn test_traverse_origin_path_prefix() {
    let connection = Connection::new(AddressSpaceFixtures::plant());
    let mut visitor = Collect::default();

    connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "/Root/Objects/Plant", 0)
        .await
        .unwrap();

    assert_eq!(visitor.seen[0].1, "/Root/Objects/Plant");
    assert_eq!(visitor.seen[4], ("Current".to_string(), "/Root/Objects/Plant/Line1/Motor".to_string()));
}

#[tokio::test]
async fn test_traverse_depth_one_browses_only_root() {
    let transport = AddressSpaceFixtures::plant();
    let connection = Connection::new(transport.clone());
    let mut visitor = Collect::default();

    let stats = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 1)
        .await
        .unwrap();

    assert_eq!(visitor.names(), vec!["Line1", "Pressure", "Status"]);
    assert_eq!(transport.browse_calls(), 1);
    assert_eq!(stats.max_depth_reached, 1);
}

#[tokio::test]
async fn test_traverse_depth_two() {
    let transport = AddressSpaceFixtures::plant();
    let connection = Connection::new(transport.clone());
    let mut visitor = Collect::default();

    connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 2)
        .await
        .unwrap();

    assert_eq!(
        visitor.names(),
        vec!["Line1", "Temperature", "Speed", "Motor", "Pressure", "Status"]
    );
    // Root plus the three depth-1 nodes.
    assert_eq!(transport.browse_calls(), 4);
}

#[tokio::test]
async fn test_traverse_cycle_terminates() {
    let transport = MockTransport::new();
    let a = NodeId::numeric(2, 1);
    let b = NodeId::numeric(2, 2);
    transport
        .add_root(a.clone(), "A")
        .add_object(&a, b.clone(), "B")
        .link(&b, &a);

    let connection = Connection::new(transport);
    let mut visitor = Collect::default();
    let stats = connection.traverse(&a, &mut visitor, "", 0).await.unwrap();

    assert_eq!(visitor.names(), vec!["B", "A"]);
    assert_eq!(visitor.seen[1].1, "/B");
    assert_eq!(stats.cycles_skipped, 1);
}

#[tokio::test]
async fn test_traverse_no_dedup_across_paths() {
    let transport = MockTransport::new();
    let root = NodeId::numeric(2, 1);
    let x = NodeId::numeric(2, 2);
    let y = NodeId::numeric(2, 3);
    let shared = NodeId::numeric(2, 4);
    transport
        .add_root(root.clone(), "Root")
        .add_object(&root, x.clone(), "X")
        .add_object(&root, y.clone(), "Y")
        .add_variable(&x, shared.clone(), "Shared", OpcUaValue::Boolean(true))
        .link(&y, &shared);

    let connection = Connection::new(transport);
    let mut visitor = Collect::default();
    connection.traverse(&root, &mut visitor, "", 0).await.unwrap();

    let shared_paths: Vec<&str> = visitor
        .seen
        .iter()
        .filter(|(n, _)| n == "Shared")
        .map(|(_, p)| p.as_str())
        .collect();
    assert_eq!(shared_paths, vec!["/X", "/Y"]);
}

#[tokio::test]
async fn test_traverse_prune_skips_subtree() {
    let connection = Connection::new(AddressSpaceFixtures::plant());
    let mut visitor = Collect {
        prune: Some("Line1"),
        ..Default::default()
    };

    connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await
        .unwrap();

    assert_eq!(visitor.names(), vec!["Line1", "Pressure", "Status"]);
}

#[tokio::test]
async fn test_traverse_child_browse_failure_is_skipped() {
    let transport = AddressSpaceFixtures::plant();
    transport.fail_browse(&NodeId::numeric(2, 100));
    let connection = Connection::new(transport);
    let mut visitor = Collect::default();

    let stats = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await
        .unwrap();

    assert_eq!(visitor.names(), vec!["Line1", "Pressure", "Status"]);
    assert_eq!(stats.browse_failures, 1);
}

#[tokio::test]
async fn test_traverse_root_browse_failure_is_error() {
    let transport = AddressSpaceFixtures::plant();
    transport.fail_browse(&AddressSpaceFixtures::plant_root());
    let connection = Connection::new(transport);
    let mut visitor = Collect::default();

    let result = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await;

    assert!(result.is_err());
    assert!(visitor.seen.is_empty());
}

#[tokio::test]
async fn test_traverse_root_browse_timeout() {
    let transport = AddressSpaceFixtures::plant();
    transport.pause_browses();
    let connection = Connection::new(transport.clone())
        .with_request_timeout(Some(Duration::from_millis(20)));
    let mut visitor = Collect::default();

    let result = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await;
    transport.release_browses();

    assert!(matches!(
        result,
        Err(OpcUaError::Timeout(TimeoutError::Browse { .. }))
    ));
    assert!(visitor.seen.is_empty());
}

#[tokio::test]
async fn test_traverse_unknown_root_is_error() {
    let connection = Connection::new(AddressSpaceFixtures::plant());
    let mut visitor = Collect::default();

    let result = connection
        .traverse(&NodeId::numeric(9, 9), &mut visitor, "", 0)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_traverse_session_loss_aborts() {
    let transport = AddressSpaceFixtures::plant();
    transport.lose_session_on_browse(&NodeId::numeric(2, 100));
    let connection = Connection::new(transport);
    let mut visitor = Collect::default();

    let err = connection
        .traverse(&AddressSpaceFixtures::plant_root(), &mut visitor, "", 0)
        .await
        .unwrap_err();

    assert!(err.is_connection_loss());
    // Siblings after the lost branch are never visited.
    assert_eq!(visitor.names(), vec!["Line1"]);
}

// =============================================================================
// Node Data Tests
// =============================================================================

#[tokio::test]
async fn test_node_data_numeric_variable() {
    let connection = Connection::new(AddressSpaceFixtures::plant());
    let reference = ReferenceDescription::new(NodeId::numeric(2, 101), "2:Temperature", NodeClass::Variable);

    let data = connection.get_node_data(&reference, "/Line1").await.unwrap();

    let attrs = &data.attributes;
    assert_eq!(attrs.get(attribute_names::NODE_ID), Some("101"));
    assert_eq!(attrs.get(attribute_names::NODE_ID_TYPE), Some("numeric"));
    assert_eq!(attrs.get(attribute_names::BROWSE_NAME), Some("Temperature"));
    assert_eq!(attrs.get(attribute_names::FULL_PATH), Some("/Line1/Temperature"));
    assert_eq!(attrs.get(attribute_names::TYPE_NAME), Some("Double"));
    assert_eq!(attrs.get(attribute_names::DATA_SIZE), Some("8"));
    assert_eq!(
        attrs.get(attribute_names::SOURCE_TIMESTAMP),
        Some(fixed_timestamp().to_rfc3339().as_str())
    );
    assert_eq!(data.content().unwrap().as_deref(), Some("21.5"));
}

#[tokio::test]
async fn test_node_data_string_variable() {
    let connection = Connection::new(AddressSpaceFixtures::plant());
    let reference = ReferenceDescription::new(NodeId::string(2, "Status"), "2:Status", NodeClass::Variable);

    let data = connection.get_node_data(&reference, "").await.unwrap();

    assert_eq!(data.attributes.get(attribute_names::NODE_ID), Some("Status"));
    assert_eq!(data.attributes.get(attribute_names::NODE_ID_TYPE), Some("string"));
    assert_eq!(data.attributes.get(attribute_names::FULL_PATH), Some("/Status"));
    assert!(data.attributes.get(attribute_names::DATA_SIZE).is_none());
    assert_eq!(data.content().unwrap().as_deref(), Some("running"));
}

#[tokio::test]
async fn test_node_data_bad_status_has_no_value() {
    let transport = AddressSpaceFixtures::plant();
    transport.set_read_status(&NodeId::numeric(2, 200), StatusCode(0x803B_0000));
    let connection = Connection::new(transport);
    let reference = ReferenceDescription::new(NodeId::numeric(2, 200), "2:Pressure", NodeClass::Variable);

    let data = connection.get_node_data(&reference, "").await.unwrap();

    assert!(data.value.is_none());
    assert!(data.attributes.get(attribute_names::TYPE_NAME).is_none());
    assert_eq!(data.content().unwrap(), None);
}

#[tokio::test]
async fn test_node_data_read_failure() {
    let transport = AddressSpaceFixtures::plant();
    transport.fail_read(&NodeId::numeric(2, 101));
    let connection = Connection::new(transport);
    let reference = ReferenceDescription::new(NodeId::numeric(2, 101), "2:Temperature", NodeClass::Variable);

    assert!(connection.get_node_data(&reference, "/Line1").await.is_err());
    assert_eq!(connection.stats().node_read_failures, 1);
}

// =============================================================================
// Reconnect Tests
// =============================================================================

#[tokio::test]
async fn test_reconnect_when_connected_is_free() {
    let transport = MockTransport::new();
    let connection = Connection::new(transport.clone());

    assert!(connection.reconnect().await);
    assert_eq!(transport.connect_calls(), 0);
}

#[tokio::test]
async fn test_reconnect_retries_until_success() {
    let transport = MockTransport::disconnected();
    transport.fail_connects(2);
    let connection = Connection::new(transport.clone()).with_retry(fast_retry(3));

    assert!(connection.reconnect().await);
    assert_eq!(transport.connect_calls(), 3);
    assert_eq!(connection.stats().connects, 1);
}

#[tokio::test]
async fn test_reconnect_gives_up() {
    let transport = MockTransport::disconnected();
    transport.fail_connects(10);
    let connection = Connection::new(transport.clone()).with_retry(fast_retry(2));

    assert!(!connection.reconnect().await);
    assert_eq!(transport.connect_calls(), 3);
    assert_eq!(connection.stats().connect_failures, 1);
}

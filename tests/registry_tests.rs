//! Tests for building and replacing the per-network connection registry

mod common;

use std::sync::Arc;

use common::{config_url, Harness, MockConnector, TEST_KEY};
use dex_mcp_gateway::{
    blockchain::{
        networks::{known_networks, NetworkDescriptor},
        registry::{NetworkRegistry, RegistryError},
    },
    gateway::{decoder::RuntimeConfig, ReconfigureError},
};

#[test]
fn test_build_creates_one_connection_per_network() {
    let connector = MockConnector::default();
    let config = RuntimeConfig::new(TEST_KEY, "key1").unwrap();
    let networks = known_networks();

    let registry = NetworkRegistry::build(&config, &networks, &connector).unwrap();

    assert_eq!(registry.len(), networks.len());
    for network in &networks {
        let entry = registry.get(network.network_id).expect("entry for every network");
        assert_eq!(entry.raw().network_id(), network.network_id);
        assert_eq!(entry.descriptor(), network);
        assert!(!entry.has_fee_override());
    }
    assert_eq!(connector.built().len(), networks.len());
}

#[test]
fn test_build_interpolates_the_api_key() {
    let connector = MockConnector::default();
    let config = RuntimeConfig::new(TEST_KEY, "secret-key").unwrap();
    let registry = NetworkRegistry::build(&config, &known_networks(), &connector).unwrap();

    assert_eq!(
        registry.get(84532).unwrap().raw().endpoint(),
        "https://base-sepolia.g.alchemy.com/v2/secret-key"
    );
    assert_eq!(registry.get(5000).unwrap().raw().endpoint(), "https://rpc.mantle.xyz");
}

#[test]
fn test_build_fails_when_any_connection_fails() {
    let connector = MockConnector::default();
    connector.fail_for(42161);
    let config = RuntimeConfig::new(TEST_KEY, "key1").unwrap();

    let result = NetworkRegistry::build(&config, &known_networks(), &connector);
    assert!(matches!(result, Err(RegistryError::ProviderInit(msg)) if msg.contains("42161")));
}

#[tokio::test]
async fn test_registry_is_empty_before_configuration() {
    let harness = Harness::new();
    let snapshot = harness.state.gateway().snapshot();
    assert!(!snapshot.is_configured());
    assert!(snapshot.registry.is_empty());
}

#[tokio::test]
async fn test_rebuild_replaces_every_connection() {
    let harness = Harness::configured().await;
    let gateway = harness.state.gateway();
    let first = gateway.snapshot();

    gateway.reconfigure(&config_url(TEST_KEY, "key2")).await.unwrap();
    let second = gateway.snapshot();

    assert_eq!(first.registry.network_ids(), second.registry.network_ids());
    for id in second.registry.network_ids() {
        let old = first.registry.get(id).unwrap();
        let new = second.registry.get(id).unwrap();
        assert!(!Arc::ptr_eq(old.raw(), new.raw()), "network {} reused a connection", id);
    }
    assert_eq!(harness.connector.built().len(), 2 * known_networks().len());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_registry() {
    let harness = Harness::configured().await;
    let gateway = harness.state.gateway();
    let before = gateway.snapshot();

    harness.connector.fail_for(8453);
    let err = gateway.reconfigure(&config_url(TEST_KEY, "key2")).await.unwrap_err();
    assert!(matches!(err, ReconfigureError::Registry(_)));
    assert_eq!(err.kind(), "provider_init");

    assert!(Arc::ptr_eq(&before, &gateway.snapshot()));
}

#[tokio::test]
async fn test_network_table_is_data() {
    let extra = NetworkDescriptor {
        network_id: 31337,
        name: "local",
        endpoint_template: "http://127.0.0.1:8545",
        block_interval_ms: 100,
    };
    let mut networks = known_networks();
    networks.push(extra);
    let harness = Harness::with_networks(networks);

    harness
        .state
        .gateway()
        .reconfigure(&config_url(TEST_KEY, "key1"))
        .await
        .unwrap();

    let gateway = harness.state.gateway();
    assert_eq!(gateway.networks().len(), 5);
    assert_eq!(gateway.network(31337).unwrap().block_interval_ms, 100);
    assert!(gateway.snapshot().registry.get(31337).is_some());
}

#[tokio::test]
async fn test_concurrent_readers_see_complete_snapshots() {
    let harness = Harness::configured().await;
    let gateway = harness.state.gateway().clone();
    let expected = known_networks().len();

    let writer = {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            for i in 0..20 {
                gateway
                    .reconfigure(&config_url(TEST_KEY, &format!("key{}", i)))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let snapshot = gateway.snapshot();
                    let key = snapshot.config.as_ref().unwrap().rpc_api_key().to_string();
                    assert_eq!(snapshot.registry.len(), expected);
                    // Registry endpoints always match the snapshot's own key.
                    let endpoint = snapshot.registry.get(84532).unwrap().raw().endpoint().to_string();
                    assert!(endpoint.ends_with(&format!("/{}", key)));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}

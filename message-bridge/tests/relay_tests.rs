//! Unit tests for the VAA relay and the local attestation network
//!
//! These tests build the devnet service (Arbitrum Sepolia EVM, Solana SVM, Aztec),
//! detach its relay, and drive VAAs published by one bridge into the others.

use std::time::Duration;

use bridge_common::chains::{ARBITRUM_SEPOLIA_CHAIN_ID, AZTEC_CHAIN_ID, SOLANA_CHAIN_ID};
use bridge_common::{body_hash, Vaa};
use message_bridge::config::RouteConfig;
use message_bridge::network::AttestationNetwork;
use message_bridge::{
    BridgeError, BridgeService, Config, LocalAttestationNetwork, RelayOutcome, RelayRoute,
    VaaRelay,
};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{build_vaa, default18_payload, vector_vaa, DUMMY_REMOTE_EMITTER};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const SENDER: [u8; 32] = [0x77; 32];

async fn devnet() -> BridgeService {
    BridgeService::build(Config::default())
        .await
        .expect("devnet service builds")
}

async fn current_value(service: &BridgeService, chain_id: u16) -> u128 {
    service
        .bridge(chain_id)
        .expect("bridge configured")
        .lock()
        .await
        .get_current_value()
        .unwrap()
}

// ============================================================================
// ATTESTATION NETWORK TESTS
// ============================================================================

/// 1. Test: Sequences Are Per Emitter
/// Verifies each (chain, emitter) pair counts from zero independently.
#[test]
fn test_network_sequences_per_emitter() {
    let network = LocalAttestationNetwork::new(0);
    let a = [1u8; 32];
    let b = [2u8; 32];

    assert_eq!(network.publish_message(1, a, 0, &[], 1).unwrap(), 0);
    assert_eq!(network.publish_message(1, a, 1, &[], 1).unwrap(), 1);
    assert_eq!(network.publish_message(1, b, 0, &[], 1).unwrap(), 0);
    assert_eq!(network.publish_message(2, a, 0, &[], 1).unwrap(), 0);
    assert_eq!(network.next_sequence(1, &a), 2);
    assert_eq!(network.message_fee(), 0);
}

/// 2. Test: Posting Is Idempotent
/// Verifies posting twice returns the same body hash and malformed input is refused.
#[test]
fn test_network_post_idempotent() {
    let network = LocalAttestationNetwork::new(0);
    let raw = vector_vaa();
    let expected = body_hash(&raw).unwrap();

    assert!(!network.is_posted(&expected));
    assert_eq!(network.post_vaa(&raw).unwrap(), expected);
    assert_eq!(network.post_vaa(&raw).unwrap(), expected);
    assert!(network.is_posted(&expected));

    assert!(matches!(
        network.post_vaa(&raw[..10]),
        Err(BridgeError::InvalidVaa(_))
    ));
}

/// 3. Test: Published VAA Layout
/// Verifies subscribers receive a parsable VAA carrying the published fields, and a
/// dropped subscriber does not break publishing.
#[tokio::test]
async fn test_network_subscribers() {
    let network = LocalAttestationNetwork::new(0);
    let dropped = network.subscribe();
    drop(dropped);
    let mut rx = network.subscribe();

    let sequence = network
        .publish_message(AZTEC_CHAIN_ID, [9u8; 32], 42, &[1, 2, 3], 15)
        .unwrap();
    let vaa = Vaa::parse(&rx.recv().await.unwrap()).unwrap();

    assert_eq!(vaa.version, 1);
    assert_eq!(vaa.emitter_chain, AZTEC_CHAIN_ID);
    assert_eq!(vaa.emitter_address, [9u8; 32]);
    assert_eq!(vaa.sequence, sequence);
    assert_eq!(vaa.nonce, 42);
    assert_eq!(vaa.consistency_level, 15);
    assert_eq!(vaa.payload, vec![1, 2, 3]);
}

// ============================================================================
// RELAY ROUTING TESTS
// ============================================================================

/// 4. Test: Devnet Routes Every Pair
/// Verifies the default relay routes each ordered pair of bridges, filtered on the
/// source bridge's emitter.
#[tokio::test]
async fn test_devnet_full_mesh_routes() {
    let mut service = devnet().await;
    let evm_emitter = service
        .bridge(ARBITRUM_SEPOLIA_CHAIN_ID)
        .unwrap()
        .lock()
        .await
        .emitter_address();
    let (relay, _rx) = service.take_relay().expect("relay enabled");

    assert_eq!(relay.routes().len(), 6);
    assert!(relay.routes().contains(&RelayRoute {
        source_chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
        destination_chain_id: SOLANA_CHAIN_ID,
        emitter: Some(evm_emitter),
    }));
    assert!(service.take_relay().is_none());
}

/// 5. Test: Relay Delivers To The Payload Destination Only
/// Verifies an EVM send to Solana is delivered to Solana and not attempted on Aztec.
/// Why: Full-mesh routes would otherwise fail every other destination.
#[tokio::test]
async fn test_relay_delivers_to_destination() {
    let mut service = devnet().await;
    let (relay, mut rx) = service.take_relay().unwrap();

    let sent = service
        .bridge(ARBITRUM_SEPOLIA_CHAIN_ID)
        .unwrap()
        .lock()
        .await
        .send_value(&SENDER, SOLANA_CHAIN_ID, 500, 0)
        .unwrap();
    let raw = rx.recv().await.unwrap();

    let outcomes = relay.process(&raw).await;
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        RelayOutcome::Delivered {
            destination_chain_id,
            message,
        } => {
            assert_eq!(*destination_chain_id, SOLANA_CHAIN_ID);
            assert_eq!(message.sequence, sent.sequence);
            assert_eq!(message.value, 500);
        }
        other => panic!("Expected delivery, got {:?}", other),
    }
    assert_eq!(current_value(&service, SOLANA_CHAIN_ID).await, 500);
    assert_eq!(current_value(&service, AZTEC_CHAIN_ID).await, 0);

    // A repeat within the dedupe window never reaches the bridge.
    assert!(relay.process(&raw).await.is_empty());

    // Without the window, the bridge reports it as already delivered.
    let relay = relay.with_dedupe_ttl(Duration::ZERO);
    let again = relay.process(&raw).await;
    assert_eq!(
        again,
        vec![RelayOutcome::AlreadyDelivered {
            destination_chain_id: SOLANA_CHAIN_ID
        }]
    );
    assert!(again[0].is_success());
}

/// 6. Test: Extended50 Across The Relay
/// Verifies an Aztec send reaches the EVM bridge, which registered Aztec with the
/// 50-byte format at startup.
#[tokio::test]
async fn test_relay_aztec_to_evm() {
    let mut service = devnet().await;
    let (relay, mut rx) = service.take_relay().unwrap();

    let sent = service
        .bridge(AZTEC_CHAIN_ID)
        .unwrap()
        .lock()
        .await
        .send_value(&SENDER, ARBITRUM_SEPOLIA_CHAIN_ID, 9001, 0)
        .unwrap();
    assert_eq!(sent.payload.len(), 50);

    let outcomes = relay.process(&rx.recv().await.unwrap()).await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert_eq!(current_value(&service, ARBITRUM_SEPOLIA_CHAIN_ID).await, 9001);
}

/// 7. Test: Unroutable VAAs Are Dropped
/// Verifies garbage and VAAs from unknown emitters produce no outcomes.
#[tokio::test]
async fn test_relay_drops_unroutable() {
    let mut service = devnet().await;
    let (relay, _rx) = service.take_relay().unwrap();

    assert!(relay.process(&[0u8; 12]).await.is_empty());

    let foreign = build_vaa(
        ARBITRUM_SEPOLIA_CHAIN_ID,
        [0x66; 32],
        0,
        0,
        default18_payload(SOLANA_CHAIN_ID, 1),
    );
    assert!(relay.process(&foreign).await.is_empty());
    assert_eq!(current_value(&service, SOLANA_CHAIN_ID).await, 0);
}

/// 8. Test: Route Without Bridge Fails
/// Verifies a route to a chain with no attached bridge yields a failed outcome.
#[tokio::test]
async fn test_relay_missing_destination_bridge() {
    let network = std::sync::Arc::new(LocalAttestationNetwork::new(0));
    let mut relay = VaaRelay::new(network);
    relay.add_route(RelayRoute {
        source_chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
        destination_chain_id: SOLANA_CHAIN_ID,
        emitter: None,
    });

    let outcomes = relay.process(&vector_vaa()).await;
    assert_eq!(
        outcomes,
        vec![RelayOutcome::Failed {
            destination_chain_id: SOLANA_CHAIN_ID,
            error: BridgeError::NotInitialized,
        }]
    );
    assert!(!outcomes[0].is_success());
}

/// 9. Test: Explicit Routes Replace The Mesh
/// Verifies configured routes are the only ones used.
#[tokio::test]
async fn test_explicit_routes() {
    let mut config = Config::default();
    config.relay.routes = vec![RouteConfig {
        source_chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
        destination_chain_id: SOLANA_CHAIN_ID,
        emitter: None,
    }];
    let mut service = BridgeService::build(config).await.unwrap();
    let (relay, _rx) = service.take_relay().unwrap();

    assert_eq!(relay.routes().len(), 1);

    // The devnet EVM bridge lives at 0x..abcdef, so the reference VAA is its message.
    let raw = vector_vaa();
    let outcomes = relay.process(&raw).await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());

    let aztec_vaa = build_vaa(
        AZTEC_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        0,
        0,
        default18_payload(SOLANA_CHAIN_ID, 1),
    );
    assert!(relay.process(&aztec_vaa).await.is_empty());
}

/// 10. Test: Running Relay
/// Verifies the spawned relay loop delivers published messages on its own.
#[tokio::test]
async fn test_relay_run_loop() {
    let mut service = devnet().await;
    let (relay, rx) = service.take_relay().unwrap();
    let handle = tokio::spawn(relay.run(rx));

    service
        .bridge(SOLANA_CHAIN_ID)
        .unwrap()
        .lock()
        .await
        .send_value(&SENDER, ARBITRUM_SEPOLIA_CHAIN_ID, 31337, 0)
        .unwrap();

    let mut delivered = false;
    for _ in 0..50 {
        if current_value(&service, ARBITRUM_SEPOLIA_CHAIN_ID).await == 31337 {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "relay loop should deliver the message");
    handle.abort();
}

/// 11. Test: Duplicate VAAs Skipped Only After Success
/// Verifies a delivered VAA is skipped on repeat, while a failed one is retried.
/// Why: The network delivers at least once; failures must stay retryable.
#[tokio::test]
async fn test_relay_dedupes_delivered_vaas() {
    let network = std::sync::Arc::new(LocalAttestationNetwork::new(0));
    let mut relay = VaaRelay::new(network);
    relay.add_route(RelayRoute {
        source_chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
        destination_chain_id: SOLANA_CHAIN_ID,
        emitter: None,
    });
    let raw = vector_vaa();

    // No bridge attached: every attempt fails and is not remembered.
    assert_eq!(relay.process(&raw).await.len(), 1);
    assert_eq!(relay.process(&raw).await.len(), 1);

    let mut service = devnet().await;
    let (relay, _rx) = service.take_relay().unwrap();
    assert_eq!(relay.process(&raw).await.len(), 1);
    assert!(relay.process(&raw).await.is_empty());

    // A different sequence from the same emitter is a different VAA.
    let next = build_vaa(
        ARBITRUM_SEPOLIA_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        8,
        0,
        default18_payload(SOLANA_CHAIN_ID, 43),
    );
    assert_eq!(relay.process(&next).await.len(), 1);
    assert_eq!(current_value(&service, SOLANA_CHAIN_ID).await, 43);
}

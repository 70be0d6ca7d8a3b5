//! Concurrency tests for shared bridges
//!
//! Bridges are shared between the relay and API tasks behind one lock per instance.
//! These tests race many deliveries and sends against the same bridge.

use std::sync::Arc;

use bridge_common::chains::{ARBITRUM_SEPOLIA_CHAIN_ID, SOLANA_CHAIN_ID};
use bridge_common::PayloadFormat;
use futures::future::join_all;
use message_bridge::relay::deliver;
use message_bridge::{share, BridgeError};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_vaa, default18_payload, evm_bridge, initialized, register_remote, svm_bridge,
    test_network, vector_vaa, DUMMY_REMOTE_EMITTER, DUMMY_VALUE, OTHER_CALLER,
};

/// 1. Test: Concurrent Duplicate Deliveries
/// Verifies exactly one of many racing deliveries of the same VAA applies.
/// Why: Relayers retry and several relayers may submit the same VAA.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_deliveries() {
    let network = test_network(0);
    let mut bridge = initialized(svm_bridge(SOLANA_CHAIN_ID, network.clone()));
    register_remote(&mut bridge, ARBITRUM_SEPOLIA_CHAIN_ID, PayloadFormat::Default18);
    let shared = share(bridge);
    let raw = Arc::new(vector_vaa());

    let tasks = (0..16).map(|_| {
        let shared = shared.clone();
        let network = network.clone();
        let raw = raw.clone();
        tokio::spawn(async move { deliver(&shared, network.as_ref(), &raw).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let applied = results.iter().filter(|r| r.is_ok()).count();
    let replays = results
        .iter()
        .filter(|r| matches!(r, Err(BridgeError::AlreadyProcessed { .. })))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(replays, 15);
    assert_eq!(shared.lock().await.get_current_value().unwrap(), DUMMY_VALUE);
}

/// 2. Test: Concurrent Distinct Deliveries
/// Verifies every distinct sequence applies once when delivered in parallel.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_distinct_deliveries() {
    let network = test_network(0);
    let mut bridge = initialized(evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, network.clone()));
    register_remote(&mut bridge, SOLANA_CHAIN_ID, PayloadFormat::Default18);
    let shared = share(bridge);

    let tasks = (0..20u64).map(|sequence| {
        let shared = shared.clone();
        let network = network.clone();
        tokio::spawn(async move {
            let raw = build_vaa(
                SOLANA_CHAIN_ID,
                DUMMY_REMOTE_EMITTER,
                sequence,
                0,
                default18_payload(ARBITRUM_SEPOLIA_CHAIN_ID, sequence as u128 + 100),
            );
            deliver(&shared, network.as_ref(), &raw).await
        })
    });
    for joined in join_all(tasks).await {
        assert!(joined.expect("task panicked").is_ok());
    }

    let bridge = shared.lock().await;
    for sequence in 0..20u64 {
        let record = bridge
            .received_message(SOLANA_CHAIN_ID, sequence)
            .unwrap()
            .expect("record stored");
        assert_eq!(record.value, sequence as u128 + 100);
    }
}

/// 3. Test: Concurrent Sends Get Unique Nonces
/// Verifies parallel senders never share a nonce or a network sequence.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_unique_nonces() {
    let network = test_network(0);
    let bridge = initialized(evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, network.clone()));
    let emitter = bridge.emitter_address();
    let shared = share(bridge);

    let tasks = (0..25u128).map(|value| {
        let shared = shared.clone();
        tokio::spawn(async move {
            shared
                .lock()
                .await
                .send_value(&OTHER_CALLER, SOLANA_CHAIN_ID, value, 0)
        })
    });
    let mut nonces: Vec<u32> = Vec::new();
    let mut sequences: Vec<u64> = Vec::new();
    for joined in join_all(tasks).await {
        let sent = joined.expect("task panicked").unwrap();
        nonces.push(sent.nonce);
        sequences.push(sent.sequence);
    }
    nonces.sort_unstable();
    sequences.sort_unstable();

    assert_eq!(nonces, (0..25).collect::<Vec<u32>>());
    assert_eq!(sequences, (0..25).collect::<Vec<u64>>());
    assert_eq!(shared.lock().await.config().unwrap().nonce, 25);
    assert_eq!(network.next_sequence(ARBITRUM_SEPOLIA_CHAIN_ID, &emitter), 25);
}

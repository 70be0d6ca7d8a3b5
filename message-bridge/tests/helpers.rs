//! Shared test helpers for message bridge tests
//!
//! The module is organized into several categories:
//! - **Constants**: Dummy addresses, identities and the reference VAA values
//! - **Bridge Builders**: Initialized bridges on each host model
//! - **VAA Builders**: Raw VAAs with arbitrary emitters and payloads

#![allow(dead_code)]

use std::sync::Arc;

use bridge_common::chains::{ARBITRUM_SEPOLIA_CHAIN_ID, SOLANA_CHAIN_ID};
use bridge_common::{GuardianSignature, PayloadFormat, Vaa, ValueMessage};
use message_bridge::hosts::{AztecStorage, EvmStorage, SvmStorage};
use message_bridge::{LocalAttestationNetwork, MessageBridge};
use solana_program::pubkey::Pubkey;

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- USERS ---------------------------------

/// Canonical owner identity used for every test bridge
pub const DUMMY_OWNER: [u8; 32] = [0x11; 32];

/// Canonical identity that is not the owner
pub const OTHER_CALLER: [u8; 32] = [0x99; 32];

// ------------------------------ CONTRACTS -------------------------------

/// Bridge contract on the EVM host (20 bytes, ends in 0xabcdef)
pub const DUMMY_EVM_CONTRACT: [u8; 20] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xab, 0xcd, 0xef,
];

/// Bridge program id on the account host
pub const DUMMY_SVM_PROGRAM_ID: [u8; 32] = [0x22; 32];

/// Bridge contract on the circuit host
pub const DUMMY_AZTEC_CONTRACT: [u8; 32] = [0x44; 32];

/// Canonical form of the remote emitter in the reference VAA
pub const DUMMY_REMOTE_EMITTER: [u8; 32] = {
    let mut out = [0u8; 32];
    out[29] = 0xab;
    out[30] = 0xcd;
    out[31] = 0xef;
    out
};

// ------------------------------ REFERENCE -------------------------------

pub const DUMMY_VALUE: u128 = 42;
pub const DUMMY_TIMESTAMP: u32 = 1_700_000_000;
pub const VECTOR_SEQUENCE: u64 = 7;

/// Body hash of `vector_vaa()`
pub const VECTOR_BODY_HASH_HEX: &str =
    "5b35c06b458c4f9ce226a4f130320e69605cdbdfec3ab9f4f29e7fc9153d6684";

// ============================================================================
// BRIDGE BUILDERS
// ============================================================================

pub fn test_network(fee: u128) -> Arc<LocalAttestationNetwork> {
    Arc::new(LocalAttestationNetwork::new(fee))
}

pub fn evm_bridge(chain_id: u16, network: Arc<LocalAttestationNetwork>) -> MessageBridge<EvmStorage> {
    MessageBridge::new(chain_id, EvmStorage::new(DUMMY_EVM_CONTRACT), network)
}

pub fn svm_bridge(chain_id: u16, network: Arc<LocalAttestationNetwork>) -> MessageBridge<SvmStorage> {
    MessageBridge::new(
        chain_id,
        SvmStorage::new(Pubkey::new_from_array(DUMMY_SVM_PROGRAM_ID)),
        network,
    )
}

pub fn aztec_bridge(
    chain_id: u16,
    network: Arc<LocalAttestationNetwork>,
) -> MessageBridge<AztecStorage> {
    MessageBridge::new(chain_id, AztecStorage::new(DUMMY_AZTEC_CONTRACT), network)
}

/// Initialize `bridge` with `DUMMY_OWNER`.
pub fn initialized<S: message_bridge::BridgeStorage>(
    mut bridge: MessageBridge<S>,
) -> MessageBridge<S> {
    bridge.initialize(DUMMY_OWNER).unwrap();
    bridge
}

/// Register `DUMMY_REMOTE_EMITTER` for `chain_id` as owner.
pub fn register_remote<S: message_bridge::BridgeStorage>(
    bridge: &mut MessageBridge<S>,
    chain_id: u16,
    payload_format: PayloadFormat,
) {
    bridge
        .register_emitter(&DUMMY_OWNER, chain_id, &DUMMY_REMOTE_EMITTER, payload_format)
        .unwrap();
}

// ============================================================================
// VAA BUILDERS
// ============================================================================

pub fn default18_payload(destination_chain_id: u16, value: u128) -> Vec<u8> {
    ValueMessage::new(destination_chain_id, value)
        .encode(PayloadFormat::Default18)
        .unwrap()
}

/// Version-1 VAA with one placeholder signature.
pub fn build_vaa(
    emitter_chain: u16,
    emitter_address: [u8; 32],
    sequence: u64,
    nonce: u32,
    payload: Vec<u8>,
) -> Vec<u8> {
    Vaa {
        version: 1,
        guardian_set_index: 0,
        signatures: vec![GuardianSignature {
            index: 0,
            signature: [0x11; 65],
        }],
        timestamp: DUMMY_TIMESTAMP,
        nonce,
        emitter_chain,
        emitter_address,
        sequence,
        consistency_level: 1,
        payload,
    }
    .serialize()
    .unwrap()
}

/// Reference VAA: Arbitrum Sepolia emitter 0x..abcdef, sequence 7, value 42 to Solana.
pub fn vector_vaa() -> Vec<u8> {
    build_vaa(
        ARBITRUM_SEPOLIA_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        VECTOR_SEQUENCE,
        0,
        default18_payload(SOLANA_CHAIN_ID, DUMMY_VALUE),
    )
}

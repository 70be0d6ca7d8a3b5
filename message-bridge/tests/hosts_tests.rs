//! Unit tests for the host storage models
//!
//! These tests check where each host keeps bridge state: EVM word slots and mapping
//! keys, PDA accounts with their discriminators, and the circuit host's nullifiers
//! and input capacity.

use borsh::BorshDeserialize;
use bridge_common::chains::{ARBITRUM_SEPOLIA_CHAIN_ID, AZTEC_CHAIN_ID, SOLANA_CHAIN_ID};
use bridge_common::{ChainKind, PayloadFormat};
use message_bridge::guard::ReplayKey;
use message_bridge::hosts::aztec::VAA_INPUT_CAPACITY;
use message_bridge::hosts::evm::{mapping_slot, replay_hash, word_from_u128, word_from_u64};
use message_bridge::hosts::svm::{
    ConfigAccount, CurrentValueAccount, ForeignEmitterAccount, ReceivedAccount,
};
use message_bridge::network::AttestationNetwork;
use message_bridge::{BridgeError, BridgeStorage};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    aztec_bridge, build_vaa, default18_payload, evm_bridge, initialized, register_remote,
    svm_bridge, test_network, vector_vaa, DUMMY_AZTEC_CONTRACT, DUMMY_EVM_CONTRACT, DUMMY_OWNER,
    DUMMY_REMOTE_EMITTER, DUMMY_VALUE, VECTOR_SEQUENCE,
};

// ============================================================================
// EVM HOST TESTS
// ============================================================================

/// 1. Test: EVM Config Slots
/// Verifies initialize writes owner, chain id and emitter to their fixed slots.
/// Why: Off-chain tooling reads these slots directly.
#[test]
fn test_evm_config_slots() {
    let bridge = initialized(evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, test_network(0)));
    let storage = bridge.storage();

    assert_eq!(storage.kind(), ChainKind::Evm);
    assert_eq!(storage.sload(&word_from_u64(0)), DUMMY_OWNER);
    assert_eq!(
        storage.sload(&word_from_u64(1)),
        word_from_u64(ARBITRUM_SEPOLIA_CHAIN_ID as u64)
    );
    assert_eq!(storage.sload(&word_from_u64(2)), [0u8; 32]);

    let mut expected_emitter = [0u8; 32];
    expected_emitter[12..].copy_from_slice(&DUMMY_EVM_CONTRACT);
    assert_eq!(storage.sload(&word_from_u64(4)), expected_emitter);
    assert_eq!(bridge.emitter_address(), expected_emitter);
}

/// 2. Test: EVM Emitter Mapping
/// Verifies the emitter and its format code land at `keccak256(pad32(chain) ++ pad32(slot))`.
#[test]
fn test_evm_emitter_mapping_slots() {
    let mut bridge = initialized(evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, test_network(0)));
    register_remote(&mut bridge, SOLANA_CHAIN_ID, PayloadFormat::Extended50);

    let key = word_from_u64(SOLANA_CHAIN_ID as u64);
    let storage = bridge.storage();
    assert_eq!(storage.sload(&mapping_slot(&key, 6)), DUMMY_REMOTE_EMITTER);
    assert_eq!(storage.sload(&mapping_slot(&key, 7)), word_from_u64(2));

    let entry = storage.foreign_emitter(SOLANA_CHAIN_ID).unwrap().unwrap();
    assert_eq!(entry.payload_format, PayloadFormat::Extended50);
}

/// 3. Test: EVM Replay Slots
/// Verifies the processed flag and received value are keyed by the packed replay hash,
/// and the current value slot is overwritten.
#[test]
fn test_evm_replay_slots() {
    let mut bridge = initialized(evm_bridge(SOLANA_CHAIN_ID, test_network(0)));
    register_remote(&mut bridge, ARBITRUM_SEPOLIA_CHAIN_ID, PayloadFormat::Default18);
    bridge.receive_value(&vector_vaa()).unwrap();

    let key = replay_hash(&ReplayKey::new(ARBITRUM_SEPOLIA_CHAIN_ID, VECTOR_SEQUENCE));
    let storage = bridge.storage();
    assert_eq!(storage.sload(&mapping_slot(&key, 8)), word_from_u64(1));
    assert_eq!(storage.sload(&mapping_slot(&key, 10)), word_from_u128(DUMMY_VALUE));
    assert_eq!(storage.sload(&word_from_u64(9)), word_from_u128(DUMMY_VALUE));

    let other = replay_hash(&ReplayKey::new(ARBITRUM_SEPOLIA_CHAIN_ID, VECTOR_SEQUENCE + 1));
    assert_eq!(storage.sload(&mapping_slot(&other, 8)), [0u8; 32]);
}

/// 4. Test: EVM Nonce Slot Advances
#[test]
fn test_evm_nonce_slot() {
    let mut bridge = initialized(evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, test_network(0)));
    for _ in 0..3 {
        bridge
            .send_value(&DUMMY_OWNER, SOLANA_CHAIN_ID, 1, 0)
            .unwrap();
    }
    assert_eq!(bridge.storage().sload(&word_from_u64(2)), word_from_u64(3));
}

// ============================================================================
// ACCOUNT HOST TESTS
// ============================================================================

/// 5. Test: SVM Accounts Created On Initialize
/// Verifies the config and current-value PDAs exist with their discriminators and sizes.
#[test]
fn test_svm_initialize_accounts() {
    let bridge = initialized(svm_bridge(SOLANA_CHAIN_ID, test_network(0)));
    let storage = bridge.storage();

    let (config_address, bump) = storage.config_pda();
    let data = storage.account_data(&config_address).unwrap();
    assert_eq!(data.len(), ConfigAccount::SIZE);
    let account = ConfigAccount::try_from_slice(data).unwrap();
    assert_eq!(account.discriminator, ConfigAccount::DISCRIMINATOR);
    assert_eq!(account.owner, DUMMY_OWNER);
    assert_eq!(account.chain_id, SOLANA_CHAIN_ID);
    assert_eq!(account.bump, bump);

    let (value_address, _) = storage.current_value_pda();
    let data = storage.account_data(&value_address).unwrap();
    assert_eq!(data.len(), CurrentValueAccount::SIZE);
    assert_eq!(data[0], CurrentValueAccount::DISCRIMINATOR);
}

/// 6. Test: SVM Emitter Is The Emitter PDA
/// Why: The network attributes messages to the program's emitter PDA, not the program id.
#[test]
fn test_svm_emitter_pda() {
    let bridge = initialized(svm_bridge(SOLANA_CHAIN_ID, test_network(0)));
    let (emitter, _) = bridge.storage().emitter_pda();

    assert_eq!(bridge.emitter_address(), emitter.to_bytes());
    assert_ne!(&emitter, bridge.storage().program_id());
}

/// 7. Test: SVM Foreign Emitter Account
#[test]
fn test_svm_foreign_emitter_account() {
    let mut bridge = initialized(svm_bridge(SOLANA_CHAIN_ID, test_network(0)));
    register_remote(&mut bridge, AZTEC_CHAIN_ID, PayloadFormat::Extended50);

    let (address, _) = bridge.storage().foreign_emitter_pda(AZTEC_CHAIN_ID);
    let data = bridge.storage().account_data(&address).unwrap();
    assert_eq!(data.len(), ForeignEmitterAccount::SIZE);
    let account = ForeignEmitterAccount::try_from_slice(data).unwrap();
    assert_eq!(account.discriminator, ForeignEmitterAccount::DISCRIMINATOR);
    assert_eq!(account.chain_id, AZTEC_CHAIN_ID);
    assert_eq!(account.address, DUMMY_REMOTE_EMITTER);
    assert_eq!(account.payload_format, PayloadFormat::Extended50);
}

/// 8. Test: SVM Received Account
/// Verifies receive creates the replay account at the (chain, sequence) PDA.
/// Why: Account creation at a used address fails, which is the replay guard.
#[test]
fn test_svm_received_account() {
    let network = test_network(0);
    let mut bridge = initialized(svm_bridge(SOLANA_CHAIN_ID, network.clone()));
    register_remote(&mut bridge, ARBITRUM_SEPOLIA_CHAIN_ID, PayloadFormat::Default18);
    let raw = vector_vaa();
    network.post_vaa(&raw).unwrap();

    let (address, _) = bridge
        .storage()
        .received_pda(ARBITRUM_SEPOLIA_CHAIN_ID, VECTOR_SEQUENCE);
    assert!(bridge.storage().account_data(&address).is_none());

    bridge.receive_value(&raw).unwrap();

    let data = bridge.storage().account_data(&address).unwrap();
    assert_eq!(data.len(), ReceivedAccount::SIZE);
    let account = ReceivedAccount::try_from_slice(data).unwrap();
    assert_eq!(account.discriminator, ReceivedAccount::DISCRIMINATOR);
    assert_eq!(account.sequence, VECTOR_SEQUENCE);
    assert_eq!(account.value, DUMMY_VALUE);

    assert!(matches!(
        bridge.receive_value(&raw),
        Err(BridgeError::AlreadyProcessed { .. })
    ));
}

/// 9. Test: SVM PDAs Depend On Chain And Sequence
#[test]
fn test_svm_pda_derivation() {
    let bridge = svm_bridge(SOLANA_CHAIN_ID, test_network(0));
    let storage = bridge.storage();

    assert_ne!(
        storage.received_pda(ARBITRUM_SEPOLIA_CHAIN_ID, 1).0,
        storage.received_pda(ARBITRUM_SEPOLIA_CHAIN_ID, 2).0
    );
    assert_ne!(
        storage.received_pda(ARBITRUM_SEPOLIA_CHAIN_ID, 1).0,
        storage.received_pda(AZTEC_CHAIN_ID, 1).0
    );
    assert_ne!(
        storage.foreign_emitter_pda(ARBITRUM_SEPOLIA_CHAIN_ID).0,
        storage.foreign_emitter_pda(AZTEC_CHAIN_ID).0
    );
}

// ============================================================================
// CIRCUIT HOST TESTS
// ============================================================================

/// 10. Test: Aztec Nullifier Emitted On Receive
/// Verifies the (chain, sequence) nullifier appears exactly when the message applies.
#[test]
fn test_aztec_nullifier() {
    let network = test_network(0);
    let mut bridge = initialized(aztec_bridge(AZTEC_CHAIN_ID, network.clone()));
    register_remote(&mut bridge, SOLANA_CHAIN_ID, PayloadFormat::Default18);
    let raw = build_vaa(
        SOLANA_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        11,
        0,
        default18_payload(AZTEC_CHAIN_ID, 77),
    );
    network.post_vaa(&raw).unwrap();

    let nullifier = bridge.storage().received_nullifier(SOLANA_CHAIN_ID, 11);
    assert!(!bridge.storage().nullifier_exists(&nullifier));

    bridge.receive_value(&raw).unwrap();
    assert!(bridge.storage().nullifier_exists(&nullifier));
    assert!(!bridge
        .storage()
        .nullifier_exists(&bridge.storage().received_nullifier(SOLANA_CHAIN_ID, 12)));
    assert_eq!(bridge.get_current_value().unwrap(), 77);
}

/// 11. Test: Aztec Input Capacity
/// Verifies a VAA longer than the entrypoint's input array is rejected before parsing.
#[test]
fn test_aztec_input_capacity() {
    let network = test_network(0);
    let mut bridge = initialized(aztec_bridge(AZTEC_CHAIN_ID, network.clone()));
    register_remote(&mut bridge, SOLANA_CHAIN_ID, PayloadFormat::Default18);

    // 123 bytes of header, one signature and fixed body fields, plus the payload.
    let oversized = build_vaa(
        SOLANA_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        1,
        0,
        vec![0u8; VAA_INPUT_CAPACITY],
    );
    assert!(oversized.len() > VAA_INPUT_CAPACITY);
    assert!(matches!(
        bridge.receive_value(&oversized),
        Err(BridgeError::InvalidVaa(_))
    ));

    let fits = build_vaa(
        SOLANA_CHAIN_ID,
        DUMMY_REMOTE_EMITTER,
        1,
        0,
        default18_payload(AZTEC_CHAIN_ID, 5),
    );
    network.post_vaa(&fits).unwrap();
    assert_eq!(bridge.receive_value(&fits).unwrap().value, 5);
}

/// 12. Test: Aztec Emitter And Tx Id
/// Verifies the contract address is the emitter and outbound tx ids come from the host.
#[test]
fn test_aztec_emitter_and_tx_id() {
    let mut bridge = initialized(aztec_bridge(AZTEC_CHAIN_ID, test_network(0)));
    assert_eq!(bridge.emitter_address(), DUMMY_AZTEC_CONTRACT);

    let sent = bridge
        .send_value(&DUMMY_OWNER, SOLANA_CHAIN_ID, DUMMY_VALUE, 0)
        .unwrap();
    let expected = bridge
        .storage()
        .origin_tx_id(sent.nonce, SOLANA_CHAIN_ID, DUMMY_VALUE)
        .unwrap();
    assert_eq!(sent.payload[..32], expected[..]);
}

/// 13. Test: Hosts Without Tx Ids
#[test]
fn test_evm_and_svm_have_no_tx_id() {
    let evm = evm_bridge(ARBITRUM_SEPOLIA_CHAIN_ID, test_network(0));
    let svm = svm_bridge(SOLANA_CHAIN_ID, test_network(0));

    assert!(evm.storage().origin_tx_id(0, SOLANA_CHAIN_ID, 1).is_none());
    assert!(svm.storage().origin_tx_id(0, AZTEC_CHAIN_ID, 1).is_none());
}

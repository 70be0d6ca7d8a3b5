//! Circuit-chain host storage model.
//!
//! Public state is a map of field-keyed records; replay protection uses the
//! nullifier tree, where inserting an existing nullifier fails the transaction.
//! Contract entrypoints take the VAA as a fixed-width byte array plus its actual
//! length, so inputs longer than `VAA_INPUT_CAPACITY` cannot be received.

use std::collections::{HashMap, HashSet};

use bridge_common::ChainKind;
use sha2::{Digest, Sha256};

use crate::error::BridgeError;
use crate::state::{BridgeConfig, ForeignEmitter, ReceivedMessage};
use crate::storage::BridgeStorage;

/// Width of the VAA input array of the receive entrypoint.
pub const VAA_INPUT_CAPACITY: usize = 2000;

pub type Field = [u8; 32];

const NULLIFIER_DOMAIN: &[u8] = b"message_bridge::received";
const TX_ID_DOMAIN: &[u8] = b"message_bridge::tx";

/// Public storage and nullifier set of one deployed bridge contract.
pub struct AztecStorage {
    contract: Field,
    config: Option<BridgeConfig>,
    emitters: HashMap<u16, ForeignEmitter>,
    received: HashMap<Field, ReceivedMessage>,
    current_value: u128,
    nullifiers: HashSet<Field>,
}

impl AztecStorage {
    pub fn new(contract: Field) -> Self {
        Self {
            contract,
            config: None,
            emitters: HashMap::new(),
            received: HashMap::new(),
            current_value: 0,
            nullifiers: HashSet::new(),
        }
    }

    /// Nullifier emitted for an applied message, siloed by contract address.
    pub fn received_nullifier(&self, emitter_chain: u16, sequence: u64) -> Field {
        let mut hasher = Sha256::new();
        hasher.update(NULLIFIER_DOMAIN);
        hasher.update(self.contract);
        hasher.update(emitter_chain.to_be_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.finalize().into()
    }

    pub fn nullifier_exists(&self, nullifier: &Field) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// Insert into the nullifier set. Returns false for a duplicate.
    fn push_nullifier(&mut self, nullifier: Field) -> bool {
        self.nullifiers.insert(nullifier)
    }
}

impl BridgeStorage for AztecStorage {
    fn kind(&self) -> ChainKind {
        ChainKind::Aztec
    }

    fn emitter_address(&self) -> [u8; 32] {
        self.contract
    }

    fn load_config(&self) -> Result<Option<BridgeConfig>, BridgeError> {
        Ok(self.config.clone())
    }

    fn init_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        if self.config.is_some() {
            return Err(BridgeError::AlreadyInitialized);
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn store_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        match self.config.as_mut() {
            Some(current) => {
                *current = config.clone();
                Ok(())
            }
            None => Err(BridgeError::NotInitialized),
        }
    }

    fn foreign_emitter(&self, chain_id: u16) -> Result<Option<ForeignEmitter>, BridgeError> {
        Ok(self.emitters.get(&chain_id).copied())
    }

    fn put_foreign_emitters(&mut self, emitters: &[ForeignEmitter]) -> Result<(), BridgeError> {
        self.emitters
            .extend(emitters.iter().map(|entry| (entry.chain_id, *entry)));
        Ok(())
    }

    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError> {
        let nullifier = self.received_nullifier(emitter_chain, sequence);
        Ok(self.received.get(&nullifier).copied())
    }

    fn commit_inbound(&mut self, message: &ReceivedMessage) -> Result<bool, BridgeError> {
        let nullifier = self.received_nullifier(message.emitter_chain, message.sequence);
        if !self.push_nullifier(nullifier) {
            return Ok(false);
        }
        self.received.insert(nullifier, *message);
        self.current_value = message.value;
        Ok(true)
    }

    fn current_value(&self) -> Result<u128, BridgeError> {
        Ok(self.current_value)
    }

    /// `sha256(domain || contract || nonce || destination || value)`, standing in for
    /// the transaction hash the contract reads from its execution context.
    fn origin_tx_id(&self, nonce: u32, destination_chain_id: u16, value: u128) -> Option<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(TX_ID_DOMAIN);
        hasher.update(self.contract);
        hasher.update(nonce.to_be_bytes());
        hasher.update(destination_chain_id.to_be_bytes());
        hasher.update(value.to_be_bytes());
        Some(hasher.finalize().into())
    }

    fn check_vaa_input(&self, raw: &[u8]) -> Result<(), BridgeError> {
        if raw.len() > VAA_INPUT_CAPACITY {
            return Err(BridgeError::InvalidVaa(format!(
                "{} bytes exceeds the {} byte input capacity",
                raw.len(),
                VAA_INPUT_CAPACITY
            )));
        }
        Ok(())
    }
}

//! EVM host storage model.
//!
//! State lives in 32-byte word slots the way the bridge contract lays it out:
//!
//! | slot | contents |
//! |------|----------|
//! | 0 | owner (address, left-padded) |
//! | 1 | local chain id |
//! | 2 | outbound nonce |
//! | 3 | message fee |
//! | 4 | emitter |
//! | 5 | initialized flag |
//! | 6 | `mapping(uint16 => bytes32)` registered emitters |
//! | 7 | `mapping(uint16 => uint8)` emitter payload formats |
//! | 8 | `mapping(bytes32 => bool)` processed messages |
//! | 9 | current value |
//! | 10 | `mapping(bytes32 => uint256)` received values |
//! | 11 | `mapping(bytes32 => uint32)` received batch ids |
//!
//! Mapping entries live at `keccak256(pad32(key) ++ pad32(slot))`. The replay key is
//! `keccak256(abi.encodePacked(uint16 chainId, uint64 sequence))`.

use std::collections::HashMap;

use bridge_common::{ChainKind, PayloadFormat};
use sha3::{Digest, Keccak256};

use crate::error::BridgeError;
use crate::guard::ReplayKey;
use crate::state::{BridgeConfig, ForeignEmitter, ReceivedMessage};
use crate::storage::BridgeStorage;

pub type Word = [u8; 32];

const OWNER_SLOT: u64 = 0;
const CHAIN_ID_SLOT: u64 = 1;
const NONCE_SLOT: u64 = 2;
const MESSAGE_FEE_SLOT: u64 = 3;
const EMITTER_SLOT: u64 = 4;
const INITIALIZED_SLOT: u64 = 5;
const EMITTERS_MAPPING_SLOT: u64 = 6;
const FORMATS_MAPPING_SLOT: u64 = 7;
const PROCESSED_MAPPING_SLOT: u64 = 8;
const CURRENT_VALUE_SLOT: u64 = 9;
const RECEIVED_VALUE_MAPPING_SLOT: u64 = 10;
const RECEIVED_BATCH_MAPPING_SLOT: u64 = 11;

// Format codes are offset by one so an unset slot never decodes as a format.
const FORMAT_DEFAULT18: u8 = 1;
const FORMAT_EXTENDED50: u8 = 2;

// ============================================================================
// WORD HELPERS
// ============================================================================

pub fn word_from_u128(value: u128) -> Word {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn word_from_u64(value: u64) -> Word {
    word_from_u128(value as u128)
}

fn word_to_u128(word: &Word) -> Result<u128, BridgeError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(BridgeError::CorruptState(format!(
            "word 0x{} overflows u128",
            hex::encode(word)
        )));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

fn word_to_narrow<T: TryFrom<u128>>(word: &Word, what: &str) -> Result<T, BridgeError> {
    T::try_from(word_to_u128(word)?)
        .map_err(|_| BridgeError::CorruptState(format!("{} out of range", what)))
}

/// Slot of `mapping[key]` for a mapping declared at `slot`.
pub fn mapping_slot(key: &Word, slot: u64) -> Word {
    let mut hasher = Keccak256::new();
    hasher.update(key);
    hasher.update(word_from_u64(slot));
    hasher.finalize().into()
}

/// `keccak256(abi.encodePacked(uint16 chainId, uint64 sequence))`.
pub fn replay_hash(key: &ReplayKey) -> Word {
    Keccak256::digest(key.packed_be()).into()
}

fn format_code(format: PayloadFormat) -> u8 {
    match format {
        PayloadFormat::Default18 => FORMAT_DEFAULT18,
        PayloadFormat::Extended50 => FORMAT_EXTENDED50,
    }
}

fn format_from_code(code: u8) -> Result<PayloadFormat, BridgeError> {
    match code {
        FORMAT_DEFAULT18 => Ok(PayloadFormat::Default18),
        FORMAT_EXTENDED50 => Ok(PayloadFormat::Extended50),
        other => Err(BridgeError::CorruptState(format!(
            "unknown payload format code {}",
            other
        ))),
    }
}

// ============================================================================
// STORAGE
// ============================================================================

/// Word-slot storage of one deployed bridge contract.
pub struct EvmStorage {
    contract: [u8; 20],
    slots: HashMap<Word, Word>,
}

impl EvmStorage {
    pub fn new(contract: [u8; 20]) -> Self {
        Self {
            contract,
            slots: HashMap::new(),
        }
    }

    pub fn contract_address(&self) -> [u8; 20] {
        self.contract
    }

    /// Raw `sload`; unset slots read as zero.
    pub fn sload(&self, slot: &Word) -> Word {
        self.slots.get(slot).copied().unwrap_or([0u8; 32])
    }

    fn sstore(&mut self, slot: Word, value: Word) {
        if value == [0u8; 32] {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, value);
        }
    }

    fn sload_fixed(&self, slot: u64) -> Word {
        self.sload(&word_from_u64(slot))
    }

    fn sstore_fixed(&mut self, slot: u64, value: Word) {
        self.sstore(word_from_u64(slot), value);
    }

    fn write_config(&mut self, config: &BridgeConfig) {
        self.sstore_fixed(OWNER_SLOT, config.owner);
        self.sstore_fixed(CHAIN_ID_SLOT, word_from_u64(config.local_chain_id as u64));
        self.sstore_fixed(NONCE_SLOT, word_from_u64(config.nonce as u64));
        self.sstore_fixed(MESSAGE_FEE_SLOT, word_from_u128(config.message_fee));
        self.sstore_fixed(EMITTER_SLOT, config.emitter);
        self.sstore_fixed(INITIALIZED_SLOT, word_from_u64(1));
    }

    fn is_initialized(&self) -> bool {
        self.sload_fixed(INITIALIZED_SLOT) != [0u8; 32]
    }
}

impl BridgeStorage for EvmStorage {
    fn kind(&self) -> ChainKind {
        ChainKind::Evm
    }

    fn emitter_address(&self) -> [u8; 32] {
        let mut canonical = [0u8; 32];
        canonical[12..].copy_from_slice(&self.contract);
        canonical
    }

    fn load_config(&self) -> Result<Option<BridgeConfig>, BridgeError> {
        if !self.is_initialized() {
            return Ok(None);
        }
        Ok(Some(BridgeConfig {
            owner: self.sload_fixed(OWNER_SLOT),
            local_chain_id: word_to_narrow(&self.sload_fixed(CHAIN_ID_SLOT), "chain id")?,
            nonce: word_to_narrow(&self.sload_fixed(NONCE_SLOT), "nonce")?,
            message_fee: word_to_u128(&self.sload_fixed(MESSAGE_FEE_SLOT))?,
            emitter: self.sload_fixed(EMITTER_SLOT),
        }))
    }

    fn init_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        if self.is_initialized() {
            return Err(BridgeError::AlreadyInitialized);
        }
        self.write_config(config);
        Ok(())
    }

    fn store_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        if !self.is_initialized() {
            return Err(BridgeError::NotInitialized);
        }
        self.write_config(config);
        Ok(())
    }

    fn foreign_emitter(&self, chain_id: u16) -> Result<Option<ForeignEmitter>, BridgeError> {
        let key = word_from_u64(chain_id as u64);
        let address = self.sload(&mapping_slot(&key, EMITTERS_MAPPING_SLOT));
        if address == [0u8; 32] {
            return Ok(None);
        }
        let code: u8 = word_to_narrow(
            &self.sload(&mapping_slot(&key, FORMATS_MAPPING_SLOT)),
            "payload format",
        )?;
        Ok(Some(ForeignEmitter {
            chain_id,
            address,
            payload_format: format_from_code(code)?,
        }))
    }

    fn put_foreign_emitters(&mut self, emitters: &[ForeignEmitter]) -> Result<(), BridgeError> {
        for entry in emitters {
            let key = word_from_u64(entry.chain_id as u64);
            self.sstore(mapping_slot(&key, EMITTERS_MAPPING_SLOT), entry.address);
            self.sstore(
                mapping_slot(&key, FORMATS_MAPPING_SLOT),
                word_from_u64(format_code(entry.payload_format) as u64),
            );
        }
        Ok(())
    }

    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError> {
        let key = replay_hash(&ReplayKey::new(emitter_chain, sequence));
        if self.sload(&mapping_slot(&key, PROCESSED_MAPPING_SLOT)) == [0u8; 32] {
            return Ok(None);
        }
        Ok(Some(ReceivedMessage {
            emitter_chain,
            sequence,
            value: word_to_u128(&self.sload(&mapping_slot(&key, RECEIVED_VALUE_MAPPING_SLOT)))?,
            batch_id: word_to_narrow(
                &self.sload(&mapping_slot(&key, RECEIVED_BATCH_MAPPING_SLOT)),
                "batch id",
            )?,
        }))
    }

    fn commit_inbound(&mut self, message: &ReceivedMessage) -> Result<bool, BridgeError> {
        let key = replay_hash(&ReplayKey::from(message));
        let processed_slot = mapping_slot(&key, PROCESSED_MAPPING_SLOT);
        if self.sload(&processed_slot) != [0u8; 32] {
            return Ok(false);
        }

        self.sstore(processed_slot, word_from_u64(1));
        self.sstore(
            mapping_slot(&key, RECEIVED_VALUE_MAPPING_SLOT),
            word_from_u128(message.value),
        );
        self.sstore(
            mapping_slot(&key, RECEIVED_BATCH_MAPPING_SLOT),
            word_from_u64(message.batch_id as u64),
        );
        self.sstore_fixed(CURRENT_VALUE_SLOT, word_from_u128(message.value));
        Ok(true)
    }

    fn current_value(&self) -> Result<u128, BridgeError> {
        word_to_u128(&self.sload_fixed(CURRENT_VALUE_SLOT))
    }
}

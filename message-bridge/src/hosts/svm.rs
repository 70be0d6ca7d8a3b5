//! Account-chain host storage model.
//!
//! ## Discriminator Pattern
//!
//! Each account type has a unique `discriminator` byte as its first field:
//! - ConfigAccount = 1, CurrentValueAccount = 2, ForeignEmitterAccount = 3,
//!   ReceivedAccount = 4
//! - On read, the discriminator is checked before the data is trusted.
//!
//! ## Replay Protection
//!
//! Every applied message creates a `ReceivedAccount` at a PDA derived from the
//! source chain and sequence. Account creation fails when the address is already
//! in use, which is the host's create-if-absent primitive.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};
use bridge_common::{ChainKind, PayloadFormat};
use solana_program::pubkey::Pubkey;

use crate::error::BridgeError;
use crate::state::{BridgeConfig, ForeignEmitter, ReceivedMessage};
use crate::storage::BridgeStorage;

/// Bridge configuration account.
/// PDA seeds: ["config"]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfigAccount {
    /// First byte identifies account type (1 = Config). Prevents type confusion on deserialize.
    pub discriminator: u8,
    /// Owner allowed to register emitters
    pub owner: [u8; 32],
    /// This chain's Wormhole chain id (Solana = 1)
    pub chain_id: u16,
    /// Nonce of the next outbound message
    pub nonce: u32,
    pub message_fee: u128,
    /// Emitter PDA the network attributes messages to
    pub emitter: [u8; 32],
    /// Bump seed for PDA derivation
    pub bump: u8,
}

impl ConfigAccount {
    pub const DISCRIMINATOR: u8 = 1;
    pub const SIZE: usize = 1 + 32 + 2 + 4 + 16 + 32 + 1; // 88 bytes

    pub fn new(config: &BridgeConfig, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            owner: config.owner,
            chain_id: config.local_chain_id,
            nonce: config.nonce,
            message_fee: config.message_fee,
            emitter: config.emitter,
            bump,
        }
    }

    fn to_config(&self) -> BridgeConfig {
        BridgeConfig {
            owner: self.owner,
            local_chain_id: self.chain_id,
            nonce: self.nonce,
            message_fee: self.message_fee,
            emitter: self.emitter,
        }
    }
}

/// Last applied value.
/// PDA seeds: ["current_value"]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct CurrentValueAccount {
    pub discriminator: u8,
    pub value: u128,
    pub bump: u8,
}

impl CurrentValueAccount {
    pub const DISCRIMINATOR: u8 = 2;
    pub const SIZE: usize = 1 + 16 + 1; // 18 bytes

    pub fn new(bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            value: 0,
            bump,
        }
    }
}

/// Trusted emitter for a source chain.
/// PDA seeds: ["foreign_emitter", chain_id (u16 LE)]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ForeignEmitterAccount {
    pub discriminator: u8,
    pub chain_id: u16,
    /// Canonical emitter address
    pub address: [u8; 32],
    pub payload_format: PayloadFormat,
    pub bump: u8,
}

impl ForeignEmitterAccount {
    pub const DISCRIMINATOR: u8 = 3;
    pub const SIZE: usize = 1 + 2 + 32 + 1 + 1; // 37 bytes

    pub fn new(entry: &ForeignEmitter, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            chain_id: entry.chain_id,
            address: entry.address,
            payload_format: entry.payload_format,
            bump,
        }
    }
}

/// Replay record.
/// PDA seeds: ["received", emitter_chain (u16 LE), sequence (u64 LE)]
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReceivedAccount {
    pub discriminator: u8,
    pub emitter_chain: u16,
    pub sequence: u64,
    pub value: u128,
    pub batch_id: u32,
    pub bump: u8,
}

impl ReceivedAccount {
    pub const DISCRIMINATOR: u8 = 4;
    pub const SIZE: usize = 1 + 2 + 8 + 16 + 4 + 1; // 32 bytes

    pub fn new(message: &ReceivedMessage, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            emitter_chain: message.emitter_chain,
            sequence: message.sequence,
            value: message.value,
            batch_id: message.batch_id,
            bump,
        }
    }
}

/// Seeds for PDA derivation
pub mod seeds {
    pub const CONFIG_SEED: &[u8] = b"config";
    pub const CURRENT_VALUE_SEED: &[u8] = b"current_value";
    pub const EMITTER_SEED: &[u8] = b"emitter";
    pub const FOREIGN_EMITTER_SEED: &[u8] = b"foreign_emitter";
    pub const RECEIVED_SEED: &[u8] = b"received";
}

// ============================================================================
// STORAGE
// ============================================================================

/// Accounts owned by one deployed bridge program.
pub struct SvmStorage {
    program_id: Pubkey,
    accounts: HashMap<Pubkey, Vec<u8>>,
}

impl SvmStorage {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            accounts: HashMap::new(),
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config_pda(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::CONFIG_SEED], &self.program_id)
    }

    pub fn current_value_pda(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::CURRENT_VALUE_SEED], &self.program_id)
    }

    pub fn emitter_pda(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::EMITTER_SEED], &self.program_id)
    }

    pub fn foreign_emitter_pda(&self, chain_id: u16) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::FOREIGN_EMITTER_SEED, &chain_id.to_le_bytes()],
            &self.program_id,
        )
    }

    pub fn received_pda(&self, emitter_chain: u16, sequence: u64) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[
                seeds::RECEIVED_SEED,
                &emitter_chain.to_le_bytes(),
                &sequence.to_le_bytes(),
            ],
            &self.program_id,
        )
    }

    /// Raw account data, if the account exists.
    pub fn account_data(&self, address: &Pubkey) -> Option<&[u8]> {
        self.accounts.get(address).map(Vec::as_slice)
    }

    fn read_account<T: BorshDeserialize>(
        &self,
        address: &Pubkey,
        discriminator: u8,
    ) -> Result<Option<T>, BridgeError> {
        let Some(data) = self.accounts.get(address) else {
            return Ok(None);
        };
        if data.first() != Some(&discriminator) {
            return Err(BridgeError::CorruptState(format!(
                "account {} has discriminator {:?}, expected {}",
                address,
                data.first(),
                discriminator
            )));
        }
        Ok(Some(T::try_from_slice(data)?))
    }

    /// Create an account; fails when the address is already in use.
    fn create_account<T: BorshSerialize>(
        &mut self,
        address: Pubkey,
        account: &T,
    ) -> Result<bool, BridgeError> {
        let data = account.try_to_vec()?;
        match self.accounts.entry(address) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(data);
                Ok(true)
            }
        }
    }

    fn write_account<T: BorshSerialize>(
        &mut self,
        address: Pubkey,
        account: &T,
    ) -> Result<(), BridgeError> {
        let data = account.try_to_vec()?;
        self.accounts.insert(address, data);
        Ok(())
    }
}

impl BridgeStorage for SvmStorage {
    fn kind(&self) -> ChainKind {
        ChainKind::Svm
    }

    fn emitter_address(&self) -> [u8; 32] {
        self.emitter_pda().0.to_bytes()
    }

    fn load_config(&self) -> Result<Option<BridgeConfig>, BridgeError> {
        let (address, _) = self.config_pda();
        Ok(self
            .read_account::<ConfigAccount>(&address, ConfigAccount::DISCRIMINATOR)?
            .map(|account| account.to_config()))
    }

    fn init_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        let (config_address, config_bump) = self.config_pda();
        let (value_address, value_bump) = self.current_value_pda();
        if self.accounts.contains_key(&config_address) || self.accounts.contains_key(&value_address)
        {
            return Err(BridgeError::AlreadyInitialized);
        }

        self.create_account(config_address, &ConfigAccount::new(config, config_bump))?;
        self.create_account(value_address, &CurrentValueAccount::new(value_bump))?;
        Ok(())
    }

    fn store_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError> {
        let (address, bump) = self.config_pda();
        if !self.accounts.contains_key(&address) {
            return Err(BridgeError::NotInitialized);
        }
        self.write_account(address, &ConfigAccount::new(config, bump))
    }

    fn foreign_emitter(&self, chain_id: u16) -> Result<Option<ForeignEmitter>, BridgeError> {
        let (address, _) = self.foreign_emitter_pda(chain_id);
        Ok(self
            .read_account::<ForeignEmitterAccount>(&address, ForeignEmitterAccount::DISCRIMINATOR)?
            .map(|account| ForeignEmitter {
                chain_id: account.chain_id,
                address: account.address,
                payload_format: account.payload_format,
            }))
    }

    fn put_foreign_emitters(&mut self, emitters: &[ForeignEmitter]) -> Result<(), BridgeError> {
        // Serialize everything first so a failure leaves no partial batch.
        let mut writes = Vec::with_capacity(emitters.len());
        for entry in emitters {
            let (address, bump) = self.foreign_emitter_pda(entry.chain_id);
            writes.push((address, ForeignEmitterAccount::new(entry, bump).try_to_vec()?));
        }
        self.accounts.extend(writes);
        Ok(())
    }

    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError> {
        let (address, _) = self.received_pda(emitter_chain, sequence);
        Ok(self
            .read_account::<ReceivedAccount>(&address, ReceivedAccount::DISCRIMINATOR)?
            .map(|account| ReceivedMessage {
                emitter_chain: account.emitter_chain,
                sequence: account.sequence,
                value: account.value,
                batch_id: account.batch_id,
            }))
    }

    fn commit_inbound(&mut self, message: &ReceivedMessage) -> Result<bool, BridgeError> {
        let (value_address, _) = self.current_value_pda();
        let mut current = self
            .read_account::<CurrentValueAccount>(&value_address, CurrentValueAccount::DISCRIMINATOR)?
            .ok_or(BridgeError::NotInitialized)?;

        let (received_address, bump) = self.received_pda(message.emitter_chain, message.sequence);
        if !self.create_account(received_address, &ReceivedAccount::new(message, bump))? {
            return Ok(false);
        }

        current.value = message.value;
        self.write_account(value_address, &current)?;
        Ok(true)
    }

    fn current_value(&self) -> Result<u128, BridgeError> {
        let (address, _) = self.current_value_pda();
        Ok(self
            .read_account::<CurrentValueAccount>(&address, CurrentValueAccount::DISCRIMINATOR)?
            .map(|account| account.value)
            .unwrap_or(0))
    }
}

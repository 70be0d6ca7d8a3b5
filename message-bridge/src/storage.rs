//! Host storage seam.
//!
//! `MessageBridge` carries the protocol; each host model implements `BridgeStorage`
//! in its native layout (EVM word slots, PDA accounts, circuit public storage and
//! nullifiers). Every method is a single host transaction step: it either applies
//! fully or returns an error with nothing written.

use bridge_common::ChainKind;

use crate::error::BridgeError;
use crate::state::{BridgeConfig, ForeignEmitter, ReceivedMessage};

pub trait BridgeStorage: Send {
    /// Execution environment of this host.
    fn kind(&self) -> ChainKind;

    /// Canonical emitter identity the host publishes under.
    fn emitter_address(&self) -> [u8; 32];

    fn load_config(&self) -> Result<Option<BridgeConfig>, BridgeError>;

    /// Create the configuration record. Fails with `AlreadyInitialized` when one exists.
    fn init_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError>;

    /// Overwrite an existing configuration record.
    fn store_config(&mut self, config: &BridgeConfig) -> Result<(), BridgeError>;

    fn foreign_emitter(&self, chain_id: u16) -> Result<Option<ForeignEmitter>, BridgeError>;

    /// Create or overwrite every entry of an already validated batch.
    fn put_foreign_emitters(&mut self, emitters: &[ForeignEmitter]) -> Result<(), BridgeError>;

    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError>;

    /// Create the replay record for `message` and overwrite the current value.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Record created and value applied
    /// * `Ok(false)` - A record for `(emitter_chain, sequence)` already exists; nothing written
    fn commit_inbound(&mut self, message: &ReceivedMessage) -> Result<bool, BridgeError>;

    fn current_value(&self) -> Result<u128, BridgeError>;

    /// Host transaction id attached to outbound payloads, if the host's format carries one.
    fn origin_tx_id(&self, _nonce: u32, _destination_chain_id: u16, _value: u128) -> Option<[u8; 32]> {
        None
    }

    /// Reject VAAs the host cannot accept as input.
    fn check_vaa_input(&self, _raw: &[u8]) -> Result<(), BridgeError> {
        Ok(())
    }
}

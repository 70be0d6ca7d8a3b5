//! Bridge state machine.
//!
//! ## Overview
//!
//! `MessageBridge` carries the protocol for one bridge instance on one host:
//!
//! 1. `initialize` creates the configuration (Uninitialized -> Ready)
//! 2. `register_emitters` maintains the trusted remote contracts
//! 3. `send_value` encodes, sequences and publishes an outbound value
//! 4. `receive_value` verifies an inbound VAA and applies it at most once
//!
//! ## Security
//!
//! Inbound checks run in a fixed order: VAA shape, posted attestation (hosts that
//! verify in a separate transaction), registered emitter, payload format for that
//! emitter, destination chain, replay guard. Only the replay guard step writes.

use std::sync::Arc;

use bridge_common::chains::CONSISTENCY_LEVEL;
use bridge_common::{ChainKind, PayloadFormat, Vaa, ValueMessage, ZERO_ADDRESS};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::guard;
use crate::network::AttestationNetwork;
use crate::registry::{self, EmitterRegistration};
use crate::state::{BridgeConfig, OutboundMessage, ReceivedMessage};
use crate::storage::BridgeStorage;

pub struct MessageBridge<S: BridgeStorage> {
    chain_id: u16,
    storage: S,
    network: Arc<dyn AttestationNetwork>,
    consistency_level: u8,
}

impl<S: BridgeStorage> MessageBridge<S> {
    /// Create a bridge for `chain_id` on top of `storage`.
    ///
    /// No state is written until `initialize` is called.
    pub fn new(chain_id: u16, storage: S, network: Arc<dyn AttestationNetwork>) -> Self {
        Self {
            chain_id,
            storage,
            network,
            consistency_level: CONSISTENCY_LEVEL,
        }
    }

    pub fn with_consistency_level(mut self, consistency_level: u8) -> Self {
        self.consistency_level = consistency_level;
        self
    }

    pub fn chain_id(&self) -> u16 {
        self.chain_id
    }

    pub fn kind(&self) -> ChainKind {
        self.storage.kind()
    }

    pub fn emitter_address(&self) -> [u8; 32] {
        self.storage.emitter_address()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Format this host emits on outbound sends.
    pub fn outbound_format(&self) -> PayloadFormat {
        self.storage.kind().outbound_format()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Create the bridge configuration with `caller` as owner.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeConfig)` - The created configuration
    /// * `Err(BridgeError::AlreadyInitialized)` - Called twice
    /// * `Err(BridgeError::InvalidOwner)` - Zero caller identity
    pub fn initialize(&mut self, caller: [u8; 32]) -> Result<BridgeConfig, BridgeError> {
        if caller == ZERO_ADDRESS {
            return Err(BridgeError::InvalidOwner);
        }

        let config = BridgeConfig {
            owner: caller,
            local_chain_id: self.chain_id,
            nonce: 0,
            message_fee: self.network.message_fee(),
            emitter: self.storage.emitter_address(),
        };
        self.storage.init_config(&config)?;

        info!("MessageBridge initialized on chain {}", self.chain_id);
        info!("Owner: 0x{}", hex::encode(config.owner));
        info!("Emitter: 0x{}", hex::encode(config.emitter));
        Ok(config)
    }

    pub fn config(&self) -> Result<BridgeConfig, BridgeError> {
        self.storage.load_config()?.ok_or(BridgeError::NotInitialized)
    }

    /// Hand ownership to `new_owner`. Owner-only; the zero identity is rejected.
    pub fn transfer_ownership(
        &mut self,
        caller: &[u8; 32],
        new_owner: [u8; 32],
    ) -> Result<(), BridgeError> {
        let mut config = self.config()?;
        if caller != &config.owner {
            return Err(BridgeError::OwnerOnly);
        }
        if new_owner == ZERO_ADDRESS {
            return Err(BridgeError::InvalidOwner);
        }

        config.owner = new_owner;
        self.storage.store_config(&config)?;
        info!(
            "Ownership of chain {} bridge transferred to 0x{}",
            self.chain_id,
            hex::encode(new_owner)
        );
        Ok(())
    }

    // ========================================================================
    // EMITTER REGISTRY
    // ========================================================================

    pub fn register_emitters(
        &mut self,
        caller: &[u8; 32],
        registrations: &[EmitterRegistration],
    ) -> Result<(), BridgeError> {
        let config = self.config()?;
        registry::register(&mut self.storage, &config, caller, registrations)
    }

    pub fn register_emitter(
        &mut self,
        caller: &[u8; 32],
        chain_id: u16,
        address: &[u8],
        payload_format: PayloadFormat,
    ) -> Result<(), BridgeError> {
        self.register_emitters(
            caller,
            &[EmitterRegistration::new(chain_id, address, payload_format)],
        )
    }

    /// `address` is native-width for `chain_id`, or canonical.
    pub fn is_emitter_registered(&self, chain_id: u16, address: &[u8]) -> Result<bool, BridgeError> {
        self.config()?;
        let canonical = registry::normalize_emitter(chain_id, address)?;
        registry::is_registered(&self.storage, chain_id, &canonical)
    }

    // ========================================================================
    // OUTBOUND
    // ========================================================================

    /// Publish `value` to `destination_chain_id`.
    ///
    /// # Arguments
    ///
    /// * `caller` - Sender identity (any account may send)
    /// * `destination_chain_id` - Remote chain; must differ from the local chain
    /// * `value` - Value to deliver
    /// * `fee` - Fee attached by the caller; must cover the network quote
    ///
    /// # Returns
    ///
    /// * `Ok(OutboundMessage)` - Published message with its nonce and network sequence
    /// * `Err(BridgeError)` - Nothing published and the nonce unchanged
    pub fn send_value(
        &mut self,
        caller: &[u8; 32],
        destination_chain_id: u16,
        value: u128,
        fee: u128,
    ) -> Result<OutboundMessage, BridgeError> {
        let config = self.config()?;
        if destination_chain_id == config.local_chain_id {
            return Err(BridgeError::InvalidDestinationChainId(destination_chain_id));
        }

        let required = self.network.message_fee();
        if fee < required {
            return Err(BridgeError::InsufficientFee {
                required,
                provided: fee,
            });
        }

        let (nonce, advanced) = guard::next_sequence(&config)?;
        let format = self.outbound_format();
        let message = match self.storage.origin_tx_id(nonce, destination_chain_id, value) {
            Some(tx_id) if format.has_tx_id() => {
                ValueMessage::with_tx_id(destination_chain_id, value, tx_id)
            }
            _ => ValueMessage::new(destination_chain_id, value),
        };
        let payload = message.encode(format)?;

        let sequence = self.network.publish_message(
            config.local_chain_id,
            config.emitter,
            nonce,
            &payload,
            self.consistency_level,
        )?;
        self.storage.store_config(&advanced)?;

        info!(
            "Sent value {} to chain {} (caller 0x{}, nonce {}, sequence {})",
            value,
            destination_chain_id,
            hex::encode(caller),
            nonce,
            sequence
        );
        Ok(OutboundMessage {
            nonce,
            destination_chain_id,
            payload,
            sequence,
        })
    }

    // ========================================================================
    // INBOUND
    // ========================================================================

    /// Verify and apply an inbound VAA.
    ///
    /// # Returns
    ///
    /// * `Ok(ReceivedMessage)` - The applied replay record
    /// * `Err(BridgeError::AlreadyProcessed)` - Replay; nothing mutated
    /// * `Err(BridgeError)` - Any other rejection; nothing mutated
    pub fn receive_value(&mut self, raw_vaa: &[u8]) -> Result<ReceivedMessage, BridgeError> {
        let config = self.config()?;
        self.storage.check_vaa_input(raw_vaa)?;
        let vaa = Vaa::parse(raw_vaa)?;

        if self.storage.kind().requires_posted_vaa() {
            let hash = vaa.hash();
            if !self.network.is_posted(&hash) {
                return Err(BridgeError::VaaNotPosted(format!("0x{}", hex::encode(hash))));
            }
        }

        let emitter = self
            .storage
            .foreign_emitter(vaa.emitter_chain)?
            .filter(|entry| entry.address == vaa.emitter_address)
            .ok_or_else(|| {
                warn!(
                    "Rejected VAA from unregistered emitter 0x{} on chain {}",
                    hex::encode(vaa.emitter_address),
                    vaa.emitter_chain
                );
                BridgeError::InvalidForeignEmitter {
                    chain_id: vaa.emitter_chain,
                    address: format!("0x{}", hex::encode(vaa.emitter_address)),
                }
            })?;

        let message = ValueMessage::decode(emitter.payload_format, &vaa.payload)?;
        if message.destination_chain_id != config.local_chain_id {
            return Err(BridgeError::InvalidDestinationChainId(
                message.destination_chain_id,
            ));
        }
        debug!(
            "Decoded {} payload from chain {} sequence {}",
            emitter.payload_format, vaa.emitter_chain, vaa.sequence
        );

        let record = ReceivedMessage {
            emitter_chain: vaa.emitter_chain,
            sequence: vaa.sequence,
            value: message.value,
            batch_id: vaa.nonce,
        };
        guard::admit_once(&mut self.storage, &record)?;

        info!(
            "Received value {} from chain {} (sequence {})",
            record.value, record.emitter_chain, record.sequence
        );
        Ok(record)
    }

    pub fn get_current_value(&self) -> Result<u128, BridgeError> {
        self.config()?;
        self.storage.current_value()
    }

    pub fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError> {
        self.config()?;
        self.storage.received_message(emitter_chain, sequence)
    }
}

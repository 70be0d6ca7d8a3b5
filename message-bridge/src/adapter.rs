//! Object-safe view of a bridge instance, so the relay, the API and the service can
//! drive bridges on different hosts through one handle type.

use std::sync::Arc;

use bridge_common::{ChainKind, PayloadFormat};
use tokio::sync::Mutex;

use crate::bridge::MessageBridge;
use crate::error::BridgeError;
use crate::registry::EmitterRegistration;
use crate::state::{BridgeConfig, OutboundMessage, ReceivedMessage};
use crate::storage::BridgeStorage;

pub trait ChainAdapter: Send {
    fn chain_id(&self) -> u16;
    fn kind(&self) -> ChainKind;
    fn emitter_address(&self) -> [u8; 32];
    fn outbound_format(&self) -> PayloadFormat;

    fn initialize(&mut self, caller: [u8; 32]) -> Result<BridgeConfig, BridgeError>;
    fn config(&self) -> Result<BridgeConfig, BridgeError>;
    fn transfer_ownership(&mut self, caller: &[u8; 32], new_owner: [u8; 32])
        -> Result<(), BridgeError>;

    fn register_emitters(
        &mut self,
        caller: &[u8; 32],
        registrations: &[EmitterRegistration],
    ) -> Result<(), BridgeError>;
    fn is_emitter_registered(&self, chain_id: u16, address: &[u8]) -> Result<bool, BridgeError>;

    fn send_value(
        &mut self,
        caller: &[u8; 32],
        destination_chain_id: u16,
        value: u128,
        fee: u128,
    ) -> Result<OutboundMessage, BridgeError>;
    fn receive_value(&mut self, raw_vaa: &[u8]) -> Result<ReceivedMessage, BridgeError>;

    fn get_current_value(&self) -> Result<u128, BridgeError>;
    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError>;

    /// Whether VAAs must be posted to the network before `receive_value`.
    fn requires_posted_vaa(&self) -> bool {
        self.kind().requires_posted_vaa()
    }
}

impl<S: BridgeStorage> ChainAdapter for MessageBridge<S> {
    fn chain_id(&self) -> u16 {
        MessageBridge::chain_id(self)
    }

    fn kind(&self) -> ChainKind {
        MessageBridge::kind(self)
    }

    fn emitter_address(&self) -> [u8; 32] {
        MessageBridge::emitter_address(self)
    }

    fn outbound_format(&self) -> PayloadFormat {
        MessageBridge::outbound_format(self)
    }

    fn initialize(&mut self, caller: [u8; 32]) -> Result<BridgeConfig, BridgeError> {
        MessageBridge::initialize(self, caller)
    }

    fn config(&self) -> Result<BridgeConfig, BridgeError> {
        MessageBridge::config(self)
    }

    fn transfer_ownership(
        &mut self,
        caller: &[u8; 32],
        new_owner: [u8; 32],
    ) -> Result<(), BridgeError> {
        MessageBridge::transfer_ownership(self, caller, new_owner)
    }

    fn register_emitters(
        &mut self,
        caller: &[u8; 32],
        registrations: &[EmitterRegistration],
    ) -> Result<(), BridgeError> {
        MessageBridge::register_emitters(self, caller, registrations)
    }

    fn is_emitter_registered(&self, chain_id: u16, address: &[u8]) -> Result<bool, BridgeError> {
        MessageBridge::is_emitter_registered(self, chain_id, address)
    }

    fn send_value(
        &mut self,
        caller: &[u8; 32],
        destination_chain_id: u16,
        value: u128,
        fee: u128,
    ) -> Result<OutboundMessage, BridgeError> {
        MessageBridge::send_value(self, caller, destination_chain_id, value, fee)
    }

    fn receive_value(&mut self, raw_vaa: &[u8]) -> Result<ReceivedMessage, BridgeError> {
        MessageBridge::receive_value(self, raw_vaa)
    }

    fn get_current_value(&self) -> Result<u128, BridgeError> {
        MessageBridge::get_current_value(self)
    }

    fn received_message(
        &self,
        emitter_chain: u16,
        sequence: u64,
    ) -> Result<Option<ReceivedMessage>, BridgeError> {
        MessageBridge::received_message(self, emitter_chain, sequence)
    }
}

/// A bridge instance shared between tasks. One host transaction runs at a time.
pub type SharedBridge = Arc<Mutex<Box<dyn ChainAdapter>>>;

pub fn share<A: ChainAdapter + 'static>(adapter: A) -> SharedBridge {
    Arc::new(Mutex::new(Box::new(adapter)))
}

//! Host-independent bridge state.
//!
//! Each host storage model persists these records in its own layout; the bridge
//! logic only ever sees the types below.

use bridge_common::PayloadFormat;
use serde::Serialize;

/// Per-instance bridge configuration. Created once by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeConfig {
    /// Canonical owner identity
    pub owner: [u8; 32],
    pub local_chain_id: u16,
    /// Nonce of the next outbound message
    pub nonce: u32,
    /// Fee quoted by the network at initialization
    pub message_fee: u128,
    /// This bridge's canonical emitter identity on the attestation network
    pub emitter: [u8; 32],
}

/// Trusted remote contract for one source chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForeignEmitter {
    pub chain_id: u16,
    pub address: [u8; 32],
    pub payload_format: PayloadFormat,
}

/// Replay record for an applied inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceivedMessage {
    pub emitter_chain: u16,
    pub sequence: u64,
    pub value: u128,
    /// VAA body nonce; metadata only, not part of the replay key
    pub batch_id: u32,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub nonce: u32,
    pub destination_chain_id: u16,
    pub payload: Vec<u8>,
    /// Emitter sequence assigned by the attestation network
    pub sequence: u64,
}

//! Error definitions for the message bridge.
//!
//! Every operation is all-or-nothing: when one of these errors is returned, no
//! bridge state has been written.

use bridge_common::CodecError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Unauthorized: caller is not the owner")]
    OwnerOnly,

    #[error("Invalid attestation network configuration: {0}")]
    InvalidWormholeConfig(String),

    #[error("Invalid destination chain id: {0}")]
    InvalidDestinationChainId(u16),

    #[error("Cannot register an emitter for the local chain {0}")]
    CannotRegisterLocalChain(u16),

    #[error("Emitter address cannot be zero")]
    ZeroEmitterAddress,

    #[error("Owner address cannot be zero")]
    InvalidOwner,

    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Untrusted emitter {address} on chain {chain_id}")]
    InvalidForeignEmitter { chain_id: u16, address: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid VAA: {0}")]
    InvalidVaa(String),

    #[error("Message from chain {chain_id} with sequence {sequence} already processed")]
    AlreadyProcessed { chain_id: u16, sequence: u64 },

    #[error("Insufficient fee: required {required}, provided {provided}")]
    InsufficientFee { required: u128, provided: u128 },

    #[error("Outbound nonce exhausted")]
    NonceExhausted,

    #[error("Bridge not initialized")]
    NotInitialized,

    #[error("Bridge already initialized")]
    AlreadyInitialized,

    #[error("VAA {0} has not been posted")]
    VaaNotPosted(String),

    #[error("Corrupt bridge state: {0}")]
    CorruptState(String),
}

/// Coarse error taxonomy used by relayers and the API to decide what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Authorization,
    Configuration,
    Trust,
    Integrity,
    Idempotence,
    Resource,
    Lifecycle,
}

impl BridgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::OwnerOnly => ErrorClass::Authorization,
            BridgeError::InvalidWormholeConfig(_)
            | BridgeError::InvalidDestinationChainId(_)
            | BridgeError::CannotRegisterLocalChain(_)
            | BridgeError::ZeroEmitterAddress
            | BridgeError::InvalidOwner
            | BridgeError::InvalidAddressLength { .. }
            | BridgeError::InvalidAddress(_) => ErrorClass::Configuration,
            BridgeError::InvalidForeignEmitter { .. } => ErrorClass::Trust,
            BridgeError::InvalidPayload(_)
            | BridgeError::InvalidVaa(_)
            | BridgeError::CorruptState(_) => ErrorClass::Integrity,
            BridgeError::AlreadyProcessed { .. } => ErrorClass::Idempotence,
            BridgeError::InsufficientFee { .. } | BridgeError::NonceExhausted => {
                ErrorClass::Resource
            }
            BridgeError::NotInitialized
            | BridgeError::AlreadyInitialized
            | BridgeError::VaaNotPosted(_) => ErrorClass::Lifecycle,
        }
    }

    /// True when repeating the call can succeed without changing the message:
    /// a higher fee, or posting the VAA first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::InsufficientFee { .. } | BridgeError::VaaNotPosted(_)
        )
    }

    /// Relayers treat a replayed delivery as a success.
    pub fn is_success_equivalent(&self) -> bool {
        matches!(self, BridgeError::AlreadyProcessed { .. })
    }
}

impl From<CodecError> for BridgeError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::InvalidAddressLength { expected, actual } => {
                BridgeError::InvalidAddressLength { expected, actual }
            }
            CodecError::InvalidAddress(msg) => BridgeError::InvalidAddress(msg),
            CodecError::InvalidPayload(msg) => BridgeError::InvalidPayload(msg),
            CodecError::InvalidVaa(msg) => BridgeError::InvalidVaa(msg),
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::CorruptState(e.to_string())
    }
}

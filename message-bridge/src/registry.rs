//! Emitter registry: which remote contract may originate messages for each chain.
//!
//! One entry per remote chain id, owner-only, last write wins. A registration batch
//! is validated in full before anything is written.

use bridge_common::chains::address_kind_for_chain;
use bridge_common::{normalize, AddressKind, PayloadFormat, ZERO_ADDRESS};
use tracing::info;

use crate::error::BridgeError;
use crate::state::{BridgeConfig, ForeignEmitter};
use crate::storage::BridgeStorage;

/// One requested registration, with the address in the remote chain's native width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterRegistration {
    pub chain_id: u16,
    pub address: Vec<u8>,
    pub payload_format: PayloadFormat,
}

impl EmitterRegistration {
    pub fn new(chain_id: u16, address: impl Into<Vec<u8>>, payload_format: PayloadFormat) -> Self {
        Self {
            chain_id,
            address: address.into(),
            payload_format,
        }
    }
}

/// Normalize a remote emitter address.
///
/// Uses the remote chain's native width; a 32-byte canonical address is always accepted.
pub fn normalize_emitter(chain_id: u16, address: &[u8]) -> Result<[u8; 32], BridgeError> {
    let kind = if address.len() == 32 {
        AddressKind::Canonical
    } else {
        address_kind_for_chain(chain_id)
    };
    Ok(normalize(address, kind)?)
}

/// Validate a whole batch against the bridge configuration.
///
/// # Returns
///
/// * `Ok(Vec<ForeignEmitter>)` - Canonical entries ready to write
/// * `Err(BridgeError)` - `OwnerOnly`, `CannotRegisterLocalChain`, `ZeroEmitterAddress`
///   or an address width error for the first offending entry
pub fn validate_batch(
    config: &BridgeConfig,
    caller: &[u8; 32],
    registrations: &[EmitterRegistration],
) -> Result<Vec<ForeignEmitter>, BridgeError> {
    if caller != &config.owner {
        return Err(BridgeError::OwnerOnly);
    }

    registrations
        .iter()
        .map(|reg| {
            if reg.chain_id == config.local_chain_id {
                return Err(BridgeError::CannotRegisterLocalChain(reg.chain_id));
            }
            let address = normalize_emitter(reg.chain_id, &reg.address)?;
            if address == ZERO_ADDRESS {
                return Err(BridgeError::ZeroEmitterAddress);
            }
            Ok(ForeignEmitter {
                chain_id: reg.chain_id,
                address,
                payload_format: reg.payload_format,
            })
        })
        .collect()
}

/// Register a batch of emitters. Nothing is written unless every entry is valid.
pub fn register<S: BridgeStorage + ?Sized>(
    storage: &mut S,
    config: &BridgeConfig,
    caller: &[u8; 32],
    registrations: &[EmitterRegistration],
) -> Result<(), BridgeError> {
    let entries = validate_batch(config, caller, registrations)?;
    storage.put_foreign_emitters(&entries)?;

    for entry in &entries {
        info!(
            "Registered emitter for chain {}: 0x{} ({})",
            entry.chain_id,
            hex::encode(entry.address),
            entry.payload_format
        );
    }
    Ok(())
}

/// True iff the entry for `chain_id` matches `address` byte for byte.
pub fn is_registered<S: BridgeStorage + ?Sized>(
    storage: &S,
    chain_id: u16,
    address: &[u8; 32],
) -> Result<bool, BridgeError> {
    Ok(storage
        .foreign_emitter(chain_id)?
        .map(|entry| &entry.address == address)
        .unwrap_or(false))
}

//! Outbound sequencing and inbound replay protection.
//!
//! ## Outbound
//!
//! `next_sequence` returns the nonce to publish with and the configuration to
//! commit afterwards. The caller stores the advanced configuration only once the
//! network has accepted the message, so a failed publish leaves the nonce untouched.
//!
//! ## Inbound
//!
//! `admit_once` relies on the host's create-if-absent primitive. The replay key is
//! `(source_chain_id, sequence)`; the VAA nonce never participates.

use tracing::warn;

use crate::error::BridgeError;
use crate::state::{BridgeConfig, ReceivedMessage};
use crate::storage::BridgeStorage;

/// Identity of an inbound message for replay protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplayKey {
    pub chain_id: u16,
    pub sequence: u64,
}

impl ReplayKey {
    pub fn new(chain_id: u16, sequence: u64) -> Self {
        Self { chain_id, sequence }
    }

    /// Packed big-endian encoding, `chain_id (2) || sequence (8)`.
    pub fn packed_be(&self) -> [u8; 10] {
        let mut out = [0u8; 10];
        out[..2].copy_from_slice(&self.chain_id.to_be_bytes());
        out[2..].copy_from_slice(&self.sequence.to_be_bytes());
        out
    }
}

impl From<&ReceivedMessage> for ReplayKey {
    fn from(message: &ReceivedMessage) -> Self {
        Self::new(message.emitter_chain, message.sequence)
    }
}

/// Current outbound nonce plus the configuration with the nonce advanced by one.
pub fn next_sequence(config: &BridgeConfig) -> Result<(u32, BridgeConfig), BridgeError> {
    let current = config.nonce;
    let next = current.checked_add(1).ok_or(BridgeError::NonceExhausted)?;
    let mut advanced = config.clone();
    advanced.nonce = next;
    Ok((current, advanced))
}

/// Apply `message` exactly once.
///
/// # Returns
///
/// * `Ok(())` - Replay record created and current value overwritten
/// * `Err(BridgeError::AlreadyProcessed)` - The key exists; nothing mutated
pub fn admit_once<S: BridgeStorage + ?Sized>(
    storage: &mut S,
    message: &ReceivedMessage,
) -> Result<(), BridgeError> {
    if storage.commit_inbound(message)? {
        Ok(())
    } else {
        let key = ReplayKey::from(message);
        warn!(
            "Replay rejected: chain {} sequence {}",
            key.chain_id, key.sequence
        );
        Err(BridgeError::AlreadyProcessed {
            chain_id: key.chain_id,
            sequence: key.sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_sequence_advances_copy() {
        let config = BridgeConfig {
            owner: [1u8; 32],
            local_chain_id: 1,
            nonce: 4,
            message_fee: 0,
            emitter: [2u8; 32],
        };
        let (nonce, advanced) = next_sequence(&config).unwrap();
        assert_eq!(nonce, 4);
        assert_eq!(advanced.nonce, 5);
        assert_eq!(config.nonce, 4);
    }

    #[test]
    fn test_next_sequence_exhausted() {
        let config = BridgeConfig {
            owner: [1u8; 32],
            local_chain_id: 1,
            nonce: u32::MAX,
            message_fee: 0,
            emitter: [2u8; 32],
        };
        assert_eq!(next_sequence(&config), Err(BridgeError::NonceExhausted));
    }

    #[test]
    fn test_replay_key_packed() {
        let key = ReplayKey::new(10003, 7);
        assert_eq!(key.packed_be(), [0x27, 0x13, 0, 0, 0, 0, 0, 0, 0, 7]);
    }
}

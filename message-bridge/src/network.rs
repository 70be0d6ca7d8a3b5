//! Attestation network seam and an in-process implementation.
//!
//! The bridge only needs four things from the network: a fee quote, publishing a
//! payload under its emitter, posting a VAA so hosts can look it up by body hash,
//! and checking whether a hash was posted. Guardian signing is external; the local
//! network assembles VAAs with placeholder signature records so relays and hosts
//! see the real wire layout.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use bridge_common::vaa::GuardianSignature;
use bridge_common::{body_hash, Vaa};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::BridgeError;

/// Current VAA version emitted by the local network.
pub const VAA_VERSION: u8 = 1;

pub trait AttestationNetwork: Send + Sync {
    /// Fee required to publish one message.
    fn message_fee(&self) -> u128;

    /// Publish a payload under `emitter` and return its emitter sequence.
    fn publish_message(
        &self,
        emitter_chain: u16,
        emitter: [u8; 32],
        nonce: u32,
        payload: &[u8],
        consistency_level: u8,
    ) -> Result<u64, BridgeError>;

    /// Record the VAA's body hash. Posting an already-posted VAA is a no-op.
    fn post_vaa(&self, raw: &[u8]) -> Result<[u8; 32], BridgeError>;

    fn is_posted(&self, hash: &[u8; 32]) -> bool;
}

#[derive(Default)]
struct NetworkState {
    sequences: HashMap<(u16, [u8; 32]), u64>,
    posted: HashSet<[u8; 32]>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<u8>>>,
}

/// In-process attestation network for local devnets and tests.
pub struct LocalAttestationNetwork {
    message_fee: u128,
    guardian_set_index: u32,
    state: Mutex<NetworkState>,
}

impl LocalAttestationNetwork {
    pub fn new(message_fee: u128) -> Self {
        Self {
            message_fee,
            guardian_set_index: 0,
            state: Mutex::new(NetworkState::default()),
        }
    }

    /// Receive every VAA published from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Next sequence `emitter` will be assigned.
    pub fn next_sequence(&self, emitter_chain: u16, emitter: &[u8; 32]) -> u64 {
        self.lock()
            .sequences
            .get(&(emitter_chain, *emitter))
            .copied()
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AttestationNetwork for LocalAttestationNetwork {
    fn message_fee(&self) -> u128 {
        self.message_fee
    }

    fn publish_message(
        &self,
        emitter_chain: u16,
        emitter: [u8; 32],
        nonce: u32,
        payload: &[u8],
        consistency_level: u8,
    ) -> Result<u64, BridgeError> {
        let mut state = self.lock();
        let key = (emitter_chain, emitter);
        let sequence = state.sequences.get(&key).copied().unwrap_or(0);

        let vaa = Vaa {
            version: VAA_VERSION,
            guardian_set_index: self.guardian_set_index,
            signatures: vec![GuardianSignature {
                index: 0,
                signature: [0u8; 65],
            }],
            timestamp: chrono::Utc::now().timestamp() as u32,
            nonce,
            emitter_chain,
            emitter_address: emitter,
            sequence,
            consistency_level,
            payload: payload.to_vec(),
        };
        let raw = vaa.serialize()?;
        state.sequences.insert(key, sequence + 1);

        info!(
            "Published message from chain {} emitter 0x{} sequence {}",
            emitter_chain,
            hex::encode(emitter),
            sequence
        );

        state.subscribers.retain(|tx| match tx.send(raw.clone()) {
            Ok(()) => true,
            Err(_) => {
                debug!("Dropping closed VAA subscriber");
                false
            }
        });
        Ok(sequence)
    }

    fn post_vaa(&self, raw: &[u8]) -> Result<[u8; 32], BridgeError> {
        let hash = body_hash(raw).map_err(|e| {
            warn!("Refusing to post malformed VAA: {}", e);
            BridgeError::from(e)
        })?;
        if self.lock().posted.insert(hash) {
            debug!("Posted VAA 0x{}", hex::encode(hash));
        }
        Ok(hash)
    }

    fn is_posted(&self, hash: &[u8; 32]) -> bool {
        self.lock().posted.contains(hash)
    }
}

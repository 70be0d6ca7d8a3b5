//! VAA Relay
//!
//! Delivers VAAs published on the attestation network to destination bridges.
//!
//! ## Overview
//!
//! The relay:
//! 1. Consumes raw VAAs from a channel fed by the network
//! 2. Matches each VAA against its routes (source chain, optional emitter filter, and
//!    the destination named in the payload)
//! 3. Posts the VAA first when the destination host verifies attestations separately
//! 4. Submits it to the destination bridge
//!
//! A replayed delivery (`AlreadyProcessed`) counts as success. Other failures are
//! logged and the relay keeps going.
//!
//! The network delivers at least once, so the relay skips a VAA (keyed by body hash)
//! while it is in flight and for a TTL after every route succeeded. The bridges'
//! replay guard still decides whether a message applies.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bridge_common::chains::{
    chain_name, ARBITRUM_SEPOLIA_CHAIN_ID, AZTEC_CHAIN_ID, AZTEC_LEGACY_CHAIN_ID,
};
use bridge_common::{Vaa, ValueMessage};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapter::SharedBridge;
use crate::error::BridgeError;
use crate::network::AttestationNetwork;
use crate::state::ReceivedMessage;

/// How long a delivered VAA is remembered.
pub const DEFAULT_DEDUPE_TTL: Duration = Duration::from_secs(15 * 60);

/// VAA hashes being delivered, and those delivered within the TTL.
#[derive(Debug)]
struct DedupeCache {
    ttl: Duration,
    inflight: HashSet<[u8; 32]>,
    processed: HashMap<[u8; 32], Instant>,
}

impl DedupeCache {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inflight: HashSet::new(),
            processed: HashMap::new(),
        }
    }

    /// Claim `key` for delivery; false when it is in flight or recently delivered.
    fn begin(&mut self, key: [u8; 32]) -> bool {
        if let Some(at) = self.processed.get(&key) {
            if at.elapsed() < self.ttl {
                return false;
            }
            self.processed.remove(&key);
        }
        self.inflight.insert(key)
    }

    fn finish(&mut self, key: [u8; 32], success: bool) {
        self.inflight.remove(&key);
        let now = Instant::now();
        if success {
            self.processed.insert(key, now);
        }
        let ttl = self.ttl;
        self.processed.retain(|_, at| now.duration_since(*at) < ttl);
    }
}

/// Forward VAAs from `source_chain_id` (optionally one emitter) to a destination bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRoute {
    pub source_chain_id: u16,
    pub destination_chain_id: u16,
    pub emitter: Option<[u8; 32]>,
}

impl RelayRoute {
    /// Payloads of unknown length match on source and emitter alone and are left
    /// for the destination bridge to reject.
    pub fn matches(&self, vaa: &Vaa) -> bool {
        vaa.emitter_chain == self.source_chain_id
            && self
                .emitter
                .map(|emitter| emitter == vaa.emitter_address)
                .unwrap_or(true)
            && ValueMessage::peek_destination(&vaa.payload)
                .map(|destination| destination == self.destination_chain_id)
                .unwrap_or(true)
    }
}

/// Result of delivering one VAA along one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered {
        destination_chain_id: u16,
        message: ReceivedMessage,
    },
    /// The destination had already applied this message.
    AlreadyDelivered { destination_chain_id: u16 },
    Failed {
        destination_chain_id: u16,
        error: BridgeError,
    },
}

impl RelayOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RelayOutcome::Failed { .. })
    }
}

/// Post (when required) and submit one raw VAA to `bridge`.
pub async fn deliver(
    bridge: &SharedBridge,
    network: &dyn AttestationNetwork,
    raw: &[u8],
) -> Result<ReceivedMessage, BridgeError> {
    let mut bridge = bridge.lock().await;
    if bridge.requires_posted_vaa() {
        network.post_vaa(raw)?;
    }
    bridge.receive_value(raw)
}

pub struct VaaRelay {
    routes: Vec<RelayRoute>,
    bridges: HashMap<u16, SharedBridge>,
    network: Arc<dyn AttestationNetwork>,
    dedupe: Mutex<DedupeCache>,
}

impl VaaRelay {
    pub fn new(network: Arc<dyn AttestationNetwork>) -> Self {
        Self {
            routes: Vec::new(),
            bridges: HashMap::new(),
            network,
            dedupe: Mutex::new(DedupeCache::new(DEFAULT_DEDUPE_TTL)),
        }
    }

    /// Replace the dedupe window. A zero TTL only skips VAAs that are in flight.
    pub fn with_dedupe_ttl(self, ttl: Duration) -> Self {
        Self {
            dedupe: Mutex::new(DedupeCache::new(ttl)),
            ..self
        }
    }

    pub fn add_bridge(&mut self, chain_id: u16, bridge: SharedBridge) {
        self.bridges.insert(chain_id, bridge);
    }

    pub fn add_route(&mut self, route: RelayRoute) {
        self.routes.push(route);
    }

    pub fn routes(&self) -> &[RelayRoute] {
        &self.routes
    }

    /// Deliver one raw VAA along every matching route.
    ///
    /// # Returns
    ///
    /// One outcome per matching route; empty when the VAA is unparsable, unrouted, or
    /// a duplicate of one in flight or recently delivered.
    pub async fn process(&self, raw: &[u8]) -> Vec<RelayOutcome> {
        let vaa = match Vaa::parse(raw) {
            Ok(vaa) => vaa,
            Err(e) => {
                warn!("Dropping unparsable VAA ({} bytes): {}", raw.len(), e);
                return Vec::new();
            }
        };

        if matches!(
            vaa.emitter_chain,
            AZTEC_CHAIN_ID | AZTEC_LEGACY_CHAIN_ID | ARBITRUM_SEPOLIA_CHAIN_ID
        ) {
            info!(
                "Received VAA from {} (chain {}), emitter 0x{}, sequence {}",
                chain_name(vaa.emitter_chain),
                vaa.emitter_chain,
                hex::encode(vaa.emitter_address),
                vaa.sequence
            );
        }
        debug!(
            "VAA details: chain {}, emitter 0x{}, sequence {}, nonce {}, payload 0x{}",
            vaa.emitter_chain,
            hex::encode(vaa.emitter_address),
            vaa.sequence,
            vaa.nonce,
            hex::encode(&vaa.payload)
        );

        let matching: Vec<&RelayRoute> = self.routes.iter().filter(|r| r.matches(&vaa)).collect();
        if matching.is_empty() {
            debug!(
                "Skipping VAA (no route for chain {} emitter 0x{}), sequence {}",
                vaa.emitter_chain,
                hex::encode(vaa.emitter_address),
                vaa.sequence
            );
            return Vec::new();
        }

        let key = vaa.hash();
        let claimed = self.dedupe().begin(key);
        if !claimed {
            debug!(
                "Skipping duplicate VAA 0x{} (chain {}, sequence {})",
                hex::encode(key),
                vaa.emitter_chain,
                vaa.sequence
            );
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(matching.len());
        for route in matching {
            outcomes.push(self.deliver_route(route, &vaa, raw).await);
        }
        let success = outcomes.iter().all(RelayOutcome::is_success);
        self.dedupe().finish(key, success);
        outcomes
    }

    fn dedupe(&self) -> std::sync::MutexGuard<'_, DedupeCache> {
        self.dedupe.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn deliver_route(&self, route: &RelayRoute, vaa: &Vaa, raw: &[u8]) -> RelayOutcome {
        let destination_chain_id = route.destination_chain_id;
        let Some(bridge) = self.bridges.get(&destination_chain_id) else {
            error!(
                "Relay route targets chain {} but no bridge is attached",
                destination_chain_id
            );
            return RelayOutcome::Failed {
                destination_chain_id,
                error: BridgeError::NotInitialized,
            };
        };

        match deliver(bridge, self.network.as_ref(), raw).await {
            Ok(message) => {
                info!(
                    "Delivered sequence {} from chain {} to chain {} (value {})",
                    vaa.sequence, vaa.emitter_chain, destination_chain_id, message.value
                );
                RelayOutcome::Delivered {
                    destination_chain_id,
                    message,
                }
            }
            Err(e) if e.is_success_equivalent() => {
                debug!(
                    "Sequence {} from chain {} already delivered to chain {}",
                    vaa.sequence, vaa.emitter_chain, destination_chain_id
                );
                RelayOutcome::AlreadyDelivered {
                    destination_chain_id,
                }
            }
            Err(e) => {
                error!(
                    "Failed to deliver sequence {} from chain {} to chain {}: {} ({:?}, retryable: {})",
                    vaa.sequence,
                    vaa.emitter_chain,
                    destination_chain_id,
                    e,
                    e.class(),
                    e.is_retryable()
                );
                RelayOutcome::Failed {
                    destination_chain_id,
                    error: e,
                }
            }
        }
    }

    /// Relay every VAA received on `rx` until the channel closes.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<Vec<u8>>) {
        info!("VAA relay started with {} routes", self.routes.len());
        while let Some(raw) = rx.recv().await {
            self.process(&raw).await;
        }
        info!("VAA relay stopped: network channel closed");
    }
}

//! Service wiring: builds bridges from configuration, initializes them, registers
//! their initial emitters, and connects the relay and API to the local network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bridge_common::{ChainKind, PayloadFormat};
use solana_program::pubkey::Pubkey;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::adapter::{ChainAdapter, SharedBridge};
use crate::api::ApiServer;
use crate::bridge::MessageBridge;
use crate::config::{BridgeInstanceConfig, Config};
use crate::hosts::{AztecStorage, EvmStorage, SvmStorage};
use crate::network::{AttestationNetwork, LocalAttestationNetwork};
use crate::registry::EmitterRegistration;
use crate::relay::{RelayRoute, VaaRelay};

/// Identity of a running bridge as seen by its peers.
#[derive(Debug, Clone, Copy)]
struct PeerInfo {
    chain_id: u16,
    emitter: [u8; 32],
    outbound_format: PayloadFormat,
}

pub struct BridgeService {
    config: Config,
    network: Arc<LocalAttestationNetwork>,
    bridges: HashMap<u16, SharedBridge>,
    relay: Option<(VaaRelay, mpsc::UnboundedReceiver<Vec<u8>>)>,
}

impl BridgeService {
    /// Build, initialize and register every configured bridge.
    ///
    /// # Returns
    ///
    /// * `Ok(BridgeService)` - Ready to `run`
    /// * `Err(anyhow::Error)` - A bridge could not be constructed, initialized or registered
    pub async fn build(config: Config) -> Result<Self> {
        let network = Arc::new(LocalAttestationNetwork::new(
            config.network.message_fee as u128,
        ));
        let dyn_network: Arc<dyn AttestationNetwork> = network.clone();

        let mut bridges = HashMap::new();
        let mut peers = Vec::new();
        for instance in &config.bridges {
            let mut adapter = build_bridge(
                instance,
                dyn_network.clone(),
                config.network.consistency_level,
            )?;
            let owner = instance.owner_identity()?;
            adapter
                .initialize(owner)
                .with_context(|| format!("Failed to initialize bridge '{}'", instance.name))?;

            peers.push(PeerInfo {
                chain_id: instance.chain_id,
                emitter: adapter.emitter_address(),
                outbound_format: adapter.outbound_format(),
            });
            bridges.insert(instance.chain_id, Arc::new(tokio::sync::Mutex::new(adapter)));
        }

        for instance in &config.bridges {
            let registrations = initial_registrations(instance, &peers)?;
            if registrations.is_empty() {
                continue;
            }
            let owner = instance.owner_identity()?;
            let bridge = bridges
                .get(&instance.chain_id)
                .context("Bridge missing after construction")?;
            bridge
                .lock()
                .await
                .register_emitters(&owner, &registrations)
                .with_context(|| {
                    format!("Failed to register emitters on bridge '{}'", instance.name)
                })?;
        }

        let relay = if config.relay.enabled {
            let rx = network.subscribe();
            let mut relay = VaaRelay::new(dyn_network)
                .with_dedupe_ttl(Duration::from_secs(config.relay.dedupe_ttl_secs));
            for (chain_id, bridge) in &bridges {
                relay.add_bridge(*chain_id, bridge.clone());
            }
            for route in relay_routes(&config, &peers)? {
                relay.add_route(route);
            }
            Some((relay, rx))
        } else {
            warn!("VAA relay disabled; inbound messages must be submitted via the API");
            None
        };

        info!("Message bridge service built with {} bridges", bridges.len());
        Ok(Self {
            config,
            network,
            bridges,
            relay,
        })
    }

    pub fn bridge(&self, chain_id: u16) -> Option<SharedBridge> {
        self.bridges.get(&chain_id).cloned()
    }

    pub fn network(&self) -> Arc<LocalAttestationNetwork> {
        self.network.clone()
    }

    pub fn api_server(&self) -> ApiServer {
        ApiServer::new(
            self.config.api.clone(),
            self.bridges.clone(),
            self.network.clone(),
        )
    }

    /// Spawn the relay (if enabled) and serve the API until shutdown.
    pub async fn run(mut self) -> Result<()> {
        if let Some((relay, rx)) = self.relay.take() {
            tokio::spawn(relay.run(rx));
        }
        self.api_server().run().await
    }

    /// Detach the relay so callers can drive it directly.
    pub fn take_relay(&mut self) -> Option<(VaaRelay, mpsc::UnboundedReceiver<Vec<u8>>)> {
        self.relay.take()
    }
}

/// Construct the adapter for one configured instance.
pub fn build_bridge(
    instance: &BridgeInstanceConfig,
    network: Arc<dyn AttestationNetwork>,
    consistency_level: u8,
) -> Result<Box<dyn ChainAdapter>> {
    let native = instance.native_address()?;
    let chain_id = instance.chain_id;
    let adapter: Box<dyn ChainAdapter> = match instance.kind {
        ChainKind::Evm => {
            let contract: [u8; 20] = native
                .as_slice()
                .try_into()
                .context("EVM bridge address must be 20 bytes")?;
            Box::new(
                MessageBridge::new(chain_id, EvmStorage::new(contract), network)
                    .with_consistency_level(consistency_level),
            )
        }
        ChainKind::Svm => {
            let program_id: [u8; 32] = native
                .as_slice()
                .try_into()
                .context("SVM program id must be 32 bytes")?;
            Box::new(
                MessageBridge::new(
                    chain_id,
                    SvmStorage::new(Pubkey::new_from_array(program_id)),
                    network,
                )
                .with_consistency_level(consistency_level),
            )
        }
        ChainKind::Aztec => {
            let contract: [u8; 32] = native
                .as_slice()
                .try_into()
                .context("Aztec contract address must be 32 bytes")?;
            Box::new(
                MessageBridge::new(chain_id, AztecStorage::new(contract), network)
                    .with_consistency_level(consistency_level),
            )
        }
    };

    info!(
        "Built {} bridge '{}' on chain {}",
        instance.kind, instance.name, chain_id
    );
    Ok(adapter)
}

/// Peers first, then explicit emitters. Later entries for the same chain win.
fn initial_registrations(
    instance: &BridgeInstanceConfig,
    peers: &[PeerInfo],
) -> Result<Vec<EmitterRegistration>> {
    let mut registrations = Vec::new();
    if instance.register_peers {
        for peer in peers.iter().filter(|p| p.chain_id != instance.chain_id) {
            registrations.push(EmitterRegistration::new(
                peer.chain_id,
                peer.emitter,
                peer.outbound_format,
            ));
        }
    }
    for emitter in &instance.emitters {
        registrations.push(EmitterRegistration::new(
            emitter.chain_id,
            emitter.canonical_address()?,
            emitter.payload_format,
        ));
    }
    Ok(registrations)
}

/// Configured routes, or every ordered pair of bridges filtered on the peer emitter.
fn relay_routes(config: &Config, peers: &[PeerInfo]) -> Result<Vec<RelayRoute>> {
    if !config.relay.routes.is_empty() {
        return config
            .relay
            .routes
            .iter()
            .map(|route| {
                Ok(RelayRoute {
                    source_chain_id: route.source_chain_id,
                    destination_chain_id: route.destination_chain_id,
                    emitter: route.emitter_filter()?,
                })
            })
            .collect();
    }

    let mut routes = Vec::new();
    for source in peers {
        for destination in peers.iter().filter(|p| p.chain_id != source.chain_id) {
            routes.push(RelayRoute {
                source_chain_id: source.chain_id,
                destination_chain_id: destination.chain_id,
                emitter: Some(source.emitter),
            });
        }
    }
    Ok(routes)
}

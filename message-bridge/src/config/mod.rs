//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the message bridge service.
//! Configuration includes the attestation network quote, the bridge instances to run,
//! their initial emitter registrations, relay routes, and API settings.

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use bridge_common::chains::{
    chain_name, ARBITRUM_SEPOLIA_CHAIN_ID, AZTEC_CHAIN_ID, CONSISTENCY_LEVEL, SOLANA_CHAIN_ID,
};
use bridge_common::{parse_hex_address, AddressKind, ChainKind, PayloadFormat};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::registry::normalize_emitter;
use crate::relay::DEFAULT_DEDUPE_TTL;

/// Environment variable consulted by `Config::load` when no path is given.
pub const CONFIG_PATH_ENV: &str = "MESSAGE_BRIDGE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/message-bridge.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Attestation network settings
    pub network: NetworkConfig,
    /// Bridge instances, one per chain
    pub bridges: Vec<BridgeInstanceConfig>,
    /// VAA relay settings
    #[serde(default)]
    pub relay: RelayConfig,
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Fee required per published message
    #[serde(default)]
    pub message_fee: u64,
    /// Consistency level requested for outbound messages
    #[serde(default = "default_consistency_level")]
    pub consistency_level: u8,
}

fn default_consistency_level() -> u8 {
    CONSISTENCY_LEVEL
}

/// One bridge instance.
///
/// `address` is the contract address (EVM, 20-byte hex), the program id (SVM, base58
/// or 32-byte hex), or the contract address (Aztec, 32-byte hex). `owner` uses the
/// same native encoding as the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeInstanceConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// Wormhole chain id
    pub chain_id: u16,
    /// Host storage model
    pub kind: ChainKind,
    pub address: String,
    pub owner: String,
    /// Register every other configured bridge as a trusted emitter at startup
    #[serde(default = "default_true")]
    pub register_peers: bool,
    /// Additional emitters registered at startup
    #[serde(default)]
    pub emitters: Vec<EmitterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    pub chain_id: u16,
    /// Hex address, native width for the chain or 32-byte canonical
    pub address: String,
    pub payload_format: PayloadFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Explicit routes. When empty, every pair of configured bridges is routed.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    /// Seconds a delivered VAA is remembered so repeats are skipped
    #[serde(default = "default_dedupe_ttl_secs")]
    pub dedupe_ttl_secs: u64,
}

fn default_dedupe_ttl_secs() -> u64 {
    DEFAULT_DEDUPE_TTL.as_secs()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            routes: Vec::new(),
            dedupe_ttl_secs: default_dedupe_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub source_chain_id: u16,
    pub destination_chain_id: u16,
    /// Only relay VAAs from this emitter (hex; empty or absent = any emitter)
    #[serde(default)]
    pub emitter: Option<String>,
}

/// API server configuration for external communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests
    pub cors_origins: Vec<String>,
}

fn default_true() -> bool {
    true
}

// ============================================================================
// ADDRESS PARSING
// ============================================================================

impl BridgeInstanceConfig {
    /// Native address bytes of the deployed bridge.
    pub fn native_address(&self) -> anyhow::Result<Vec<u8>> {
        parse_native(&self.address, self.kind)
            .with_context(|| format!("Invalid address for bridge '{}'", self.name))
    }

    /// Canonical owner identity.
    pub fn owner_identity(&self) -> anyhow::Result<[u8; 32]> {
        let native = parse_native(&self.owner, self.kind)
            .with_context(|| format!("Invalid owner for bridge '{}'", self.name))?;
        Ok(bridge_common::normalize(&native, self.kind.address_kind())?)
    }
}

impl EmitterConfig {
    pub fn canonical_address(&self) -> anyhow::Result<[u8; 32]> {
        let hex_clean = self.address.strip_prefix("0x").unwrap_or(&self.address);
        let bytes = hex::decode(hex_clean)
            .with_context(|| format!("Invalid emitter address '{}'", self.address))?;
        Ok(normalize_emitter(self.chain_id, &bytes)?)
    }
}

impl RouteConfig {
    pub fn emitter_filter(&self) -> anyhow::Result<Option<[u8; 32]>> {
        match self.emitter.as_deref() {
            None | Some("") => Ok(None),
            Some(addr) => Ok(Some(
                parse_hex_address(addr, AddressKind::Canonical)
                    .with_context(|| format!("Invalid route emitter '{}'", addr))?,
            )),
        }
    }
}

/// Parse a native address string. SVM accepts base58 as well as `0x` hex.
fn parse_native(addr: &str, kind: ChainKind) -> anyhow::Result<Vec<u8>> {
    if kind == ChainKind::Svm && !addr.starts_with("0x") {
        let pubkey = Pubkey::from_str(addr)
            .map_err(|e| anyhow::anyhow!("Invalid base58 pubkey '{}': {}", addr, e))?;
        return Ok(pubkey.to_bytes().to_vec());
    }
    let address_kind = kind.address_kind();
    let canonical = parse_hex_address(addr, address_kind)?;
    Ok(bridge_common::denormalize(&canonical, address_kind)?)
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - At least one bridge is configured and chain ids are unique
    /// - Every bridge address and owner parses for its host
    /// - No bridge lists an emitter for its own chain
    /// - Relay routes reference configured destination chains
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - First problem found
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bridges.is_empty() {
            return Err(anyhow::anyhow!(
                "Configuration error: at least one bridge must be configured"
            ));
        }

        let mut chain_ids = HashSet::new();
        for bridge in &self.bridges {
            if !chain_ids.insert(bridge.chain_id) {
                return Err(anyhow::anyhow!(
                    "Configuration error: chain ID {} is configured more than once. Each bridge must have a unique chain ID.",
                    bridge.chain_id
                ));
            }

            bridge.native_address()?;
            let owner = bridge.owner_identity()?;
            if owner == [0u8; 32] {
                return Err(anyhow::anyhow!(
                    "Configuration error: bridge '{}' has a zero owner",
                    bridge.name
                ));
            }

            for emitter in &bridge.emitters {
                if emitter.chain_id == bridge.chain_id {
                    return Err(anyhow::anyhow!(
                        "Configuration error: bridge '{}' registers an emitter for its own chain {}",
                        bridge.name,
                        bridge.chain_id
                    ));
                }
                emitter.canonical_address()?;
            }
        }

        for route in &self.relay.routes {
            if !chain_ids.contains(&route.destination_chain_id) {
                return Err(anyhow::anyhow!(
                    "Configuration error: relay route targets unconfigured chain {} ({})",
                    route.destination_chain_id,
                    chain_name(route.destination_chain_id)
                ));
            }
            if route.source_chain_id == route.destination_chain_id {
                return Err(anyhow::anyhow!(
                    "Configuration error: relay route from chain {} to itself",
                    route.source_chain_id
                ));
            }
            route.emitter_filter()?;
        }

        Ok(())
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/message-bridge.template.toml config/message-bridge.toml\n\
                Then edit config/message-bridge.toml with your actual values.",
                path.display()
            ));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `MESSAGE_BRIDGE_CONFIG_PATH`, or
    /// `config/message-bridge.toml` when the variable is unset.
    pub fn load() -> anyhow::Result<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(config_path)
    }

    pub fn bridge(&self, chain_id: u16) -> Option<&BridgeInstanceConfig> {
        self.bridges.iter().find(|b| b.chain_id == chain_id)
    }

    /// Creates a local three-chain devnet configuration.
    ///
    /// Arbitrum Sepolia (EVM), Solana (SVM) and Aztec bridges with placeholder
    /// addresses, zero fee, and every pair relayed.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            network: NetworkConfig {
                message_fee: 0,
                consistency_level: CONSISTENCY_LEVEL,
            },
            bridges: vec![
                BridgeInstanceConfig {
                    name: "Arbitrum Sepolia".to_string(),
                    chain_id: ARBITRUM_SEPOLIA_CHAIN_ID,
                    kind: ChainKind::Evm,
                    address: "0x0000000000000000000000000000000000abcdef".to_string(),
                    owner: "0x1111111111111111111111111111111111111111".to_string(),
                    register_peers: true,
                    emitters: Vec::new(),
                },
                BridgeInstanceConfig {
                    name: "Solana".to_string(),
                    chain_id: SOLANA_CHAIN_ID,
                    kind: ChainKind::Svm,
                    address: format!("0x{}", "22".repeat(32)),
                    owner: format!("0x{}", "33".repeat(32)),
                    register_peers: true,
                    emitters: Vec::new(),
                },
                BridgeInstanceConfig {
                    name: "Aztec".to_string(),
                    chain_id: AZTEC_CHAIN_ID,
                    kind: ChainKind::Aztec,
                    address: format!("0x{}", "44".repeat(32)),
                    owner: format!("0x{}", "55".repeat(32)),
                    register_peers: true,
                    emitters: Vec::new(),
                },
            ],
            relay: RelayConfig::default(),
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3340,
                cors_origins: vec!["http://localhost:3340".to_string()],
            },
        }
    }
}

//! Chain identifiers shared by every bridge instance and the attestation network.
//!
//! Values follow the Wormhole chain id registry. A bridge never trusts a chain id
//! on its own; it only compares ids against its registered emitters.

use crate::address::AddressKind;
use crate::messages::PayloadFormat;

// ---------------------------------------------------------------------------
// Wormhole chain IDs
// ---------------------------------------------------------------------------

pub const SOLANA_CHAIN_ID: u16 = 1;
pub const ETHEREUM_CHAIN_ID: u16 = 2;

/// Older Aztec devnet id, still seen on some guardian deployments.
pub const AZTEC_LEGACY_CHAIN_ID: u16 = 54;
pub const AZTEC_CHAIN_ID: u16 = 56;

pub const ETHEREUM_SEPOLIA_CHAIN_ID: u16 = 10002;
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u16 = 10003;
pub const BASE_SEPOLIA_CHAIN_ID: u16 = 10004;

/// Consistency level requested for outbound messages (finalized).
pub const CONSISTENCY_LEVEL: u8 = 1;

// ---------------------------------------------------------------------------
// Execution environments
// ---------------------------------------------------------------------------

/// The execution environment family behind a chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    /// EVM storage model, 20-byte addresses.
    Evm,
    /// Solana-style account/PDA model, 32-byte addresses.
    Svm,
    /// Fixed-width circuit-input model, 32-byte field-element addresses.
    Aztec,
}

impl ChainKind {
    /// Native address encoding used by this environment.
    pub fn address_kind(self) -> AddressKind {
        match self {
            ChainKind::Evm => AddressKind::Evm,
            ChainKind::Svm => AddressKind::Account,
            ChainKind::Aztec => AddressKind::Field,
        }
    }

    /// Payload format this environment emits on outbound sends.
    ///
    /// The circuit chain attaches its transaction id; the others send the short form.
    pub fn outbound_format(self) -> PayloadFormat {
        match self {
            ChainKind::Evm | ChainKind::Svm => PayloadFormat::Default18,
            ChainKind::Aztec => PayloadFormat::Extended50,
        }
    }

    /// Whether inbound VAAs must be posted to the network before `receive_value`.
    pub fn requires_posted_vaa(self) -> bool {
        !matches!(self, ChainKind::Evm)
    }

    /// Look up the environment for a well-known chain id.
    ///
    /// Returns `None` for ids outside the registry; callers then fall back to
    /// canonical 32-byte addresses.
    pub fn from_chain_id(chain_id: u16) -> Option<Self> {
        match chain_id {
            SOLANA_CHAIN_ID => Some(ChainKind::Svm),
            ETHEREUM_CHAIN_ID
            | ETHEREUM_SEPOLIA_CHAIN_ID
            | ARBITRUM_SEPOLIA_CHAIN_ID
            | BASE_SEPOLIA_CHAIN_ID => Some(ChainKind::Evm),
            AZTEC_CHAIN_ID | AZTEC_LEGACY_CHAIN_ID => Some(ChainKind::Aztec),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainKind::Evm => write!(f, "evm"),
            ChainKind::Svm => write!(f, "svm"),
            ChainKind::Aztec => write!(f, "aztec"),
        }
    }
}

/// Human-readable name for log lines.
pub fn chain_name(chain_id: u16) -> &'static str {
    match chain_id {
        SOLANA_CHAIN_ID => "Solana",
        ETHEREUM_CHAIN_ID => "Ethereum",
        ETHEREUM_SEPOLIA_CHAIN_ID => "Ethereum Sepolia",
        ARBITRUM_SEPOLIA_CHAIN_ID => "Arbitrum Sepolia",
        BASE_SEPOLIA_CHAIN_ID => "Base Sepolia",
        AZTEC_CHAIN_ID | AZTEC_LEGACY_CHAIN_ID => "Aztec",
        _ => "Unknown",
    }
}

/// Native address kind for a chain id, or `Canonical` for unknown chains.
pub fn address_kind_for_chain(chain_id: u16) -> AddressKind {
    ChainKind::from_chain_id(chain_id)
        .map(ChainKind::address_kind)
        .unwrap_or(AddressKind::Canonical)
}

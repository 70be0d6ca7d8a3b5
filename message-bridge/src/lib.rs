//! Message Bridge Library
//!
//! This crate implements the cross-chain message bridge protocol: an emitter registry,
//! outbound sequencing, an at-most-once inbound replay guard, and the state machine
//! that ties them together, on top of three host storage models (EVM word slots,
//! Solana-style PDA accounts, and circuit public storage with nullifiers).
//! It also ships a local attestation network, a VAA relay and an operations API.

pub mod adapter;
pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod guard;
pub mod hosts;
pub mod network;
pub mod registry;
pub mod relay;
pub mod service;
pub mod state;
pub mod storage;

// Re-export commonly used types
pub use adapter::{share, ChainAdapter, SharedBridge};
pub use bridge::MessageBridge;
pub use config::{ApiConfig, BridgeInstanceConfig, Config};
pub use error::{BridgeError, ErrorClass};
pub use network::{AttestationNetwork, LocalAttestationNetwork};
pub use registry::EmitterRegistration;
pub use relay::{RelayOutcome, RelayRoute, VaaRelay};
pub use service::BridgeService;
pub use state::{BridgeConfig, ForeignEmitter, OutboundMessage, ReceivedMessage};
pub use storage::BridgeStorage;

//! Shared wire formats for the cross-chain message bridge.
//!
//! Every bridge host (EVM storage, Solana-style accounts, fixed-width circuit inputs)
//! must agree byte-for-byte on the formats in this crate:
//!
//! - [`address`]: native address widths and the canonical 32-byte form
//! - [`messages`]: the Default18 / Extended50 value payloads
//! - [`vaa`]: attested message layout and the body hash used to identify it
//! - [`chains`]: the shared chain identifier namespace

pub mod address;
pub mod chains;
pub mod error;
pub mod messages;
pub mod vaa;

pub use address::{denormalize, normalize, parse_hex_address, AddressKind, ZERO_ADDRESS};
pub use chains::ChainKind;
pub use error::CodecError;
pub use messages::{PayloadFormat, ValueMessage};
pub use vaa::{body_hash, GuardianSignature, Vaa};

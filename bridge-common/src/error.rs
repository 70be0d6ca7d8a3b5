//! Error definitions for the bridge wire formats.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid address length: expected {expected} bytes, got {actual}")]
    InvalidAddressLength { expected: usize, actual: usize },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid VAA: {0}")]
    InvalidVaa(String),
}

//! Value payloads carried inside VAA bodies.
//!
//! The payload does not describe its own format. The receiving bridge decodes with
//! the format it registered for the emitter, and a length that does not match that
//! format exactly is rejected.
//!
//! ## Default18 (18 bytes)
//!
//! ```text
//! destination_chain_id: u16 BE | value: u128 BE
//! ```
//!
//! ## Extended50 (50 bytes)
//!
//! ```text
//! origin_tx_id: [u8; 32] | destination_chain_id: u16 BE | value: u128 BE
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

pub const DEFAULT18_SIZE: usize = 18;
pub const EXTENDED50_SIZE: usize = 50;

/// Wire format of a value payload, fixed per registered emitter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum PayloadFormat {
    Default18,
    Extended50,
}

impl PayloadFormat {
    /// Exact encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            PayloadFormat::Default18 => DEFAULT18_SIZE,
            PayloadFormat::Extended50 => EXTENDED50_SIZE,
        }
    }

    /// True when the format carries an origin transaction id.
    pub const fn has_tx_id(self) -> bool {
        matches!(self, PayloadFormat::Extended50)
    }
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadFormat::Default18 => write!(f, "Default18"),
            PayloadFormat::Extended50 => write!(f, "Extended50"),
        }
    }
}

/// Decoded value payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueMessage {
    pub destination_chain_id: u16,
    pub value: u128,
    /// Origin transaction id; present only for `Extended50`.
    pub tx_id: Option<[u8; 32]>,
}

impl ValueMessage {
    /// Build a `Default18` message.
    pub fn new(destination_chain_id: u16, value: u128) -> Self {
        Self {
            destination_chain_id,
            value,
            tx_id: None,
        }
    }

    /// Build an `Extended50` message.
    pub fn with_tx_id(destination_chain_id: u16, value: u128, tx_id: [u8; 32]) -> Self {
        Self {
            destination_chain_id,
            value,
            tx_id: Some(tx_id),
        }
    }

    /// Encode in the given format.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Exactly `format.size()` bytes
    /// * `Err(CodecError::InvalidPayload)` - `tx_id` presence does not match the format
    pub fn encode(&self, format: PayloadFormat) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(format.size());
        match (format, self.tx_id) {
            (PayloadFormat::Default18, None) => {}
            (PayloadFormat::Extended50, Some(tx_id)) => buf.extend_from_slice(&tx_id),
            (PayloadFormat::Default18, Some(_)) => {
                return Err(CodecError::InvalidPayload(
                    "Default18 does not carry a tx id".to_string(),
                ))
            }
            (PayloadFormat::Extended50, None) => {
                return Err(CodecError::InvalidPayload(
                    "Extended50 requires a tx id".to_string(),
                ))
            }
        }
        buf.extend_from_slice(&self.destination_chain_id.to_be_bytes());
        buf.extend_from_slice(&self.value.to_be_bytes());
        Ok(buf)
    }

    /// Decode from exactly `format.size()` bytes.
    pub fn decode(format: PayloadFormat, data: &[u8]) -> Result<Self, CodecError> {
        if data.len() != format.size() {
            return Err(CodecError::InvalidPayload(format!(
                "{} payload must be {} bytes, got {}",
                format,
                format.size(),
                data.len()
            )));
        }

        let (tx_id, rest) = if format.has_tx_id() {
            let mut tx_id = [0u8; 32];
            tx_id.copy_from_slice(&data[..32]);
            (Some(tx_id), &data[32..])
        } else {
            (None, data)
        };

        let destination_chain_id = u16::from_be_bytes([rest[0], rest[1]]);
        let mut value_bytes = [0u8; 16];
        value_bytes.copy_from_slice(&rest[2..18]);

        Ok(Self {
            destination_chain_id,
            value: u128::from_be_bytes(value_bytes),
            tx_id,
        })
    }

    /// Destination chain of a payload whose format is not yet known.
    ///
    /// The two formats differ in length, so the length alone selects one. Returns
    /// `None` for any other length.
    pub fn peek_destination(data: &[u8]) -> Option<u16> {
        [PayloadFormat::Default18, PayloadFormat::Extended50]
            .into_iter()
            .find(|format| format.size() == data.len())
            .and_then(|format| Self::decode(format, data).ok())
            .map(|message| message.destination_chain_id)
    }
}

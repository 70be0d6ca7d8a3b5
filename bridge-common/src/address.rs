//! Address normalization between native encodings and the canonical 32-byte form.
//!
//! Every cross-chain comparison happens on canonical addresses: 32 bytes,
//! big-endian, left-padded with zeros from narrower native forms.

use crate::error::CodecError;

/// All-zero canonical address. Never a valid emitter or owner.
pub const ZERO_ADDRESS: [u8; 32] = [0u8; 32];

/// Native address encoding of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// 20-byte EVM account address.
    Evm,
    /// 32-byte account-chain public key.
    Account,
    /// 32-byte field element.
    Field,
    /// Already canonical; accepted as-is.
    Canonical,
}

impl AddressKind {
    /// Native width in bytes.
    pub const fn width(self) -> usize {
        match self {
            AddressKind::Evm => 20,
            AddressKind::Account | AddressKind::Field | AddressKind::Canonical => 32,
        }
    }
}

/// Convert a native address into its canonical 32-byte form.
///
/// # Returns
///
/// * `Ok([u8; 32])` - Canonical address
/// * `Err(CodecError::InvalidAddressLength)` - Input width does not match `kind`
pub fn normalize(native: &[u8], kind: AddressKind) -> Result<[u8; 32], CodecError> {
    let expected = kind.width();
    if native.len() != expected {
        return Err(CodecError::InvalidAddressLength {
            expected,
            actual: native.len(),
        });
    }

    let mut canonical = [0u8; 32];
    canonical[32 - expected..].copy_from_slice(native);
    Ok(canonical)
}

/// Strip canonical padding back to the native width.
///
/// Fails with `InvalidAddressLength` when the padding bytes are not zero, since such
/// a canonical address cannot have come from a narrower native address.
pub fn denormalize(canonical: &[u8; 32], kind: AddressKind) -> Result<Vec<u8>, CodecError> {
    let width = kind.width();
    let pad = 32 - width;
    if canonical[..pad].iter().any(|b| *b != 0) {
        return Err(CodecError::InvalidAddressLength {
            expected: width,
            actual: 32 - canonical.iter().take_while(|b| **b == 0).count(),
        });
    }
    Ok(canonical[pad..].to_vec())
}

/// Parse a hex address (with or without `0x`) and normalize it.
///
/// Short hex strings are left-padded to the native width first, so `0x1` and
/// Move-style addresses with stripped leading zeros parse as expected.
pub fn parse_hex_address(addr: &str, kind: AddressKind) -> Result<[u8; 32], CodecError> {
    let hex_clean = addr.strip_prefix("0x").unwrap_or(addr);
    let width = kind.width();

    if hex_clean.len() > width * 2 {
        return Err(CodecError::InvalidAddressLength {
            expected: width,
            actual: hex_clean.len().div_ceil(2),
        });
    }

    let padded = format!("{:0>width$}", hex_clean, width = width * 2);
    let bytes = hex::decode(&padded)
        .map_err(|e| CodecError::InvalidAddress(format!("{}: {}", addr, e)))?;
    normalize(&bytes, kind)
}

/// Render a canonical address as `0x`-prefixed lowercase hex.
pub fn to_hex(canonical: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(canonical))
}

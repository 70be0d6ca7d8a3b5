//! Attested message (VAA) layout.
//!
//! ## Layout
//!
//! ```text
//! header: version:1 | guardian_set_index:4 BE | sig_count:1 | sigs[sig_count] x 66
//! body:   timestamp:4 BE | nonce:4 BE | emitter_chain:2 BE | emitter_address:32
//!         | sequence:8 BE | consistency_level:1 | payload
//! ```
//!
//! A VAA is identified by the double SHA-256 of its body. Signatures are carried
//! through untouched; verifying them is the attestation network's job.

use sha2::{Digest, Sha256};

use crate::error::CodecError;

/// Size of one signature record: guardian index (1) + secp256k1 signature (65).
pub const SIGNATURE_SIZE: usize = 66;
/// version + guardian set index + signature count.
pub const HEADER_SIZE: usize = 6;
/// Fixed body fields before the payload.
pub const BODY_FIXED_SIZE: usize = 51;
/// The signature count is a single byte.
pub const MAX_SIGNATURES: usize = u8::MAX as usize;

const SIG_COUNT_OFFSET: usize = 5;

/// One guardian signature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardianSignature {
    pub index: u8,
    pub signature: [u8; 65],
}

/// Parsed VAA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<GuardianSignature>,
    pub timestamp: u32,
    pub nonce: u32,
    pub emitter_chain: u16,
    pub emitter_address: [u8; 32],
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

impl Vaa {
    /// Parse a raw VAA.
    ///
    /// Versions 1 and 2 are accepted; the header layout is identical for both.
    ///
    /// # Returns
    ///
    /// * `Ok(Vaa)` - Parsed VAA
    /// * `Err(CodecError::InvalidVaa)` - Unknown version or truncated input
    pub fn parse(raw: &[u8]) -> Result<Self, CodecError> {
        let body_start = body_offset(raw)?;
        let version = raw[0];
        if version != 1 && version != 2 {
            return Err(CodecError::InvalidVaa(format!(
                "unsupported version {}",
                version
            )));
        }

        let guardian_set_index = u32::from_be_bytes([raw[1], raw[2], raw[3], raw[4]]);
        let signatures = raw[HEADER_SIZE..body_start]
            .chunks_exact(SIGNATURE_SIZE)
            .map(|record| {
                let mut signature = [0u8; 65];
                signature.copy_from_slice(&record[1..]);
                GuardianSignature {
                    index: record[0],
                    signature,
                }
            })
            .collect();

        let body = &raw[body_start..];
        let timestamp = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        let nonce = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
        let emitter_chain = u16::from_be_bytes([body[8], body[9]]);
        let mut emitter_address = [0u8; 32];
        emitter_address.copy_from_slice(&body[10..42]);
        let mut sequence_bytes = [0u8; 8];
        sequence_bytes.copy_from_slice(&body[42..50]);
        let consistency_level = body[50];

        Ok(Self {
            version,
            guardian_set_index,
            signatures,
            timestamp,
            nonce,
            emitter_chain,
            emitter_address,
            sequence: u64::from_be_bytes(sequence_bytes),
            consistency_level,
            payload: body[BODY_FIXED_SIZE..].to_vec(),
        })
    }

    /// Serialize the body only.
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(BODY_FIXED_SIZE + self.payload.len());
        body.extend_from_slice(&self.timestamp.to_be_bytes());
        body.extend_from_slice(&self.nonce.to_be_bytes());
        body.extend_from_slice(&self.emitter_chain.to_be_bytes());
        body.extend_from_slice(&self.emitter_address);
        body.extend_from_slice(&self.sequence.to_be_bytes());
        body.push(self.consistency_level);
        body.extend_from_slice(&self.payload);
        body
    }

    /// Serialize header, signatures and body.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Raw VAA
    /// * `Err(CodecError::InvalidVaa)` - More than `MAX_SIGNATURES` signatures
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let sig_count = u8::try_from(self.signatures.len()).map_err(|_| {
            CodecError::InvalidVaa(format!(
                "{} signatures exceed the limit of {}",
                self.signatures.len(),
                MAX_SIGNATURES
            ))
        })?;

        let body = self.body_bytes();
        let mut out =
            Vec::with_capacity(HEADER_SIZE + self.signatures.len() * SIGNATURE_SIZE + body.len());
        out.push(self.version);
        out.extend_from_slice(&self.guardian_set_index.to_be_bytes());
        out.push(sig_count);
        for sig in &self.signatures {
            out.push(sig.index);
            out.extend_from_slice(&sig.signature);
        }
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Double SHA-256 of the body.
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.body_bytes())
    }
}

/// Offset of the body within a raw VAA.
///
/// Fails when the header, the signature records or the fixed body fields run past
/// the end of `raw`.
pub fn body_offset(raw: &[u8]) -> Result<usize, CodecError> {
    if raw.len() < HEADER_SIZE {
        return Err(CodecError::InvalidVaa(format!(
            "header truncated: {} bytes",
            raw.len()
        )));
    }

    let sig_count = raw[SIG_COUNT_OFFSET] as usize;
    let body_start = HEADER_SIZE + sig_count * SIGNATURE_SIZE;
    if raw.len() < body_start + BODY_FIXED_SIZE {
        return Err(CodecError::InvalidVaa(format!(
            "expected at least {} bytes for {} signatures, got {}",
            body_start + BODY_FIXED_SIZE,
            sig_count,
            raw.len()
        )));
    }
    Ok(body_start)
}

/// Hash identifying a raw VAA: `SHA256(SHA256(body))`.
pub fn body_hash(raw: &[u8]) -> Result<[u8; 32], CodecError> {
    let start = body_offset(raw)?;
    Ok(double_sha256(&raw[start..]))
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

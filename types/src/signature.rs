use serde::{Deserialize, Serialize};

pub const SIGNATURE_LEN: usize = 65;

/// Recoverable secp256k1 signature over an EIP-712 digest, laid out as
/// `r || s || v` with `v` in `{27, 28}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eip712Signature {
    bytes: Vec<u8>,
}

impl Eip712Signature {
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        let mut bytes = Vec::with_capacity(SIGNATURE_LEN);
        bytes.extend_from_slice(&r);
        bytes.extend_from_slice(&s);
        bytes.push(v);
        Self { bytes }
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SIGNATURE_LEN {
            return None;
        }
        Some(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The 64-byte compact `r || s` part.
    pub fn compact(&self) -> &[u8] {
        &self.bytes[..64]
    }

    pub fn v(&self) -> u8 {
        self.bytes[64]
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }
}

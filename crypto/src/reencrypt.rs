//! Single-use ephemeral keys for user decryption.
//!
//! The ciphertext service seals each requested plaintext to the ephemeral
//! public key (Ristretto Diffie-Hellman, then ChaCha20-Poly1305). Only the
//! holder of the matching secret can open the result, and opening consumes
//! the key pair.

use std::collections::HashMap;

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use fhescore_types::{ClearValue, FheType, Handle};
use rand::RngCore;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{CryptoError, Result};

const KDF_TAG: &[u8] = b"FHESCORE_REENCRYPT_V1";

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EphemeralPublicKey([u8; 32]);

impl EphemeralPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_point(self) -> Result<RistrettoPoint> {
        CompressedRistretto(self.0)
            .decompress()
            .ok_or(CryptoError::InvalidPublicKey)
    }
}

impl std::fmt::Debug for EphemeralPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EphemeralPublicKey(0x{}..)", hex::encode(&self.0[..6]))
    }
}

/// A plaintext sealed to an ephemeral public key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SealedValue {
    pub sender_point: [u8; 32],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Key pair generated for exactly one decryption request.
///
/// Not `Clone` and not serializable. `open` consumes it.
pub struct EphemeralKeypair {
    secret: Scalar,
    public: EphemeralPublicKey,
}

impl EphemeralKeypair {
    pub fn generate() -> Self {
        let secret = random_scalar();
        let public = (secret * RISTRETTO_BASEPOINT_POINT).compress().to_bytes();

        Self {
            secret,
            public: EphemeralPublicKey(public),
        }
    }

    pub fn public_key(&self) -> EphemeralPublicKey {
        self.public
    }

    /// Open every sealed value returned for this request.
    pub fn open(self, sealed: &HashMap<Handle, SealedValue>) -> Result<HashMap<Handle, ClearValue>> {
        sealed
            .iter()
            .map(|(handle, value)| {
                let sender = CompressedRistretto(value.sender_point)
                    .decompress()
                    .ok_or(CryptoError::InvalidPublicKey)?;
                let shared = self.secret * sender;
                let key = derive_key(&shared, &value.sender_point, handle);

                let plaintext = ChaCha20Poly1305::new(Key::from_slice(&key))
                    .decrypt(
                        Nonce::from_slice(&value.nonce),
                        Payload {
                            msg: &value.ciphertext,
                            aad: handle.as_bytes(),
                        },
                    )
                    .map_err(|_| CryptoError::OpenFailed)?;

                let (ty, raw) = decode_plaintext(&plaintext)?;
                Ok((*handle, ClearValue::from_wrapped(ty, raw)))
            })
            .collect()
    }
}

impl std::fmt::Debug for EphemeralKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Seal `value` of type `ty` so that only the holder of `recipient`'s secret
/// can read it.
pub fn seal_to(
    recipient: &EphemeralPublicKey,
    handle: &Handle,
    ty: FheType,
    value: i128,
) -> Result<SealedValue> {
    let recipient_point = recipient.to_point()?;

    let sender_secret = random_scalar();
    let sender_point = (sender_secret * RISTRETTO_BASEPOINT_POINT)
        .compress()
        .to_bytes();
    let shared = sender_secret * recipient_point;
    let key = derive_key(&shared, &sender_point, handle);

    let mut nonce = [0u8; 12];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = ChaCha20Poly1305::new(Key::from_slice(&key))
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &encode_plaintext(ty, value),
                aad: handle.as_bytes(),
            },
        )
        .map_err(|_| CryptoError::SealFailed)?;

    Ok(SealedValue {
        sender_point,
        nonce,
        ciphertext,
    })
}

/// Type tag followed by the little-endian wide value.
pub(crate) fn encode_plaintext(ty: FheType, value: i128) -> Vec<u8> {
    let mut out = Vec::with_capacity(17);
    out.push(ty.tag());
    out.extend_from_slice(&value.to_le_bytes());
    out
}

pub(crate) fn decode_plaintext(bytes: &[u8]) -> Result<(FheType, i128)> {
    if bytes.len() != 17 {
        return Err(CryptoError::Deserialization(format!(
            "Expected 17 plaintext bytes, got {}",
            bytes.len()
        )));
    }

    let ty = FheType::from_tag(bytes[0])
        .ok_or_else(|| CryptoError::Deserialization(format!("Unknown type tag {}", bytes[0])))?;
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[1..]);
    Ok((ty, i128::from_le_bytes(raw)))
}

fn derive_key(shared: &RistrettoPoint, sender_point: &[u8; 32], handle: &Handle) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KDF_TAG);
    hasher.update(shared.compress().as_bytes());
    hasher.update(sender_point);
    hasher.update(handle.as_bytes());
    hasher.finalize().into()
}

fn random_scalar() -> Scalar {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

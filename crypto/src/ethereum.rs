use crate::errors::{CryptoError, Result};
use crate::utils::keccak_256;
use fhescore_types::{Eip712Signature, Identity};
use rand::thread_rng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

pub type EthAddress = [u8; 20];

#[derive(Debug, Clone)]
pub struct EthKeyPair {
    pub secret: SecretKey,
    pub public: PublicKey,
    pub address: EthAddress,
}

impl EthKeyPair {
    pub fn random() -> Self {
        Self::from_secret(SecretKey::new(&mut thread_rng()))
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public = PublicKey::from_secret_key(&secp, &secret);
        let address = pubkey_to_address(&public);

        Self {
            secret,
            public,
            address,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.address)
    }

    /// Sign a 32-byte digest, producing an Ethereum-style `r || s || v`
    /// signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Eip712Signature {
        let secp = Secp256k1::new();
        let message = Message::from_digest(*digest);

        let signature = secp.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        Eip712Signature::new(r, s, 27 + recovery_id.to_i32() as u8)
    }
}

/// Recover the address that produced `signature` over `digest`.
pub fn recover_signer(digest: &[u8; 32], signature: &Eip712Signature) -> Result<Identity> {
    let secp = Secp256k1::new();

    let v = signature.v();
    let recovery = match v {
        27 | 28 => v - 27,
        0 | 1 => v,
        _ => return Err(CryptoError::InvalidSignature),
    };

    let recovery_id =
        RecoveryId::from_i32(recovery as i32).map_err(|_| CryptoError::InvalidSignature)?;
    let recoverable = RecoverableSignature::from_compact(signature.compact(), recovery_id)
        .map_err(|_| CryptoError::InvalidSignature)?;

    let message = Message::from_digest(*digest);
    let public = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| CryptoError::InvalidSignature)?;

    Ok(Identity::new(pubkey_to_address(&public)))
}

pub fn pubkey_to_address(pubkey: &PublicKey) -> EthAddress {
    let uncompressed = pubkey.serialize_uncompressed();

    let pubkey_bytes = &uncompressed[1..];

    let hash = keccak_256(pubkey_bytes);

    let mut address = [0u8; 20];

    address.copy_from_slice(&hash[12..]);
    address
}

//! In-process ciphertext service.
//!
//! Ciphertexts are sealed under a network key that never leaves this struct
//! and are addressed by keccak-derived handles. Homomorphic operations are
//! evaluated inside the service boundary; callers only ever exchange handles.
//! Plaintexts leave the service exclusively through `user_decrypt`, sealed to
//! an ephemeral key the user signed for.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use dashmap::DashMap;
use fhescore_types::{EncryptedInput, Eip712Signature, FheType, Handle, Identity};
use tracing::{debug, warn};

use crate::backend::{CiphertextService, DecryptRequest};
use crate::eip712::{typed_data_digest, Eip712Domain, ReencryptMessage};
use crate::errors::{CryptoError, Result};
use crate::ethereum::{recover_signer, EthKeyPair};
use crate::reencrypt::{decode_plaintext, encode_plaintext, seal_to, EphemeralPublicKey, SealedValue};
use crate::utils::{keccak_256, random_bytes};

const HANDLE_TAG: &[u8] = b"FHESCORE_HANDLE_V1";
const INPUT_PROOF_TAG: &[u8] = b"FHESCORE_INPUT_V1";

#[derive(Debug, Clone)]
struct StoredCiphertext {
    ty: FheType,
    nonce: [u8; 12],
    sealed: Vec<u8>,
    acl: HashSet<Identity>,
}

pub struct LocalCoprocessor {
    chain_id: u64,
    network_key: [u8; 32],
    input_verifier: EthKeyPair,
    ciphertexts: DashMap<Handle, StoredCiphertext>,
    online: AtomicBool,
}

impl LocalCoprocessor {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            network_key: random_bytes(),
            input_verifier: EthKeyPair::random(),
            ciphertexts: DashMap::new(),
            online: AtomicBool::new(true),
        }
    }

    /// Simulate the service dropping off the network (or coming back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            warn!("ciphertext service offline");
            Err(CryptoError::BackendUnavailable)
        }
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.network_key))
    }

    fn store(&self, ty: FheType, value: i128) -> Result<Handle> {
        let nonce: [u8; 12] = random_bytes();
        let plaintext = encode_plaintext(ty, ty.wrap(value));
        let sealed = self
            .cipher()
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &plaintext,
                    aad: &[ty.tag()],
                },
            )
            .map_err(|_| CryptoError::SealFailed)?;

        let mut preimage = Vec::with_capacity(HANDLE_TAG.len() + 12 + sealed.len());
        preimage.extend_from_slice(HANDLE_TAG);
        preimage.extend_from_slice(&nonce);
        preimage.extend_from_slice(&sealed);
        let handle = Handle::new(keccak_256(&preimage));

        self.ciphertexts.insert(
            handle,
            StoredCiphertext {
                ty,
                nonce,
                sealed,
                acl: HashSet::new(),
            },
        );
        Ok(handle)
    }

    fn load(&self, handle: Handle) -> Result<(FheType, i128)> {
        let stored = self
            .ciphertexts
            .get(&handle)
            .map(|entry| entry.value().clone())
            .ok_or(CryptoError::UnknownHandle(handle))?;

        let plaintext = self
            .cipher()
            .decrypt(
                Nonce::from_slice(&stored.nonce),
                Payload {
                    msg: &stored.sealed,
                    aad: &[stored.ty.tag()],
                },
            )
            .map_err(|_| CryptoError::OpenFailed)?;

        decode_plaintext(&plaintext)
    }

    fn load_numeric(&self, handle: Handle) -> Result<(FheType, i128)> {
        let (ty, value) = self.load(handle)?;
        if ty == FheType::Bool {
            return Err(CryptoError::TypeMismatch(format!(
                "{} is {}, expected an integer",
                handle, ty
            )));
        }
        Ok((ty, value))
    }

    fn input_digest(&self, handles: &[Handle], contract: Identity, user: Identity) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(INPUT_PROOF_TAG.len() + 8 + 40 + 32 * handles.len());
        preimage.extend_from_slice(INPUT_PROOF_TAG);
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(contract.as_bytes());
        preimage.extend_from_slice(user.as_bytes());
        for handle in handles {
            preimage.extend_from_slice(handle.as_bytes());
        }
        keccak_256(&preimage)
    }
}

/// Result type of a binary integer operation.
fn promote(lhs: FheType, rhs: FheType) -> FheType {
    if lhs.is_signed() || rhs.is_signed() {
        FheType::Int64
    } else if lhs.bits() >= rhs.bits() {
        lhs
    } else {
        rhs
    }
}

/// Input proof layout: `count (1 byte) || handles (32 bytes each) || signature (65 bytes)`.
fn encode_input_proof(handles: &[Handle], signature: &Eip712Signature) -> Vec<u8> {
    let mut proof = Vec::with_capacity(1 + 32 * handles.len() + 65);
    proof.push(handles.len() as u8);
    for handle in handles {
        proof.extend_from_slice(handle.as_bytes());
    }
    proof.extend_from_slice(signature.as_bytes());
    proof
}

fn decode_input_proof(proof: &[u8]) -> Option<(Vec<Handle>, Eip712Signature)> {
    let count = *proof.first()? as usize;
    let handles_end = 1 + 32 * count;
    if proof.len() != handles_end + 65 {
        return None;
    }

    let handles = proof[1..handles_end]
        .chunks_exact(32)
        .map(|chunk| {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(chunk);
            Handle::new(bytes)
        })
        .collect();
    let signature = Eip712Signature::from_slice(&proof[handles_end..])?;
    Some((handles, signature))
}

#[async_trait]
impl CiphertextService for LocalCoprocessor {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn encrypt_input(
        &self,
        value: u64,
        ty: FheType,
        contract: Identity,
        user: Identity,
    ) -> Result<EncryptedInput> {
        self.ensure_online()?;
        if ty == FheType::Int64 || !ty.fits(value) {
            return Err(CryptoError::ValueOutOfRange(ty));
        }

        let handle = self.store(ty, value as i128)?;
        let handles = vec![handle];
        let digest = self.input_digest(&handles, contract, user);
        let signature = self.input_verifier.sign_digest(&digest);

        debug!(%handle, %ty, %contract, %user, "encrypted input");
        Ok(EncryptedInput::new(
            handles.clone(),
            encode_input_proof(&handles, &signature),
        ))
    }

    async fn verify_input(
        &self,
        handle: Handle,
        input_proof: &[u8],
        contract: Identity,
        user: Identity,
    ) -> Result<Handle> {
        self.ensure_online()?;
        let invalid = |reason: &str| CryptoError::InvalidProof {
            handle,
            reason: reason.to_string(),
        };

        let (handles, signature) =
            decode_input_proof(input_proof).ok_or_else(|| invalid("malformed proof"))?;
        if !handles.contains(&handle) {
            return Err(invalid("handle not covered by proof"));
        }

        let digest = self.input_digest(&handles, contract, user);
        let signer = recover_signer(&digest, &signature).map_err(|_| invalid("bad signature"))?;
        if signer != self.input_verifier.identity() {
            return Err(invalid("proof not issued for this contract and user"));
        }

        let mut entry = self
            .ciphertexts
            .get_mut(&handle)
            .ok_or_else(|| invalid("unknown ciphertext"))?;
        if matches!(entry.ty, FheType::Int64 | FheType::Bool) {
            return Err(invalid("only unsigned integer inputs are accepted"));
        }
        entry.acl.insert(contract);

        debug!(%handle, %contract, %user, "verified input proof");
        Ok(handle)
    }

    async fn trivial_encrypt(&self, value: i64, ty: FheType) -> Result<Handle> {
        self.ensure_online()?;
        if !ty.is_signed() && (value < 0 || !ty.fits(value as u64)) {
            return Err(CryptoError::ValueOutOfRange(ty));
        }
        self.store(ty, value as i128)
    }

    async fn add(&self, lhs: Handle, rhs: Handle) -> Result<Handle> {
        self.ensure_online()?;
        let (lhs_ty, a) = self.load_numeric(lhs)?;
        let (rhs_ty, b) = self.load_numeric(rhs)?;
        let ty = promote(lhs_ty, rhs_ty);
        self.store(ty, a + b)
    }

    async fn mul_scalar(&self, lhs: Handle, scalar: i64) -> Result<Handle> {
        self.ensure_online()?;
        let (ty, a) = self.load_numeric(lhs)?;
        self.store(ty, a.wrapping_mul(scalar as i128))
    }

    async fn cast(&self, value: Handle, ty: FheType) -> Result<Handle> {
        self.ensure_online()?;
        let (_, a) = self.load(value)?;
        self.store(ty, a)
    }

    async fn ge(&self, lhs: Handle, rhs: Handle) -> Result<Handle> {
        self.ensure_online()?;
        let (_, a) = self.load_numeric(lhs)?;
        let (_, b) = self.load_numeric(rhs)?;
        self.store(FheType::Bool, (a >= b) as i128)
    }

    async fn allow(&self, handle: Handle, who: Identity) -> Result<()> {
        self.ensure_online()?;
        let mut entry = self
            .ciphertexts
            .get_mut(&handle)
            .ok_or(CryptoError::UnknownHandle(handle))?;
        entry.acl.insert(who);
        Ok(())
    }

    async fn is_allowed(&self, handle: Handle, who: Identity) -> Result<bool> {
        self.ensure_online()?;
        Ok(self
            .ciphertexts
            .get(&handle)
            .map(|entry| entry.acl.contains(&who))
            .unwrap_or(false))
    }

    async fn user_decrypt(
        &self,
        requests: &[DecryptRequest],
        public_key: EphemeralPublicKey,
        signature: &Eip712Signature,
        domain: &Eip712Domain,
        user: Identity,
    ) -> Result<HashMap<Handle, SealedValue>> {
        self.ensure_online()?;
        let denied = |reason: String| CryptoError::DecryptionUnauthorized { user, reason };

        if domain.chain_id != self.chain_id {
            return Err(denied(format!(
                "domain chain {} does not match service chain {}",
                domain.chain_id, self.chain_id
            )));
        }

        let digest = typed_data_digest(domain, &ReencryptMessage { public_key });
        let signer = recover_signer(&digest, signature)
            .map_err(|_| denied("unrecoverable signature".to_string()))?;
        if signer != user {
            return Err(denied(format!("signature recovers to {}", signer)));
        }

        let mut sealed = HashMap::with_capacity(requests.len());
        for request in requests {
            if request.contract != domain.verifying_contract {
                return Err(denied(format!(
                    "{} requested through {} outside the signed domain",
                    request.handle, request.contract
                )));
            }

            let permitted = self
                .ciphertexts
                .get(&request.handle)
                .map(|entry| entry.acl.contains(&user) && entry.acl.contains(&request.contract))
                .unwrap_or(false);
            if !permitted {
                return Err(denied(format!("no access to {}", request.handle)));
            }

            let (ty, value) = self.load(request.handle)?;
            sealed.insert(request.handle, seal_to(&public_key, &request.handle, ty, value)?);
        }

        debug!(%user, count = requests.len(), "user decryption served");
        Ok(sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reencrypt::EphemeralKeypair;
    use fhescore_types::ClearValue;

    const CHAIN: u64 = 31337;

    fn contract() -> Identity {
        Identity::new([0xcc; 20])
    }

    async fn decrypt_as(
        service: &LocalCoprocessor,
        wallet: &EthKeyPair,
        handle: Handle,
    ) -> Result<ClearValue> {
        let keypair = EphemeralKeypair::generate();
        let domain = Eip712Domain::authorization(CHAIN, contract());
        let digest = typed_data_digest(
            &domain,
            &ReencryptMessage {
                public_key: keypair.public_key(),
            },
        );
        let signature = wallet.sign_digest(&digest);

        let sealed = service
            .user_decrypt(
                &[DecryptRequest {
                    handle,
                    contract: contract(),
                }],
                keypair.public_key(),
                &signature,
                &domain,
                wallet.identity(),
            )
            .await?;
        Ok(keypair.open(&sealed)?[&handle])
    }

    async fn grant(service: &LocalCoprocessor, handle: Handle, user: Identity) {
        service.allow(handle, user).await.unwrap();
        service.allow(handle, contract()).await.unwrap();
    }

    #[tokio::test]
    async fn test_input_roundtrip() {
        let service = LocalCoprocessor::new(CHAIN);
        let wallet = EthKeyPair::random();

        let input = service
            .encrypt_input(42, FheType::Uint32, contract(), wallet.identity())
            .await
            .unwrap();
        let handle = service
            .verify_input(input.handles[0], &input.input_proof, contract(), wallet.identity())
            .await
            .unwrap();

        service.allow(handle, wallet.identity()).await.unwrap();
        let clear = decrypt_as(&service, &wallet, handle).await.unwrap();
        assert_eq!(clear, ClearValue::Uint(42));
    }

    #[tokio::test]
    async fn test_value_must_fit_width() {
        let service = LocalCoprocessor::new(CHAIN);
        let result = service
            .encrypt_input(256, FheType::Uint8, contract(), Identity::new([1; 20]))
            .await;
        assert!(matches!(result, Err(CryptoError::ValueOutOfRange(FheType::Uint8))));
    }

    #[tokio::test]
    async fn test_boolean_input_rejected_at_verification() {
        let service = LocalCoprocessor::new(CHAIN);
        let user = Identity::new([0xa1; 20]);

        let input = service
            .encrypt_input(1, FheType::Bool, contract(), user)
            .await
            .unwrap();
        let result = service
            .verify_input(input.handles[0], &input.input_proof, contract(), user)
            .await;

        assert!(matches!(result, Err(CryptoError::InvalidProof { .. })));
        assert!(!service.is_allowed(input.handles[0], contract()).await.unwrap());
    }

    #[tokio::test]
    async fn test_proof_bound_to_user_and_contract() {
        let service = LocalCoprocessor::new(CHAIN);
        let alice = Identity::new([0xa1; 20]);
        let bob = Identity::new([0xb0; 20]);

        let input = service
            .encrypt_input(7, FheType::Uint32, contract(), alice)
            .await
            .unwrap();

        let replayed_by_bob = service
            .verify_input(input.handles[0], &input.input_proof, contract(), bob)
            .await;
        assert!(matches!(replayed_by_bob, Err(CryptoError::InvalidProof { .. })));

        let other_contract = service
            .verify_input(input.handles[0], &input.input_proof, Identity::new([0xdd; 20]), alice)
            .await;
        assert!(matches!(other_contract, Err(CryptoError::InvalidProof { .. })));

        let truncated = service
            .verify_input(input.handles[0], &input.input_proof[..40], contract(), alice)
            .await;
        assert!(matches!(truncated, Err(CryptoError::InvalidProof { .. })));

        let foreign_handle = service
            .verify_input(Handle::new([9; 32]), &input.input_proof, contract(), alice)
            .await;
        assert!(matches!(foreign_handle, Err(CryptoError::InvalidProof { .. })));
    }

    #[tokio::test]
    async fn test_homomorphic_arithmetic() {
        let service = LocalCoprocessor::new(CHAIN);
        let wallet = EthKeyPair::random();

        let two = service.trivial_encrypt(2, FheType::Uint64).await.unwrap();
        let three = service.trivial_encrypt(3, FheType::Uint32).await.unwrap();

        let sum = service.add(two, three).await.unwrap();
        let signed = service.cast(sum, FheType::Int64).await.unwrap();
        let penalty = service.mul_scalar(signed, -200).await.unwrap();

        grant(&service, sum, wallet.identity()).await;
        grant(&service, penalty, wallet.identity()).await;

        assert_eq!(decrypt_as(&service, &wallet, sum).await.unwrap(), ClearValue::Uint(5));
        assert_eq!(
            decrypt_as(&service, &wallet, penalty).await.unwrap(),
            ClearValue::Int(-1000)
        );
    }

    #[tokio::test]
    async fn test_encrypted_comparison() {
        let service = LocalCoprocessor::new(CHAIN);
        let wallet = EthKeyPair::random();

        let score = service.trivial_encrypt(-170, FheType::Int64).await.unwrap();
        let threshold = service.trivial_encrypt(700, FheType::Int64).await.unwrap();
        let below = service.ge(score, threshold).await.unwrap();
        let above = service.ge(threshold, score).await.unwrap();

        grant(&service, below, wallet.identity()).await;
        grant(&service, above, wallet.identity()).await;

        assert_eq!(decrypt_as(&service, &wallet, below).await.unwrap(), ClearValue::Bool(false));
        assert_eq!(decrypt_as(&service, &wallet, above).await.unwrap(), ClearValue::Bool(true));

        assert!(matches!(
            service.add(below, score).await,
            Err(CryptoError::TypeMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_decrypt_requires_acl() {
        let service = LocalCoprocessor::new(CHAIN);
        let owner = EthKeyPair::random();
        let stranger = EthKeyPair::random();

        let handle = service.trivial_encrypt(530, FheType::Int64).await.unwrap();
        grant(&service, handle, owner.identity()).await;

        let denied = decrypt_as(&service, &stranger, handle).await;
        assert!(matches!(denied, Err(CryptoError::DecryptionUnauthorized { .. })));
        assert!(decrypt_as(&service, &owner, handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_decrypt_rejects_foreign_signature() {
        let service = LocalCoprocessor::new(CHAIN);
        let owner = EthKeyPair::random();
        let impostor = EthKeyPair::random();

        let handle = service.trivial_encrypt(1, FheType::Uint8).await.unwrap();
        grant(&service, handle, owner.identity()).await;

        let keypair = EphemeralKeypair::generate();
        let domain = Eip712Domain::authorization(CHAIN, contract());
        let digest = typed_data_digest(
            &domain,
            &ReencryptMessage {
                public_key: keypair.public_key(),
            },
        );

        // Impostor signs but claims to be the owner.
        let signature = impostor.sign_digest(&digest);
        let result = service
            .user_decrypt(
                &[DecryptRequest {
                    handle,
                    contract: contract(),
                }],
                keypair.public_key(),
                &signature,
                &domain,
                owner.identity(),
            )
            .await;
        assert!(matches!(result, Err(CryptoError::DecryptionUnauthorized { .. })));

        // Right signer, wrong chain in the domain.
        let wrong_chain = Eip712Domain::authorization(1, contract());
        let digest = typed_data_digest(
            &wrong_chain,
            &ReencryptMessage {
                public_key: keypair.public_key(),
            },
        );
        let signature = owner.sign_digest(&digest);
        let result = service
            .user_decrypt(
                &[DecryptRequest {
                    handle,
                    contract: contract(),
                }],
                keypair.public_key(),
                &signature,
                &wrong_chain,
                owner.identity(),
            )
            .await;
        assert!(matches!(result, Err(CryptoError::DecryptionUnauthorized { .. })));
    }

    #[tokio::test]
    async fn test_offline_service() {
        let service = LocalCoprocessor::new(CHAIN);
        service.set_online(false);

        let result = service.trivial_encrypt(0, FheType::Uint64).await;
        assert!(matches!(result, Err(CryptoError::BackendUnavailable)));
        assert_eq!(
            result.unwrap_err().kind(),
            fhescore_types::ErrorKind::BackendUnavailable
        );

        service.set_online(true);
        assert!(service.trivial_encrypt(0, FheType::Uint64).await.is_ok());
    }

    #[test]
    fn test_promotion() {
        assert_eq!(promote(FheType::Uint8, FheType::Uint64), FheType::Uint64);
        assert_eq!(promote(FheType::Uint32, FheType::Uint16), FheType::Uint32);
        assert_eq!(promote(FheType::Uint64, FheType::Int64), FheType::Int64);
    }
}

//! The ciphertext service seam.
//!
//! Everything that touches encrypted values goes through [`CiphertextService`]:
//! the ledger uses the homomorphic half, the client workflow uses
//! `encrypt_input` and `user_decrypt`. Implementations are free to run the
//! computation anywhere (a local coprocessor, a remote FHE network).

use std::collections::HashMap;

use async_trait::async_trait;
use fhescore_types::{EncryptedInput, Eip712Signature, FheType, Handle, Identity};
use serde::{Deserialize, Serialize};

use crate::eip712::Eip712Domain;
use crate::errors::Result;
use crate::reencrypt::{EphemeralPublicKey, SealedValue};

/// One ciphertext to decrypt, together with the contract that holds it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecryptRequest {
    pub handle: Handle,
    pub contract: Identity,
}

#[async_trait]
pub trait CiphertextService: Send + Sync {
    /// Chain the service verifies proofs and signatures against.
    fn chain_id(&self) -> u64;

    /// Encrypt `value` as `ty` for use by `user` in `contract`.
    async fn encrypt_input(
        &self,
        value: u64,
        ty: FheType,
        contract: Identity,
        user: Identity,
    ) -> Result<EncryptedInput>;

    /// Check that `handle` came from a bundle produced for `(contract, user)`
    /// and return the handle the contract may compute on.
    async fn verify_input(
        &self,
        handle: Handle,
        input_proof: &[u8],
        contract: Identity,
        user: Identity,
    ) -> Result<Handle>;

    async fn trivial_encrypt(&self, value: i64, ty: FheType) -> Result<Handle>;

    async fn add(&self, lhs: Handle, rhs: Handle) -> Result<Handle>;

    async fn mul_scalar(&self, lhs: Handle, scalar: i64) -> Result<Handle>;

    async fn cast(&self, value: Handle, ty: FheType) -> Result<Handle>;

    /// Encrypted `lhs >= rhs`.
    async fn ge(&self, lhs: Handle, rhs: Handle) -> Result<Handle>;

    async fn allow(&self, handle: Handle, who: Identity) -> Result<()>;

    async fn is_allowed(&self, handle: Handle, who: Identity) -> Result<bool>;

    /// Re-encrypt the requested ciphertexts to `public_key`, provided `user`
    /// signed the authorization for it under `domain`.
    async fn user_decrypt(
        &self,
        requests: &[DecryptRequest],
        public_key: EphemeralPublicKey,
        signature: &Eip712Signature,
        domain: &Eip712Domain,
        user: Identity,
    ) -> Result<HashMap<Handle, SealedValue>>;
}

use async_trait::async_trait;
use fhescore_crypto::{typed_data_digest, Eip712Domain, EthKeyPair, ReencryptMessage};
use fhescore_types::{Eip712Signature, Identity};

use crate::errors::Result;

/// Anything that can speak for an identity: a local key, a hardware wallet,
/// a browser extension.
#[async_trait]
pub trait SigningIdentity: Send + Sync {
    fn address(&self) -> Identity;

    /// Chain the signer is currently connected to.
    fn chain_id(&self) -> u64;

    async fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        message: &ReencryptMessage,
    ) -> Result<Eip712Signature>;
}

/// In-process secp256k1 signer.
pub struct LocalWallet {
    keypair: EthKeyPair,
    chain_id: u64,
}

impl LocalWallet {
    pub fn new(keypair: EthKeyPair, chain_id: u64) -> Self {
        Self { keypair, chain_id }
    }

    pub fn random(chain_id: u64) -> Self {
        Self::new(EthKeyPair::random(), chain_id)
    }

    pub fn keypair(&self) -> &EthKeyPair {
        &self.keypair
    }
}

#[async_trait]
impl SigningIdentity for LocalWallet {
    fn address(&self) -> Identity {
        self.keypair.identity()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn sign_typed_data(
        &self,
        domain: &Eip712Domain,
        message: &ReencryptMessage,
    ) -> Result<Eip712Signature> {
        Ok(self.keypair.sign_digest(&typed_data_digest(domain, message)))
    }
}

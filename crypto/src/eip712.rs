//! EIP-712 typed data for user decryption authorization.
//!
//! The user signs a `Reencrypt(bytes32 publicKey)` message under a domain bound
//! to the scoring contract and chain, proving that the ephemeral public key in
//! the request belongs to a session they opened.

use crate::reencrypt::EphemeralPublicKey;
use crate::utils::{abi_word_address, abi_word_u64, keccak_256};
use fhescore_types::Identity;
use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_DOMAIN_NAME: &str = "Authorization token";
pub const AUTHORIZATION_DOMAIN_VERSION: &str = "1";

const DOMAIN_TYPE: &[u8] =
    b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const REENCRYPT_TYPE: &[u8] = b"Reencrypt(bytes32 publicKey)";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Identity,
}

impl Eip712Domain {
    /// The authorization domain used for decryption requests against `contract`.
    pub fn authorization(chain_id: u64, contract: Identity) -> Self {
        Self {
            name: AUTHORIZATION_DOMAIN_NAME.to_string(),
            version: AUTHORIZATION_DOMAIN_VERSION.to_string(),
            chain_id,
            verifying_contract: contract,
        }
    }

    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 5);
        encoded.extend_from_slice(&keccak_256(DOMAIN_TYPE));
        encoded.extend_from_slice(&keccak_256(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak_256(self.version.as_bytes()));
        encoded.extend_from_slice(&abi_word_u64(self.chain_id));
        encoded.extend_from_slice(&abi_word_address(self.verifying_contract.as_bytes()));
        keccak_256(&encoded)
    }
}

/// The typed message a wallet signs to authorize one decryption request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReencryptMessage {
    pub public_key: EphemeralPublicKey,
}

impl ReencryptMessage {
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(64);
        encoded.extend_from_slice(&keccak_256(REENCRYPT_TYPE));
        encoded.extend_from_slice(self.public_key.as_bytes());
        keccak_256(&encoded)
    }
}

/// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`
pub fn typed_data_digest(domain: &Eip712Domain, message: &ReencryptMessage) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(66);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(&domain.separator());
    encoded.extend_from_slice(&message.struct_hash());
    keccak_256(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethereum::{recover_signer, EthKeyPair};

    fn message(byte: u8) -> ReencryptMessage {
        ReencryptMessage {
            public_key: EphemeralPublicKey::from_bytes([byte; 32]),
        }
    }

    #[test]
    fn test_domain_separator_binds_every_field() {
        let contract = Identity::new([0x11; 20]);
        let base = Eip712Domain::authorization(11155111, contract);

        let other_chain = Eip712Domain::authorization(31337, contract);
        let other_contract = Eip712Domain::authorization(11155111, Identity::new([0x22; 20]));
        let mut other_name = base.clone();
        other_name.name = "Something else".to_string();

        assert_ne!(base.separator(), other_chain.separator());
        assert_ne!(base.separator(), other_contract.separator());
        assert_ne!(base.separator(), other_name.separator());
        assert_eq!(base.separator(), base.clone().separator());
    }

    #[test]
    fn test_digest_depends_on_public_key() {
        let domain = Eip712Domain::authorization(31337, Identity::new([0x11; 20]));
        assert_ne!(
            typed_data_digest(&domain, &message(1)),
            typed_data_digest(&domain, &message(2))
        );
    }

    #[test]
    fn test_signed_digest_recovers_signer() {
        let wallet = EthKeyPair::random();
        let domain = Eip712Domain::authorization(31337, Identity::new([0x11; 20]));
        let digest = typed_data_digest(&domain, &message(9));

        let signature = wallet.sign_digest(&digest);
        assert_eq!(recover_signer(&digest, &signature).unwrap(), wallet.identity());
    }
}

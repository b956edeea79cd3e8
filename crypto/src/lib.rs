// Declare modules
pub mod backend;
pub mod coprocessor;
pub mod eip712;
pub mod errors;
pub mod ethereum;
pub mod reencrypt;
pub mod utils;

// Re-export commonly used items
pub use errors::{CryptoError, Result};

// Ciphertext service exports
pub use backend::{CiphertextService, DecryptRequest};
pub use coprocessor::LocalCoprocessor;

// Signing and authorization exports
pub use eip712::{typed_data_digest, Eip712Domain, ReencryptMessage};
pub use ethereum::{pubkey_to_address, recover_signer, EthAddress, EthKeyPair};

// Re-encryption exports
pub use reencrypt::{seal_to, EphemeralKeypair, EphemeralPublicKey, SealedValue};

use fhescore_types::{ErrorKind, FheType, Handle, Identity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid input proof for handle {handle}: {reason}")]
    InvalidProof { handle: Handle, reason: String },

    #[error("Unknown ciphertext handle {0}")]
    UnknownHandle(Handle),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Value does not fit {0}")]
    ValueOutOfRange(FheType),

    #[error("Decryption not authorized for {user}: {reason}")]
    DecryptionUnauthorized { user: Identity, reason: String },

    #[error("Ciphertext service unavailable")]
    BackendUnavailable,

    #[error("Sealing ciphertext failed")]
    SealFailed,

    #[error("Opening sealed value failed")]
    OpenFailed,

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::InvalidProof { .. } => ErrorKind::InvalidProof,
            CryptoError::DecryptionUnauthorized { .. } => ErrorKind::DecryptionUnauthorized,
            CryptoError::BackendUnavailable => ErrorKind::BackendUnavailable,
            _ => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;

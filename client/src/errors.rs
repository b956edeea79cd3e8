use std::fmt;

use fhescore_crypto::CryptoError;
use fhescore_ledger::LedgerError;
use fhescore_types::{ErrorKind, Handle, Identity};
use thiserror::Error;

/// The client-side call that failed, used to tell whether a retry is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
    Register,
    SubmitActivity,
    CalculateScore,
    Read,
    Verify,
}

impl Operation {
    /// Encryption, decryption and reads are pure functions of their inputs.
    /// Mutations must be re-checked against ledger state before a retry.
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            Operation::Encrypt | Operation::Decrypt | Operation::Read | Operation::Verify
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::Register => "register",
            Operation::SubmitActivity => "submit activity",
            Operation::CalculateScore => "calculate score",
            Operation::Read => "read",
            Operation::Verify => "verify score",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Decryption not authorized for {user}: {reason}")]
    DecryptionUnauthorized { user: Identity, reason: String },

    #[error("Ciphertext service unavailable during {operation}")]
    BackendUnavailable { operation: Operation },

    #[error("Unsupported network: chain {chain_id}")]
    UnsupportedNetwork { chain_id: u64 },

    #[error("Wallet is on chain {wallet}, ledger is on chain {ledger}")]
    ChainMismatch { wallet: u64, ledger: u64 },

    #[error("No plaintext returned for {0}")]
    MissingPlaintext(Handle),

    #[error("Unexpected plaintext type for {0}")]
    UnexpectedType(Handle),

    #[error(transparent)]
    Crypto(CryptoError),
}

impl ClientError {
    pub(crate) fn from_crypto(error: CryptoError, operation: Operation) -> Self {
        match error {
            CryptoError::BackendUnavailable => ClientError::BackendUnavailable { operation },
            CryptoError::DecryptionUnauthorized { user, reason } => {
                ClientError::DecryptionUnauthorized { user, reason }
            }
            other => ClientError::Crypto(other),
        }
    }

    pub(crate) fn from_ledger(error: LedgerError, operation: Operation) -> Self {
        match error {
            LedgerError::Service(inner) => Self::from_crypto(inner, operation),
            other => ClientError::Ledger(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Ledger(e) => e.kind(),
            ClientError::DecryptionUnauthorized { .. } => ErrorKind::DecryptionUnauthorized,
            ClientError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            ClientError::UnsupportedNetwork { .. } | ClientError::ChainMismatch { .. } => {
                ErrorKind::UnsupportedNetwork
            }
            ClientError::MissingPlaintext(_) | ClientError::UnexpectedType(_) => {
                ErrorKind::Internal
            }
            ClientError::Crypto(e) => e.kind(),
        }
    }

    /// True when the call can be repeated as-is. State-mutating calls that
    /// timed out are never retry-safe: re-query the ledger first.
    pub fn is_retry_safe(&self) -> bool {
        match self {
            ClientError::BackendUnavailable { operation } => {
                self.kind().is_transient() && operation.is_idempotent()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

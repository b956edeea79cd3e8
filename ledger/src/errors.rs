use fhescore_crypto::CryptoError;
use fhescore_types::{ActivityKind, ErrorKind, Handle, Identity};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("User already registered: {identity}")]
    AlreadyRegistered { identity: Identity },

    #[error("User not registered: {identity}")]
    NotRegistered { identity: Identity },

    #[error("Invalid activity type {kind} submitted by {identity}")]
    InvalidActivityKind { identity: Identity, kind: u8 },

    #[error("Invalid proof for {kind} increment {handle} from {identity}")]
    InvalidProof {
        identity: Identity,
        kind: ActivityKind,
        handle: Handle,
    },

    #[error("Score not calculated for {identity}")]
    ScoreNotCalculated { identity: Identity },

    #[error("{caller} may not read private ciphertexts of {identity}")]
    Unauthorized { caller: Identity, identity: Identity },

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Service(#[from] CryptoError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AlreadyRegistered { .. } => ErrorKind::AlreadyRegistered,
            LedgerError::NotRegistered { .. } => ErrorKind::NotRegistered,
            LedgerError::InvalidActivityKind { .. } => ErrorKind::InvalidActivityKind,
            LedgerError::InvalidProof { .. } => ErrorKind::InvalidProof,
            LedgerError::ScoreNotCalculated { .. } => ErrorKind::ScoreNotCalculated,
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::InvalidSnapshot(_) => ErrorKind::Internal,
            LedgerError::Service(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error taxonomy shared by every layer, so a caller can decide whether a
/// failed call may be retried without first re-querying ledger state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyRegistered,
    NotRegistered,
    InvalidActivityKind,
    InvalidProof,
    ScoreNotCalculated,
    Unauthorized,
    DecryptionUnauthorized,
    BackendUnavailable,
    UnsupportedNetwork,
    Internal,
}

impl ErrorKind {
    /// Only an unreachable backend is transient; every other kind is a
    /// definitive answer from the ledger or the service.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::BackendUnavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

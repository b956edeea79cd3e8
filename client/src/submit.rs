use fhescore_crypto::{CiphertextService, CryptoError};
use fhescore_types::{ActivityKind, EncryptedInput, FheType, Handle, Identity};
use tracing::debug;

use crate::errors::{ClientError, Operation, Result};

/// Width used for activity increments unless the caller picks another.
pub const DEFAULT_INCREMENT_WIDTH: FheType = FheType::Uint32;

/// An encrypted activity increment, bound to one contract and one user.
#[derive(Debug, Clone)]
pub struct ActivitySubmission {
    pub kind: ActivityKind,
    pub width: FheType,
    pub input: EncryptedInput,
}

impl ActivitySubmission {
    pub fn handle(&self) -> Result<Handle> {
        self.input.first_handle().ok_or_else(|| {
            ClientError::Crypto(CryptoError::InvalidInput("empty input bundle".to_string()))
        })
    }

    pub fn proof(&self) -> &[u8] {
        &self.input.input_proof
    }
}

/// Encrypt `value` as a `width`-bit integer for `user` on `contract`.
pub async fn encrypt_activity(
    service: &dyn CiphertextService,
    contract: Identity,
    user: Identity,
    kind: ActivityKind,
    value: u64,
    width: FheType,
) -> Result<ActivitySubmission> {
    let input = service
        .encrypt_input(value, width, contract, user)
        .await
        .map_err(|e| ClientError::from_crypto(e, Operation::Encrypt))?;

    let submission = ActivitySubmission { kind, width, input };
    debug!(%user, %kind, %width, handle = %submission.handle()?, "activity encrypted");
    Ok(submission)
}

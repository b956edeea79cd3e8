use std::collections::HashMap;

use fhescore_crypto::{
    CiphertextService, DecryptRequest, Eip712Domain, EphemeralKeypair, ReencryptMessage,
};
use fhescore_types::{ClearValue, Handle, Identity};
use tracing::debug;

use crate::errors::{ClientError, Operation, Result};
use crate::wallet::SigningIdentity;

/// Decrypt `handles` for the signer.
///
/// A fresh ephemeral keypair is generated per call. The signer authorizes its
/// public key under the EIP-712 domain of `contract`; the service re-encrypts
/// each value to that key, and the keypair is consumed opening them.
pub async fn user_decrypt(
    service: &dyn CiphertextService,
    signer: &dyn SigningIdentity,
    contract: Identity,
    handles: &[Handle],
) -> Result<HashMap<Handle, ClearValue>> {
    let keypair = EphemeralKeypair::generate();
    let public_key = keypair.public_key();

    let domain = Eip712Domain::authorization(signer.chain_id(), contract);
    let signature = signer
        .sign_typed_data(&domain, &ReencryptMessage { public_key })
        .await?;

    let requests: Vec<DecryptRequest> = handles
        .iter()
        .map(|handle| DecryptRequest {
            handle: *handle,
            contract,
        })
        .collect();

    let sealed = service
        .user_decrypt(&requests, public_key, &signature, &domain, signer.address())
        .await
        .map_err(|e| ClientError::from_crypto(e, Operation::Decrypt))?;

    let clear = keypair
        .open(&sealed)
        .map_err(|e| ClientError::from_crypto(e, Operation::Decrypt))?;

    if let Some(missing) = handles.iter().find(|h| !clear.contains_key(h)) {
        return Err(ClientError::MissingPlaintext(*missing));
    }

    debug!(user = %signer.address(), count = handles.len(), "handles decrypted");
    Ok(clear)
}

/// Decrypt a single handle.
pub async fn user_decrypt_one(
    service: &dyn CiphertextService,
    signer: &dyn SigningIdentity,
    contract: Identity,
    handle: Handle,
) -> Result<ClearValue> {
    let clear = user_decrypt(service, signer, contract, &[handle]).await?;
    clear
        .get(&handle)
        .copied()
        .ok_or(ClientError::MissingPlaintext(handle))
}

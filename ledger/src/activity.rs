use fhescore_crypto::CryptoError;
use fhescore_types::{ActivityKind, Handle, Identity};
use tracing::{info, warn};

use crate::account::ActivityHandles;
use crate::errors::{LedgerError, Result};
use crate::events::{LedgerEvent, LedgerEventKind};
use crate::ScoreLedger;

impl ScoreLedger {
    /// Add an encrypted increment to `caller`'s counter for `kind`.
    ///
    /// `kind` is the wire code (`0..=4`). Counters only grow; corrections are
    /// recorded as further activity of the opposing kind.
    pub async fn record_activity(
        &self,
        caller: Identity,
        kind: u8,
        encrypted_increment: Handle,
        input_proof: &[u8],
    ) -> Result<LedgerEvent> {
        let mut state = self.state.lock().await;
        let counter = state.registered(caller)?.counters;

        let kind = ActivityKind::try_from(kind).map_err(|code| {
            warn!(identity = %caller, kind = code, "rejected unknown activity kind");
            LedgerError::InvalidActivityKind {
                identity: caller,
                kind: code,
            }
        })?;

        let increment = self
            .service
            .verify_input(encrypted_increment, input_proof, self.config.contract, caller)
            .await
            .map_err(|e| match e {
                CryptoError::InvalidProof { handle, .. } => {
                    warn!(identity = %caller, %kind, %handle, "rejected activity input proof");
                    LedgerError::InvalidProof {
                        identity: caller,
                        kind,
                        handle,
                    }
                }
                other => other.into(),
            })?;

        let updated = self.service.add(counter.get(kind), increment).await?;
        self.grant(updated, caller).await?;

        state.registered_mut(caller)?.counters.set(kind, updated);
        let event = state
            .events
            .emit(caller, LedgerEventKind::ActivitySubmitted { kind });

        info!(identity = %caller, %kind, "activity submitted");
        Ok(event)
    }

    /// The five counter handles of `identity`. Only the owner may read them.
    pub async fn get_activities(&self, caller: Identity, identity: Identity) -> Result<ActivityHandles> {
        if caller != identity {
            return Err(LedgerError::Unauthorized { caller, identity });
        }

        let state = self.state.lock().await;
        Ok(state.registered(identity)?.counters)
    }
}

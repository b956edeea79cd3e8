use fhescore_types::{ActivityKind, FheType, Handle, Identity, ACTIVITY_KIND_COUNT};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{LedgerError, Result};
use crate::events::{LedgerEvent, LedgerEventKind};
use crate::{LedgerState, ScoreLedger};

/// Lifecycle of an identity. `Scored` is sticky.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountState {
    Unregistered,
    Registered,
    Scored,
}

/// Encrypted counters in [`ActivityKind`] order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityHandles(pub [Handle; ACTIVITY_KIND_COUNT]);

impl ActivityHandles {
    pub fn get(&self, kind: ActivityKind) -> Handle {
        self.0[kind.index()]
    }

    pub(crate) fn set(&mut self, kind: ActivityKind, handle: Handle) {
        self.0[kind.index()] = handle;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActivityKind, Handle)> + '_ {
        ActivityKind::ALL.iter().map(move |kind| (*kind, self.get(*kind)))
    }
}

/// Per-identity persisted record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub registered: bool,
    pub score_computed: bool,
    pub counters: ActivityHandles,
    pub score: Handle,
}

impl AccountRecord {
    pub fn state(&self) -> AccountState {
        match (self.registered, self.score_computed) {
            (false, _) => AccountState::Unregistered,
            (true, false) => AccountState::Registered,
            (true, true) => AccountState::Scored,
        }
    }
}

impl LedgerState {
    pub(crate) fn registered(&self, identity: Identity) -> Result<&AccountRecord> {
        self.accounts
            .get(&identity)
            .filter(|record| record.registered)
            .ok_or(LedgerError::NotRegistered { identity })
    }

    pub(crate) fn registered_mut(&mut self, identity: Identity) -> Result<&mut AccountRecord> {
        self.accounts
            .get_mut(&identity)
            .filter(|record| record.registered)
            .ok_or(LedgerError::NotRegistered { identity })
    }
}

impl ScoreLedger {
    /// Open an account for `caller` with every counter and the score set to an
    /// encryption of zero.
    pub async fn register(&self, caller: Identity) -> Result<LedgerEvent> {
        let mut state = self.state.lock().await;
        if state.accounts.get(&caller).is_some_and(|r| r.registered) {
            return Err(LedgerError::AlreadyRegistered { identity: caller });
        }

        let mut counters = Vec::with_capacity(ACTIVITY_KIND_COUNT);
        for _ in ActivityKind::ALL {
            let zero = self.service.trivial_encrypt(0, FheType::Uint64).await?;
            self.grant(zero, caller).await?;
            counters.push(zero);
        }
        let score = self.service.trivial_encrypt(0, FheType::Int64).await?;
        self.grant(score, caller).await?;

        let mut handles = [score; ACTIVITY_KIND_COUNT];
        handles.copy_from_slice(&counters);

        state.accounts.insert(
            caller,
            AccountRecord {
                registered: true,
                score_computed: false,
                counters: ActivityHandles(handles),
                score,
            },
        );
        let event = state.events.emit(caller, LedgerEventKind::Registered);

        info!(identity = %caller, "user registered");
        Ok(event)
    }

    pub async fn is_registered(&self, identity: Identity) -> bool {
        self.state.lock().await.registered(identity).is_ok()
    }

    pub async fn has_calculated_score(&self, identity: Identity) -> bool {
        self.state
            .lock()
            .await
            .registered(identity)
            .map(|record| record.score_computed)
            .unwrap_or(false)
    }

    pub async fn account_state(&self, identity: Identity) -> AccountState {
        self.state
            .lock()
            .await
            .accounts
            .get(&identity)
            .map(AccountRecord::state)
            .unwrap_or(AccountState::Unregistered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decrypt, setup};
    use fhescore_crypto::EthKeyPair;
    use fhescore_types::ClearValue;

    #[tokio::test]
    async fn test_register_initializes_zeroed_account() {
        let (service, ledger) = setup().await;
        let wallet = EthKeyPair::random();
        let user = wallet.identity();

        assert_eq!(ledger.account_state(user).await, AccountState::Unregistered);

        let event = ledger.register(user).await.unwrap();
        assert_eq!(event.kind, LedgerEventKind::Registered);
        assert_eq!(event.identity, user);

        assert!(ledger.is_registered(user).await);
        assert!(!ledger.has_calculated_score(user).await);
        assert_eq!(ledger.account_state(user).await, AccountState::Registered);

        let counters = ledger.get_activities(user, user).await.unwrap();
        for (_, handle) in counters.iter() {
            assert_eq!(decrypt(&service, &wallet, handle).await, ClearValue::Uint(0));
        }
        let score = ledger.get_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, score).await, ClearValue::Int(0));
    }

    #[tokio::test]
    async fn test_double_registration_rejected() {
        let (_service, ledger) = setup().await;
        let user = EthKeyPair::random().identity();

        ledger.register(user).await.unwrap();
        let before = ledger.get_activities(user, user).await.unwrap();

        let err = ledger.register(user).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyRegistered { identity } if identity == user));
        assert_eq!(err.kind(), fhescore_types::ErrorKind::AlreadyRegistered);

        let after = ledger.get_activities(user, user).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(ledger.events_for(user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_registration_leaves_no_account() {
        let (service, ledger) = setup().await;
        let user = EthKeyPair::random().identity();

        service.set_online(false);
        let err = ledger.register(user).await.unwrap_err();
        assert_eq!(err.kind(), fhescore_types::ErrorKind::BackendUnavailable);

        service.set_online(true);
        assert!(!ledger.is_registered(user).await);
        assert!(ledger.register(user).await.is_ok());
    }

    #[test]
    fn test_record_state_mapping() {
        let handle = Handle::new([0u8; 32]);
        let mut record = AccountRecord {
            registered: true,
            score_computed: false,
            counters: ActivityHandles([handle; ACTIVITY_KIND_COUNT]),
            score: handle,
        };
        assert_eq!(record.state(), AccountState::Registered);

        record.score_computed = true;
        assert_eq!(record.state(), AccountState::Scored);
    }
}

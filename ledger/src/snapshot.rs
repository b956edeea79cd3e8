//! Export and import of the persisted ledger layout.
//!
//! One record per identity: registered flag, score-computed flag, the five
//! counter handles in activity order, and the score handle.

use std::collections::HashMap;
use std::sync::Arc;

use fhescore_crypto::CiphertextService;
use fhescore_types::{Handle, Identity};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::account::{AccountRecord, ActivityHandles};
use crate::config::EngineConfig;
use crate::errors::{LedgerError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::{LedgerState, ScoreLedger};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub identity: Identity,
    pub registered: bool,
    pub score_computed: bool,
    pub counters: ActivityHandles,
    pub score: Handle,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub contract: Identity,
    pub chain_id: u64,
    pub verification_threshold: Handle,
    pub accounts: Vec<AccountSnapshot>,
    pub events: Vec<LedgerEvent>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::InvalidSnapshot(e.to_string()))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LedgerError::InvalidSnapshot(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::InvalidSnapshot(e.to_string()))
    }
}

impl ScoreLedger {
    pub async fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock().await;

        let mut accounts: Vec<AccountSnapshot> = state
            .accounts
            .iter()
            .map(|(identity, record)| AccountSnapshot {
                identity: *identity,
                registered: record.registered,
                score_computed: record.score_computed,
                counters: record.counters,
                score: record.score,
            })
            .collect();
        accounts.sort_by_key(|account| account.identity);

        LedgerSnapshot {
            contract: self.config.contract,
            chain_id: self.config.chain_id,
            verification_threshold: self.verification_threshold_handle(),
            accounts,
            events: state.events.all().to_vec(),
        }
    }

    /// Rebuild a ledger from `snapshot`. Every ciphertext it references must
    /// still be held by `service` and usable by the contract.
    pub async fn restore(
        config: EngineConfig,
        service: Arc<dyn CiphertextService>,
        snapshot: LedgerSnapshot,
    ) -> Result<Self> {
        if snapshot.contract != config.contract || snapshot.chain_id != config.chain_id {
            return Err(LedgerError::InvalidSnapshot(format!(
                "snapshot belongs to {} on chain {}",
                snapshot.contract, snapshot.chain_id
            )));
        }

        ensure_usable(service.as_ref(), snapshot.verification_threshold, config.contract).await?;

        let mut accounts = HashMap::with_capacity(snapshot.accounts.len());
        for account in snapshot.accounts {
            if !account.registered {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "record for unregistered {}",
                    account.identity
                )));
            }

            for handle in account.counters.0.iter().chain([&account.score]) {
                ensure_usable(service.as_ref(), *handle, config.contract).await?;
            }

            let record = AccountRecord {
                registered: account.registered,
                score_computed: account.score_computed,
                counters: account.counters,
                score: account.score,
            };
            if accounts.insert(account.identity, record).is_some() {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "duplicate record for {}",
                    account.identity
                )));
            }
        }

        info!(
            contract = %config.contract,
            accounts = accounts.len(),
            "score ledger restored"
        );

        let state = LedgerState {
            accounts,
            events: EventLog::from_events(snapshot.events),
        };
        Ok(Self::from_parts(
            config,
            service,
            snapshot.verification_threshold,
            state,
        ))
    }
}

async fn ensure_usable(service: &dyn CiphertextService, handle: Handle, contract: Identity) -> Result<()> {
    if service.is_allowed(handle, contract).await? {
        Ok(())
    } else {
        Err(LedgerError::InvalidSnapshot(format!(
            "{} is not held for {}",
            handle, contract
        )))
    }
}

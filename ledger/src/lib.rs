//! Confidential scoring ledger.
//!
//! Holds, per identity, an account record with five encrypted activity
//! counters and one encrypted score. All state is reached through named
//! operations on [`ScoreLedger`], serialized behind a single lock; the ledger
//! never sees a plaintext value, only ciphertext handles issued by the
//! [`CiphertextService`].

pub mod account;
pub mod activity;
pub mod config;
pub mod errors;
pub mod events;
pub mod scoring;
pub mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;

use fhescore_crypto::CiphertextService;
use fhescore_types::{FheType, Handle, Identity};
use tokio::sync::Mutex;
use tracing::info;

pub use account::{AccountRecord, AccountState, ActivityHandles};
pub use config::{EngineConfig, Weights, DEFAULT_VERIFICATION_THRESHOLD};
pub use errors::{LedgerError, Result};
pub use events::{EventLog, LedgerEvent, LedgerEventKind};
pub use snapshot::{AccountSnapshot, LedgerSnapshot};

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) accounts: HashMap<Identity, AccountRecord>,
    pub(crate) events: EventLog,
}

pub struct ScoreLedger {
    config: EngineConfig,
    service: Arc<dyn CiphertextService>,
    threshold: Handle,
    state: Mutex<LedgerState>,
}

impl ScoreLedger {
    /// Create an empty ledger, encrypting the verification threshold once.
    pub async fn deploy(config: EngineConfig, service: Arc<dyn CiphertextService>) -> Result<Self> {
        let threshold = service
            .trivial_encrypt(config.verification_threshold, FheType::Int64)
            .await?;
        service.allow(threshold, config.contract).await?;

        info!(
            contract = %config.contract,
            chain_id = config.chain_id,
            "score ledger deployed"
        );

        Ok(Self::from_parts(config, service, threshold, LedgerState::default()))
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        service: Arc<dyn CiphertextService>,
        threshold: Handle,
        state: LedgerState,
    ) -> Self {
        Self {
            config,
            service,
            threshold,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn contract_address(&self) -> Identity {
        self.config.contract
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn weights(&self) -> Weights {
        self.config.weights
    }

    pub fn verification_threshold_handle(&self) -> Handle {
        self.threshold
    }

    pub fn service(&self) -> &Arc<dyn CiphertextService> {
        &self.service
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.state.lock().await.events.all().to_vec()
    }

    pub async fn events_for(&self, identity: Identity) -> Vec<LedgerEvent> {
        self.state.lock().await.events.for_identity(identity)
    }

    /// Let `owner` (and this contract) decrypt or reuse `handle`.
    async fn grant(&self, handle: Handle, owner: Identity) -> Result<()> {
        self.service.allow(handle, self.config.contract).await?;
        self.service.allow(handle, owner).await?;
        Ok(())
    }
}

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use fhescore_crypto::CiphertextService;
use fhescore_ledger::{AccountState, LedgerError, LedgerEvent, ScoreLedger};
use fhescore_types::{ActivityKind, ClearValue, FheType, Handle, Identity, ACTIVITY_KIND_COUNT};
use tracing::{info, warn};

use crate::config::{network_for_chain, ClientConfig, NetworkConfig};
use crate::decrypt::user_decrypt;
use crate::errors::{ClientError, Operation, Result};
use crate::presentation::ActivitySummary;
use crate::retry::retry_idempotent;
use crate::submit::{encrypt_activity, DEFAULT_INCREMENT_WIDTH};
use crate::wallet::SigningIdentity;

/// One signer's session against a deployed score ledger.
///
/// Every call into the ledger or the ciphertext service is bounded by
/// `config.request_timeout`. Encryption and decryption are retried according
/// to `config.retry`; registration, submission and scoring never are.
pub struct ScoreClient<W> {
    ledger: Arc<ScoreLedger>,
    wallet: W,
    network: &'static NetworkConfig,
    config: ClientConfig,
}

impl<W: SigningIdentity> ScoreClient<W> {
    pub fn connect(ledger: Arc<ScoreLedger>, wallet: W, config: ClientConfig) -> Result<Self> {
        let chain_id = wallet.chain_id();
        let network =
            network_for_chain(chain_id).ok_or(ClientError::UnsupportedNetwork { chain_id })?;
        if chain_id != ledger.chain_id() {
            return Err(ClientError::ChainMismatch {
                wallet: chain_id,
                ledger: ledger.chain_id(),
            });
        }

        info!(identity = %wallet.address(), network = network.name, "client connected");
        Ok(Self {
            ledger,
            wallet,
            network,
            config,
        })
    }

    pub fn identity(&self) -> Identity {
        self.wallet.address()
    }

    pub fn network(&self) -> &'static NetworkConfig {
        self.network
    }

    pub fn ledger(&self) -> &Arc<ScoreLedger> {
        &self.ledger
    }

    fn service(&self) -> &dyn CiphertextService {
        self.ledger.service().as_ref()
    }

    async fn bounded<T>(&self, operation: Operation, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%operation, timeout = ?self.config.request_timeout, "request timed out");
                Err(ClientError::BackendUnavailable { operation })
            }
        }
    }

    async fn ledger_call<T>(
        &self,
        operation: Operation,
        call: impl Future<Output = std::result::Result<T, LedgerError>>,
    ) -> Result<T> {
        self.bounded(operation, async move {
            call.await.map_err(|e| ClientError::from_ledger(e, operation))
        })
        .await
    }

    async fn decrypt_handles(&self, handles: &[Handle]) -> Result<HashMap<Handle, ClearValue>> {
        let contract = self.ledger.contract_address();
        retry_idempotent(&self.config.retry, Operation::Decrypt, move || {
            self.bounded(
                Operation::Decrypt,
                user_decrypt(self.service(), &self.wallet, contract, handles),
            )
        })
        .await
    }

    pub async fn register(&self) -> Result<LedgerEvent> {
        self.ledger_call(Operation::Register, self.ledger.register(self.identity()))
            .await
    }

    pub async fn account_state(&self) -> Result<AccountState> {
        self.bounded(Operation::Read, async {
            Ok(self.ledger.account_state(self.identity()).await)
        })
        .await
    }

    /// Encrypt `value` and add it to this identity's counter for `kind`.
    pub async fn submit_activity(&self, kind: ActivityKind, value: u64) -> Result<LedgerEvent> {
        self.submit_activity_with_width(kind, value, DEFAULT_INCREMENT_WIDTH)
            .await
    }

    pub async fn submit_activity_with_width(
        &self,
        kind: ActivityKind,
        value: u64,
        width: FheType,
    ) -> Result<LedgerEvent> {
        let contract = self.ledger.contract_address();
        let identity = self.identity();

        let submission = retry_idempotent(&self.config.retry, Operation::Encrypt, move || {
            self.bounded(
                Operation::Encrypt,
                encrypt_activity(self.service(), contract, identity, kind, value, width),
            )
        })
        .await?;
        let handle = submission.handle()?;

        self.ledger_call(
            Operation::SubmitActivity,
            self.ledger
                .record_activity(identity, kind.code(), handle, submission.proof()),
        )
        .await
    }

    pub async fn calculate_score(&self) -> Result<LedgerEvent> {
        self.ledger_call(Operation::CalculateScore, self.ledger.compute_score(self.identity()))
            .await
    }

    pub async fn score_handle(&self) -> Result<Handle> {
        let identity = self.identity();
        self.ledger_call(Operation::Read, self.ledger.get_score(identity, identity))
            .await
    }

    /// Decrypt this identity's stored score. Negative values come back as-is.
    pub async fn decrypt_score(&self) -> Result<i64> {
        let handle = self.score_handle().await?;
        let clear = self.decrypt_handles(&[handle]).await?;
        clear
            .get(&handle)
            .and_then(ClearValue::as_i64)
            .ok_or(ClientError::UnexpectedType(handle))
    }

    pub async fn decrypt_activities(&self) -> Result<ActivitySummary> {
        let identity = self.identity();
        let counters = self
            .ledger_call(Operation::Read, self.ledger.get_activities(identity, identity))
            .await?;

        let clear = self.decrypt_handles(&counters.0).await?;
        let mut counts = [0u64; ACTIVITY_KIND_COUNT];
        for (kind, handle) in counters.iter() {
            counts[kind.index()] = clear
                .get(&handle)
                .and_then(ClearValue::as_u64)
                .ok_or(ClientError::UnexpectedType(handle))?;
        }
        Ok(ActivitySummary::from_counts(counts))
    }

    /// Ask whether `subject`'s score meets the ledger threshold. The returned
    /// encrypted boolean is decryptable by this identity only.
    pub async fn verify_score(&self, subject: Identity) -> Result<Handle> {
        self.ledger_call(Operation::Verify, self.ledger.verify_score(self.identity(), subject))
            .await
    }

    pub async fn decrypt_verification(&self, result: Handle) -> Result<bool> {
        let clear = self.decrypt_handles(&[result]).await?;
        clear
            .get(&result)
            .and_then(ClearValue::as_bool)
            .ok_or(ClientError::UnexpectedType(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::LocalWallet;
    use fhescore_crypto::LocalCoprocessor;
    use fhescore_ledger::EngineConfig;
    use fhescore_types::ErrorKind;

    const CHAIN: u64 = 31337;

    async fn deploy() -> (Arc<LocalCoprocessor>, Arc<ScoreLedger>) {
        let service = Arc::new(LocalCoprocessor::new(CHAIN));
        let config = EngineConfig::new(Identity::new([0xcc; 20]), CHAIN);
        let ledger = ScoreLedger::deploy(config, service.clone()).await.unwrap();
        (service, Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_unsupported_chain_refused() {
        let (_, ledger) = deploy().await;
        let err = ScoreClient::connect(ledger, LocalWallet::random(1), ClientConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::UnsupportedNetwork { chain_id: 1 }));
        assert_eq!(err.kind(), ErrorKind::UnsupportedNetwork);
    }

    #[tokio::test]
    async fn test_wallet_on_other_supported_chain_refused() {
        let (_, ledger) = deploy().await;
        let err = ScoreClient::connect(ledger, LocalWallet::random(8009), ClientConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ClientError::ChainMismatch {
                wallet: 8009,
                ledger: CHAIN
            }
        ));
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let (_, ledger) = deploy().await;
        let client =
            ScoreClient::connect(ledger, LocalWallet::random(CHAIN), ClientConfig::default()).unwrap();
        assert_eq!(client.network().name, "Localhost");

        client.register().await.unwrap();
        client.submit_activity(ActivityKind::Repayment, 2).await.unwrap();
        client.submit_activity(ActivityKind::Staking, 3).await.unwrap();
        client.calculate_score().await.unwrap();

        assert_eq!(client.decrypt_score().await.unwrap(), 350);
        assert_eq!(client.account_state().await.unwrap(), AccountState::Scored);

        let summary = client.decrypt_activities().await.unwrap();
        assert_eq!(summary.repayment, 2);
        assert_eq!(summary.staking, 3);
        assert_eq!(summary.default, 0);
    }

    #[tokio::test]
    async fn test_outage_on_mutation_is_not_retry_safe() {
        let (service, ledger) = deploy().await;
        let client =
            ScoreClient::connect(ledger, LocalWallet::random(CHAIN), ClientConfig::default()).unwrap();
        client.register().await.unwrap();

        service.set_online(false);
        let err = client.calculate_score().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(!err.is_retry_safe());

        let err = client.decrypt_score().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(err.is_retry_safe());

        service.set_online(true);
        assert!(!client.ledger().has_calculated_score(client.identity()).await);
    }
}

use fhescore_types::{FheType, Handle, Identity};
use tracing::{debug, info};

use crate::errors::{LedgerError, Result};
use crate::events::{LedgerEvent, LedgerEventKind};
use crate::ScoreLedger;

impl ScoreLedger {
    /// Recompute `caller`'s encrypted score from a snapshot of their counters:
    ///
    /// `repayment*100 - default*200 + staking*50 + governance*30 + trading*20`
    ///
    /// The sum is kept signed and is not clamped, so defaults can drive the
    /// stored score below zero.
    pub async fn compute_score(&self, caller: Identity) -> Result<LedgerEvent> {
        let mut state = self.state.lock().await;
        let counters = state.registered(caller)?.counters;

        let mut score: Option<Handle> = None;
        for (kind, counter) in counters.iter() {
            let signed = self.service.cast(counter, FheType::Int64).await?;
            let term = self
                .service
                .mul_scalar(signed, self.config.weights.weight(kind))
                .await?;
            score = Some(match score {
                Some(acc) => self.service.add(acc, term).await?,
                None => term,
            });
        }
        let score = match score {
            Some(score) => score,
            None => self.service.trivial_encrypt(0, FheType::Int64).await?,
        };
        self.grant(score, caller).await?;

        let record = state.registered_mut(caller)?;
        record.score = score;
        record.score_computed = true;
        let event = state.events.emit(caller, LedgerEventKind::ScoreCalculated);

        info!(identity = %caller, "score calculated");
        Ok(event)
    }

    /// The encrypted score handle of `identity`. Only the owner may read it.
    pub async fn get_score(&self, caller: Identity, identity: Identity) -> Result<Handle> {
        if caller != identity {
            return Err(LedgerError::Unauthorized { caller, identity });
        }

        let state = self.state.lock().await;
        Ok(state.registered(identity)?.score)
    }

    /// Encrypted `score(identity) >= threshold`, decryptable by `caller`.
    ///
    /// Any caller may ask; the answer is produced fresh for each request and
    /// is not stored against the account.
    pub async fn verify_score(&self, caller: Identity, identity: Identity) -> Result<Handle> {
        let state = self.state.lock().await;
        let record = state.registered(identity)?;
        if !record.score_computed {
            return Err(LedgerError::ScoreNotCalculated { identity });
        }

        let result = self.service.ge(record.score, self.threshold).await?;
        self.grant(result, caller).await?;

        debug!(%caller, %identity, %result, "score verification requested");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountState;
    use crate::testing::{decrypt, setup, submit};
    use fhescore_types::ActivityKind;
    use fhescore_crypto::EthKeyPair;
    use fhescore_types::{ClearValue, ErrorKind};

    async fn seed_reference_profile(
        service: &fhescore_crypto::LocalCoprocessor,
        ledger: &ScoreLedger,
        user: Identity,
    ) {
        submit(service, ledger, user, ActivityKind::Repayment, 2).await;
        submit(service, ledger, user, ActivityKind::Staking, 4).await;
        submit(service, ledger, user, ActivityKind::GovernanceVote, 1).await;
        submit(service, ledger, user, ActivityKind::TradingVolume, 5).await;
    }

    #[tokio::test]
    async fn test_reference_score() {
        let (service, ledger) = setup().await;
        let wallet = EthKeyPair::random();
        let user = wallet.identity();
        ledger.register(user).await.unwrap();
        seed_reference_profile(&service, &ledger, user).await;

        ledger.compute_score(user).await.unwrap();
        let score = ledger.get_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, score).await, ClearValue::Int(530));
    }

    #[tokio::test]
    async fn test_zero_counters_score_zero_and_flag_sticks() {
        let (service, ledger) = setup().await;
        let wallet = EthKeyPair::random();
        let user = wallet.identity();
        ledger.register(user).await.unwrap();

        let event = ledger.compute_score(user).await.unwrap();
        assert_eq!(event.kind, LedgerEventKind::ScoreCalculated);
        assert!(ledger.has_calculated_score(user).await);

        let score = ledger.get_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, score).await, ClearValue::Int(0));

        submit(&service, &ledger, user, ActivityKind::Repayment, 1).await;
        ledger.compute_score(user).await.unwrap();
        assert!(ledger.has_calculated_score(user).await);
        assert_eq!(ledger.account_state(user).await, AccountState::Scored);
    }

    #[tokio::test]
    async fn test_score_can_go_negative() {
        let (service, ledger) = setup().await;
        let wallet = EthKeyPair::random();
        let user = wallet.identity();
        ledger.register(user).await.unwrap();

        submit(&service, &ledger, user, ActivityKind::Repayment, 1).await;
        submit(&service, &ledger, user, ActivityKind::Default, 2).await;
        ledger.compute_score(user).await.unwrap();

        let score = ledger.get_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, score).await, ClearValue::Int(-300));

        let verdict = ledger.verify_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, verdict).await, ClearValue::Bool(false));
    }

    #[tokio::test]
    async fn test_recompute_reflects_new_activity() {
        let (service, ledger) = setup().await;
        let wallet = EthKeyPair::random();
        let user = wallet.identity();
        ledger.register(user).await.unwrap();
        seed_reference_profile(&service, &ledger, user).await;
        ledger.compute_score(user).await.unwrap();

        let verdict = ledger.verify_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, verdict).await, ClearValue::Bool(false));

        submit(&service, &ledger, user, ActivityKind::Repayment, 2).await;

        // Not reflected until the next computation.
        let stale = ledger.verify_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, stale).await, ClearValue::Bool(false));

        ledger.compute_score(user).await.unwrap();
        let score = ledger.get_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, score).await, ClearValue::Int(730));

        let verdict = ledger.verify_score(user, user).await.unwrap();
        assert_eq!(decrypt(&service, &wallet, verdict).await, ClearValue::Bool(true));
    }

    #[tokio::test]
    async fn test_verify_requires_computed_score() {
        let (_service, ledger) = setup().await;
        let user = EthKeyPair::random().identity();
        let verifier = EthKeyPair::random().identity();

        let err = ledger.verify_score(verifier, user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotRegistered);

        ledger.register(user).await.unwrap();
        let err = ledger.verify_score(verifier, user).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScoreNotCalculated);
    }

    #[tokio::test]
    async fn test_third_party_verification() {
        let (service, ledger) = setup().await;
        let owner = EthKeyPair::random();
        let lender = EthKeyPair::random();
        ledger.register(owner.identity()).await.unwrap();
        submit(&service, &ledger, owner.identity(), ActivityKind::Repayment, 8).await;
        ledger.compute_score(owner.identity()).await.unwrap();

        // The lender cannot read the score itself...
        let err = ledger
            .get_score(lender.identity(), owner.identity())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        // ...but can obtain and decrypt the threshold verdict.
        let verdict = ledger
            .verify_score(lender.identity(), owner.identity())
            .await
            .unwrap();
        assert_eq!(decrypt(&service, &lender, verdict).await, ClearValue::Bool(true));

        // Each request yields a fresh handle.
        let again = ledger
            .verify_score(lender.identity(), owner.identity())
            .await
            .unwrap();
        assert_ne!(verdict, again);
    }
}

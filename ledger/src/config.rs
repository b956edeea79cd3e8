use fhescore_types::activity::{
    DEFAULT_PENALTY, GOVERNANCE_WEIGHT, REPAY_WEIGHT, STAKING_WEIGHT, TRADING_WEIGHT,
};
use fhescore_types::{ActivityKind, Identity, ACTIVITY_KIND_COUNT};
use serde::{Deserialize, Serialize};

pub const DEFAULT_VERIFICATION_THRESHOLD: i64 = 700;

/// Signed per-unit weight of each activity kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Weights {
    pub repayment: i64,
    pub default: i64,
    pub staking: i64,
    pub governance_vote: i64,
    pub trading_volume: i64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            repayment: REPAY_WEIGHT,
            default: -DEFAULT_PENALTY,
            staking: STAKING_WEIGHT,
            governance_vote: GOVERNANCE_WEIGHT,
            trading_volume: TRADING_WEIGHT,
        }
    }
}

impl Weights {
    pub fn weight(&self, kind: ActivityKind) -> i64 {
        match kind {
            ActivityKind::Repayment => self.repayment,
            ActivityKind::Default => self.default,
            ActivityKind::Staking => self.staking,
            ActivityKind::GovernanceVote => self.governance_vote,
            ActivityKind::TradingVolume => self.trading_volume,
        }
    }

    /// Plaintext evaluation of the scoring formula, for previews on data the
    /// caller already holds in the clear.
    pub fn score_of(&self, counts: &[u64; ACTIVITY_KIND_COUNT]) -> i64 {
        ActivityKind::ALL
            .iter()
            .map(|kind| (counts[kind.index()] as i64).wrapping_mul(self.weight(*kind)))
            .fold(0i64, i64::wrapping_add)
    }
}

/// Process-wide engine parameters, fixed when the ledger is deployed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    pub contract: Identity,
    pub chain_id: u64,
    pub weights: Weights,
    pub verification_threshold: i64,
}

impl EngineConfig {
    pub fn new(contract: Identity, chain_id: u64) -> Self {
        Self {
            contract,
            chain_id,
            weights: Weights::default(),
            verification_threshold: DEFAULT_VERIFICATION_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.verification_threshold = threshold;
        self
    }
}

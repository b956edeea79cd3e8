use std::fmt;

use fhescore_ledger::Weights;
use fhescore_types::{ActivityKind, ACTIVITY_KIND_COUNT};
use serde::Serialize;

/// Rating band shown next to a decrypted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreRating {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 800 => ScoreRating::Excellent,
            s if s >= 700 => ScoreRating::Good,
            s if s >= 600 => ScoreRating::Fair,
            _ => ScoreRating::Poor,
        }
    }
}

impl fmt::Display for ScoreRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Score as shown to a user. Negative scores display as zero; the stored
/// ciphertext keeps its sign.
pub fn display_score(score: i64) -> u64 {
    score.max(0) as u64
}

/// Decrypted activity counters of one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    pub repayment: u64,
    pub default: u64,
    pub staking: u64,
    pub governance_vote: u64,
    pub trading_volume: u64,
}

impl ActivitySummary {
    pub fn from_counts(counts: [u64; ACTIVITY_KIND_COUNT]) -> Self {
        let [repayment, default, staking, governance_vote, trading_volume] = counts;
        Self {
            repayment,
            default,
            staking,
            governance_vote,
            trading_volume,
        }
    }

    pub fn get(&self, kind: ActivityKind) -> u64 {
        self.counts()[kind.index()]
    }

    pub fn counts(&self) -> [u64; ACTIVITY_KIND_COUNT] {
        [
            self.repayment,
            self.default,
            self.staking,
            self.governance_vote,
            self.trading_volume,
        ]
    }

    /// The score these counters would produce, computed in the clear.
    pub fn expected_score(&self, weights: &Weights) -> i64 {
        weights.score_of(&self.counts())
    }
}

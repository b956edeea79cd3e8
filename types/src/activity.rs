use core::fmt;

use serde::{Deserialize, Serialize};

pub const ACTIVITY_KIND_COUNT: usize = 5;

pub const REPAY_WEIGHT: i64 = 100;
pub const DEFAULT_PENALTY: i64 = 200;
pub const STAKING_WEIGHT: i64 = 50;
pub const GOVERNANCE_WEIGHT: i64 = 30;
pub const TRADING_WEIGHT: i64 = 20;

/// The closed set of financial activities a user can report.
///
/// The discriminant is the wire value accepted by the ledger (`0..=4`) and the
/// index of the matching counter in an account record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ActivityKind {
    Repayment = 0,
    Default = 1,
    Staking = 2,
    GovernanceVote = 3,
    TradingVolume = 4,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; ACTIVITY_KIND_COUNT] = [
        ActivityKind::Repayment,
        ActivityKind::Default,
        ActivityKind::Staking,
        ActivityKind::GovernanceVote,
        ActivityKind::TradingVolume,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityKind::Repayment => "Loan Repayment",
            ActivityKind::Default => "Loan Default",
            ActivityKind::Staking => "Staking Activity",
            ActivityKind::GovernanceVote => "Governance Participation",
            ActivityKind::TradingVolume => "Trading Volume",
        }
    }
}

impl TryFrom<u8> for ActivityKind {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ActivityKind::ALL
            .get(code as usize)
            .copied()
            .ok_or(code)
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Repayment => "repayment",
            ActivityKind::Default => "default",
            ActivityKind::Staking => "staking",
            ActivityKind::GovernanceVote => "governance_vote",
            ActivityKind::TradingVolume => "trading_volume",
        };
        f.write_str(name)
    }
}

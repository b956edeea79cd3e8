use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

pub type EthAddress = [u8; 20];

/// A 20-byte account address. Used as the key for all per-user state and as
/// the address of the scoring contract itself.
#[derive(Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(pub EthAddress);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; 20]);

    pub fn new(address: EthAddress) -> Self {
        Self(address)
    }

    pub fn as_bytes(&self) -> &EthAddress {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<EthAddress> for Identity {
    fn from(address: EthAddress) -> Self {
        Self::new(address)
    }
}

impl FromStr for Identity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() != 40 {
            return Err(format!("Expected 40 hex chars, got {}", s.len()));
        }

        let bytes = hex::decode(s).map_err(|e| format!("Invalid hex: {}", e))?;
        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes);
        Ok(Self(address))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

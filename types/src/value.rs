use core::fmt;

use serde::{Deserialize, Serialize};

/// Plaintext type carried by a ciphertext.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FheType {
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    /// Signed width used for aggregate scores, which may go below zero.
    Int64,
}

impl FheType {
    pub fn bits(self) -> u32 {
        match self {
            FheType::Bool => 1,
            FheType::Uint8 => 8,
            FheType::Uint16 => 16,
            FheType::Uint32 => 32,
            FheType::Uint64 | FheType::Int64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, FheType::Int64)
    }

    pub fn tag(self) -> u8 {
        match self {
            FheType::Bool => 0,
            FheType::Uint8 => 2,
            FheType::Uint16 => 3,
            FheType::Uint32 => 4,
            FheType::Uint64 => 5,
            FheType::Int64 => 133,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FheType::Bool),
            2 => Some(FheType::Uint8),
            3 => Some(FheType::Uint16),
            4 => Some(FheType::Uint32),
            5 => Some(FheType::Uint64),
            133 => Some(FheType::Int64),
            _ => None,
        }
    }

    /// Whether an unsigned plaintext fits this width without truncation.
    pub fn fits(self, value: u64) -> bool {
        match self {
            FheType::Bool => value <= 1,
            FheType::Int64 => value <= i64::MAX as u64,
            FheType::Uint64 => true,
            other => value < (1u64 << other.bits()),
        }
    }

    /// Reduce a wide intermediate into this type's range (two's complement
    /// wrap for the signed type, modular wrap for unsigned widths).
    pub fn wrap(self, value: i128) -> i128 {
        match self {
            FheType::Bool => (value != 0) as i128,
            FheType::Int64 => value as i64 as i128,
            FheType::Uint64 => value as u64 as i128,
            other => {
                let modulus = 1i128 << other.bits();
                value.rem_euclid(modulus)
            }
        }
    }
}

impl fmt::Display for FheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FheType::Bool => "ebool",
            FheType::Uint8 => "euint8",
            FheType::Uint16 => "euint16",
            FheType::Uint32 => "euint32",
            FheType::Uint64 => "euint64",
            FheType::Int64 => "eint64",
        };
        f.write_str(name)
    }
}

/// A decrypted value, only ever produced on the client side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClearValue {
    Bool(bool),
    Uint(u64),
    Int(i64),
}

impl ClearValue {
    pub fn from_wrapped(ty: FheType, value: i128) -> Self {
        match ty {
            FheType::Bool => ClearValue::Bool(value != 0),
            FheType::Int64 => ClearValue::Int(value as i64),
            _ => ClearValue::Uint(value as u64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClearValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ClearValue::Uint(v) => Some(*v),
            ClearValue::Int(v) => u64::try_from(*v).ok(),
            ClearValue::Bool(b) => Some(*b as u64),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClearValue::Int(v) => Some(*v),
            ClearValue::Uint(v) => i64::try_from(*v).ok(),
            ClearValue::Bool(b) => Some(*b as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_width() {
        assert!(FheType::Uint8.fits(255));
        assert!(!FheType::Uint8.fits(256));
        assert!(FheType::Uint32.fits(u32::MAX as u64));
        assert!(!FheType::Uint32.fits(u32::MAX as u64 + 1));
        assert!(FheType::Uint64.fits(u64::MAX));
        assert!(!FheType::Bool.fits(2));
    }

    #[test]
    fn test_wrap_semantics() {
        assert_eq!(FheType::Uint8.wrap(256), 0);
        assert_eq!(FheType::Uint8.wrap(-1), 255);
        assert_eq!(FheType::Int64.wrap(-170), -170);
        assert_eq!(FheType::Uint64.wrap(-1), u64::MAX as i128);
        assert_eq!(FheType::Bool.wrap(7), 1);
    }

    #[test]
    fn test_tag_roundtrip() {
        for ty in [
            FheType::Bool,
            FheType::Uint8,
            FheType::Uint16,
            FheType::Uint32,
            FheType::Uint64,
            FheType::Int64,
        ] {
            assert_eq!(FheType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(FheType::from_tag(1), None);
    }

    #[test]
    fn test_clear_value_accessors() {
        let negative = ClearValue::from_wrapped(FheType::Int64, -170);
        assert_eq!(negative.as_i64(), Some(-170));
        assert_eq!(negative.as_u64(), None);

        let flag = ClearValue::from_wrapped(FheType::Bool, 1);
        assert_eq!(flag.as_bool(), Some(true));
    }
}

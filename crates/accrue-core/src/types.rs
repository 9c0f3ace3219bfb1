//! Identifier and scalar types shared by every Accrue crate.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token quantity in the smallest unit of its ledger
pub type Amount = u128;

/// Seconds on the external monotonic clock
pub type Timestamp = u64;

/// Errors from parsing a hex identifier
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IdParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    Length(usize),
}

fn parse_bytes32(s: &str) -> Result<[u8; 32], IdParseError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    if bytes.len() != 32 {
        return Err(IdParseError::Length(bytes.len()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

macro_rules! id32 {
    ($(#[$meta:meta])* $name:ident, $short:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Zero identifier
            pub const ZERO: Self = Self([0u8; 32]);

            /// Wrap raw bytes
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Derive an identifier from a human-readable label with BLAKE3
            pub fn from_label(label: &str) -> Self {
                Self(*blake3::hash(label.as_bytes()).as_bytes())
            }

            /// Raw bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Full hex encoding
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from a 64 character hex string (optional `0x` prefix)
            pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
                parse_bytes32(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $short, &self.to_hex()[..12])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", &self.to_hex()[..12])
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(de::Error::custom)
            }
        }
    };
}

id32!(
    /// Account on a token ledger: a staker, a pool's custody account, a factory
    Address,
    "Address"
);

id32!(
    /// Identifies one fungible token on the ledger
    TokenId,
    "TokenId"
);

impl Address {
    /// Deterministic custody address for the pool a factory deploys for `token`
    pub fn derive_pool(factory: &Address, token: &TokenId) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"accrue/pool");
        hasher.update(factory.as_bytes());
        hasher.update(token.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }
}

//! Fixed-width byte strings rendered as base58 on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::LedgerError;

macro_rules! base58_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Width in bytes.
            pub const LEN: usize = $len;

            /// Wraps raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Decodes from base58, enforcing the width.
            pub fn from_base58(text: &str) -> Result<Self, LedgerError> {
                let invalid = || LedgerError::InvalidPubkey {
                    field: $label,
                    value: text.to_owned(),
                };
                let bytes = bs58::decode(text.trim()).into_vec().map_err(|_| invalid())?;
                Self::try_from(bytes.as_slice()).map_err(|_| invalid())
            }

            /// Encodes to base58.
            pub fn to_base58(&self) -> String {
                bs58::encode(&self.0).into_string()
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = LedgerError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let array: [u8; $len] = bytes.try_into().map_err(|_| {
                    LedgerError::Encoding(format!(
                        "{} must be {} bytes (got {})",
                        $label,
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(array))
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_base58(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_base58())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_base58())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_base58())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Self::from_base58(&text).map_err(serde::de::Error::custom)
            }
        }
    };
}

base58_bytes!(
    /// Ed25519 public key identifying an account or program.
    Pubkey,
    32,
    "account address"
);

base58_bytes!(
    /// Recent blockhash a transaction is bound to.
    Blockhash,
    32,
    "blockhash"
);

base58_bytes!(
    /// Ed25519 signature; the first one identifies the transaction.
    TxSignature,
    64,
    "transaction signature"
);

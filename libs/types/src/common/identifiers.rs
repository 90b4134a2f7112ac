//! # Typed Identifiers
//!
//! Byte-array newtypes for the identities the engine deals in:
//!
//! - [`Address`]: 20-byte account identity (engine, token holders, callbacks)
//! - [`PoolId`]: 32-byte content-derived pool identifier
//!
//! Wrapping the raw arrays keeps an owner address from being passed where a
//! pool id is expected, and gives every identifier the same hex `Display`,
//! parsing and serde behavior.
//!
//! ## Pool identifiers
//!
//! A `PoolId` is the Keccak-256 hash of the engine address followed by the
//! big-endian maturity, volatility and strike:
//!
//! ```rust
//! use rmm_types::{Address, PoolId};
//!
//! let engine = Address::from_low_u64(1);
//! let a = PoolId::derive(engine, 1_700_000_000, 10_000, 1_000);
//! let b = PoolId::derive(engine, 1_700_000_000, 10_000, 1_000);
//! let c = PoolId::derive(engine, 1_700_000_000, 10_000, 1_001);
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! ```

use sha3::{Digest, Keccak256};

/// Macro for generating typed wrappers around fixed-size byte arrays
///
/// Each wrapper gets `new`/`as_bytes`/`into_inner`, hex `Display`,
/// `from_hex` parsing (with or without `0x`), conversions to and from the
/// inner array, and serde that writes hex for JSON and bytes for bincode.
#[macro_export]
macro_rules! define_typed_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident, $len:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Width of the identifier in bytes
            pub const LEN: usize = $len;

            /// All-zero identifier
            pub const ZERO: Self = Self([0u8; $len]);

            #[inline(always)]
            pub const fn new(inner: [u8; $len]) -> Self {
                Self(inner)
            }

            #[inline(always)]
            pub const fn into_inner(self) -> [u8; $len] {
                self.0
            }

            #[inline(always)]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Parse from a hex string, optionally `0x`-prefixed
            pub fn from_hex(input: &str) -> Result<Self, $crate::ValidationError> {
                let digits = input.strip_prefix("0x").unwrap_or(input);
                let bytes = hex::decode(digits).map_err(|_| $crate::ValidationError::InvalidHex {
                    input: input.to_string(),
                })?;
                let array: [u8; $len] = bytes.as_slice().try_into().map_err(|_| {
                    $crate::ValidationError::InvalidLength {
                        expected: $len,
                        actual: bytes.len(),
                    }
                })?;
                Ok(Self(array))
            }

            /// Lowercase `0x`-prefixed hex
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "0x")?;
                for byte in &self.0 {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            #[inline(always)]
            fn from(inner: [u8; $len]) -> Self {
                Self(inner)
            }
        }

        impl From<$name> for [u8; $len] {
            #[inline(always)]
            fn from(wrapper: $name) -> [u8; $len] {
                wrapper.0
            }
        }

        impl AsRef<[u8]> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        // Hex strings for human-readable formats, raw bytes otherwise
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    serde::Serialize::serialize(&self.0, serializer)
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                if deserializer.is_human_readable() {
                    let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                    Self::from_hex(&text).map_err(serde::de::Error::custom)
                } else {
                    <[u8; $len] as serde::Deserialize>::deserialize(deserializer).map(Self)
                }
            }
        }
    };
}

define_typed_wrapper!(
    /// 20-byte account address
    Address,
    20
);

define_typed_wrapper!(
    /// 32-byte pool identifier derived from the engine and calibration
    PoolId,
    32
);

impl Address {
    /// Address whose trailing eight bytes hold `value` big-endian
    ///
    /// Handy for deterministic test and simulator accounts.
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Address derived from the Keccak-256 hash of a label
    pub fn from_label(label: &str) -> Self {
        let digest = Keccak256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Self(bytes)
    }
}

impl PoolId {
    /// Deterministic identifier for a calibration on a given engine
    pub fn derive(engine: Address, maturity: u64, sigma: u32, strike: u128) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(engine.0);
        hasher.update(maturity.to_be_bytes());
        hasher.update(sigma.to_be_bytes());
        hasher.update(strike.to_be_bytes());
        Self(hasher.finalize().into())
    }
}

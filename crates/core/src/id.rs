//! Strongly-typed identifiers and the engine key codec.
//!
//! External identifiers are UUIDs, i.e. 16 bytes in big-endian order. The
//! accounting engine keys its records by little-endian 128-bit integers. The
//! codec below only reverses the byte order; it never does arithmetic on the
//! value, so every 128-bit input round-trips exactly.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Native 128-bit key of the accounting engine.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineKey(u128);

impl EngineKey {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Decode the engine's wire form (16 little-endian bytes).
    pub const fn from_le_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_le_bytes(bytes))
    }

    /// Encode into the engine's wire form (16 little-endian bytes).
    pub const fn to_le_bytes(self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Decimal rendering, matching how the engine prints its keys.
impl core::fmt::Display for EngineKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Reverse a 16-byte array (big-endian <-> little-endian).
pub(crate) const fn swap_endian(mut bytes: [u8; 16]) -> [u8; 16] {
    let mut i = 0;
    while i < 8 {
        let tmp = bytes[i];
        bytes[i] = bytes[15 - i];
        bytes[15 - i] = tmp;
        i += 1;
    }
    bytes
}

/// Map a big-endian external identifier into the engine key space.
pub fn to_engine_key(external: Uuid) -> EngineKey {
    EngineKey::from_le_bytes(swap_endian(*external.as_bytes()))
}

/// Map an engine key back to its big-endian external identifier.
pub fn to_external_id(key: EngineKey) -> Uuid {
    Uuid::from_bytes(swap_endian(key.to_le_bytes()))
}

/// Identifier of a ledger account (the caller's user id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

/// Identifier of a transfer. Time-ordered, generated at submission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

macro_rules! impl_engine_keyed_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered), so keys generated later compare
            /// greater once converted into the engine key space.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn engine_key(&self) -> EngineKey {
                to_engine_key(self.0)
            }

            pub fn from_engine_key(key: EngineKey) -> Self {
                Self(to_external_id(key))
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{} '{}': {}", $name, s, e)))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_engine_keyed_id!(AccountId, "AccountId");
impl_engine_keyed_id!(TransferId, "TransferId");

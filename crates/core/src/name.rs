//! Display names packed into the engine's 128-bit auxiliary field.
//!
//! Packing left-justifies the UTF-8 bytes and zero-pads them to 16 bytes; the
//! buffer is then stored with the same byte-order convention as account ids.
//! Unpacking trims the trailing zero bytes again.

use crate::error::{DomainError, DomainResult};
use crate::id::swap_endian;

/// Maximum display name length, in UTF-8 bytes.
pub const NAME_CAPACITY: usize = 16;

/// A display name that is guaranteed to survive a pack/unpack round trip.
///
/// Names longer than [`NAME_CAPACITY`] bytes are rejected instead of truncated
/// (truncation could split a multi-byte character and silently rename the
/// account). NUL bytes are rejected because unpacking trims them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        if raw.len() > NAME_CAPACITY {
            return Err(DomainError::invalid_name(format!(
                "'{raw}' is {} bytes; at most {NAME_CAPACITY} bytes fit",
                raw.len()
            )));
        }
        if raw.contains('\0') {
            return Err(DomainError::invalid_name("name must not contain NUL bytes"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Left-justified, zero-padded bytes.
    pub fn pack(&self) -> [u8; NAME_CAPACITY] {
        let mut buf = [0u8; NAME_CAPACITY];
        buf[..self.0.len()].copy_from_slice(self.0.as_bytes());
        buf
    }

    /// The value stored in the account's `user_data_128`.
    pub fn to_engine_field(&self) -> u128 {
        u128::from_le_bytes(swap_endian(self.pack()))
    }

    /// Decode a `user_data_128` value written by [`DisplayName::to_engine_field`].
    pub fn decode_engine_field(field: u128) -> String {
        unpack(swap_endian(field.to_le_bytes()))
    }
}

impl core::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim trailing zero bytes and decode as UTF-8.
///
/// Fields written by other clients may hold arbitrary bytes; invalid sequences
/// are replaced rather than failing the whole query.
pub fn unpack(bytes: [u8; NAME_CAPACITY]) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

//! 16-byte read identifiers.
//!
//! A [`ReadId`] is the raw byte form of a read's UUID. It is compared
//! byte-for-byte and used only as a hash key; it has no ordering.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use sigidx_error::{Result, SigIdxError};
use uuid::Uuid;

/// Width of a read identifier in bytes.
pub const READ_ID_BYTES: usize = 16;

/// Opaque 16-byte read identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadId([u8; READ_ID_BYTES]);

impl ReadId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; READ_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build from a byte slice that must be exactly 16 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; READ_ID_BYTES] = bytes.try_into().map_err(|_| {
            SigIdxError::invalid_key(format!(
                "read id bytes must be length {READ_ID_BYTES}, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse a UUID string: 32 hex digits, hyphens anywhere are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let simple: String = text.chars().filter(|c| *c != '-').collect();
        if simple.len() != 32 {
            return Err(SigIdxError::invalid_key(format!(
                "read id string must be 32 hex digits, got {:?}",
                text
            )));
        }
        let uuid = Uuid::parse_str(&simple)
            .map_err(|err| SigIdxError::invalid_key(format!("{text:?}: {err}")))?;
        Ok(Self(uuid.into_bytes()))
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; READ_ID_BYTES] {
        &self.0
    }

    #[must_use]
    pub const fn into_bytes(self) -> [u8; READ_ID_BYTES] {
        self.0
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl From<[u8; READ_ID_BYTES]> for ReadId {
    fn from(bytes: [u8; READ_ID_BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<Uuid> for ReadId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.into_bytes())
    }
}

impl FromStr for ReadId {
    type Err = SigIdxError;

    fn from_str(text: &str) -> Result<Self> {
        Self::parse(text)
    }
}

impl fmt::Display for ReadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_uuid().hyphenated(), f)
    }
}

impl fmt::Debug for ReadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadId({self})")
    }
}

// Fixture files carry read ids in their canonical string form.
impl Serialize for ReadId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReadId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}

//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20 raw bytes. Their canonical textual form is 40 lowercase
//! hexadecimal characters, computed lazily and cached on first use.
//!
//! ## Storage
//!
//! Loose objects live at `objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, RAW_OBJECT_ID_LENGTH};
use crate::errors::{Error, Result};
use sha1::{Digest, Sha1};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

/// Git object identifier (SHA-1 hash)
///
/// Equality, hashing and ordering are defined on the raw bytes only.
#[derive(Clone, Default)]
pub struct ObjectId {
    bytes: [u8; RAW_OBJECT_ID_LENGTH],
    hex: OnceLock<String>,
}

impl ObjectId {
    pub fn from_bytes(bytes: [u8; RAW_OBJECT_ID_LENGTH]) -> Self {
        ObjectId {
            bytes,
            hex: OnceLock::new(),
        }
    }

    /// Build an object ID from a slice that must hold exactly 20 bytes
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; RAW_OBJECT_ID_LENGTH] = bytes.try_into().map_err(|_| {
            Error::corrupt(format!("invalid raw object ID length: {}", bytes.len()))
        })?;

        Ok(Self::from_bytes(bytes))
    }

    /// Parse and validate an object ID from its 40-character hex form
    pub fn try_parse(id: &str) -> Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(Error::corrupt(format!(
                "invalid object ID length: {}",
                id.len()
            )));
        }
        if !id.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::corrupt(format!("invalid object ID characters: {id}")));
        }

        let mut bytes = [0; RAW_OBJECT_ID_LENGTH];
        hex::decode_to_slice(id, &mut bytes)
            .map_err(|e| Error::corrupt(format!("invalid object ID {id}: {e}")))?;

        Ok(Self::from_bytes(bytes))
    }

    /// Finalize an incremental hash into an object ID
    pub fn from_hasher(hasher: Sha1) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0; RAW_OBJECT_ID_LENGTH];
        bytes.copy_from_slice(&digest);

        Self::from_bytes(bytes)
    }

    /// Hash a byte sequence with a fresh hasher
    pub fn hash_of(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        Self::from_hasher(hasher)
    }

    pub fn as_bytes(&self) -> &[u8; RAW_OBJECT_ID_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> &str {
        self.hex.get_or_init(|| hex::encode(self.bytes))
    }

    /// Write the object ID in binary format (20 bytes)
    pub fn write_raw_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.bytes)
    }

    /// Convert to file system path for loose object storage
    ///
    /// `abc123...` becomes `ab/c123...`
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.to_hex().split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First `len` hex characters of the id
    pub fn to_short(&self, len: usize) -> &str {
        let hex = self.to_hex();
        &hex[..len.min(hex.len())]
    }

    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> &str {
        self.to_short(7)
    }

    /// Case-insensitive hex prefix test
    pub fn starts_with_hex(&self, prefix: &str) -> bool {
        prefix.len() <= OBJECT_ID_LENGTH
            && self.to_hex().as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for ObjectId {}

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl PartialOrd for ObjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        self.to_hex()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

//! Tree entry file modes
//!
//! Modes are stored as ASCII octal in tree objects. Only the closed set
//! below is legal; anything else makes the tree corrupt.

use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileMode {
    /// No entry at all (one side of an insertion or deletion)
    #[default]
    Absent,
    Regular,
    Executable,
    Symlink,
    Submodule,
    Directory,
}

impl FileMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            FileMode::Absent => 0,
            FileMode::Regular => 0o100644,
            FileMode::Executable => 0o100755,
            FileMode::Symlink => 0o120000,
            FileMode::Submodule => 0o160000,
            FileMode::Directory => 0o040000,
        }
    }

    /// Validate a numeric mode read from a tree entry
    pub fn from_u32(mode: u32) -> Result<Self> {
        match mode {
            0o100644 => Ok(FileMode::Regular),
            0o100755 => Ok(FileMode::Executable),
            0o120000 => Ok(FileMode::Symlink),
            0o160000 => Ok(FileMode::Submodule),
            0o040000 => Ok(FileMode::Directory),
            _ => Err(Error::corrupt(format!("illegal file mode {mode:o}"))),
        }
    }

    pub fn from_octal(octal: &[u8]) -> Result<Self> {
        let mode = std::str::from_utf8(octal)
            .ok()
            .filter(|digits| !digits.is_empty())
            .and_then(|digits| u32::from_str_radix(digits, 8).ok())
            .ok_or_else(|| {
                Error::corrupt(format!(
                    "invalid file mode {:?}",
                    String::from_utf8_lossy(octal)
                ))
            })?;

        Self::from_u32(mode)
    }

    /// Octal rendering used inside tree objects (no leading zero)
    pub fn to_octal(&self) -> String {
        format!("{:o}", self.as_u32())
    }

    /// Object type an entry with this mode points at
    pub fn object_type(&self) -> Option<ObjectType> {
        match self {
            FileMode::Absent => None,
            FileMode::Directory => Some(ObjectType::Tree),
            FileMode::Submodule => Some(ObjectType::Commit),
            FileMode::Regular | FileMode::Executable | FileMode::Symlink => Some(ObjectType::Blob),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, FileMode::Directory)
    }
}

//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs),
//! subdirectories (other trees) and submodules, along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`

use crate::artifacts::objects::file_mode::FileMode;
use crate::artifacts::objects::object::{ObjectHeader, Packable, Unpackable, identify};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::parser::ByteCursor;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::borrow::Cow;
use std::cmp::Ordering;

/// One named child of a tree
///
/// The object type is derived from the mode and never stored separately on disk.
/// Names are raw bytes: git only forbids `/` and NUL in them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    mode: FileMode,
    object_type: ObjectType,
    name: Bytes,
    oid: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: FileMode, name: impl AsRef<[u8]>, oid: ObjectId) -> Result<Self> {
        let name = Bytes::copy_from_slice(name.as_ref());
        let object_type = mode.object_type().ok_or_else(|| {
            Error::corrupt(format!(
                "tree entry {:?} has no mode",
                String::from_utf8_lossy(&name)
            ))
        })?;

        let reserved = name.is_empty() || name == "." || name == "..";
        if reserved || name.iter().any(|&b| b == b'/' || b == 0) {
            return Err(Error::corrupt(format!(
                "invalid tree entry name {:?}",
                String::from_utf8_lossy(&name)
            )));
        }

        Ok(TreeEntry {
            mode,
            object_type,
            name,
            oid,
        })
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Raw entry name as stored in the tree
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Entry name for display, invalid UTF-8 replaced
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    pub fn oid(&self) -> &ObjectId {
        &self.oid
    }

    pub fn is_tree(&self) -> bool {
        self.mode.is_tree()
    }

    /// Git orders entries by name, comparing directories as if their name ended in '/'
    fn canonical_cmp(&self, other: &Self) -> Ordering {
        let suffix = |entry: &Self| if entry.is_tree() { Some(b'/') } else { None };

        self.name
            .iter()
            .copied()
            .chain(suffix(self))
            .cmp(other.name.iter().copied().chain(suffix(other)))
    }
}

/// Git tree object representing a directory snapshot
///
/// Entries keep the order they had on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    id: ObjectId,
    header: ObjectHeader,
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree, sorting entries into canonical order
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(TreeEntry::canonical_cmp);

        let payload = Self::encode(&entries);
        let (header, id) = identify(ObjectType::Tree, &payload);

        Tree {
            id,
            header,
            entries,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn header(&self) -> ObjectHeader {
        self.header
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&TreeEntry> {
        self.entries
            .iter()
            .find(|entry| entry.name.as_ref() == name.as_ref())
    }

    fn encode(entries: &[TreeEntry]) -> Vec<u8> {
        let mut payload = Vec::new();

        for entry in entries {
            payload.extend_from_slice(entry.mode.to_octal().as_bytes());
            payload.push(b' ');
            payload.extend_from_slice(&entry.name);
            payload.push(0);
            payload.extend_from_slice(entry.oid.as_bytes());
        }

        payload
    }
}

impl Packable for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn payload(&self) -> Bytes {
        Bytes::from(Self::encode(&self.entries))
    }
}

impl Unpackable for Tree {
    fn deserialize(
        object_id: ObjectId,
        header: ObjectHeader,
        payload: &mut ByteCursor<'_>,
    ) -> Result<Self> {
        let mut entries = Vec::new();

        while !payload.is_empty() {
            let mode = FileMode::from_octal(payload.read_until(b' ')?)?;
            let name = payload.read_until(0)?;
            let oid = payload.read_object_id()?;

            entries.push(TreeEntry::new(mode, name, oid)?);
        }

        Ok(Tree {
            id: object_id,
            header,
            entries,
        })
    }
}

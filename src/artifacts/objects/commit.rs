//! Git commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! Headers git adds after the committer line (`gpgsig`, `encoding`,
//! `mergetag`) are kept verbatim so the payload re-serializes byte for byte.

use crate::artifacts::objects::object::{ObjectHeader, Packable, Unpackable, identify};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::parser::ByteCursor;
use crate::artifacts::objects::who_when::WhoWhen;
use crate::errors::{Error, Result};
use bytes::Bytes;
use std::borrow::Cow;

/// Header line with an arbitrary key; continuation lines are joined with '\n'
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraHeader {
    pub key: String,
    pub value: Bytes,
}

impl ExtraHeader {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let key = cursor.read_str_until(b' ')?.to_string();
        let mut value = cursor.read_until(b'\n')?.to_vec();

        while cursor.eat(b" ") {
            value.push(b'\n');
            value.extend_from_slice(cursor.read_until(b'\n')?);
        }

        Ok(ExtraHeader {
            key,
            value: Bytes::from(value),
        })
    }

    pub(crate) fn write_to(&self, payload: &mut Vec<u8>) {
        payload.extend_from_slice(self.key.as_bytes());
        payload.push(b' ');
        for (i, line) in self.value.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                payload.extend_from_slice(b"\n ");
            }
            payload.extend_from_slice(line);
        }
        payload.push(b'\n');
    }
}

/// Git commit object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    id: ObjectId,
    header: ObjectHeader,
    /// Tree object ID representing the directory snapshot
    tree_oid: ObjectId,
    /// Parent commit IDs (empty for a root commit, several for merges)
    parents: Vec<ObjectId>,
    author: WhoWhen,
    committer: WhoWhen,
    extra_headers: Vec<ExtraHeader>,
    message: Bytes,
}

impl Commit {
    pub fn new(
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: WhoWhen,
        committer: WhoWhen,
        message: impl Into<Bytes>,
    ) -> Self {
        Self::with_extra_headers(tree_oid, parents, author, committer, vec![], message)
    }

    pub fn with_extra_headers(
        tree_oid: ObjectId,
        parents: Vec<ObjectId>,
        author: WhoWhen,
        committer: WhoWhen,
        extra_headers: Vec<ExtraHeader>,
        message: impl Into<Bytes>,
    ) -> Self {
        let mut commit = Commit {
            id: ObjectId::default(),
            header: ObjectHeader::new(ObjectType::Commit, 0),
            tree_oid,
            parents,
            author,
            committer,
            extra_headers,
            message: message.into(),
        };
        (commit.header, commit.id) = identify(ObjectType::Commit, &commit.encode());

        commit
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn header(&self) -> ObjectHeader {
        self.header
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    /// First parent, the one `~` follows
    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &WhoWhen {
        &self.author
    }

    pub fn committer(&self) -> &WhoWhen {
        &self.committer
    }

    pub fn extra_headers(&self) -> &[ExtraHeader] {
        &self.extra_headers
    }

    /// Committer time in seconds since the epoch
    pub fn timestamp(&self) -> i64 {
        self.committer.seconds()
    }

    pub fn raw_message(&self) -> &Bytes {
        &self.message
    }

    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    /// First line of the commit message
    pub fn short_message(&self) -> String {
        self.message().lines().next().unwrap_or("").to_string()
    }

    fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();

        payload.extend_from_slice(format!("tree {}\n", self.tree_oid).as_bytes());
        for parent in &self.parents {
            payload.extend_from_slice(format!("parent {parent}\n").as_bytes());
        }
        payload.extend_from_slice(format!("author {}\n", self.author).as_bytes());
        payload.extend_from_slice(format!("committer {}\n", self.committer).as_bytes());
        for extra in &self.extra_headers {
            extra.write_to(&mut payload);
        }
        payload.push(b'\n');
        payload.extend_from_slice(&self.message);

        payload
    }
}

impl Packable for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn payload(&self) -> Bytes {
        Bytes::from(self.encode())
    }
}

impl Unpackable for Commit {
    fn deserialize(
        object_id: ObjectId,
        header: ObjectHeader,
        payload: &mut ByteCursor<'_>,
    ) -> Result<Self> {
        payload.expect(b"tree ")?;
        let tree_oid = payload.read_hex_object_id(b'\n')?;

        let mut parents = Vec::new();
        while payload.eat(b"parent ") {
            parents.push(payload.read_hex_object_id(b'\n')?);
        }

        payload.expect(b"author ")?;
        let author = WhoWhen::parse(payload.read_str_until(b'\n')?)?;
        payload.expect(b"committer ")?;
        let committer = WhoWhen::parse(payload.read_str_until(b'\n')?)?;

        let mut extra_headers = Vec::new();
        while !payload.eat(b"\n") {
            if payload.is_empty() {
                return Err(Error::corrupt("commit is missing the blank line before its message"));
            }
            extra_headers.push(ExtraHeader::parse(payload)?);
        }

        let message = Bytes::copy_from_slice(payload.read_rest());

        Ok(Commit {
            id: object_id,
            header,
            tree_oid,
            parents,
            author,
            committer,
            extra_headers,
            message,
        })
    }
}

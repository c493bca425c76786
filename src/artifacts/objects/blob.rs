//! Git blob object
//!
//! Blobs store file content in Git. They contain only the raw file data,
//! without any metadata like filename or permissions (those are stored in trees).
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use crate::artifacts::objects::object::{ObjectHeader, Packable, Unpackable, identify};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::parser::ByteCursor;
use crate::errors::Result;
use bytes::Bytes;

/// Git blob object representing file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    id: ObjectId,
    header: ObjectHeader,
    content: Bytes,
}

impl Blob {
    pub fn new(content: impl Into<Bytes>) -> Self {
        let content = content.into();
        let (header, id) = identify(ObjectType::Blob, &content);

        Blob {
            id,
            header,
            content,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn header(&self) -> ObjectHeader {
        self.header
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

impl Packable for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }

    fn payload(&self) -> Bytes {
        self.content.clone()
    }
}

impl Unpackable for Blob {
    fn deserialize(
        object_id: ObjectId,
        header: ObjectHeader,
        payload: &mut ByteCursor<'_>,
    ) -> Result<Self> {
        Ok(Blob {
            id: object_id,
            header,
            content: Bytes::copy_from_slice(payload.read_rest()),
        })
    }
}

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::parser::ByteCursor;
use crate::artifacts::objects::tag::Tag;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, Result};
use bytes::Bytes;
use derive_new::new;
use sha1::{Digest, Sha1};

/// Object type plus declared payload size
///
/// The declared size must match the number of payload bytes consumed while
/// parsing, or the object is corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new)]
pub struct ObjectHeader {
    pub object_type: ObjectType,
    pub size: usize,
}

impl ObjectHeader {
    /// Parse `<type-word> <decimal-size>\0`
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let word = cursor.read_until(b' ')?;
        let object_type = ObjectType::from_word(word).map_err(|e| {
            if !word.is_empty() && word.iter().all(u8::is_ascii_lowercase) {
                Error::Unsupported(format!(
                    "object type {:?}",
                    String::from_utf8_lossy(word)
                ))
            } else {
                e
            }
        })?;
        let size = cursor.read_decimal_until(0)?;

        Ok(ObjectHeader::new(object_type, size))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\0", self.object_type, self.size).into_bytes()
    }
}

pub trait Packable {
    fn object_type(&self) -> ObjectType;

    /// Serialized payload, without the `<type> <size>\0` header
    fn payload(&self) -> Bytes;

    fn serialize(&self) -> Bytes {
        let payload = self.payload();
        let mut object_bytes = ObjectHeader::new(self.object_type(), payload.len()).to_bytes();
        object_bytes.extend_from_slice(&payload);

        Bytes::from(object_bytes)
    }
}

pub trait Unpackable {
    /// Decode a payload whose header has already been read
    ///
    /// Implementations consume every payload byte they accept; the caller
    /// compares the consumed count against the declared size.
    fn deserialize(
        object_id: ObjectId,
        header: ObjectHeader,
        payload: &mut ByteCursor<'_>,
    ) -> Result<Self>
    where
        Self: Sized;
}

/// Compute header and id of a payload with a fresh hasher
pub(crate) fn identify(object_type: ObjectType, payload: &[u8]) -> (ObjectHeader, ObjectId) {
    let header = ObjectHeader::new(object_type, payload.len());

    let mut hasher = Sha1::new();
    hasher.update(header.to_bytes());
    hasher.update(payload);

    (header, ObjectId::from_hasher(hasher))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl Object {
    /// Decode a full `<type> <size>\0<payload>` byte sequence
    pub fn parse(object_id: ObjectId, data: &[u8]) -> Result<Object> {
        let location = format!("object {object_id}");

        let mut cursor = ByteCursor::new(data);
        let header = ObjectHeader::parse(&mut cursor).map_err(|e| e.within(&location))?;

        Self::decode_payload(object_id, header, cursor.remaining()).map_err(|e| e.within(&location))
    }

    /// Decode a payload whose type and size were obtained out of band (pack entries)
    pub fn parse_payload(object_id: ObjectId, header: ObjectHeader, payload: &[u8]) -> Result<Object> {
        let location = format!("object {object_id}");

        Self::decode_payload(object_id, header, payload).map_err(|e| e.within(location))
    }

    fn decode_payload(object_id: ObjectId, header: ObjectHeader, payload: &[u8]) -> Result<Object> {
        let mut cursor = ByteCursor::new(payload);

        let object = match header.object_type {
            ObjectType::Blob => Object::Blob(Blob::deserialize(object_id, header, &mut cursor)?),
            ObjectType::Tree => Object::Tree(Tree::deserialize(object_id, header, &mut cursor)?),
            ObjectType::Commit => {
                Object::Commit(Commit::deserialize(object_id, header, &mut cursor)?)
            }
            ObjectType::Tag => Object::Tag(Tag::deserialize(object_id, header, &mut cursor)?),
        };

        if cursor.consumed() != header.size {
            return Err(Error::corrupt(format!(
                "size mismatch: header declares {} bytes, payload has {}",
                header.size,
                cursor.consumed()
            )));
        }

        Ok(object)
    }

    /// Hash an object of the given type and payload
    pub fn hash(object_type: ObjectType, payload: &[u8]) -> ObjectId {
        identify(object_type, payload).1
    }

    pub fn id(&self) -> &ObjectId {
        match self {
            Object::Blob(blob) => blob.id(),
            Object::Tree(tree) => tree.id(),
            Object::Commit(commit) => commit.id(),
            Object::Tag(tag) => tag.id(),
        }
    }

    pub fn header(&self) -> ObjectHeader {
        match self {
            Object::Blob(blob) => blob.header(),
            Object::Tree(tree) => tree.header(),
            Object::Commit(commit) => commit.header(),
            Object::Tag(tag) => tag.header(),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.header().object_type
    }

    pub fn serialize(&self) -> Bytes {
        match self {
            Object::Blob(blob) => blob.serialize(),
            Object::Tree(tree) => tree.serialize(),
            Object::Commit(commit) => commit.serialize(),
            Object::Tag(tag) => tag.serialize(),
        }
    }

    pub fn payload(&self) -> Bytes {
        match self {
            Object::Blob(blob) => blob.payload(),
            Object::Tree(tree) => tree.payload(),
            Object::Commit(commit) => commit.payload(),
            Object::Tag(tag) => tag.payload(),
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Object::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Object::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Object::Commit(commit) => Some(commit),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Object::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Object::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Object::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl From<Blob> for Object {
    fn from(blob: Blob) -> Self {
        Object::Blob(blob)
    }
}

impl From<Tree> for Object {
    fn from(tree: Tree) -> Self {
        Object::Tree(tree)
    }
}

impl From<Commit> for Object {
    fn from(commit: Commit) -> Self {
        Object::Commit(commit)
    }
}

impl From<Tag> for Object {
    fn from(tag: Tag) -> Self {
        Object::Tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::artifacts::objects::file_mode::FileMode;
    use crate::artifacts::objects::tree::TreeEntry;
    use crate::artifacts::objects::who_when::WhoWhen;
    use pretty_assertions::assert_eq;

    fn who(seconds: i64) -> WhoWhen {
        WhoWhen::new("Ada Lovelace", "ada@example.com", seconds, -300).unwrap()
    }

    fn sample_objects() -> Vec<Object> {
        let blob = Blob::new(&b"hello world\n"[..]);
        let tree = Tree::new(vec![
            TreeEntry::new(FileMode::Regular, "hello.txt", blob.id().clone()).unwrap(),
            TreeEntry::new(FileMode::Directory, "src", Tree::new(vec![]).id().clone()).unwrap(),
        ]);
        let commit = Commit::new(
            tree.id().clone(),
            vec![ObjectId::from_bytes([7; 20])],
            who(10),
            who(20),
            "first line\n\nbody\n",
        );
        let tag = Tag::new(
            commit.id().clone(),
            ObjectType::Commit,
            "v1.0",
            who(30),
            "release\n",
        );

        vec![blob.into(), tree.into(), commit.into(), tag.into()]
    }

    #[test]
    fn every_object_type_round_trips() {
        for object in sample_objects() {
            let parsed = Object::parse(object.id().clone(), &object.serialize()).unwrap();

            assert_eq!(parsed.id(), object.id());
            assert_eq!(parsed, object);
        }
    }

    #[test]
    fn known_blob_hash() {
        let blob = Blob::new(Bytes::new());
        assert_eq!(
            blob.id().to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn declared_size_must_match_payload() {
        let id = ObjectId::default();

        let too_long = Object::parse(id.clone(), b"blob 3\0abcd").unwrap_err();
        assert_eq!(too_long.kind(), ErrorKind::Corrupt);
        assert!(too_long.to_string().contains("size mismatch"));

        let too_short = Object::parse(id.clone(), b"blob 9\0abcd").unwrap_err();
        assert_eq!(too_short.kind(), ErrorKind::Corrupt);

        for object in sample_objects() {
            let payload = object.payload();
            let mut data = ObjectHeader::new(object.object_type(), payload.len() + 1).to_bytes();
            data.extend_from_slice(&payload);

            let error = Object::parse(id.clone(), &data).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Corrupt, "{}", object.object_type());
        }
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let id = ObjectId::default();

        assert_eq!(
            Object::parse(id.clone(), b"Blob 1\0a").unwrap_err().kind(),
            ErrorKind::Corrupt
        );
        assert_eq!(
            Object::parse(id.clone(), b"blob1\0a").unwrap_err().kind(),
            ErrorKind::Corrupt
        );
        assert_eq!(
            Object::parse(id.clone(), b"blob x\0a").unwrap_err().kind(),
            ErrorKind::Corrupt
        );
        assert_eq!(
            Object::parse(id, b"note 1\0a").unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }
}

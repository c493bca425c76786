//! Git annotated tag object
//!
//! ## Format
//!
//! ```text
//! tag <size>\0
//! object <target-sha>
//! type <target-type>
//! tag <name>
//! tagger <name> <email> <timestamp> <timezone>
//!
//! <tag message>
//! ```
//!
//! Lightweight tags are plain refs and never produce one of these.

use crate::artifacts::objects::object::{ObjectHeader, Packable, Unpackable, identify};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::parser::ByteCursor;
use crate::artifacts::objects::who_when::WhoWhen;
use crate::errors::Result;
use bytes::Bytes;
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    id: ObjectId,
    header: ObjectHeader,
    target: ObjectId,
    target_type: ObjectType,
    name: String,
    tagger: WhoWhen,
    message: Bytes,
}

impl Tag {
    pub fn new(
        target: ObjectId,
        target_type: ObjectType,
        name: &str,
        tagger: WhoWhen,
        message: impl Into<Bytes>,
    ) -> Self {
        let mut tag = Tag {
            id: ObjectId::default(),
            header: ObjectHeader::new(ObjectType::Tag, 0),
            target,
            target_type,
            name: name.to_string(),
            tagger,
            message: message.into(),
        };
        (tag.header, tag.id) = identify(ObjectType::Tag, &tag.encode());

        tag
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn header(&self) -> ObjectHeader {
        self.header
    }

    pub fn target(&self) -> &ObjectId {
        &self.target
    }

    pub fn target_type(&self) -> ObjectType {
        self.target_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tagger(&self) -> &WhoWhen {
        &self.tagger
    }

    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    fn encode(&self) -> Vec<u8> {
        let mut payload = format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n",
            self.target, self.target_type, self.name, self.tagger
        )
        .into_bytes();
        payload.extend_from_slice(&self.message);

        payload
    }
}

impl Packable for Tag {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tag
    }

    fn payload(&self) -> Bytes {
        Bytes::from(self.encode())
    }
}

impl Unpackable for Tag {
    fn deserialize(
        object_id: ObjectId,
        header: ObjectHeader,
        payload: &mut ByteCursor<'_>,
    ) -> Result<Self> {
        payload.expect(b"object ")?;
        let target = payload.read_hex_object_id(b'\n')?;
        payload.expect(b"type ")?;
        let target_type = ObjectType::from_word(payload.read_until(b'\n')?)?;
        payload.expect(b"tag ")?;
        let name = payload.read_str_until(b'\n')?.to_string();
        payload.expect(b"tagger ")?;
        let tagger = WhoWhen::parse(payload.read_str_until(b'\n')?)?;
        payload.expect(b"\n")?;

        Ok(Tag {
            id: object_id,
            header,
            target,
            target_type,
            name,
            tagger,
            message: Bytes::copy_from_slice(payload.read_rest()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::object::Object;

    #[test]
    fn parses_annotated_tag() {
        let body = "object 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                    type commit\n\
                    tag v2.1\n\
                    tagger Rel Eng <releng@example.com> 1600000000 +0000\n\
                    \n\
                    Release 2.1\n";
        let mut data = format!("tag {}\0", body.len()).into_bytes();
        data.extend_from_slice(body.as_bytes());

        let object = Object::parse(ObjectId::default(), &data).unwrap();
        let tag = object.as_tag().unwrap();

        assert_eq!(tag.name(), "v2.1");
        assert_eq!(tag.target_type(), ObjectType::Commit);
        assert_eq!(tag.tagger().email(), "releng@example.com");
        assert_eq!(tag.message(), "Release 2.1\n");
    }

    #[test]
    fn rejects_unknown_target_type() {
        let body = "object 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                    type widget\n\
                    tag v2.1\n\
                    tagger Rel Eng <releng@example.com> 1600000000 +0000\n\n";
        let mut data = format!("tag {}\0", body.len()).into_bytes();
        data.extend_from_slice(body.as_bytes());

        assert!(Object::parse(ObjectId::default(), &data).is_err());
    }
}

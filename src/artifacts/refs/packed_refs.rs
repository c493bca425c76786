//! The `packed-refs` file
//!
//! ```text
//! # pack-refs with: peeled fully-peeled sorted
//! <hex-id> <ref-name>
//! ^<hex-id>            peeled target of the preceding (annotated tag) ref
//! ```

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::{Ref, RefTarget};
use crate::errors::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedRefs {
    refs: Vec<Ref>,
}

impl PackedRefs {
    pub fn parse(content: &str) -> Result<Self> {
        Self::decode(content).map_err(|e| e.within("packed-refs"))
    }

    fn decode(content: &str) -> Result<Self> {
        let mut refs: Vec<Ref> = Vec::new();

        for (number, line) in content.lines().enumerate() {
            let line_error = |e: Error| e.within(format!("line {}", number + 1));

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(peeled) = line.strip_prefix('^') {
                let peeled = ObjectId::try_parse(peeled.trim()).map_err(line_error)?;
                // a peel line with nothing to attach to is ignored
                if let Some(last) = refs.pop() {
                    refs.push(last.with_peeled(Some(peeled)));
                }
                continue;
            }

            let (oid, name) = line
                .split_once(' ')
                .ok_or_else(|| line_error(Error::corrupt(format!("malformed entry {line:?}"))))?;
            let oid = ObjectId::try_parse(oid).map_err(line_error)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(line_error(Error::corrupt("entry without a ref name")));
            }

            refs.push(Ref::new(name, RefTarget::Direct(oid)));
        }

        Ok(PackedRefs { refs })
    }

    pub fn refs(&self) -> &[Ref] {
        &self.refs
    }

    pub fn into_refs(self) -> Vec<Ref> {
        self.refs
    }

    pub fn get(&self, name: &str) -> Option<&Ref> {
        self.refs.iter().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TAG: &str = "1111111111111111111111111111111111111111";
    const COMMIT: &str = "2222222222222222222222222222222222222222";
    const MAIN: &str = "3333333333333333333333333333333333333333";

    fn oid(hex: &str) -> ObjectId {
        ObjectId::try_parse(hex).unwrap()
    }

    #[test]
    fn parses_entries_and_peel_lines() {
        let content = format!(
            "# pack-refs with: peeled fully-peeled sorted \n\
             {MAIN} refs/heads/main\n\
             {TAG} refs/tags/v1\n\
             ^{COMMIT}\n"
        );

        let packed = PackedRefs::parse(&content).unwrap();

        assert_eq!(packed.len(), 2);
        assert_eq!(packed.get("refs/heads/main").unwrap().oid(), Some(&oid(MAIN)));
        assert_eq!(packed.get("refs/heads/main").unwrap().peeled(), None);
        assert_eq!(packed.get("refs/tags/v1").unwrap().peeled(), Some(&oid(COMMIT)));
    }

    #[test]
    fn leading_peel_line_is_ignored() {
        let content = format!("^{COMMIT}\n{MAIN} refs/heads/main\n");

        let packed = PackedRefs::parse(&content).unwrap();

        assert_eq!(packed.len(), 1);
        assert_eq!(packed.refs()[0].peeled(), None);
    }

    #[test]
    fn malformed_lines_are_corrupt() {
        for content in [
            "not-a-hash refs/heads/main\n".to_string(),
            format!("{MAIN}\n"),
            format!("{MAIN} \n"),
            format!("{MAIN} refs/tags/v1\n^xyz\n"),
        ] {
            let error = PackedRefs::parse(&content).unwrap_err();
            assert!(error.to_string().contains("packed-refs: line"), "{error}");
        }
    }
}

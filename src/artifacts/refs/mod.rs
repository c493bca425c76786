//! Git references as values
//!
//! A ref is a name relative to the metadata root (`HEAD`,
//! `refs/heads/main`, ...) and either a direct object id or the name of
//! another ref.
//!
//! ## File Format
//!
//! Loose ref files hold either a 40-character hex id or `ref: <name>`,
//! followed by a newline. See [`packed_refs`] for the aggregated form.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};

pub mod packed_refs;
pub mod ref_name;

/// Regex pattern for parsing symbolic references
pub const SYMREF_REGEX: &str = r"^ref: (.+)$";

pub const INVALID_REF_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};

/// Patterns a short ref name is expanded with, tried in order
pub const REF_SEARCH_PATTERNS: [&str; 6] = [
    "{}",
    "refs/{}",
    "refs/tags/{}",
    "refs/heads/{}",
    "refs/remotes/{}",
    "refs/remotes/{}/HEAD",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Direct(ObjectId),
    /// Name of another ref
    Symbolic(String),
}

impl RefTarget {
    /// Parse the contents of a loose ref file
    pub fn parse(content: &str) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::corrupt("empty ref file"));
        }

        let symref_regex = regex::Regex::new(SYMREF_REGEX)
            .map_err(|e| Error::corrupt(format!("invalid symref regex: {e}")))?;
        match symref_regex.captures(content) {
            Some(symref_match) => Ok(RefTarget::Symbolic(symref_match[1].trim().to_string())),
            None => Ok(RefTarget::Direct(ObjectId::try_parse(content)?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    name: String,
    target: RefTarget,
    /// Commit an annotated tag ultimately points at, when recorded
    peeled: Option<ObjectId>,
}

impl Ref {
    pub fn new(name: impl Into<String>, target: RefTarget) -> Self {
        Ref {
            name: name.into(),
            target,
            peeled: None,
        }
    }

    pub fn with_peeled(mut self, peeled: Option<ObjectId>) -> Self {
        self.peeled = peeled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &RefTarget {
        &self.target
    }

    pub fn peeled(&self) -> Option<&ObjectId> {
        self.peeled.as_ref()
    }

    /// Target id of a direct ref
    pub fn oid(&self) -> Option<&ObjectId> {
        match &self.target {
            RefTarget::Direct(oid) => Some(oid),
            RefTarget::Symbolic(_) => None,
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self.target, RefTarget::Symbolic(_))
    }
}

/// Expand a short name into the full names it may stand for
pub fn search_names(name: &str) -> impl Iterator<Item = String> + '_ {
    let name = REF_ALIASES.get(name).copied().unwrap_or(name);

    REF_SEARCH_PATTERNS
        .iter()
        .map(move |pattern| pattern.replace("{}", name))
}

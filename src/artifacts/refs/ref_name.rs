use crate::artifacts::refs::INVALID_REF_NAME_REGEX;
use crate::errors::{Error, Result};

/// A ref name safe to join onto the metadata root
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefName(String);

impl RefName {
    pub fn try_parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::invalid_spec("ref name cannot be empty"));
        }

        let re = regex::Regex::new(INVALID_REF_NAME_REGEX)
            .map_err(|e| Error::invalid_spec(format!("invalid ref name regex: {e}")))?;

        if re.is_match(name) {
            Err(Error::invalid_spec(format!("invalid ref name: {name}")))
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Path components, always separated by `/`
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

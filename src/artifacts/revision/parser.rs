use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::refs::REF_ALIASES;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::revision::{ANCESTOR_OPERATOR, MIN_HEX_BASE_LEN, PARENT_OPERATOR};
use crate::errors::{Error, Result};

/// What a `^{...}` suffix peels to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeelTarget {
    /// `^{}`: unwrap tags until a non-tag object
    Any,
    /// `^{object}`: the object itself
    Object,
    Type(ObjectType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevOp {
    /// `~N`: follow first parents N times
    Ancestor(usize),
    /// `^N`: the Nth parent, `^0` for the commit itself
    Parent(usize),
    Peel(PeelTarget),
}

/// A parsed revision expression, e.g. `main~2^{tree}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    base: String,
    ops: Vec<RevOp>,
}

impl Revision {
    pub fn parse(spec: &str) -> Result<Self> {
        let split = spec
            .find([ANCESTOR_OPERATOR, PARENT_OPERATOR])
            .unwrap_or(spec.len());
        let (base, mut rest) = spec.split_at(split);

        if base.is_empty() {
            return Err(Error::invalid_spec(format!("{spec:?} has no base revision")));
        }
        let base = REF_ALIASES.get(base).copied().unwrap_or(base);
        RefName::try_parse(base)?;

        let mut ops = Vec::new();
        while let Some(operator) = rest.chars().next() {
            rest = &rest[operator.len_utf8()..];

            let op = match operator {
                ANCESTOR_OPERATOR => RevOp::Ancestor(Self::parse_count(&mut rest, spec)?),
                PARENT_OPERATOR if rest.starts_with('{') => {
                    let close = rest.find('}').ok_or_else(|| {
                        Error::invalid_spec(format!("unterminated '^{{' in {spec:?}"))
                    })?;
                    let word = &rest[1..close];
                    rest = &rest[close + 1..];

                    RevOp::Peel(Self::parse_peel_target(word)?)
                }
                PARENT_OPERATOR => RevOp::Parent(Self::parse_count(&mut rest, spec)?),
                other => {
                    return Err(Error::invalid_spec(format!(
                        "unexpected {other:?} in {spec:?}"
                    )));
                }
            };
            ops.push(op);
        }

        Ok(Revision {
            base: base.to_string(),
            ops,
        })
    }

    /// Digits right after an operator; none means 1
    fn parse_count(rest: &mut &str, spec: &str) -> Result<usize> {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Ok(1);
        }

        let (count, remainder) = rest.split_at(digits);
        *rest = remainder;
        count
            .parse()
            .map_err(|_| Error::invalid_spec(format!("count {count} too large in {spec:?}")))
    }

    fn parse_peel_target(word: &str) -> Result<PeelTarget> {
        match word {
            "" => Ok(PeelTarget::Any),
            "object" => Ok(PeelTarget::Object),
            word => ObjectType::try_from(word)
                .map(PeelTarget::Type)
                .map_err(|_| Error::invalid_spec(format!("unknown object type {word:?}"))),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ops(&self) -> &[RevOp] {
        &self.ops
    }

    /// Whether the base is worth trying as an abbreviated object id
    pub fn base_looks_like_oid(&self) -> bool {
        (MIN_HEX_BASE_LEN..=OBJECT_ID_LENGTH).contains(&self.base.len())
            && self.base.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)?;
        for op in &self.ops {
            match op {
                RevOp::Ancestor(n) => write!(f, "~{n}")?,
                RevOp::Parent(n) => write!(f, "^{n}")?,
                RevOp::Peel(PeelTarget::Any) => write!(f, "^{{}}")?,
                RevOp::Peel(PeelTarget::Object) => write!(f, "^{{object}}")?,
                RevOp::Peel(PeelTarget::Type(object_type)) => write!(f, "^{{{object_type}}}")?,
            }
        }

        Ok(())
    }
}

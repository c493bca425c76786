use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::revision::parser::{PeelTarget, RevOp, Revision};
use crate::errors::{Error, Result};
use tracing::trace;

impl Revision {
    pub fn resolve(&self, repository: &Repository) -> Result<Object> {
        let mut object = self.resolve_base(repository)?;

        for op in self.ops() {
            trace!(?op, from = %object.id(), "applying revision operator");
            object = match *op {
                RevOp::Ancestor(generations) => {
                    let mut commit = Self::peel_to_commit(object, repository)?;
                    for _ in 0..generations {
                        let parent = commit.parent().cloned().ok_or_else(|| {
                            Error::invalid_spec(format!(
                                "commit {} has no first parent",
                                commit.id().to_short_oid()
                            ))
                        })?;
                        commit = Self::load_commit(&parent, repository)?;
                    }

                    commit.into()
                }
                RevOp::Parent(0) => Self::peel_to_commit(object, repository)?.into(),
                RevOp::Parent(n) => {
                    let commit = Self::peel_to_commit(object, repository)?;
                    let parent = commit.parents().get(n - 1).ok_or_else(|| {
                        Error::invalid_spec(format!(
                            "commit {} has {} parent(s), no parent {n}",
                            commit.id().to_short_oid(),
                            commit.parents().len()
                        ))
                    })?;

                    Self::load_commit(parent, repository)?.into()
                }
                RevOp::Peel(target) => Self::peel(object, target, repository)?,
            };
        }

        Ok(object)
    }

    /// Hex-looking bases are tried as object ids before ref names
    fn resolve_base(&self, repository: &Repository) -> Result<Object> {
        let base = self.base();

        let hash_error = if self.base_looks_like_oid() {
            match repository.database().get_by_short(base) {
                Ok(object) => return Ok(object),
                Err(e) => Some(e),
            }
        } else {
            None
        };

        match repository.refs().lookup_id(base) {
            Ok(object_id) => repository.database().get(&object_id),
            Err(ref_error) => match hash_error {
                Some(hash_error) if ref_error.is_not_found() && !hash_error.is_not_found() => {
                    Err(hash_error)
                }
                _ => Err(ref_error),
            },
        }
    }

    fn load_commit(object_id: &ObjectId, repository: &Repository) -> Result<Commit> {
        let object = repository.database().get(object_id)?;
        let object_type = object.object_type();

        object.into_commit().ok_or_else(|| {
            Error::corrupt(format!("parent {object_id} is a {object_type}, not a commit"))
        })
    }

    fn peel_to_commit(object: Object, repository: &Repository) -> Result<Commit> {
        match Self::peel(object, PeelTarget::Type(ObjectType::Commit), repository)? {
            Object::Commit(commit) => Ok(commit),
            other => Err(Error::invalid_spec(format!(
                "{} {} is not a commit",
                other.object_type(),
                other.id().to_short_oid()
            ))),
        }
    }

    fn peel(mut object: Object, target: PeelTarget, repository: &Repository) -> Result<Object> {
        loop {
            object = match (target, object) {
                (PeelTarget::Object, object) => return Ok(object),
                (PeelTarget::Type(wanted), object) if object.object_type() == wanted => {
                    return Ok(object);
                }
                (_, Object::Tag(tag)) => repository.database().get(tag.target())?,
                (PeelTarget::Any, object) => return Ok(object),
                (PeelTarget::Type(ObjectType::Tree), Object::Commit(commit)) => {
                    repository.database().get(commit.tree_oid())?
                }
                (PeelTarget::Type(wanted), object) => {
                    return Err(Error::invalid_spec(format!(
                        "{} {} cannot be peeled to a {wanted}",
                        object.object_type(),
                        object.id().to_short_oid()
                    )));
                }
            };
        }
    }
}

//! Read-only git object database
//!
//! - `areas`: on-disk state (object store, packs, refs, repository handle)
//! - `artifacts`: value types and algorithms over them (objects, pack
//!   formats, refs, revisions, tree diff, history walk)
//! - `errors`: the crate error type

pub mod areas;
pub mod artifacts;
pub mod errors;

#[cfg(test)]
mod test_support;

pub use areas::repository::Repository;
pub use artifacts::objects::object::Object;
pub use artifacts::objects::object_id::ObjectId;
pub use errors::{Error, ErrorKind, Result};

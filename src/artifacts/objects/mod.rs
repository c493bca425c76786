//! Object ids and the object codec
//!
//! Every object is addressed by the SHA-1 of its serialized form,
//! `<type> <size>\0<payload>`. The payload depends on the type:
//!
//! - **Blob**: raw file bytes
//! - **Tree**: `<mode> <name>\0<raw id>` entries
//! - **Commit**: tree, parents, author, committer, then the message
//! - **Tag**: target, target type, name, tagger, then the message
//!
//! Decoding goes through [`parser::ByteCursor`]; any malformed input is
//! reported as a corrupt object.

pub mod blob;
pub mod commit;
pub mod file_mode;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod parser;
pub mod tag;
pub mod tree;
pub mod who_when;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes
pub const RAW_OBJECT_ID_LENGTH: usize = 20;

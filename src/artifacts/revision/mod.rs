//! Revision expressions
//!
//! ```text
//! rev  := base (op)*
//! base := hex-digit{4,40} | ref-name
//! op   := '~' digits? | '^' digits? | '^{' type-word? '}'
//! ```
//!
//! Parsing builds a [`Revision`]; evaluation against a repository turns it
//! into a concrete object.

pub mod parser;
pub mod resolver;

pub use parser::{PeelTarget, RevOp, Revision};

pub const ANCESTOR_OPERATOR: char = '~';
pub const PARENT_OPERATOR: char = '^';

/// Shortest hex string tried as an abbreviated object id
pub const MIN_HEX_BASE_LEN: usize = 4;

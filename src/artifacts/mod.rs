//! Git data structures and algorithms
//!
//! - `diff`: structural tree diffing
//! - `log`: commit history traversal
//! - `objects`: object ids, the object codec and the four object types
//! - `pack`: pack index, pack entry and delta formats
//! - `refs`: ref values and the packed-refs format
//! - `revision`: revision expression grammar and evaluation

pub mod diff;
pub mod log;
pub mod objects;
pub mod pack;
pub mod refs;
pub mod revision;

//! Tree comparison
//!
//! - `tree_diff`: structural diff of two tree objects, reporting
//!   modified (including renamed), deleted and inserted entries

pub mod tree_diff;

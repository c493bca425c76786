//! Commit history traversal
//!
//! - `rev_list`: walks every commit reachable from a start commit, newest
//!   first
//!
//! ## Algorithm
//!
//! The walk uses a priority queue ordered by committer timestamp. Parents
//! of merge commits are all queued, and each commit is visited once.

pub mod rev_list;
